/// Canonical form of an answer, applied identically to stored and submitted answers.
pub fn normalize_answer(raw: &str, case_sensitive: bool) -> String {
    let trimmed = raw.trim();
    if case_sensitive {
        trimmed.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

pub fn answers_match(candidate: &str, expected: &str, case_sensitive: bool) -> bool {
    normalize_answer(candidate, case_sensitive) == normalize_answer(expected, case_sensitive)
}
