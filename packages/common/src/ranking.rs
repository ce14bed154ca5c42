/// A candidate for score-based elimination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredTeam {
    pub team_number: i32,
    pub total_score: i32,
}

/// Outcome of ranking a round's active teams by score.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreCut {
    pub accepted: Vec<i32>,
    pub eliminated: Vec<i32>,
}

/// Rank by `total_score` descending (ties broken by lower team number) and keep
/// the top `limit`.
pub fn cut_by_score(mut teams: Vec<ScoredTeam>, limit: usize) -> ScoreCut {
    teams.sort_by(|a, b| {
        b.total_score
            .cmp(&a.total_score)
            .then(a.team_number.cmp(&b.team_number))
    });

    let split = limit.min(teams.len());
    let (top, rest) = teams.split_at(split);
    ScoreCut {
        accepted: top.iter().map(|t| t.team_number).collect(),
        eliminated: rest.iter().map(|t| t.team_number).collect(),
    }
}
