/// Role carried by team tokens.
pub const TEAM_ROLE: &str = "team";
/// Role carried by admin console tokens.
pub const ADMIN_ROLE: &str = "admin";

pub const ROUND_PLAY: &str = "round:play";
pub const EVENT_MANAGE: &str = "event:manage";
pub const TEAM_MANAGE: &str = "team:manage";

/// Role-permission mappings.
const MAPPINGS: &[(&str, &str)] = &[
    (TEAM_ROLE, ROUND_PLAY),
    (ADMIN_ROLE, EVENT_MANAGE),
    (ADMIN_ROLE, TEAM_MANAGE),
];

/// Permissions granted to `role`, in declaration order.
pub fn permissions_for(role: &str) -> Vec<String> {
    MAPPINGS
        .iter()
        .filter(|(r, _)| *r == role)
        .map(|(_, p)| p.to_string())
        .collect()
}
