use utoipa_axum::{router::OpenApiRouter, routes};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/rounds", round_routes())
        .nest("/event", event_routes())
        .nest("/admin", admin_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::admin_login))
        .routes(routes!(handlers::auth::me))
}

fn round_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::rounds::list_rounds))
        .routes(routes!(handlers::rounds::get_round))
        .routes(routes!(handlers::rounds::submit_answer))
        .routes(routes!(handlers::rounds::leaderboard))
}

fn event_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::event::event_status))
}

fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::admin::get_event,
            handlers::admin::reset_event
        ))
        .routes(routes!(handlers::admin::start_event))
        .routes(routes!(handlers::admin::stop_event))
        .routes(routes!(
            handlers::admin::get_capacities,
            handlers::admin::update_capacities
        ))
        .routes(routes!(
            handlers::admin::list_teams,
            handlers::admin::create_team
        ))
        .routes(routes!(
            handlers::admin::update_team_scores,
            handlers::admin::delete_team
        ))
        .routes(routes!(handlers::admin::accept_teams))
        .routes(routes!(handlers::admin::eliminate_teams))
        .routes(routes!(handlers::admin::auto_eliminate))
        .routes(routes!(handlers::admin::upload_round_records))
        .routes(routes!(handlers::admin::progress))
        .routes(routes!(handlers::admin::list_overrides))
}
