pub mod accounts;
pub mod admin;
pub mod audit;
pub mod calendar;
pub mod candidate_routes;
pub mod health;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};

use crate::middleware::auth::{require_actor, require_admin};
use crate::AppState;

pub fn router(state: AppState) -> Router {
    let admin_api = Router::new()
        .route(
            "/api/admin/candidates/confirm",
            post(admin::confirm_candidates),
        )
        .route(
            "/api/admin/candidates/delete",
            post(admin::delete_candidates),
        )
        .route(
            "/api/admin/candidates/:id/confirm",
            post(admin::confirm_candidate),
        )
        .route(
            "/api/admin/candidates/:id/revert",
            post(admin::revert_candidate),
        )
        .route("/api/admin/audit-logs", get(audit::list_audit_logs))
        .route(
            "/api/admin/accounts",
            get(accounts::list_accounts)
                .post(accounts::add_account)
                .delete(accounts::remove_account),
        )
        .route(
            "/api/admin/calendar/reconcile",
            post(admin::reconcile_calendars),
        )
        .route_layer(from_fn(require_admin));

    let actor_api = Router::new()
        .route(
            "/api/candidates",
            get(candidate_routes::list_candidates).post(candidate_routes::create_candidate),
        )
        .route(
            "/api/candidates/mine",
            get(candidate_routes::list_my_candidates),
        )
        .route(
            "/api/candidates/:id",
            get(candidate_routes::get_candidate)
                .patch(candidate_routes::update_candidate)
                .delete(candidate_routes::delete_candidate),
        )
        .route("/api/calendar/credentials", put(calendar::put_credentials))
        .merge(admin_api)
        .route_layer(from_fn_with_state(state.clone(), require_actor));

    Router::new()
        .route("/health", get(health::health))
        .merge(actor_api)
        .with_state(state)
}
