use crate::models::Role;
use crate::services::auth::Claims;
use crate::state::{AppState, SharedState};
use actix_web::{HttpResponse, web};
use std::sync::MutexGuard;

pub mod admin;
pub mod auth;
pub mod dashboard;

pub fn config(cfg: &mut web::ServiceConfig) {
    // Auth routes (public)
    cfg.service(
        web::scope("/api/auth")
            .service(auth::login)
            .service(auth::logout)
            .service(auth::get_session),
    );

    // Admin routes (admin session only)
    cfg.service(
        web::scope("/api/admin")
            .service(admin::upload)
            .service(admin::list_users)
            .service(admin::add_user)
            .service(admin::remove_user)
            .service(admin::change_role),
    );

    // Dashboard routes (any session)
    cfg.service(
        web::scope("/api/dashboard")
            .service(dashboard::get_options)
            .service(dashboard::get_metrics)
            .service(dashboard::get_disconnected_chart)
            .service(dashboard::get_gateway_chart),
    );
}

pub(crate) fn lock(state: &web::Data<SharedState>) -> Result<MutexGuard<'_, AppState>, HttpResponse> {
    state
        .lock()
        .map_err(|_| HttpResponse::InternalServerError().body("State lock poisoned"))
}

/// The token must belong to whoever holds the current session, and the account
/// must still exist. Returns the account's current role.
pub(crate) fn require_session(state: &AppState, claims: &Claims) -> Result<Role, HttpResponse> {
    match state.users.role_of(&claims.sub) {
        Some(role) if state.session.is_active_for(&claims.sub, claims.role) => Ok(role),
        _ => Err(HttpResponse::Unauthorized().body("Not logged in")),
    }
}

/// Checks the registry rather than the token, so a demotion applies at once
pub(crate) fn require_admin(state: &AppState, claims: &Claims) -> Result<(), HttpResponse> {
    if require_session(state, claims)? == Role::Admin {
        Ok(())
    } else {
        Err(HttpResponse::Forbidden().body("Access denied. Only admins can access this page."))
    }
}
