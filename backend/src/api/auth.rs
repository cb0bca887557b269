use crate::{
    api,
    config::Config,
    models::Role,
    services::{auth, users},
    state::SharedState,
};
use actix_web::{HttpResponse, Responder, get, post, web};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

/// Log in through the admin or the user form.
///
/// Succeeds only when the credentials match and the account holds the form's role.
#[post("/login/{role}")]
pub async fn login(
    state: web::Data<SharedState>,
    config: web::Data<Config>,
    path: web::Path<String>,
    item: web::Json<AuthRequest>,
) -> impl Responder {
    let form_role: Role = match path.into_inner().parse() {
        Ok(r) => r,
        Err(e) => return HttpResponse::NotFound().body(e),
    };

    let credentials = match api::lock(&state) {
        Ok(s) => s.users.credentials(&item.username),
        Err(resp) => return resp,
    };

    // Hash check runs without holding the state lock
    let verified = credentials
        .and_then(|(hash, role)| users::verify_credentials(&item.password, &hash, role));
    match verified {
        Some(role) if role == form_role => {}
        _ => {
            log::warn!("Rejected {} login for {}", form_role, item.username);
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
    }

    let token = match auth::create_jwt(
        &item.username,
        form_role,
        &config.jwt_secret,
        config.token_ttl_hours,
    ) {
        Ok(t) => t,
        Err(_) => return HttpResponse::InternalServerError().body("Error creating token"),
    };

    let mut state = match api::lock(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    state.session.login(&item.username, form_role);
    log::info!("{} logged in as {}", item.username, form_role);

    HttpResponse::Ok().json(serde_json::json!({
        "token": token,
        "username": item.username,
        "role": form_role,
    }))
}

#[post("/logout")]
pub async fn logout(state: web::Data<SharedState>) -> impl Responder {
    let mut state = match api::lock(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    if let Some(username) = &state.session.username {
        log::info!("{} logged out", username);
    }
    state.session.logout();

    HttpResponse::Ok().json(serde_json::json!({"logged_in": false}))
}

#[get("/session")]
pub async fn get_session(state: web::Data<SharedState>) -> impl Responder {
    match api::lock(&state) {
        Ok(s) => HttpResponse::Ok().json(&s.session),
        Err(resp) => resp,
    }
}
