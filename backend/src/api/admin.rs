use crate::{
    api,
    models::Role,
    services::{
        auth::{self, Claims},
        loader::{self, TableKind, Upload},
        users::UserError,
    },
    state::SharedState,
};
use actix_web::{HttpResponse, Responder, delete, get, post, put, web};
use serde::Deserialize;

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

#[derive(Deserialize)]
pub struct AddUserRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

fn user_error_response(err: UserError) -> HttpResponse {
    let message = err.to_string();
    match err {
        UserError::AlreadyExists(_) => HttpResponse::Conflict().body("User already exists"),
        UserError::NotFound(_) => HttpResponse::NotFound().body(message),
        UserError::BuiltinAdmin | UserError::EmptyUsername => HttpResponse::BadRequest().body(message),
        UserError::Hashing(_) => HttpResponse::InternalServerError().body(message),
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// Upload one of the three tables as the raw request body.
///
/// The file replaces the stored table of that kind. A file that cannot be
/// decoded or lacks required columns leaves the stored table untouched.
#[post("/upload/{kind}")]
pub async fn upload(
    state: web::Data<SharedState>,
    claims: Claims,
    path: web::Path<String>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> impl Responder {
    let kind: TableKind = match path.into_inner().parse() {
        Ok(k) => k,
        Err(e) => return HttpResponse::NotFound().body(e),
    };

    let mut state = match api::lock(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if let Err(resp) = api::require_admin(&state, &claims) {
        return resp;
    }

    let file = (!body.is_empty()).then(|| Upload {
        filename: &query.filename,
        bytes: &body,
    });

    let table = match loader::load_table(file.as_ref()) {
        Ok(Some(t)) => t,
        Ok(None) => return HttpResponse::BadRequest().body("No file uploaded"),
        Err(e) => {
            log::warn!("Upload of {} ({}) failed: {}", query.filename, kind.as_str(), e);
            return HttpResponse::UnprocessableEntity().json(serde_json::json!({
                "error": e.to_string(),
                "hint": "No table available. Upload a CSV or spreadsheet file."
            }));
        }
    };

    match state.data.store(kind, &table) {
        Ok(rows) => {
            log::info!("Stored {} table from {} ({} rows)", kind.as_str(), query.filename, rows);
            HttpResponse::Ok().json(serde_json::json!({
                "kind": kind,
                "rows": rows,
                "missing": state.data.missing(),
                "message": format!("{} file uploaded", kind.as_str())
            }))
        }
        Err(e) => {
            log::warn!("Rejected {} table from {}: {}", kind.as_str(), query.filename, e);
            HttpResponse::UnprocessableEntity().json(serde_json::json!({ "error": e.to_string() }))
        }
    }
}

#[get("/users")]
pub async fn list_users(state: web::Data<SharedState>, claims: Claims) -> impl Responder {
    let state = match api::lock(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if let Err(resp) = api::require_admin(&state, &claims) {
        return resp;
    }

    HttpResponse::Ok().json(state.users.list())
}

#[post("/users")]
pub async fn add_user(
    state: web::Data<SharedState>,
    claims: Claims,
    body: web::Json<AddUserRequest>,
) -> impl Responder {
    {
        let state = match api::lock(&state) {
            Ok(s) => s,
            Err(resp) => return resp,
        };
        if let Err(resp) = api::require_admin(&state, &claims) {
            return resp;
        }
        if let Err(e) = state.users.check_new_username(&body.username) {
            return user_error_response(e);
        }
    }

    let password_hash = match auth::hash_password(&body.password) {
        Ok(h) => h,
        Err(e) => return user_error_response(UserError::Hashing(e)),
    };

    let mut state = match api::lock(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if let Err(resp) = api::require_admin(&state, &claims) {
        return resp;
    }

    match state.users.insert_hashed(&body.username, password_hash, body.role) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "username": body.username,
            "role": body.role,
            "message": "User added"
        })),
        Err(e) => user_error_response(e),
    }
}

#[delete("/users/{username}")]
pub async fn remove_user(
    state: web::Data<SharedState>,
    claims: Claims,
    path: web::Path<String>,
) -> impl Responder {
    let username = path.into_inner();
    let mut state = match api::lock(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if let Err(resp) = api::require_admin(&state, &claims) {
        return resp;
    }

    match state.users.remove_user(&username) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({"deleted": true, "message": "User removed"})),
        Err(e) => user_error_response(e),
    }
}

#[put("/users/{username}/role")]
pub async fn change_role(
    state: web::Data<SharedState>,
    claims: Claims,
    path: web::Path<String>,
    body: web::Json<ChangeRoleRequest>,
) -> impl Responder {
    let username = path.into_inner();
    let mut state = match api::lock(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if let Err(resp) = api::require_admin(&state, &claims) {
        return resp;
    }

    match state.users.change_role(&username, body.role) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "username": username,
            "role": body.role,
            "message": "Role changed"
        })),
        Err(e) => user_error_response(e),
    }
}
