use crate::config::Config;
use crate::models::Role;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use actix_web::{
    FromRequest, HttpRequest, dev::Payload, error::ErrorInternalServerError, error::ErrorUnauthorized,
    web,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use std::future::{Ready, ready};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Username
    pub role: Role,
    pub exp: usize,
}

impl FromRequest for Claims {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let auth_header = match req.headers().get("Authorization") {
            Some(h) => h,
            None => return ready(Err(ErrorUnauthorized("No Auth header"))),
        };

        let token_str = match auth_header.to_str() {
            Ok(s) => s.replace("Bearer ", ""),
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid Auth header"))),
        };

        let config = match req.app_data::<web::Data<Config>>() {
            Some(c) => c,
            None => return ready(Err(ErrorInternalServerError("Missing configuration"))),
        };

        match decode_jwt(&token_str, &config.jwt_secret) {
            Ok(claims) => ready(Ok(claims)),
            Err(_) => ready(Err(ErrorUnauthorized("Invalid Token"))),
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| e.to_string())?
        .to_string();
    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, String> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| e.to_string())?;
    let argon2 = Argon2::default();
    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn create_jwt(username: &str, role: Role, secret: &str, ttl_hours: u64) -> Result<String, String> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| e.to_string())?
        .as_secs() as usize
        + ttl_hours as usize * 3600;

    let claims = Claims {
        sub: username.to_string(),
        role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| e.to_string())
}

pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}
