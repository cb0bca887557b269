use crate::models::{Role, User};
use crate::services::auth;
use log::info;
use serde::Serialize;

/// Account seeded at startup; it can never be removed or demoted
pub const BUILTIN_ADMIN: &str = "admin";

#[derive(Debug, Clone, PartialEq)]
pub enum UserError {
    AlreadyExists(String),
    NotFound(String),
    BuiltinAdmin,
    EmptyUsername,
    Hashing(String),
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserError::AlreadyExists(name) => write!(f, "User already exists: {}", name),
            UserError::NotFound(name) => write!(f, "User not found: {}", name),
            UserError::BuiltinAdmin => write!(f, "The built-in admin account cannot be modified"),
            UserError::EmptyUsername => write!(f, "Username must not be empty"),
            UserError::Hashing(msg) => write!(f, "Error hashing password: {}", msg),
        }
    }
}

impl std::error::Error for UserError {}

/// Public view of an account
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub username: String,
    pub role: Role,
}

/// In-memory accounts, kept in creation order
#[derive(Debug, Clone)]
pub struct UserRegistry {
    users: Vec<User>,
}

impl UserRegistry {
    /// Registry holding only the built-in admin
    pub fn new(admin_password: &str) -> Result<Self, UserError> {
        let password_hash = auth::hash_password(admin_password).map_err(UserError::Hashing)?;
        Ok(Self {
            users: vec![User {
                username: BUILTIN_ADMIN.to_string(),
                password_hash,
                role: Role::Admin,
            }],
        })
    }

    fn find(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    fn find_mut(&mut self, username: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.username == username)
    }

    pub fn contains(&self, username: &str) -> bool {
        self.find(username).is_some()
    }

    /// Role of `username` if `password` matches
    pub fn check_login(&self, username: &str, password: &str) -> Option<Role> {
        let (password_hash, role) = self.credentials(username)?;
        verify_credentials(password, &password_hash, role)
    }

    /// Stored hash and role, copied out so they can be checked without holding the registry
    pub fn credentials(&self, username: &str) -> Option<(String, Role)> {
        self.find(username).map(|u| (u.password_hash.clone(), u.role))
    }

    /// Rejects names that `add_user` would refuse
    pub fn check_new_username(&self, username: &str) -> Result<(), UserError> {
        if username.trim().is_empty() {
            return Err(UserError::EmptyUsername);
        }
        if self.contains(username) {
            return Err(UserError::AlreadyExists(username.to_string()));
        }
        Ok(())
    }

    pub fn add_user(&mut self, username: &str, password: &str, role: Role) -> Result<(), UserError> {
        self.check_new_username(username)?;
        let password_hash = auth::hash_password(password).map_err(UserError::Hashing)?;
        self.insert_hashed(username, password_hash, role)
    }

    /// Adds an account whose password was hashed beforehand
    pub fn insert_hashed(&mut self, username: &str, password_hash: String, role: Role) -> Result<(), UserError> {
        self.check_new_username(username)?;
        self.users.push(User {
            username: username.to_string(),
            password_hash,
            role,
        });
        info!("Added user {} with role {}", username, role);
        Ok(())
    }

    pub fn remove_user(&mut self, username: &str) -> Result<(), UserError> {
        if username == BUILTIN_ADMIN {
            return Err(UserError::BuiltinAdmin);
        }
        let before = self.users.len();
        self.users.retain(|u| u.username != username);
        if self.users.len() == before {
            return Err(UserError::NotFound(username.to_string()));
        }
        info!("Removed user {}", username);
        Ok(())
    }

    pub fn change_role(&mut self, username: &str, role: Role) -> Result<(), UserError> {
        if username == BUILTIN_ADMIN {
            return Err(UserError::BuiltinAdmin);
        }
        let user = self
            .find_mut(username)
            .ok_or_else(|| UserError::NotFound(username.to_string()))?;
        user.role = role;
        info!("Changed role of {} to {}", username, role);
        Ok(())
    }

    pub fn role_of(&self, username: &str) -> Option<Role> {
        self.find(username).map(|u| u.role)
    }

    pub fn list(&self) -> Vec<UserSummary> {
        self.users
            .iter()
            .map(|u| UserSummary {
                username: u.username.clone(),
                role: u.role,
            })
            .collect()
    }
}

/// `Some(role)` when `password` matches `password_hash`
pub fn verify_credentials(password: &str, password_hash: &str, role: Role) -> Option<Role> {
    match auth::verify_password(password, password_hash) {
        Ok(true) => Some(role),
        _ => None,
    }
}
