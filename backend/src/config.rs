/// Runtime settings, read from the environment (and `.env` when present)
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Password seeded for the built-in admin account
    pub admin_password: String,
    pub token_ttl_hours: u64,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "secret".to_string(),
            admin_password: "admin123".to_string(),
            token_ttl_hours: 24,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(p) => p.parse().map_err(|_| format!("Invalid PORT: {}", p))?,
            None => defaults.port,
        };
        let token_ttl_hours = match lookup("TOKEN_TTL_HOURS") {
            Some(h) => h.parse().map_err(|_| format!("Invalid TOKEN_TTL_HOURS: {}", h))?,
            None => defaults.token_ttl_hours,
        };
        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(b) => b.parse().map_err(|_| format!("Invalid MAX_UPLOAD_BYTES: {}", b))?,
            None => defaults.max_upload_bytes,
        };

        Ok(Self {
            bind_address: lookup("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port,
            // In production, always set JWT_SECRET and ADMIN_PASSWORD!
            jwt_secret: lookup("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            admin_password: lookup("ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            token_ttl_hours,
            max_upload_bytes,
        })
    }
}
