// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    pub storage_dir: String,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub allowed_origins: Vec<String>,
    pub log_level: String,
}

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_JWT_MAXAGE_MINUTES: i64 = 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

impl Config {
    pub fn init() -> Result<Config, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, String> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("JWT_SECRET_KEY").ok_or("JWT_SECRET_KEY must be set")?;

        let jwt_maxage = match var("JWT_MAXAGE") {
            Some(v) => v
                .parse::<i64>()
                .map_err(|_| format!("JWT_MAXAGE must be a number of minutes, got {}", v))?,
            None => DEFAULT_JWT_MAXAGE_MINUTES,
        };

        let port = match var("PORT") {
            Some(v) => v
                .parse::<u16>()
                .map_err(|_| format!("PORT must be a valid port, got {}", v))?,
            None => DEFAULT_PORT,
        };

        let max_upload_bytes = match var("MAX_UPLOAD_BYTES") {
            Some(v) => v
                .parse::<usize>()
                .map_err(|_| format!("MAX_UPLOAD_BYTES must be a byte count, got {}", v))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let allowed_origins = var("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);

        Ok(Config {
            database_url: var("DATABASE_URL"),
            jwt_secret,
            jwt_maxage,
            port,
            storage_dir: var("STORAGE_DIR").unwrap_or_else(|| "./uploads".to_string()),
            public_base_url: var("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
            max_upload_bytes,
            allowed_origins,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "debug".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, String> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn secret_is_required() {
        assert_eq!(config_from(&[]).unwrap_err(), "JWT_SECRET_KEY must be set");
        assert!(config_from(&[("JWT_SECRET_KEY", "  ")]).is_err());
    }

    #[test]
    fn defaults_apply() {
        let config = config_from(&[("JWT_SECRET_KEY", "s3cret")]).unwrap();

        assert_eq!(config.database_url, None);
        assert_eq!(config.jwt_maxage, 60);
        assert_eq!(config.port, 8000);
        assert_eq!(config.storage_dir, "./uploads");
        assert_eq!(config.public_base_url, "http://localhost:8000");
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("JWT_SECRET_KEY", "s3cret"),
            ("PORT", "9100"),
            ("ALLOWED_ORIGINS", "https://kaambazar.in, https://admin.kaambazar.in,"),
            ("DATABASE_URL", "postgres://localhost/kaambazar"),
        ])
        .unwrap();

        assert_eq!(config.public_base_url, "http://localhost:9100");
        assert_eq!(
            config.allowed_origins,
            vec!["https://kaambazar.in", "https://admin.kaambazar.in"]
        );
        assert!(config.database_url.is_some());

        assert!(config_from(&[("JWT_SECRET_KEY", "s"), ("PORT", "eighty")]).is_err());
    }
}
