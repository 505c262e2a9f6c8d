use crate::shared::utils::parse_database_url;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub helpdesk: HelpdeskConfig,
    pub auth: AuthConfig,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub username: String,
    pub password: String,
    pub server: String,
    pub port: u32,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HelpdeskConfig {
    pub base_url: String,
    pub api_token: String,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .finish()
    }
}

impl AppConfig {
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.database.username,
            self.database.password,
            self.database.server,
            self.database.port,
            self.database.database
        )
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let (username, password, server, port, database) = parse_database_url(&database_url);
        if server.is_empty() || database.is_empty() {
            anyhow::bail!("DATABASE_URL is not a valid postgres:// URL");
        }

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
            },
            database: DatabaseConfig {
                username,
                password,
                server,
                port,
                database,
            },
            cache: CacheConfig {
                url: std::env::var("REDIS_URL").ok(),
            },
            helpdesk: HelpdeskConfig {
                base_url: std::env::var("HELPDESK_API_URL")
                    .unwrap_or_else(|_| "https://helpdesk.autonomia.site".to_string()),
                api_token: std::env::var("HELPDESK_API_TOKEN").unwrap_or_default(),
            },
            auth: AuthConfig {
                jwt_secret: std::env::var("JWT_SECRET").unwrap_or_default(),
            },
            cors_allowed_origins,
        })
    }
}
