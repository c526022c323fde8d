use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;
use url::Url;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

/// Session token and link settings for the auth flows.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: u64,
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "default_verify_redirect")]
    pub verify_redirect: String,
    #[serde(default = "default_reset_redirect")]
    pub reset_redirect: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_ttl_secs: default_access_ttl(),
            public_base_url: default_public_base_url(),
            verify_redirect: default_verify_redirect(),
            reset_redirect: default_reset_redirect(),
        }
    }
}

/// Upper bound for session lifetime: 30 days.
pub const MAX_ACCESS_TTL_SECS: u64 = 30 * 24 * 3600;

fn default_access_ttl() -> u64 { 3600 }
fn default_public_base_url() -> String { "http://localhost:8080".into() }
fn default_verify_redirect() -> String { "app://auth/verify".into() }
fn default_reset_redirect() -> String { "app://auth/reset-ok".into() }

/// Outbound SMTP settings. When `enabled` is false mail is only logged.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub from: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: String::new(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from: String::new(),
            from_name: default_from_name(),
        }
    }
}

fn default_smtp_port() -> u16 { 587 }
fn default_from_name() -> String { "Note2Tex".into() }

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`); without a file, build from environment only.
    pub fn load_and_validate() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut cfg = Self::load_or_env(&path)?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Parse the file at `path`. Only a missing file falls back to the
    /// environment; unreadable or malformed files are errors.
    pub fn load_or_env(path: &str) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => parse(&content).map_err(|e| anyhow!("{path}: {e}")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::from_env()),
            Err(e) => Err(anyhow!("{path}: {e}")),
        }
    }

    /// Configuration assembled purely from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(host) = lookup("SERVER_HOST") { cfg.server.host = host; }
        if let Some(port) = lookup("SERVER_PORT").and_then(|p| p.parse().ok()) { cfg.server.port = port; }
        cfg.server.worker_threads = lookup("TOKIO_WORKER_THREADS").and_then(|v| v.parse().ok()).or(cfg.server.worker_threads);
        if let Some(ttl) = lookup("JWT_ACCESS_TTL_SECS").and_then(|v| v.parse().ok()) { cfg.auth.access_ttl_secs = ttl; }
        if let Some(v) = lookup("VERIFY_REDIRECT") { cfg.auth.verify_redirect = v; }
        if let Some(v) = lookup("RESET_REDIRECT") { cfg.auth.reset_redirect = v; }
        cfg.mail.enabled = lookup("SMTP_ENABLED").map(|v| v == "true" || v == "1").unwrap_or(false);
        if let Some(v) = lookup("SMTP_HOST") { cfg.mail.host = v; }
        if let Some(v) = lookup("SMTP_PORT").and_then(|p| p.parse().ok()) { cfg.mail.port = v; }
        if let Some(v) = lookup("SMTP_USERNAME") { cfg.mail.username = v; }
        if let Some(v) = lookup("SMTP_PASSWORD") { cfg.mail.password = v; }
        if let Some(v) = lookup("SMTP_FROM") { cfg.mail.from = v; }
        cfg.fill_from(&lookup);
        cfg
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.fill_from(&|key: &str| std::env::var(key).ok());
        self.validate()
    }

    /// Validation without touching the environment.
    pub fn validate(&self) -> Result<()> {
        self.database.validate()?;
        self.auth.validate()?;
        self.mail.validate()?;
        Ok(())
    }

    /// Fill secrets and URLs left empty in TOML from the given lookup.
    fn fill_from(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if self.database.url.trim().is_empty() {
            if let Some(url) = lookup("DATABASE_URL") { self.database.url = url; }
        }
        if self.auth.jwt_secret.trim().is_empty() {
            if let Some(secret) = lookup("JWT_SECRET") { self.auth.jwt_secret = secret; }
        }
        if let Some(base) = lookup("PUBLIC_BASE_URL") {
            if self.auth.public_base_url == default_public_base_url() { self.auth.public_base_url = base; }
        }
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(w) if w > 0 => {}
            _ => self.worker_threads = Some(4),
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl AuthSettings {
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            return Err(anyhow!("auth.jwt_secret is empty; set it in config.toml or JWT_SECRET"));
        }
        if self.access_ttl_secs == 0 || self.access_ttl_secs > MAX_ACCESS_TTL_SECS {
            return Err(anyhow!("auth.access_ttl_secs must be in 1..={MAX_ACCESS_TTL_SECS}"));
        }
        let base = Url::parse(&self.public_base_url)
            .map_err(|e| anyhow!("auth.public_base_url is not a valid URL: {e}"))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(anyhow!("auth.public_base_url must be http(s)"));
        }
        Url::parse(&self.verify_redirect).map_err(|e| anyhow!("auth.verify_redirect is not a valid URL: {e}"))?;
        Url::parse(&self.reset_redirect).map_err(|e| anyhow!("auth.reset_redirect is not a valid URL: {e}"))?;
        Ok(())
    }
}

impl MailConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("mail.host is required when mail.enabled = true"));
        }
        if !self.from.contains('@') {
            return Err(anyhow!("mail.from must be an email address"));
        }
        Ok(())
    }
}
