use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Web server
    pub port: u16,
    /// "production" enables strict TLS verification on outbound calls.
    pub app_env: String,

    // Queue backend
    pub redis_host: String,
    pub redis_port: u16,
    pub queue_concurrency: usize,
    pub queue_attempts: u32,

    // Tableau server
    pub remote_base_url: String,
    pub pat_name: String,
    pub pat_secret: String,

    // Email gateway
    pub notification_api_url: String,
    pub api_gateway_token: String,
    pub email_from: String,
    pub email_team_tag: String,
    pub email_product_tag: String,

    // Presentation writer service
    pub renderer_base_url: String,

    // Use-case manifests
    pub manifest_dir: String,

    pub log_level: String,
}

impl Config {
    /// Load the full API/worker configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("PORT must be a number"),
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            redis_host: env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            redis_port: env::var("REDIS_PORT")
                .unwrap_or_else(|_| "6379".to_string())
                .parse()
                .expect("REDIS_PORT must be a number"),
            queue_concurrency: env::var("QUEUE_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            queue_attempts: env::var("QUEUE_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            remote_base_url: required_env("REMOTE_BASE_URL"),
            pat_name: required_env("PAT_NAME"),
            pat_secret: required_env("PAT_SECRET"),
            notification_api_url: required_env("NOTIFICATION_API_URL"),
            api_gateway_token: required_env("API_GATEWAY_TOKEN"),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "noreply@reportforge.io".to_string()),
            email_team_tag: env::var("EMAIL_TEAM_TAG").unwrap_or_default(),
            email_product_tag: env::var("EMAIL_PRODUCT_TAG").unwrap_or_default(),
            renderer_base_url: required_env("RENDERER_BASE_URL"),
            manifest_dir: env::var("MANIFEST_DIR").unwrap_or_else(|_| "config".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }

    /// Log the presence and size of each sensitive value for debugging.
    pub fn log_redacted(&self) {
        let vars = [
            ("PAT_NAME", &self.pat_name),
            ("PAT_SECRET", &self.pat_secret),
            ("API_GATEWAY_TOKEN", &self.api_gateway_token),
        ];
        for (name, value) in vars {
            if value.is_empty() {
                tracing::info!("{name} = (empty)");
            } else {
                tracing::info!("{name} = ({} chars)", value.len());
            }
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
