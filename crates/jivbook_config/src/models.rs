use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8086,
        }
    }
}

// --- Database Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g. sqlite:data/jivbook.db, overridable via JIVBOOK__DATABASE__URL
}

// --- Firebase Config ---
// The service account key itself never lives in config, only its path.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub key_path: Option<String>, // "secret_from_env" resolves to FIREBASE_KEY_PATH
    /// Overrides `https://fcm.googleapis.com` (emulators, tests).
    #[serde(default)]
    pub fcm_base_url: Option<String>,
    /// Overrides `https://iid.googleapis.com` for topic management.
    #[serde(default)]
    pub iid_base_url: Option<String>,
    /// Pre-issued bearer token; skips the service account flow when set.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Upper bound of in-flight FCM requests during one multicast.
    #[serde(default = "default_send_concurrency")]
    pub send_concurrency: usize,
    #[serde(default = "default_web_icon")]
    pub web_icon: String,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_send_concurrency() -> usize {
    16
}

fn default_web_icon() -> String {
    "/icon-192x192.png".to_string()
}

// --- Notification Service Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Tokens per provider call during a broadcast. FCM caps this at 500.
    pub batch_size: usize,
    pub default_page_size: u32,
    /// Device tokens unused for longer than this are purged by the token cleaner.
    pub token_retention_days: i64,
    pub scheduler_enabled: bool,
    /// IANA zone the cron-style jobs are evaluated in.
    pub timezone: String,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            default_page_size: 20,
            token_retention_days: 30,
            scheduler_enabled: true,
            timezone: "UTC".to_string(),
        }
    }
}

// --- Logging Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<String>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "jivbook.log".to_string(),
        }
    }
}

// --- Main Application Config ---
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub use_firebase: bool,
    #[serde(default)]
    pub server: ServerConfig,
    pub database: Option<DatabaseConfig>,
    pub firebase: Option<FirebaseConfig>,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}
