//! Configuration loading for Jivbook
//!
//! Settings are layered in this order, later sources winning:
//!
//! 1. `config/default.{toml,json,yaml}`
//! 2. `config/{RUN_ENV}.{toml,json,yaml}` (`RUN_ENV` defaults to `debug`)
//! 3. Environment variables with the `PREFIX` prefix (default `JIVBOOK`) and `__`
//!    as the nesting separator, e.g. `JIVBOOK__DATABASE__URL`.
//!
//! String values equal to `secret_from_env` are then replaced with the environment
//! variable named after their path, e.g. `firebase.key_path` reads `FIREBASE_KEY_PATH`.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub mod models;
pub use models::*;

const SECRET_MARKER: &str = "secret_from_env";

/// Loads the application configuration from the default locations.
///
/// The config directory can be moved with `CONFIG_DIR`.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let prefix = env::var("PREFIX").unwrap_or_else(|_| "JIVBOOK".to_string());
    let config_dir = env::var("CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));

    load_config_from(&config_dir, &run_env, &prefix)
}

/// Loads the configuration from an explicit directory, run environment and env prefix.
///
/// # Errors
///
/// Returns a `ConfigError` if a present file cannot be parsed or the merged
/// values do not deserialize into [`AppConfig`].
pub fn load_config_from(
    config_dir: &Path,
    run_env: &str,
    prefix: &str,
) -> Result<AppConfig, ConfigError> {
    let default_path = config_dir.join("default");
    let env_path = config_dir.join(run_env);

    debug!("Loading default config from {}", default_path.display());
    debug!("Loading {} config from {}", run_env, env_path.display());

    let builder = Config::builder()
        .add_source(File::with_name(&default_path.to_string_lossy()).required(false))
        .add_source(File::with_name(&env_path.to_string_lossy()).required(false))
        .add_source(
            Environment::with_prefix(prefix)
                .separator("__")
                .try_parsing(true),
        );

    let raw_config: AppConfig = builder.build()?.try_deserialize()?;
    apply_env_overrides_from_marker(raw_config)
}

/// Recursively replaces all "secret_from_env" string values with environment variable values
fn inject_env_secrets(value: &mut Value) {
    fn walk(path: Vec<String>, obj: &mut Value) {
        match obj {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    let mut new_path = path.clone();
                    new_path.push(k.to_string());
                    walk(new_path, v);
                }
            }
            Value::String(s) if s == SECRET_MARKER => {
                let env_key = path.join("_").to_uppercase();
                if let Ok(env_val) = env::var(&env_key) {
                    *obj = Value::String(env_val);
                } else {
                    warn!("Env var {} not found for {}", env_key, SECRET_MARKER);
                }
            }
            _ => {}
        }
    }

    walk(vec![], value);
}

/// Applies environment overrides based on "secret_from_env" markers in serialized config
pub fn apply_env_overrides_from_marker(config: AppConfig) -> Result<AppConfig, ConfigError> {
    let mut json = serde_json::to_value(&config)
        .map_err(|e| ConfigError::Message(format!("AppConfig is not serializable: {}", e)))?;
    inject_env_secrets(&mut json);
    serde_json::from_value(json)
        .map_err(|e| ConfigError::Message(format!("AppConfig is not deserializable: {}", e)))
}

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Ensures that the dotenv file is loaded into the environment variables.
///
/// `DOTENV_OVERRIDE` wins over a first command line argument starting with `.env`,
/// which wins over the plain `.env` file. Loading happens at most once per process.
///
/// # Returns
///
/// The path of the dotenv file that was (or would have been) loaded.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path_override = env::var("DOTENV_OVERRIDE").ok();
    let dotenv_path_arg = env::args().nth(1).filter(|s| s.starts_with(".env"));

    let dotenv_path = dotenv_path_override
        .or(dotenv_path_arg)
        .unwrap_or_else(|| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}
