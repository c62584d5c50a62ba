use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::ServerConfig;

/// Default configuration file looked up when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "crawlgate.toml";

/// Prefix of environment overrides, e.g. `CRAWLGATE__CACHE_TIME=60000` or
/// `CRAWLGATE__LOGGING__LEVEL=debug`.
pub const ENV_PREFIX: &str = "CRAWLGATE";

/// Written by `crawlgate init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Crawlgate configuration

# The address `crawlgate serve` listens on
listen_addr = "127.0.0.1:3000"

# How long a loaded rule specification is reused, in milliseconds
cache_time = 600000

# Hand-written rules are read from <src_dir>/<static_dir>/<file_name>,
# the generated file is written to <root_dir>/<generate_dir>/<file_name>.
src_dir = "."
static_dir = "static"
root_dir = "."
generate_dir = "dist"
file_name = "robots.txt"

[logging]
level = "info"
json = false

# A single mapping is merged over `User-agent: *` / `Disallow: /`.
# Use [[robots]] tables instead to emit independent groups as written.
[robots]
UserAgent = "*"
Disallow = ["/admin", "/private"]
Sitemap = "https://example.com/sitemap.xml"
"#;

/// Load configuration from a file using the config crate
/// Supports multiple formats: YAML, JSON, TOML, etc.
pub async fn load_config(config_path: &str) -> Result<ServerConfig> {
    load_config_sync(config_path)
}

/// Load configuration synchronously
pub fn load_config_sync(config_path: &str) -> Result<ServerConfig> {
    build_config(Path::new(config_path), true)
}

/// Load `config_path` if it exists, otherwise defaults plus environment
/// overrides.
pub fn load_config_or_default(config_path: &str) -> Result<ServerConfig> {
    build_config(Path::new(config_path), false)
}

fn file_format(config_path: &Path) -> FileFormat {
    match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Toml,
    }
}

fn build_config(config_path: &Path, required: bool) -> Result<ServerConfig> {
    let path_str = config_path
        .to_str()
        .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?;

    let settings = Config::builder()
        .add_source(File::new(path_str, file_format(config_path)).required(required))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let server_config: ServerConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    Ok(server_config)
}
