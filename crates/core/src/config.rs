use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub discord: DiscordConfig,
    pub listing: ListingConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: String,
    pub json_path: PathBuf,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub bot_token: SecretString,
    pub default_admin_id: String,
    pub guild_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ListingConfig {
    pub channel_id: String,
    pub page_size: usize,
    pub lock_timeout_ms: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub keepalive_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Sqlite,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub store_backend: Option<StoreBackend>,
    pub database_url: Option<String>,
    pub json_path: Option<PathBuf>,
    pub bot_token: Option<String>,
    pub default_admin_id: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                backend: StoreBackend::Sqlite,
                url: "sqlite://motorpool.db".to_string(),
                json_path: PathBuf::from("motorpool.json"),
                max_connections: 5,
                timeout_secs: 30,
            },
            discord: DiscordConfig {
                bot_token: String::new().into(),
                default_admin_id: "652050350454472734".to_string(),
                guild_id: None,
            },
            listing: ListingConfig {
                channel_id: "garage".to_string(),
                page_size: 10,
                lock_timeout_ms: 1_500,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                keepalive_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported store backend `{other}` (expected sqlite|json)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("motorpool.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(store) = patch.store {
            if let Some(backend) = store.backend {
                self.store.backend = backend;
            }
            if let Some(url) = store.url {
                self.store.url = url;
            }
            if let Some(json_path) = store.json_path {
                self.store.json_path = json_path;
            }
            if let Some(max_connections) = store.max_connections {
                self.store.max_connections = max_connections;
            }
            if let Some(timeout_secs) = store.timeout_secs {
                self.store.timeout_secs = timeout_secs;
            }
        }

        if let Some(discord) = patch.discord {
            if let Some(bot_token_value) = discord.bot_token {
                self.discord.bot_token = secret_value(bot_token_value);
            }
            if let Some(default_admin_id) = discord.default_admin_id {
                self.discord.default_admin_id = default_admin_id;
            }
            if let Some(guild_id) = discord.guild_id {
                self.discord.guild_id = Some(guild_id);
            }
        }

        if let Some(listing) = patch.listing {
            if let Some(channel_id) = listing.channel_id {
                self.listing.channel_id = channel_id;
            }
            if let Some(page_size) = listing.page_size {
                self.listing.page_size = page_size;
            }
            if let Some(lock_timeout_ms) = listing.lock_timeout_ms {
                self.listing.lock_timeout_ms = lock_timeout_ms;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(keepalive_port) = server.keepalive_port {
                self.server.keepalive_port = keepalive_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("MOTORPOOL_STORE_BACKEND") {
            self.store.backend = value.parse()?;
        }
        if let Some(value) = read_env("MOTORPOOL_DATABASE_URL") {
            self.store.url = value;
        }
        if let Some(value) = read_env("MOTORPOOL_STORE_JSON_PATH") {
            self.store.json_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("MOTORPOOL_STORE_MAX_CONNECTIONS") {
            self.store.max_connections = parse_u32("MOTORPOOL_STORE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("MOTORPOOL_STORE_TIMEOUT_SECS") {
            self.store.timeout_secs = parse_u64("MOTORPOOL_STORE_TIMEOUT_SECS", &value)?;
        }

        // DISCORD_TOKEN is the name most hosting dashboards already carry.
        let bot_token =
            read_env("MOTORPOOL_DISCORD_BOT_TOKEN").or_else(|| read_env("DISCORD_TOKEN"));
        if let Some(value) = bot_token {
            self.discord.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("MOTORPOOL_DISCORD_DEFAULT_ADMIN_ID") {
            self.discord.default_admin_id = value;
        }
        if let Some(value) = read_env("MOTORPOOL_DISCORD_GUILD_ID") {
            self.discord.guild_id = Some(value);
        }

        if let Some(value) = read_env("MOTORPOOL_LISTING_CHANNEL_ID") {
            self.listing.channel_id = value;
        }
        if let Some(value) = read_env("MOTORPOOL_LISTING_PAGE_SIZE") {
            self.listing.page_size = parse_usize("MOTORPOOL_LISTING_PAGE_SIZE", &value)?;
        }
        if let Some(value) = read_env("MOTORPOOL_LISTING_LOCK_TIMEOUT_MS") {
            self.listing.lock_timeout_ms = parse_u64("MOTORPOOL_LISTING_LOCK_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = read_env("MOTORPOOL_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("MOTORPOOL_SERVER_KEEPALIVE_PORT") {
            self.server.keepalive_port = parse_u16("MOTORPOOL_SERVER_KEEPALIVE_PORT", &value)?;
        }
        if let Some(value) = read_env("MOTORPOOL_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("MOTORPOOL_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("MOTORPOOL_LOGGING_LEVEL").or_else(|| read_env("MOTORPOOL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("MOTORPOOL_LOGGING_FORMAT").or_else(|| read_env("MOTORPOOL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(store_backend) = overrides.store_backend {
            self.store.backend = store_backend;
        }
        if let Some(database_url) = overrides.database_url {
            self.store.url = database_url;
        }
        if let Some(json_path) = overrides.json_path {
            self.store.json_path = json_path;
        }
        if let Some(bot_token) = overrides.bot_token {
            self.discord.bot_token = secret_value(bot_token);
        }
        if let Some(default_admin_id) = overrides.default_admin_id {
            self.discord.default_admin_id = default_admin_id;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_store(&self.store)?;
        validate_discord(&self.discord)?;
        validate_listing(&self.listing)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("motorpool.toml"), PathBuf::from("config/motorpool.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_store(store: &StoreConfig) -> Result<(), ConfigError> {
    match store.backend {
        StoreBackend::Sqlite => {
            let url = store.url.trim();
            let sqlite_url =
                url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
            if !sqlite_url {
                return Err(ConfigError::Validation(
                    "store.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                        .to_string(),
                ));
            }
        }
        StoreBackend::Json => {
            if store.json_path.as_os_str().is_empty() {
                return Err(ConfigError::Validation(
                    "store.json_path is required for the json backend".to_string(),
                ));
            }
        }
    }

    if store.max_connections == 0 {
        return Err(ConfigError::Validation(
            "store.max_connections must be greater than zero".to_string(),
        ));
    }

    if store.timeout_secs == 0 || store.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "store.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    let bot_token = discord.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "discord.bot_token is required. Get it from the Discord developer portal > Your App > Bot > Token".to_string()
        ));
    }
    if bot_token.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(
            "discord.bot_token must not contain whitespace (check for copy/paste artifacts)"
                .to_string(),
        ));
    }

    let admin_id = discord.default_admin_id.trim();
    if admin_id.is_empty() {
        return Err(ConfigError::Validation(
            "discord.default_admin_id is required so one admin exists after seeding".to_string(),
        ));
    }
    if !admin_id.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ConfigError::Validation(
            "discord.default_admin_id must be a numeric user id (snowflake)".to_string(),
        ));
    }

    Ok(())
}

fn validate_listing(listing: &ListingConfig) -> Result<(), ConfigError> {
    if listing.channel_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "listing.channel_id must name the channel that hosts the garage listing".to_string(),
        ));
    }

    // A select menu holds at most 25 options, so one page must fit in that.
    if listing.page_size == 0 || listing.page_size > 25 {
        return Err(ConfigError::Validation(
            "listing.page_size must be in range 1..=25".to_string(),
        ));
    }

    if listing.lock_timeout_ms == 0 || listing.lock_timeout_ms > 60_000 {
        return Err(ConfigError::Validation(
            "listing.lock_timeout_ms must be in range 1..=60000".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.keepalive_port == 0 {
        return Err(ConfigError::Validation(
            "server.keepalive_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    store: Option<StorePatch>,
    discord: Option<DiscordPatch>,
    listing: Option<ListingPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    backend: Option<StoreBackend>,
    url: Option<String>,
    json_path: Option<PathBuf>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    bot_token: Option<String>,
    default_admin_id: Option<String>,
    guild_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListingPatch {
    channel_id: Option<String>,
    page_size: Option<usize>,
    lock_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    keepalive_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use secrecy::ExposeSecret;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, StoreBackend};

    fn valid_overrides() -> ConfigOverrides {
        ConfigOverrides {
            database_url: Some("sqlite::memory:".to_string()),
            bot_token: Some("MTA0.fake.token".to_string()),
            ..ConfigOverrides::default()
        }
    }

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("motorpool.toml");
        let mut file = std::fs::File::create(&path).expect("create config");
        file.write_all(contents.as_bytes()).expect("write config");
        (dir, path)
    }

    #[test]
    fn defaults_fail_validation_without_bot_token() {
        let result = AppConfig::load(LoadOptions::default());
        let message = result.err().expect("missing token should fail").to_string();
        assert!(message.contains("discord.bot_token"));
    }

    #[test]
    fn overrides_produce_a_valid_config() {
        let config = AppConfig::load(LoadOptions {
            overrides: valid_overrides(),
            ..LoadOptions::default()
        })
        .expect("valid overrides");

        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.url, "sqlite::memory:");
        assert_eq!(config.discord.bot_token.expose_secret(), "MTA0.fake.token");
    }

    #[test]
    fn config_file_patch_is_applied() {
        let (_dir, path) = write_config(
            r#"
[store]
backend = "json"
json_path = "garage.json"

[listing]
page_size = 5

[discord]
bot_token = "MTA0.fake.token"
"#,
        );

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect("patched config");

        assert_eq!(config.store.backend, StoreBackend::Json);
        assert_eq!(config.store.json_path, PathBuf::from("garage.json"));
        assert_eq!(config.listing.page_size, 5);
    }

    #[test]
    fn missing_required_file_is_reported() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/motorpool.toml")),
            require_file: true,
            overrides: valid_overrides(),
        });

        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn rejects_token_with_whitespace() {
        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                bot_token: Some("MTA0 fake token".to_string()),
                ..valid_overrides()
            },
            ..LoadOptions::default()
        });

        let message = result.err().expect("whitespace token should fail").to_string();
        assert!(message.contains("whitespace"));
    }

    #[test]
    fn rejects_non_numeric_admin_id() {
        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                default_admin_id: Some("not-a-snowflake".to_string()),
                ..valid_overrides()
            },
            ..LoadOptions::default()
        });

        let message = result.err().expect("admin id must be numeric").to_string();
        assert!(message.contains("default_admin_id"));
    }

    #[test]
    fn rejects_oversized_listing_page() {
        let (_dir, path) = write_config(
            r#"
[listing]
page_size = 26
"#,
        );

        let result = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
            overrides: valid_overrides(),
        });

        let message = result.err().expect("page size above menu limit").to_string();
        assert!(message.contains("listing.page_size"));
    }

    #[test]
    fn unterminated_interpolation_is_an_error() {
        let (_dir, path) = write_config("[store]\nurl = \"${MOTORPOOL_UNTERMINATED\"\n");

        let result = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
            overrides: valid_overrides(),
        });

        assert!(matches!(result, Err(ConfigError::UnterminatedInterpolation)));
    }
}
