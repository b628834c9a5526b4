//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "penna";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const DEFAULT_GITHUB_USER_URL: &str = "https://api.github.com/user";
const DEFAULT_GITHUB_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SESSION_COOKIE: &str = "token";
const DEFAULT_SITE_TITLE: &str = "Penna";
const DEFAULT_PUBLIC_URL: &str = "http://127.0.0.1:3000";

/// Command-line arguments for the Penna binary.
#[derive(Debug, Parser)]
#[command(name = "penna", version, about = "Penna blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PENNA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Penna HTTP service.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the public site URL used in the sitemap.
    #[arg(long = "site-public-url", value_name = "URL")]
    pub site_public_url: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub github: GithubSettings,
    pub session: SessionSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct GithubSettings {
    pub client_id: String,
    pub client_secret: String,
    /// The single username allowed through the login gate.
    pub allowed_user: String,
    pub token_url: String,
    pub user_url: String,
    pub http_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub secret: String,
    pub cookie_name: String,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub title: String,
    pub public_url: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Parse CLI arguments and load settings in one step.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("PENNA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    github: RawGithubSettings,
    session: RawSessionSettings,
    site: RawSiteSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(count) = overrides.database_max_connections {
            self.database.max_connections = Some(count);
        }
        if let Some(url) = overrides.site_public_url.as_ref() {
            self.site.public_url = Some(url.clone());
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawGithubSettings {
    client_id: Option<String>,
    client_secret: Option<String>,
    allowed_user: Option<String>,
    token_url: Option<String>,
    user_url: Option<String>,
    http_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSessionSettings {
    secret: Option<String>,
    cookie_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    title: Option<String>,
    public_url: Option<String>,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let host = raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = raw.server.port.unwrap_or(DEFAULT_PORT);
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|err| LoadError::invalid("server.host", format!("{err}")))?;
        let graceful_shutdown = Duration::from_secs(
            raw.server
                .graceful_shutdown_seconds
                .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS),
        );

        let level = match raw.logging.level.as_deref() {
            Some(value) => LevelFilter::from_str(value)
                .map_err(|err| LoadError::invalid("logging.level", err.to_string()))?,
            None => LevelFilter::INFO,
        };
        let format = if raw.logging.json.unwrap_or(false) {
            LogFormat::Json
        } else {
            LogFormat::Compact
        };

        let database_url = raw
            .database
            .url
            .ok_or_else(|| LoadError::invalid("database.url", "a connection URL is required"))?;
        let max_connections = raw
            .database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
        let max_connections = NonZeroU32::new(max_connections)
            .ok_or_else(|| LoadError::invalid("database.max_connections", "must be non-zero"))?;

        let github = GithubSettings {
            client_id: raw.github.client_id.ok_or_else(|| {
                LoadError::invalid("github.client_id", "an OAuth client id is required")
            })?,
            client_secret: raw.github.client_secret.ok_or_else(|| {
                LoadError::invalid("github.client_secret", "an OAuth client secret is required")
            })?,
            allowed_user: raw.github.allowed_user.ok_or_else(|| {
                LoadError::invalid("github.allowed_user", "the allowed username is required")
            })?,
            token_url: raw
                .github
                .token_url
                .unwrap_or_else(|| DEFAULT_GITHUB_TOKEN_URL.to_string()),
            user_url: raw
                .github
                .user_url
                .unwrap_or_else(|| DEFAULT_GITHUB_USER_URL.to_string()),
            http_timeout: Duration::from_secs(
                raw.github
                    .http_timeout_seconds
                    .unwrap_or(DEFAULT_GITHUB_TIMEOUT_SECS),
            ),
        };

        let session = SessionSettings {
            secret: raw
                .session
                .secret
                .ok_or_else(|| LoadError::invalid("session.secret", "a signing key is required"))?,
            cookie_name: raw
                .session
                .cookie_name
                .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string()),
        };

        let site = SiteSettings {
            title: raw.site.title.unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string()),
            public_url: raw
                .site
                .public_url
                .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string()),
        };

        Ok(Settings {
            server: ServerSettings {
                addr,
                graceful_shutdown,
            },
            logging: LoggingSettings { level, format },
            database: DatabaseSettings {
                url: database_url,
                max_connections,
            },
            github,
            session,
            site,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_with_required() -> RawSettings {
        let mut raw = RawSettings::default();
        raw.database.url = Some("postgres://localhost/penna".to_string());
        raw.github.client_id = Some("id".to_string());
        raw.github.client_secret = Some("secret".to_string());
        raw.github.allowed_user = Some("octocat".to_string());
        raw.session.secret = Some("signing-key".to_string());
        raw
    }

    #[test]
    fn defaults_fill_the_gaps() {
        let settings = Settings::from_raw(raw_with_required()).unwrap();
        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(settings.session.cookie_name, "token");
        assert_eq!(settings.github.token_url, DEFAULT_GITHUB_TOKEN_URL);
    }

    #[test]
    fn missing_database_url_is_rejected() {
        let mut raw = raw_with_required();
        raw.database.url = None;
        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn cli_overrides_win() {
        let mut raw = raw_with_required();
        raw.apply_serve_overrides(&ServeOverrides {
            server_port: Some(8080),
            log_json: Some(true),
            ..ServeOverrides::default()
        });
        let settings = Settings::from_raw(raw).unwrap();
        assert_eq!(settings.server.addr.port(), 8080);
        assert!(matches!(settings.logging.format, LogFormat::Json));
    }
}
