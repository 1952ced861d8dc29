//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{CliArgs, Command, RenderArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "yander";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DESTINATION_TIMEOUT_SECS: u64 = 5;
const DEFAULT_EMAIL_API_BASE: &str = "https://api.resend.com";
const DEFAULT_EMAIL_FROM: &str = "Yander <notifications@yander.dev>";
const DEFAULT_CRM_API_BASE: &str = "https://api.hubapi.com";
const DEFAULT_CONTENT_DATASET: &str = "production";
const DEFAULT_CONTENT_API_VERSION: &str = "2024-01-01";
const DEFAULT_POSTS_PER_PAGE: u64 = 9;
const DEFAULT_INTEGRATIONS_PER_PAGE: u64 = 12;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub destinations: DestinationSettings,
    pub content: ContentSettings,
    pub listing: ListingSettings,
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

/// External form destinations. A destination without credentials is `None`
/// and gets skipped at dispatch time.
#[derive(Debug, Clone)]
pub struct DestinationSettings {
    pub timeout: Duration,
    pub email: Option<EmailSettings>,
    pub crm: Option<CrmSettings>,
    pub spreadsheet: Option<SpreadsheetSettings>,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub api_key: String,
    pub api_base: Url,
    pub from: String,
    pub sales_inbox: String,
}

#[derive(Debug, Clone)]
pub struct CrmSettings {
    pub access_token: String,
    pub api_base: Url,
}

#[derive(Debug, Clone)]
pub struct SpreadsheetSettings {
    pub webhook_url: Url,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    /// Content routes answer 503 while this is unset.
    pub project_id: Option<String>,
    pub dataset: String,
    pub api_version: String,
    pub use_cdn: bool,
    pub token: Option<String>,
    /// Replaces the query host derived from the project id.
    pub api_base: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct ListingSettings {
    pub posts_per_page: NonZeroU32,
    pub integrations_per_page: NonZeroU32,
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

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("YANDER").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Render(_)) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    destinations: RawDestinationSettings,
    content: RawContentSettings,
    listing: RawListingSettings,
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
        if let Some(seconds) = overrides.destinations_timeout_seconds {
            self.destinations.timeout_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            destinations,
            content,
            listing,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            destinations: build_destination_settings(destinations)?,
            content: build_content_settings(content)?,
            listing: build_listing_settings(listing)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr =
        parse_socket_addr(&host, port).map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_destination_settings(
    destinations: RawDestinationSettings,
) -> Result<DestinationSettings, LoadError> {
    let timeout_secs = destinations
        .timeout_seconds
        .unwrap_or(DEFAULT_DESTINATION_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "destinations.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let RawDestinationSettings {
        email,
        crm,
        spreadsheet,
        ..
    } = destinations;

    let email = match non_blank(email.api_key) {
        Some(api_key) => {
            let sales_inbox = non_blank(email.sales_inbox).ok_or_else(|| {
                LoadError::invalid(
                    "destinations.email.sales_inbox",
                    "required when an email api key is set",
                )
            })?;
            Some(EmailSettings {
                api_key,
                api_base: parse_url(
                    "destinations.email.api_base",
                    email.api_base.as_deref().unwrap_or(DEFAULT_EMAIL_API_BASE),
                )?,
                from: non_blank(email.from).unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
                sales_inbox,
            })
        }
        None => None,
    };

    let crm = match non_blank(crm.access_token) {
        Some(access_token) => Some(CrmSettings {
            access_token,
            api_base: parse_url(
                "destinations.crm.api_base",
                crm.api_base.as_deref().unwrap_or(DEFAULT_CRM_API_BASE),
            )?,
        }),
        None => None,
    };

    let spreadsheet = match non_blank(spreadsheet.webhook_url) {
        Some(webhook_url) => Some(SpreadsheetSettings {
            webhook_url: parse_url("destinations.spreadsheet.webhook_url", &webhook_url)?,
        }),
        None => None,
    };

    Ok(DestinationSettings {
        timeout: Duration::from_secs(timeout_secs),
        email,
        crm,
        spreadsheet,
    })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let api_base = match non_blank(content.api_base) {
        Some(value) => Some(parse_url("content.api_base", &value)?),
        None => None,
    };

    Ok(ContentSettings {
        project_id: non_blank(content.project_id),
        dataset: non_blank(content.dataset).unwrap_or_else(|| DEFAULT_CONTENT_DATASET.to_string()),
        api_version: non_blank(content.api_version)
            .unwrap_or_else(|| DEFAULT_CONTENT_API_VERSION.to_string()),
        use_cdn: content.use_cdn.unwrap_or(true),
        token: non_blank(content.token),
        api_base,
    })
}

fn build_listing_settings(listing: RawListingSettings) -> Result<ListingSettings, LoadError> {
    Ok(ListingSettings {
        posts_per_page: non_zero_u32(
            listing.posts_per_page.unwrap_or(DEFAULT_POSTS_PER_PAGE),
            "listing.posts_per_page",
        )?,
        integrations_per_page: non_zero_u32(
            listing
                .integrations_per_page
                .unwrap_or(DEFAULT_INTEGRATIONS_PER_PAGE),
            "listing.integrations_per_page",
        )?,
    })
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
struct RawDestinationSettings {
    timeout_seconds: Option<u64>,
    email: RawEmailSettings,
    crm: RawCrmSettings,
    spreadsheet: RawSpreadsheetSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEmailSettings {
    api_key: Option<String>,
    api_base: Option<String>,
    from: Option<String>,
    sales_inbox: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCrmSettings {
    access_token: Option<String>,
    api_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSpreadsheetSettings {
    webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    project_id: Option<String>,
    dataset: Option<String>,
    api_version: Option<String>,
    use_cdn: Option<bool>,
    token: Option<String>,
    api_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawListingSettings {
    posts_per_page: Option<u64>,
    integrations_per_page: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_url(key: &'static str, value: &str) -> Result<Url, LoadError> {
    Url::parse(value.trim()).map_err(|err| LoadError::invalid(key, format!("invalid url: {err}")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;
