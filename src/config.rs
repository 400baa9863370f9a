//! Server options and start-up configuration resolution.
//!
//! Transport settings come from three layers, highest precedence first:
//! options passed to `start()`, command-line flags, environment variables.
//! Anything still unset falls back to built-in defaults.

use {
    crate::{
        framework::handler::InvalidParamsFormatter, health::HealthConfig, limits::ResourceLimits,
        oauth::OAuthConfig, protocol::LoggingLevel,
    },
    clap::Parser,
    std::{fmt, str::FromStr, time::Duration},
    tracing::warn,
};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_ENDPOINT: &str = "/mcp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportType {
    #[default]
    Stdio,
    HttpStream,
}

impl FromStr for TransportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "httpstream" | "http-stream" | "http" => Ok(Self::HttpStream),
            other => Err(format!("Unknown transport: {other}")),
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => f.write_str("stdio"),
            Self::HttpStream => f.write_str("httpStream"),
        }
    }
}

/// One layer of transport settings. Unset fields defer to lower layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartOptions {
    pub transport: Option<TransportType>,
    pub port: Option<u16>,
    pub host: Option<String>,
    pub endpoint: Option<String>,
    pub stateless: Option<bool>,
}

impl StartOptions {
    pub fn stdio() -> Self {
        Self {
            transport: Some(TransportType::Stdio),
            ..Default::default()
        }
    }

    pub fn http(port: u16) -> Self {
        Self {
            transport: Some(TransportType::HttpStream),
            port: Some(port),
            ..Default::default()
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn stateless(mut self, stateless: bool) -> Self {
        self.stateless = Some(stateless);
        self
    }

    /// Read the `MCP_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the environment layer from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let transport = lookup("MCP_TRANSPORT").and_then(|v| match v.parse() {
            Ok(t) => Some(t),
            Err(e) => {
                warn!(value = %v, "Ignoring MCP_TRANSPORT: {}", e);
                None
            }
        });
        let port = lookup("MCP_PORT")
            .or_else(|| lookup("PORT"))
            .and_then(|v| v.trim().parse().ok());
        Self {
            transport,
            port,
            host: lookup("MCP_HOST").filter(|v| !v.is_empty()),
            endpoint: lookup("MCP_ENDPOINT").filter(|v| !v.is_empty()),
            stateless: lookup("MCP_STATELESS").map(|v| parse_flag(&v)),
        }
    }

    /// Fill unset fields from `lower`.
    pub fn or(self, lower: StartOptions) -> Self {
        Self {
            transport: self.transport.or(lower.transport),
            port: self.port.or(lower.port),
            host: self.host.or(lower.host),
            endpoint: self.endpoint.or(lower.endpoint),
            stateless: self.stateless.or(lower.stateless),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Command-line flags understood by every server built on this crate.
///
/// Unknown arguments are ignored so host binaries can define their own.
#[derive(Debug, Clone, Default, Parser)]
#[command(ignore_errors = true, disable_help_flag = true, disable_version_flag = true)]
pub struct CliArgs {
    #[arg(long)]
    pub transport: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub endpoint: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub stateless: Option<String>,
}

impl CliArgs {
    pub fn from_process() -> Self {
        Self::parse_args(std::env::args())
    }

    pub fn parse_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args).unwrap_or_default()
    }

    pub fn into_options(self) -> StartOptions {
        let transport = self.transport.and_then(|v| match v.parse() {
            Ok(t) => Some(t),
            Err(e) => {
                warn!(value = %v, "Ignoring --transport: {}", e);
                None
            }
        });
        StartOptions {
            transport,
            port: self.port,
            host: self.host,
            endpoint: self.endpoint,
            stateless: self.stateless.map(|v| parse_flag(&v)),
        }
    }
}

/// Effective transport configuration after all layers are merged.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub transport: TransportType,
    pub port: u16,
    pub host: String,
    pub endpoint: String,
    pub stateless: bool,
}

/// Merge explicit > CLI > environment > defaults.
pub fn resolve(explicit: StartOptions, cli: StartOptions, env: StartOptions) -> ResolvedConfig {
    let merged = explicit.or(cli).or(env);
    let endpoint = merged.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    let endpoint = if endpoint.starts_with('/') {
        endpoint
    } else {
        format!("/{endpoint}")
    };
    ResolvedConfig {
        transport: merged.transport.unwrap_or_default(),
        port: merged.port.unwrap_or(DEFAULT_PORT),
        host: merged.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
        endpoint,
        stateless: merged.stateless.unwrap_or(false),
    }
}

/// Keep-alive pings sent from server to client.
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// `None` means enabled for HTTP sessions and disabled for stdio.
    pub enabled: Option<bool>,
    pub interval: Duration,
    /// Level at which ping failures are logged.
    pub log_level: LoggingLevel,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            enabled: None,
            interval: Duration::from_secs(5),
            log_level: LoggingLevel::Debug,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RootsConfig {
    pub enabled: bool,
}

impl Default for RootsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Everything a server needs besides its registry and authenticator.
#[derive(Clone)]
pub struct ServerOptions {
    pub name: String,
    pub version: String,
    pub instructions: Option<String>,
    pub keep_alive: KeepAliveConfig,
    pub roots: RootsConfig,
    pub health: HealthConfig,
    pub oauth: OAuthConfig,
    pub limits: ResourceLimits,
    /// Bound on server-initiated requests (roots, ping, sampling).
    pub request_timeout: Duration,
    pub invalid_params_formatter: Option<InvalidParamsFormatter>,
}

impl ServerOptions {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            instructions: None,
            keep_alive: KeepAliveConfig::default(),
            roots: RootsConfig::default(),
            health: HealthConfig::default(),
            oauth: OAuthConfig::default(),
            limits: ResourceLimits::default(),
            request_timeout: Duration::from_secs(5),
            invalid_params_formatter: None,
        }
    }
}

impl fmt::Debug for ServerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerOptions")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("keep_alive", &self.keep_alive)
            .field("roots", &self.roots)
            .field("health", &self.health)
            .field("oauth", &self.oauth)
            .field("limits", &self.limits)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
