//! Runtime configuration for the server and client.
//!
//! Values come from the command line first and fall back to environment
//! variables (`CCHAT_PORT`, `CCHAT_HOST`, `CCHAT_NAME`). Everything is
//! validated here, so sessions only ever see well-formed settings.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::command::is_valid_user_name;

/// Environment fallback for `--port`.
pub const PORT_ENV: &str = "CCHAT_PORT";
/// Environment fallback for `--host`.
pub const HOST_ENV: &str = "CCHAT_HOST";
/// Environment fallback for `--name`.
pub const NAME_ENV: &str = "CCHAT_NAME";
/// Client log file override.
pub const LOG_FILE_ENV: &str = "CCHAT_LOG_FILE";

/// Settings for `cchat server`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port to listen on, on all interfaces.
    pub port: u16,
}

impl ServerConfig {
    /// Resolve from an optional CLI value plus environment fallback.
    pub fn resolve(port: Option<String>) -> Result<Self> {
        let port = from_arg_or_env(port, PORT_ENV, "port")?;
        Ok(Self {
            port: parse_port(&port)?,
        })
    }

    /// Address the listener binds.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.port))
    }
}

/// Settings for `cchat client`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// User name to log in as.
    pub name: String,
    /// Server IPv4 address.
    pub host: Ipv4Addr,
    /// Server port.
    pub port: u16,
}

impl ClientConfig {
    /// Resolve from optional CLI values plus environment fallback.
    pub fn resolve(
        name: Option<String>,
        host: Option<String>,
        port: Option<String>,
    ) -> Result<Self> {
        let name = from_arg_or_env(name, NAME_ENV, "name")?;
        let host = from_arg_or_env(host, HOST_ENV, "host")?;
        let port = from_arg_or_env(port, PORT_ENV, "port")?;

        Ok(Self {
            name: parse_name(&name)?,
            host: parse_host(&host)?,
            port: parse_port(&port)?,
        })
    }

    /// Address the client connects to.
    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.host, self.port))
    }

    /// Where client logs go: `CCHAT_LOG_FILE`, else the temp directory.
    pub fn log_path() -> PathBuf {
        std::env::var_os(LOG_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("cchat-client.log"))
    }
}

fn from_arg_or_env(arg: Option<String>, env_key: &str, what: &str) -> Result<String> {
    if let Some(value) = arg {
        return Ok(value);
    }
    match std::env::var(env_key) {
        Ok(value) => Ok(value),
        Err(_) => bail!("Missing {what}: pass --{what} or set {env_key}"),
    }
}

/// Port number: ASCII digits only, 1..=65535.
pub fn parse_port(word: &str) -> Result<u16> {
    if word.is_empty() || !word.bytes().all(|b| b.is_ascii_digit()) {
        bail!("Port number is not properly formatted: {word:?}");
    }
    let port: u32 = word
        .parse()
        .with_context(|| format!("Port number is outside the allowed bounds: {word}"))?;
    match u16::try_from(port) {
        Ok(port) if port != 0 => Ok(port),
        _ => bail!("Port number is outside the allowed bounds: {word}"),
    }
}

/// IPv4 literal such as `127.0.0.1`.
pub fn parse_host(word: &str) -> Result<Ipv4Addr> {
    word.parse()
        .with_context(|| format!("Host is not a valid IPv4 address: {word:?}"))
}

/// User name: non-empty, ASCII alphanumeric.
pub fn parse_name(word: &str) -> Result<String> {
    if !is_valid_user_name(word) {
        bail!("User name must be non-empty and alphanumeric: {word:?}");
    }
    Ok(word.to_string())
}
