use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::{Error, Result};

/// Client configuration.
///
/// Deserializable from any serde format, using camelCase option names.
///
/// ```
/// use barehttp::Config;
///
/// let config: Config = serde_json::from_str(r#"{
///     "maxRedirects": 2,
///     "timeout": 5,
///     "ssl": { "verifyPeerName": false }
/// }"#).unwrap();
///
/// assert!(config.follow_location);
/// assert_eq!(config.max_redirects, 2);
/// assert!(!config.ssl.verify_peer_name);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Follow 3xx responses with a `Location` header.
    pub follow_location: bool,

    /// Redirects a single call may follow.
    pub max_redirects: u32,

    /// Connect timeout.
    #[serde(deserialize_with = "seconds")]
    pub timeout: Duration,

    /// Restrict TLS to one protocol version.
    pub ssl_protocol: Option<TlsVersion>,

    pub ssl: TlsOptions,

    /// Largest response head accepted, in bytes.
    pub max_head_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            follow_location: true,
            max_redirects: 5,
            timeout: Duration::from_secs(30),
            ssl_protocol: None,
            ssl: TlsOptions::default(),
            max_head_size: 64 * 1024,
        }
    }
}

impl Config {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be positive".into()));
        }
        // Must at least fit the terminating CRLFCRLF.
        if self.max_head_size < 4 {
            return Err(Error::InvalidConfig(format!(
                "maxHeadSize too small: {}",
                self.max_head_size
            )));
        }
        Ok(())
    }
}

/// Certificate verification options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TlsOptions {
    pub verify_peer: bool,
    pub verify_peer_name: bool,
    pub allow_self_signed: bool,
    /// PEM bundle of extra trusted certificates.
    pub cafile: Option<PathBuf>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        TlsOptions {
            verify_peer: true,
            verify_peer_name: true,
            allow_self_signed: false,
            cafile: None,
        }
    }
}

impl TlsOptions {
    pub(crate) fn is_strict(&self) -> bool {
        self.verify_peer && self.verify_peer_name && !self.allow_self_signed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum TlsVersion {
    Tls12,
    Tls13,
}

impl FromStr for TlsVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let norm = s.to_ascii_lowercase().replace('v', "").replace('_', ".");
        match norm.as_str() {
            "tls1.2" => Ok(TlsVersion::Tls12),
            "tls1.3" => Ok(TlsVersion::Tls13),
            _ => Err(Error::InvalidConfig(format!("unknown sslProtocol: {}", s))),
        }
    }
}

impl TryFrom<String> for TlsVersion {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsVersion::Tls12 => write!(f, "TLSv1.2"),
            TlsVersion::Tls13 => write!(f, "TLSv1.3"),
        }
    }
}

fn seconds<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Duration, D::Error> {
    Ok(Duration::from_secs(u64::deserialize(d)?))
}
