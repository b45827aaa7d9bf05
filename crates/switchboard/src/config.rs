//! Server configuration.

use serde::{Deserialize, Serialize};
use switchboard_protocol::{DEFAULT_MAX_FRAME_LEN, TERMINATOR};

use crate::SwitchboardError;

/// Address the server listens on unless configured otherwise.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8888";

const ENV_BIND: &str = "SWITCHBOARD_BIND";
const ENV_SERVER_NAME: &str = "SWITCHBOARD_SERVER_NAME";
const ENV_MAX_FRAME_LEN: &str = "SWITCHBOARD_MAX_FRAME_LEN";

/// Settings for a [`SwitchboardServer`](crate::SwitchboardServer).
///
/// Every field has a default, so a partial config (from a file or the
/// environment) only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on, `host:port`.
    pub bind_addr: String,

    /// Name reported to `N` requests. When unset, the host name is looked
    /// up on every request.
    pub server_name: Option<String>,

    /// Name reported when the host name lookup fails.
    pub hostname_fallback: String,

    /// Text placed before the entries of an `L` response.
    pub list_header: String,

    /// Longest accepted frame in bytes; longer frames are dropped.
    pub max_frame_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            server_name: None,
            hostname_fallback: "Server-Unknown".to_string(),
            list_header: "=== Online Clients === ".to_string(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl ServerConfig {
    /// Defaults overlaid with `SWITCHBOARD_BIND`,
    /// `SWITCHBOARD_SERVER_NAME` and `SWITCHBOARD_MAX_FRAME_LEN`.
    ///
    /// # Errors
    /// Returns [`SwitchboardError::Config`] if a variable is set but
    /// unusable.
    pub fn from_env() -> Result<Self, SwitchboardError> {
        let config = Self::default().overlay(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that would break the server at request time.
    ///
    /// Text that ends up in a response must not contain the frame
    /// terminator, or the response could not be framed.
    ///
    /// # Errors
    /// Returns [`SwitchboardError::Config`] naming the first bad field.
    pub fn validate(&self) -> Result<(), SwitchboardError> {
        if self.bind_addr.trim().is_empty() {
            return Err(SwitchboardError::Config("bind_addr is empty".into()));
        }
        if self.max_frame_len == 0 {
            return Err(SwitchboardError::Config(
                "max_frame_len must be positive".into(),
            ));
        }
        let texts = [
            ("server_name", self.server_name.as_deref().unwrap_or_default()),
            ("hostname_fallback", self.hostname_fallback.as_str()),
            ("list_header", self.list_header.as_str()),
        ];
        for (field, value) in texts {
            if value.as_bytes().contains(&TERMINATOR) {
                return Err(SwitchboardError::Config(format!(
                    "{field} must not contain a line break"
                )));
            }
        }
        Ok(())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its
    /// value if set.
    fn overlay(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SwitchboardError> {
        if let Some(bind) = lookup(ENV_BIND) {
            if bind.trim().is_empty() {
                return Err(SwitchboardError::Config(format!(
                    "{ENV_BIND} is empty"
                )));
            }
            self.bind_addr = bind;
        }
        if let Some(name) = lookup(ENV_SERVER_NAME) {
            self.server_name = Some(name).filter(|n| !n.is_empty());
        }
        if let Some(raw) = lookup(ENV_MAX_FRAME_LEN) {
            self.max_frame_len = match raw.trim().parse::<usize>() {
                Ok(len) if len > 0 => len,
                _ => {
                    return Err(SwitchboardError::Config(format!(
                        "{ENV_MAX_FRAME_LEN} must be a positive integer, got {raw:?}"
                    )));
                }
            };
        }
        Ok(self)
    }
}
