use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::core::error::ToolError;
use crate::domain::Credentials;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/abcontrol/abcontrol.yaml";
pub const CONFIG_PATH_ENV: &str = "ABCONTROL_CONFIG";

/// BECS ExtAPI settings, read from the `becs.eapi` section.
#[derive(Clone, PartialEq, Eq)]
pub struct BecsConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BecsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BecsConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl BecsConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ToolError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ToolError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let cfg = Self::from_yaml(&raw)
            .map_err(|e| ToolError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), url = %cfg.url, username = %cfg.username, "config loaded");
        Ok(cfg)
    }

    /// Parse and validate the document. Other top-level sections are ignored.
    pub fn from_yaml(raw: &str) -> Result<Self, String> {
        let file: FileWire = serde_yaml::from_str(raw).map_err(|e| e.to_string())?;
        let eapi = file
            .becs
            .ok_or("missing section 'becs'")?
            .eapi
            .ok_or("missing section 'becs.eapi'")?;
        Ok(Self {
            url: required(eapi.url, "url")?,
            username: required(eapi.username, "username")?,
            password: required(eapi.password, "password")?,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(format!("field 'becs.eapi.{}' is empty", field)),
        None => Err(format!("missing field 'becs.eapi.{}'", field)),
    }
}

#[derive(Deserialize)]
struct FileWire {
    becs: Option<BecsWire>,
}

#[derive(Deserialize)]
struct BecsWire {
    eapi: Option<EapiWire>,
}

#[derive(Deserialize)]
struct EapiWire {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
}
