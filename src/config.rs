//! Settings file loading.
//!
//! `settings.conf` is an INI file with one section per environment:
//!
//! ```ini
//! [production]
//! API_KEY = ...
//! SECRET_KEY = ...
//! PASSPHRASE = ...
//! NOTIFY_URL = https://hooks.example.com/trailbot
//!
//! [sandbox]
//! ...
//! ```
//!
//! Any key can be overridden from the environment as
//! `TRAILBOT_<SECTION>__<KEY>`, e.g. `TRAILBOT_SANDBOX__PASSPHRASE`.

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

use crate::api::{ApiCredentials, PRODUCTION_API_URL, SANDBOX_API_URL};
use crate::Result;

const ENV_PREFIX: &str = "TRAILBOT";

/// Credentials and endpoints for one exchange environment
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(alias = "API_KEY")]
    pub api_key: String,
    #[serde(alias = "SECRET_KEY")]
    pub secret_key: String,
    #[serde(alias = "PASSPHRASE")]
    pub passphrase: String,
    /// Where outcome notifications go; unset means log only
    #[serde(default, alias = "NOTIFY_URL")]
    pub notify_url: Option<String>,
    #[serde(default, alias = "API_URL")]
    pub api_url: Option<String>,
    #[serde(skip)]
    pub sandbox: bool,
}

impl Settings {
    /// Load the `[sandbox]` or `[production]` section of `path`
    pub fn load(path: impl AsRef<Path>, sandbox: bool) -> Result<Self> {
        let path = path.as_ref().to_string_lossy().to_string();
        let section = if sandbox { "sandbox" } else { "production" };

        let config = Config::builder()
            .add_source(File::new(&path, FileFormat::Ini).required(true))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut settings: Settings = config.get(section)?;
        settings.sandbox = sandbox;

        tracing::debug!("Loaded [{}] settings from {}", section, path);
        Ok(settings)
    }

    /// Exchange base URL, honouring an `API_URL` override
    pub fn api_url(&self) -> &str {
        match self.api_url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) => url,
            None if self.sandbox => SANDBOX_API_URL,
            None => PRODUCTION_API_URL,
        }
    }

    pub fn credentials(&self) -> ApiCredentials {
        ApiCredentials {
            api_key: self.api_key.clone(),
            api_secret: self.secret_key.clone(),
            passphrase: self.passphrase.clone(),
        }
    }
}
