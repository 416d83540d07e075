//! Request signing for the exchange's private REST endpoints.
//!
//! Each private request carries four headers: the API key, the passphrase,
//! a timestamp, and a base64 HMAC-SHA256 over
//! `timestamp + METHOD + request_path + body`, keyed with the
//! base64-decoded API secret.

use base64::prelude::*;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{BotError, Result};

type HmacSha256 = Hmac<Sha256>;

/// API key bundle for one environment (production or sandbox)
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
}

/// Headers for one signed request
#[derive(Debug, Clone)]
pub struct AuthHeaders {
    pub api_key: String,
    pub signature: String,
    pub timestamp: String,
    pub passphrase: String,
}

impl ApiCredentials {
    /// Sign a request made at `timestamp` (epoch seconds)
    pub fn sign(&self, timestamp: &str, method: &str, request_path: &str, body: &str) -> Result<String> {
        let secret = BASE64_STANDARD
            .decode(self.api_secret.trim())
            .map_err(|e| BotError::Signing(format!("API secret is not valid base64: {e}")))?;

        let mut mac = HmacSha256::new_from_slice(&secret)
            .map_err(|e| BotError::Signing(e.to_string()))?;
        let prehash = format!("{}{}{}{}", timestamp, method.to_uppercase(), request_path, body);
        mac.update(prehash.as_bytes());

        Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
    }

    pub fn headers(&self, timestamp: &str, method: &str, request_path: &str, body: &str) -> Result<AuthHeaders> {
        Ok(AuthHeaders {
            api_key: self.api_key.clone(),
            signature: self.sign(timestamp, method, request_path, body)?,
            timestamp: timestamp.to_string(),
            passphrase: self.passphrase.clone(),
        })
    }
}

impl AuthHeaders {
    /// Apply auth headers to a reqwest RequestBuilder
    pub fn apply(self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("CB-ACCESS-KEY", self.api_key)
            .header("CB-ACCESS-SIGN", self.signature)
            .header("CB-ACCESS-TIMESTAMP", self.timestamp)
            .header("CB-ACCESS-PASSPHRASE", self.passphrase)
    }
}
