//! Gateway configuration

use crate::error::{GatewayError, GatewayResult};
use crate::{legacy, soap};
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::fmt;

/// Environment variable holding the API login id
pub const ENV_LOGIN_ID: &str = "AUTHORIZE_LOGIN_ID";
/// Environment variable holding the transaction key
pub const ENV_TRANSACTION_KEY: &str = "AUTHORIZE_TRANSACTION_KEY";
/// Environment variable selecting sandbox endpoints
pub const ENV_DEBUG: &str = "AUTHORIZE_DEBUG";
/// Environment variable setting the legacy test-request flag
pub const ENV_TEST: &str = "AUTHORIZE_TEST";

/// Credentials and endpoint selection.
///
/// `debug` (the default) points every adapter at the sandbox. `test` only
/// sets the test-request flag of the delimited protocol, which processes
/// requests without charging even on production endpoints.
pub struct GatewayConfig {
    login_id: String,
    transaction_key: SecretString,
    debug: bool,
    test: bool,
    legacy_endpoint: Option<String>,
    soap_endpoint: Option<String>,
}

impl GatewayConfig {
    /// Sandbox configuration for the given credentials
    pub fn new(login_id: impl Into<String>, transaction_key: impl Into<String>) -> Self {
        Self {
            login_id: login_id.into(),
            transaction_key: SecretString::new(transaction_key.into().into()),
            debug: true,
            test: false,
            legacy_endpoint: None,
            soap_endpoint: None,
        }
    }

    /// Use production endpoints
    pub fn production(mut self) -> Self {
        self.debug = false;
        self
    }

    /// Set the sandbox flag
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the legacy test-request flag
    pub fn test_mode(mut self, test: bool) -> Self {
        self.test = test;
        self
    }

    /// Post delimited transactions to `url` instead of the processor
    pub fn legacy_endpoint(mut self, url: impl Into<String>) -> Self {
        self.legacy_endpoint = Some(url.into());
        self
    }

    /// Post SOAP calls to `url` instead of the processor
    pub fn soap_endpoint(mut self, url: impl Into<String>) -> Self {
        self.soap_endpoint = Some(url.into());
        self
    }

    /// Load from `AUTHORIZE_*` environment variables.
    ///
    /// Login id and transaction key are required; `AUTHORIZE_DEBUG` defaults
    /// to true and `AUTHORIZE_TEST` to false.
    pub fn from_env() -> GatewayResult<Self> {
        let login_id = required_var(ENV_LOGIN_ID)?;
        let transaction_key = required_var(ENV_TRANSACTION_KEY)?;
        let debug = flag_var(ENV_DEBUG, true)?;
        let test = flag_var(ENV_TEST, false)?;

        let config = Self::new(login_id, transaction_key)
            .debug(debug)
            .test_mode(test);
        config.validate()?;
        Ok(config)
    }

    pub fn login_id(&self) -> &str {
        &self.login_id
    }

    pub fn transaction_key(&self) -> &SecretString {
        &self.transaction_key
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn test(&self) -> bool {
        self.test
    }

    /// Endpoint for the delimited protocol
    pub fn legacy_url(&self) -> &str {
        match &self.legacy_endpoint {
            Some(url) => url.as_str(),
            None if self.debug => legacy::TEST_URL,
            None => legacy::PRODUCTION_URL,
        }
    }

    /// Endpoint for the profile and subscription services
    pub fn soap_url(&self) -> &str {
        match &self.soap_endpoint {
            Some(url) => url.as_str(),
            None if self.debug => soap::TEST_URL,
            None => soap::PRODUCTION_URL,
        }
    }

    /// Check credentials are present and endpoints parse as URLs
    pub fn validate(&self) -> GatewayResult<()> {
        if self.login_id.trim().is_empty() {
            return Err(GatewayError::Config("login id is empty".to_string()));
        }
        if self.transaction_key.expose_secret().trim().is_empty() {
            return Err(GatewayError::Config("transaction key is empty".to_string()));
        }
        for url in [self.legacy_url(), self.soap_url()] {
            url::Url::parse(url)
                .map_err(|e| GatewayError::Config(format!("invalid endpoint '{}': {}", url, e)))?;
        }
        Ok(())
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("login_id", &self.login_id)
            .field("transaction_key", &"[REDACTED]")
            .field("debug", &self.debug)
            .field("test", &self.test)
            .field("legacy_url", &self.legacy_url())
            .field("soap_url", &self.soap_url())
            .finish()
    }
}

fn required_var(name: &str) -> GatewayResult<String> {
    env::var(name).map_err(|_| GatewayError::Config(format!("{} is not set", name)))
}

fn flag_var(name: &str, default: bool) -> GatewayResult<bool> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(value) => parse_flag(&value)
            .ok_or_else(|| GatewayError::Config(format!("{} must be a boolean, got '{}'", name, value))),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
