use secrecy::SecretString;

use crate::client::consts::{API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_VERSION};
use crate::types::InputFormat;

/// Immutable client configuration, fixed at construction.
pub struct Config {
    base_url: String,
    api_key: SecretString,
    version: String,
    input_format: InputFormat,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.config.api_key = SecretString::from(api_key.to_string());
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.config.version = version.to_string();
        self
    }

    pub fn with_input_format(mut self, input_format: InputFormat) -> Self {
        self.config.input_format = input_format;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Config {
    /// Defaults: production endpoint, API key from the environment, and
    /// 44.1 kHz PCM input.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: std::env::var(API_KEY_ENV).unwrap_or_default().into(),
            version: DEFAULT_VERSION.to_string(),
            input_format: InputFormat::Pcm44100,
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn input_format(&self) -> InputFormat {
        self.input_format
    }
}
