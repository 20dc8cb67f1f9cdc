//! Adapter configuration.
//!
//! Settings are plain key/value lookups through a [`ConfigProvider`], so the
//! same [`CloudFsConfig`] can come from the environment, a TOML file, or a
//! host-supplied map. Construction fails fast and names the missing key.
//!
//! | key                    | required | default                        |
//! |------------------------|----------|--------------------------------|
//! | `access_key_id`        | yes      |                                |
//! | `secret_access_key`    | yes      |                                |
//! | `bucket`               | yes      |                                |
//! | `region`               | yes      |                                |
//! | `endpoint`             | no       | AWS endpoint for the region    |
//! | `public_base_url`      | no       | derived from bucket and region |
//! | `public_read`          | no       | `true`                         |
//! | `request_timeout_secs` | no       | `3600`                         |
//! | `connect_timeout_secs` | no       | `30`                           |
//! | `cache_max_age_secs`   | no       | `31536000` (one year)          |

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

pub const ACCESS_KEY_ID: &str = "access_key_id";
pub const SECRET_ACCESS_KEY: &str = "secret_access_key";
pub const BUCKET: &str = "bucket";
pub const REGION: &str = "region";
pub const ENDPOINT: &str = "endpoint";
pub const PUBLIC_BASE_URL: &str = "public_base_url";
pub const PUBLIC_READ: &str = "public_read";
pub const REQUEST_TIMEOUT_SECS: &str = "request_timeout_secs";
pub const CONNECT_TIMEOUT_SECS: &str = "connect_timeout_secs";
pub const CACHE_MAX_AGE_SECS: &str = "cache_max_age_secs";

/// Uploads can be large and slow; the request timeout covers the whole transfer.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Environment variable prefix used by [`EnvProvider::default`].
pub const DEFAULT_ENV_PREFIX: &str = "CLOUDFS_";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is absent or empty.
    #[error("missing required setting: {key}")]
    Missing { key: String },

    /// A setting could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },

    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML.
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Key/value source of settings.
pub trait ConfigProvider: Send + Sync {
    /// Look up a setting by key.
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigProvider for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Reads settings from `<PREFIX><UPPERCASE_KEY>` environment variables.
#[derive(Debug, Clone)]
pub struct EnvProvider {
    prefix: String,
}

impl Default for EnvProvider {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_PREFIX)
    }
}

impl EnvProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Variable name consulted for `key`.
    pub fn var_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_ascii_uppercase())
    }
}

impl ConfigProvider for EnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.var_name(key)).ok()
    }
}

/// Settings from a flat TOML table.
///
/// ```toml
/// access_key_id = "AKIA..."
/// secret_access_key = "..."
/// bucket = "cms-uploads"
/// region = "eu-west-1"
/// request_timeout_secs = 600
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileProvider {
    values: HashMap<String, String>,
}

impl FileProvider {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let provider = Self::parse(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        tracing::debug!(path = %path.display(), keys = provider.values.len(), "loaded config file");
        Ok(provider)
    }

    /// Parse settings from TOML text. Nested tables and arrays are rejected.
    pub fn parse(content: &str) -> Result<Self, String> {
        let table: toml::Table = content.parse().map_err(|e: toml::de::Error| e.to_string())?;
        let mut values = HashMap::new();
        for (key, value) in table {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => return Err(format!("{key}: expected a scalar, found {}", other.type_str())),
            };
            values.insert(key, value);
        }
        Ok(Self { values })
    }
}

impl ConfigProvider for FileProvider {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Consults providers in order; the first non-empty value wins.
#[derive(Default)]
pub struct Layered {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl Layered {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider with lower priority than those already added.
    pub fn with(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl ConfigProvider for Layered {
    fn get(&self, key: &str) -> Option<String> {
        self.providers
            .iter()
            .filter_map(|p| p.get(key))
            .find(|v| !v.trim().is_empty())
    }
}

/// Everything the adapter and its S3 client need, captured at construction.
#[derive(Clone, PartialEq, Eq)]
pub struct CloudFsConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores (MinIO, R2, ...).
    pub endpoint: Option<String>,
    /// Base for display URLs; see [`CloudFsConfig::public_base_url`].
    pub public_base_url: Option<String>,
    /// Apply the `public-read` canned ACL to written objects.
    pub public_read: bool,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// `max-age` sent with uploads.
    pub cache_max_age: Duration,
}

impl std::fmt::Debug for CloudFsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudFsConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("public_base_url", &self.public_base_url)
            .field("public_read", &self.public_read)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("cache_max_age", &self.cache_max_age)
            .finish()
    }
}

impl CloudFsConfig {
    /// Create a config with the required settings and defaults for the rest.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        bucket: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            bucket: bucket.into(),
            region: region.into(),
            endpoint: None,
            public_base_url: None,
            public_read: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
        }
    }

    /// Build from a provider, failing on the first missing required key.
    pub fn from_provider(provider: &dyn ConfigProvider) -> Result<Self, ConfigError> {
        let mut config = Self::new(
            required(provider, ACCESS_KEY_ID)?,
            required(provider, SECRET_ACCESS_KEY)?,
            required(provider, BUCKET)?,
            required(provider, REGION)?,
        );
        config.endpoint = optional(provider, ENDPOINT);
        config.public_base_url = optional(provider, PUBLIC_BASE_URL);
        if let Some(value) = optional(provider, PUBLIC_READ) {
            config.public_read = parse_bool(PUBLIC_READ, &value)?;
        }
        if let Some(secs) = optional_secs(provider, REQUEST_TIMEOUT_SECS)? {
            config.request_timeout = secs;
        }
        if let Some(secs) = optional_secs(provider, CONNECT_TIMEOUT_SECS)? {
            config.connect_timeout = secs;
        }
        if let Some(secs) = optional_secs(provider, CACHE_MAX_AGE_SECS)? {
            config.cache_max_age = secs;
        }
        Ok(config)
    }

    /// Set a custom endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the display URL base.
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into());
        self
    }

    /// Base URL that object keys are appended to for display, without a
    /// trailing slash.
    pub fn public_base_url(&self) -> String {
        if let Some(url) = &self.public_base_url {
            return url.trim_end_matches('/').to_string();
        }
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), self.bucket),
            None => format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region),
        }
    }

    /// `Cache-Control` value for uploads.
    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.cache_max_age.as_secs())
    }
}

fn optional(provider: &dyn ConfigProvider, key: &str) -> Option<String> {
    provider
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(provider: &dyn ConfigProvider, key: &str) -> Result<String, ConfigError> {
    optional(provider, key).ok_or_else(|| ConfigError::Missing {
        key: key.to_string(),
    })
}

fn optional_secs(provider: &dyn ConfigProvider, key: &str) -> Result<Option<Duration>, ConfigError> {
    optional(provider, key)
        .map(|value| {
            value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid {
                    key: key.to_string(),
                    value,
                })
        })
        .transpose()
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
