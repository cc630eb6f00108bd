use crate::{api_version::ApiVersion, auth::Credentials, client::ReportOptions};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub queue: Queue,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// Inline secret wins; otherwise it is read from `credentials.secret_env`.
    pub fn credentials(&self) -> Result<Credentials> {
        let c = &self.credentials;
        if c.username.is_empty() {
            return Err(anyhow!("credentials.username is not set"));
        }
        let secret = if !c.secret.is_empty() {
            c.secret.clone()
        } else {
            std::env::var(&c.secret_env).with_context(|| {
                format!(
                    "credentials.secret is empty and ${} is not set",
                    c.secret_env
                )
            })?
        };
        Ok(Credentials::new(&c.username, secret))
    }

    pub fn endpoint(&self) -> String {
        if self.api.endpoint.is_empty() {
            self.api.version.default_endpoint().to_string()
        } else {
            self.api.endpoint.clone()
        }
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            max_queue_checks: self.queue.max_checks,
            queue_check_interval: Duration::from_secs(self.queue.check_interval_seconds),
            queue_only: false,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub username: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
}

fn default_secret_env() -> String {
    "SITECAT_SECRET".into()
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            username: "".into(),
            secret: "".into(),
            secret_env: default_secret_env(),
        }
    }
}
impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("username", &self.username)
            .field("secret", &if self.secret.is_empty() { "" } else { "<redacted>" })
            .field("secret_env", &self.secret_env)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Api {
    pub version: ApiVersion,
    /// Empty means the version's default endpoint.
    #[serde(default)]
    pub endpoint: String,
    pub max_transport_attempts: u32,
    pub submit_attempts: u32,
    pub request_timeout_seconds: u64,
}
impl Default for Api {
    fn default() -> Self {
        Self {
            version: ApiVersion::default(),
            endpoint: "".into(),
            max_transport_attempts: crate::client::DEFAULT_TRANSPORT_ATTEMPTS,
            submit_attempts: crate::client::DEFAULT_SUBMIT_ATTEMPTS,
            request_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Queue {
    pub max_checks: u32,
    pub check_interval_seconds: u64,
}
impl Default for Queue {
    fn default() -> Self {
        Self {
            max_checks: 20,
            check_interval_seconds: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub dir: String,
    pub format: OutputFormat,
    pub write_raw_json: bool,
    pub print_summary: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            dir: "out".into(),
            format: OutputFormat::Csv,
            write_raw_json: false,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}
