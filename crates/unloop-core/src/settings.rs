use crate::error::{Result, UnloopError};
use crate::reconcile::RECENT_FOLLOWERS_LIMIT;
use crate::types::SubjectId;
use config as cfg;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Upstream page size ceiling for the follow-list endpoints.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnloopConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub collector: CollectorConfig,

    /// Subject analyzed when no identity context supplies one.
    #[serde(default = "default_subject")]
    pub default_subject: u64,

    /// Size of the "newest followers" view.
    #[serde(default = "default_recent_followers")]
    pub recent_followers: usize,
}

impl Default for UnloopConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            collector: CollectorConfig::default(),
            default_subject: default_subject(),
            recent_followers: default_recent_followers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sent as the `api_key` header on every request. Falls back to
    /// `NEYNAR_API_KEY` when not configured.
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Viewer context passed alongside every lookup.
    #[serde(default = "default_viewer_fid")]
    pub viewer_fid: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            viewer_fid: default_viewer_fid(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Hard ceiling on pages requested per collection.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Pause between consecutive page requests.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            page_delay_ms: default_page_delay_ms(),
        }
    }
}

impl CollectorConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// Page size clamped into what the upstream accepts.
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

fn default_base_url() -> String {
    "https://api.neynar.com/v2".to_string()
}

fn default_viewer_fid() -> u64 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("unloop/{}", env!("CARGO_PKG_VERSION"))
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_max_pages() -> usize {
    25
}

fn default_page_delay_ms() -> u64 {
    50
}

fn default_subject() -> u64 {
    19267
}

fn default_recent_followers() -> usize {
    RECENT_FOLLOWERS_LIMIT
}

/// Where [`UnloopConfig::load_from`] reads from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Layered in order, skipped when absent.
    pub optional_files: Vec<PathBuf>,
    /// Must exist; overrides the optional files.
    pub explicit: Option<PathBuf>,
    /// Read `UNLOOP__*` and `NEYNAR_API_KEY`.
    pub environment: bool,
}

impl ConfigSources {
    /// User file, working-directory file, `explicit`, then the environment.
    pub fn standard(explicit: Option<&Path>) -> Self {
        let mut optional_files: Vec<PathBuf> =
            UnloopConfig::default_config_path().into_iter().collect();
        optional_files.push(PathBuf::from("unloop.toml"));
        Self {
            optional_files,
            explicit: explicit.map(Path::to_path_buf),
            environment: true,
        }
    }

    /// Only `path`; nothing from the machine or the environment.
    pub fn file_only(path: impl Into<PathBuf>) -> Self {
        Self {
            explicit: Some(path.into()),
            ..Self::default()
        }
    }
}

impl UnloopConfig {
    /// Default user-level config file: `~/.unloop/config.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".unloop").join("config.toml"))
    }

    /// Loads configuration from, in increasing priority:
    /// 1. `~/.unloop/config.toml`
    /// 2. `./unloop.toml`
    /// 3. `explicit` (must exist when given)
    /// 4. `UNLOOP__*` environment variables (`UNLOOP__API__VIEWER_FID=3`)
    ///
    /// The API key additionally falls back to `NEYNAR_API_KEY`.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_from(&ConfigSources::standard(explicit))
    }

    pub fn load_from(sources: &ConfigSources) -> Result<Self> {
        let mut builder = cfg::Config::builder();
        for path in &sources.optional_files {
            builder = builder.add_source(cfg::File::from(path.clone()).required(false));
        }
        if let Some(path) = &sources.explicit {
            info!("Loading configuration from {:?}", path);
            builder = builder.add_source(cfg::File::from(path.clone()).required(true));
        }
        if sources.environment {
            builder = builder.add_source(
                cfg::Environment::with_prefix("UNLOOP")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let mut config: UnloopConfig = builder.build()?.try_deserialize()?;
        if sources.environment && config.api.api_key.is_none() {
            if let Ok(key) = std::env::var("NEYNAR_API_KEY") {
                debug!("Using API key from NEYNAR_API_KEY");
                config.api.api_key = Some(SecretString::from(key));
            }
        }
        Ok(config)
    }

    /// Loads a single file without consulting the environment.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config = cfg::Config::builder()
            .add_source(cfg::File::from(path.to_path_buf()).required(true))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn default_subject_id(&self) -> Result<SubjectId> {
        SubjectId::new(self.default_subject)
    }

    pub fn validate(&self) -> Result<()> {
        match &self.api.api_key {
            Some(key) if !key.expose_secret().trim().is_empty() => {}
            _ => {
                return Err(UnloopError::Config(
                    "API key is required. Set NEYNAR_API_KEY or api.api_key.".to_string(),
                ))
            }
        }
        url::Url::parse(&self.api.base_url).map_err(|e| {
            UnloopError::Config(format!("invalid api.base_url '{}': {}", self.api.base_url, e))
        })?;
        if self.collector.page_size == 0 {
            return Err(UnloopError::Config(
                "collector.page_size must be at least 1".to_string(),
            ));
        }
        if self.collector.max_pages == 0 {
            return Err(UnloopError::Config(
                "collector.max_pages must be at least 1".to_string(),
            ));
        }
        self.default_subject_id()
            .map_err(|e| UnloopError::Config(format!("default_subject: {}", e)))?;
        Ok(())
    }
}
