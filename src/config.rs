use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::cache::disk_store::StoreLimits;

/// Backend usado para las búsquedas en el catálogo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    Ytdlp,
    Invidious,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    // Servidor
    pub host: String,
    pub port: u16,
    pub worker_threads: usize,

    // yt-dlp
    pub ytdlp_path: String,
    pub extraction_timeout_secs: u64,

    // Búsqueda
    pub search_backend: SearchBackend,
    pub invidious_instance: String,
    pub search_limit: usize,
    pub search_cache_size: usize,

    // Caché en disco
    pub download_dir: PathBuf,
    pub max_files: usize,
    pub max_total_bytes: u64,
    pub allowed_extensions: Vec<String>,
}

impl Config {
    /// Loads configuration from an optional `config` file and the environment.
    ///
    /// Environment keys are the upper-case field names (`MAX_FILES`,
    /// `DOWNLOAD_DIR`, ...). `ALLOWED_EXTENSIONS` is a comma separated list.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config: Self = ::config::Config::builder()
            .add_source(::config::File::with_name("config").required(false))
            .add_source(
                ::config::Environment::default()
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_extensions"),
            )
            .build()?
            .try_deserialize()
            .context("invalid configuration")?;

        let config = config.normalized();

        std::fs::create_dir_all(&config.download_dir).with_context(|| {
            format!("cannot create download dir {}", config.download_dir.display())
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Lower-cases extensions and strips leading dots so `.MP3` and `mp3`
    /// are the same entry.
    fn normalized(mut self) -> Self {
        self.allowed_extensions = self
            .allowed_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Cache limits (files, bytes, search entries) must be greater than 0
    /// - At least one allowed extension
    /// - Timeout, search limit and worker count must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.max_files == 0 {
            anyhow::bail!("MAX_FILES must be greater than 0");
        }

        if self.max_total_bytes == 0 {
            anyhow::bail!("MAX_TOTAL_BYTES must be greater than 0");
        }

        if self.search_cache_size == 0 {
            anyhow::bail!("SEARCH_CACHE_SIZE must be greater than 0");
        }

        if self.allowed_extensions.is_empty() {
            anyhow::bail!("ALLOWED_EXTENSIONS must contain at least one extension");
        }

        if self.extraction_timeout_secs == 0 {
            anyhow::bail!("EXTRACTION_TIMEOUT_SECS must be greater than 0");
        }

        if self.search_limit == 0 {
            anyhow::bail!("SEARCH_LIMIT must be greater than 0");
        }

        if self.worker_threads == 0 {
            anyhow::bail!("WORKER_THREADS must be greater than 0");
        }

        Ok(())
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn store_limits(&self) -> StoreLimits {
        StoreLimits {
            max_files: self.max_files,
            max_total_bytes: self.max_total_bytes,
            allowed_extensions: self.allowed_extensions.clone(),
        }
    }

    /// Returns a summary of the current configuration for logging.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Server: {} ({} workers)\n  \
            Search: {:?}, limit {}, {} cached queries\n  \
            Disk cache: {} ({} files, {} MiB, [{}])\n  \
            Extraction: {} (timeout {})",
            self.bind_address(),
            self.worker_threads,
            self.search_backend,
            self.search_limit,
            self.search_cache_size,
            self.download_dir.display(),
            self.max_files,
            self.max_total_bytes / (1024 * 1024),
            self.allowed_extensions.join(", "),
            self.ytdlp_path,
            humantime::format_duration(self.extraction_timeout()),
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when neither the config file nor the environment
/// provide a value.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            worker_threads: num_cpus::get(),

            ytdlp_path: "yt-dlp".to_string(),
            extraction_timeout_secs: 300,

            search_backend: SearchBackend::Ytdlp,
            invidious_instance: "https://yewtu.be".to_string(),
            search_limit: 10,
            search_cache_size: 15,

            download_dir: "downloads".into(),
            max_files: 10,
            max_total_bytes: 500 * 1024 * 1024, // 500 MiB
            allowed_extensions: vec!["mp3".into(), "webm".into(), "m4a".into()],
        }
    }
}
