use regex::Regex;
use std::{
    path::PathBuf,
    sync::{Arc, LazyLock},
};
use tracing::{debug, error, info, warn};

use crate::{
    cache::{DiskArtifactStore, SearchCache, SearchResult, SweepReport},
    error::FetchError,
    sources::{destination::parse_output_filename, AudioExtractor, SearchProvider},
};

pub const DEFAULT_FORMAT: &str = "mp3";
const MIN_QUERY_CHARS: usize = 2;

static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

/// Cómo se obtuvo el archivo pedido
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    AlreadyDownloaded,
    Downloaded,
}

impl DownloadStatus {
    pub fn message(&self) -> &'static str {
        match self {
            Self::AlreadyDownloaded => "Already downloaded",
            Self::Downloaded => "Downloaded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub status: DownloadStatus,
    pub filename: String,
}

impl DownloadOutcome {
    /// Path under which the file routes serve this artifact.
    pub fn retrieval_url(&self) -> String {
        format!("/file/{}", urlencoding::encode(&self.filename))
    }
}

/// Runs search and download requests against the two caches and the
/// external collaborators.
///
/// Collaborator calls never happen while a cache lock is held: the caches
/// lock internally for the duration of a single operation only.
pub struct RequestCoordinator {
    search_cache: SearchCache,
    disk_store: Arc<DiskArtifactStore>,
    searcher: Arc<dyn SearchProvider>,
    extractor: Arc<dyn AudioExtractor>,
    search_limit: usize,
}

impl RequestCoordinator {
    pub fn new(
        search_cache: SearchCache,
        disk_store: Arc<DiskArtifactStore>,
        searcher: Arc<dyn SearchProvider>,
        extractor: Arc<dyn AudioExtractor>,
        search_limit: usize,
    ) -> Self {
        Self {
            search_cache,
            disk_store,
            searcher,
            extractor,
            search_limit,
        }
    }

    pub fn search_cache(&self) -> &SearchCache {
        &self.search_cache
    }

    pub fn disk_store(&self) -> &Arc<DiskArtifactStore> {
        &self.disk_store
    }

    /// Cached results for `query`, or a fresh catalog search that is then
    /// cached. Failed searches are never cached.
    pub async fn search(&self, query: Option<&str>) -> Result<Vec<SearchResult>, FetchError> {
        let key = normalize_query(query)?;

        if let Some(results) = self.search_cache.get(&key) {
            debug!("💾 Búsqueda desde caché: {}", key);
            return Ok(results);
        }

        let results = self
            .searcher
            .search(&key, self.search_limit)
            .await
            .map_err(|e| {
                error!("❌ Error de búsqueda para '{}': {:#}", key, e);
                FetchError::SearchFailed(format!("{e:#}"))
            })?;

        self.search_cache.put(key, results.clone());
        Ok(results)
    }

    /// Serves `{id}.{format}` from disk, extracting it first on a miss.
    ///
    /// The eviction sweep runs after every extraction attempt, failed ones
    /// included, since the tool may have written a file before failing.
    pub async fn download(
        &self,
        video_id: Option<&str>,
        format: Option<&str>,
    ) -> Result<DownloadOutcome, FetchError> {
        let (video_id, format) = self.validate_download(video_id, format)?;

        if let Some(path) = self.lookup(&video_id, &format).await {
            let filename = file_name_of(&path).unwrap_or_else(|| format!("{video_id}.{format}"));
            return Ok(DownloadOutcome {
                status: DownloadStatus::AlreadyDownloaded,
                filename,
            });
        }

        let extraction = self.extractor.extract(&video_id, &format).await;
        self.sweep().await;

        let output = extraction.inspect_err(|e| {
            error!("❌ Falló la extracción de {}: {}", video_id, e);
        })?;

        let filename = parse_output_filename(&output.stdout).ok_or_else(|| {
            warn!(
                "⚠️ No se encontró el archivo de salida para {} en la salida de yt-dlp",
                video_id
            );
            FetchError::ExtractionOutputUnparseable
        })?;

        info!("✅ Descargado {} -> {}", video_id, filename);
        Ok(DownloadOutcome {
            status: DownloadStatus::Downloaded,
            filename,
        })
    }

    fn validate_download(
        &self,
        video_id: Option<&str>,
        format: Option<&str>,
    ) -> Result<(String, String), FetchError> {
        let video_id = video_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| FetchError::validation("Missing video ID"))?;

        if !VIDEO_ID.is_match(video_id) {
            return Err(FetchError::validation("Invalid video ID"));
        }

        let format = format
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_FORMAT)
            .to_ascii_lowercase();

        if !self.disk_store.limits().allows_extension(&format) {
            return Err(FetchError::validation(format!(
                "Unsupported audio format: {format}"
            )));
        }

        Ok((video_id.to_string(), format))
    }

    async fn lookup(&self, video_id: &str, format: &str) -> Option<PathBuf> {
        let store = self.disk_store.clone();
        let (video_id, format) = (video_id.to_string(), format.to_string());

        tokio::task::spawn_blocking(move || store.exists(&video_id, &format))
            .await
            .unwrap_or_else(|e| {
                warn!("⚠️ Consulta de caché de disco abortada: {}", e);
                None
            })
    }

    /// Runs the eviction sweep off the async workers.
    pub async fn sweep(&self) -> SweepReport {
        let store = self.disk_store.clone();

        tokio::task::spawn_blocking(move || store.after_write())
            .await
            .unwrap_or_else(|e| {
                warn!("⚠️ Barrido de caché abortado: {}", e);
                SweepReport::default()
            })
    }
}

/// Trims the query and enforces the minimum length.
pub fn normalize_query(query: Option<&str>) -> Result<String, FetchError> {
    match query.map(str::trim) {
        Some(q) if q.chars().count() >= MIN_QUERY_CHARS => Ok(q.to_string()),
        _ => Err(FetchError::validation("Missing or too short query")),
    }
}

fn file_name_of(path: &std::path::Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
