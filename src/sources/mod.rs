pub mod destination;
pub mod invidious;
pub mod ytdlp;

use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::{cache::SearchResult, error::ExtractionError};

pub use invidious::InvidiousClient;
pub use ytdlp::YtDlpClient;

/// Catálogo de música consultable por texto
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns at most `limit` opaque result records, in catalog order.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>>;

    /// Nombre del proveedor
    fn source_name(&self) -> &'static str;
}

/// Herramienta externa que descarga y convierte el audio de un video
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Runs the extraction to completion or until the timeout fires.
    async fn extract(&self, video_id: &str, format: &str)
        -> Result<ExtractionOutput, ExtractionError>;
}

/// Captured output of a successful extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionOutput {
    pub stdout: String,
    pub stderr: String,
}

/// URL de YouTube para un video ID
pub fn watch_url(video_id: &str) -> String {
    format!("https://youtube.com/watch?v={video_id}")
}
