use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use super::SearchProvider;
use crate::cache::SearchResult;

/// Cliente para la API de búsqueda de Invidious (alternativa a yt-dlp)
pub struct InvidiousClient {
    client: reqwest::Client,
    instance: Url,
}

impl InvidiousClient {
    pub fn new(instance: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .context("Failed to create HTTP client")?;

        let instance = Url::parse(instance)
            .with_context(|| format!("invalid Invidious instance: {instance}"))?;

        Ok(Self { client, instance })
    }

    fn search_url(&self, query: &str) -> Result<Url> {
        let mut url = self.instance.join("api/v1/search")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("type", "video");
        Ok(url)
    }
}

#[async_trait]
impl SearchProvider for InvidiousClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let url = self.search_url(query)?;
        info!("🔍 Buscando en Invidious: {}", query);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Invidious request failed")?;

        let status = response.status();
        if !status.is_success() {
            warn!("❌ Invidious respondió {}", status);
            anyhow::bail!("Invidious returned {}", status);
        }

        let mut results: Vec<SearchResult> = response
            .json()
            .await
            .context("Invidious returned invalid JSON")?;
        results.truncate(limit);

        info!("✅ Invidious: {} resultados para {}", results.len(), query);
        Ok(results)
    }

    fn source_name(&self) -> &'static str {
        "Invidious"
    }
}
