use anyhow::{Context, Result};
use async_trait::async_trait;
use std::{path::PathBuf, process::Stdio, time::Duration};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::{watch_url, AudioExtractor, ExtractionOutput, SearchProvider};
use crate::{cache::SearchResult, error::ExtractionError};

/// Las búsquedas no deberían tardar tanto como una descarga
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Cliente que usa el binario de yt-dlp para buscar y extraer audio
#[derive(Debug, Clone)]
pub struct YtDlpClient {
    binary: PathBuf,
    output_dir: PathBuf,
    timeout: Duration,
}

impl YtDlpClient {
    pub fn new(binary: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            output_dir: output_dir.into(),
            timeout,
        }
    }

    /// Output template handed to `-o`: `{dir}/%(id)s.%(ext)s`.
    fn output_template(&self) -> PathBuf {
        self.output_dir.join("%(id)s.%(ext)s")
    }

    /// Verifica que yt-dlp y ffmpeg estén disponibles
    pub async fn verify_dependencies(&self) -> Result<()> {
        let ytdlp_check = Command::new(&self.binary).arg("--version").output().await;

        match ytdlp_check {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                info!("✅ yt-dlp versión: {}", version.trim());
            }
            _ => {
                error!("❌ yt-dlp no encontrado en {}", self.binary.display());
                anyhow::bail!("yt-dlp no disponible");
            }
        }

        // yt-dlp necesita ffmpeg para -x
        let ffmpeg_check = Command::new("ffmpeg").arg("-version").output().await;

        match ffmpeg_check {
            Ok(output) if output.status.success() => {
                info!("✅ ffmpeg disponible");
            }
            _ => {
                error!("❌ ffmpeg no encontrado. Instala con: sudo apt install ffmpeg");
                anyhow::bail!("ffmpeg no disponible");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl SearchProvider for YtDlpClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        info!("🔍 Búsqueda yt-dlp: {}", query);

        let search_query = format!("ytsearch{limit}:{query}");
        let mut cmd = Command::new(&self.binary);
        cmd.args([
            "--dump-json",
            "--flat-playlist",
            "--skip-download",
            "--no-warnings",
            "--socket-timeout",
            "15",
        ])
        .arg(&search_query)
        .kill_on_drop(true);

        let output = tokio::time::timeout(SEARCH_TIMEOUT, cmd.output())
            .await
            .context("yt-dlp search timed out")?
            .context("yt-dlp process error")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            warn!("yt-dlp search failed: {}", error);
            anyhow::bail!("yt-dlp search failed: {}", error.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut results = Vec::new();
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<SearchResult>(line) {
                Ok(record) => results.push(record),
                Err(e) => warn!("⚠️ Línea con formato incorrecto ({}): {}", e, line),
            }
        }
        results.truncate(limit);

        info!("🔍 Encontrados {} resultados para: {}", results.len(), query);
        Ok(results)
    }

    fn source_name(&self) -> &'static str {
        "yt-dlp"
    }
}

#[async_trait]
impl AudioExtractor for YtDlpClient {
    async fn extract(
        &self,
        video_id: &str,
        format: &str,
    ) -> Result<ExtractionOutput, ExtractionError> {
        let url = watch_url(video_id);
        info!("⬇️ Extrayendo audio ({}) de {}", format, url);

        let child = Command::new(&self.binary)
            .args(["-x", "--no-playlist", "--audio-format", format, "-o"])
            .arg(self.output_template())
            .arg(&url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Al vencer el timeout se descarta el futuro y con él el proceso
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("⏱️ yt-dlp superó {:?} para {}", self.timeout, video_id);
                return Err(ExtractionError::Timeout(self.timeout));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ExtractionError::NonZeroExit {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        debug!("yt-dlp stdout: {}", stdout);
        Ok(ExtractionOutput { stdout, stderr })
    }
}
