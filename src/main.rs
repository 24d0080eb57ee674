use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use roombox_audio::{
    cache::{DiskArtifactStore, SearchCache},
    config::{Config, SearchBackend},
    coordinator::RequestCoordinator,
    server::{app_routes, AppState},
    sources::{InvidiousClient, SearchProvider, YtDlpClient},
};

fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("roombox_audio=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando roombox-audio v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    let ytdlp = Arc::new(YtDlpClient::new(
        &config.ytdlp_path,
        &config.download_dir,
        config.extraction_timeout(),
    ));

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        ytdlp.verify_dependencies().await?;
        println!("OK");
        return Ok(());
    }

    let searcher: Arc<dyn SearchProvider> = match config.search_backend {
        SearchBackend::Ytdlp => ytdlp.clone() as Arc<dyn SearchProvider>,
        SearchBackend::Invidious => Arc::new(InvidiousClient::new(&config.invidious_instance)?),
    };
    info!("🔍 Proveedor de búsqueda: {}", searcher.source_name());

    let disk_store = Arc::new(DiskArtifactStore::new(
        &config.download_dir,
        config.store_limits(),
    )?);

    let coordinator = Arc::new(RequestCoordinator::new(
        SearchCache::new(config.search_cache_size),
        disk_store,
        searcher,
        ytdlp,
        config.search_limit,
    ));

    // El directorio puede exceder los límites tras un reinicio
    let report = coordinator.sweep().await;
    info!(
        "🧹 Barrido inicial: {} archivos, {} desalojados",
        report.scanned,
        report.evicted.len()
    );

    let app = app_routes(AppState::new(coordinator.clone()));

    let serve_address = config.bind_address();
    info!("🚀 Servidor escuchando en {}", serve_address);
    let listener = tokio::net::TcpListener::bind(&serve_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let metrics = coordinator.search_cache().metrics();
    info!(
        "📊 Caché de búsquedas: {} hits, {} misses, {} desalojos ({:.0}% aciertos, {:.0}% fallos)",
        metrics.hits,
        metrics.misses,
        metrics.evictions,
        metrics.hit_rate() * 100.0,
        metrics.miss_rate() * 100.0
    );
    info!("👋 Servidor detenido");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Error al registrar Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("⚠️ Señal de shutdown recibida, cerrando...");
}
