//! Drowsiness Monitor - Main Entry Point

use alerting::LogOutput;
use anyhow::{anyhow, Context};
use api::{init_logging, run_server, AppSettings, AppState};
use camera_capture::SyntheticCamera;
use dms::{DrowsinessMonitor, LandmarkEngine, MockLandmarkEngine};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = AppSettings::load().context("Failed to load settings")?;
    init_logging(&settings.log_level).context("Failed to set tracing subscriber")?;

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow!("Failed to install metrics recorder: {}", e))?;

    warn!("No landmark model wired in; using the mock landmark engine");
    let engine: Arc<dyn LandmarkEngine> = Arc::new(MockLandmarkEngine::default());
    let monitor = DrowsinessMonitor::from_config(&settings.dms, Some(engine), Arc::new(LogOutput))
        .context("Failed to initialize drowsiness monitor")?;

    if settings.auto_start {
        monitor.start_recording();
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut camera =
        SyntheticCamera::new(settings.camera.clone()).context("Failed to open camera")?;
    let feed = monitor.clone();
    let camera_task = tokio::spawn(async move {
        camera
            .run(move |frame| feed.on_frame(frame), shutdown_rx)
            .await
    });

    let state = Arc::new(AppState::new(monitor.clone(), Some(metrics)));
    run_server(&settings.listen_addr, state, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown requested");
    })
    .await
    .context("API server failed")?;

    let _ = shutdown_tx.send(true);
    camera_task.await.context("Camera task panicked")??;
    monitor.shutdown();

    Ok(())
}
