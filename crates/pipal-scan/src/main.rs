#![doc = include_str!("../README.md")]

mod scan;

use anyhow::Context;
use clap::Parser;
use pipal::{CatalogManifest, FsBucket};
use scan::{
    candidates,
    config::{CandidateConfig, Cli, Command, ScanConfig},
    output::FileSink,
    pool::manager::run_scan,
    streaming::processor::ScanContext,
    telemetry::init_telemetry,
};
use std::{io::Write, sync::Arc};
use tokio::signal;
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Scan(args) => {
            let config = ScanConfig::try_from(args)?;
            let providers = init_telemetry()?;
            let result = scan(config).await;
            providers.shutdown();
            result
        }
        Command::Candidates(args) => {
            let config = CandidateConfig::try_from(args)?;
            let providers = init_telemetry()?;
            let result = report(&config).await;
            providers.shutdown();
            result
        }
    };

    if let Err(_e) = &result {
        #[cfg(feature = "tracing")]
        tracing::error!("{_e:#}");
    }
    result
}

async fn scan(config: ScanConfig) -> anyhow::Result<()> {
    log_startup_info(&config);

    let manifest = CatalogManifest::load(&config.catalog)
        .await
        .with_context(|| format!("failed to load catalog {}", config.catalog.display()))?;
    let set = manifest.into_result_set()?;
    let sink = FileSink::create(&config.output_dir).await.with_context(|| {
        format!(
            "failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let token = CancellationToken::new();
    tokio::spawn(shutdown_signal(token.clone()));

    let bucket = Arc::new(FsBucket::new(&config.bucket_dir));
    let ctx = ScanContext::new(set, bucket, Arc::new(sink), config, token);
    let _summary = run_scan(ctx).await?;

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Processed {} of {} chunks; {} palindromes written",
        _summary.chunks_processed,
        _summary.chunks_queued,
        _summary.palindromes
    );
    Ok(())
}

async fn report(config: &CandidateConfig) -> anyhow::Result<()> {
    let candidates = candidates::run(config).await?;

    let mut out = std::io::stdout().lock();
    for candidate in &candidates {
        serde_json::to_writer(&mut out, candidate)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

fn log_startup_info(_config: &ScanConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!("Starting scan with full config: {:#?}", _config);
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting scan at digit {} with {} workers",
            _config.start,
            _config.num_workers
        );
    }
}

/// Cancels `token` on Ctrl+C or SIGTERM. Chunks already written stay on
/// disk; rerun with `--start` to resume.
async fn shutdown_signal(token: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
        },
        () = token.cancelled() => return,
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Shutdown signal received, cancelling scan...");
    token.cancel();
}
