//! Service entry point: wires the document store, external clients, hybrid
//! search, permission filtering, the sync scheduler, and the HTTP API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures::FutureExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::AppState;
use content_source::{ContentSourceConfig, QiitaAccessChecker, QiitaClient};
use doc_store::{DocStore, StoreConfig};
use embed_service::{EmbedConfig, GeminiService};
use search_core::{PermissionFilter, SearchService};
use sync_worker::{SchedulerConfig, SyncFn, SyncPipeline, SyncScheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is a development convenience; absence is fine in production.
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Store and external service clients.
    let store = Arc::new(DocStore::connect(StoreConfig::from_env()?).await?);
    let embedder = Arc::new(GeminiService::new(EmbedConfig::from_env()?)?);
    let source_cfg = ContentSourceConfig::from_env();

    // Request-path services.
    let search = SearchService::new(embedder.clone(), store.clone());
    let permissions = PermissionFilter::new(
        store.clone(),
        Arc::new(QiitaAccessChecker::new(source_cfg.clone())),
    );

    // Ingestion pipeline under the cron scheduler. The sync worker uses the
    // team-level token; per-user tokens are only for access checks.
    let team_token =
        std::env::var("QIITA_TEAM_TOKEN").context("QIITA_TEAM_TOKEN must be set")?;
    let qiita = Arc::new(QiitaClient::new(&source_cfg, team_token)?);
    let pipeline = Arc::new(SyncPipeline::new(qiita, embedder.clone(), store.clone()));

    let sync_fn: SyncFn = {
        let pipeline = pipeline.clone();
        Arc::new(move || {
            let pipeline = pipeline.clone();
            async move { Ok(pipeline.run_sync_cycle().await) }.boxed()
        })
    };

    let scheduler = SyncScheduler::new(SchedulerConfig::from_env(), sync_fn)?;
    scheduler.on_job_complete(|result| {
        info!(
            success = result.success,
            synced = result.synced_count,
            failed = result.failed_count,
            duration_ms = result.duration_ms,
            "sync job complete"
        );
    });
    scheduler.start();
    if let Some(next) = scheduler.status().next_run_at {
        info!(%next, "next scheduled sync");
    }

    let state = Arc::new(AppState {
        search,
        permissions,
        store,
        scheduler: Some(scheduler.clone()),
    });

    api::start(state).await?;

    // The server has shut down (Ctrl+C); give an in-flight sync job a
    // bounded chance to finish before exiting.
    info!("shutting down, waiting for in-flight sync work");
    scheduler.graceful_stop(Some(Duration::from_secs(30))).await;

    Ok(())
}
