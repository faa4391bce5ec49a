use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::pending::PendingStore;

/// Wrapper around tokio-cron-scheduler for the background jobs.
pub struct Housekeeping {
    inner: JobScheduler,
}

impl Housekeeping {
    pub async fn new() -> Result<Self> {
        let inner = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;
        Ok(Self { inner })
    }

    async fn add_cron_job<F>(&self, cron_expr: &str, name: &str, task: F) -> Result<()>
    where
        F: Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
            + Send
            + Sync
            + 'static,
    {
        let job_name = name.to_string();
        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let name = job_name.clone();
            let fut = task();
            Box::pin(async move {
                debug!("Running scheduled task: {}", name);
                fut.await;
            })
        })
        .with_context(|| format!("Failed to create cron job: {}", name))?;

        self.inner
            .add(job)
            .await
            .with_context(|| format!("Failed to add job: {}", name))?;

        info!("Scheduled task '{}' with cron: {}", name, cron_expr);
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        self.inner
            .start()
            .await
            .context("Failed to start scheduler")?;
        Ok(())
    }
}

/// Register and start the background jobs: the pending-store expiry sweep
/// and, when configured, the keep-alive self-ping.
pub async fn start(config: &Config, store: Arc<PendingStore>) -> Result<Housekeeping> {
    let scheduler = Housekeeping::new().await?;

    let sweep_store = Arc::clone(&store);
    scheduler
        .add_cron_job(&config.pending.sweep_cron, "pending-sweep", move || {
            let store = Arc::clone(&sweep_store);
            Box::pin(async move {
                let dropped = store.sweep(Utc::now()).await;
                if dropped > 0 {
                    info!("Expired {} unconfirmed submission(s)", dropped);
                }
            })
        })
        .await?;

    if config.keepalive.enabled {
        if let Some(url) = config.keepalive.ping_url.clone() {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .context("Failed to build keep-alive ping client")?;

            scheduler
                .add_cron_job(&config.keepalive.ping_cron, "keep-alive-ping", move || {
                    let client = client.clone();
                    let url = url.clone();
                    Box::pin(async move {
                        match client.get(&url).send().await {
                            Ok(response) => debug!("Keep-alive ping: {}", response.status()),
                            Err(e) => warn!("Keep-alive ping failed: {}", e),
                        }
                    })
                })
                .await?;
        }
    }

    scheduler.start().await?;
    Ok(scheduler)
}
