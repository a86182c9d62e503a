use std::sync::Arc;

use anyhow::{Context, Result};
use quote_portal_automation::models::load_all_requests;
use quote_portal_automation::utils::logging;
use quote_portal_automation::{ChromiumSessionFactory, Config, Orchestrator};
use tracing::{error, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // load configuration
    let config = Config::from_env().context("invalid configuration")?;

    // init logging
    logging::init(config.verbose_logging);

    let factory = Arc::new(ChromiumSessionFactory::new(config.clone()));
    let orchestrator = Orchestrator::start(&config, factory)?;

    let requests = load_all_requests(&config.jobs_folder).await?;
    if requests.is_empty() {
        warn!("⚠️ no request files in {}, nothing to do", config.jobs_folder);
        return Ok(());
    }
    logging::log_requests_loaded(requests.len(), config.max_workers);

    let mut job_ids = Vec::with_capacity(requests.len());
    for request in requests {
        let source = request.file_path.clone().unwrap_or_default();
        match orchestrator.submit_request(request) {
            Ok(id) => job_ids.push(id),
            Err(e) => error!("❌ {} rejected: {}", source, e),
        }
    }

    for id in &job_ids {
        orchestrator.wait_for(id).await;
    }

    orchestrator.shutdown().await;
    logging::print_final_stats(&orchestrator.list_jobs());

    Ok(())
}
