pub mod campaigns;
pub mod config;
pub mod deeplink;
pub mod errors;
pub mod metrics_defs;
pub mod service;
pub mod visitor;

use campaigns::Campaigns;
use errors::RedirectError;
use rotation::clock::SystemClock;
use rotation::memory::MemoryStore;
use rotation::{Collaborators, Selector};
use service::RedirectService;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;

pub async fn run(config: config::Config) -> Result<(), RedirectError> {
    config.validate()?;

    let store = Arc::new(MemoryStore::new(Arc::new(SystemClock)));
    let campaigns = Arc::new(Campaigns::load(&config.campaigns, &store));
    let selector = Arc::new(Selector::new(
        &config.rotation,
        Collaborators::from_store(store.clone()),
        Arc::new(SystemClock),
    ));

    let redirect_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        RedirectService::new(campaigns.clone(), selector.clone(), store),
    );

    let ready_campaigns = campaigns.clone();
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::new(move || !ready_campaigns.is_empty()),
    );

    tracing::info!(campaigns = campaigns.len(), "starting redirect service");

    let result = tokio::select! {
        res = async { tokio::try_join!(redirect_task, admin_task) } => res.map(|_| ()),
        res = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
            res.map_err(RedirectError::from)
        }
    };

    selector.sweeper().shutdown().await;
    result
}
