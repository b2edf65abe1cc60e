use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::mailer::Notifier;
use crate::monitor::{MonitorConfig, RegistrationMonitor};
use crate::recovery::RecoveryService;
use crate::roles::{LifecycleConfig, RoleLifecycle};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub lifecycle: Arc<RoleLifecycle>,
    pub recovery: RecoveryService,
    pub monitor: Arc<RegistrationMonitor>,
    /// Fired on shutdown so in-flight monitor runs stop instead of leaking
    /// their timers.
    pub shutdown: broadcast::Sender<()>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, notifier: Arc<dyn Notifier>, config: &AppConfig) -> Self {
        let lifecycle = Arc::new(RoleLifecycle::new(
            db.clone(),
            notifier.clone(),
            LifecycleConfig {
                site_url: config.site_url.clone(),
                token_ttl_secs: config.token_ttl_secs,
            },
        ));

        let recovery = RecoveryService::new(db.clone(), notifier);

        let monitor = Arc::new(RegistrationMonitor::new(
            db.clone(),
            recovery.clone(),
            MonitorConfig {
                poll_interval: config.monitor_poll_interval,
                max_attempts: config.monitor_max_attempts,
                store_timeout: config.monitor_store_timeout,
            },
        ));

        let (shutdown, _) = broadcast::channel(1);

        AppState {
            db,
            lifecycle,
            recovery,
            monitor,
            shutdown,
        }
    }
}
