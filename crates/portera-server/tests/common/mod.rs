#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

use entity::profile;
use entity::role::RoleType;
use portera_server::mailer::{Notifier, NotifyError};
use portera_server::roles::{LifecycleConfig, RoleLifecycle};
use portera_server::util;

pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1);
    options.sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("open in-memory sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

#[derive(Clone, Debug)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub verify_url: Option<String>,
}

/// Test double for the email seam; optionally fails every send.
#[derive(Default)]
pub struct RecordingNotifier {
    failing: AtomicBool,
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingNotifier {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent_mail(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_token(&self) -> Option<String> {
        self.sent_mail()
            .iter()
            .rev()
            .find_map(|m| m.verify_url.clone())
            .and_then(|url| url.split("token=").nth(1).map(|t| t.to_string()))
    }

    fn record(&self, mail: SentMail) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::NotConfigured);
        }
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_role_verification(
        &self,
        to_email: &str,
        _to_name: Option<&str>,
        role_type: RoleType,
        verify_url: &str,
    ) -> Result<(), NotifyError> {
        self.record(SentMail {
            to: to_email.to_string(),
            subject: format!("Verify your {} role", role_type.as_str()),
            verify_url: Some(verify_url.to_string()),
        })
    }

    async fn send_recovery_notice(
        &self,
        to_email: &str,
        _to_name: Option<&str>,
        roles_created: u32,
    ) -> Result<(), NotifyError> {
        self.record(SentMail {
            to: to_email.to_string(),
            subject: format!("Registration repaired ({roles_created} roles)"),
            verify_url: None,
        })
    }
}

pub fn lifecycle(db: &DatabaseConnection, notifier: Arc<RecordingNotifier>) -> RoleLifecycle {
    RoleLifecycle::new(
        db.clone(),
        notifier,
        LifecycleConfig {
            site_url: "http://localhost:8080".to_string(),
            token_ttl_secs: 24 * 60 * 60,
        },
    )
}

/// Lifecycle whose freshly issued tokens are already past expiry.
pub fn lifecycle_with_expired_tokens(
    db: &DatabaseConnection,
    notifier: Arc<RecordingNotifier>,
) -> RoleLifecycle {
    RoleLifecycle::new(
        db.clone(),
        notifier,
        LifecycleConfig {
            site_url: "http://localhost:8080".to_string(),
            token_ttl_secs: -60,
        },
    )
}

pub async fn insert_profile(
    db: &DatabaseConnection,
    user_id: &str,
    email: &str,
    user_type: RoleType,
) -> profile::Model {
    let now = util::now_ts();
    let row = profile::ActiveModel {
        id: Set(user_id.to_string()),
        email: Set(email.to_string()),
        full_name: Set(Some("Test User".to_string())),
        user_type: Set(user_type),
        address: Set(None),
        city: Set(None),
        postal_code: Set(None),
        country: Set("España".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    row.insert(db).await.expect("insert profile")
}
