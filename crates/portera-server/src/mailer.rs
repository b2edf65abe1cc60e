use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use entity::role::RoleType;

use crate::config::MailerConfig;

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mailer is not configured")]
    NotConfigured,

    #[error("email request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email send failed (status={status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound user notification seam.
///
/// Failures here must never undo role creation; callers record the outcome
/// and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_role_verification(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        role_type: RoleType,
        verify_url: &str,
    ) -> Result<(), NotifyError>;

    async fn send_recovery_notice(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        roles_created: u32,
    ) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoEmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoSendEmailBody {
    sender: BrevoEmailAddress,
    to: Vec<BrevoEmailAddress>,
    subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_content: Option<String>,
}

fn is_success_status(status: u16) -> bool {
    (200..=299).contains(&status)
}

pub struct BrevoMailer {
    http: reqwest::Client,
    api_key: String,
    sender_email: String,
    sender_name: Option<String>,
}

impl BrevoMailer {
    pub fn new(config: &MailerConfig) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent("Portera/0.1")
            .build()?;

        Ok(BrevoMailer {
            http,
            api_key: config.api_key.clone(),
            sender_email: config.sender_email.clone(),
            sender_name: config.sender_name.clone(),
        })
    }

    async fn send(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        subject: &str,
        text: String,
    ) -> Result<(), NotifyError> {
        let body = BrevoSendEmailBody {
            sender: BrevoEmailAddress {
                email: self.sender_email.clone(),
                name: self.sender_name.clone(),
            },
            to: vec![BrevoEmailAddress {
                email: to_email.to_string(),
                name: to_name.map(|s| s.to_string()),
            }],
            subject: subject.to_string(),
            html_content: None,
            text_content: Some(text),
        };

        let resp = self
            .http
            .post(BREVO_SEND_URL)
            .header("api-key", &self.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if is_success_status(status) {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(NotifyError::Rejected { status, body })
    }
}

#[async_trait]
impl Notifier for BrevoMailer {
    async fn send_role_verification(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        role_type: RoleType,
        verify_url: &str,
    ) -> Result<(), NotifyError> {
        let subject = format!("Verify your {} role", role_type.as_str());
        let text = format!(
            "You requested the {} role for your account.\n\n\
             Confirm it by opening this link:\n{verify_url}\n\n\
             The link is valid for 24 hours. If you did not request this role, ignore this message.",
            role_type.as_str(),
        );

        self.send(to_email, to_name, &subject, text).await
    }

    async fn send_recovery_notice(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        roles_created: u32,
    ) -> Result<(), NotifyError> {
        let subject = "Your account registration was repaired".to_string();
        let text = format!(
            "Your registration did not complete and has been repaired automatically.\n\n\
             Roles restored: {roles_created}. You can now sign in normally.",
        );

        self.send(to_email, to_name, &subject, text).await
    }
}

/// Stands in when Brevo credentials are absent. Sends fail softly: role
/// creation proceeds and the caller reports `emailSent: false`.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send_role_verification(
        &self,
        _to_email: &str,
        _to_name: Option<&str>,
        _role_type: RoleType,
        _verify_url: &str,
    ) -> Result<(), NotifyError> {
        Err(NotifyError::NotConfigured)
    }

    async fn send_recovery_notice(
        &self,
        _to_email: &str,
        _to_name: Option<&str>,
        _roles_created: u32,
    ) -> Result<(), NotifyError> {
        Err(NotifyError::NotConfigured)
    }
}
