use std::sync::Arc;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{info, warn};

use entity::notification::NotificationKind;
use entity::role::RoleType;
use entity::{profile, role};

use crate::error::RoleError;
use crate::mailer::Notifier;
use crate::notifications;
use crate::util;

#[derive(Clone, Debug)]
pub struct LifecycleConfig {
    pub site_url: String,
    pub token_ttl_secs: i64,
}

/// Outcome of a role request or a verification resend.
///
/// `email_sent = false` does not mean failure: the row exists and can still
/// be completed through a resend or through recovery.
#[derive(Debug)]
pub struct RoleRequested {
    pub role: role::Model,
    pub email_sent: bool,
}

#[derive(Debug)]
pub struct VerifiedRole {
    pub role: role::Model,
    /// Whether this verification also made the role active (first verified
    /// role of the account).
    pub activated: bool,
}

/// Creates role requests, verifies tokens and enforces the
/// single-active-role invariant. The store is the only shared state; no
/// role data is cached across calls.
pub struct RoleLifecycle {
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
    config: LifecycleConfig,
}

/// Strip the token before a role row leaves the lifecycle layer.
fn redacted(mut role: role::Model) -> role::Model {
    role.verification_token = None;
    role
}

impl RoleLifecycle {
    pub fn new(
        db: DatabaseConnection,
        notifier: Arc<dyn Notifier>,
        config: LifecycleConfig,
    ) -> Self {
        RoleLifecycle {
            db,
            notifier,
            config,
        }
    }

    fn verify_url(&self, token: &str) -> String {
        format!(
            "{}/auth/verify-role?token={token}",
            self.config.site_url.trim_end_matches('/'),
        )
    }

    async fn find_profile(&self, user_id: &str) -> Result<profile::Model, RoleError> {
        profile::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(RoleError::ProfileNotFound)
    }

    async fn find_role(
        &self,
        user_id: &str,
        role_type: RoleType,
    ) -> Result<Option<role::Model>, RoleError> {
        Ok(role::Entity::find()
            .filter(role::Column::UserId.eq(user_id))
            .filter(role::Column::RoleType.eq(role_type))
            .one(&self.db)
            .await?)
    }

    async fn dispatch_verification(
        &self,
        profile: &profile::Model,
        role_type: RoleType,
        token: &str,
    ) -> bool {
        let verify_url = self.verify_url(token);
        match self
            .notifier
            .send_role_verification(
                &profile.email,
                profile.full_name.as_deref(),
                role_type,
                &verify_url,
            )
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    user_id = %profile.id,
                    role_type = role_type.as_str(),
                    error = %e,
                    "verification email failed; role stays pending"
                );
                false
            }
        }
    }

    /// Create a role request for (user, role type).
    ///
    /// The row is inserted before the verification email goes out, so a fast
    /// click can never race the token lookup. Email failure is reported in
    /// `email_sent`, never rolled back.
    pub async fn request_role(
        &self,
        user_id: &str,
        role_type: RoleType,
        role_specific_data: Option<serde_json::Value>,
    ) -> Result<RoleRequested, RoleError> {
        let profile = self.find_profile(user_id).await?;

        if let Some(existing) = self.find_role(user_id, role_type).await? {
            return Err(if existing.is_verified {
                RoleError::DuplicateVerified
            } else {
                RoleError::DuplicatePending
            });
        }

        let token = util::generate_verification_token();
        let now = util::now_ts();

        let row = role::ActiveModel {
            id: Set(util::generate_row_id()),
            user_id: Set(user_id.to_string()),
            role_type: Set(role_type),
            is_verified: Set(false),
            is_active: Set(false),
            verification_token: Set(Some(token.clone())),
            verification_expires_at: Set(Some(now + self.config.token_ttl_secs)),
            verification_confirmed_at: Set(None),
            role_specific_data: Set(role_specific_data),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let inserted = row.insert(&self.db).await?;

        let email_sent = self.dispatch_verification(&profile, role_type, &token).await;

        notifications::record(
            &self.db,
            user_id,
            NotificationKind::RoleRequested,
            "Role requested",
            &format!(
                "The {} role was requested and is pending email verification.",
                role_type.as_str()
            ),
        )
        .await;

        info!(
            user_id,
            role_type = role_type.as_str(),
            email_sent,
            "role request created"
        );

        Ok(RoleRequested {
            role: redacted(inserted),
            email_sent,
        })
    }

    /// Rotate the token of an existing unverified role and send a fresh
    /// verification email. The old token stops matching immediately.
    pub async fn resend_verification(
        &self,
        user_id: &str,
        role_type: RoleType,
    ) -> Result<RoleRequested, RoleError> {
        let profile = self.find_profile(user_id).await?;

        let existing = self
            .find_role(user_id, role_type)
            .await?
            .ok_or(RoleError::RoleNotFound)?;
        if existing.is_verified {
            return Err(RoleError::DuplicateVerified);
        }

        let token = util::generate_verification_token();
        let now = util::now_ts();

        let mut row: role::ActiveModel = existing.into();
        row.verification_token = Set(Some(token.clone()));
        row.verification_expires_at = Set(Some(now + self.config.token_ttl_secs));
        row.updated_at = Set(now);
        let updated = row.update(&self.db).await?;

        let email_sent = self.dispatch_verification(&profile, role_type, &token).await;

        info!(
            user_id,
            role_type = role_type.as_str(),
            email_sent,
            "verification token rotated"
        );

        Ok(RoleRequested {
            role: redacted(updated),
            email_sent,
        })
    }

    /// Redeem a verification token.
    ///
    /// Single-use: the token fields are cleared on success. If the user has
    /// no active role yet, the newly verified role becomes active, so a
    /// verified user is never left with zero active roles.
    pub async fn verify_role(&self, token: &str) -> Result<VerifiedRole, RoleError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(RoleError::TokenNotFound);
        }

        let txn = self.db.begin().await?;

        let found = role::Entity::find()
            .filter(role::Column::VerificationToken.eq(token))
            .one(&txn)
            .await?
            .ok_or(RoleError::TokenNotFound)?;

        let now = util::now_ts();
        if found.verification_expires_at.is_some_and(|exp| now > exp) {
            // The row stays unverified; tokens are not renewable in place.
            return Err(RoleError::TokenExpired);
        }

        let has_active = role::Entity::find()
            .filter(role::Column::UserId.eq(found.user_id.clone()))
            .filter(role::Column::IsActive.eq(true))
            .count(&txn)
            .await?
            > 0;

        let user_id = found.user_id.clone();
        let role_type = found.role_type;

        let mut row: role::ActiveModel = found.into();
        row.is_verified = Set(true);
        row.is_active = Set(!has_active);
        row.verification_token = Set(None);
        row.verification_expires_at = Set(None);
        row.verification_confirmed_at = Set(Some(now));
        row.updated_at = Set(now);
        let updated = row.update(&txn).await?;

        txn.commit().await?;

        notifications::record(
            &self.db,
            &user_id,
            NotificationKind::RoleVerified,
            "Role verified",
            &format!("Your {} role is now verified.", role_type.as_str()),
        )
        .await;

        info!(
            user_id,
            role_type = role_type.as_str(),
            activated = !has_active,
            "role verified"
        );

        Ok(VerifiedRole {
            role: updated,
            activated: !has_active,
        })
    }

    /// Make the given verified role the account's single active role.
    ///
    /// Deactivate-others-then-activate-target runs inside one transaction;
    /// concurrent activations for the same user serialize there and can
    /// never leave zero or two active roles.
    pub async fn activate_role(
        &self,
        user_id: &str,
        role_type: RoleType,
    ) -> Result<role::Model, RoleError> {
        let txn = self.db.begin().await?;

        let target = role::Entity::find()
            .filter(role::Column::UserId.eq(user_id))
            .filter(role::Column::RoleType.eq(role_type))
            .one(&txn)
            .await?
            .ok_or(RoleError::RoleNotFound)?;

        if !target.is_verified {
            return Err(RoleError::RoleNotVerified);
        }
        if target.is_active {
            txn.commit().await?;
            return Ok(redacted(target));
        }

        let now = util::now_ts();

        role::Entity::update_many()
            .col_expr(role::Column::IsActive, Expr::value(false))
            .col_expr(role::Column::UpdatedAt, Expr::value(now))
            .filter(role::Column::UserId.eq(user_id))
            .filter(role::Column::IsActive.eq(true))
            .exec(&txn)
            .await?;

        let mut row: role::ActiveModel = target.into();
        row.is_active = Set(true);
        row.updated_at = Set(now);
        let updated = row.update(&txn).await?;

        txn.commit().await?;

        info!(user_id, role_type = role_type.as_str(), "role activated");

        Ok(redacted(updated))
    }

    /// All roles of the user in stored order, tokens stripped.
    pub async fn list_roles(&self, user_id: &str) -> Result<Vec<role::Model>, RoleError> {
        let rows = role::Entity::find()
            .filter(role::Column::UserId.eq(user_id))
            .order_by_asc(role::Column::CreatedAt)
            .order_by_asc(role::Column::Id)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(redacted).collect())
    }
}
