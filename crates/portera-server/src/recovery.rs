use std::sync::Arc;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use entity::notification::NotificationKind;
use entity::role::RoleType;
use entity::{profile, role};

use crate::error::RoleError;
use crate::mailer::Notifier;
use crate::notifications;
use crate::util;

pub const DEFAULT_COUNTRY: &str = "España";

/// Caller-supplied account data used to synthesize missing rows.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecoveryUserData {
    pub full_name: Option<String>,
    pub user_type: Option<RoleType>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub community_code: Option<String>,
    pub company_name: Option<String>,
    pub tax_id: Option<String>,
    pub professional_number: Option<String>,
}

/// Aggregate outcome of a recovery run.
///
/// `errors` collects non-fatal failures along the way; only `success` is
/// decision-relevant to callers.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryReport {
    pub success: bool,
    pub roles_created: u32,
    pub errors: Vec<String>,
}

/// Default attribute bag for a role row created without user input.
fn default_role_attributes(role_type: RoleType, user_data: &RecoveryUserData) -> serde_json::Value {
    match role_type {
        RoleType::Particular | RoleType::CommunityMember => json!({
            "community_code": user_data.community_code,
            "address": user_data.address,
            "city": user_data.city,
            "postal_code": user_data.postal_code,
        }),
        RoleType::ServiceProvider | RoleType::PropertyAdministrator => json!({
            "company_name": user_data.company_name,
            "tax_id": user_data.tax_id,
            "professional_number": user_data.professional_number,
        }),
    }
}

/// Idempotent repair for registrations that did not complete.
///
/// Recovery bypasses the email loop: rows it creates are already verified.
/// Availability over rigor, so the operation stays isolated here where it
/// can be audited and rate-limited separately from normal verification.
#[derive(Clone)]
pub struct RecoveryService {
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
}

impl RecoveryService {
    pub fn new(db: DatabaseConnection, notifier: Arc<dyn Notifier>) -> Self {
        RecoveryService { db, notifier }
    }

    async fn ensure_profile(
        &self,
        user_id: &str,
        email: &str,
        user_data: &RecoveryUserData,
        errors: &mut Vec<String>,
    ) -> Option<profile::Model> {
        match profile::Entity::find_by_id(user_id).one(&self.db).await {
            Ok(Some(p)) => return Some(p),
            Ok(None) => {}
            Err(e) => {
                errors.push(format!("profile lookup failed: {e}"));
                return None;
            }
        }

        let now = util::now_ts();
        let row = profile::ActiveModel {
            id: Set(user_id.to_string()),
            email: Set(email.trim().to_lowercase()),
            full_name: Set(user_data.full_name.clone()),
            user_type: Set(user_data.user_type.unwrap_or(RoleType::Particular)),
            address: Set(user_data.address.clone()),
            city: Set(user_data.city.clone()),
            postal_code: Set(user_data.postal_code.clone()),
            country: Set(user_data
                .country
                .clone()
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string())),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match row.insert(&self.db).await {
            Ok(p) => {
                info!(user_id, "profile synthesized during recovery");
                Some(p)
            }
            Err(e) => {
                errors.push(format!("profile creation failed: {e}"));
                None
            }
        }
    }

    async fn ensure_active_role(&self, user_id: &str) -> Result<(), RoleError> {
        let verified = role::Entity::find()
            .filter(role::Column::UserId.eq(user_id))
            .filter(role::Column::IsVerified.eq(true))
            .order_by_asc(role::Column::CreatedAt)
            .order_by_asc(role::Column::Id)
            .all(&self.db)
            .await?;

        if verified.is_empty() || verified.iter().any(|r| r.is_active) {
            return Ok(());
        }

        // First verified role in stored order becomes active.
        let first = verified.into_iter().next().ok_or(RoleError::RoleNotFound)?;
        let mut row: role::ActiveModel = first.into();
        row.is_active = Set(true);
        row.updated_at = Set(util::now_ts());
        row.update(&self.db).await?;

        Ok(())
    }

    /// Repair an under-provisioned registration.
    ///
    /// Each step records its failure and carries on; the report's `success`
    /// is computed from the final role count alone.
    pub async fn recover_registration(
        &self,
        user_id: &str,
        email: &str,
        expected_roles: &[RoleType],
        user_data: &RecoveryUserData,
    ) -> RecoveryReport {
        let mut errors = Vec::new();
        let mut roles_created: u32 = 0;

        let profile = self
            .ensure_profile(user_id, email, user_data, &mut errors)
            .await;

        let existing: Vec<role::Model> = match role::Entity::find()
            .filter(role::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                errors.push(format!("role lookup failed: {e}"));
                Vec::new()
            }
        };

        let mut handled: Vec<RoleType> = existing.iter().map(|r| r.role_type).collect();
        let now = util::now_ts();

        for &expected in expected_roles {
            if handled.contains(&expected) {
                continue;
            }
            handled.push(expected);

            let row = role::ActiveModel {
                id: Set(util::generate_row_id()),
                user_id: Set(user_id.to_string()),
                role_type: Set(expected),
                is_verified: Set(true),
                is_active: Set(false),
                verification_token: Set(None),
                verification_expires_at: Set(None),
                verification_confirmed_at: Set(Some(now)),
                role_specific_data: Set(Some(default_role_attributes(expected, user_data))),
                created_at: Set(now),
                updated_at: Set(now),
            };

            match row.insert(&self.db).await {
                Ok(_) => {
                    roles_created += 1;
                    info!(
                        user_id,
                        role_type = expected.as_str(),
                        "role backfilled during recovery"
                    );
                }
                Err(e) => {
                    errors.push(format!("failed to create {} role: {e}", expected.as_str()));
                }
            }
        }

        if let Err(e) = self.ensure_active_role(user_id).await {
            errors.push(format!("failed to activate a recovered role: {e}"));
        }

        if roles_created > 0 {
            let (to_email, to_name) = match &profile {
                Some(p) => (p.email.clone(), p.full_name.clone()),
                None => (email.trim().to_lowercase(), None),
            };
            if let Err(e) = self
                .notifier
                .send_recovery_notice(&to_email, to_name.as_deref(), roles_created)
                .await
            {
                warn!(user_id, error = %e, "recovery notice email failed");
            }

            notifications::record(
                &self.db,
                user_id,
                NotificationKind::RegistrationRecovered,
                "Registration repaired",
                &format!(
                    "Your registration was repaired automatically; {roles_created} role(s) were restored."
                ),
            )
            .await;
        }

        let final_count = match role::Entity::find()
            .filter(role::Column::UserId.eq(user_id))
            .count(&self.db)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                errors.push(format!("final role count failed: {e}"));
                0
            }
        };

        let success = final_count >= expected_roles.len() as u64;

        info!(
            user_id,
            success,
            roles_created,
            errors = errors.len(),
            "recovery run finished"
        );

        RecoveryReport {
            success,
            roles_created,
            errors,
        }
    }

    /// Narrow zero-roles repair used by the post-registration monitor.
    ///
    /// Reads the profile's `user_type` as the single role to create and
    /// marks it verified and active immediately. A missing profile is the
    /// one terminal failure here.
    pub async fn emergency_recover(&self, user_id: &str) -> Result<role::Model, RoleError> {
        let profile = profile::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(RoleError::ProfileNotFound)?;

        let role_type = profile.user_type;
        let now = util::now_ts();

        let txn = self.db.begin().await?;

        // Tolerate a row that appeared while the monitor was polling.
        let existing = role::Entity::find()
            .filter(role::Column::UserId.eq(user_id))
            .filter(role::Column::RoleType.eq(role_type))
            .one(&txn)
            .await?;

        role::Entity::update_many()
            .col_expr(role::Column::IsActive, Expr::value(false))
            .col_expr(role::Column::UpdatedAt, Expr::value(now))
            .filter(role::Column::UserId.eq(user_id))
            .filter(role::Column::IsActive.eq(true))
            .exec(&txn)
            .await?;

        let recovered = match existing {
            Some(found) => {
                let mut row: role::ActiveModel = found.into();
                row.is_verified = Set(true);
                row.is_active = Set(true);
                row.verification_token = Set(None);
                row.verification_expires_at = Set(None);
                row.verification_confirmed_at = Set(Some(now));
                row.updated_at = Set(now);
                row.update(&txn).await?
            }
            None => {
                let row = role::ActiveModel {
                    id: Set(util::generate_row_id()),
                    user_id: Set(user_id.to_string()),
                    role_type: Set(role_type),
                    is_verified: Set(true),
                    is_active: Set(true),
                    verification_token: Set(None),
                    verification_expires_at: Set(None),
                    verification_confirmed_at: Set(Some(now)),
                    role_specific_data: Set(Some(default_role_attributes(
                        role_type,
                        &RecoveryUserData::default(),
                    ))),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                row.insert(&txn).await?
            }
        };

        txn.commit().await?;

        if let Err(e) = self
            .notifier
            .send_recovery_notice(&profile.email, profile.full_name.as_deref(), 1)
            .await
        {
            warn!(user_id, error = %e, "emergency recovery notice email failed");
        }

        notifications::record(
            &self.db,
            user_id,
            NotificationKind::RegistrationRecovered,
            "Registration repaired",
            &format!(
                "Your registration was repaired automatically; the {} role was restored.",
                role_type.as_str()
            ),
        )
        .await;

        info!(
            user_id,
            role_type = role_type.as_str(),
            "emergency recovery completed"
        );

        Ok(recovered)
    }
}
