use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role-event notice shown to the user.
///
/// Side artifact, not authoritative state; rows are written best-effort and
/// are safe to lose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(64))")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[sea_orm(string_value = "role_requested")]
    RoleRequested,

    #[sea_orm(string_value = "role_verified")]
    RoleVerified,

    #[sea_orm(string_value = "registration_recovered")]
    RegistrationRecovered,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub user_id: String,

    pub kind: NotificationKind,

    pub subject: String,

    pub body: String,

    /// Unix timestamp (seconds).
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
