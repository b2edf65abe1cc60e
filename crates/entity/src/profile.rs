use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::role::RoleType;

/// One row per account, created at signup.
///
/// Must exist before any role can be recovered: the email receives the
/// verification and recovery notices.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Stored lowercased.
    #[sea_orm(unique)]
    pub email: String,

    pub full_name: Option<String>,

    /// Primary/default role hint; the emergency recovery path reads this as
    /// the single role to create.
    pub user_type: RoleType,

    pub address: Option<String>,

    pub city: Option<String>,

    pub postal_code: Option<String>,

    pub country: String,

    /// Unix timestamp (seconds).
    pub created_at: i64,

    /// Unix timestamp (seconds).
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::role::Entity")]
    Role,
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
