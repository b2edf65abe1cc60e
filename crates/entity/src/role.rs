use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::profile;

/// Professional role a user account can hold.
///
/// Closed set; a user may hold at most one row per type. The wire and
/// database representations are both the snake_case string value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum RoleType {
    #[sea_orm(string_value = "particular")]
    Particular,

    #[sea_orm(string_value = "community_member")]
    CommunityMember,

    #[sea_orm(string_value = "service_provider")]
    ServiceProvider,

    #[sea_orm(string_value = "property_administrator")]
    PropertyAdministrator,
}

impl RoleType {
    pub const ALL: [RoleType; 4] = [
        RoleType::Particular,
        RoleType::CommunityMember,
        RoleType::ServiceProvider,
        RoleType::PropertyAdministrator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleType::Particular => "particular",
            RoleType::CommunityMember => "community_member",
            RoleType::ServiceProvider => "service_provider",
            RoleType::PropertyAdministrator => "property_administrator",
        }
    }

    /// Parse the wire value; `None` for anything outside the closed set.
    pub fn parse(value: &str) -> Option<RoleType> {
        match value {
            "particular" => Some(RoleType::Particular),
            "community_member" => Some(RoleType::CommunityMember),
            "service_provider" => Some(RoleType::ServiceProvider),
            "property_administrator" => Some(RoleType::PropertyAdministrator),
            _ => None,
        }
    }
}

/// One role row per (user, role type).
///
/// A row is created unverified with a pending token and becomes verified
/// exactly once, either through token redemption or through recovery (which
/// skips the token loop). Among a user's verified roles at most one has
/// `is_active = true`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub user_id: String,

    pub role_type: RoleType,

    pub is_verified: bool,

    pub is_active: bool,

    /// Opaque verification token (hex). Present only while unverified;
    /// cleared on verification.
    #[sea_orm(unique)]
    pub verification_token: Option<String>,

    /// Unix timestamp (seconds). Token invalid once past.
    pub verification_expires_at: Option<i64>,

    /// Unix timestamp (seconds).
    pub verification_confirmed_at: Option<i64>,

    /// Attribute bag whose shape depends on `role_type` (community/address
    /// fields, or company/tax-id/professional-number fields).
    #[sea_orm(column_type = "Json", nullable)]
    pub role_specific_data: Option<Json>,

    /// Unix timestamp (seconds).
    pub created_at: i64,

    /// Unix timestamp (seconds).
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "profile::Entity",
        from = "Column::UserId",
        to = "profile::Column::Id"
    )]
    Profile,
}

impl Related<profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
