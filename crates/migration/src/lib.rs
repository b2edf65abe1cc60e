pub use sea_orm_migration::prelude::*;

mod m20260805_000001_profiles;
mod m20260805_000002_roles;
mod m20260805_000003_notifications;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260805_000001_profiles::Migration),
            Box::new(m20260805_000002_roles::Migration),
            Box::new(m20260805_000003_notifications::Migration),
        ]
    }
}
