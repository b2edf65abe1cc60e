pub mod profiles;
pub mod recovery;
pub mod registration;
pub mod roles;
