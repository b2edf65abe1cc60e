pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod monitor;
pub mod notifications;
pub mod recovery;
pub mod roles;
pub mod routes;
pub mod state;
pub mod util;
