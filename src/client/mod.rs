pub mod auth;
pub mod sheets;
