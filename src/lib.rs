// Credrelay - Library root for testing

pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod outputs;
pub mod seal;
pub mod store;
