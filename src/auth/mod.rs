// Authentication module
// Credential types, expiry evaluation and the refresh exchange

mod exchange;
mod expiry;
mod types;

pub use exchange::TokenExchanger;
pub use expiry::{epoch_seconds, is_expired, is_expired_at};
pub use types::{parse_expiry, CredentialTriple};
