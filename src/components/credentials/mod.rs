pub mod models;
pub mod store;
pub mod token;

pub use models::Credential;
pub use store::CredentialStore;
pub use token::{TokenManager, SCOPES};
