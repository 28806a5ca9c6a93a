// Export components
pub mod credentials;
pub mod gmail;
pub mod google_calendar;
pub mod preread_job;
pub mod summarizer;

// Re-export the pieces the binaries wire together
pub use credentials::{CredentialStore, TokenManager};
pub use preread_job::{JobHandle, PrereadPipeline};
