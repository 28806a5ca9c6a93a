mod actor;
pub mod digest;
mod handle;
pub mod lock;
mod pipeline;
pub mod scheduler;

pub use actor::{JobState, JobStatus, RunReport, Trigger};
pub use digest::{Digest, Preread};
pub use handle::JobHandle;
pub use lock::RunLock;
pub use pipeline::{JobOutcome, PreparedDigest, PrereadPipeline, SUBJECT_CONTEXT_LIMIT};
