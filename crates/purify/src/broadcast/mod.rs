//! Broadcasting of job events for real-time streaming.
//!
//! Usable by any presentation layer that prefers a channel over implementing
//! [`JobObserver`](crate::job::JobObserver) itself.

pub mod job_progress;

pub use job_progress::{JobProgressBroadcaster, JobProgressEvent, JobStatus};
