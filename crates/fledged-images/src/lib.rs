//! Image pull and delete Job synthesis for the image cache controller
//!
//! Pure builders the reconcile loop calls per (image, node) pair:
//! - [`needs_pull`] decides whether a pull Job is worth scheduling
//! - [`build_pull_job`] renders a pull Job in one of three variants
//! - [`build_delete_job`] renders a runtime-specific delete Job
//!
//! Nothing here talks to the API server or a runtime socket.

#![deny(missing_docs)]

pub mod config;
pub mod job;
pub mod policy;
pub mod reference;
pub mod runtime;

pub use config::JobConfig;
pub use job::{
    build_delete_job, build_pull_job, job_labels, DeleteJobRequest, JobVariant, PullJobRequest,
    ACTIVE_DEADLINE_SECONDS, BACKOFF_LIMIT,
};
pub use policy::{needs_pull, PullPolicy};
pub use reference::ImageTag;
pub use runtime::{DeleteInvocation, RuntimeFamily};
