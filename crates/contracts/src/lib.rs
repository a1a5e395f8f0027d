//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace:
//! lifecycle events, the synchronous processor trait, configuration and
//! the common error type. Business crates depend on this crate only,
//! reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Event times are host wall-clock milliseconds since the Unix epoch
//! - `job_id` is assigned by the host scheduler and is only used for correlation

mod blueprint;
mod dispatch_config;
mod error;
mod event;
mod outcome;
mod processor;

pub use blueprint::*;
pub use dispatch_config::*;
pub use error::*;
pub use event::*;
pub use outcome::DispatchOutcome;
pub use processor::EventProcessor;
