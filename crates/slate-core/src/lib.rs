//! Pick sequencing and coordinate-transform orchestration for a colony
//! picking robot.
//!
//! The engine turns per-colony vision detections into a retryable,
//! resumable sequence of motion commands: the [`services::CoordinateMapper`]
//! reconciles camera and robot space, the [`services::SlotAllocator`] assigns
//! each accepted colony to exactly one baseplate slot, the
//! [`services::MotionPlanner`] expands transfers into safe-height command
//! sequences, and the [`services::RunOrchestrator`] supervises the batch,
//! persisting a resumable snapshot after every task transition.

pub mod error;
pub mod models;
pub mod services;

pub use error::{Result, SlateError};
