pub mod command;
pub mod config;
pub mod detection;
pub mod geometry;
pub mod run;
pub mod slot;
pub mod task;

pub use command::{MotionCommand, MotionOutcome};
pub use config::{BaseplateLayout, PlateLocation, ReferencePair, RunParams, SterilizerParams};
pub use detection::ColonyDetection;
pub use geometry::{Envelope, RobotPoint, VisionPoint};
pub use run::{RunCounters, RunPhase, RunState, RunSummary, UnadmittedColony};
pub use slot::{Slot, SlotAddress, SlotState};
pub use task::{PickTask, TaskState, Transfer};
