use crate::models::{MotionCommand, MotionOutcome};

/// The motion collaborator: executes one command at a time on the single
/// shared actuator and reports a tagged outcome.
///
/// The call is infallible at the type level; transport and hardware
/// errors surface as [`MotionOutcome::FatalFault`]. The orchestrator
/// blocks on each call; no two commands are ever in flight concurrently.
pub trait MotionDriver {
    fn execute(
        &mut self,
        command: &MotionCommand,
    ) -> impl std::future::Future<Output = MotionOutcome> + Send;
}
