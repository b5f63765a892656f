use crate::error::{Result, SlateError};
use crate::models::{
    Envelope, MotionCommand, PickTask, RobotPoint, RunParams, SterilizerParams,
};

/// Expands pick tasks into the motion-command sequence the robot executes.
///
/// Tasks are visited strictly in the order supplied; the planner never
/// reorders for travel optimality. Its job is safety: every traversal
/// between points happens at the configured safe height, and any point
/// outside the reachable envelope is a planning error. Stateless.
pub struct MotionPlanner {
    safe_height: f64,
    envelope: Envelope,
    sterilizer: Option<SterilizerParams>,
    park: Option<RobotPoint>,
}

impl MotionPlanner {
    pub fn new(params: &RunParams) -> Self {
        Self {
            safe_height: params.safe_height,
            envelope: params.reach_envelope,
            sterilizer: params.sterilizer.clone(),
            park: params.park,
        }
    }

    /// Produce the command sequence for `tasks`, in order.
    ///
    /// Per task: an optional sterilize cycle, a safe-height transit to the
    /// pick point, the pick, a safe-height transit to the slot, the place.
    pub fn plan(&self, tasks: &[PickTask]) -> Result<Vec<MotionCommand>> {
        if let Some(sterilizer) = &self.sterilizer {
            self.check_reachable(sterilizer.position, "sterilizer")?;
        }

        let mut commands = Vec::new();
        for task in tasks {
            let transfer = task.transfer.as_ref().ok_or_else(|| {
                SlateError::Planning(format!("task {} has no reserved transfer", task.id))
            })?;
            self.check_reachable(transfer.pick, "pick point")?;
            self.check_reachable(transfer.place, "place point")?;

            if let Some(sterilizer) = &self.sterilizer {
                commands.push(MotionCommand::Sterilize {
                    point: sterilizer.position,
                    dwell_s: sterilizer.dwell_s,
                    cool_s: sterilizer.cool_s,
                });
            }
            commands.push(MotionCommand::MoveTo {
                point: transfer.pick,
                safe_height: self.safe_height,
            });
            commands.push(MotionCommand::Pick(transfer.pick));
            commands.push(MotionCommand::MoveTo {
                point: transfer.place,
                safe_height: self.safe_height,
            });
            commands.push(MotionCommand::Place(transfer.place));
        }
        Ok(commands)
    }

    /// The final move to the configured park position, if any.
    pub fn park(&self) -> Option<MotionCommand> {
        self.park.map(|point| MotionCommand::MoveTo {
            point,
            safe_height: self.safe_height,
        })
    }

    fn check_reachable(&self, point: RobotPoint, what: &str) -> Result<()> {
        if !self.envelope.contains(point.x, point.y) {
            return Err(SlateError::Planning(format!(
                "{what} ({}, {}) is outside the reachable envelope",
                point.x, point.y
            )));
        }
        Ok(())
    }
}
