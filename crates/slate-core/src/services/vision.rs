use crate::error::Result;
use crate::models::{ColonyDetection, PlateLocation};

/// The vision collaborator: yields the full batch of colony detections for
/// one plate. Blocking call, no partial results; the orchestrator may
/// invoke it for the next plate while the current plate's tasks execute.
pub trait VisionSystem {
    fn detect_colonies(
        &self,
        plate: &PlateLocation,
    ) -> impl std::future::Future<Output = Result<Vec<ColonyDetection>>> + Send;
}
