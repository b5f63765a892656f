use serde::{Deserialize, Serialize};

use super::geometry::VisionPoint;

/// One colony found by the vision system. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColonyDetection {
    /// Identifier assigned by the vision system, unique within its plate.
    pub id: u32,
    /// Source plate this colony was detected on.
    pub plate_id: String,
    pub position: VisionPoint,
    /// Detection confidence in `[0.0, 1.0]`.
    pub confidence: f64,
}
