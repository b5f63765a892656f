use serde::Deserialize;

use super::geometry::{Envelope, RobotPoint, VisionPoint};
use super::slot::SlotAddress;

/// One calibration correspondence: where a known reference mark appears in
/// vision space and where it physically sits in robot space.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReferencePair {
    pub vision: VisionPoint,
    pub robot: RobotPoint,
}

/// Imaging position of one source plate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateLocation {
    pub id: String,
    pub position: RobotPoint,
}

/// The baseplate-geometry document: grid shape, unusable wells, the robot
/// coordinates of the slot grid, plate imaging locations, and the camera
/// calibration references. Loaded once at run start, immutable after.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseplateLayout {
    pub rows: u32,
    pub cols: u32,
    /// Robot-space position of slot (0, 0).
    pub origin: RobotPoint,
    /// Center-to-center spacing between adjacent columns.
    pub pitch_x: f64,
    /// Center-to-center spacing between adjacent rows.
    pub pitch_y: f64,
    /// Pre-marked unusable wells, never allocated.
    #[serde(default)]
    pub blocked: Vec<SlotAddress>,
    #[serde(default)]
    pub plates: Vec<PlateLocation>,
    /// Reference-point correspondences for the vision→robot transform.
    pub calibration: Vec<ReferencePair>,
    /// Valid vision-space working area; mapping outside it is refused.
    pub vision_envelope: Envelope,
}

impl BaseplateLayout {
    pub fn capacity(&self) -> usize {
        (self.rows as usize) * (self.cols as usize)
    }

    pub fn contains_address(&self, addr: SlotAddress) -> bool {
        addr.row < self.rows && addr.col < self.cols
    }

    /// Robot-space center of a slot.
    pub fn slot_position(&self, addr: SlotAddress) -> RobotPoint {
        RobotPoint::new(
            self.origin.x + f64::from(addr.col) * self.pitch_x,
            self.origin.y + f64::from(addr.row) * self.pitch_y,
        )
    }

    pub fn plate(&self, id: &str) -> Option<&PlateLocation> {
        self.plates.iter().find(|p| p.id == id)
    }
}

/// Sterilizer station used between transfers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SterilizerParams {
    pub position: RobotPoint,
    /// Seconds the head dwells in the sterilizer.
    pub dwell_s: f64,
    /// Seconds the head cools before the next pick.
    pub cool_s: f64,
}

fn default_retry_limit() -> u32 {
    1
}

fn default_lookahead() -> bool {
    true
}

/// The runtime-parameters document. Loaded once at run start; changing it
/// requires a new run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunParams {
    /// Retries per task after its first failed attempt.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    /// Detections below this confidence are skipped, not picked.
    #[serde(default)]
    pub min_confidence: f64,
    /// Transit height that clears all baseplate fixtures.
    pub safe_height: f64,
    /// The robot's reachable coordinate range.
    pub reach_envelope: Envelope,
    /// Prepare the next plate's detections while the current plate's tasks
    /// execute (bounded to one pending batch).
    #[serde(default = "default_lookahead")]
    pub lookahead: bool,
    #[serde(default)]
    pub sterilizer: Option<SterilizerParams>,
    /// Where to park the head once the run completes.
    #[serde(default)]
    pub park: Option<RobotPoint>,
}
