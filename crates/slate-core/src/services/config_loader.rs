use std::path::Path;

use crate::error::{Result, SlateError};
use crate::models::{BaseplateLayout, Envelope, RunParams};

/// Load and validate the baseplate-geometry document.
pub fn load_layout(path: &Path) -> Result<BaseplateLayout> {
    if !path.exists() {
        return Err(SlateError::ConfigNotFound(path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(path)?;
    let layout: BaseplateLayout =
        serde_yaml::from_str(&contents).map_err(|e| SlateError::InvalidConfig(e.to_string()))?;

    if layout.rows == 0 || layout.cols == 0 {
        return Err(SlateError::InvalidConfig(
            "baseplate grid must have at least one row and one column".into(),
        ));
    }
    if layout.pitch_x <= 0.0 || layout.pitch_y <= 0.0 {
        return Err(SlateError::InvalidConfig(
            "slot pitch must be positive".into(),
        ));
    }
    for addr in &layout.blocked {
        if !layout.contains_address(*addr) {
            return Err(SlateError::InvalidConfig(format!(
                "blocked slot {addr} is outside the {}x{} grid",
                layout.rows, layout.cols
            )));
        }
    }
    if layout.calibration.len() < 3 {
        return Err(SlateError::InvalidConfig(format!(
            "calibration needs at least 3 reference points, got {}",
            layout.calibration.len()
        )));
    }
    check_envelope(&layout.vision_envelope, "visionEnvelope")?;
    Ok(layout)
}

/// Load and validate the runtime-parameters document.
pub fn load_params(path: &Path) -> Result<RunParams> {
    if !path.exists() {
        return Err(SlateError::ConfigNotFound(path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(path)?;
    let params: RunParams =
        serde_yaml::from_str(&contents).map_err(|e| SlateError::InvalidConfig(e.to_string()))?;

    if params.safe_height <= 0.0 {
        return Err(SlateError::InvalidConfig(
            "safeHeight must be positive".into(),
        ));
    }
    if !(0.0..=1.0).contains(&params.min_confidence) {
        return Err(SlateError::InvalidConfig(
            "minConfidence must be within [0, 1]".into(),
        ));
    }
    check_envelope(&params.reach_envelope, "reachEnvelope")?;
    Ok(params)
}

fn check_envelope(envelope: &Envelope, name: &str) -> Result<()> {
    if envelope.min_x >= envelope.max_x || envelope.min_y >= envelope.max_y {
        return Err(SlateError::InvalidConfig(format!(
            "{name} bounds are inverted or empty"
        )));
    }
    Ok(())
}
