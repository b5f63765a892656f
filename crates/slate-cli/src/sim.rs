//! Simulated vision and motion collaborators for dry runs without
//! hardware attached.

use std::time::Duration;

use slate_core::error::Result;
use slate_core::models::{
    BaseplateLayout, ColonyDetection, Envelope, MotionCommand, MotionOutcome, PlateLocation,
    VisionPoint,
};
use slate_core::services::{MotionDriver, VisionSystem};

/// Deterministic stand-in for the camera stack: scatters a fixed number of
/// colonies over the vision envelope, seeded from the plate id so repeated
/// runs see the same plate the same way.
pub struct SimulatedVision {
    envelope: Envelope,
    colonies_per_plate: u32,
}

impl SimulatedVision {
    pub fn new(layout: &BaseplateLayout, colonies_per_plate: u32) -> Self {
        Self {
            envelope: layout.vision_envelope,
            colonies_per_plate,
        }
    }
}

impl VisionSystem for SimulatedVision {
    async fn detect_colonies(&self, plate: &PlateLocation) -> Result<Vec<ColonyDetection>> {
        let mut rng = Xorshift::from_plate(&plate.id);
        let span_x = self.envelope.max_x - self.envelope.min_x;
        let span_y = self.envelope.max_y - self.envelope.min_y;

        let detections = (0..self.colonies_per_plate)
            .map(|id| ColonyDetection {
                id: id + 1,
                plate_id: plate.id.clone(),
                position: VisionPoint::new(
                    self.envelope.min_x + rng.next_f64() * span_x,
                    self.envelope.min_y + rng.next_f64() * span_y,
                ),
                confidence: 0.55 + 0.4 * rng.next_f64(),
            })
            .collect();
        Ok(detections)
    }
}

/// Stand-in for the motion controller: every command succeeds after a
/// short latency, with sterilize cycles taking proportionally longer.
pub struct SimulatedMotion {
    latency_ms: u64,
}

impl SimulatedMotion {
    pub fn new(latency_ms: u64) -> Self {
        Self { latency_ms }
    }
}

impl MotionDriver for SimulatedMotion {
    async fn execute(&mut self, command: &MotionCommand) -> MotionOutcome {
        tracing::debug!(?command, "executing");
        let latency = match command {
            // 10 ms of simulated time per second of dwell and cooling.
            MotionCommand::Sterilize { dwell_s, cool_s, .. } => {
                self.latency_ms + ((dwell_s + cool_s) * 10.0) as u64
            }
            _ => self.latency_ms,
        };
        tokio::time::sleep(Duration::from_millis(latency)).await;
        MotionOutcome::Success
    }
}

/// xorshift64*: deterministic, dependency-free scatter for the simulator.
struct Xorshift(u64);

impl Xorshift {
    fn from_plate(plate_id: &str) -> Self {
        let seed = plate_id
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
                (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
            });
        Self(seed.max(1))
    }

    fn next_f64(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        let bits = x.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 11;
        bits as f64 / (1u64 << 53) as f64
    }
}
