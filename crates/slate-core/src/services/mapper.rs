use crate::error::{Result, SlateError};
use crate::models::{Envelope, ReferencePair, RobotPoint, VisionPoint};

/// Determinants below this are treated as a degenerate calibration.
const DEGENERATE_EPS: f64 = 1e-9;

/// Coefficients of one affine map: `x' = a·x + b·y + c`, `y' = d·x + e·y + f`.
#[derive(Debug, Clone, Copy)]
struct Affine {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Affine {
    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.b * y + self.c,
            self.d * x + self.e * y + self.f,
        )
    }
}

/// Converts vision-space colony coordinates into robot-space coordinates.
///
/// The transform is a least-squares affine fit over the configured
/// reference-point correspondences, validated at construction. Mapping is
/// pure after that, so a mapper can be shared with the lookahead path.
#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    forward: Affine,
    inverse: Affine,
    envelope: Envelope,
}

impl CoordinateMapper {
    /// Fit the vision→robot transform from `pairs`.
    ///
    /// Rejects fewer than 3 correspondences, collinear references, and
    /// near-singular fits with `SlateError::Calibration`.
    pub fn fit(pairs: &[ReferencePair], envelope: Envelope) -> Result<Self> {
        if pairs.len() < 3 {
            return Err(SlateError::Calibration(format!(
                "need at least 3 reference points, got {}",
                pairs.len()
            )));
        }

        // Normal equations for the least-squares affine fit. The Gram
        // matrix is singular exactly when the vision points are collinear.
        let mut m = [[0.0f64; 3]; 3];
        let mut bx = [0.0f64; 3];
        let mut by = [0.0f64; 3];
        for pair in pairs {
            let row = [pair.vision.x, pair.vision.y, 1.0];
            for i in 0..3 {
                for j in 0..3 {
                    m[i][j] += row[i] * row[j];
                }
                bx[i] += row[i] * pair.robot.x;
                by[i] += row[i] * pair.robot.y;
            }
        }

        let det = det3(&m);
        if det.abs() < DEGENERATE_EPS {
            return Err(SlateError::Calibration(
                "reference points are collinear".into(),
            ));
        }

        let cx = solve3(&m, &bx, det);
        let cy = solve3(&m, &by, det);
        let forward = Affine {
            a: cx[0],
            b: cx[1],
            c: cx[2],
            d: cy[0],
            e: cy[1],
            f: cy[2],
        };

        let lin_det = forward.a * forward.e - forward.b * forward.d;
        if lin_det.abs() < DEGENERATE_EPS {
            return Err(SlateError::Calibration(
                "fitted transform is not invertible".into(),
            ));
        }

        let inverse = {
            let a = forward.e / lin_det;
            let b = -forward.b / lin_det;
            let d = -forward.d / lin_det;
            let e = forward.a / lin_det;
            Affine {
                a,
                b,
                c: -(a * forward.c + b * forward.f),
                d,
                e,
                f: -(d * forward.c + e * forward.f),
            }
        };

        Ok(Self {
            forward,
            inverse,
            envelope,
        })
    }

    /// Map a vision-space point into robot space.
    ///
    /// Fails with `SlateError::Calibration` when the point lies outside the
    /// configured vision envelope (extrapolation guard).
    pub fn map(&self, point: VisionPoint) -> Result<RobotPoint> {
        if !self.envelope.contains(point.x, point.y) {
            return Err(SlateError::Calibration(format!(
                "vision point ({}, {}) is outside the calibrated envelope",
                point.x, point.y
            )));
        }
        let (x, y) = self.forward.apply(point.x, point.y);
        Ok(RobotPoint::new(x, y))
    }

    /// Invert a robot-space point back into vision space.
    pub fn unmap(&self, point: RobotPoint) -> VisionPoint {
        let (x, y) = self.inverse.apply(point.x, point.y);
        VisionPoint::new(x, y)
    }
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Cramer's rule for the 3×3 system `m · x = b` with precomputed `det`.
fn solve3(m: &[[f64; 3]; 3], b: &[f64; 3], det: f64) -> [f64; 3] {
    let mut out = [0.0f64; 3];
    for col in 0..3 {
        let mut mc = *m;
        for row in 0..3 {
            mc[row][col] = b[row];
        }
        out[col] = det3(&mc) / det;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-6;

    fn pair(vx: f64, vy: f64, rx: f64, ry: f64) -> ReferencePair {
        ReferencePair {
            vision: VisionPoint::new(vx, vy),
            robot: RobotPoint::new(rx, ry),
        }
    }

    fn wide_envelope() -> Envelope {
        Envelope {
            min_x: -1000.0,
            max_x: 1000.0,
            min_y: -1000.0,
            max_y: 1000.0,
        }
    }

    #[test]
    fn fits_scale_and_offset() {
        // robot = vision * 2 + (10, -5)
        let pairs = [
            pair(0.0, 0.0, 10.0, -5.0),
            pair(100.0, 0.0, 210.0, -5.0),
            pair(0.0, 100.0, 10.0, 195.0),
        ];
        let mapper = CoordinateMapper::fit(&pairs, wide_envelope()).unwrap();
        let mapped = mapper.map(VisionPoint::new(50.0, 25.0)).unwrap();
        assert!((mapped.x - 110.0).abs() < TOL);
        assert!((mapped.y - 45.0).abs() < TOL);
    }

    #[test]
    fn overdetermined_fit_uses_all_pairs() {
        // Pure rotation by 90°, four references.
        let pairs = [
            pair(1.0, 0.0, 0.0, 1.0),
            pair(0.0, 1.0, -1.0, 0.0),
            pair(-1.0, 0.0, 0.0, -1.0),
            pair(0.0, -1.0, 1.0, 0.0),
        ];
        let mapper = CoordinateMapper::fit(&pairs, wide_envelope()).unwrap();
        let mapped = mapper.map(VisionPoint::new(3.0, 4.0)).unwrap();
        assert!((mapped.x + 4.0).abs() < TOL);
        assert!((mapped.y - 3.0).abs() < TOL);
    }

    #[test]
    fn round_trip_inside_envelope() {
        let pairs = [
            pair(0.0, 0.0, 300.0, 40.0),
            pair(200.0, 10.0, 705.0, 55.0),
            pair(20.0, 180.0, 330.0, 410.0),
        ];
        let mapper = CoordinateMapper::fit(&pairs, wide_envelope()).unwrap();
        let original = VisionPoint::new(73.5, 121.25);
        let back = mapper.unmap(mapper.map(original).unwrap());
        assert!((back.x - original.x).abs() < TOL);
        assert!((back.y - original.y).abs() < TOL);
    }

    #[test]
    fn rejects_too_few_references() {
        let pairs = [pair(0.0, 0.0, 0.0, 0.0), pair(1.0, 0.0, 1.0, 0.0)];
        assert!(matches!(
            CoordinateMapper::fit(&pairs, wide_envelope()),
            Err(SlateError::Calibration(_))
        ));
    }

    #[test]
    fn rejects_collinear_references() {
        let pairs = [
            pair(0.0, 0.0, 0.0, 0.0),
            pair(10.0, 10.0, 10.0, 10.0),
            pair(20.0, 20.0, 20.0, 20.0),
        ];
        assert!(matches!(
            CoordinateMapper::fit(&pairs, wide_envelope()),
            Err(SlateError::Calibration(_))
        ));
    }

    #[test]
    fn rejects_degenerate_target() {
        // All robot points identical: fit collapses, not invertible.
        let pairs = [
            pair(0.0, 0.0, 5.0, 5.0),
            pair(10.0, 0.0, 5.0, 5.0),
            pair(0.0, 10.0, 5.0, 5.0),
        ];
        assert!(matches!(
            CoordinateMapper::fit(&pairs, wide_envelope()),
            Err(SlateError::Calibration(_))
        ));
    }

    #[test]
    fn refuses_extrapolation() {
        let pairs = [
            pair(0.0, 0.0, 0.0, 0.0),
            pair(100.0, 0.0, 100.0, 0.0),
            pair(0.0, 100.0, 0.0, 100.0),
        ];
        let envelope = Envelope {
            min_x: 0.0,
            max_x: 100.0,
            min_y: 0.0,
            max_y: 100.0,
        };
        let mapper = CoordinateMapper::fit(&pairs, envelope).unwrap();
        assert!(mapper.map(VisionPoint::new(50.0, 50.0)).is_ok());
        assert!(matches!(
            mapper.map(VisionPoint::new(150.0, 50.0)),
            Err(SlateError::Calibration(_))
        ));
    }
}
