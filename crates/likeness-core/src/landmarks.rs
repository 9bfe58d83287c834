//! Geometric face signature: named distances between 68-point landmarks.
//!
//! Raw keypoints follow the iBUG 300-W 68-point convention (jaw 0–16,
//! brows 17–26, nose 27–35, eyes 36–47, mouth 48–67). Index pairs live in a
//! [`LandmarkLayout`] table so a different landmark model only needs a new table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Number of keypoints produced by a 68-point landmark model.
pub const LANDMARK_COUNT: usize = 68;

/// A single 2-D keypoint in image coordinates.
pub type Point = (f64, f64);

/// Named pair of landmark indices.
#[derive(Debug, Clone, Copy)]
pub struct DistancePair {
    pub key: &'static str,
    pub a: usize,
    pub b: usize,
}

const fn pair(key: &'static str, a: usize, b: usize) -> DistancePair {
    DistancePair { key, a, b }
}

/// Index table describing which keypoints feed each named measurement.
#[derive(Debug, Clone, Copy)]
pub struct LandmarkLayout {
    pub point_count: usize,
    /// Plain Euclidean distances between two keypoints.
    pub distances: &'static [DistancePair],
    /// Keypoint that symmetry measures are taken relative to.
    pub symmetry_anchor: usize,
    /// Left/right keypoints whose distances to the anchor are compared.
    pub symmetry: &'static [DistancePair],
}

impl LandmarkLayout {
    /// Total number of keys an extraction with this layout produces.
    pub fn key_count(&self) -> usize {
        self.distances.len() + self.symmetry.len()
    }

    /// Number of keypoints the index table reaches: one past the highest
    /// index it references.
    pub fn required_points(&self) -> usize {
        self.distances
            .iter()
            .chain(self.symmetry.iter())
            .flat_map(|p| [p.a, p.b])
            .chain(std::iter::once(self.symmetry_anchor))
            .max()
            .map_or(0, |max| max + 1)
    }
}

const IBUG_68_DISTANCES: [DistancePair; 11] = [
    pair("inter_eye", 36, 45),
    pair("left_eye_to_left_brow", 36, 19),
    pair("right_eye_to_right_brow", 42, 24),
    pair("nose_to_left_eye", 30, 36),
    pair("nose_to_right_eye", 30, 45),
    pair("nose_width", 31, 35),
    pair("mouth_width", 48, 54),
    pair("upper_lip_to_lower_lip", 62, 66),
    pair("chin_to_jaw_left", 8, 0),
    pair("chin_to_jaw_right", 8, 16),
    pair("nose_to_chin", 30, 8),
];

const IBUG_68_SYMMETRY: [DistancePair; 4] = [
    pair("eye_symmetry", 36, 45),
    pair("brow_symmetry", 19, 24),
    pair("mouth_symmetry", 48, 54),
    pair("jaw_symmetry", 0, 16),
];

/// The iBUG 68-point layout (nose tip = 30).
pub const IBUG_68: LandmarkLayout = LandmarkLayout {
    point_count: LANDMARK_COUNT,
    distances: &IBUG_68_DISTANCES,
    symmetry_anchor: 30,
    symmetry: &IBUG_68_SYMMETRY,
};

/// Ordered keypoints as returned by a landmark detector.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLandmarks {
    pub points: Vec<Point>,
}

impl RawLandmarks {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Named geometric measurements of one face, all non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkDistances(BTreeMap<String, f64>);

impl LandmarkDistances {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for LandmarkDistances {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn euclidean(a: Point, b: Point) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

/// Extract the 15 named distances (11 raw, 4 symmetry) from 68 keypoints.
pub fn extract_landmark_distances(raw: &RawLandmarks) -> Result<LandmarkDistances, AnalysisError> {
    extract_with_layout(raw, &IBUG_68)
}

/// Extract distances using an explicit index layout.
///
/// The point count is checked before any indexed access.
pub fn extract_with_layout(
    raw: &RawLandmarks,
    layout: &LandmarkLayout,
) -> Result<LandmarkDistances, AnalysisError> {
    if raw.len() != layout.point_count {
        return Err(AnalysisError::InvalidLandmarkShape {
            expected: layout.point_count,
            found: raw.len(),
        });
    }
    let required = layout.required_points();
    if required > layout.point_count {
        return Err(AnalysisError::InvalidLandmarkShape {
            expected: required,
            found: layout.point_count,
        });
    }

    let pts = &raw.points;
    let anchor = pts[layout.symmetry_anchor];

    let mut out = BTreeMap::new();
    for p in layout.distances {
        out.insert(p.key.to_string(), euclidean(pts[p.a], pts[p.b]));
    }
    for p in layout.symmetry {
        let delta = (euclidean(pts[p.a], anchor) - euclidean(pts[p.b], anchor)).abs();
        out.insert(p.key.to_string(), delta);
    }

    Ok(LandmarkDistances(out))
}

/// Compare two distance maps into a 0–100 confidence.
///
/// Sums per-key absolute differences, divides by `max_difference` and maps
/// `[0, 1]` linearly onto `[100, 0]`; anything beyond clamps to 0.
pub fn compare_distances(
    a: &LandmarkDistances,
    b: &LandmarkDistances,
    max_difference: f64,
) -> Result<f64, AnalysisError> {
    if a.len() != b.len() {
        return Err(AnalysisError::KeyMismatch(format!(
            "{} keys vs {} keys",
            a.len(),
            b.len()
        )));
    }

    let mut total_difference = 0.0;
    for (key, va) in a.iter() {
        let vb = b
            .get(key)
            .ok_or_else(|| AnalysisError::KeyMismatch(format!("missing key {key:?}")))?;
        total_difference += (va - vb).abs();
    }

    let normalized = total_difference / max_difference;
    Ok((100.0 * (1.0 - normalized)).max(0.0))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A plausible 68-point face laid out on a 160x160 frame.
    pub(crate) fn synthetic_face(jitter: f64) -> RawLandmarks {
        let mut points = Vec::with_capacity(LANDMARK_COUNT);
        // jaw 0..=16 along a U shape
        for i in 0..17 {
            let t = i as f64 / 16.0;
            let x = 30.0 + 100.0 * t;
            let y = 70.0 + 60.0 * (1.0 - (2.0 * t - 1.0).powi(2));
            points.push((x, y));
        }
        // brows 17..=26
        for i in 0..10 {
            points.push((40.0 + 9.0 * i as f64, 50.0));
        }
        // nose bridge 27..=30, lower nose 31..=35
        for i in 0..4 {
            points.push((80.0, 58.0 + 8.0 * i as f64));
        }
        for i in 0..5 {
            points.push((70.0 + 5.0 * i as f64, 94.0));
        }
        // eyes 36..=47
        for i in 0..6 {
            points.push((45.0 + 5.0 * i as f64, 62.0));
        }
        for i in 0..6 {
            points.push((90.0 + 5.0 * i as f64, 62.0));
        }
        // mouth 48..=67
        for i in 0..20 {
            points.push((62.0 + 1.8 * i as f64, 110.0 + (i % 4) as f64));
        }
        for (i, p) in points.iter_mut().enumerate() {
            p.0 += jitter * ((i % 3) as f64 - 1.0);
        }
        RawLandmarks::new(points)
    }

    #[test]
    fn test_extract_produces_fifteen_non_negative_keys() {
        let d = extract_landmark_distances(&synthetic_face(0.0)).unwrap();
        assert_eq!(d.len(), 15);
        assert_eq!(d.len(), IBUG_68.key_count());
        assert!(d.iter().all(|(_, v)| v >= 0.0));
        assert!(d.get("inter_eye").is_some());
        assert!(d.get("jaw_symmetry").is_some());
    }

    #[test]
    fn test_extract_known_distance() {
        let d = extract_landmark_distances(&synthetic_face(0.0)).unwrap();
        // points 36 (45, 62) and 45 (105, 62)
        assert!((d.get("inter_eye").unwrap() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_extract_rejects_wrong_count() {
        let mut short = synthetic_face(0.0);
        short.points.truncate(67);
        match extract_landmark_distances(&short) {
            Err(AnalysisError::InvalidLandmarkShape { expected, found }) => {
                assert_eq!(expected, 68);
                assert_eq!(found, 67);
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let mut long = synthetic_face(0.0);
        long.points.push((0.0, 0.0));
        assert!(matches!(
            extract_landmark_distances(&long),
            Err(AnalysisError::InvalidLandmarkShape { found: 69, .. })
        ));

        assert!(extract_landmark_distances(&RawLandmarks::new(vec![])).is_err());
    }

    #[test]
    fn test_symmetric_face_has_zero_symmetry() {
        let mut points = vec![(0.0, 0.0); LANDMARK_COUNT];
        points[30] = (50.0, 50.0);
        points[36] = (30.0, 40.0);
        points[45] = (70.0, 40.0);
        let d = extract_landmark_distances(&RawLandmarks::new(points)).unwrap();
        assert_eq!(d.get("eye_symmetry"), Some(0.0));
    }

    #[test]
    fn test_compare_identical_is_exactly_100() {
        let d = extract_landmark_distances(&synthetic_face(1.5)).unwrap();
        assert_eq!(compare_distances(&d, &d, 200.0).unwrap(), 100.0);
    }

    #[test]
    fn test_compare_clamps_to_zero() {
        let a: LandmarkDistances = [("inter_eye".to_string(), 0.0)].into_iter().collect();
        let b: LandmarkDistances = [("inter_eye".to_string(), 300.0)].into_iter().collect();
        assert_eq!(compare_distances(&a, &b, 200.0).unwrap(), 0.0);
    }

    #[test]
    fn test_compare_linear_in_total_difference() {
        let a: LandmarkDistances = [("x".to_string(), 10.0), ("y".to_string(), 10.0)]
            .into_iter()
            .collect();
        let b: LandmarkDistances = [("x".to_string(), 15.0), ("y".to_string(), 5.0)]
            .into_iter()
            .collect();
        // total difference 10 / 200 = 0.05
        assert!((compare_distances(&a, &b, 200.0).unwrap() - 95.0).abs() < 1e-9);
    }

    #[test]
    fn test_compare_monotonic_in_difference() {
        let base: LandmarkDistances = [("k".to_string(), 50.0)].into_iter().collect();
        let mut prev = f64::INFINITY;
        for step in 0..30 {
            let other: LandmarkDistances =
                [("k".to_string(), 50.0 + 10.0 * step as f64)].into_iter().collect();
            let c = compare_distances(&base, &other, 200.0).unwrap();
            assert!(c < prev || (c == 0.0 && prev == 0.0), "step {step}: {c} vs {prev}");
            prev = c;
        }
        assert_eq!(prev, 0.0);
    }

    #[test]
    fn test_compare_key_mismatch() {
        let a: LandmarkDistances = [("x".to_string(), 1.0)].into_iter().collect();
        let b: LandmarkDistances = [("y".to_string(), 1.0)].into_iter().collect();
        assert!(matches!(
            compare_distances(&a, &b, 200.0),
            Err(AnalysisError::KeyMismatch(_))
        ));

        let c: LandmarkDistances = [("x".to_string(), 1.0), ("y".to_string(), 1.0)]
            .into_iter()
            .collect();
        assert!(matches!(
            compare_distances(&a, &c, 200.0),
            Err(AnalysisError::KeyMismatch(_))
        ));
    }

    #[test]
    fn test_layout_index_out_of_range_is_an_error() {
        const BAD_PAIRS: [DistancePair; 1] = [pair("wide", 0, 70)];
        let layout = LandmarkLayout {
            point_count: LANDMARK_COUNT,
            distances: &BAD_PAIRS,
            symmetry_anchor: 30,
            symmetry: &[],
        };
        assert_eq!(layout.required_points(), 71);
        assert!(matches!(
            extract_with_layout(&synthetic_face(0.0), &layout),
            Err(AnalysisError::InvalidLandmarkShape { expected: 71, found: 68 })
        ));

        let bad_anchor = LandmarkLayout {
            symmetry_anchor: 68,
            ..IBUG_68
        };
        assert!(extract_with_layout(&synthetic_face(0.0), &bad_anchor).is_err());
        assert_eq!(IBUG_68.required_points(), 67);
    }
}
