// Face metric calculators
//
// Landmarks follow the 68-point layout (jaw 0-16, brows 17-26, nose 27-35,
// eyes 36-47, mouth 48-67) in pixel coordinates of the analysed frame.

use serde::{Deserialize, Serialize};

const LEFT_EYE: std::ops::Range<usize> = 36..42;
const RIGHT_EYE: std::ops::Range<usize> = 42..48;
const NOSE_TIP: usize = 30;
const LEFT_EYE_OUTER: usize = 36;
const RIGHT_EYE_OUTER: usize = 45;

/// Eye aspect ratio of a fully open eye
const OPEN_EYE_RATIO: f64 = 0.3;

const UNUSUAL_EXPRESSIONS: [&str; 3] = ["angry", "disgusted", "fearful"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    /// Detector confidence for this point, when reported
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl Landmark {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub positions: Vec<Landmark>,
}

impl FaceLandmarks {
    pub fn left_eye(&self) -> &[Landmark] {
        self.positions.get(LEFT_EYE).unwrap_or(&[])
    }

    pub fn right_eye(&self) -> &[Landmark] {
        self.positions.get(RIGHT_EYE).unwrap_or(&[])
    }

    pub fn nose_tip(&self) -> Option<Point> {
        self.positions.get(NOSE_TIP).map(Landmark::point)
    }
}

/// Expression probabilities (0-1) as reported by the detector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Expressions {
    #[serde(default)]
    pub neutral: f64,
    #[serde(default)]
    pub happy: f64,
    #[serde(default)]
    pub sad: f64,
    #[serde(default)]
    pub angry: f64,
    #[serde(default)]
    pub fearful: f64,
    #[serde(default)]
    pub disgusted: f64,
    #[serde(default)]
    pub surprised: f64,
}

impl Expressions {
    pub fn values(&self) -> [(&'static str, f64); 7] {
        [
            ("neutral", self.neutral),
            ("happy", self.happy),
            ("sad", self.sad),
            ("angry", self.angry),
            ("fearful", self.fearful),
            ("disgusted", self.disgusted),
            ("surprised", self.surprised),
        ]
    }

    /// Name and probability of the strongest expression
    pub fn dominant(&self) -> (&'static str, f64) {
        self.values()
            .into_iter()
            .filter(|(_, p)| p.is_finite())
            .fold(("neutral", f64::MIN), |best, cur| if cur.1 > best.1 { cur } else { best })
    }
}

/// One face found in a video frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub landmarks: FaceLandmarks,
    pub expressions: Expressions,
    pub frame_width: u32,
    pub frame_height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    pub yaw: f64,
    pub pitch: f64,
}

/// Per-frame behavioral metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceFrameMetrics {
    pub looking_away: bool,
    pub suspicious_movement: bool,
    pub expression_change: bool,
    pub unusual_expression: bool,
    pub attention: f64,
    pub confidence: f64,
    pub head_pose: Option<HeadPose>,
}

/// Offset of the eye centroid from the frame centre, normalized to frame size
///
/// The centroid is the midpoint of the outer corners of both eyes.
pub fn eye_centroid_offset(detection: &FaceDetection) -> Option<Point> {
    let left = detection.landmarks.positions.get(LEFT_EYE_OUTER)?;
    let right = detection.landmarks.positions.get(RIGHT_EYE_OUTER)?;
    if detection.frame_width == 0 || detection.frame_height == 0 {
        return None;
    }

    let center = Point::new((left.x + right.x) / 2.0, (left.y + right.y) / 2.0);
    let offset = Point::new(
        center.x / detection.frame_width as f64 - 0.5,
        center.y / detection.frame_height as f64 - 0.5,
    );
    offset.is_finite().then_some(offset)
}

pub fn is_looking_away(offset: Point, threshold: f64) -> bool {
    offset.x.abs() > threshold || offset.y.abs() > threshold
}

/// Displacement between consecutive reference points, 0 without a previous point
pub fn movement_distance(previous: Option<Point>, current: Point) -> f64 {
    match previous {
        Some(prev) if prev.is_finite() && current.is_finite() => prev.distance(&current),
        _ => 0.0,
    }
}

pub fn is_suspicious_movement(distance: f64, threshold_px: f64) -> bool {
    distance > threshold_px
}

/// True when any expression probability moved by more than `threshold`
pub fn expression_changed(previous: &Expressions, current: &Expressions, threshold: f64) -> bool {
    previous
        .values()
        .iter()
        .zip(current.values().iter())
        .any(|((_, before), (_, after))| (after - before).abs() > threshold)
}

/// Eye aspect ratio from six eye landmarks, 0 for degenerate eyes
pub fn eye_aspect_ratio(eye: &[Landmark]) -> f64 {
    if eye.len() < 6 {
        return 0.0;
    }
    let p = |i: usize| eye[i].point();
    let vertical = p(1).distance(&p(5)) + p(2).distance(&p(4));
    let horizontal = p(0).distance(&p(3));
    if horizontal <= f64::EPSILON || !vertical.is_finite() {
        return 0.0;
    }
    vertical / (2.0 * horizontal)
}

/// Attention in [0, 1] from the average eye aspect ratio
pub fn calculate_attention(landmarks: &FaceLandmarks) -> f64 {
    let left = eye_aspect_ratio(landmarks.left_eye());
    let right = eye_aspect_ratio(landmarks.right_eye());
    let average = (left + right) / 2.0;
    (average / OPEN_EYE_RATIO).clamp(0.0, 1.0)
}

pub fn estimate_head_pose(landmarks: &FaceLandmarks) -> Option<HeadPose> {
    let nose = landmarks.nose_tip()?;
    let left = landmarks.positions.get(LEFT_EYE_OUTER)?.point();
    let right = landmarks.positions.get(RIGHT_EYE_OUTER)?.point();

    let eye_span = right.x - left.x;
    if eye_span.abs() <= f64::EPSILON {
        return None;
    }
    let eye_center = Point::new((left.x + right.x) / 2.0, (left.y + right.y) / 2.0);
    let pose = HeadPose {
        yaw: (nose.x - eye_center.x) / eye_span,
        pitch: (nose.y - eye_center.y) / eye_span,
    };
    (pose.yaw.is_finite() && pose.pitch.is_finite()).then_some(pose)
}

/// Mean of the strongest expression probability and landmark confidence
pub fn detection_confidence(detection: &FaceDetection) -> f64 {
    let positions = &detection.landmarks.positions;
    if positions.is_empty() {
        return 0.0;
    }
    let (_, expression_confidence) = detection.expressions.dominant();
    let landmark_confidence = positions
        .iter()
        .map(|p| p.confidence.unwrap_or(1.0))
        .sum::<f64>()
        / positions.len() as f64;
    ((expression_confidence.max(0.0) + landmark_confidence) / 2.0).clamp(0.0, 1.0)
}

pub fn is_unusual_expression(expressions: &Expressions) -> bool {
    let (name, probability) = expressions.dominant();
    probability > 0.0 && UNUSUAL_EXPRESSIONS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landmarks_with(overrides: &[(usize, f64, f64)]) -> FaceLandmarks {
        let mut positions = vec![Landmark::default(); 68];
        for &(i, x, y) in overrides {
            positions[i] = Landmark {
                x,
                y,
                confidence: None,
            };
        }
        FaceLandmarks { positions }
    }

    #[test]
    fn test_look_away_threshold() {
        assert!(is_looking_away(Point::new(0.25, 0.0), 0.2));
        assert!(!is_looking_away(Point::new(0.1, -0.1), 0.2));
        assert!(is_looking_away(Point::new(0.0, -0.3), 0.2));
    }

    #[test]
    fn test_eye_centroid_offset_centered_face() {
        let detection = FaceDetection {
            landmarks: landmarks_with(&[(36, 280.0, 240.0), (45, 360.0, 240.0)]),
            frame_width: 640,
            frame_height: 480,
            ..Default::default()
        };
        let offset = eye_centroid_offset(&detection).unwrap();
        assert!(offset.x.abs() < 1e-9);
        assert!(offset.y.abs() < 1e-9);
    }

    #[test]
    fn test_eye_centroid_offset_degenerate() {
        assert!(eye_centroid_offset(&FaceDetection::default()).is_none());
    }

    #[test]
    fn test_movement_distance() {
        assert_eq!(movement_distance(None, Point::new(5.0, 5.0)), 0.0);
        assert_eq!(movement_distance(Some(Point::new(0.0, 0.0)), Point::new(3.0, 4.0)), 5.0);
        assert!(is_suspicious_movement(25.0, 20.0));
        assert!(!is_suspicious_movement(20.0, 20.0));
    }

    #[test]
    fn test_expression_change() {
        let calm = Expressions {
            neutral: 0.9,
            ..Default::default()
        };
        let surprised = Expressions {
            neutral: 0.4,
            surprised: 0.5,
            ..Default::default()
        };
        assert!(!expression_changed(&calm, &calm, 0.3));
        assert!(expression_changed(&calm, &surprised, 0.3));
    }

    #[test]
    fn test_attention_open_eyes() {
        // Eye 30px wide, 9px tall on both verticals: EAR = 0.3
        let eye = |base: usize, x0: f64| {
            vec![
                (base, x0, 100.0),
                (base + 1, x0 + 10.0, 95.5),
                (base + 2, x0 + 20.0, 95.5),
                (base + 3, x0 + 30.0, 100.0),
                (base + 4, x0 + 20.0, 104.5),
                (base + 5, x0 + 10.0, 104.5),
            ]
        };
        let mut points = eye(36, 100.0);
        points.extend(eye(42, 200.0));
        let landmarks = landmarks_with(&points);
        assert!((calculate_attention(&landmarks) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_attention_no_landmarks() {
        assert_eq!(calculate_attention(&FaceLandmarks::default()), 0.0);
    }

    #[test]
    fn test_head_pose() {
        let landmarks = landmarks_with(&[(30, 160.0, 150.0), (36, 100.0, 100.0), (45, 200.0, 100.0)]);
        let pose = estimate_head_pose(&landmarks).unwrap();
        assert!((pose.yaw - 0.1).abs() < 1e-9);
        assert!((pose.pitch - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_unusual_expression() {
        let angry = Expressions {
            angry: 0.8,
            neutral: 0.1,
            ..Default::default()
        };
        assert!(is_unusual_expression(&angry));
        assert!(!is_unusual_expression(&Expressions::default()));
    }

    #[test]
    fn test_detection_confidence() {
        let detection = FaceDetection {
            landmarks: landmarks_with(&[]),
            expressions: Expressions {
                happy: 0.6,
                ..Default::default()
            },
            frame_width: 640,
            frame_height: 480,
        };
        assert!((detection_confidence(&detection) - 0.8).abs() < 1e-9);
        assert_eq!(detection_confidence(&FaceDetection::default()), 0.0);
    }
}
