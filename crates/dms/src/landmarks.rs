//! Facial landmark frames and aspect-ratio geometry

use serde::{Deserialize, Serialize};

use crate::DmsError;

/// Distances below this are treated as a collapsed contour
const MIN_SPAN: f32 = 1e-6;

/// A tracked landmark position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Point3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Landmarks of one camera frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameLandmarks {
    /// Capture timestamp (milliseconds, monotonic within a session)
    #[serde(default)]
    pub timestamp_ms: u64,
    /// Tracker mesh points, indexed by the active [`LandmarkLayout`]
    #[serde(default)]
    pub points: Vec<Point3>,
}

impl FrameLandmarks {
    pub fn new(timestamp_ms: u64, points: Vec<Point3>) -> Self {
        Self { timestamp_ms, points }
    }

    /// A frame without points means the tracker found no face
    pub fn has_face(&self) -> bool {
        !self.points.is_empty()
    }

    fn point(&self, index: usize) -> Result<Point3, DmsError> {
        self.points.get(index).copied().ok_or(DmsError::KeypointsMissing {
            index,
            available: self.points.len(),
        })
    }

    fn eye(&self, indices: &[usize; 6]) -> Result<[Point3; 6], DmsError> {
        let mut contour = [Point3::default(); 6];
        for (slot, &index) in contour.iter_mut().zip(indices) {
            *slot = self.point(index)?;
        }
        Ok(contour)
    }
}

/// Mouth landmark indices used for MAR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouthIndices {
    pub left: usize,
    pub right: usize,
    pub top: usize,
    pub bottom: usize,
}

/// Index layout of the upstream face tracker
///
/// Eye contours are ordered p1..p6: outer corner, two upper lid points,
/// inner corner, two lower lid points (p2 faces p6, p3 faces p5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkLayout {
    /// MediaPipe FaceMesh, 468 points
    #[default]
    MediaPipe,
    /// iBUG 300-W 68-point annotation (0-based)
    Ibug68,
}

impl LandmarkLayout {
    pub fn left_eye(&self) -> [usize; 6] {
        match self {
            LandmarkLayout::MediaPipe => [33, 160, 158, 133, 153, 144],
            LandmarkLayout::Ibug68 => [36, 37, 38, 39, 40, 41],
        }
    }

    pub fn right_eye(&self) -> [usize; 6] {
        match self {
            LandmarkLayout::MediaPipe => [362, 385, 387, 263, 373, 380],
            LandmarkLayout::Ibug68 => [42, 43, 44, 45, 46, 47],
        }
    }

    pub fn mouth(&self) -> MouthIndices {
        match self {
            LandmarkLayout::MediaPipe => MouthIndices {
                left: 61,
                right: 291,
                top: 13,
                bottom: 14,
            },
            LandmarkLayout::Ibug68 => MouthIndices {
                left: 60,
                right: 64,
                top: 62,
                bottom: 66,
            },
        }
    }

    /// Number of points a frame needs for this layout
    pub fn point_count(&self) -> usize {
        match self {
            LandmarkLayout::MediaPipe => 468,
            LandmarkLayout::Ibug68 => 68,
        }
    }

    /// Average of left and right eye aspect ratios
    pub fn average_ear(&self, frame: &FrameLandmarks) -> Result<f32, DmsError> {
        let left = eye_aspect_ratio(&frame.eye(&self.left_eye())?)?;
        let right = eye_aspect_ratio(&frame.eye(&self.right_eye())?)?;
        Ok((left + right) / 2.0)
    }

    /// Mouth aspect ratio
    pub fn mar(&self, frame: &FrameLandmarks) -> Result<f32, DmsError> {
        let mouth = self.mouth();
        mouth_aspect_ratio(
            frame.point(mouth.left)?,
            frame.point(mouth.right)?,
            frame.point(mouth.top)?,
            frame.point(mouth.bottom)?,
        )
    }
}

/// EAR = (|p2-p6| + |p3-p5|) / (2 |p1-p4|)
pub fn eye_aspect_ratio(contour: &[Point3; 6]) -> Result<f32, DmsError> {
    let [p1, p2, p3, p4, p5, p6] = contour;
    let width = p1.distance(p4);
    if width < MIN_SPAN {
        return Err(DmsError::DegenerateGeometry("eye width"));
    }
    Ok((p2.distance(p6) + p3.distance(p5)) / (2.0 * width))
}

/// MAR = |top-bottom| / |left-right|
pub fn mouth_aspect_ratio(
    left: Point3,
    right: Point3,
    top: Point3,
    bottom: Point3,
) -> Result<f32, DmsError> {
    let width = left.distance(&right);
    if width < MIN_SPAN {
        return Err(DmsError::DegenerateGeometry("mouth width"));
    }
    Ok(top.distance(&bottom) / width)
}

/// Synthetic frames with exact EAR and MAR, shared by tests across the workspace
#[doc(hidden)]
pub mod fixtures {
    use super::*;

    /// Eye contour of width 1.0 whose EAR equals `ear`
    pub fn eye_contour(origin_x: f32, ear: f32) -> [Point3; 6] {
        let h = ear / 2.0;
        [
            Point3::new(origin_x, 0.0, 0.0),
            Point3::new(origin_x + 0.33, h, 0.0),
            Point3::new(origin_x + 0.66, h, 0.0),
            Point3::new(origin_x + 1.0, 0.0, 0.0),
            Point3::new(origin_x + 0.66, -h, 0.0),
            Point3::new(origin_x + 0.33, -h, 0.0),
        ]
    }

    /// Builds a frame in `layout` with the given EAR (both eyes) and MAR
    pub fn frame(layout: LandmarkLayout, timestamp_ms: u64, ear: f32, mar: f32) -> FrameLandmarks {
        let mut points = vec![Point3::default(); layout.point_count()];
        for (indices, origin) in [(layout.left_eye(), 0.0), (layout.right_eye(), 2.0)] {
            for (&index, point) in indices.iter().zip(eye_contour(origin, ear)) {
                points[index] = point;
            }
        }
        let mouth = layout.mouth();
        points[mouth.left] = Point3::new(0.0, -2.0, 0.0);
        points[mouth.right] = Point3::new(2.0, -2.0, 0.0);
        points[mouth.top] = Point3::new(1.0, -2.0 + mar, 0.0);
        points[mouth.bottom] = Point3::new(1.0, -2.0 - mar, 0.0);
        FrameLandmarks::new(timestamp_ms, points)
    }
}
