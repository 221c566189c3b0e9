//! 68-point face landmark geometry.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{GlowError, Result};

/// Points in the 68-point landmark model.
pub const LANDMARK_COUNT: usize = 68;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub cx: f64,
    pub cy: f64,
    pub rx: f64,
    pub ry: f64,
}

/// Named index ranges of the 68-point model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkRegion {
    Jawline,
    LeftEyebrow,
    RightEyebrow,
    NoseBridge,
    NoseLower,
    LeftEye,
    RightEye,
    OuterMouth,
    InnerMouth,
}

impl LandmarkRegion {
    pub const ALL: [LandmarkRegion; 9] = [
        Self::Jawline,
        Self::LeftEyebrow,
        Self::RightEyebrow,
        Self::NoseBridge,
        Self::NoseLower,
        Self::LeftEye,
        Self::RightEye,
        Self::OuterMouth,
        Self::InnerMouth,
    ];

    pub fn range(&self) -> RangeInclusive<usize> {
        match self {
            Self::Jawline => 0..=16,
            Self::LeftEyebrow => 17..=21,
            Self::RightEyebrow => 22..=26,
            Self::NoseBridge => 27..=30,
            Self::NoseLower => 31..=35,
            Self::LeftEye => 36..=41,
            Self::RightEye => 42..=47,
            Self::OuterMouth => 48..=59,
            Self::InnerMouth => 60..=67,
        }
    }
}

/// A complete set of 68 landmark positions, in frame pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct FaceLandmarks {
    positions: Vec<Point>,
}

impl FaceLandmarks {
    pub fn new(positions: Vec<Point>) -> Result<Self> {
        if positions.len() != LANDMARK_COUNT {
            return Err(GlowError::InvalidConfig(format!(
                "Expected {LANDMARK_COUNT} landmarks, got {}",
                positions.len()
            )));
        }
        Ok(Self { positions })
    }

    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    /// Point by model index (0-67).
    pub fn point(&self, index: usize) -> Point {
        self.positions[index.min(LANDMARK_COUNT - 1)]
    }

    pub fn region(&self, region: LandmarkRegion) -> &[Point] {
        &self.positions[region.range()]
    }

    pub fn region_center(&self, region: LandmarkRegion) -> Point {
        center(self.region(region)).unwrap_or_default()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        bounding_box(&self.positions).unwrap_or(BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        })
    }

    /// Distance between eye centres, used to normalise scale across photos.
    pub fn inter_pupillary_distance(&self) -> f64 {
        self.region_center(LandmarkRegion::LeftEye)
            .distance(&self.region_center(LandmarkRegion::RightEye))
    }

    /// Ellipse covering the whole face, centred on the nose bridge and
    /// padded upward for the forehead.
    pub fn face_ellipse(&self) -> Ellipse {
        let bbox = self.bounding_box();
        let center = self.region_center(LandmarkRegion::NoseBridge);
        Ellipse {
            cx: center.x,
            cy: center.y - bbox.height * 0.05,
            rx: bbox.width / 2.0 * 1.1,
            ry: bbox.height / 2.0 * 1.15,
        }
    }

    /// Padded ellipses around each eye, `(left, right)`.
    pub fn eye_ellipses(&self) -> (Ellipse, Ellipse) {
        const PAD_X: f64 = 1.8;
        const PAD_Y: f64 = 2.5;

        let ellipse = |region| {
            let points = self.region(region);
            let c = center(points).unwrap_or_default();
            let b = bounding_box(points).unwrap_or(BoundingBox {
                x: c.x,
                y: c.y,
                width: 0.0,
                height: 0.0,
            });
            Ellipse {
                cx: c.x,
                cy: c.y,
                rx: b.width / 2.0 * PAD_X,
                ry: b.height / 2.0 * PAD_Y,
            }
        };
        (ellipse(LandmarkRegion::LeftEye), ellipse(LandmarkRegion::RightEye))
    }
}

impl TryFrom<Vec<Point>> for FaceLandmarks {
    type Error = GlowError;

    fn try_from(positions: Vec<Point>) -> Result<Self> {
        Self::new(positions)
    }
}

impl From<FaceLandmarks> for Vec<Point> {
    fn from(landmarks: FaceLandmarks) -> Self {
        landmarks.positions
    }
}

/// Centroid; `None` for no points.
pub fn center(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let (sx, sy) = points.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let n = points.len() as f64;
    Some(Point::new(sx / n, sy / n))
}

/// Axis-aligned bounds; `None` for no points.
pub fn bounding_box(points: &[Point]) -> Option<BoundingBox> {
    let first = points.first()?;
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    Some(BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}
