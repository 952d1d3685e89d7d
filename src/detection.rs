use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltwh};

/// One candidate object reported by the contour stage for a single frame.
/// Carries no identity; identities are assigned by the tracker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    #[serde(rename = "c")]
    pub class: i32,
    pub bbox: BBox<Ltwh>,
    /// Contour approximation from the detector. Not used for matching;
    /// carried through to the entity record for downstream consumers.
    pub polygon: Vec<na::Point2<i32>>,
}

impl Detection {
    pub fn new(class: i32, bbox: BBox<Ltwh>) -> Self {
        Self {
            class,
            bbox,
            polygon: Vec::new(),
        }
    }

    pub fn with_polygon(class: i32, bbox: BBox<Ltwh>, polygon: Vec<na::Point2<i32>>) -> Self {
        Self {
            class,
            bbox,
            polygon,
        }
    }

    #[inline(always)]
    pub fn position(&self) -> PositionVector {
        PositionVector::new(self.class, &self.bbox)
    }
}

/// The matching key for nearest-neighbor assignment: the class label folded
/// in as a coordinate next to the bbox centroid. Euclidean distance between
/// vectors of different classes is inflated by the class-axis difference,
/// so cross-class matches lose without an explicit class filter (provided
/// the class encoding spacing exceeds the tracker's distance cutoff).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionVector {
    #[serde(rename = "c")]
    pub class: i32,
    pub x: i32,
    pub y: i32,
}

impl PositionVector {
    /// Centroid rule of the upstream contour stage, kept literal: the origin
    /// averaged with the far corner, integer-truncated.
    pub fn new(class: i32, bbox: &BBox<Ltwh>) -> Self {
        let x = (bbox.left() + (bbox.left() + bbox.width())) / 2;
        let y = (bbox.top() + (bbox.top() + bbox.height())) / 2;

        Self { class, x, y }
    }

    #[inline(always)]
    pub fn centroid(&self) -> na::Point2<i32> {
        na::Point2::new(self.x, self.y)
    }

    #[inline(always)]
    pub fn as_vector(&self) -> na::Vector3<f32> {
        na::Vector3::new(self.class as f32, self.x as f32, self.y as f32)
    }

    #[inline]
    pub fn distance(&self, other: &PositionVector) -> f32 {
        (self.as_vector() - other.as_vector()).norm()
    }
}

impl From<&Detection> for PositionVector {
    #[inline]
    fn from(det: &Detection) -> Self {
        det.position()
    }
}
