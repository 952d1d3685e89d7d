use nalgebra as na;

use crate::bbox::{BBox, Ltwh};
use crate::circular_queue::CircularQueue;
use crate::Detection;

/// Only the last known centroid is retained.
const CENTROID_TRAIL_LEN: usize = 1;

/// Lifecycle record for one tracked identity, consumed by the downstream
/// classification and counting stages.
#[derive(Debug, Clone)]
pub struct TrackedEntity {
    pub id: u32,
    pub class: i32,
    pub bbox: BBox<Ltwh>,
    pub polygon: Vec<na::Point2<i32>>,
    centroids: CircularQueue<na::Point2<i32>>,
    counted: bool,
    classified: bool,
}

impl TrackedEntity {
    pub fn new(id: u32, det: &Detection) -> Self {
        let mut centroids = CircularQueue::with_capacity(CENTROID_TRAIL_LEN);
        centroids.push(det.position().centroid());

        Self {
            id,
            class: det.class,
            bbox: det.bbox.clone(),
            polygon: det.polygon.clone(),
            centroids,
            counted: false,
            classified: false,
        }
    }

    /// Last known centroid.
    #[inline]
    pub fn centroid(&self) -> na::Point2<i32> {
        *self.centroids.latest().unwrap()
    }

    #[inline]
    pub fn set_centroid(&mut self, centroid: na::Point2<i32>) {
        self.centroids.push(centroid);
    }

    /// Recorded centroids, newest first.
    #[inline]
    pub fn trail(&self) -> impl Iterator<Item = &na::Point2<i32>> {
        self.centroids.iter()
    }

    #[inline(always)]
    pub fn is_counted(&self) -> bool {
        self.counted
    }

    /// Flipped once by the counting stage; never reset.
    #[inline]
    pub fn mark_counted(&mut self) {
        self.counted = true;
    }

    #[inline(always)]
    pub fn is_classified(&self) -> bool {
        self.classified
    }

    /// Flipped once by the classification stage; never reset.
    #[inline]
    pub fn mark_classified(&mut self) {
        self.classified = true;
    }
}
