use std::collections::BTreeMap;

use log::{debug, trace};
use ndarray::prelude::*;

use crate::detection::{Detection, PositionVector};
use crate::error::Error;
use crate::Tracking;

pub struct TrackerConfig {
    /// Consecutive unmatched frames an identity survives before eviction.
    pub max_disappeared: u32,
    /// Assignment cutoff, in centroid units.
    pub max_distance: f32,
}

impl TrackerConfig {
    pub fn new(max_disappeared: u32, max_distance: f32) -> Self {
        Self {
            max_disappeared,
            max_distance,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_disappeared: 50,
            max_distance: 50.0,
        }
    }
}

/// Maintains the authoritative set of live identities and matches each
/// frame's detections against them by centroid distance.
///
/// Ids are monotonic and never reused. The live map iterates in ascending
/// id order, which is registration order.
pub struct CentroidTracker {
    config: TrackerConfig,
    next_id: u32,
    objects: BTreeMap<u32, PositionVector>,
    disappeared: BTreeMap<u32, u32>,
}

impl CentroidTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            next_id: 0,
            objects: BTreeMap::new(),
            disappeared: BTreeMap::new(),
        }
    }

    /// Matches `detections` against the live identities and advances the
    /// survival bookkeeping. Matching happens only here; `objects` is the
    /// read accessor.
    pub fn update(
        &mut self,
        detections: &[Detection],
    ) -> Result<&BTreeMap<u32, PositionVector>, Error> {
        if detections.is_empty() {
            // nothing visible: age every identity, evict the over-due
            let max_disappeared = self.config.max_disappeared;
            let stale: Vec<u32> = self
                .disappeared
                .iter_mut()
                .filter_map(|(&id, count)| {
                    *count += 1;

                    if *count > max_disappeared {
                        Some(id)
                    } else {
                        None
                    }
                })
                .collect();

            for id in stale {
                self.deregister(id)?;
            }

            return Ok(&self.objects);
        }

        let positions: Vec<PositionVector> =
            detections.iter().map(PositionVector::from).collect();

        if self.objects.is_empty() {
            for pos in positions {
                self.register(pos);
            }

            return Ok(&self.objects);
        }

        let ids: Vec<u32> = self.objects.keys().copied().collect();
        let centroids: Vec<PositionVector> = self.objects.values().copied().collect();

        let dist = Array2::from_shape_fn((ids.len(), positions.len()), |(row, col)| {
            centroids[row].distance(&positions[col])
        });

        // rows ordered by their minimum, ascending: the identity with the
        // closest candidate gets first claim
        let row_min: Vec<f32> = dist
            .rows()
            .into_iter()
            .map(|row| row.iter().copied().fold(f32::INFINITY, f32::min))
            .collect();

        let mut rows: Vec<usize> = (0..ids.len()).collect();
        rows.sort_by(|&a, &b| row_min[a].partial_cmp(&row_min[b]).unwrap());

        // each row's preferred column: index of its minimum, lowest on ties
        let cols: Vec<usize> = dist
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold(0, |best, (idx, &d)| if d < row[best] { idx } else { best })
            })
            .collect();

        let mut used_rows = vec![false; ids.len()];
        let mut used_cols = vec![false; positions.len()];

        for &row in &rows {
            let col = cols[row];

            if used_rows[row] || used_cols[col] {
                continue;
            }

            if dist[(row, col)] > self.config.max_distance {
                continue;
            }

            let id = ids[row];
            self.objects.insert(id, positions[col]);
            self.disappeared.insert(id, 0);

            used_rows[row] = true;
            used_cols[col] = true;
        }

        if ids.len() >= positions.len() {
            // a deficit in detections is a disappearance, not an eviction
            // paired with a registration
            for (row, &used) in used_rows.iter().enumerate() {
                if used {
                    continue;
                }

                let id = ids[row];
                let count = {
                    let count = self.disappeared.entry(id).or_insert(0);
                    *count += 1;
                    *count
                };

                if count > self.config.max_disappeared {
                    self.deregister(id)?;
                }
            }
        } else {
            for (col, &used) in used_cols.iter().enumerate() {
                if !used {
                    self.register(positions[col]);
                }
            }
        }

        Ok(&self.objects)
    }

    /// Assigns the next id to `position`. Ids start at 0 and are never
    /// reused, even after eviction.
    pub fn register(&mut self, position: PositionVector) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        self.objects.insert(id, position);
        self.disappeared.insert(id, 0);

        trace!("registered identity {} at ({}, {})", id, position.x, position.y);

        id
    }

    /// Removes a live identity. Passing an id the tracker does not own is a
    /// caller bug and is reported as [`Error::UnknownIdentity`].
    pub fn deregister(&mut self, id: u32) -> Result<(), Error> {
        if self.objects.remove(&id).is_none() {
            return Err(Error::UnknownIdentity(id));
        }

        self.disappeared.remove(&id);
        debug!("evicted identity {}", id);

        Ok(())
    }

    /// Live identities and their last matched positions. Never mutates.
    #[inline]
    pub fn objects(&self) -> &BTreeMap<u32, PositionVector> {
        &self.objects
    }

    /// Consecutive unmatched frames for a live identity.
    #[inline]
    pub fn disappeared_frames(&self, id: u32) -> Option<u32> {
        self.disappeared.get(&id).copied()
    }
}

impl Default for CentroidTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl Tracking for CentroidTracker {
    fn update(
        &mut self,
        detections: &[Detection],
    ) -> Result<&BTreeMap<u32, PositionVector>, Error> {
        CentroidTracker::update(self, detections)
    }

    fn objects(&self) -> &BTreeMap<u32, PositionVector> {
        CentroidTracker::objects(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;

    // 20x20 box whose centroid lands on (x, y)
    fn det(class: i32, x: i32, y: i32) -> Detection {
        Detection::new(class, BBox::ltwh(x - 10, y - 10, 20, 20))
    }

    #[test]
    fn empty_input_on_empty_tracker_is_noop() {
        let mut tracker = CentroidTracker::default();

        for _ in 0..5 {
            assert!(tracker.update(&[]).unwrap().is_empty());
        }
    }

    #[test]
    fn first_frame_registers_in_input_order() {
        let mut tracker = CentroidTracker::default();

        let objects = tracker
            .update(&[det(1, 100, 100), det(1, 200, 100), det(2, 300, 100)])
            .unwrap();

        assert_eq!(objects.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(objects[&0].x, 100);
        assert_eq!(objects[&1].x, 200);
        assert_eq!(objects[&2].x, 300);
    }

    #[test]
    fn rebind_within_distance_resets_disappeared() {
        let mut tracker = CentroidTracker::default();
        tracker.update(&[det(1, 100, 100)]).unwrap();
        tracker.update(&[]).unwrap();
        assert_eq!(tracker.disappeared_frames(0), Some(1));

        let objects = tracker.update(&[det(1, 101, 100)]).unwrap();

        assert_eq!(objects.keys().copied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(objects[&0].x, 101);
        assert_eq!(tracker.disappeared_frames(0), Some(0));
    }

    #[test]
    fn evicted_on_exactly_the_call_past_the_window() {
        let mut tracker = CentroidTracker::new(TrackerConfig::new(3, 50.0));
        tracker.update(&[det(1, 100, 100)]).unwrap();

        for frame in 1..=3 {
            tracker.update(&[]).unwrap();
            assert_eq!(tracker.disappeared_frames(0), Some(frame));
        }

        assert!(tracker.update(&[]).unwrap().is_empty());
    }

    #[test]
    fn far_detection_registers_new_when_detections_outnumber() {
        let mut tracker = CentroidTracker::default();
        tracker.update(&[det(0, 100, 100)]).unwrap();

        let objects = tracker.update(&[det(0, 105, 100), det(0, 300, 100)]).unwrap();

        assert_eq!(objects.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(objects[&0].x, 105);
        assert_eq!(objects[&1].x, 300);
    }

    #[test]
    fn rejected_nearest_column_still_registers_as_new() {
        let mut tracker = CentroidTracker::default();
        tracker.update(&[det(0, 100, 100)]).unwrap();

        // both candidates out of reach: neither binds to id 0, both become
        // fresh identities, and id 0 is left untouched this frame
        let objects = tracker.update(&[det(0, 300, 100), det(0, 900, 100)]).unwrap();

        assert_eq!(objects.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(objects[&0].x, 100);
        assert_eq!(objects[&1].x, 300);
        assert_eq!(objects[&2].x, 900);
        assert_eq!(tracker.disappeared_frames(0), Some(0));
    }

    #[test]
    fn far_detection_ages_identity_when_counts_are_equal() {
        let mut tracker = CentroidTracker::default();
        tracker.update(&[det(0, 100, 100)]).unwrap();

        // one identity, one detection out of reach: the identity ages and
        // the detection is dropped this frame
        let objects = tracker.update(&[det(0, 300, 100)]).unwrap();

        assert_eq!(objects.keys().copied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(objects[&0].x, 100);
        assert_eq!(tracker.disappeared_frames(0), Some(1));
    }

    #[test]
    fn unmatched_identity_untouched_when_detections_outnumber() {
        let mut tracker = CentroidTracker::default();
        tracker.update(&[det(0, 100, 100), det(0, 500, 100)]).unwrap();
        tracker.update(&[]).unwrap();
        assert_eq!(tracker.disappeared_frames(1), Some(1));

        // id 0 matches; id 1 has no candidate in reach, but with more
        // detections than identities its counter is left as-is
        tracker
            .update(&[det(0, 100, 100), det(0, 900, 100), det(0, 1200, 100)])
            .unwrap();

        assert_eq!(tracker.disappeared_frames(1), Some(1));
        assert_eq!(tracker.objects().len(), 4);
    }

    #[test]
    fn identities_never_cross_categories() {
        let mut tracker = CentroidTracker::default();
        tracker.update(&[det(0, 100, 100), det(100, 100, 100)]).unwrap();

        // same spots, reversed input order: the class axis keeps each
        // identity on its own category
        let objects = tracker.update(&[det(100, 100, 100), det(0, 100, 100)]).unwrap();

        assert_eq!(objects[&0].class, 0);
        assert_eq!(objects[&1].class, 100);
    }

    #[test]
    fn cross_category_candidate_is_rejected() {
        let mut tracker = CentroidTracker::default();
        tracker.update(&[det(0, 100, 100)]).unwrap();

        // spatially identical but 100 apart on the class axis
        let objects = tracker.update(&[det(100, 100, 100)]).unwrap();

        assert_eq!(objects.keys().copied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(objects[&0].class, 0);
        assert_eq!(tracker.disappeared_frames(0), Some(1));
    }

    #[test]
    fn ids_are_never_reused_after_eviction() {
        let mut tracker = CentroidTracker::new(TrackerConfig::new(0, 50.0));
        tracker.update(&[det(1, 100, 100)]).unwrap();
        assert!(tracker.update(&[]).unwrap().is_empty());

        let objects = tracker.update(&[det(1, 100, 100)]).unwrap();

        assert_eq!(objects.keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn closest_identity_claims_a_contested_detection() {
        let mut tracker = CentroidTracker::default();
        tracker.update(&[det(0, 100, 100), det(0, 130, 100)]).unwrap();

        let objects = tracker.update(&[det(0, 112, 100)]).unwrap();

        assert_eq!(objects[&0].x, 112);
        assert_eq!(objects[&1].x, 130);
        assert_eq!(tracker.disappeared_frames(0), Some(0));
        assert_eq!(tracker.disappeared_frames(1), Some(1));
    }

    #[test]
    fn deregister_unknown_identity_is_an_error() {
        let mut tracker = CentroidTracker::default();

        assert!(matches!(
            tracker.deregister(7),
            Err(Error::UnknownIdentity(7))
        ));
    }

    #[test]
    fn register_returns_monotonic_ids() {
        let mut tracker = CentroidTracker::default();
        let a = tracker.register(det(0, 10, 10).position());
        let b = tracker.register(det(0, 20, 10).position());

        assert_eq!((a, b), (0, 1));
        tracker.deregister(a).unwrap();
        assert_eq!(tracker.register(det(0, 30, 10).position()), 2);
    }
}
