use std::collections::BTreeMap;

use log::debug;

use crate::detection::{Detection, PositionVector};
use crate::entity::TrackedEntity;

/// Thin association between the tracker's live identities and their
/// lifecycle records, created lazily as identities appear.
pub struct EntityStore {
    entities: BTreeMap<u32, TrackedEntity>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
        }
    }

    /// Brings the records in line with the tracker's live map after an
    /// update. `detections` must be the same frame's input; an identity's
    /// shape data comes from the detection whose position vector equals the
    /// identity's current position.
    ///
    /// Records of evicted identities are removed and handed back so the
    /// counting stage can consume their terminal state.
    pub fn reconcile(
        &mut self,
        live: &BTreeMap<u32, PositionVector>,
        detections: &[Detection],
    ) -> Vec<TrackedEntity> {
        for (&id, pos) in live {
            let matched = detections.iter().find(|d| d.position() == *pos);

            match (self.entities.get_mut(&id), matched) {
                (Some(entity), Some(det)) => {
                    entity.set_centroid(pos.centroid());
                    entity.class = det.class;
                    entity.bbox = det.bbox.clone();
                    entity.polygon = det.polygon.clone();
                }
                (None, Some(det)) => {
                    self.entities.insert(id, TrackedEntity::new(id, det));
                }
                // identity went unmatched this frame: keep the last known
                // record as-is
                (Some(_), None) => {}
                (None, None) => {}
            }
        }

        let stale: Vec<u32> = self
            .entities
            .keys()
            .filter(|id| !live.contains_key(*id))
            .copied()
            .collect();

        let mut evicted = Vec::with_capacity(stale.len());
        for id in stale {
            if let Some(entity) = self.entities.remove(&id) {
                debug!("dropping record for evicted identity {}", id);
                evicted.push(entity);
            }
        }

        evicted
    }

    #[inline]
    pub fn get(&self, id: u32) -> Option<&TrackedEntity> {
        self.entities.get(&id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: u32) -> Option<&mut TrackedEntity> {
        self.entities.get_mut(&id)
    }

    #[inline]
    pub fn all(&self) -> &BTreeMap<u32, TrackedEntity> {
        &self.entities
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
