pub mod bbox;
pub mod detection;
pub mod entity;
pub mod error;
pub mod store;
pub mod tracker;

mod circular_queue;

pub use detection::{Detection, PositionVector};
pub use entity::TrackedEntity;
pub use store::EntityStore;
pub use tracker::{CentroidTracker, TrackerConfig};

use error::Error;
use std::collections::BTreeMap;

pub trait Tracking {
    fn update(&mut self, detections: &[Detection])
        -> Result<&BTreeMap<u32, PositionVector>, Error>;
    fn objects(&self) -> &BTreeMap<u32, PositionVector>;
}
