use crate::rigid_body::{Body, BodyId};

/// Geometry definition of a joint between two bodies.
///
/// Implementations hold the joint's body-local configuration (anchors, axes,
/// reference orientations) and compute a world-space snapshot from the
/// bodies' current placements.
pub trait JointGeometry {
    /// The per-tick snapshot this geometry produces.
    type Data;

    fn calculate(&self, body_1: &Body, body_2: &Body) -> Self::Data;
}

/// Per-tick cache of the relative geometry between two jointed bodies.
///
/// A two-state machine: `reset` marks the cache stale at the tick boundary;
/// the first `data` access within the tick computes the snapshot and every
/// later access returns the same one, so all constraints attached to the
/// joint read consistent geometry.
#[derive(Debug)]
pub struct FramePrecalculation<G: JointGeometry> {
    body_1: BodyId,
    body_2: BodyId,
    geometry: G,
    data: Option<G::Data>,
}

impl<G: JointGeometry> FramePrecalculation<G> {
    pub fn new(body_1: BodyId, body_2: BodyId, geometry: G) -> Self {
        Self {
            body_1,
            body_2,
            geometry,
            data: None,
        }
    }

    /// The two bodies this joint connects, in constraint order.
    pub fn body_ids(&self) -> (BodyId, BodyId) {
        (self.body_1, self.body_2)
    }

    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    /// Mark the cached snapshot stale. Called once per tick by the solver.
    pub fn reset(&mut self) {
        self.data = None;
    }

    /// True if the snapshot has been computed since the last `reset`.
    pub fn is_fresh(&self) -> bool {
        self.data.is_some()
    }

    /// The snapshot for this tick, computing it on first access.
    ///
    /// The bodies passed in must be the ones named by `body_ids`.
    pub fn data(&mut self, body_1: &Body, body_2: &Body) -> &G::Data {
        let geometry = &self.geometry;
        self.data
            .get_or_insert_with(|| geometry.calculate(body_1, body_2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::MassMoments;
    use nalgebra::Vector3;

    struct CountingGeometry(std::cell::Cell<usize>);

    impl JointGeometry for CountingGeometry {
        type Data = usize;

        fn calculate(&self, _body_1: &Body, _body_2: &Body) -> usize {
            self.0.set(self.0.get() + 1);
            self.0.get()
        }
    }

    #[test]
    fn test_computes_once_per_tick() {
        let body_1 = Body::new(MassMoments::cuboid(1.0, Vector3::new(1.0, 1.0, 1.0))).unwrap();
        let body_2 = body_1.clone();
        let mut cache =
            FramePrecalculation::new(BodyId::invalid(), BodyId::invalid(), CountingGeometry(0.into()));

        assert!(!cache.is_fresh());
        assert_eq!(*cache.data(&body_1, &body_2), 1);
        assert!(cache.is_fresh());
        // Second access within the tick reuses the snapshot.
        assert_eq!(*cache.data(&body_1, &body_2), 1);

        cache.reset();
        assert!(!cache.is_fresh());
        assert_eq!(*cache.data(&body_1, &body_2), 2);
    }
}
