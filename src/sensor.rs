use avian3d::prelude::*;
use bevy::prelude::*;

use crate::config::ControllerConfig;

// Hits closer than this, or with a shorter normal, come from a ray that starts
// inside the collider.
const START_INSIDE_EPSILON: f32 = 1e-4;

// Upper bound on hits gathered per ray.
const MAX_RAY_HITS: u32 = 8;

/// Ray hit reported by [`PhysicsQueries::raycast`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

impl SurfaceHit {
    /// Whether the ray started inside the collider it reports.
    pub fn starts_inside(&self) -> bool {
        self.distance <= START_INSIDE_EPSILON
            || self.normal.length_squared() <= START_INSIDE_EPSILON
    }
}

/// The slice of the physics world the controller needs.
///
/// A collider qualifies for a query when its layer memberships intersect
/// `mask`.
pub trait PhysicsQueries {
    fn capsule_overlap(&self, p0: Vec3, p1: Vec3, radius: f32, mask: LayerMask) -> bool;

    fn sphere_overlap(&self, center: Vec3, radius: f32, mask: LayerMask) -> bool;

    /// Every hit along the ray, unordered. A collider containing `origin` is
    /// reported at distance zero with a zero normal.
    fn ray_hits(&self, origin: Vec3, direction: Dir3, max_distance: f32, mask: LayerMask)
    -> Vec<SurfaceHit>;

    /// Nearest surface the ray reaches from outside.
    ///
    /// Colliders containing `origin` are skipped, so a ray starting in the
    /// floor still finds the wall beyond it.
    fn raycast(
        &self,
        origin: Vec3,
        direction: Dir3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<SurfaceHit> {
        self.ray_hits(origin, direction, max_distance, mask)
            .into_iter()
            .filter(|hit| !hit.starts_inside())
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// [`PhysicsQueries`] over avian's [`SpatialQuery`], ignoring the character's
/// own collider.
pub struct SpatialQueries<'a, 'w, 's> {
    spatial_query: &'a SpatialQuery<'w, 's>,
    excluded: Entity,
}

impl<'a, 'w, 's> SpatialQueries<'a, 'w, 's> {
    pub fn new(spatial_query: &'a SpatialQuery<'w, 's>, excluded: Entity) -> Self {
        Self {
            spatial_query,
            excluded,
        }
    }

    fn filter(&self, mask: LayerMask) -> SpatialQueryFilter {
        SpatialQueryFilter::from_mask(mask).with_excluded_entities([self.excluded])
    }
}

impl PhysicsQueries for SpatialQueries<'_, '_, '_> {
    fn capsule_overlap(&self, p0: Vec3, p1: Vec3, radius: f32, mask: LayerMask) -> bool {
        let center = (p0 + p1) * 0.5;
        let shape = Collider::capsule_endpoints(radius, p0 - center, p1 - center);
        !self
            .spatial_query
            .shape_intersections(&shape, center, Quat::IDENTITY, &self.filter(mask))
            .is_empty()
    }

    fn sphere_overlap(&self, center: Vec3, radius: f32, mask: LayerMask) -> bool {
        let shape = Collider::sphere(radius);
        !self
            .spatial_query
            .shape_intersections(&shape, center, Quat::IDENTITY, &self.filter(mask))
            .is_empty()
    }

    fn ray_hits(
        &self,
        origin: Vec3,
        direction: Dir3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Vec<SurfaceHit> {
        self.spatial_query
            .ray_hits(
                origin,
                direction,
                max_distance,
                MAX_RAY_HITS,
                true,
                &self.filter(mask),
            )
            .into_iter()
            .map(|hit| SurfaceHit {
                point: origin + direction * hit.distance,
                normal: hit.normal,
                distance: hit.distance,
            })
            .collect()
    }
}

/// Whether the ground capsule under `position` touches anything in the ground
/// mask.
pub fn is_grounded(world: &impl PhysicsQueries, config: &ControllerConfig, position: Vec3) -> bool {
    let (top, bottom) = config.ground_capsule(position);
    world.capsule_overlap(top, bottom, config.ground_check_radius, config.ground_mask)
}

/// Whether a climbable surface lies within the climb sphere around `position`.
pub fn can_climb(world: &impl PhysicsQueries, config: &ControllerConfig, position: Vec3) -> bool {
    world.sphere_overlap(position, config.climb_check_radius, config.climbable_mask)
}

/// Bitwise layer test shared by every mask check.
pub fn layers_match(memberships: LayerMask, mask: LayerMask) -> bool {
    memberships & mask != LayerMask::NONE
}
