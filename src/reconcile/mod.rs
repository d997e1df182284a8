//! World-space centroids for objects whose host world transform may be broken.
//!
//! Two strategies place an object's geometry in the world:
//!
//! * **composed chain**: the host-evaluated world matrix, correct for most objects;
//! * **location sum**: the plain sum of local translations up the parent chain, plus the
//!   object's own rotation and scale. Objects linked under joint subtrees carry a broken
//!   parent-inverse offset, so only this strategy places them correctly.
//!
//! A [`SelectionPolicy`] decides which strategy applies to each object.

pub mod chain;
pub mod recenter;

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ObjectError;
use crate::export::mesh_id::slug;

pub use chain::TransformChain;
pub use recenter::recenter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMethod {
    ComposedChain,
    LocationSum,
    Invalid,
}

impl ReconcileMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileMethod::ComposedChain => "composed_chain",
            ReconcileMethod::LocationSum => "location_sum",
            ReconcileMethod::Invalid => "invalid",
        }
    }
}

impl fmt::Display for ReconcileMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plausible placement of a torso structure, in authoring units (Z up).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidityBounds {
    pub min_height: f32,
    pub max_height: f32,
    /// Maximum horizontal distance from the vertical body axis.
    pub max_lateral: f32,
    /// Candidates further apart than this are reported as a discrepancy.
    pub discrepancy_tolerance: f32,
}

impl Default for ValidityBounds {
    fn default() -> Self {
        Self {
            min_height: 0.3,
            max_height: 2.5,
            max_lateral: 0.5,
            discrepancy_tolerance: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum Implausible {
    #[error("height {height:.3} < {min}")]
    TooLow { height: f32, min: f32 },
    #[error("height {height:.3} > {max}")]
    TooHigh { height: f32, max: f32 },
    #[error("lateral {lateral:.3} > {max}")]
    TooLateral { lateral: f32, max: f32 },
    #[error("position is not finite")]
    NotFinite,
}

impl ValidityBounds {
    pub fn check(&self, position: Vec3) -> Result<(), Implausible> {
        if !position.is_finite() {
            return Err(Implausible::NotFinite);
        }

        let height = position.z;
        if height < self.min_height {
            return Err(Implausible::TooLow {
                height,
                min: self.min_height,
            });
        }
        if height > self.max_height {
            return Err(Implausible::TooHigh {
                height,
                max: self.max_height,
            });
        }

        let lateral = position.truncate().length();
        if lateral > self.max_lateral {
            return Err(Implausible::TooLateral {
                lateral,
                max: self.max_lateral,
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Objects whose name matches a pattern use the location sum, all others the
    /// composed chain, without validation.
    Allowlist {
        #[serde(default = "default_allowlist_patterns")]
        patterns: Vec<String>,
    },
    /// Computes both candidates and keeps the plausible one, preferring the composed chain.
    ValidateAndFallback,
}

/// Structures known to sit under the broken joint subtree.
fn default_allowlist_patterns() -> Vec<String> {
    ["pubic_ligament", "inguinal_ligament", "interpubic", "symphysis"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl SelectionPolicy {
    pub fn default_allowlist() -> Self {
        SelectionPolicy::Allowlist {
            patterns: default_allowlist_patterns(),
        }
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        SelectionPolicy::ValidateAndFallback
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidates {
    pub composed_chain: Vec3,
    pub location_sum: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// World-space centroid in authoring axes. For `Invalid` this is the composed
    /// chain candidate, kept for reporting only.
    pub center: Vec3,
    pub method: ReconcileMethod,
    pub candidates: Candidates,
    /// Distance between the candidates when both were plausible but disagreed.
    pub discrepancy: Option<f32>,
    pub invalid_reason: Option<String>,
}

/// Chooses a world-space centroid for one object.
///
/// Pure: the result depends only on the arguments.
pub fn reconcile(
    name: &str,
    chain: &TransformChain,
    positions: &[Vec3],
    policy: &SelectionPolicy,
    bounds: &ValidityBounds,
) -> Result<Reconciled, ObjectError> {
    if positions.is_empty() {
        return Err(ObjectError::EmptyGeometry);
    }

    let local_centroid = positions.iter().copied().sum::<Vec3>() / positions.len() as f32;
    if !local_centroid.is_finite() {
        return Err(ObjectError::NonFiniteGeometry);
    }

    let candidates = Candidates {
        composed_chain: chain
            .composed_chain_placement()
            .transform_point3(local_centroid),
        location_sum: chain.location_sum_placement().transform_point3(local_centroid),
    };

    let reconciled = match policy {
        SelectionPolicy::Allowlist { patterns } => {
            let name_slug = slug(name);
            let listed = patterns
                .iter()
                .any(|pattern| name_slug.contains(slug(pattern).as_str()));

            let (center, method) = if listed {
                (candidates.location_sum, ReconcileMethod::LocationSum)
            } else {
                (candidates.composed_chain, ReconcileMethod::ComposedChain)
            };

            Reconciled {
                center,
                method,
                candidates,
                discrepancy: None,
                invalid_reason: None,
            }
        }
        SelectionPolicy::ValidateAndFallback => validate_and_fallback(name, candidates, bounds),
    };

    log::debug!(
        "{}: composed_chain={:?} location_sum={:?} -> {}",
        name,
        candidates.composed_chain,
        candidates.location_sum,
        reconciled.method
    );

    Ok(reconciled)
}

fn validate_and_fallback(
    name: &str,
    candidates: Candidates,
    bounds: &ValidityBounds,
) -> Reconciled {
    let composed = bounds.check(candidates.composed_chain);
    let summed = bounds.check(candidates.location_sum);

    let mut reconciled = Reconciled {
        center: candidates.composed_chain,
        method: ReconcileMethod::ComposedChain,
        candidates,
        discrepancy: None,
        invalid_reason: None,
    };

    match (composed, summed) {
        (Ok(()), Ok(())) => {
            let distance = candidates.composed_chain.distance(candidates.location_sum);
            if distance > bounds.discrepancy_tolerance {
                log::warn!(
                    "{}: methods differ by {:.3}, using composed chain",
                    name,
                    distance
                );
                reconciled.discrepancy = Some(distance);
            }
        }
        (Ok(()), Err(_)) => {}
        (Err(_), Ok(())) => {
            reconciled.center = candidates.location_sum;
            reconciled.method = ReconcileMethod::LocationSum;
        }
        (Err(composed), Err(summed)) => {
            log::warn!("{}: both placement methods are implausible", name);
            reconciled.method = ReconcileMethod::Invalid;
            reconciled.invalid_reason = Some(format!(
                "composed_chain: {}; location_sum: {}",
                composed, summed
            ));
        }
    }

    reconciled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_graph::Transform;
    use approx::assert_relative_eq;
    use glam::{Mat4, Quat};

    fn cube_around(center: Vec3, half: f32) -> Vec<Vec3> {
        let mut positions = Vec::new();
        for x in [-half, half] {
            for y in [-half, half] {
                for z in [-half, half] {
                    positions.push(center + Vec3::new(x, y, z));
                }
            }
        }
        positions
    }

    /// A ligament whose parent-inverse cancels its joint's height.
    fn broken_chain() -> TransformChain {
        let local = Transform::from_translation(Vec3::new(0.01, -0.02, 0.1));
        let joint = Mat4::from_translation(Vec3::new(0.0, 0.0, 0.9));
        let stale_inverse = Mat4::from_translation(Vec3::new(0.0, 0.0, -0.9));

        TransformChain {
            local,
            host_world: joint * stale_inverse * local.local_matrix(),
            ancestor_translations: vec![Vec3::new(0.0, 0.0, 0.9)],
        }
    }

    #[test]
    fn root_objects_get_identical_candidates() {
        let local = Transform::from_euler_xyz(
            Vec3::new(0.05, -0.1, 1.2),
            Vec3::new(0.3, 0.2, 0.1),
            Vec3::new(1.0, 1.5, 0.8),
        );
        let chain = TransformChain {
            local,
            host_world: local.local_matrix(),
            ancestor_translations: Vec::new(),
        };
        let positions = cube_around(Vec3::new(0.02, 0.01, -0.03), 0.05);

        for policy in [SelectionPolicy::ValidateAndFallback, SelectionPolicy::default_allowlist()] {
            let reconciled = reconcile(
                "Rectus abdominis muscle",
                &chain,
                &positions,
                &policy,
                &ValidityBounds::default(),
            )
            .unwrap();

            assert!(reconciled
                .candidates
                .composed_chain
                .abs_diff_eq(reconciled.candidates.location_sum, 1e-5));
            assert_eq!(reconciled.method, ReconcileMethod::ComposedChain);
            assert!(reconciled.discrepancy.is_none());
        }
    }

    #[test]
    fn falls_back_to_location_sum_when_composed_chain_is_too_low() {
        let chain = broken_chain();
        let positions = cube_around(Vec3::ZERO, 0.02);

        let reconciled = reconcile(
            "Inferior pubic ligament.l",
            &chain,
            &positions,
            &SelectionPolicy::ValidateAndFallback,
            &ValidityBounds::default(),
        )
        .unwrap();

        assert_relative_eq!(reconciled.candidates.composed_chain.z, 0.1, epsilon = 1e-5);
        assert_relative_eq!(reconciled.candidates.location_sum.z, 1.0, epsilon = 1e-5);
        assert_eq!(reconciled.method, ReconcileMethod::LocationSum);
        assert_eq!(reconciled.method.as_str(), "location_sum");
        assert!(reconciled
            .center
            .abs_diff_eq(Vec3::new(0.01, -0.02, 1.0), 1e-5));
    }

    #[test]
    fn prefers_composed_chain_and_reports_discrepancy() {
        let local = Transform::from_translation(Vec3::new(0.0, 0.0, 0.2));
        let chain = TransformChain {
            local,
            host_world: Mat4::from_translation(Vec3::new(0.0, 0.0, 1.3)),
            ancestor_translations: vec![Vec3::new(0.0, 0.0, 0.9)],
        };

        let reconciled = reconcile(
            "Diaphragm",
            &chain,
            &[Vec3::ZERO],
            &SelectionPolicy::ValidateAndFallback,
            &ValidityBounds::default(),
        )
        .unwrap();

        assert_eq!(reconciled.method, ReconcileMethod::ComposedChain);
        assert_relative_eq!(reconciled.center.z, 1.3, epsilon = 1e-5);
        assert_relative_eq!(reconciled.discrepancy.unwrap(), 0.2, epsilon = 1e-5);
    }

    #[test]
    fn both_implausible_is_invalid_with_reason() {
        let chain = TransformChain {
            local: Transform::from_translation(Vec3::new(2.0, 0.0, 0.0)),
            host_world: Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)),
            ancestor_translations: Vec::new(),
        };

        let reconciled = reconcile(
            "Stray rib",
            &chain,
            &[Vec3::ZERO],
            &SelectionPolicy::ValidateAndFallback,
            &ValidityBounds::default(),
        )
        .unwrap();

        assert_eq!(reconciled.method, ReconcileMethod::Invalid);
        let reason = reconciled.invalid_reason.unwrap();
        assert!(reason.contains("composed_chain: height 5.000 > 2.5"), "{reason}");
        assert!(reason.contains("location_sum: height 0.000 < 0.3"), "{reason}");
    }

    #[test]
    fn allowlist_selects_by_name_without_validation() {
        let chain = broken_chain();
        let positions = [Vec3::ZERO];
        let policy = SelectionPolicy::default_allowlist();
        let bounds = ValidityBounds::default();

        let listed = reconcile("Inferior pubic ligament.l", &chain, &positions, &policy, &bounds)
            .unwrap();
        assert_eq!(listed.method, ReconcileMethod::LocationSum);

        // Not listed: the implausible composed chain is used as is.
        let unlisted =
            reconcile("Sacrospinous band", &chain, &positions, &policy, &bounds).unwrap();
        assert_eq!(unlisted.method, ReconcileMethod::ComposedChain);
        assert_relative_eq!(unlisted.center.z, 0.1, epsilon = 1e-5);
    }

    #[test]
    fn custom_bounds_change_the_verdict() {
        let chain = broken_chain();
        let bounds = ValidityBounds {
            min_height: 0.05,
            ..Default::default()
        };

        let reconciled = reconcile(
            "Inferior pubic ligament.l",
            &chain,
            &[Vec3::ZERO],
            &SelectionPolicy::ValidateAndFallback,
            &bounds,
        )
        .unwrap();

        assert_eq!(reconciled.method, ReconcileMethod::ComposedChain);
        assert!(reconciled.discrepancy.is_some());
    }

    #[test]
    fn location_sum_applies_own_rotation_and_scale() {
        let local = Transform::from_trs(
            Vec3::new(0.0, 0.0, 0.05),
            Quat::from_rotation_x(std::f32::consts::PI),
            Vec3::splat(-0.1),
        );
        let chain = TransformChain {
            local,
            host_world: Mat4::from_translation(Vec3::new(0.0, 0.0, -1.0)),
            ancestor_translations: vec![Vec3::new(0.0, 0.0, 1.0)],
        };

        let reconciled = reconcile(
            "Interpubic disc",
            &chain,
            &[Vec3::new(0.0, 0.0, 1.0)],
            &SelectionPolicy::ValidateAndFallback,
            &ValidityBounds::default(),
        )
        .unwrap();

        // Scale -0.1 then a half turn about X maps +Z to +0.1 Z.
        assert_eq!(reconciled.method, ReconcileMethod::LocationSum);
        assert!(reconciled
            .center
            .abs_diff_eq(Vec3::new(0.0, 0.0, 1.15), 1e-5));
    }

    #[test]
    fn empty_geometry_is_an_error() {
        let result = reconcile(
            "Sternum",
            &broken_chain(),
            &[],
            &SelectionPolicy::ValidateAndFallback,
            &ValidityBounds::default(),
        );
        assert!(matches!(result, Err(ObjectError::EmptyGeometry)));
    }

    #[test]
    fn bounds_check_reports_the_failing_axis() {
        let bounds = ValidityBounds::default();
        assert!(bounds.check(Vec3::new(0.1, 0.1, 1.0)).is_ok());
        assert!(matches!(
            bounds.check(Vec3::new(0.4, 0.4, 1.0)),
            Err(Implausible::TooLateral { .. })
        ));
        assert!(matches!(
            bounds.check(Vec3::new(0.0, 0.0, f32::INFINITY)),
            Err(Implausible::NotFinite)
        ));
    }
}
