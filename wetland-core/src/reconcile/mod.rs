//! Reconcile a candidate wetland contour against existing wetlands.
//!
//! The reconciler walks every other wetland, flags any overlap, rejects a
//! candidate that lies wholly inside an existing wetland and otherwise removes
//! already-claimed area from the candidate. The result is the candidate minus
//! the union of all other wetlands, so persisted wetlands never double-count
//! area.
//!
//! The scan is only as consistent as the `existing` slice it receives. Callers
//! must read that slice and persist the result inside one serialised
//! transaction (see [`crate::WetlandService`]).

mod area;
mod error;

use geo::{BooleanOps, BoundingRect, Intersects, MultiPolygon, Rect, Relate};
use log::{debug, warn};

pub use area::AreaMode;
pub use error::{AreaError, PolygonContainedError, ReconcileError};

use crate::WetlandId;
use crate::geometry::{normalise_via_wkt, parse_geojson_geometry};

/// Persisted boundary of one wetland, as read by the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct WetlandGeometryRecord {
    /// Identifier of the wetland; absent for a not-yet-persisted candidate.
    pub id: Option<WetlandId>,
    /// Contour of the wetland.
    pub geom: MultiPolygon<f64>,
}

impl WetlandGeometryRecord {
    /// Record for a persisted wetland.
    #[must_use]
    pub const fn persisted(id: WetlandId, geom: MultiPolygon<f64>) -> Self {
        Self { id: Some(id), geom }
    }
}

/// Outcome of a successful reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationResult {
    /// Candidate with every overlapping region removed.
    pub polygon: MultiPolygon<f64>,
    /// Whether the candidate overlapped at least one other wetland, even if
    /// nothing of that overlap remains in `polygon`.
    pub is_intersected: bool,
}

/// Tunables for [`GeometryReconciler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Surface measure used by [`GeometryReconciler::area`].
    pub area_mode: AreaMode,
    /// Re-read each difference from its WKT rendering.
    pub normalise_wkt: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            area_mode: AreaMode::Planar,
            normalise_wkt: true,
        }
    }
}

/// Stateless geometry-conflict resolver.
///
/// Instances hold configuration only and may be shared across threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryReconciler {
    config: ReconcilerConfig,
}

impl GeometryReconciler {
    /// Build a reconciler with the provided configuration.
    #[must_use]
    pub const fn new(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    /// Return the active configuration.
    #[must_use]
    pub const fn config(&self) -> ReconcilerConfig {
        self.config
    }

    /// Subtract every other wetland from `candidate`.
    ///
    /// The record whose id equals `exclude_id` is skipped so that editing a
    /// wetland does not conflict with its own stored contour. Containment is
    /// always tested against the original `candidate`, while overlap and
    /// subtraction apply to the progressively reduced contour.
    ///
    /// # Errors
    /// Returns [`ReconcileError::Contained`] when an existing wetland fully
    /// contains the candidate and [`ReconcileError::Geometry`] when the WKT
    /// normalisation of a difference fails.
    ///
    /// # Examples
    /// ```
    /// use geo::{MultiPolygon, Rect, coord};
    /// use wetland_core::{GeometryReconciler, ReconcileError, WetlandGeometryRecord, WetlandId};
    ///
    /// let square = |min: f64, max: f64| {
    ///     MultiPolygon::new(vec![
    ///         Rect::new(coord! { x: min, y: min }, coord! { x: max, y: max }).to_polygon(),
    ///     ])
    /// };
    /// let existing = vec![WetlandGeometryRecord::persisted(WetlandId(1), square(0.0, 10.0))];
    ///
    /// let err = GeometryReconciler::default()
    ///     .reconcile(&square(2.0, 8.0), None, &existing)
    ///     .expect_err("contained contour is rejected");
    /// assert!(matches!(err, ReconcileError::Contained(_)));
    /// ```
    pub fn reconcile(
        &self,
        candidate: &MultiPolygon<f64>,
        exclude_id: Option<WetlandId>,
        existing: &[WetlandGeometryRecord],
    ) -> Result<ReconciliationResult, ReconcileError> {
        let mut polygon = candidate.clone();
        let mut is_intersected = false;
        let Some(candidate_bounds) = candidate.bounding_rect() else {
            return Ok(ReconciliationResult {
                polygon,
                is_intersected,
            });
        };

        for record in existing
            .iter()
            .filter(|record| !is_excluded(record, exclude_id))
            .filter(|record| envelopes_meet(candidate_bounds, &record.geom))
        {
            if polygon.intersects(&record.geom) {
                is_intersected = true;
            }
            if record.geom.relate(candidate).is_contains() {
                return Err(PolygonContainedError {
                    existing_id: record.id,
                }
                .into());
            }
            let difference = polygon.difference(&record.geom);
            polygon = if self.config.normalise_wkt {
                normalise_via_wkt(&difference)?
            } else {
                difference
            };
            debug!(
                "subtracted wetland {} from candidate contour",
                record.id.map_or_else(|| "<unsaved>".to_owned(), |id| id.to_string())
            );
        }

        if polygon.0.is_empty() {
            warn!("candidate contour is entirely covered by existing wetlands");
        }

        Ok(ReconciliationResult {
            polygon,
            is_intersected,
        })
    }

    /// Parse a GeoJSON geometry and reconcile it.
    ///
    /// # Errors
    /// Returns [`ReconcileError::Geometry`] for unparsable payloads and
    /// otherwise behaves like [`GeometryReconciler::reconcile`].
    pub fn reconcile_geojson(
        &self,
        candidate: &str,
        exclude_id: Option<WetlandId>,
        existing: &[WetlandGeometryRecord],
    ) -> Result<ReconciliationResult, ReconcileError> {
        let polygon = parse_geojson_geometry(candidate)?;
        self.reconcile(&polygon, exclude_id, existing)
    }

    /// Surface of a contour in hectares, rounded to two decimals.
    ///
    /// # Errors
    /// Returns [`AreaError::EmptyGeometry`] for a contour without
    /// coordinates, [`AreaError::ZeroSurface`] for a degenerate contour and
    /// [`AreaError::NonFinite`] when the measure is not a finite number.
    pub fn area(&self, polygon: &MultiPolygon<f64>) -> Result<f64, AreaError> {
        if polygon.0.iter().all(|part| part.exterior().0.is_empty()) {
            return Err(AreaError::EmptyGeometry);
        }
        let measured = self.config.area_mode.measure(polygon);
        if measured <= 0.0 {
            return Err(AreaError::ZeroSurface);
        }
        area::hectares(measured)
    }
}

fn is_excluded(record: &WetlandGeometryRecord, exclude_id: Option<WetlandId>) -> bool {
    exclude_id.is_some() && record.id == exclude_id
}

// Disjoint envelopes rule out both overlap and containment.
fn envelopes_meet(candidate_bounds: Rect<f64>, geom: &MultiPolygon<f64>) -> bool {
    geom.bounding_rect()
        .is_some_and(|bounds| bounds.intersects(&candidate_bounds))
}
