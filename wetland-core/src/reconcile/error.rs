use thiserror::Error;

use crate::{GeometryError, WetlandId};

/// The candidate contour lies wholly inside an existing wetland.
///
/// This is a terminal validation failure: resubmitting the same contour can
/// never succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("the new wetland contour is fully contained in an existing one")]
pub struct PolygonContainedError {
    /// Identifier of the containing wetland, when it is persisted.
    pub existing_id: Option<WetlandId>,
}

/// Errors from [`crate::GeometryReconciler::reconcile`].
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The candidate is fully contained in an existing wetland.
    #[error(transparent)]
    Contained(#[from] PolygonContainedError),
    /// Decoding or normalising a geometry failed.
    #[error("geometry reconciliation failed: {0}")]
    Geometry(#[from] GeometryError),
}

/// Errors from [`crate::GeometryReconciler::area`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AreaError {
    /// The polygon has no parts, or only parts without coordinates,
    /// typically because every part of the candidate was already claimed by
    /// other wetlands.
    #[error("cannot compute the area of an empty geometry")]
    EmptyGeometry,
    /// The contour is degenerate and encloses no surface.
    #[error("the geometry encloses no surface")]
    ZeroSurface,
    /// The engine produced NaN or an infinite area.
    #[error("area computation produced a non-finite value")]
    NonFinite,
}
