//! Core domain logic for the wetland engine.
//!
//! Two components carry the invariants of the system:
//!
//! - [`GeometryReconciler`] subtracts already-claimed area from a candidate
//!   wetland contour so that persisted wetlands never overlap, rejecting a
//!   contour that lies wholly inside an existing wetland.
//! - [`AccessEvaluator`] decides, per record and per CRUVED action, whether a
//!   user may act on a wetland given their access level, their ownership of
//!   the record and their organism's dataset rights.
//!
//! [`WetlandService`] wires both around a transactional [`WetlandStore`].
//!
//! # Examples
//!
//! ```
//! use geo::{MultiPolygon, Rect, coord};
//! use wetland_core::{GeometryReconciler, WetlandGeometryRecord, WetlandId};
//!
//! let square = |min: f64, max: f64| {
//!     MultiPolygon::new(vec![
//!         Rect::new(coord! { x: min, y: min }, coord! { x: max, y: max }).to_polygon(),
//!     ])
//! };
//! let existing = vec![WetlandGeometryRecord::persisted(WetlandId(1), square(0.0, 10.0))];
//! let reconciler = GeometryReconciler::default();
//!
//! let result = reconciler
//!     .reconcile(&square(5.0, 15.0), None, &existing)
//!     .expect("partial overlap is reconciled");
//! assert!(result.is_intersected);
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod access;
mod error;
pub mod geometry;
mod ids;
pub mod reconcile;
pub mod reference;
mod service;
pub mod store;
mod wetland;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use access::{
    AccessEvaluator, AccessLevel, CruvedAction, CruvedParseError, CruvedView, DatasetActor,
    DatasetDirectory, DirectoryError, InsufficientRightsError, OwnershipSnapshot, RecordOwnership,
    UserContext, UserCruved,
};
pub use error::{ApiError, ServiceError, ValidationError};
pub use geometry::{GeometryError, WGS84_SRID};
pub use ids::{DatasetId, OrganismId, UserId, WetlandId};
pub use reconcile::{
    AreaError, AreaMode, GeometryReconciler, PolygonContainedError, ReconcileError,
    ReconcilerConfig, ReconciliationResult, WetlandGeometryRecord,
};
pub use reference::{
    AreaCover, ReferenceArea, ReferenceAreaError, ReferenceAreaIndex, ReferenceAreaKind,
    parse_reference_areas,
};
pub use service::{
    DEFAULT_PAGE_LIMIT, PageRequest, ReconciliationReport, WetlandListing, WetlandPage,
    WetlandService,
};
pub use store::{StoreError, WetlandGeometryRepository, WetlandStore, WetlandTransaction};
#[cfg(feature = "store-sqlite")]
pub use store::SqliteWetlandStore;
pub use wetland::{
    GeometryUpdate, NewWetland, Wetland, WetlandDraft, WetlandSummary, generate_code,
};
