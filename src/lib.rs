//! Facade crate for the wetland engine.
//!
//! This crate re-exports the core domain types: the geometry reconciler that
//! keeps wetland contours from overlapping, the CRUVED access evaluator, the
//! wetland service and, behind the `store-sqlite` feature, the SQLite store.

#![forbid(unsafe_code)]

pub use wetland_core::{
    AccessEvaluator, AccessLevel, ApiError, AreaCover, AreaError, AreaMode, CruvedAction,
    CruvedParseError, CruvedView, DatasetActor, DatasetDirectory, DatasetId, DirectoryError,
    GeometryError, GeometryReconciler, InsufficientRightsError, NewWetland, OrganismId,
    OwnershipSnapshot, PageRequest, PolygonContainedError, ReconcileError, ReconcilerConfig,
    ReconciliationReport, ReconciliationResult, RecordOwnership, ReferenceArea,
    ReferenceAreaIndex, ReferenceAreaKind, ServiceError, StoreError, UserContext, UserCruved,
    UserId, ValidationError, Wetland, WetlandGeometryRecord, WetlandGeometryRepository, WetlandId,
    WetlandListing, WetlandPage, WetlandService, WetlandStore, WetlandSummary, WetlandTransaction,
};

#[cfg(feature = "store-sqlite")]
pub use wetland_core::SqliteWetlandStore;

#[cfg(feature = "test-support")]
pub use wetland_core::test_support;
