//! Wetland use cases: reconcile, authorise and persist in one transaction.

use chrono::Utc;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use geo::MultiPolygon;
use log::info;

use crate::geometry::{parse_geojson_geometry, to_geojson_geometry};
use crate::{
    AccessEvaluator, AccessLevel, AreaCover, CruvedAction, CruvedView, GeometryReconciler,
    GeometryUpdate, InsufficientRightsError, NewWetland, ReconcileError, ReferenceAreaIndex,
    ServiceError, StoreError, UserContext, UserCruved, ValidationError, Wetland, WetlandDraft,
    WetlandGeometryRepository, WetlandId, WetlandStore, WetlandSummary, WetlandTransaction,
};

/// Default number of wetlands per listing page.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Page selection for [`WetlandService::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PageRequest {
    /// Maximum number of wetlands returned.
    pub limit: u32,
    /// Zero-based page index.
    pub page: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            page: 0,
        }
    }
}

/// One row of a wetland listing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WetlandListing {
    /// Wetland attributes.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub summary: WetlandSummary,
    /// Contour as a GeoJSON geometry.
    pub geometry: geojson::Geometry,
    /// Actions the requesting user may perform on the wetland.
    pub rights: CruvedView,
}

/// A page of wetlands.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WetlandPage {
    /// Number of wetlands in the store.
    pub total: u64,
    /// Number of wetlands matching the listing filters.
    pub total_filtered: u64,
    /// Zero-based page index.
    pub page: u64,
    /// Page size.
    pub limit: u32,
    /// Wetlands of the page.
    pub items: Vec<WetlandListing>,
}

/// Outcome of reconciling a contour without persisting it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconciliationReport {
    /// Reconciled contour as a GeoJSON geometry.
    pub polygon: geojson::Geometry,
    /// Whether the contour overlapped another wetland.
    pub is_intersected: bool,
    /// Surface of the reconciled contour in hectares.
    pub area_ha: f64,
}

/// Orchestrates wetland operations over a [`WetlandStore`].
///
/// Every write reads the existing contours, reconciles and persists inside
/// a single store transaction; an error at any step drops the transaction
/// and leaves the store untouched.
///
/// # Examples
/// ```
/// use wetland_core::{
///     GeometryReconciler, NewWetland, SqliteWetlandStore, UserContext, UserCruved, UserId,
///     WetlandService,
/// };
///
/// let store = SqliteWetlandStore::open_in_memory().expect("create store");
/// let mut service = WetlandService::new(store, GeometryReconciler::default());
/// let user = UserContext::new(UserId(1));
/// let cruved: UserCruved = "C1R1U1V1E1D1".parse().expect("valid table");
///
/// let wetland = service
///     .create(&user, &cruved, NewWetland {
///         main_name: "Marais".into(),
///         geometry_geojson: r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}"#.into(),
///         ..NewWetland::default()
///     })
///     .expect("first wetland is stored");
/// assert!(!wetland.is_intersected);
/// ```
#[derive(Debug)]
pub struct WetlandService<S> {
    store: S,
    reconciler: GeometryReconciler,
    evaluator: AccessEvaluator,
    reference_areas: Option<ReferenceAreaIndex>,
}

impl<S: WetlandStore> WetlandService<S> {
    /// Build a service around `store`.
    #[must_use]
    pub const fn new(store: S, reconciler: GeometryReconciler) -> Self {
        Self {
            store,
            reconciler,
            evaluator: AccessEvaluator,
            reference_areas: None,
        }
    }

    /// Record reference-area covers for every created or edited wetland.
    #[must_use]
    pub fn with_reference_areas(mut self, index: ReferenceAreaIndex) -> Self {
        self.reference_areas = Some(index);
        self
    }

    /// Borrow the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Release the underlying store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Reconcile a GeoJSON contour against the stored wetlands without
    /// writing anything.
    ///
    /// The report reveals how the contour meets other wetlands, so the user
    /// needs a module read right. Committed contours are read without taking
    /// the store's write lock.
    ///
    /// # Errors
    /// Returns [`ServiceError::Forbidden`] when the user holds no read right,
    /// [`ServiceError::Reconcile`] when the contour is invalid or contained
    /// in an existing wetland and [`ServiceError::Area`] when the reconciled
    /// contour is empty.
    pub fn reconcile_preview(
        &self,
        user: &UserContext,
        cruved: &UserCruved,
        geojson: &str,
        exclude_id: Option<WetlandId>,
    ) -> Result<ReconciliationReport, ServiceError> {
        require_module_right(user, cruved, CruvedAction::Read)?;
        let candidate = parse_candidate(geojson)?;
        let existing = self.store.list_all()?;
        let result = self
            .reconciler
            .reconcile(&candidate, exclude_id, &existing)?;
        let area_ha = self.reconciler.area(&result.polygon)?;
        Ok(ReconciliationReport {
            polygon: to_geojson_geometry(&result.polygon),
            is_intersected: result.is_intersected,
            area_ha,
        })
    }

    /// Create a wetland from a request.
    ///
    /// # Errors
    /// Returns [`ServiceError::Forbidden`] when the user holds no create
    /// right, [`ServiceError::Validation`] for an invalid request, and the
    /// reconciliation, area or store failure otherwise.
    pub fn create(
        &mut self,
        user: &UserContext,
        cruved: &UserCruved,
        request: NewWetland,
    ) -> Result<Wetland, ServiceError> {
        require_module_right(user, cruved, CruvedAction::Create)?;
        request.validate()?;
        let candidate = parse_candidate(&request.geometry_geojson)?;

        let mut tx = self.store.begin()?;
        let existing = tx.list_all()?;
        let result = self.reconciler.reconcile(&candidate, None, &existing)?;
        let area_ha = self.reconciler.area(&result.polygon)?;
        let covers = covers_of(self.reference_areas.as_ref(), &result.polygon);
        let draft = WetlandDraft::from_request(
            request,
            user.id,
            result.polygon,
            area_ha,
            result.is_intersected,
        );
        let wetland = tx.insert(draft)?;
        tx.replace_area_covers(wetland.id, &covers)?;
        tx.commit()?;

        info!(
            "user {} created wetland {} ({}, {area_ha} ha, intersected: {})",
            user.id, wetland.id, wetland.code, wetland.is_intersected
        );
        Ok(wetland)
    }

    /// Replace the contour of a wetland the user may update.
    ///
    /// The wetland's own stored contour is excluded from reconciliation.
    ///
    /// # Errors
    /// Returns [`ServiceError::Store`] with [`StoreError::NotFound`] for an
    /// unknown id, [`ServiceError::Forbidden`] when the user may not update
    /// the wetland, and the reconciliation, area or store failure otherwise.
    pub fn update_geometry(
        &mut self,
        user: &UserContext,
        cruved: &UserCruved,
        id: WetlandId,
        geojson: &str,
    ) -> Result<Wetland, ServiceError> {
        let candidate = parse_candidate(geojson)?;

        let mut tx = self.store.begin()?;
        let current = tx.get(id)?.ok_or(StoreError::NotFound { id })?;
        self.evaluator.authorize(
            user,
            &current,
            CruvedAction::Update,
            cruved.level(CruvedAction::Update),
        )?;
        let existing = tx.list_all()?;
        let result = self.reconciler.reconcile(&candidate, Some(id), &existing)?;
        let area_ha = self.reconciler.area(&result.polygon)?;
        let covers = covers_of(self.reference_areas.as_ref(), &result.polygon);
        let update = GeometryUpdate {
            geom: result.polygon,
            area_ha,
            is_intersected: result.is_intersected,
            author: user.id,
            updated_at: Utc::now(),
        };
        let wetland = tx.update_geometry(id, &update)?;
        tx.replace_area_covers(id, &covers)?;
        tx.commit()?;

        info!("user {} updated the contour of wetland {id} ({area_ha} ha)", user.id);
        Ok(wetland)
    }

    /// Fetch a wetland the user may read.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] for an unknown id and
    /// [`ServiceError::Forbidden`] when the user may not read it.
    pub fn get(
        &self,
        user: &UserContext,
        cruved: &UserCruved,
        id: WetlandId,
    ) -> Result<Wetland, ServiceError> {
        let wetland = self.store.get(id)?.ok_or(StoreError::NotFound { id })?;
        self.evaluator.authorize(
            user,
            &wetland,
            CruvedAction::Read,
            cruved.level(CruvedAction::Read),
        )?;
        Ok(wetland)
    }

    /// Reference-area covers of a wetland the user may read.
    ///
    /// # Errors
    /// Behaves like [`Self::get`].
    pub fn area_covers(
        &self,
        user: &UserContext,
        cruved: &UserCruved,
        id: WetlandId,
    ) -> Result<Vec<AreaCover>, ServiceError> {
        self.get(user, cruved, id)?;
        Ok(self.store.area_covers(id)?)
    }

    /// Delete a wetland the user may delete.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] for an unknown id and
    /// [`ServiceError::Forbidden`] when the user may not delete it.
    pub fn delete(
        &mut self,
        user: &UserContext,
        cruved: &UserCruved,
        id: WetlandId,
    ) -> Result<(), ServiceError> {
        let mut tx = self.store.begin()?;
        let wetland = tx.get(id)?.ok_or(StoreError::NotFound { id })?;
        self.evaluator.authorize(
            user,
            &wetland,
            CruvedAction::Delete,
            cruved.level(CruvedAction::Delete),
        )?;
        tx.delete(id)?;
        tx.commit()?;
        info!("user {} deleted wetland {id} ({})", user.id, wetland.code);
        Ok(())
    }

    /// List a page of wetlands, each annotated with the user's rights.
    ///
    /// # Errors
    /// Returns [`ServiceError::Forbidden`] when the user holds no read
    /// right, [`ValidationError::ZeroLimit`] for an empty page, and store
    /// failures otherwise.
    pub fn list(
        &self,
        user: &UserContext,
        cruved: &UserCruved,
        request: PageRequest,
    ) -> Result<WetlandPage, ServiceError> {
        require_module_right(user, cruved, CruvedAction::Read)?;
        if request.limit == 0 {
            return Err(ValidationError::ZeroLimit.into());
        }
        let total = self.store.count()?;
        let offset = request.page.saturating_mul(u64::from(request.limit));
        let items = self
            .store
            .page(request.limit, offset)?
            .into_iter()
            .map(|wetland| WetlandListing {
                rights: self.evaluator.cruved_view(user, &wetland, cruved),
                geometry: to_geojson_geometry(&wetland.geom),
                summary: wetland.summary(),
            })
            .collect();
        Ok(WetlandPage {
            total,
            total_filtered: total,
            page: request.page,
            limit: request.limit,
            items,
        })
    }
}

fn parse_candidate(geojson: &str) -> Result<MultiPolygon<f64>, ServiceError> {
    parse_geojson_geometry(geojson)
        .map_err(ReconcileError::from)
        .map_err(ServiceError::from)
}

// Module-level gate applied before any record is loaded.
fn require_module_right(
    user: &UserContext,
    cruved: &UserCruved,
    action: CruvedAction,
) -> Result<(), InsufficientRightsError> {
    let level = cruved.level(action);
    if level == AccessLevel::None {
        return Err(InsufficientRightsError {
            user: user.id,
            action,
            level,
        });
    }
    Ok(())
}

fn covers_of(index: Option<&ReferenceAreaIndex>, geom: &MultiPolygon<f64>) -> Vec<AreaCover> {
    index.map(|index| index.covers(geom)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryWetlandStore, square};
    use crate::{
        ApiError, DatasetId, PolygonContainedError, ReferenceArea, ReferenceAreaKind, UserId,
        geometry::to_geojson_geometry,
    };
    use rstest::{fixture, rstest};

    fn geojson(min: f64, max: f64) -> String {
        to_geojson_geometry(&square(min, min, max, max)).to_string()
    }

    fn request(name: &str, min: f64, max: f64) -> NewWetland {
        NewWetland {
            main_name: name.to_owned(),
            dataset_id: Some(DatasetId(1)),
            geometry_geojson: geojson(min, max),
            ..NewWetland::default()
        }
    }

    fn cruved(text: &str) -> UserCruved {
        text.parse().expect("valid CRUVED table")
    }

    #[fixture]
    fn service() -> WetlandService<MemoryWetlandStore> {
        WetlandService::new(MemoryWetlandStore::new(), GeometryReconciler::default())
    }

    #[fixture]
    fn owner() -> UserContext {
        UserContext::new(UserId(1))
    }

    #[rstest]
    fn create_reconciles_against_stored_wetlands(
        mut service: WetlandService<MemoryWetlandStore>,
        owner: UserContext,
    ) {
        let rights = cruved("C1R1U1V1E1D1");
        service
            .create(&owner, &rights, request("A", 0.0, 10.0))
            .expect("first");
        let second = service
            .create(&owner, &rights, request("B", 5.0, 15.0))
            .expect("second");
        assert!(second.is_intersected);
        assert!(!geo::Intersects::intersects(
            &second.geom,
            &square(6.0, 6.0, 9.0, 9.0)
        ));
    }

    #[rstest]
    fn contained_contours_are_not_persisted(
        mut service: WetlandService<MemoryWetlandStore>,
        owner: UserContext,
    ) {
        let rights = cruved("C1R1U1V1E1D1");
        service
            .create(&owner, &rights, request("A", 0.0, 10.0))
            .expect("first");
        let err = service
            .create(&owner, &rights, request("B", 2.0, 8.0))
            .expect_err("contained");
        assert!(matches!(
            err,
            ServiceError::Reconcile(ReconcileError::Contained(PolygonContainedError {
                existing_id: Some(WetlandId(1))
            }))
        ));
        assert_eq!(service.store().count().expect("count"), 1);
    }

    #[rstest]
    fn create_requires_a_create_right(
        mut service: WetlandService<MemoryWetlandStore>,
        owner: UserContext,
    ) {
        let err = service
            .create(&owner, &cruved("C0R3"), request("A", 0.0, 1.0))
            .expect_err("no create right");
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[rstest]
    fn blank_names_are_rejected_before_reconciling(
        mut service: WetlandService<MemoryWetlandStore>,
        owner: UserContext,
    ) {
        let err = service
            .create(&owner, &cruved("C1"), request(" ", 0.0, 1.0))
            .expect_err("blank name");
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::EmptyName)
        ));
    }

    #[rstest]
    fn editing_keeps_own_contour_out_of_reconciliation(
        mut service: WetlandService<MemoryWetlandStore>,
        owner: UserContext,
    ) {
        let rights = cruved("C1R1U1V1E1D1");
        let created = service
            .create(&owner, &rights, request("A", 0.0, 10.0))
            .expect("create");
        let updated = service
            .update_geometry(&owner, &rights, created.id, &geojson(0.0, 12.0))
            .expect("grow own contour");
        assert!(!updated.is_intersected);
        assert!(updated.area_ha >= created.area_ha);
    }

    #[rstest]
    fn strangers_cannot_update_or_delete(
        mut service: WetlandService<MemoryWetlandStore>,
        owner: UserContext,
    ) {
        let rights = cruved("C1R1U1V1E1D1");
        let created = service
            .create(&owner, &rights, request("A", 0.0, 10.0))
            .expect("create");
        let stranger = UserContext::new(UserId(2));
        let update = service.update_geometry(&stranger, &rights, created.id, &geojson(0.0, 5.0));
        assert!(matches!(update, Err(ServiceError::Forbidden(_))));
        let delete = service.delete(&stranger, &rights, created.id);
        assert!(matches!(delete, Err(ServiceError::Forbidden(_))));
        assert_eq!(service.store().count().expect("count"), 1);
    }

    #[rstest]
    fn deleting_unknown_wetland_is_not_found(
        mut service: WetlandService<MemoryWetlandStore>,
        owner: UserContext,
    ) {
        let err = service
            .delete(&owner, &cruved("D3"), WetlandId(99))
            .expect_err("unknown");
        assert!(matches!(
            err,
            ServiceError::Store(StoreError::NotFound { id: WetlandId(99) })
        ));
    }

    #[rstest]
    fn listing_annotates_rights_per_row(
        mut service: WetlandService<MemoryWetlandStore>,
        owner: UserContext,
    ) {
        let rights = cruved("C1R1U1V1E1D1");
        service
            .create(&owner, &rights, request("A", 0.0, 1.0))
            .expect("create");
        let stranger = UserContext::new(UserId(2));
        let page = service
            .list(&stranger, &cruved("C0R3U1V0E0D1"), PageRequest::default())
            .expect("list");
        assert_eq!(page.total, 1);
        assert_eq!(page.limit, DEFAULT_PAGE_LIMIT);
        let row = page.items.first().expect("one row");
        assert!(row.rights.allows(CruvedAction::Read));
        assert!(!row.rights.allows(CruvedAction::Update));
    }

    #[rstest]
    fn zero_page_limit_is_rejected(
        service: WetlandService<MemoryWetlandStore>,
        owner: UserContext,
    ) {
        let err = service
            .list(&owner, &cruved("R1"), PageRequest { limit: 0, page: 0 })
            .expect_err("zero limit");
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::ZeroLimit)
        ));
    }

    #[rstest]
    fn reference_area_covers_are_recorded(owner: UserContext) {
        let index = ReferenceAreaIndex::new(vec![ReferenceArea {
            id: 38,
            kind: ReferenceAreaKind::Department,
            name: "Isère".to_owned(),
            geom: square(0.0, 0.0, 5.0, 10.0),
        }]);
        let mut service =
            WetlandService::new(MemoryWetlandStore::new(), GeometryReconciler::default())
                .with_reference_areas(index);
        let rights = cruved("C1R1");
        let created = service
            .create(&owner, &rights, request("A", 0.0, 10.0))
            .expect("create");
        let covers = service
            .area_covers(&owner, &rights, created.id)
            .expect("covers");
        assert_eq!(covers.len(), 1);
        assert_eq!(covers.first().map(|cover| cover.cover_percent), Some(50));
    }

    #[rstest]
    fn preview_does_not_persist(
        mut service: WetlandService<MemoryWetlandStore>,
        owner: UserContext,
    ) {
        service
            .create(&owner, &cruved("C1"), request("A", 0.0, 10.0))
            .expect("create");
        let report = service
            .reconcile_preview(&owner, &cruved("R1"), &geojson(5.0, 15.0), None)
            .expect("preview");
        assert!(report.is_intersected);
        assert_eq!(service.store().count().expect("count"), 1);
    }

    #[rstest]
    fn preview_requires_a_read_right(
        mut service: WetlandService<MemoryWetlandStore>,
        owner: UserContext,
    ) {
        service
            .create(&owner, &cruved("C1"), request("A", 0.0, 10.0))
            .expect("create");
        let stranger = UserContext::new(UserId(2));
        let err = service
            .reconcile_preview(&stranger, &cruved("C1R0"), &geojson(5.0, 15.0), None)
            .expect_err("no read right");
        assert!(matches!(
            err,
            ServiceError::Forbidden(InsufficientRightsError {
                action: CruvedAction::Read,
                ..
            })
        ));
    }

    #[rstest]
    #[case::empty_ring(r#"{"type":"Polygon","coordinates":[[]]}"#)]
    #[case::no_parts(r#"{"type":"MultiPolygon","coordinates":[]}"#)]
    #[case::collinear_ring(r#"{"type":"Polygon","coordinates":[[[0,0],[1,1],[2,2],[0,0]]]}"#)]
    #[case::bowtie(r#"{"type":"Polygon","coordinates":[[[5,5],[15,15],[15,5],[5,15],[5,5]]]}"#)]
    fn contours_without_surface_are_not_persisted(
        mut service: WetlandService<MemoryWetlandStore>,
        owner: UserContext,
        #[case] contour: &str,
    ) {
        let rights = cruved("C1R1");
        let wetland = NewWetland {
            geometry_geojson: contour.to_owned(),
            ..request("A", 0.0, 1.0)
        };
        let err = service
            .create(&owner, &rights, wetland)
            .expect_err("contour without surface");
        assert!(
            matches!(err, ServiceError::Reconcile(ReconcileError::Geometry(_))),
            "got {err:?}"
        );
        assert_eq!(ApiError::from(&err).message, "set_geom_error");
        let preview = service.reconcile_preview(&owner, &rights, contour, None);
        assert!(matches!(
            preview,
            Err(ServiceError::Reconcile(ReconcileError::Geometry(_)))
        ));
        assert_eq!(service.store().count().expect("count"), 0);
    }
}
