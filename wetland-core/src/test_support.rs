//! In-memory collaborators and geometry helpers used by unit and behaviour
//! tests.

use std::collections::{BTreeMap, BTreeSet};

use geo::{LineString, MultiPolygon, Polygon, coord};

use crate::{
    AreaCover, DatasetActor, DatasetDirectory, DatasetId, DirectoryError, GeometryUpdate,
    OrganismId, StoreError, UserId, Wetland, WetlandDraft, WetlandGeometryRecord,
    WetlandGeometryRepository, WetlandId, WetlandStore, WetlandTransaction,
};

/// Axis-aligned square (or rectangle) as a single-part multipolygon.
///
/// The ring starts at the lower-left corner and runs counter-clockwise, the
/// same order GeoJSON and WKT fixtures use.
#[must_use]
pub fn square(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> MultiPolygon<f64> {
    let ring = LineString::new(vec![
        coord! { x: min_x, y: min_y },
        coord! { x: max_x, y: min_y },
        coord! { x: max_x, y: max_y },
        coord! { x: min_x, y: max_y },
        coord! { x: min_x, y: min_y },
    ]);
    MultiPolygon::new(vec![Polygon::new(ring, Vec::new())])
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    wetlands: BTreeMap<WetlandId, Wetland>,
    covers: BTreeMap<WetlandId, Vec<AreaCover>>,
    last_id: i64,
}

/// In-memory [`WetlandStore`].
///
/// Transactions work on a copy of the committed state and publish it on
/// commit, which is enough isolation for single-threaded tests.
#[derive(Debug, Default)]
pub struct MemoryWetlandStore {
    state: MemoryState,
}

impl MemoryWetlandStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WetlandGeometryRepository for MemoryWetlandStore {
    fn list_all(&self) -> Result<Vec<WetlandGeometryRecord>, StoreError> {
        Ok(self
            .state
            .wetlands
            .values()
            .map(Wetland::geometry_record)
            .collect())
    }
}

impl WetlandStore for MemoryWetlandStore {
    type Transaction<'a>
        = MemoryTransaction<'a>
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Transaction<'_>, StoreError> {
        let working = self.state.clone();
        Ok(MemoryTransaction {
            committed: &mut self.state,
            working,
        })
    }

    fn get(&self, id: WetlandId) -> Result<Option<Wetland>, StoreError> {
        Ok(self.state.wetlands.get(&id).cloned())
    }

    fn count(&self) -> Result<u64, StoreError> {
        Ok(u64::try_from(self.state.wetlands.len()).unwrap_or(u64::MAX))
    }

    fn page(&self, limit: u32, offset: u64) -> Result<Vec<Wetland>, StoreError> {
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .state
            .wetlands
            .values()
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }

    fn area_covers(&self, id: WetlandId) -> Result<Vec<AreaCover>, StoreError> {
        Ok(self.state.covers.get(&id).cloned().unwrap_or_default())
    }
}

/// Transaction over a [`MemoryWetlandStore`].
#[derive(Debug)]
pub struct MemoryTransaction<'a> {
    committed: &'a mut MemoryState,
    working: MemoryState,
}

impl WetlandGeometryRepository for MemoryTransaction<'_> {
    fn list_all(&self) -> Result<Vec<WetlandGeometryRecord>, StoreError> {
        Ok(self
            .working
            .wetlands
            .values()
            .map(Wetland::geometry_record)
            .collect())
    }
}

impl WetlandTransaction for MemoryTransaction<'_> {
    fn get(&self, id: WetlandId) -> Result<Option<Wetland>, StoreError> {
        Ok(self.working.wetlands.get(&id).cloned())
    }

    fn insert(&mut self, draft: WetlandDraft) -> Result<Wetland, StoreError> {
        self.working.last_id = self.working.last_id.saturating_add(1);
        let wetland = draft.into_wetland(WetlandId(self.working.last_id));
        self.working.wetlands.insert(wetland.id, wetland.clone());
        Ok(wetland)
    }

    fn update_geometry(
        &mut self,
        id: WetlandId,
        update: &GeometryUpdate,
    ) -> Result<Wetland, StoreError> {
        let wetland = self
            .working
            .wetlands
            .get_mut(&id)
            .ok_or(StoreError::NotFound { id })?;
        update.apply_to(wetland);
        Ok(wetland.clone())
    }

    fn delete(&mut self, id: WetlandId) -> Result<(), StoreError> {
        self.working
            .wetlands
            .remove(&id)
            .ok_or(StoreError::NotFound { id })?;
        self.working.covers.remove(&id);
        Ok(())
    }

    fn replace_area_covers(
        &mut self,
        id: WetlandId,
        covers: &[AreaCover],
    ) -> Result<(), StoreError> {
        self.working.covers.insert(id, covers.to_vec());
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        *self.committed = self.working;
        Ok(())
    }
}

/// In-memory [`DatasetDirectory`].
#[derive(Debug, Clone, Default)]
pub struct MemoryDatasetDirectory {
    actors: BTreeMap<DatasetId, BTreeSet<DatasetActor>>,
}

impl MemoryDatasetDirectory {
    /// Grant `actor` rights over `dataset`, returning `self` for chaining.
    #[must_use]
    pub fn with_actor(mut self, dataset: DatasetId, actor: DatasetActor) -> Self {
        self.actors.entry(dataset).or_default().insert(actor);
        self
    }
}

impl DatasetDirectory for MemoryDatasetDirectory {
    fn user_datasets(
        &self,
        user: UserId,
        organism: Option<OrganismId>,
        only_own: bool,
    ) -> Result<BTreeSet<DatasetId>, DirectoryError> {
        Ok(self
            .actors
            .iter()
            .filter(|(_, actors)| {
                actors.contains(&DatasetActor::User(user))
                    || (!only_own
                        && organism.is_some_and(|id| actors.contains(&DatasetActor::Organism(id))))
            })
            .map(|(dataset, _)| *dataset)
            .collect())
    }
}
