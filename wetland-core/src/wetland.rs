//! Wetland records and the payloads used to create and edit them.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use geo::MultiPolygon;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    DatasetId, RecordOwnership, UserId, ValidationError, WetlandGeometryRecord, WetlandId,
};

const CODE_LENGTH: usize = 12;

/// Short public code of a wetland: the first 12 characters of a v4 UUID.
///
/// # Examples
/// ```
/// let code = wetland_core::generate_code();
/// assert_eq!(code.len(), 12);
/// ```
#[must_use]
pub fn generate_code() -> String {
    Uuid::new_v4().to_string().chars().take(CODE_LENGTH).collect()
}

/// A persisted wetland.
#[derive(Debug, Clone, PartialEq)]
pub struct Wetland {
    /// Primary key.
    pub id: WetlandId,
    /// Short public code.
    pub code: String,
    /// Main name.
    pub main_name: String,
    /// Optional secondary name.
    pub secondary_name: Option<String>,
    /// User who digitised the wetland.
    pub create_author: UserId,
    /// Last user who edited the wetland.
    pub update_author: UserId,
    /// Creation timestamp.
    pub create_date: DateTime<Utc>,
    /// Last edition timestamp.
    pub update_date: DateTime<Utc>,
    /// Reconciled contour, never overlapping another wetland.
    pub geom: MultiPolygon<f64>,
    /// Surface in hectares.
    pub area_ha: f64,
    /// Whether the submitted contour overlapped another wetland.
    pub is_intersected: bool,
    /// SDAGE typology nomenclature id.
    pub sdage_id: Option<i64>,
    /// Groups the delimitation criteria of the wetland.
    pub delimitation_list_id: Uuid,
    /// Delimitation criteria nomenclature ids.
    pub delimitation_criteria: Vec<i64>,
    /// Dataset the wetland belongs to.
    pub dataset_id: Option<DatasetId>,
    /// Users who edited the wetland after its creation.
    pub coauthors: BTreeSet<UserId>,
}

impl Wetland {
    /// Geometry record as seen by the reconciler.
    #[must_use]
    pub fn geometry_record(&self) -> WetlandGeometryRecord {
        WetlandGeometryRecord::persisted(self.id, self.geom.clone())
    }

    /// Attribute summary without the geometry.
    #[must_use]
    pub fn summary(&self) -> WetlandSummary {
        WetlandSummary {
            id: self.id,
            code: self.code.clone(),
            main_name: self.main_name.clone(),
            secondary_name: self.secondary_name.clone(),
            create_author: self.create_author,
            update_author: self.update_author,
            create_date: self.create_date,
            update_date: self.update_date,
            area_ha: self.area_ha,
            is_intersected: self.is_intersected,
            sdage_id: self.sdage_id,
            dataset_id: self.dataset_id,
        }
    }
}

impl RecordOwnership for Wetland {
    fn digitiser_id(&self) -> UserId {
        self.create_author
    }

    fn observer_ids(&self) -> &BTreeSet<UserId> {
        &self.coauthors
    }

    fn dataset_id(&self) -> Option<DatasetId> {
        self.dataset_id
    }
}

/// Wetland attributes shown in listings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WetlandSummary {
    /// Primary key.
    pub id: WetlandId,
    /// Short public code.
    pub code: String,
    /// Main name.
    pub main_name: String,
    /// Optional secondary name.
    pub secondary_name: Option<String>,
    /// User who digitised the wetland.
    pub create_author: UserId,
    /// Last user who edited the wetland.
    pub update_author: UserId,
    /// Creation timestamp.
    pub create_date: DateTime<Utc>,
    /// Last edition timestamp.
    pub update_date: DateTime<Utc>,
    /// Surface in hectares.
    pub area_ha: f64,
    /// Whether the submitted contour overlapped another wetland.
    pub is_intersected: bool,
    /// SDAGE typology nomenclature id.
    pub sdage_id: Option<i64>,
    /// Dataset the wetland belongs to.
    pub dataset_id: Option<DatasetId>,
}

/// Creation request for a wetland.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NewWetland {
    /// Main name; must not be blank.
    pub main_name: String,
    /// Optional secondary name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub secondary_name: Option<String>,
    /// SDAGE typology nomenclature id.
    #[cfg_attr(feature = "serde", serde(default))]
    pub sdage_id: Option<i64>,
    /// Delimitation criteria nomenclature ids.
    #[cfg_attr(feature = "serde", serde(default))]
    pub delimitation_criteria: Vec<i64>,
    /// Dataset the wetland belongs to.
    #[cfg_attr(feature = "serde", serde(default))]
    pub dataset_id: Option<DatasetId>,
    /// Candidate contour as GeoJSON geometry text.
    pub geometry_geojson: String,
}

impl NewWetland {
    /// Check the attributes that do not depend on other wetlands.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyName`] for a blank main name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.main_name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }
}

/// A wetland ready to be inserted; the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct WetlandDraft {
    /// Short public code.
    pub code: String,
    /// Main name.
    pub main_name: String,
    /// Optional secondary name.
    pub secondary_name: Option<String>,
    /// Digitiser, also recorded as the first update author.
    pub author: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Reconciled contour.
    pub geom: MultiPolygon<f64>,
    /// Surface in hectares.
    pub area_ha: f64,
    /// Whether the submitted contour overlapped another wetland.
    pub is_intersected: bool,
    /// SDAGE typology nomenclature id.
    pub sdage_id: Option<i64>,
    /// Groups the delimitation criteria.
    pub delimitation_list_id: Uuid,
    /// Delimitation criteria nomenclature ids.
    pub delimitation_criteria: Vec<i64>,
    /// Dataset the wetland belongs to.
    pub dataset_id: Option<DatasetId>,
}

impl WetlandDraft {
    /// Build a draft from a validated request and its reconciled contour.
    ///
    /// A fresh code and delimitation list id are generated.
    #[must_use]
    pub fn from_request(
        request: NewWetland,
        author: UserId,
        geom: MultiPolygon<f64>,
        area_ha: f64,
        is_intersected: bool,
    ) -> Self {
        Self {
            code: generate_code(),
            main_name: request.main_name.trim().to_owned(),
            secondary_name: request.secondary_name,
            author,
            created_at: Utc::now(),
            geom,
            area_ha,
            is_intersected,
            sdage_id: request.sdage_id,
            delimitation_list_id: Uuid::new_v4(),
            delimitation_criteria: request.delimitation_criteria,
            dataset_id: request.dataset_id,
        }
    }

    /// Persisted form of the draft under `id`.
    #[must_use]
    pub fn into_wetland(self, id: WetlandId) -> Wetland {
        Wetland {
            id,
            code: self.code,
            main_name: self.main_name,
            secondary_name: self.secondary_name,
            create_author: self.author,
            update_author: self.author,
            create_date: self.created_at,
            update_date: self.created_at,
            geom: self.geom,
            area_ha: self.area_ha,
            is_intersected: self.is_intersected,
            sdage_id: self.sdage_id,
            delimitation_list_id: self.delimitation_list_id,
            delimitation_criteria: self.delimitation_criteria,
            dataset_id: self.dataset_id,
            coauthors: BTreeSet::new(),
        }
    }
}

/// New contour of an existing wetland.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryUpdate {
    /// Reconciled contour.
    pub geom: MultiPolygon<f64>,
    /// Surface in hectares.
    pub area_ha: f64,
    /// Whether the submitted contour overlapped another wetland.
    pub is_intersected: bool,
    /// Editing user, recorded as a co-author.
    pub author: UserId,
    /// Edition timestamp.
    pub updated_at: DateTime<Utc>,
}

impl GeometryUpdate {
    /// Apply the update to an in-memory wetland.
    pub fn apply_to(&self, wetland: &mut Wetland) {
        wetland.geom = self.geom.clone();
        wetland.area_ha = self.area_ha;
        wetland.is_intersected = self.is_intersected;
        wetland.update_author = self.author;
        wetland.update_date = self.updated_at;
        wetland.coauthors.insert(self.author);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::square;
    use rstest::rstest;

    fn request(name: &str) -> NewWetland {
        NewWetland {
            main_name: name.to_owned(),
            geometry_geojson: String::new(),
            ..NewWetland::default()
        }
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn blank_names_are_rejected(#[case] name: &str) {
        assert_eq!(request(name).validate(), Err(ValidationError::EmptyName));
    }

    #[rstest]
    fn codes_are_short_and_unique() {
        let first = generate_code();
        let second = generate_code();
        assert_eq!(first.chars().count(), 12);
        assert_ne!(first, second);
    }

    #[rstest]
    fn drafts_trim_names_and_start_without_coauthors() {
        let draft = WetlandDraft::from_request(
            request("  Marais de la Souche "),
            UserId(3),
            square(0.0, 0.0, 1.0, 1.0),
            0.0,
            false,
        );
        let wetland = draft.into_wetland(WetlandId(1));
        assert_eq!(wetland.main_name, "Marais de la Souche");
        assert_eq!(wetland.create_author, UserId(3));
        assert_eq!(wetland.update_author, UserId(3));
        assert!(wetland.coauthors.is_empty());
    }

    #[rstest]
    fn geometry_updates_record_the_editor_as_observer() {
        let mut wetland = WetlandDraft::from_request(
            request("Tourbière"),
            UserId(3),
            square(0.0, 0.0, 1.0, 1.0),
            0.0,
            false,
        )
        .into_wetland(WetlandId(1));
        let update = GeometryUpdate {
            geom: square(0.0, 0.0, 2.0, 2.0),
            area_ha: 0.0,
            is_intersected: true,
            author: UserId(8),
            updated_at: Utc::now(),
        };
        update.apply_to(&mut wetland);
        assert!(wetland.observer_ids().contains(&UserId(8)));
        assert_eq!(wetland.digitiser_id(), UserId(3));
        assert!(wetland.is_intersected);
    }
}
