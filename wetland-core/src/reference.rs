//! Administrative and hydrographic areas a wetland falls within.
//!
//! Reference areas are loaded once into an R\*-tree keyed on their bounding
//! boxes. Lookups prefilter on the tree and confirm with exact polygon
//! predicates. Coverage is the share of the wetland lying inside an area.

use std::{fmt, str::FromStr};

use geo::{Area, BooleanOps, BoundingRect, Intersects, MultiPolygon};
use geojson::{FeatureCollection, GeoJson, JsonValue};
use log::debug;
use rstar::{AABB, RTree, RTreeObject};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{GeometryError, areal_from_geojson};

/// Category of a reference area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ReferenceAreaKind {
    /// River basin district.
    RiverBasin,
    /// Hydrographic zone.
    HydroArea,
    /// Functional area of a wetland network.
    FunctionalArea,
    /// Municipality.
    Municipality,
    /// Department.
    Department,
}

impl ReferenceAreaKind {
    /// Return the kind as a `snake_case` string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RiverBasin => "river_basin",
            Self::HydroArea => "hydro_area",
            Self::FunctionalArea => "functional_area",
            Self::Municipality => "municipality",
            Self::Department => "department",
        }
    }
}

impl fmt::Display for ReferenceAreaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceAreaKind {
    type Err = ReferenceAreaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "river_basin" => Ok(Self::RiverBasin),
            "hydro_area" => Ok(Self::HydroArea),
            "functional_area" => Ok(Self::FunctionalArea),
            "municipality" => Ok(Self::Municipality),
            "department" => Ok(Self::Department),
            other => Err(ReferenceAreaError::UnknownKind {
                kind: other.to_owned(),
            }),
        }
    }
}

/// Errors raised while loading reference areas.
#[derive(Debug, Error)]
pub enum ReferenceAreaError {
    /// The kind label is not recognised.
    #[error("unknown reference area kind '{kind}'")]
    UnknownKind {
        /// Offending label.
        kind: String,
    },
    /// The document is not a GeoJSON feature collection.
    #[error("reference areas must be a GeoJSON FeatureCollection")]
    NotACollection,
    /// A feature lacked a required property.
    #[error("reference area feature {index} lacks property '{property}'")]
    MissingProperty {
        /// Position of the feature in the collection.
        index: usize,
        /// Name of the missing property.
        property: &'static str,
    },
    /// A feature geometry could not be decoded.
    #[error("reference area feature {index} has an invalid geometry: {source}")]
    Geometry {
        /// Position of the feature in the collection.
        index: usize,
        /// Decoder failure.
        #[source]
        source: GeometryError,
    },
}

/// A named reference area.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceArea {
    /// Identifier of the area.
    pub id: i64,
    /// Category of the area.
    pub kind: ReferenceAreaKind,
    /// Display name.
    pub name: String,
    /// Contour in WGS84.
    pub geom: MultiPolygon<f64>,
}

/// Share of a wetland inside a reference area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AreaCover {
    /// Identifier of the reference area.
    pub area_id: i64,
    /// Category of the reference area.
    pub kind: ReferenceAreaKind,
    /// Rounded percentage of the wetland inside the area, `0..=100`.
    pub cover_percent: u8,
}

#[derive(Debug, Clone, Copy)]
struct IndexedArea {
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedArea {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index over reference areas.
pub struct ReferenceAreaIndex {
    areas: Vec<ReferenceArea>,
    tree: RTree<IndexedArea>,
}

impl fmt::Debug for ReferenceAreaIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceAreaIndex")
            .field("entries", &self.tree.size())
            .finish_non_exhaustive()
    }
}

impl ReferenceAreaIndex {
    /// Bulk-load an index. Areas without coordinates are kept but never
    /// matched.
    #[must_use]
    pub fn new(areas: Vec<ReferenceArea>) -> Self {
        let entries = areas
            .iter()
            .enumerate()
            .filter_map(|(position, area)| {
                area.geom.bounding_rect().map(|rect| IndexedArea {
                    position,
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();
        Self {
            areas,
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed areas.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.areas.len()
    }

    /// Whether the index holds no area.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Areas intersecting `geom`, optionally restricted to one kind, ordered
    /// by id.
    #[must_use]
    pub fn intersecting(
        &self,
        geom: &MultiPolygon<f64>,
        kind: Option<ReferenceAreaKind>,
    ) -> Vec<&ReferenceArea> {
        let Some(rect) = geom.bounding_rect() else {
            return Vec::new();
        };
        let envelope =
            AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        let mut found: Vec<&ReferenceArea> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|entry| self.areas.get(entry.position))
            .filter(|area| kind.is_none_or(|wanted| area.kind == wanted))
            .filter(|area| area.geom.intersects(geom))
            .collect();
        found.sort_unstable_by_key(|area| area.id);
        found
    }

    /// Coverage of `geom` by every intersecting area.
    ///
    /// Areas that only touch the wetland along its boundary are reported
    /// with a cover of zero.
    ///
    /// # Examples
    /// ```
    /// use geo::{MultiPolygon, Rect, coord};
    /// use wetland_core::{ReferenceArea, ReferenceAreaIndex, ReferenceAreaKind};
    ///
    /// let rect = |x0: f64, y0: f64, x1: f64, y1: f64| {
    ///     MultiPolygon::new(vec![Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon()])
    /// };
    /// let index = ReferenceAreaIndex::new(vec![ReferenceArea {
    ///     id: 38,
    ///     kind: ReferenceAreaKind::Department,
    ///     name: "Isère".into(),
    ///     geom: rect(0.0, 0.0, 5.0, 10.0),
    /// }]);
    ///
    /// let covers = index.covers(&rect(0.0, 0.0, 10.0, 10.0));
    /// assert_eq!(covers[0].cover_percent, 50);
    /// ```
    #[must_use]
    pub fn covers(&self, geom: &MultiPolygon<f64>) -> Vec<AreaCover> {
        let total = geom.unsigned_area();
        self.intersecting(geom, None)
            .into_iter()
            .map(|area| {
                let inside = area.geom.intersection(geom).unsigned_area();
                let cover = AreaCover {
                    area_id: area.id,
                    kind: area.kind,
                    cover_percent: percent(inside, total),
                };
                debug!(
                    "wetland covers {}% of {} {}",
                    cover.cover_percent, area.kind, area.name
                );
                cover
            })
            .collect()
    }
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "ratio is clamped to 0..=100 before narrowing"
)]
fn percent(part: f64, total: f64) -> u8 {
    if total <= 0.0 || !total.is_finite() || !part.is_finite() {
        return 0;
    }
    (part / total * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Load reference areas from a GeoJSON `FeatureCollection`.
///
/// Each feature needs an integer `id` property, a `kind` property naming a
/// [`ReferenceAreaKind`] and a `name` property.
///
/// # Errors
/// Returns [`ReferenceAreaError`] for malformed documents or features.
pub fn parse_reference_areas(text: &str) -> Result<Vec<ReferenceArea>, ReferenceAreaError> {
    let collection: FeatureCollection = match text.parse::<GeoJson>() {
        Ok(GeoJson::FeatureCollection(collection)) => collection,
        Ok(_) | Err(_) => return Err(ReferenceAreaError::NotACollection),
    };
    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            let id = feature
                .property("id")
                .and_then(JsonValue::as_i64)
                .ok_or(ReferenceAreaError::MissingProperty {
                    index,
                    property: "id",
                })?;
            let kind: ReferenceAreaKind = feature
                .property("kind")
                .and_then(JsonValue::as_str)
                .ok_or(ReferenceAreaError::MissingProperty {
                    index,
                    property: "kind",
                })?
                .parse()?;
            let name = feature
                .property("name")
                .and_then(JsonValue::as_str)
                .ok_or(ReferenceAreaError::MissingProperty {
                    index,
                    property: "name",
                })?
                .to_owned();
            let geometry = feature
                .geometry
                .ok_or(ReferenceAreaError::Geometry {
                    index,
                    source: GeometryError::MissingGeometry,
                })?;
            let geom = areal_from_geojson(geometry.value)
                .map_err(|source| ReferenceAreaError::Geometry { index, source })?;
            Ok(ReferenceArea {
                id,
                kind,
                name,
                geom,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::square;
    use rstest::{fixture, rstest};

    fn area(id: i64, kind: ReferenceAreaKind, geom: MultiPolygon<f64>) -> ReferenceArea {
        ReferenceArea {
            id,
            kind,
            name: format!("area {id}"),
            geom,
        }
    }

    #[fixture]
    fn index() -> ReferenceAreaIndex {
        ReferenceAreaIndex::new(vec![
            area(1, ReferenceAreaKind::Department, square(0.0, 0.0, 10.0, 10.0)),
            area(2, ReferenceAreaKind::Municipality, square(0.0, 0.0, 5.0, 10.0)),
            area(3, ReferenceAreaKind::Municipality, square(5.0, 0.0, 10.0, 10.0)),
            area(4, ReferenceAreaKind::RiverBasin, square(50.0, 50.0, 60.0, 60.0)),
        ])
    }

    #[rstest]
    fn finds_intersecting_areas_in_id_order(index: ReferenceAreaIndex) {
        let found: Vec<i64> = index
            .intersecting(&square(1.0, 1.0, 6.0, 6.0), None)
            .into_iter()
            .map(|area| area.id)
            .collect();
        assert_eq!(found, vec![1, 2, 3]);
    }

    #[rstest]
    fn filters_by_kind(index: ReferenceAreaIndex) {
        let found = index.intersecting(
            &square(1.0, 1.0, 6.0, 6.0),
            Some(ReferenceAreaKind::Department),
        );
        assert_eq!(found.len(), 1);
    }

    #[rstest]
    fn computes_rounded_cover_percentages(index: ReferenceAreaIndex) {
        let covers = index.covers(&square(2.0, 0.0, 6.0, 10.0));
        let percents: Vec<(i64, u8)> = covers
            .iter()
            .map(|cover| (cover.area_id, cover.cover_percent))
            .collect();
        assert_eq!(percents, vec![(1, 100), (2, 75), (3, 25)]);
    }

    #[rstest]
    fn boundary_contact_reports_zero_cover(index: ReferenceAreaIndex) {
        let covers = index.covers(&square(10.0, 0.0, 12.0, 10.0));
        assert!(covers.iter().any(|cover| cover.area_id == 1 && cover.cover_percent == 0));
    }

    #[rstest]
    fn empty_geometry_matches_nothing(index: ReferenceAreaIndex) {
        assert!(index.covers(&MultiPolygon::new(Vec::new())).is_empty());
    }

    #[rstest]
    fn parses_feature_collections() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"id": 38, "kind": "department", "name": "Isère"},
                "geometry": {"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}
            }]
        }"#;
        let areas = parse_reference_areas(text).expect("valid collection");
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].kind, ReferenceAreaKind::Department);
        assert_eq!(areas[0].name, "Isère");
    }

    #[rstest]
    fn rejects_features_without_kind() {
        let text = r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{"id":1,"name":"x"},"geometry":null}]}"#;
        let err = parse_reference_areas(text).expect_err("missing kind");
        assert!(matches!(
            err,
            ReferenceAreaError::MissingProperty {
                property: "kind",
                ..
            }
        ));
    }

    #[rstest]
    #[case(r#"{"type":"Point","coordinates":[0,0]}"#)]
    #[case("not json")]
    fn rejects_non_collections(#[case] text: &str) {
        assert!(matches!(
            parse_reference_areas(text),
            Err(ReferenceAreaError::NotACollection)
        ));
    }
}
