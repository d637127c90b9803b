//! Conversions between wire formats and the working wetland geometry.
//!
//! Wetland contours are handled as [`MultiPolygon`] values in WGS84
//! (`x = longitude`, `y = latitude`). Candidates arrive as GeoJSON text and
//! are persisted as WKT text. A difference produced by the boolean-ops engine
//! can be normalised by rendering it to WKT and parsing it back.

use geo::{Area, Geometry, MultiPolygon, Polygon, Validation};
use geojson::GeoJson;
use thiserror::Error;
use wkt::{ToWkt, TryFromWkt};

/// Spatial reference of every wetland geometry (geographic WGS84).
pub const WGS84_SRID: u32 = 4326;

/// Errors raised while decoding, encoding or normalising geometries.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The payload was not valid GeoJSON.
    #[error("invalid GeoJSON geometry: {source}")]
    GeoJson {
        /// Decoder error from `geojson`.
        #[source]
        source: Box<geojson::Error>,
    },
    /// A GeoJSON feature carried no geometry.
    #[error("GeoJSON feature has no geometry")]
    MissingGeometry,
    /// The geometry was not areal.
    #[error("unsupported geometry type {kind}; expected Polygon or MultiPolygon")]
    UnsupportedGeometry {
        /// Type name of the rejected geometry.
        kind: &'static str,
    },
    /// A coordinate was NaN or infinite.
    #[error("geometry contains a non-finite coordinate")]
    NonFiniteCoordinate,
    /// The geometry, or one of its parts, has no coordinates.
    #[error("geometry has no coordinates")]
    EmptyGeometry,
    /// The contour is self-intersecting or encloses no surface.
    #[error("invalid polygon: {message}")]
    InvalidGeometry {
        /// Reason reported by the validity check.
        message: String,
    },
    /// WKT text could not be turned back into a polygon.
    #[error("failed to parse WKT geometry: {message}")]
    Wkt {
        /// Parser message from `wkt`.
        message: String,
    },
}

/// Parse a GeoJSON `Polygon`/`MultiPolygon` geometry, or a feature carrying
/// one, into the working representation.
///
/// # Errors
/// Returns [`GeometryError`] for malformed JSON, non-areal geometries,
/// empty rings, non-finite coordinates and contours that are not valid
/// polygons (self-intersecting or without surface).
///
/// # Examples
/// ```
/// use wetland_core::geometry::parse_geojson_geometry;
///
/// let text = r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}"#;
/// let polygon = parse_geojson_geometry(text).expect("valid polygon");
/// assert_eq!(polygon.0.len(), 1);
/// ```
pub fn parse_geojson_geometry(text: &str) -> Result<MultiPolygon<f64>, GeometryError> {
    let parsed: GeoJson = text.parse().map_err(geojson_error)?;
    let geometry = match parsed {
        GeoJson::Geometry(geometry) => geometry,
        GeoJson::Feature(feature) => feature.geometry.ok_or(GeometryError::MissingGeometry)?,
        GeoJson::FeatureCollection(_) => {
            return Err(GeometryError::UnsupportedGeometry {
                kind: "FeatureCollection",
            });
        }
    };
    let polygon = areal_from_geojson(geometry.value)?;
    ensure_not_empty(&polygon)?;
    ensure_finite(&polygon)?;
    ensure_valid(&polygon)?;
    Ok(polygon)
}

pub(crate) fn areal_from_geojson(
    value: geojson::Value,
) -> Result<MultiPolygon<f64>, GeometryError> {
    match value {
        value @ geojson::Value::Polygon(_) => Polygon::try_from(value)
            .map(|polygon| MultiPolygon::new(vec![polygon]))
            .map_err(geojson_error),
        value @ geojson::Value::MultiPolygon(_) => {
            MultiPolygon::try_from(value).map_err(geojson_error)
        }
        other => Err(GeometryError::UnsupportedGeometry {
            kind: other.type_name(),
        }),
    }
}

/// Render a wetland geometry as a GeoJSON geometry object.
#[must_use]
pub fn to_geojson_geometry(polygon: &MultiPolygon<f64>) -> geojson::Geometry {
    geojson::Geometry::new(geojson::Value::from(polygon))
}

/// Render a wetland geometry as WKT text.
#[must_use]
pub fn to_wkt(polygon: &MultiPolygon<f64>) -> String {
    polygon.wkt_string()
}

/// Parse WKT text holding a `POLYGON` or `MULTIPOLYGON`.
///
/// # Errors
/// Returns [`GeometryError::Wkt`] when the text is malformed and
/// [`GeometryError::UnsupportedGeometry`] for non-areal geometries.
pub fn from_wkt(text: &str) -> Result<MultiPolygon<f64>, GeometryError> {
    let geometry = Geometry::<f64>::try_from_wkt_str(text).map_err(|err| GeometryError::Wkt {
        message: err.to_string(),
    })?;
    match geometry {
        Geometry::Polygon(polygon) => Ok(MultiPolygon::new(vec![polygon])),
        Geometry::MultiPolygon(polygon) => Ok(polygon),
        Geometry::Point(_) => Err(unsupported("Point")),
        Geometry::Line(_) | Geometry::LineString(_) => Err(unsupported("LineString")),
        Geometry::MultiPoint(_) => Err(unsupported("MultiPoint")),
        Geometry::MultiLineString(_) => Err(unsupported("MultiLineString")),
        Geometry::GeometryCollection(_) => Err(unsupported("GeometryCollection")),
        Geometry::Rect(rect) => Ok(MultiPolygon::new(vec![rect.to_polygon()])),
        Geometry::Triangle(triangle) => Ok(MultiPolygon::new(vec![triangle.to_polygon()])),
    }
}

fn geojson_error(source: geojson::Error) -> GeometryError {
    GeometryError::GeoJson {
        source: Box::new(source),
    }
}

const fn unsupported(kind: &'static str) -> GeometryError {
    GeometryError::UnsupportedGeometry { kind }
}

/// Round-trip a geometry through WKT.
///
/// Boolean-op output is re-read from its text form so that every stored
/// contour has passed through the same encoding as persisted geometries.
/// Empty geometries are returned unchanged.
///
/// # Errors
/// Propagates [`GeometryError::Wkt`] if the rendered text cannot be parsed.
pub fn normalise_via_wkt(polygon: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, GeometryError> {
    if polygon.0.is_empty() {
        return Ok(polygon.clone());
    }
    from_wkt(&to_wkt(polygon))
}

fn ensure_not_empty(polygon: &MultiPolygon<f64>) -> Result<(), GeometryError> {
    if polygon.0.is_empty() || polygon.0.iter().any(|part| part.exterior().0.is_empty()) {
        Err(GeometryError::EmptyGeometry)
    } else {
        Ok(())
    }
}

fn ensure_valid(polygon: &MultiPolygon<f64>) -> Result<(), GeometryError> {
    polygon
        .check_validation()
        .map_err(|err| GeometryError::InvalidGeometry {
            message: err.to_string(),
        })?;
    // Shoelace cancellation leaves a bowtie with zero surface too.
    if polygon.0.iter().any(|part| part.unsigned_area() <= 0.0) {
        return Err(GeometryError::InvalidGeometry {
            message: "polygon encloses no surface".to_owned(),
        });
    }
    Ok(())
}

fn ensure_finite(polygon: &MultiPolygon<f64>) -> Result<(), GeometryError> {
    let finite = polygon.0.iter().all(|part| {
        std::iter::once(part.exterior())
            .chain(part.interiors())
            .flat_map(|ring| ring.coords())
            .all(|coord| coord.x.is_finite() && coord.y.is_finite())
    });
    if finite {
        Ok(())
    } else {
        Err(GeometryError::NonFiniteCoordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::square;
    use rstest::rstest;

    const SQUARE: &str = r#"{"type":"Polygon","coordinates":[[[0,0],[10,0],[10,10],[0,10],[0,0]]]}"#;

    #[rstest]
    fn parses_polygon_geometry() {
        let polygon = parse_geojson_geometry(SQUARE).expect("parse polygon");
        assert_eq!(polygon, square(0.0, 0.0, 10.0, 10.0));
    }

    #[rstest]
    #[expect(clippy::float_arithmetic, reason = "tests compare areas")]
    fn parses_feature_geometry() {
        let feature = format!(r#"{{"type":"Feature","properties":{{}},"geometry":{SQUARE}}}"#);
        let polygon = parse_geojson_geometry(&feature).expect("parse feature");
        assert!((polygon.unsigned_area() - 100.0).abs() < f64::EPSILON);
    }

    #[rstest]
    fn parses_multipolygon_geometry() {
        let text = r#"{"type":"MultiPolygon","coordinates":[[[[0,0],[1,0],[1,1],[0,1],[0,0]]],[[[2,2],[3,2],[3,3],[2,3],[2,2]]]]}"#;
        let polygon = parse_geojson_geometry(text).expect("parse multipolygon");
        assert_eq!(polygon.0.len(), 2);
    }

    #[rstest]
    #[case(r#"{"type":"Point","coordinates":[0,0]}"#, "Point")]
    #[case(r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#, "LineString")]
    fn rejects_non_areal_geometry(#[case] text: &str, #[case] expected: &str) {
        let err = parse_geojson_geometry(text).expect_err("non-areal geometry");
        assert!(matches!(err, GeometryError::UnsupportedGeometry { kind } if kind == expected));
    }

    #[rstest]
    fn rejects_feature_without_geometry() {
        let text = r#"{"type":"Feature","properties":{},"geometry":null}"#;
        let err = parse_geojson_geometry(text).expect_err("missing geometry");
        assert!(matches!(err, GeometryError::MissingGeometry));
    }

    #[rstest]
    #[case(r#"{"type":"Polygon","coordinates":[[]]}"#)]
    #[case(r#"{"type":"Polygon","coordinates":[]}"#)]
    #[case(r#"{"type":"MultiPolygon","coordinates":[]}"#)]
    #[case(r#"{"type":"MultiPolygon","coordinates":[[[[0,0],[1,0],[1,1],[0,0]]],[[]]]}"#)]
    fn rejects_contours_without_coordinates(#[case] text: &str) {
        let err = parse_geojson_geometry(text).expect_err("empty contour");
        assert!(matches!(err, GeometryError::EmptyGeometry), "got {err:?}");
    }

    #[rstest]
    #[case::collinear_ring(r#"{"type":"Polygon","coordinates":[[[0,0],[1,1],[2,2],[0,0]]]}"#)]
    #[case::bowtie(r#"{"type":"Polygon","coordinates":[[[5,5],[15,15],[15,5],[5,15],[5,5]]]}"#)]
    fn rejects_degenerate_and_self_intersecting_rings(#[case] text: &str) {
        let err = parse_geojson_geometry(text).expect_err("invalid contour");
        assert!(matches!(err, GeometryError::InvalidGeometry { .. }), "got {err:?}");
    }

    #[rstest]
    fn rejects_malformed_json() {
        let err = parse_geojson_geometry("{not json").expect_err("malformed");
        assert!(matches!(err, GeometryError::GeoJson { .. }));
    }

    #[rstest]
    fn wkt_round_trip_preserves_geometry() {
        let polygon = square(1.5, 2.5, 3.5, 4.5);
        let normalised = normalise_via_wkt(&polygon).expect("normalise");
        assert_eq!(normalised, polygon);
    }

    #[rstest]
    fn from_wkt_accepts_single_polygon() {
        let polygon = from_wkt("POLYGON((0 0,10 0,10 10,0 10,0 0))").expect("parse wkt");
        assert_eq!(polygon, square(0.0, 0.0, 10.0, 10.0));
    }

    #[rstest]
    fn from_wkt_rejects_points() {
        let err = from_wkt("POINT(1 2)").expect_err("point is not areal");
        assert!(matches!(err, GeometryError::UnsupportedGeometry { kind: "Point" }));
    }

    #[rstest]
    fn from_wkt_reports_parse_failures() {
        let err = from_wkt("POLYGON((0 0,").expect_err("truncated wkt");
        assert!(matches!(err, GeometryError::Wkt { .. }));
    }
}
