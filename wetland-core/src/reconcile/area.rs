//! Surface computation for reconciled contours.

use std::{fmt, str::FromStr};

use geo::{Area, GeodesicArea, MultiPolygon};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::AreaError;

const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

/// How the surface of a contour is measured before conversion to hectares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum AreaMode {
    /// Cartesian area of the stored coordinates.
    #[default]
    Planar,
    /// Ellipsoidal area on WGS84, in square metres.
    Geodesic,
}

impl AreaMode {
    /// Return the mode as a lowercase `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planar => "planar",
            Self::Geodesic => "geodesic",
        }
    }

    pub(crate) fn measure(self, polygon: &MultiPolygon<f64>) -> f64 {
        match self {
            Self::Planar => polygon.unsigned_area(),
            Self::Geodesic => polygon.geodesic_area_unsigned(),
        }
    }
}

impl fmt::Display for AreaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AreaMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planar" => Ok(Self::Planar),
            "geodesic" => Ok(Self::Geodesic),
            _ => Err(format!("unknown area mode '{s}'")),
        }
    }
}

/// Convert square metres to hectares rounded to two decimals.
#[expect(
    clippy::float_arithmetic,
    reason = "hectare conversion divides and rounds the measured surface"
)]
pub(crate) fn hectares(square_metres: f64) -> Result<f64, AreaError> {
    if !square_metres.is_finite() {
        return Err(AreaError::NonFinite);
    }
    let hectares = square_metres / SQUARE_METRES_PER_HECTARE;
    Ok((hectares * 100.0).round() / 100.0)
}
