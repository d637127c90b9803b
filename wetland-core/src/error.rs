//! Service-level errors and their caller-facing representation.

use std::error::Error as StdError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    AreaError, CruvedParseError, DirectoryError, InsufficientRightsError, ReconcileError,
    StoreError,
};

/// A request payload failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The main name was empty or whitespace.
    #[error("the wetland main name must not be empty")]
    EmptyName,
    /// The page size was zero.
    #[error("the page limit must be positive")]
    ZeroLimit,
    /// A CRUVED table or code could not be decoded.
    #[error(transparent)]
    Cruved(#[from] CruvedParseError),
}

/// Errors raised by [`crate::WetlandService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request payload was invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The contour could not be reconciled.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    /// The reconciled contour has no measurable area.
    #[error(transparent)]
    Area(#[from] AreaError),
    /// The user may not perform the action.
    #[error(transparent)]
    Forbidden(#[from] InsufficientRightsError),
    /// Persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The user's dataset rights could not be resolved.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Structured error returned to callers: `{message, details, status_code}`.
///
/// `message` is a stable machine-readable key, `details` the rendered error
/// chain, and `status_code` the HTTP-equivalent status.
///
/// # Examples
/// ```
/// use wetland_core::{ApiError, PolygonContainedError, ReconcileError, ServiceError};
///
/// let err = ServiceError::from(ReconcileError::from(PolygonContainedError { existing_id: None }));
/// let api = ApiError::from(&err);
/// assert_eq!(api.message, "polygon_contained_in_zh");
/// assert_eq!(api.status_code, 400);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[error("{message}: {details}")]
pub struct ApiError {
    /// Stable error key.
    pub message: String,
    /// Human-readable diagnosis.
    pub details: String,
    /// HTTP-equivalent status.
    pub status_code: u16,
}

impl ApiError {
    /// Build an error from its parts.
    #[must_use]
    pub fn new(message: impl Into<String>, details: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            details: details.into(),
            status_code,
        }
    }
}

impl From<&ServiceError> for ApiError {
    fn from(err: &ServiceError) -> Self {
        match err {
            ServiceError::Validation(inner) => Self::new("invalid_request", inner.to_string(), 400),
            ServiceError::Reconcile(ReconcileError::Contained(_)) => Self::new(
                "polygon_contained_in_zh",
                "the new zh contour is fully contained in an existing one",
                400,
            ),
            ServiceError::Reconcile(inner @ ReconcileError::Geometry(_)) => {
                Self::new("set_geom_error", render_chain(inner), 500)
            }
            ServiceError::Area(inner) => Self::new("set_area_error", render_chain(inner), 500),
            ServiceError::Forbidden(inner) => {
                Self::new("insufficient_rights", inner.to_string(), inner.status_code())
            }
            ServiceError::Store(inner @ StoreError::NotFound { .. }) => {
                Self::new("zh_not_found", inner.to_string(), 404)
            }
            ServiceError::Store(inner) => Self::new("store_error", render_chain(inner), 500),
            ServiceError::Directory(inner) => {
                Self::new("dataset_lookup_error", render_chain(inner), 500)
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self::from(&err)
    }
}

/// Render an error followed by each of its sources, separated by `": "`.
pub(crate) fn render_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.ends_with(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AccessLevel, CruvedAction, GeometryError, PolygonContainedError, UserId, WetlandId,
    };
    use rstest::rstest;

    #[rstest]
    fn contained_polygon_maps_to_bad_request() {
        let err = ServiceError::from(ReconcileError::from(PolygonContainedError {
            existing_id: Some(WetlandId(1)),
        }));
        let api = ApiError::from(err);
        assert_eq!(api.message, "polygon_contained_in_zh");
        assert_eq!(
            api.details,
            "the new zh contour is fully contained in an existing one"
        );
        assert_eq!(api.status_code, 400);
    }

    #[rstest]
    fn geometry_failures_keep_their_cause() {
        let err = ServiceError::from(ReconcileError::from(GeometryError::Wkt {
            message: "unexpected end".to_owned(),
        }));
        let api = ApiError::from(&err);
        assert_eq!(api.message, "set_geom_error");
        assert_eq!(api.status_code, 500);
        assert!(api.details.contains("unexpected end"), "{}", api.details);
    }

    #[rstest]
    #[case(AreaError::EmptyGeometry)]
    #[case(AreaError::ZeroSurface)]
    fn area_failures_map_to_set_area_error(#[case] err: AreaError) {
        let api = ApiError::from(ServiceError::from(err));
        assert_eq!(api.message, "set_area_error");
        assert_eq!(api.status_code, 500);
    }

    #[rstest]
    fn rights_failures_are_forbidden() {
        let api = ApiError::from(ServiceError::from(InsufficientRightsError {
            user: UserId(4),
            action: CruvedAction::Update,
            level: AccessLevel::OwnOnly,
        }));
        assert_eq!(api.message, "insufficient_rights");
        assert_eq!(api.details, "User \"4\" cannot \"U\" this current zh");
        assert_eq!(api.status_code, 403);
    }

    #[rstest]
    fn missing_wetlands_are_not_found() {
        let api = ApiError::from(ServiceError::from(StoreError::NotFound { id: WetlandId(9) }));
        assert_eq!(api.message, "zh_not_found");
        assert_eq!(api.status_code, 404);
    }

    #[rstest]
    fn validation_failures_are_bad_requests() {
        let api = ApiError::from(ServiceError::from(ValidationError::EmptyName));
        assert_eq!(api.status_code, 400);
    }
}
