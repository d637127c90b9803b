//! Property-based tests for `GeometryReconciler`.
//!
//! # Invariants tested
//!
//! - **No overlap:** contours persisted one after another never share area.
//! - **Stable area:** the surface of an unopposed contour is its planar area
//!   in hectares and does not drift between calls.
//! - **Self-exclusion:** an edited wetland never conflicts with itself.
//! - **Exact subtraction:** a partial overlap removes exactly the shared
//!   surface.
#![expect(
    clippy::float_arithmetic,
    reason = "properties compare measured surfaces"
)]

use geo::{Area, BooleanOps, MultiPolygon, Rect, coord};
use proptest::prelude::*;
use wetland_core::{GeometryReconciler, ReconcileError, WetlandGeometryRecord, WetlandId};

fn rect(x: i32, y: i32, width: i32, height: i32) -> MultiPolygon<f64> {
    let min = coord! { x: f64::from(x), y: f64::from(y) };
    let max = coord! { x: f64::from(x + width), y: f64::from(y + height) };
    MultiPolygon::new(vec![Rect::new(min, max).to_polygon()])
}

fn rect_strategy(extent: i32, max_side: i32) -> impl Strategy<Value = MultiPolygon<f64>> {
    (0..extent, 0..extent, 1..=max_side, 1..=max_side)
        .prop_map(|(x, y, width, height)| rect(x, y, width, height))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: successive reconcile-then-persist steps keep every pair of
    /// stored contours disjoint.
    #[test]
    fn persisted_contours_never_overlap(
        candidates in prop::collection::vec(rect_strategy(20, 10), 1..8),
    ) {
        let reconciler = GeometryReconciler::default();
        let mut stored: Vec<WetlandGeometryRecord> = Vec::new();
        for (index, candidate) in candidates.iter().enumerate() {
            match reconciler.reconcile(candidate, None, &stored) {
                Ok(result) if !result.polygon.0.is_empty() => {
                    let id = WetlandId(i64::try_from(index).expect("small index"));
                    stored.push(WetlandGeometryRecord::persisted(id, result.polygon));
                }
                Ok(_) | Err(ReconcileError::Contained(_)) => {}
                Err(err) => return Err(TestCaseError::fail(format!("unexpected error: {err}"))),
            }
        }
        for (position, left) in stored.iter().enumerate() {
            for right in stored.iter().skip(position + 1) {
                let shared = left.geom.intersection(&right.geom).unsigned_area();
                prop_assert!(
                    shared < 1e-6,
                    "wetlands {:?} and {:?} share {shared}",
                    left.id,
                    right.id
                );
            }
        }
    }

    /// Property: the area of an unopposed contour is its planar area in
    /// hectares, rounded to two decimals, on every call.
    #[test]
    fn area_of_unopposed_contour_is_stable(candidate in rect_strategy(5_000, 2_000)) {
        let reconciler = GeometryReconciler::default();
        let result = reconciler.reconcile(&candidate, None, &[]).expect("nothing to conflict with");
        prop_assert_eq!(&result.polygon, &candidate);
        let first = reconciler.area(&result.polygon).expect("area");
        let second = reconciler.area(&result.polygon).expect("area");
        let expected = (candidate.unsigned_area() / 10_000.0 * 100.0).round() / 100.0;
        prop_assert_eq!(first, second);
        prop_assert!((first - expected).abs() < 1e-9, "{first} != {expected}");
    }

    /// Property: a wetland being edited does not conflict with its own
    /// stored contour.
    #[test]
    fn edited_wetland_ignores_itself(candidate in rect_strategy(100, 50)) {
        let existing = [WetlandGeometryRecord::persisted(WetlandId(7), candidate.clone())];
        let result = GeometryReconciler::default()
            .reconcile(&candidate, Some(WetlandId(7)), &existing)
            .expect("own contour is skipped");
        prop_assert!(!result.is_intersected);
        prop_assert_eq!(result.polygon, candidate);
    }

    /// Property: a partial overlap flags the contour and removes exactly the
    /// shared surface.
    #[test]
    fn partial_overlap_removes_shared_surface(
        offset_x in 1_i32..10,
        offset_y in 1_i32..10,
    ) {
        let existing_geom = rect(0, 0, 10, 10);
        let candidate = rect(offset_x, offset_y, 10, 10);
        let shared = candidate.intersection(&existing_geom).unsigned_area();
        let existing = [WetlandGeometryRecord::persisted(WetlandId(1), existing_geom)];
        let result = GeometryReconciler::default()
            .reconcile(&candidate, None, &existing)
            .expect("partial overlap is accepted");
        prop_assert!(result.is_intersected);
        let remaining = result.polygon.unsigned_area();
        prop_assert!(
            (remaining - (candidate.unsigned_area() - shared)).abs() < 1e-6,
            "remaining surface {remaining}"
        );
    }
}
