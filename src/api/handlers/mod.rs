//! HTTP handlers, one module per resource.

use crate::error::FieldErrors;

pub mod crops;
pub mod investment;
pub mod lands;
pub mod recommendations;
pub mod soil;
pub mod users;

/// Largest page a ranked search may return
pub const MAX_LIMIT: usize = 50;

pub(crate) fn check_coordinates(errors: &mut FieldErrors, latitude: f64, longitude: f64) {
    errors.check_range("latitude", latitude, -90.0, 90.0);
    errors.check_range("longitude", longitude, -180.0, 180.0);
}

/// Resolves an optional `limit` against its default, recording out-of-range values
pub(crate) fn resolve_limit(errors: &mut FieldErrors, limit: Option<usize>, default: usize) -> usize {
    match limit {
        None => default,
        Some(limit) if (1..=MAX_LIMIT).contains(&limit) => limit,
        Some(_) => {
            errors.add(
                "limit",
                format!("Ensure this value is between 1 and {}.", MAX_LIMIT),
            );
            default
        }
    }
}
