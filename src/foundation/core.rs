use crate::foundation::error::{CollabError, CollabResult};

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Reject NaN, infinities and negative values.
pub fn check_non_negative(name: &str, v: f64) -> CollabResult<f64> {
    if !v.is_finite() || v < 0.0 {
        return Err(CollabError::validation(format!(
            "{name} must be finite and >= 0 (got {v})"
        )));
    }
    Ok(v)
}

/// Reject NaN, infinities, zero and negative values.
pub fn check_positive(name: &str, v: f64) -> CollabResult<f64> {
    if !v.is_finite() || v <= 0.0 {
        return Err(CollabError::validation(format!(
            "{name} must be finite and > 0 (got {v})"
        )));
    }
    Ok(v)
}
