//! ---
//! ve_section: "02-grid-simulation"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Physical grid model and tick pipeline."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
//! Clamp helpers with a fixed policy for non-finite intermediates: a NaN or
//! infinite result is replaced by the clamp endpoint, never propagated.

/// Clamp to `[lo, hi]`, mapping `+inf` to `hi` and `-inf`/NaN to `lo`.
pub fn clamp_finite(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        return lo;
    }
    if value == f64::INFINITY {
        return hi;
    }
    if value == f64::NEG_INFINITY {
        return lo;
    }
    value.clamp(lo, hi)
}

/// Replace a non-finite value with `fallback`.
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
