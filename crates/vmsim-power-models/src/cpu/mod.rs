//! Utilization-driven power models.

pub mod empirical;
pub mod linear;
pub mod utilization_aware;

// NaN is treated as no load.
pub(crate) fn clamp_utilization(utilization: f64) -> f64 {
    if utilization.is_nan() {
        0.
    } else {
        utilization.clamp(0., 1.)
    }
}
