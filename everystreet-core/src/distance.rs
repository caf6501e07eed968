//! Great-circle distance on a spherical earth.

use geo::Coord;

/// Mean earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in metres between two WGS84 coordinates.
///
/// Spherical-earth approximation; accurate to well under 0.5% over the
/// neighbourhood-scale distances the engine works with.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use everystreet_core::haversine_m;
///
/// let origin = Coord { x: 0.0, y: 0.0 };
/// assert_eq!(haversine_m(origin, origin), 0.0);
/// ```
#[must_use]
pub fn haversine_m(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let phi1 = a.y.to_radians();
    let phi2 = b.y.to_radians();
    let d_phi = (b.y - a.y).to_radians();
    let d_lambda = (b.x - a.x).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}
