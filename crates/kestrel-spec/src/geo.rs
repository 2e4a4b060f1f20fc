//! Physical-distance helpers supplied to timeout formulas. The
//! specification engine itself never computes distances.

const EARTH_RADIUS_METRES: f64 = 6_371_000.0;

/// Great-circle distance between two (latitude, longitude) points in
/// decimal degrees, in metres. Haversine formulation.
pub fn great_circle_metres(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METRES * c
}

/// Absolute altitude delta in metres.
pub fn altitude_delta_metres(from: f64, to: f64) -> f64 {
    (to - from).abs()
}
