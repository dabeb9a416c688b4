use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, String> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(format!("latitude {} is outside -90..=90", latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("longitude {} is outside -180..=180", longitude));
        }
        Ok(Self { latitude, longitude })
    }
}

impl FromStr for Coordinates {
    type Err = String;

    /// Parses `"lat,lon"`, e.g. `"51.5074,-0.1278"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| format!("expected \"lat,lon\", got {:?}", s))?;
        let latitude = lat
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("bad latitude {:?}: {}", lat, e))?;
        let longitude = lon
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("bad longitude {:?}: {}", lon, e))?;
        Self::new(latitude, longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4},{:.4}", self.latitude, self.longitude)
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

pub fn is_within_radius(user: Coordinates, center: Coordinates, radius_km: f64) -> bool {
    haversine_km(user, center) <= radius_km
}

#[cfg(test)]
mod tests {
    use super::*;

    fn london() -> Coordinates {
        Coordinates::new(51.5074, -0.1278).unwrap()
    }

    fn paris() -> Coordinates {
        Coordinates::new(48.8566, 2.3522).unwrap()
    }

    #[test]
    fn same_point_is_zero() {
        assert_eq!(haversine_km(london(), london()), 0.0);
    }

    #[test]
    fn london_to_paris() {
        let d = haversine_km(london(), paris());
        assert!((d - 343.5).abs() < 1.0, "got {}", d);
        assert!((haversine_km(paris(), london()) - d).abs() < 1e-9);
    }

    #[test]
    fn radius_check_is_inclusive_of_nearby_points() {
        assert!(is_within_radius(paris(), london(), 350.0));
        assert!(!is_within_radius(paris(), london(), 300.0));
        assert!(is_within_radius(london(), london(), 0.0));
    }

    #[test]
    fn parses_lat_lon_pairs() {
        let c: Coordinates = " 35.6762 , 139.6503".parse().unwrap();
        assert_eq!(c.latitude, 35.6762);
        assert_eq!(c.longitude, 139.6503);
        assert!("91,0".parse::<Coordinates>().is_err());
        assert!("10".parse::<Coordinates>().is_err());
        assert!("a,b".parse::<Coordinates>().is_err());
    }
}
