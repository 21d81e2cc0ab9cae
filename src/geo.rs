//! Geographic primitives used by the listing filters.
//!
//! Coordinates are always `(longitude, latitude)` in WGS84, matching the
//! order the map front-end sends for `bbox` and `center`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Result<Self> {
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(Error::validation(format!(
                "coordinates out of range: ({lon}, {lat})"
            )));
        }
        Ok(Self { lon, lat })
    }

    /// Parses a `lon,lat` pair
    pub fn parse_center(raw: &str) -> Result<Self> {
        let parts = parse_floats(raw, "center")?;
        match parts.as_slice() {
            [lon, lat] => Self::new(*lon, *lat),
            _ => Err(Error::validation(
                "center must be formatted as 'lon,lat'",
            )),
        }
    }

    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self, other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    /// Parses `xmin,ymin,xmax,ymax`
    pub fn parse(raw: &str) -> Result<Self> {
        let parts = parse_floats(raw, "bbox")?;
        let [xmin, ymin, xmax, ymax] = parts.as_slice() else {
            return Err(Error::validation(
                "bbox must be formatted as 'xmin,ymin,xmax,ymax'",
            ));
        };

        let sw = GeoPoint::new(*xmin, *ymin)?;
        let ne = GeoPoint::new(*xmax, *ymax)?;
        if sw.lon > ne.lon || sw.lat > ne.lat {
            return Err(Error::validation("bbox minimum exceeds its maximum"));
        }

        Ok(Self {
            xmin: sw.lon,
            ymin: sw.lat,
            xmax: ne.lon,
            ymax: ne.lat,
        })
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.xmin..=self.xmax).contains(&point.lon) && (self.ymin..=self.ymax).contains(&point.lat)
    }
}

fn parse_floats(raw: &str, what: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| Error::validation(format!("invalid {what} value '{part}'")))
        })
        .collect()
}

/// Great-circle distance between two points
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Closed ring of points describing a city boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub ring: Vec<GeoPoint>,
}

impl Polygon {
    pub fn new(ring: Vec<GeoPoint>) -> Self {
        Self { ring }
    }

    /// Even-odd ray casting; degenerate rings contain nothing
    pub fn contains(&self, point: &GeoPoint) -> bool {
        if self.ring.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = self.ring.len() - 1;
        for i in 0..self.ring.len() {
            let (pi, pj) = (&self.ring[i], &self.ring[j]);
            if (pi.lat > point.lat) != (pj.lat > point.lat) {
                let cross = (pj.lon - pi.lon) * (point.lat - pi.lat) / (pj.lat - pi.lat) + pi.lon;
                if point.lon < cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}
