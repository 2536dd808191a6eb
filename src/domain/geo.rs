// Geometry helpers for user-drawn polygons
use crate::domain::error::AnnotationError;
use serde::{Deserialize, Serialize};

pub const MIN_VERTICES: usize = 3;
pub const MAX_VERTICES: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Reject polygons the drawing surface should never have emitted
pub fn validate_polygon(coords: &[LatLng]) -> Result<(), AnnotationError> {
    if coords.len() < MIN_VERTICES || coords.len() > MAX_VERTICES {
        return Err(AnnotationError::InvalidGeometry(format!(
            "polygon must have between {} and {} points, got {}",
            MIN_VERTICES,
            MAX_VERTICES,
            coords.len()
        )));
    }
    if let Some(bad) = coords.iter().find(|c| !c.is_finite()) {
        return Err(AnnotationError::InvalidGeometry(format!(
            "non-finite vertex ({}, {})",
            bad.lat, bad.lng
        )));
    }
    Ok(())
}

/// Unweighted mean of the vertices
pub fn centroid(coords: &[LatLng]) -> Option<LatLng> {
    if coords.is_empty() {
        return None;
    }
    let (lat, lng) = coords
        .iter()
        .fold((0.0, 0.0), |(lat, lng), p| (lat + p.lat, lng + p.lng));
    let n = coords.len() as f64;
    Some(LatLng::new(lat / n, lng / n))
}
