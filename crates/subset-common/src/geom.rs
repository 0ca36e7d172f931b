//! Subset geometries carried by a request.

use crate::crs::Crs;

/// The spatial constraint of a request: an area to clip or a set of points
/// to sample. Each variant carries the CRS its coordinates are expressed
/// in, which may differ from the request's target CRS.
#[derive(Debug, Clone, PartialEq)]
pub enum SubsetGeometry {
    Polygon { ring: Vec<(f64, f64)>, crs: Crs },
    MultiPoint { points: Vec<(f64, f64)>, crs: Crs },
}

impl SubsetGeometry {
    /// An area-of-interest ring: closed (first point repeated last), at
    /// least four points.
    pub fn polygon(ring: Vec<(f64, f64)>, crs: Crs) -> Result<Self, GeometryError> {
        if ring.is_empty() {
            return Err(GeometryError::Empty);
        }
        if ring.len() < 4 || ring.first() != ring.last() {
            return Err(GeometryError::OpenRing(ring.len()));
        }
        Ok(SubsetGeometry::Polygon { ring, crs })
    }

    pub fn multi_point(points: Vec<(f64, f64)>, crs: Crs) -> Result<Self, GeometryError> {
        if points.is_empty() {
            return Err(GeometryError::Empty);
        }
        Ok(SubsetGeometry::MultiPoint { points, crs })
    }

    pub fn crs(&self) -> &Crs {
        match self {
            SubsetGeometry::Polygon { crs, .. } | SubsetGeometry::MultiPoint { crs, .. } => crs,
        }
    }

    pub fn is_points(&self) -> bool {
        matches!(self, SubsetGeometry::MultiPoint { .. })
    }

    pub fn coords(&self) -> &[(f64, f64)] {
        match self {
            SubsetGeometry::Polygon { ring, .. } => ring,
            SubsetGeometry::MultiPoint { points, .. } => points,
        }
    }

    /// Axis-aligned bounds as `(min_x, min_y, max_x, max_y)`.
    pub fn bounding_box(&self) -> (f64, f64, f64, f64) {
        let mut bounds = (
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        );
        for (x, y) in self.coords() {
            bounds.0 = bounds.0.min(*x);
            bounds.1 = bounds.1.min(*y);
            bounds.2 = bounds.2.max(*x);
            bounds.3 = bounds.3.max(*y);
        }
        bounds
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("Geometry has no coordinates")]
    Empty,
    #[error("Polygon ring must be closed with at least 4 points, got {0}")]
    OpenRing(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wgs84() -> Crs {
        Crs::parse("EPSG:4326").unwrap()
    }

    #[test]
    fn test_polygon_requires_closed_ring() {
        let open = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)];
        assert!(matches!(
            SubsetGeometry::polygon(open, wgs84()),
            Err(GeometryError::OpenRing(3))
        ));

        let closed = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)];
        let geom = SubsetGeometry::polygon(closed, wgs84()).unwrap();
        assert!(!geom.is_points());
    }

    #[test]
    fn test_multi_point_requires_coords() {
        assert!(matches!(
            SubsetGeometry::multi_point(vec![], wgs84()),
            Err(GeometryError::Empty)
        ));
        let geom = SubsetGeometry::multi_point(vec![(5.0, 6.0)], wgs84()).unwrap();
        assert!(geom.is_points());
        assert_eq!(geom.crs().as_str(), "EPSG:4326");
    }

    #[test]
    fn test_bounding_box() {
        let geom =
            SubsetGeometry::multi_point(vec![(2.0, -1.0), (-3.0, 4.0), (0.5, 0.5)], wgs84())
                .unwrap();
        assert_eq!(geom.bounding_box(), (-3.0, -1.0, 2.0, 4.0));
    }
}
