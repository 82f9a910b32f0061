//! 공간 좌표 값

use std::fmt;

use serde::Serialize;

// ============================================================================
// Point - 공간 좌표
// ============================================================================

/// 공간 좌표
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    /// SRID (Spatial Reference ID)
    pub srid: i32,
    /// X 좌표 (경도)
    pub x: f64,
    /// Y 좌표 (위도)
    pub y: f64,
    /// Z 좌표 (고도, 선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Point {
    /// 2D 포인트 생성
    pub fn new_2d(srid: i32, x: f64, y: f64) -> Self {
        Self { srid, x, y, z: None }
    }

    /// 3D 포인트 생성
    pub fn new_3d(srid: i32, x: f64, y: f64, z: f64) -> Self {
        Self { srid, x, y, z: Some(z) }
    }

    /// WGS84 2D 포인트 (경도, 위도)
    pub fn wgs84_2d(longitude: f64, latitude: f64) -> Self {
        Self::new_2d(4326, longitude, latitude)
    }

    /// Cartesian 2D 포인트
    pub fn cartesian_2d(x: f64, y: f64) -> Self {
        Self::new_2d(7203, x, y)
    }

    /// Cartesian 3D 포인트
    pub fn cartesian_3d(x: f64, y: f64, z: f64) -> Self {
        Self::new_3d(9157, x, y, z)
    }

    /// 3D 여부
    pub fn is_3d(&self) -> bool {
        self.z.is_some()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.z {
            Some(z) => write!(f, "Point(srid={}, x={}, y={}, z={})", self.srid, self.x, self.y, z),
            None => write!(f, "Point(srid={}, x={}, y={})", self.srid, self.x, self.y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point() {
        let p = Point::wgs84_2d(-122.3321, 47.6062);
        assert_eq!(p.srid, 4326);
        assert!(!p.is_3d());

        let p = Point::cartesian_3d(1.0, 2.0, 3.0);
        assert_eq!(p.srid, 9157);
        assert!(p.is_3d());
        assert_eq!(p.to_string(), "Point(srid=9157, x=1, y=2, z=3)");
    }
}
