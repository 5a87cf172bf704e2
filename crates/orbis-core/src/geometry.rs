//! Equirectangular projection of the unit sphere.
//!
//! `+Y` is the north pole. Longitude 0 on the equator is `+Z`, longitude `+π/2` is `+X`. In projection space, `u = 0` is
//! the `-π` meridian and `v = 0` is the north pole.

use glam::DVec3;
use std::f64::consts::{PI, TAU};

/// A normalized equirectangular coordinate. `u` is cyclic in `[0, 1)`, `v` is clamped to `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Uv {
    pub u: f64,
    pub v: f64,
}

impl Uv {
    pub const fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }

    /// The center of pixel `(x, y)` on a `width x height` raster.
    #[inline]
    pub fn pixel_center(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::new(
            (x as f64 + 0.5) / width as f64,
            (y as f64 + 0.5) / height as f64,
        )
    }

    pub fn from_lat_lon(latitude: f64, longitude: f64) -> Self {
        Self::new(
            wrap_unit((longitude + PI) / TAU),
            (0.5 - latitude / PI).clamp(0.0, 1.0),
        )
    }

    /// Projects a direction. The zero vector projects to the center of the map.
    pub fn from_direction(direction: DVec3) -> Self {
        let (latitude, longitude) = lat_lon(direction);
        Self::from_lat_lon(latitude, longitude)
    }

    #[inline]
    pub fn latitude(&self) -> f64 {
        PI * (0.5 - self.v)
    }

    #[inline]
    pub fn longitude(&self) -> f64 {
        TAU * self.u - PI
    }

    /// The exact inverse of [`Uv::from_direction`].
    pub fn to_direction(&self) -> DVec3 {
        direction_from_lat_lon(self.latitude(), self.longitude())
    }

    /// Integer pixel containing this coordinate on a `width x height` raster. `u` wraps, `v` clamps.
    #[inline]
    pub fn to_pixel(&self, width: u32, height: u32) -> (u32, u32) {
        let x = (wrap_unit(self.u) * width as f64) as u32;
        let y = (self.v.clamp(0.0, 1.0) * height as f64) as u32;
        (x.min(width - 1), y.min(height - 1))
    }
}

/// Maps any real number into `[0, 1)`.
#[inline]
pub fn wrap_unit(x: f64) -> f64 {
    let w = x.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs.
    if w >= 1.0 {
        0.0
    } else {
        w
    }
}

pub fn direction_from_lat_lon(latitude: f64, longitude: f64) -> DVec3 {
    let (sin_lat, cos_lat) = latitude.sin_cos();
    let (sin_lon, cos_lon) = longitude.sin_cos();
    DVec3::new(cos_lat * sin_lon, sin_lat, cos_lat * cos_lon)
}

/// `(latitude, longitude)` in radians. Directions need not be normalized.
pub fn lat_lon(direction: DVec3) -> (f64, f64) {
    let d = direction.normalize_or_zero();
    if d == DVec3::ZERO {
        return (0.0, 0.0);
    }
    (d.y.clamp(-1.0, 1.0).asin(), d.x.atan2(d.z))
}

/// Great circle distance between two unit directions, in radians.
#[inline]
pub fn angular_distance(a: DVec3, b: DVec3) -> f64 {
    a.dot(b).clamp(-1.0, 1.0).acos()
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod test {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn axis_conventions() {
        let center = Uv::new(0.5, 0.5).to_direction();
        assert_relative_eq!(center.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(center.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(center.z, 1.0, epsilon = 1e-12);

        let east = Uv::from_direction(DVec3::X);
        assert_relative_eq!(east.u, 0.75, epsilon = 1e-12);
        assert_relative_eq!(east.v, 0.5, epsilon = 1e-12);

        assert_relative_eq!(Uv::from_direction(DVec3::Y).v, 0.0);
        assert_relative_eq!(Uv::from_direction(-DVec3::Y).v, 1.0);
    }

    #[test]
    fn pixel_round_trip() {
        let (width, height) = (37, 19);
        for y in 0..height {
            for x in 0..width {
                let uv = Uv::pixel_center(x, y, width, height);
                let direction = uv.to_direction();
                let back = Uv::from_direction(direction).to_direction();
                assert!(
                    back.distance(direction) < 1e-5,
                    "({}, {}) {:?} != {:?}",
                    x,
                    y,
                    back,
                    direction
                );
                assert_eq!(Uv::from_direction(direction).to_pixel(width, height), (x, y));
            }
        }
    }

    #[test]
    fn antimeridian_wraps_to_zero() {
        let uv = Uv::from_lat_lon(0.0, PI);
        assert_eq!(uv.u, 0.0);
        assert_eq!(wrap_unit(-1e-20), 0.0);
        assert_relative_eq!(wrap_unit(1.25), 0.25);
    }

    #[test]
    fn to_pixel_clamps_rows_and_wraps_columns() {
        assert_eq!(Uv::new(1.0, 1.0).to_pixel(8, 4), (0, 3));
        assert_eq!(Uv::new(-0.1, -0.5).to_pixel(10, 4), (9, 0));
    }

    #[test]
    fn zero_direction_projects_to_center() {
        assert_eq!(Uv::from_direction(DVec3::ZERO), Uv::new(0.5, 0.5));
    }

    #[test]
    fn distance_between_axes() {
        assert_relative_eq!(angular_distance(DVec3::X, DVec3::Y), PI / 2.0);
        assert_relative_eq!(angular_distance(DVec3::Z, DVec3::Z), 0.0);
    }
}
