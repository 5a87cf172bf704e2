use crate::{nearness, TileCenter, TileId, VOID_TILE};

use itertools::iproduct;
use orbis_core::geometry::Uv;
use orbis_core::glam::DVec3;
use smallvec::SmallVec;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Slack for floating point error when comparing an angular lower bound against the best candidate's distance.
const BOUND_EPSILON: f64 = 1e-9;

/// An exact nearest-tile index over the equirectangular projection.
///
/// Projection space is partitioned into `columns x rows` buckets. Each tile is inserted into the bucket containing its
/// center and the 8 buckets around it, so a query that scans a square ring of buckets has actually seen every tile
/// centered one bucket further out.
///
/// A query scans rings of increasing radius around its own bucket until an admissible lower bound on the angular
/// distance to any tile it has not seen exceeds the distance of its best candidate. Latitude gaps bound that distance
/// directly. Longitude gaps only bound it by `asin(cos(lat) * sin(gap))`, which goes to zero at the poles; this is
/// what widens the search near the poles, where equirectangular distortion squeezes many buckets into a small solid
/// angle.
pub struct BucketGrid {
    columns: u32,
    rows: u32,
    centers: Vec<TileCenter>,
    /// Indices into `centers`, per bucket.
    buckets: Vec<SmallVec<[u32; 12]>>,
}

impl BucketGrid {
    /// Picks a bucket resolution with roughly one tile center per bucket and 2:1 aspect, like the projection itself.
    pub fn new(centers: Vec<TileCenter>) -> Self {
        let rows = ((centers.len() as f64 / 2.0).sqrt().ceil() as u32).max(1);
        Self::with_shape(centers, 2 * rows, rows)
    }

    pub fn with_shape(centers: Vec<TileCenter>, columns: u32, rows: u32) -> Self {
        assert!(columns > 0 && rows > 0);

        let mut buckets: Vec<SmallVec<[u32; 12]>> =
            vec![SmallVec::new(); (columns * rows) as usize];
        for (i, center) in centers.iter().enumerate() {
            let (c, r) = Uv::from_direction(center.direction).to_pixel(columns, rows);
            for (dr, dc) in iproduct!(-1i64..=1, -1i64..=1) {
                let row = r as i64 + dr;
                if row < 0 || row >= rows as i64 {
                    continue;
                }
                let column = (c as i64 + dc).rem_euclid(columns as i64);
                let bucket = &mut buckets[(row * columns as i64 + column) as usize];
                // Very narrow grids wrap a neighbor back onto the same column.
                if !bucket.contains(&(i as u32)) {
                    bucket.push(i as u32);
                }
            }
        }

        Self {
            columns,
            rows,
            centers,
            buckets,
        }
    }

    pub fn shape(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    pub fn num_tiles(&self) -> usize {
        self.centers.len()
    }

    /// The tile nearest to `direction` (a unit vector), with ties broken by lower id. Agrees exactly with a brute force
    /// scan over the same centers.
    pub fn nearest(&self, direction: DVec3) -> TileId {
        if self.centers.is_empty() {
            return VOID_TILE;
        }

        let uv = Uv::from_direction(direction);
        let (c, r) = uv.to_pixel(self.columns, self.rows);
        let (c, r) = (c as i64, r as i64);
        let (columns, rows) = (self.columns as i64, self.rows as i64);
        let cos_lat = uv.latitude().cos().max(0.0);

        let mut best: Option<(f64, TileId)> = None;
        for k in 0.. {
            let (lo, hi) = self.column_span(k);
            let (prev_lo, prev_hi) = if k > 0 { self.column_span(k - 1) } else { (1, 0) };
            for dr in -k..=k {
                let row = r + dr;
                if row < 0 || row >= rows {
                    continue;
                }
                for dc in lo..=hi {
                    let inside_previous = dr.abs() < k && dc >= prev_lo && dc <= prev_hi;
                    if inside_previous {
                        continue;
                    }
                    let column = (c + dc).rem_euclid(columns);
                    for &i in self.buckets[(row * columns + column) as usize].iter() {
                        let center = &self.centers[i as usize];
                        let dot = center.direction.dot(direction);
                        let is_better = match best {
                            None => true,
                            Some((best_dot, best_id)) => {
                                nearness(dot, center.id) > nearness(best_dot, best_id)
                            }
                        };
                        if is_better {
                            best = Some((dot, center.id));
                        }
                    }
                }
            }

            // Every tile whose own bucket is within `covered` rows and within the widened column span has been seen.
            let covered = k + 1;
            let rows_done = r - covered <= 0 && r + covered >= rows - 1;
            let columns_done = (hi + 1) - (lo - 1) + 1 >= columns;
            if rows_done && columns_done {
                break;
            }

            if let Some((best_dot, _)) = best {
                let best_angle = best_dot.clamp(-1.0, 1.0).acos();

                let mut bound = f64::INFINITY;
                if !rows_done {
                    if r - covered > 0 {
                        let north_edge = (r - covered) as f64 / rows as f64;
                        bound = bound.min((uv.v - north_edge) * PI);
                    }
                    if r + covered < rows - 1 {
                        let south_edge = (r + covered + 1) as f64 / rows as f64;
                        bound = bound.min((south_edge - uv.v) * PI);
                    }
                }
                if !columns_done {
                    let east_edge = (c + hi + 2) as f64 / columns as f64;
                    let west_edge = (c + lo - 1) as f64 / columns as f64;
                    let gap = (east_edge - uv.u).min(uv.u - west_edge).max(0.0) * TAU;
                    bound = bound.min((cos_lat * gap.min(FRAC_PI_2).sin()).asin());
                }

                if bound > best_angle + BOUND_EPSILON {
                    break;
                }
            }
        }

        best.map_or(VOID_TILE, |(_, id)| id)
    }

    /// Column offsets scanned by ring `k`, limited so no column is visited twice after wrapping.
    fn column_span(&self, k: i64) -> (i64, i64) {
        let columns = self.columns as i64;
        (-k.min((columns - 1) / 2), k.min(columns / 2))
    }
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
    use crate::{nearest_by_scan, TileSet};

    fn assert_matches_scan(set: &TileSet, grid: &BucketGrid, samples_per_axis: u32) {
        for y in 0..samples_per_axis {
            for x in 0..2 * samples_per_axis {
                let uv = Uv::pixel_center(x, y, 2 * samples_per_axis, samples_per_axis);
                let d = uv.to_direction();
                assert_eq!(
                    grid.nearest(d),
                    nearest_by_scan(set.centers(), d),
                    "mismatch at pixel ({}, {})",
                    x,
                    y
                );
            }
        }
    }

    #[test]
    fn icosahedron_matches_scan() {
        let set = TileSet::icosahedron();
        let grid = BucketGrid::new(set.centers().to_vec());
        assert_eq!(grid.shape(), (6, 3));
        assert_matches_scan(&set, &grid, 40);
    }

    #[test]
    fn fibonacci_matches_scan() {
        let set = TileSet::fibonacci(500);
        let grid = BucketGrid::new(set.centers().to_vec());
        assert_matches_scan(&set, &grid, 64);
    }

    #[test]
    fn fine_buckets_still_find_polar_tiles() {
        // Far more buckets than tiles, so polar queries must widen across many columns.
        let set = TileSet::fibonacci(30);
        let grid = BucketGrid::with_shape(set.centers().to_vec(), 64, 32);
        assert_matches_scan(&set, &grid, 48);
        assert_eq!(grid.nearest(DVec3::Y), set.centers()[0].id);
    }

    #[test]
    fn single_column_grid() {
        let set = TileSet::fibonacci(10);
        let grid = BucketGrid::with_shape(set.centers().to_vec(), 1, 1);
        assert_matches_scan(&set, &grid, 8);
    }

    #[test]
    fn empty_grid_is_void() {
        let grid = BucketGrid::new(Vec::new());
        assert_eq!(grid.nearest(DVec3::Z), VOID_TILE);
    }
}
