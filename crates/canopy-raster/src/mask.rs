//! Scanline rasterization of polygons onto a north-up pixel grid.
//!
//! A pixel belongs to a polygon when its center is inside by the even-odd
//! rule. Each ring edge is half-open in latitude, so a scanline passing
//! exactly through a vertex is counted once.

use geo::{BoundingRect, LineString, MultiPolygon};

/// Pixel grid description, origin at the north-west corner.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Grid {
    pub origin_lon: f64,
    pub origin_lat: f64,
    /// Degrees of longitude per pixel.
    pub scale_x: f64,
    /// Degrees of latitude per pixel (positive, rows run southward).
    pub scale_y: f64,
    pub width: u32,
    pub height: u32,
}

impl Grid {
    fn row_center(&self, row: i64) -> f64 {
        self.origin_lat - (row as f64 + 0.5) * self.scale_y
    }
}

/// Call `f(row, col)` for every pixel whose center lies inside `geometry`.
pub(crate) fn for_each_pixel_within<F>(grid: &Grid, geometry: &MultiPolygon<f64>, mut f: F)
where
    F: FnMut(u32, u32),
{
    let Some(rect) = geometry.bounding_rect() else {
        return;
    };
    if grid.width == 0 || grid.height == 0 {
        return;
    }

    let max_row = grid.height as i64 - 1;
    let max_col = grid.width as i64 - 1;

    // Rows whose center latitude falls within the geometry's extent
    let first_row = ((grid.origin_lat - rect.max().y) / grid.scale_y - 0.5).ceil() as i64;
    let last_row = ((grid.origin_lat - rect.min().y) / grid.scale_y - 0.5).floor() as i64;
    let first_row = first_row.max(0);
    let last_row = last_row.min(max_row);

    let mut crossings = Vec::new();
    for row in first_row..=last_row {
        let lat = grid.row_center(row);

        crossings.clear();
        for polygon in geometry {
            ring_crossings(polygon.exterior(), lat, &mut crossings);
            for interior in polygon.interiors() {
                ring_crossings(interior, lat, &mut crossings);
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            // Columns whose center longitude lies in [span[0], span[1])
            let start = ((span[0] - grid.origin_lon) / grid.scale_x - 0.5).ceil() as i64;
            let end = ((span[1] - grid.origin_lon) / grid.scale_x - 0.5).ceil() as i64;
            let start = start.max(0);
            let end = end.min(max_col + 1);
            for col in start..end {
                f(row as u32, col as u32);
            }
        }
    }
}

/// Append the longitudes where `ring` crosses the parallel at `lat`.
fn ring_crossings(ring: &LineString<f64>, lat: f64, out: &mut Vec<f64>) {
    for line in ring.lines() {
        let (a, b) = (line.start, line.end);
        if (a.y <= lat && b.y > lat) || (b.y <= lat && a.y > lat) {
            out.push(a.x + (lat - a.y) * (b.x - a.x) / (b.y - a.y));
        }
    }
}
