//! Static PNG rendering of a canopy raster with the city boundary.

use crate::Result;
use canopy_census::Boundary;
use canopy_raster::CanopyRaster;
use geo::{Coord, LineString};
use image::{Rgb, RgbImage};
use std::path::Path;

/// ColorBrewer Greens, nine steps from 0% to 100% canopy.
const GREENS_9: [[u8; 3]; 9] = [
    [0xf7, 0xfc, 0xf5],
    [0xe5, 0xf5, 0xe0],
    [0xc7, 0xe9, 0xc0],
    [0xa1, 0xd9, 0x9b],
    [0x74, 0xc4, 0x76],
    [0x41, 0xab, 0x5d],
    [0x23, 0x8b, 0x45],
    [0x00, 0x6d, 0x2c],
    [0x00, 0x44, 0x1b],
];

const MISSING: Rgb<u8> = Rgb([255, 255, 255]);
const BOUNDARY: Rgb<u8> = Rgb([220, 0, 0]);

/// Longest image side the upscaling aims for.
const TARGET_SIZE: u32 = 1000;

/// Largest integer upscale applied to a small raster.
const MAX_UPSCALE: u32 = 16;

/// Color of a canopy percentage on the Greens ramp; `NaN` renders white.
pub fn greens(value: f32) -> Rgb<u8> {
    if value.is_nan() {
        return MISSING;
    }
    let t = (value.clamp(0.0, 100.0) / 100.0) * (GREENS_9.len() - 1) as f32;
    let lower = t.floor() as usize;
    let upper = (lower + 1).min(GREENS_9.len() - 1);
    let frac = t - lower as f32;

    let mix = |i: usize| {
        let a = GREENS_9[lower][i] as f32;
        let b = GREENS_9[upper][i] as f32;
        (a + (b - a) * frac).round() as u8
    };
    Rgb([mix(0), mix(1), mix(2)])
}

/// Integer upscale bringing the longest side toward 1000 pixels, between 1
/// and 16.
pub fn upscale_factor(width: u32, height: u32) -> u32 {
    (TARGET_SIZE / width.max(height).max(1)).clamp(1, MAX_UPSCALE)
}

/// Render `raster` with the outline of `boundary` drawn on top.
///
/// Small rasters are upscaled by [`upscale_factor`] so the outline stays legible.
pub fn render(raster: &CanopyRaster, boundary: &Boundary) -> RgbImage {
    let (width, height) = raster.dimensions();
    let factor = upscale_factor(width, height);
    let (img_w, img_h) = (width * factor, height * factor);

    let data = raster.data();
    let mut image = RgbImage::from_fn(img_w, img_h, |x, y| {
        let (col, row) = (x / factor, y / factor);
        greens(data[row as usize * width as usize + col as usize])
    });

    let bounds = raster.bounds();
    let to_pixel = |c: Coord<f64>| -> (i64, i64) {
        let px = (c.x - bounds.min_lon) / (bounds.max_lon - bounds.min_lon) * img_w as f64;
        let py = (bounds.max_lat - c.y) / (bounds.max_lat - bounds.min_lat) * img_h as f64;
        (px.floor() as i64, py.floor() as i64)
    };

    for polygon in &boundary.geometry {
        let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
        for ring in rings {
            draw_ring(&mut image, ring, &to_pixel);
        }
    }

    image
}

/// Render and save as PNG.
pub fn write_static_map(raster: &CanopyRaster, boundary: &Boundary, path: &Path) -> Result<()> {
    render(raster, boundary).save(path)?;
    Ok(())
}

fn draw_ring(image: &mut RgbImage, ring: &LineString<f64>, to_pixel: &impl Fn(Coord<f64>) -> (i64, i64)) {
    for line in ring.lines() {
        let (x0, y0) = to_pixel(line.start);
        let (x1, y1) = to_pixel(line.end);
        draw_line(image, x0, y0, x1, y1);
    }
}

/// Bresenham line, two pixels wide.
fn draw_line(image: &mut RgbImage, mut x0: i64, mut y0: i64, x1: i64, y1: i64) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        plot(image, x0, y0);
        plot(image, x0 + 1, y0);
        plot(image, x0, y0 + 1);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn plot(image: &mut RgbImage, x: i64, y: i64) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, BOUNDARY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_raster::RasterBounds;
    use geo::{polygon, MultiPolygon};

    #[test]
    fn test_greens_ramp_ends() {
        assert_eq!(greens(0.0), Rgb([0xf7, 0xfc, 0xf5]));
        assert_eq!(greens(100.0), Rgb([0x00, 0x44, 0x1b]));
        assert_eq!(greens(f32::NAN), MISSING);
        // Darker with more canopy
        assert!(greens(80.0).0[1] < greens(20.0).0[1]);
    }

    #[test]
    fn test_render_draws_boundary() {
        let bounds = RasterBounds {
            min_lon: 0.0,
            min_lat: 0.0,
            max_lon: 1.0,
            max_lat: 1.0,
        };
        let raster = CanopyRaster::from_parts(2021, 10, 10, bounds, vec![50.0; 100]).unwrap();
        let square = polygon![
            (x: 0.25, y: 0.25),
            (x: 0.75, y: 0.25),
            (x: 0.75, y: 0.75),
            (x: 0.25, y: 0.75),
            (x: 0.25, y: 0.25),
        ];
        let boundary = Boundary {
            name: "Square".to_string(),
            state: "XX".to_string(),
            state_fips: "99".to_string(),
            geoid: "1".to_string(),
            geometry: MultiPolygon::new(vec![square]),
        };

        let image = render(&raster, &boundary);
        // 10 pixels upscaled by the 16x cap
        assert_eq!(image.dimensions(), (160, 160));
        // Left edge of the square at x = 0.25 * 160
        assert_eq!(*image.get_pixel(40, 80), BOUNDARY);
        // Interior keeps the canopy color
        assert_eq!(*image.get_pixel(80, 80), greens(50.0));
    }

    #[test]
    fn test_upscale_factor() {
        assert_eq!(upscale_factor(10, 10), 16);
        assert_eq!(upscale_factor(100, 40), 10);
        assert_eq!(upscale_factor(300, 200), 3);
        assert_eq!(upscale_factor(2500, 1200), 1);
        assert_eq!(upscale_factor(0, 0), 16);
    }
}
