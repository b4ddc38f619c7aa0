//! Single-year canopy raster representation.

use crate::mask;
use crate::{RasterError, Result};
use geo::{BoundingRect, MultiPolygon, Rect};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

/// Nodata value used by the NLCD canopy product when the file carries no
/// `GDAL_NODATA` tag.
pub const NLCD_NODATA: f32 = 255.0;

/// Geographic bounds of a raster, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterBounds {
    /// Western edge.
    pub min_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl RasterBounds {
    /// Check if a coordinate is within the bounds.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Bounding box of a geometry, or `None` for an empty geometry.
    pub fn of(geometry: &MultiPolygon<f64>) -> Option<Self> {
        geometry.bounding_rect().map(Self::from)
    }

    /// Longitude and latitude of the center.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Grow the bounds by `margin` degrees on every side.
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            min_lon: self.min_lon - margin,
            min_lat: self.min_lat - margin,
            max_lon: self.max_lon + margin,
            max_lat: self.max_lat + margin,
        }
    }
}

impl From<Rect<f64>> for RasterBounds {
    fn from(rect: Rect<f64>) -> Self {
        Self {
            min_lon: rect.min().x,
            min_lat: rect.min().y,
            max_lon: rect.max().x,
            max_lat: rect.max().y,
        }
    }
}

/// Canopy cover percentages for one NLCD year.
///
/// Values are stored in row-major order (north to south, west to east).
/// Every value is either a percentage in `0..=100` or `NaN` for missing data.
#[derive(Debug, Clone)]
pub struct CanopyRaster {
    /// NLCD year of the layer.
    year: u16,
    /// Pixel values, `NaN` where missing.
    data: Vec<f32>,
    /// Width in pixels.
    width: u32,
    /// Height in pixels.
    height: u32,
    /// Outer edges of the pixel grid.
    bounds: RasterBounds,
}

impl CanopyRaster {
    /// Build a raster from an in-memory pixel buffer.
    ///
    /// Values outside `0..=100` are treated as missing. Both dimensions must
    /// be non-zero.
    pub fn from_parts(
        year: u16,
        width: u32,
        height: u32,
        bounds: RasterBounds,
        data: Vec<f32>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RasterError::EmptyRaster { width, height });
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(RasterError::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }

        let data = data.into_iter().map(|v| normalize(v, None)).collect();
        Ok(Self {
            year,
            data,
            width,
            height,
            bounds,
        })
    }

    /// Load a canopy raster from a GeoTIFF file.
    pub fn from_file<P: AsRef<Path>>(path: P, year: u16) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut decoder = Decoder::new(file)?;

        // City extents at 30 m stay well under this, but the defaults are too tight
        let mut limits = Limits::default();
        limits.decoding_buffer_size = 1024 * 1024 * 1024; // 1 GB
        limits.intermediate_buffer_size = 1024 * 1024 * 1024; // 1 GB
        limits.ifd_value_size = 1024 * 1024 * 1024;
        decoder = decoder.with_limits(limits);

        let (width, height) = decoder.dimensions()?;
        if width == 0 || height == 0 {
            return Err(RasterError::EmptyRaster { width, height });
        }
        let bounds = Self::read_geotransform(&mut decoder, path, width, height)?;
        let nodata = Self::read_nodata_value(&mut decoder);
        let raw = Self::decode_canopy_data(&mut decoder)?;

        let expected = width as usize * height as usize;
        if raw.len() != expected {
            return Err(RasterError::InvalidGeoTiff {
                path: path.to_path_buf(),
                reason: format!(
                    "expected a single band of {} pixels, found {} samples",
                    expected,
                    raw.len()
                ),
            });
        }

        let data = raw.into_iter().map(|v| normalize(v, Some(nodata))).collect();

        tracing::debug!(
            path = %path.display(),
            year,
            width,
            height,
            "loaded canopy raster"
        );

        Ok(Self {
            year,
            data,
            width,
            height,
            bounds,
        })
    }

    /// Read the geographic bounds from the GeoTIFF tiepoint and pixel scale tags.
    fn read_geotransform<R: std::io::Read + std::io::Seek>(
        decoder: &mut Decoder<R>,
        path: &Path,
        width: u32,
        height: u32,
    ) -> Result<RasterBounds> {
        let invalid = |reason: &str| RasterError::InvalidGeoTiff {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let tiepoint = decoder
            .get_tag_f64_vec(Tag::ModelTiepointTag)
            .map_err(|_| invalid("missing ModelTiepoint tag"))?;
        let scale = decoder
            .get_tag_f64_vec(Tag::ModelPixelScaleTag)
            .map_err(|_| invalid("missing ModelPixelScale tag"))?;

        if tiepoint.len() < 6 || scale.len() < 2 {
            return Err(invalid("truncated georeferencing tags"));
        }

        // Tiepoint format: [i, j, k, x, y, z], pixel (i, j) maps to (x, y)
        let scale_x = scale[0];
        let scale_y = scale[1].abs();
        if scale_x <= 0.0 || scale_y <= 0.0 {
            return Err(invalid("non-positive pixel scale"));
        }
        let min_lon = tiepoint[3] - tiepoint[0] * scale_x;
        let max_lat = tiepoint[4] + tiepoint[1] * scale_y;

        Ok(RasterBounds {
            min_lon,
            min_lat: max_lat - height as f64 * scale_y,
            max_lon: min_lon + width as f64 * scale_x,
            max_lat,
        })
    }

    /// Decode pixel values from the TIFF decoder.
    fn decode_canopy_data<R: std::io::Read + std::io::Seek>(
        decoder: &mut Decoder<R>,
    ) -> Result<Vec<f32>> {
        let result = decoder.read_image()?;

        match result {
            DecodingResult::U8(data) => Ok(data.into_iter().map(f32::from).collect()),
            DecodingResult::F32(data) => Ok(data),
            DecodingResult::F64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I8(data) => Ok(data.into_iter().map(f32::from).collect()),
            DecodingResult::I16(data) => Ok(data.into_iter().map(f32::from).collect()),
            DecodingResult::U16(data) => Ok(data.into_iter().map(f32::from).collect()),
            DecodingResult::I32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        }
    }

    /// Read the nodata value from the GDAL_NODATA tag, falling back to the NLCD default.
    fn read_nodata_value<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> f32 {
        decoder
            .get_tag_ascii_string(Tag::GdalNodata)
            .ok()
            .and_then(|s| s.trim().trim_end_matches('\0').parse().ok())
            .unwrap_or(NLCD_NODATA)
    }

    /// Write the raster as a single-band float GeoTIFF in EPSG:4326.
    ///
    /// Missing pixels are written as `NaN` and declared through `GDAL_NODATA`.
    pub fn write_geotiff<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
        let mut image = encoder.new_image::<colortype::Gray32Float>(self.width, self.height)?;

        let (scale_x, scale_y) = self.pixel_scale();
        let scale = [scale_x, scale_y, 0.0];
        let tiepoint = [0.0, 0.0, 0.0, self.bounds.min_lon, self.bounds.max_lat, 0.0];
        // Version 1.1.0, 3 keys: geographic model, pixel-is-area, WGS 84
        let geokeys: [u16; 16] = [1, 1, 0, 3, 1024, 0, 1, 2, 1025, 0, 1, 1, 2048, 0, 1, 4326];

        image
            .encoder()
            .write_tag(Tag::ModelPixelScaleTag, &scale[..])?;
        image
            .encoder()
            .write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
        image
            .encoder()
            .write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])?;
        image
            .encoder()
            .write_tag(Tag::GdalNodata, "nan")?;
        image.write_data(&self.data)?;

        Ok(())
    }

    /// Set every pixel whose center lies outside `geometry` to missing.
    pub fn mask_to(&mut self, geometry: &MultiPolygon<f64>) {
        let mut inside = vec![false; self.data.len()];
        for index in self.pixels_within(geometry) {
            inside[index] = true;
        }
        for (value, keep) in self.data.iter_mut().zip(inside) {
            if !keep {
                *value = f32::NAN;
            }
        }
    }

    /// Flat indices of the pixels whose centers lie inside `geometry`.
    ///
    /// Pixels outside the raster never appear, so a geometry entirely outside
    /// the coverage yields an empty list.
    pub fn pixels_within(&self, geometry: &MultiPolygon<f64>) -> Vec<usize> {
        let (scale_x, scale_y) = self.pixel_scale();
        let grid = mask::Grid {
            origin_lon: self.bounds.min_lon,
            origin_lat: self.bounds.max_lat,
            scale_x,
            scale_y,
            width: self.width,
            height: self.height,
        };

        let mut indices = Vec::new();
        mask::for_each_pixel_within(&grid, geometry, |row, col| {
            indices.push(row as usize * self.width as usize + col as usize);
        });
        indices
    }

    /// Valid (non-missing) values of the pixels whose centers lie inside `geometry`.
    pub fn values_within(&self, geometry: &MultiPolygon<f64>) -> Vec<f64> {
        self.pixels_within(geometry)
            .into_iter()
            .map(|i| self.data[i])
            .filter(|v| !v.is_nan())
            .map(f64::from)
            .collect()
    }

    /// Value at a pixel, `None` when missing or out of range.
    pub fn value(&self, row: u32, col: u32) -> Option<f32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        let v = self.data[row as usize * self.width as usize + col as usize];
        (!v.is_nan()).then_some(v)
    }

    /// Value at a geographic coordinate (nearest pixel), `None` when missing or outside.
    pub fn value_at(&self, lat: f64, lon: f64) -> Option<f32> {
        if !self.bounds.contains(lat, lon) {
            return None;
        }
        let (scale_x, scale_y) = self.pixel_scale();
        let col = (((lon - self.bounds.min_lon) / scale_x).floor() as u32).min(self.width - 1);
        let row = (((self.bounds.max_lat - lat) / scale_y).floor() as u32).min(self.height - 1);
        self.value(row, col)
    }

    /// Longitude and latitude of a pixel center.
    pub fn pixel_center(&self, row: u32, col: u32) -> (f64, f64) {
        let (scale_x, scale_y) = self.pixel_scale();
        (
            self.bounds.min_lon + (col as f64 + 0.5) * scale_x,
            self.bounds.max_lat - (row as f64 + 0.5) * scale_y,
        )
    }

    /// Raw pixel values in row-major order, `NaN` where missing.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of non-missing pixels.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// NLCD year of this layer.
    pub fn year(&self) -> u16 {
        self.year
    }

    /// Get the geographic bounds of this raster.
    pub fn bounds(&self) -> RasterBounds {
        self.bounds
    }

    /// Get the dimensions of this raster in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get the resolution in degrees per pixel (longitude, latitude).
    pub fn pixel_scale(&self) -> (f64, f64) {
        let lat_range = self.bounds.max_lat - self.bounds.min_lat;
        let lon_range = self.bounds.max_lon - self.bounds.min_lon;
        (lon_range / self.width as f64, lat_range / self.height as f64)
    }

    /// Get the approximate resolution in meters at the center of the raster.
    pub fn resolution_meters(&self) -> (f64, f64) {
        let (lon_deg, lat_deg) = self.pixel_scale();
        let (_, center_lat) = self.bounds.center();

        // At the equator, 1 degree ≈ 111,320 meters
        // Longitude shrinks by cos(latitude)
        let meters_per_deg_lat = 111_320.0;
        let meters_per_deg_lon = 111_320.0 * center_lat.to_radians().cos();

        (lon_deg * meters_per_deg_lon, lat_deg * meters_per_deg_lat)
    }
}

/// Map a stored sample to a canopy percentage or `NaN`.
fn normalize(value: f32, nodata: Option<f32>) -> f32 {
    if let Some(nodata) = nodata {
        if (value - nodata).abs() < 0.001 {
            return f32::NAN;
        }
    }
    if (0.0..=100.0).contains(&value) {
        value
    } else {
        f32::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn unit_bounds() -> RasterBounds {
        RasterBounds {
            min_lon: 0.0,
            min_lat: 0.0,
            max_lon: 4.0,
            max_lat: 4.0,
        }
    }

    fn sample_raster() -> CanopyRaster {
        let data = (0..16).map(|v| v as f32 * 5.0).collect();
        CanopyRaster::from_parts(2016, 4, 4, unit_bounds(), data).unwrap()
    }

    #[test]
    fn test_bounds_contains() {
        let bounds = RasterBounds {
            min_lon: -123.0,
            min_lat: 47.0,
            max_lon: -122.0,
            max_lat: 48.0,
        };

        assert!(bounds.contains(47.5, -122.5));
        assert!(bounds.contains(47.0, -123.0)); // Corner
        assert!(bounds.contains(48.0, -122.0)); // Corner
        assert!(!bounds.contains(46.5, -122.5)); // Too far south
        assert!(!bounds.contains(48.5, -122.5)); // Too far north
        assert!(!bounds.contains(47.5, -121.5)); // Too far east
        assert!(!bounds.contains(47.5, -123.5)); // Too far west
    }

    #[test]
    fn test_normalize_nodata_and_range() {
        assert_eq!(normalize(42.0, Some(255.0)), 42.0);
        assert!(normalize(255.0, Some(255.0)).is_nan());
        assert!(normalize(254.0, Some(255.0)).is_nan());
        assert!(normalize(-1.0, None).is_nan());
        assert_eq!(normalize(0.0, None), 0.0);
        assert_eq!(normalize(100.0, None), 100.0);
    }

    #[test]
    fn test_from_parts_rejects_wrong_length() {
        let err = CanopyRaster::from_parts(2016, 4, 4, unit_bounds(), vec![0.0; 15]).unwrap_err();
        assert!(matches!(
            err,
            RasterError::DimensionMismatch {
                expected: 16,
                actual: 15
            }
        ));
    }

    #[test]
    fn test_from_parts_rejects_empty_grid() {
        for (width, height) in [(0, 0), (0, 4), (4, 0)] {
            let err = CanopyRaster::from_parts(2016, width, height, unit_bounds(), Vec::new())
                .unwrap_err();
            assert!(matches!(err, RasterError::EmptyRaster { .. }));
        }
    }

    #[test]
    fn test_pixel_center_and_value_at() {
        let raster = sample_raster();
        assert_eq!(raster.pixel_center(0, 0), (0.5, 3.5));
        assert_eq!(raster.pixel_center(3, 3), (3.5, 0.5));

        // Row 0 is the northern edge
        assert_eq!(raster.value_at(3.9, 0.1), Some(0.0));
        assert_eq!(raster.value_at(0.1, 3.9), Some(75.0));
        assert_eq!(raster.value_at(5.0, 1.0), None);
    }

    #[test]
    fn test_mask_to_clears_outside_pixels() {
        let mut raster = sample_raster();
        // Western half of the grid
        let west: MultiPolygon<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 4.0),
            (x: 0.0, y: 4.0),
        ]
        .into();

        raster.mask_to(&west);

        assert_eq!(raster.valid_count(), 8);
        assert_eq!(raster.value(0, 1), Some(5.0));
        assert_eq!(raster.value(0, 2), None);
        assert_eq!(raster.value(3, 0), Some(60.0));
    }

    #[test]
    fn test_values_within_outside_coverage_is_empty() {
        let raster = sample_raster();
        let far: MultiPolygon<f64> = polygon![
            (x: 10.0, y: 10.0),
            (x: 11.0, y: 10.0),
            (x: 11.0, y: 11.0),
        ]
        .into();
        assert!(raster.values_within(&far).is_empty());
    }

    #[test]
    fn test_resolution_meters_near_equator() {
        let raster = CanopyRaster::from_parts(
            2016,
            2,
            2,
            RasterBounds {
                min_lon: 0.0,
                min_lat: -0.001,
                max_lon: 0.002,
                max_lat: 0.001,
            },
            vec![0.0; 4],
        )
        .unwrap();
        let (x_m, y_m) = raster.resolution_meters();
        approx::assert_relative_eq!(x_m, 111.32, epsilon = 0.01);
        approx::assert_relative_eq!(y_m, 111.32, epsilon = 0.01);
    }
}
