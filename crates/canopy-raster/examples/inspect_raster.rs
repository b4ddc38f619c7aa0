//! Example: Inspect a canopy GeoTIFF.
//!
//! Usage: cargo run --example inspect_raster -- <file.tif> <year> [lat lon]

use canopy_raster::CanopyRaster;
use std::env;
use std::time::Instant;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <file.tif> <year> [lat lon]", args[0]);
        eprintln!("Example: {} .canopy_cache/nlcd/canopy_2021_0a1b2c3d4e5f6071.tif 2021 45.52 -122.68", args[0]);
        std::process::exit(1);
    }

    let path = &args[1];
    let year: u16 = args[2].parse().expect("Invalid year");

    let start = Instant::now();
    let raster = match CanopyRaster::from_file(path, year) {
        Ok(raster) => raster,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    println!("Loaded {} in {:.3}s", path, start.elapsed().as_secs_f64());

    let (width, height) = raster.dimensions();
    let bounds = raster.bounds();
    let (x_m, y_m) = raster.resolution_meters();
    println!("Size: {}x{} pixels ({:.1} x {:.1} m)", width, height, x_m, y_m);
    println!(
        "Coverage: lat {:.4}° to {:.4}°, lon {:.4}° to {:.4}°",
        bounds.min_lat, bounds.max_lat, bounds.min_lon, bounds.max_lon
    );

    let valid: Vec<f64> = raster
        .data()
        .iter()
        .filter(|v| !v.is_nan())
        .map(|&v| f64::from(v))
        .collect();
    if valid.is_empty() {
        println!("No valid pixels");
    } else {
        let mean = valid.iter().sum::<f64>() / valid.len() as f64;
        println!("Valid pixels: {} (mean canopy {:.2}%)", valid.len(), mean);
    }

    if let (Some(lat), Some(lon)) = (args.get(3), args.get(4)) {
        let lat: f64 = lat.parse().expect("Invalid latitude");
        let lon: f64 = lon.parse().expect("Invalid longitude");
        match raster.value_at(lat, lon) {
            Some(v) => println!("Canopy at ({}, {}): {:.0}%", lat, lon, v),
            None => println!("No canopy data at ({}, {})", lat, lon),
        }
    }
}
