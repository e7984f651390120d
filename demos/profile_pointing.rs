use env_logger::Builder;
use heliocube::coords::Header;
use heliocube::{CubeConfig, MemoryContainer, PhysicalCube, SliceEntry};
use log::info;
use ndarray::{Array, Array1, IxDyn};
use std::sync::Arc;

const DEPTH: usize = 8;
const ROWS: usize = 50;
const COLS: usize = 80;

fn main() -> heliocube::Result<()> {
    Builder::new().filter_level(log::LevelFilter::Info).init();

    let header = Header::new()
        .with("dimensions", serde_json::json!([DEPTH, ROWS, COLS]))
        .with("crpix", serde_json::json!([4.0, 25.0, 40.0]))
        .with("crval", serde_json::json!([0.0, -340.0, 120.0]))
        .with("pixel_scale", 0.059)
        .with("date_obs", "2014-09-06")
        .with("time_obs", "16:50:33.500");

    // Synthetic atmosphere: density falls off with height, hotter to the east.
    let z: Array1<f64> = Array1::linspace(0.5, 4.0, DEPTH);
    let ne = Array::from_shape_fn(IxDyn(&[DEPTH, ROWS, COLS]), |ix| {
        1e11 * (-z[ix[0]]).exp() * (1.0 + ix[2] as f64 / COLS as f64)
    });
    let container = MemoryContainer::new()
        .with("ne", ne)
        .with("z", z.into_dyn());

    let cube = PhysicalCube::open(Arc::new(container), header, &CubeConfig::default())?;
    println!("{}\n", cube);

    let (x, y) = cube.to_lonlat(0, 0)?;
    info!("lower-left corner at ({:.2}\", {:.2}\")", x, y);

    // A single-pixel depth profile keeps answering sky queries in the full grid.
    let profile = cube.slice(&[SliceEntry::full(), SliceEntry::Point(20), SliceEntry::Point(60)])?;
    let (x, y) = profile.to_lonlat(20, 60)?;
    println!("profile at ({:.2}\", {:.2}\"):", x, y);
    for (height, density) in profile.z()?.iter().zip(profile.ne()?.iter()) {
        println!("  z = {:4.2} Mm  ne = {:.3e} cm^-3", height, density);
    }

    let (row, col) = cube.from_world(x, y)?;
    info!("back to index ({}, {})", row, col);
    Ok(())
}
