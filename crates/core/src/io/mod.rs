//! I/O for scene rasters and study-site vector files

mod geotiff;
mod sites_geojson;

pub use geotiff::{read_geotiff, read_scene, write_geotiff, write_scene};
pub use sites_geojson::read_sites;
