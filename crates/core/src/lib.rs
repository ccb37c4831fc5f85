//! # Greentrace Core
//!
//! Core types and I/O for the greentrace NDVI time-series tool.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `CRS`: Coordinate Reference System handling
//! - `Scene`: One multi-band acquisition tagged with a calendar date
//! - `Site` / `SiteCollection`: Named study-site polygons
//! - I/O for multi-band GeoTIFF scenes and GeoJSON site files

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod scene;
pub mod sites;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use scene::{Scene, SpectralBand};
pub use sites::{Site, SiteCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::scene::{Scene, SpectralBand};
    pub use crate::sites::{Site, SiteCollection};
}
