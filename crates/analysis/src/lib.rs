//! # Greentrace Analysis
//!
//! The analysis pipeline for greentrace:
//!
//! - **indices**: NDVI and the generic normalized-difference index
//! - **zonal**: study-site rasterization and per-zone means
//! - **timeseries**: long/wide tables, date parsing, CSV export
//! - **plot**: seasonal line chart per vegetation community

pub mod indices;
mod maybe_rayon;
pub mod plot;
pub mod timeseries;
pub mod zonal;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::indices::{ndvi, normalized_difference, scene_ndvi};
    pub use crate::plot::render_chart;
    pub use crate::timeseries::{
        parse_acquisition_date, TimeSeries, WideTable, ZonalObservation,
    };
    pub use crate::zonal::{aggregate, rasterize_sites, zonal_mean};
    pub use greentrace_core::prelude::*;
}
