//! Multi-band scene model
//!
//! A `Scene` is one satellite acquisition: six co-registered spectral bands
//! sharing a single grid, tagged with the acquisition date.

use crate::error::{Error, Result};
use crate::raster::Raster;
use crate::{GeoTransform, CRS};
use chrono::NaiveDate;

/// Spectral bands of a scene, in canonical file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectralBand {
    Blue,
    Green,
    Red,
    /// Near-infrared
    Nir,
    /// Shortwave infrared, band 1
    Swir1,
    /// Shortwave infrared, band 2
    Swir2,
}

impl SpectralBand {
    /// All bands in canonical order (matches the band order of scene files)
    pub const ALL: [SpectralBand; 6] = [
        SpectralBand::Blue,
        SpectralBand::Green,
        SpectralBand::Red,
        SpectralBand::Nir,
        SpectralBand::Swir1,
        SpectralBand::Swir2,
    ];

    /// Index of this band within a scene file
    pub fn index(self) -> usize {
        match self {
            SpectralBand::Blue => 0,
            SpectralBand::Green => 1,
            SpectralBand::Red => 2,
            SpectralBand::Nir => 3,
            SpectralBand::Swir1 => 4,
            SpectralBand::Swir2 => 5,
        }
    }

    /// Human-readable band name
    pub fn name(self) -> &'static str {
        match self {
            SpectralBand::Blue => "blue",
            SpectralBand::Green => "green",
            SpectralBand::Red => "red",
            SpectralBand::Nir => "nir",
            SpectralBand::Swir1 => "swir1",
            SpectralBand::Swir2 => "swir2",
        }
    }
}

/// One multi-band raster capture at a single acquisition date.
///
/// Invariant: all bands share identical shape, geotransform and CRS.
/// Construction fails otherwise; the bands are immutable afterwards except
/// for the no-data marker.
#[derive(Debug, Clone)]
pub struct Scene {
    bands: Vec<Raster<f64>>,
    date: NaiveDate,
}

impl Scene {
    /// Number of bands every scene carries
    pub const BAND_COUNT: usize = 6;

    /// Build a scene from bands in canonical order.
    ///
    /// Fails with `BandCount` when not exactly six bands are given, with
    /// `SizeMismatch`/`TransformMismatch`/`CrsMismatch` when the bands do
    /// not share one grid.
    pub fn new(bands: Vec<Raster<f64>>, date: NaiveDate) -> Result<Self> {
        if bands.len() != Self::BAND_COUNT {
            return Err(Error::BandCount {
                expected: Self::BAND_COUNT,
                actual: bands.len(),
            });
        }

        let first = &bands[0];
        for band in &bands[1..] {
            if band.shape() != first.shape() {
                return Err(Error::SizeMismatch {
                    er: first.rows(),
                    ec: first.cols(),
                    ar: band.rows(),
                    ac: band.cols(),
                });
            }
            if band.transform() != first.transform() {
                return Err(Error::TransformMismatch);
            }
        }

        // Every tagged band must agree with the first tagged one; untagged
        // bands are allowed anywhere, including band 0.
        let mut shared_crs: Option<&CRS> = None;
        for band in &bands {
            if let Some(crs) = band.crs() {
                match shared_crs {
                    None => shared_crs = Some(crs),
                    Some(existing) if !existing.is_equivalent(crs) => {
                        return Err(Error::CrsMismatch(
                            existing.identifier(),
                            crs.identifier(),
                        ));
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(Self { bands, date })
    }

    /// Acquisition date
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Access one band
    pub fn band(&self, band: SpectralBand) -> &Raster<f64> {
        &self.bands[band.index()]
    }

    /// All bands in canonical order
    pub fn bands(&self) -> &[Raster<f64>] {
        &self.bands
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.bands[0].shape()
    }

    /// Shared geotransform
    pub fn transform(&self) -> &GeoTransform {
        self.bands[0].transform()
    }

    /// Shared CRS, if any band carries one
    pub fn crs(&self) -> Option<&CRS> {
        self.bands.iter().find_map(|b| b.crs())
    }

    /// Set the sensor no-data marker on every band
    pub fn set_nodata(&mut self, nodata: Option<f64>) {
        for band in &mut self.bands {
            band.set_nodata(nodata);
        }
    }
}
