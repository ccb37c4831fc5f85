//! Spectral vegetation indices
//!
//! NDVI and the generic normalized difference it is built on. Inputs are
//! single-band rasters; outputs carry the input's georeferencing and use NaN
//! as the no-data sentinel.

use crate::maybe_rayon::*;
use greentrace_core::raster::Raster;
use greentrace_core::scene::{Scene, SpectralBand};
use greentrace_core::{Error, Result};
use ndarray::Array2;

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1] for non-negative inputs. The no-data
/// policy is a NaN sentinel, applied consistently: a cell is NaN in the
/// output when either input cell is no-data (or NaN), and when the
/// denominator is zero. Inputs are never modified.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };

                if band_a.is_nodata(a) || band_b.is_nodata(b) {
                    continue;
                }

                let sum = a + b;
                if sum.abs() < 1e-10 {
                    continue; // Zero denominator stays no-data
                }

                row_data[col] = (a - b) / sum;
            }
            row_data
        })
        .collect();

    build_output(band_a, rows, cols, data)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Values range from -1 to 1:
/// - Dense vegetation: 0.6 to 0.9
/// - Sparse vegetation: 0.2 to 0.5
/// - Bare soil: 0.1 to 0.2
/// - Water/clouds: -1.0 to 0.0
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// NDVI for a whole scene, selecting its NIR and red bands
pub fn scene_ndvi(scene: &Scene) -> Result<Raster<f64>> {
    ndvi(scene.band(SpectralBand::Nir), scene.band(SpectralBand::Red))
}

fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

fn build_output(
    template: &Raster<f64>,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
) -> Result<Raster<f64>> {
    let mut output = template.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use greentrace_core::GeoTransform;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    fn make_gradient(rows: usize, cols: usize, start: f64, step: f64) -> Raster<f64> {
        let mut r = Raster::new(rows, cols);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        for row in 0..rows {
            for col in 0..cols {
                r.set(row, col, start + (row * cols + col) as f64 * step)
                    .unwrap();
            }
        }
        r
    }

    #[test]
    fn test_ndvi_formula() {
        let nir = make_band(5, 5, 0.5);
        let red = make_band(5, 5, 0.1);

        let result = ndvi(&nir, &red).unwrap();
        let val = result.get(2, 2).unwrap();

        // (0.5 - 0.1) / (0.5 + 0.1) = 0.4/0.6
        let expected = (0.5 - 0.1) / (0.5 + 0.1);
        assert!(
            (val - expected).abs() < 1e-10,
            "Expected {}, got {}",
            expected,
            val
        );
    }

    #[test]
    fn test_ndvi_range_for_nonnegative_bands() {
        let nir = make_gradient(10, 10, 0.1, 0.01);
        let red = make_gradient(10, 10, 0.5, -0.004);

        let result = ndvi(&nir, &red).unwrap();

        for row in 0..10 {
            for col in 0..10 {
                let val = result.get(row, col).unwrap();
                if !val.is_nan() {
                    assert!(
                        (-1.0..=1.0).contains(&val),
                        "NDVI out of range: {} at ({}, {})",
                        val,
                        row,
                        col
                    );
                }
            }
        }
    }

    #[test]
    fn test_ndvi_water_is_negative() {
        // Water: Red > NIR
        let nir = make_band(5, 5, 0.05);
        let red = make_band(5, 5, 0.15);

        let result = ndvi(&nir, &red).unwrap();
        let val = result.get(2, 2).unwrap();

        assert!(val < 0.0, "Water should have negative NDVI, got {}", val);
    }

    #[test]
    fn test_inputs_unmodified_and_idempotent() {
        let nir = make_gradient(4, 4, 0.2, 0.01);
        let red = make_gradient(4, 4, 0.1, 0.005);
        let nir_before = nir.clone();
        let red_before = red.clone();

        let first = ndvi(&nir, &red).unwrap();
        let second = ndvi(&nir, &red).unwrap();

        assert_eq!(nir.data(), nir_before.data());
        assert_eq!(red.data(), red_before.data());
        assert_eq!(first.data(), second.data());
    }

    #[test]
    fn test_nodata_propagates_from_either_input() {
        let mut nir = make_band(5, 5, 0.5);
        nir.set_nodata(Some(-9999.0));
        nir.set(2, 2, -9999.0).unwrap();

        let mut red = make_band(5, 5, 0.1);
        red.set(0, 0, f64::NAN).unwrap();

        let result = ndvi(&nir, &red).unwrap();

        assert!(result.get(2, 2).unwrap().is_nan(), "nir nodata must propagate");
        assert!(result.get(0, 0).unwrap().is_nan(), "red NaN must propagate");
        assert!(!result.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_nodata_tolerance_matches_raster_policy() {
        // The marker comparison is the raster's own, so a value the raster
        // treats as no-data can never leak into the index.
        let nir = make_band(3, 3, 0.5);
        let mut red = make_band(3, 3, 0.2);
        red.set_nodata(Some(0.0));
        red.set(1, 1, 1e-14).unwrap();
        assert!(red.is_nodata(1e-14));

        let result = ndvi(&nir, &red).unwrap();
        assert!(result.get(1, 1).unwrap().is_nan());
        assert!(!result.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_zero_denominator_is_nodata() {
        let nir = make_band(3, 3, 0.0);
        let red = make_band(3, 3, 0.0);

        let result = normalized_difference(&nir, &red).unwrap();
        assert!(result.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = make_band(5, 5, 1.0);
        let b = make_band(5, 10, 1.0);

        let result = normalized_difference(&a, &b);
        assert!(matches!(result, Err(Error::SizeMismatch { .. })));
    }

    #[test]
    fn test_output_keeps_georeferencing() {
        let nir = make_band(4, 4, 0.6);
        let red = make_band(4, 4, 0.2);

        let result = ndvi(&nir, &red).unwrap();
        assert_eq!(result.transform(), nir.transform());
        assert!(result.nodata().is_some_and(f64::is_nan));
    }

    #[test]
    fn test_scene_ndvi_selects_bands() {
        let date = NaiveDate::from_ymd_opt(2018, 2, 2).unwrap();
        let mut bands: Vec<Raster<f64>> = (0..6).map(|_| make_band(3, 3, 0.9)).collect();
        bands[SpectralBand::Red.index()] = make_band(3, 3, 0.1);
        bands[SpectralBand::Nir.index()] = make_band(3, 3, 0.5);
        let scene = Scene::new(bands, date).unwrap();

        let result = scene_ndvi(&scene).unwrap();
        let expected = (0.5 - 0.1) / (0.5 + 0.1);
        assert!((result.get(1, 1).unwrap() - expected).abs() < 1e-10);
    }
}
