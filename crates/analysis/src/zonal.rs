//! Zonal aggregation over study sites
//!
//! Sites are rasterized onto the layer grid (a cell belongs to the site
//! containing its center), then per-zone means are taken over every index
//! layer. No-data cells are excluded from both numerator and denominator;
//! a site with zero valid cells yields a missing value, never a zero.

use crate::timeseries::{TimeSeries, ZonalObservation};
use chrono::NaiveDate;
use geo::{BoundingRect, Contains};
use geo_types::Point;
use greentrace_core::raster::Raster;
use greentrace_core::sites::SiteCollection;
use greentrace_core::{Error, Result};

/// Rasterize study sites into a zone raster on the template's grid.
///
/// Cell (row, col) gets zone id `i + 1` when its center lies inside site
/// `i`'s boundary; 0 is background. When sites overlap, the later site in
/// collection order wins. Fails with `CrsMismatch` when the template and
/// the site collection declare different reference systems.
pub fn rasterize_sites(sites: &SiteCollection, template: &Raster<f64>) -> Result<Raster<i32>> {
    if let (Some(a), Some(b)) = (template.crs(), sites.crs()) {
        if !a.is_equivalent(b) {
            return Err(Error::CrsMismatch(a.identifier(), b.identifier()));
        }
    }

    let (rows, cols) = template.shape();
    let mut zones: Raster<i32> = template.with_same_meta::<i32>(rows, cols);

    for (i, site) in sites.iter().enumerate() {
        let zone_id = (i + 1) as i32;

        let Some(rect) = site.boundary().bounding_rect() else {
            continue; // Degenerate boundary covers nothing
        };

        // Candidate pixel window from the boundary's bounding box
        let (c0, r0) = template.geo_to_pixel(rect.min().x, rect.max().y);
        let (c1, r1) = template.geo_to_pixel(rect.max().x, rect.min().y);

        let row_start = r0.min(r1).floor().max(0.0) as usize;
        let row_end = (r0.max(r1).ceil().max(0.0) as usize).min(rows);
        let col_start = c0.min(c1).floor().max(0.0) as usize;
        let col_end = (c0.max(c1).ceil().max(0.0) as usize).min(cols);

        for row in row_start..row_end {
            for col in col_start..col_end {
                let (x, y) = template.pixel_to_geo(col, row);
                if site.boundary().contains(&Point::new(x, y)) {
                    unsafe { zones.set_unchecked(row, col, zone_id) };
                }
            }
        }
    }

    Ok(zones)
}

/// Mean of valid cells per zone.
///
/// Zone ids run 1..=n_zones; returns one entry per zone in id order.
/// Cells that are no-data in `values` count toward neither the sum nor the
/// cell count. A zone with no valid cells yields `None`.
pub fn zonal_mean(
    values: &Raster<f64>,
    zones: &Raster<i32>,
    n_zones: usize,
) -> Result<Vec<Option<f64>>> {
    let (rows_v, cols_v) = values.shape();
    let (rows_z, cols_z) = zones.shape();

    if rows_v != rows_z || cols_v != cols_z {
        return Err(Error::SizeMismatch {
            er: rows_v,
            ec: cols_v,
            ar: rows_z,
            ac: cols_z,
        });
    }

    let mut sums = vec![0.0f64; n_zones];
    let mut counts = vec![0usize; n_zones];

    for row in 0..rows_v {
        for col in 0..cols_v {
            let zone = unsafe { zones.get_unchecked(row, col) };
            if zone <= 0 || zone as usize > n_zones {
                continue;
            }

            let val = unsafe { values.get_unchecked(row, col) };
            if values.is_nodata(val) {
                continue;
            }

            sums[zone as usize - 1] += val;
            counts[zone as usize - 1] += 1;
        }
    }

    Ok(sums
        .into_iter()
        .zip(counts)
        .map(|(sum, count)| {
            if count > 0 {
                Some(sum / count as f64)
            } else {
                None
            }
        })
        .collect())
}

/// Aggregate a stack of dated index layers over the study sites.
///
/// All layers must share the grid of the first layer. Produces exactly
/// `layers.len() * sites.len()` observations, in (layer order, site order);
/// callers sort layers by date beforehand.
pub fn aggregate(
    layers: &[(NaiveDate, Raster<f64>)],
    sites: &SiteCollection,
) -> Result<TimeSeries> {
    let mut series = TimeSeries::new();

    let Some((_, first)) = layers.first() else {
        return Ok(series);
    };

    let zones = rasterize_sites(sites, first)?;

    for (date, layer) in layers {
        if layer.shape() != first.shape() {
            return Err(Error::SizeMismatch {
                er: first.rows(),
                ec: first.cols(),
                ar: layer.rows(),
                ac: layer.cols(),
            });
        }
        if layer.transform() != first.transform() {
            return Err(Error::TransformMismatch);
        }

        let means = zonal_mean(layer, &zones, sites.len())?;
        for (site, value) in sites.iter().zip(means) {
            series.push(ZonalObservation {
                site: site.name().to_string(),
                date: *date,
                value,
            });
        }
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Polygon};
    use greentrace_core::sites::Site;
    use greentrace_core::GeoTransform;

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (x0, y0),
                (x0 + size, y0),
                (x0 + size, y0 + size),
                (x0, y0 + size),
                (x0, y0),
            ]),
            vec![],
        )
    }

    /// 4x4 grid over (0,0)-(4,4), cell size 1, north-up
    fn template() -> Raster<f64> {
        let mut r = Raster::new(4, 4);
        r.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        r
    }

    #[test]
    fn test_rasterize_cell_center_rule() {
        let mut sites = SiteCollection::new();
        // Covers the left half: cell centers x = 0.5, 1.5
        sites.push(Site::new("left", square(0.0, 0.0, 2.0)));

        let zones = rasterize_sites(&sites, &template()).unwrap();

        for row in 0..4 {
            assert_eq!(zones.get(row, 0).unwrap(), 1);
            assert_eq!(zones.get(row, 1).unwrap(), 1);
            assert_eq!(zones.get(row, 2).unwrap(), 0);
            assert_eq!(zones.get(row, 3).unwrap(), 0);
        }
    }

    #[test]
    fn test_rasterize_later_site_wins_overlap() {
        let mut sites = SiteCollection::new();
        sites.push(Site::new("a", square(0.0, 0.0, 4.0)));
        sites.push(Site::new("b", square(0.0, 0.0, 2.0)));

        let zones = rasterize_sites(&sites, &template()).unwrap();
        assert_eq!(zones.get(3, 0).unwrap(), 2);
        assert_eq!(zones.get(0, 3).unwrap(), 1);
    }

    #[test]
    fn test_rasterize_crs_mismatch() {
        let mut sites = SiteCollection::new();
        sites.push(Site::new("a", square(0.0, 0.0, 2.0)));
        sites.set_crs(Some(greentrace_core::CRS::from_epsg(4326)));

        let mut raster = template();
        raster.set_crs(Some(greentrace_core::CRS::from_epsg(32719)));

        assert!(matches!(
            rasterize_sites(&sites, &raster),
            Err(Error::CrsMismatch(_, _))
        ));
    }

    #[test]
    fn test_zonal_mean_excludes_nodata() {
        let mut values = template();
        // One valid cell of 0.5, everything else no-data
        for row in 0..4 {
            for col in 0..4 {
                values.set(row, col, f64::NAN).unwrap();
            }
        }
        values.set(1, 1, 0.5).unwrap();

        let zones: Raster<i32> = Raster::filled(4, 4, 1);
        let means = zonal_mean(&values, &zones, 1).unwrap();

        assert_eq!(means.len(), 1);
        assert!((means[0].unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zonal_mean_empty_zone_is_none() {
        let values = Raster::filled(4, 4, 1.0);
        let zones: Raster<i32> = Raster::filled(4, 4, 1); // Zone 2 never occurs

        let means = zonal_mean(&values, &zones, 2).unwrap();
        assert!(means[0].is_some());
        assert!(means[1].is_none());
    }

    #[test]
    fn test_zonal_mean_shape_mismatch() {
        let values: Raster<f64> = Raster::new(4, 4);
        let zones: Raster<i32> = Raster::new(3, 3);
        assert!(matches!(
            zonal_mean(&values, &zones, 1),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_aggregate_row_count_invariant() {
        let date_a = NaiveDate::from_ymd_opt(2018, 1, 17).unwrap();
        let date_b = NaiveDate::from_ymd_opt(2018, 6, 12).unwrap();

        let mut layer_a = template();
        let mut layer_b = template();
        for row in 0..4 {
            for col in 0..4 {
                layer_a.set(row, col, 0.2).unwrap();
                layer_b.set(row, col, 0.6).unwrap();
            }
        }

        let mut sites = SiteCollection::new();
        sites.push(Site::new("left", square(0.0, 0.0, 2.0)));
        // Entirely outside the grid: always a missing value
        sites.push(Site::new("elsewhere", square(100.0, 100.0, 5.0)));

        let series = aggregate(&[(date_a, layer_a), (date_b, layer_b)], &sites).unwrap();

        assert_eq!(series.len(), 4); // 2 layers x 2 sites
        let values: Vec<_> = series.iter().map(|o| o.value).collect();
        assert!((values[0].unwrap() - 0.2).abs() < 1e-12);
        assert!(values[1].is_none());
        assert!((values[2].unwrap() - 0.6).abs() < 1e-12);
        assert!(values[3].is_none());
    }

    #[test]
    fn test_aggregate_rejects_mismatched_layer() {
        let date = NaiveDate::from_ymd_opt(2018, 1, 17).unwrap();
        let layer_a = template();
        let layer_b: Raster<f64> = Raster::new(5, 5);

        let mut sites = SiteCollection::new();
        sites.push(Site::new("left", square(0.0, 0.0, 2.0)));

        assert!(aggregate(&[(date, layer_a), (date, layer_b)], &sites).is_err());
    }

    #[test]
    fn test_aggregate_empty_layers() {
        let mut sites = SiteCollection::new();
        sites.push(Site::new("left", square(0.0, 0.0, 2.0)));

        let series = aggregate(&[], &sites).unwrap();
        assert!(series.is_empty());
    }
}
