//! Zonal observation time series
//!
//! The long-format output table (one row per site and date), the wide pivot
//! used for inspection, acquisition-date parsing and CSV export.

use chrono::NaiveDate;
use greentrace_core::{Error, Result};
use std::path::Path;

/// One record of the output time series: the spatial mean of the index over
/// one site's geometry for one acquisition date. `None` means the site had
/// no valid covered cells on that date.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalObservation {
    pub site: String,
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Long-format (tidy) time series: ordered zonal observations.
///
/// A complete series holds exactly one observation per (site, date) pair.
#[derive(Debug, Clone, Default)]
pub struct TimeSeries {
    observations: Vec<ZonalObservation>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observation: ZonalObservation) {
        self.observations.push(observation);
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZonalObservation> {
        self.observations.iter()
    }

    /// Site names in first-appearance order
    pub fn sites(&self) -> Vec<&str> {
        let mut sites: Vec<&str> = Vec::new();
        for obs in &self.observations {
            if !sites.contains(&obs.site.as_str()) {
                sites.push(&obs.site);
            }
        }
        sites
    }

    /// Acquisition dates in first-appearance order
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = Vec::new();
        for obs in &self.observations {
            if !dates.contains(&obs.date) {
                dates.push(obs.date);
            }
        }
        dates
    }

    /// Observations of one site, in series order
    pub fn for_site(&self, site: &str) -> Vec<(NaiveDate, Option<f64>)> {
        self.observations
            .iter()
            .filter(|o| o.site == site)
            .map(|o| (o.date, o.value))
            .collect()
    }

    /// Pivot to the wide table: one row per site, one column per date.
    ///
    /// Requires the complete-grid invariant: exactly one observation per
    /// (site, date) pair. Duplicates or gaps are an error, never silently
    /// dropped or invented.
    pub fn to_wide(&self) -> Result<WideTable> {
        let sites: Vec<String> = self.sites().iter().map(|s| s.to_string()).collect();
        let dates = self.dates();

        let mut cells: Vec<Vec<Option<Option<f64>>>> = vec![vec![None; dates.len()]; sites.len()];

        for obs in &self.observations {
            let si = sites.iter().position(|s| *s == obs.site).unwrap();
            let di = dates.iter().position(|d| *d == obs.date).unwrap();
            if cells[si][di].is_some() {
                return Err(Error::Other(format!(
                    "duplicate observation for site '{}' on {}",
                    obs.site, obs.date
                )));
            }
            cells[si][di] = Some(obs.value);
        }

        let mut rows = Vec::with_capacity(sites.len());
        for (si, site) in sites.into_iter().enumerate() {
            let mut values = Vec::with_capacity(dates.len());
            for (di, date) in dates.iter().enumerate() {
                match cells[si][di] {
                    Some(v) => values.push(v),
                    None => {
                        return Err(Error::Other(format!(
                            "missing observation for site '{}' on {}",
                            site, date
                        )))
                    }
                }
            }
            rows.push(WideRow { site, values });
        }

        Ok(WideTable { dates, rows })
    }

    /// Write the tidy table as CSV with columns `site,date,ndvi`.
    ///
    /// Missing values become empty cells.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())
            .map_err(|e| Error::Other(format!("CSV write error: {}", e)))?;

        writer
            .write_record(["site", "date", "ndvi"])
            .map_err(|e| Error::Other(format!("CSV write error: {}", e)))?;

        for obs in &self.observations {
            let value = match obs.value {
                Some(v) => v.to_string(),
                None => String::new(),
            };
            writer
                .write_record([obs.site.as_str(), &obs.date.to_string(), &value])
                .map_err(|e| Error::Other(format!("CSV write error: {}", e)))?;
        }

        writer
            .flush()
            .map_err(|e| Error::Other(format!("CSV write error: {}", e)))?;
        Ok(())
    }
}

impl FromIterator<ZonalObservation> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = ZonalObservation>>(iter: I) -> Self {
        Self {
            observations: iter.into_iter().collect(),
        }
    }
}

/// One row of the wide table
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub site: String,
    /// One value per column of `WideTable::dates`
    pub values: Vec<Option<f64>>,
}

/// Wide-format table: one row per site, one column per date.
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<WideRow>,
}

impl WideTable {
    /// Unpivot back to the long format.
    ///
    /// Total and order-preserving: exactly one output observation per input
    /// cell, emitted row-major (site order, then date order).
    pub fn to_long(&self) -> TimeSeries {
        let mut series = TimeSeries::new();
        for row in &self.rows {
            for (date, value) in self.dates.iter().zip(&row.values) {
                series.push(ZonalObservation {
                    site: row.site.clone(),
                    date: *date,
                    value: *value,
                });
            }
        }
        series
    }
}

/// Parse the acquisition date from a scene file stem.
///
/// Scans for an 8-digit `YYYYMMDD` token; the first run of exactly eight
/// digits that forms a valid calendar date wins. Pairing files with their
/// dates this way keeps directory-listing order out of the results.
pub fn parse_acquisition_date(stem: &str) -> Result<NaiveDate> {
    let bytes = stem.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 8 {
                if let Ok(date) = NaiveDate::parse_from_str(&stem[start..i], "%Y%m%d") {
                    return Ok(date);
                }
            }
        } else {
            i += 1;
        }
    }

    Err(Error::DateParse(stem.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_series() -> TimeSeries {
        let mut series = TimeSeries::new();
        for d in [date(2018, 1, 17), date(2018, 6, 12)] {
            for (site, value) in [("tussock", Some(0.4)), ("bog", None)] {
                series.push(ZonalObservation {
                    site: site.to_string(),
                    date: d,
                    value,
                });
            }
        }
        series
    }

    #[test]
    fn test_parse_acquisition_date() {
        assert_eq!(
            parse_acquisition_date("landsat8_sr_20180612_clip").unwrap(),
            date(2018, 6, 12)
        );
        assert_eq!(
            parse_acquisition_date("20180117.tif").unwrap(),
            date(2018, 1, 17)
        );
    }

    #[test]
    fn test_parse_skips_invalid_eight_digit_runs() {
        // 12345678 is not a calendar date; the later token is
        assert_eq!(
            parse_acquisition_date("tile12345678_20180612").unwrap(),
            date(2018, 6, 12)
        );
    }

    #[test]
    fn test_parse_rejects_missing_token() {
        assert!(matches!(
            parse_acquisition_date("scene_final_v2"),
            Err(Error::DateParse(_))
        ));
        // Nine digits are not a date token
        assert!(matches!(
            parse_acquisition_date("scene_201806123"),
            Err(Error::DateParse(_))
        ));
    }

    #[test]
    fn test_pivot_roundtrip_is_lossless() {
        let series = sample_series();
        let wide = series.to_wide().unwrap();
        let long = wide.to_long();
        let wide_again = long.to_wide().unwrap();

        assert_eq!(wide, wide_again);
        assert_eq!(long.len(), series.len());
    }

    #[test]
    fn test_pivot_order_preserving() {
        let series = sample_series();
        let long = series.to_wide().unwrap().to_long();

        // Row-major: all of tussock first, dates in column order
        let order: Vec<(&str, NaiveDate)> =
            long.iter().map(|o| (o.site.as_str(), o.date)).collect();
        assert_eq!(
            order,
            vec![
                ("tussock", date(2018, 1, 17)),
                ("tussock", date(2018, 6, 12)),
                ("bog", date(2018, 1, 17)),
                ("bog", date(2018, 6, 12)),
            ]
        );
    }

    #[test]
    fn test_pivot_rejects_duplicates() {
        let mut series = sample_series();
        series.push(ZonalObservation {
            site: "tussock".to_string(),
            date: date(2018, 1, 17),
            value: Some(0.1),
        });
        assert!(series.to_wide().is_err());
    }

    #[test]
    fn test_pivot_rejects_gaps() {
        let mut series = TimeSeries::new();
        series.push(ZonalObservation {
            site: "tussock".to_string(),
            date: date(2018, 1, 17),
            value: Some(0.4),
        });
        series.push(ZonalObservation {
            site: "bog".to_string(),
            date: date(2018, 6, 12),
            value: Some(0.2),
        });
        assert!(series.to_wide().is_err());
    }

    #[test]
    fn test_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ndvi.csv");

        sample_series().write_csv(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "site,date,ndvi");
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "tussock,2018-01-17,0.4");
        // Missing value stays an empty cell, not a zero
        assert_eq!(lines[2], "bog,2018-01-17,");
    }

    #[test]
    fn test_sites_and_dates_first_appearance_order() {
        let series = sample_series();
        assert_eq!(series.sites(), vec!["tussock", "bog"]);
        assert_eq!(series.dates(), vec![date(2018, 1, 17), date(2018, 6, 12)]);
    }
}
