//! Study-site polygons
//!
//! Reference data describing where zonal means are taken: one named polygon
//! per vegetation community, loaded once per run and immutable afterwards.

use crate::crs::CRS;
use geo_types::{MultiPolygon, Polygon};

/// A named study site with a boundary geometry.
///
/// The name carries the vegetation-community label used to group the output
/// time series. Boundaries are stored as multi-polygons so sites split into
/// several patches still count as one site.
#[derive(Debug, Clone)]
pub struct Site {
    name: String,
    boundary: MultiPolygon<f64>,
}

impl Site {
    /// Create a site from a single polygon
    pub fn new(name: impl Into<String>, boundary: Polygon<f64>) -> Self {
        Self {
            name: name.into(),
            boundary: MultiPolygon(vec![boundary]),
        }
    }

    /// Create a site from a multi-polygon boundary
    pub fn from_multi(name: impl Into<String>, boundary: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            boundary,
        }
    }

    /// Vegetation-community label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Boundary geometry
    pub fn boundary(&self) -> &MultiPolygon<f64> {
        &self.boundary
    }
}

/// Ordered collection of study sites.
///
/// Site order is load order and determines zone ids and output row order.
#[derive(Debug, Clone, Default)]
pub struct SiteCollection {
    sites: Vec<Site>,
    crs: Option<CRS>,
}

impl SiteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, site: Site) {
        self.sites.push(site);
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter()
    }

    /// Site names in collection order
    pub fn names(&self) -> Vec<&str> {
        self.sites.iter().map(|s| s.name()).collect()
    }

    /// CRS of the site geometries, if known
    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Declare the CRS of the site geometries
    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }
}

impl IntoIterator for SiteCollection {
    type Item = Site;
    type IntoIter = std::vec::IntoIter<Site>;

    fn into_iter(self) -> Self::IntoIter {
        self.sites.into_iter()
    }
}
