//! GeoJSON study-site loader
//!
//! Sites come from one GeoJSON FeatureCollection; each feature carries a
//! polygon (or multi-polygon) boundary and a property naming its vegetation
//! community. Feature order is preserved.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::sites::{Site, SiteCollection};
use geojson::GeoJson;
use std::convert::TryFrom;
use std::fs;
use std::path::Path;

/// Read study sites from a GeoJSON file.
///
/// `label_key` is the property holding the vegetation-community label.
/// Non-areal geometries and features without the label are fatal errors.
pub fn read_sites<P: AsRef<Path>>(path: P, label_key: &str) -> Result<SiteCollection> {
    let text = fs::read_to_string(path.as_ref())?;
    parse_sites(&text, label_key)
}

/// Parse study sites from GeoJSON text
pub fn parse_sites(text: &str, label_key: &str) -> Result<SiteCollection> {
    let geojson: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| Error::VectorParse(e.to_string()))?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => {
            return Err(Error::VectorParse(
                "expected a FeatureCollection, found a bare geometry".to_string(),
            ))
        }
    };

    let mut sites = SiteCollection::new();
    // RFC 7946 fixes GeoJSON coordinates to WGS84
    sites.set_crs(Some(CRS::wgs84()));

    for (index, feature) in features.into_iter().enumerate() {
        let label = feature
            .properties
            .as_ref()
            .and_then(|props| props.get(label_key))
            .and_then(property_as_string)
            .ok_or_else(|| Error::MissingProperty {
                key: label_key.to_string(),
                feature: index,
            })?;

        let geometry = feature.geometry.ok_or_else(|| {
            Error::InvalidGeometry(format!("feature {} has no geometry", index))
        })?;

        let geometry = geo_types::Geometry::<f64>::try_from(geometry.value)
            .map_err(|e| Error::VectorParse(e.to_string()))?;

        let site = match geometry {
            geo_types::Geometry::Polygon(p) => Site::new(label, p),
            geo_types::Geometry::MultiPolygon(mp) => Site::from_multi(label, mp),
            other => {
                return Err(Error::InvalidGeometry(format!(
                    "feature {}: expected Polygon or MultiPolygon, found {}",
                    index,
                    geometry_kind(&other)
                )))
            }
        };

        sites.push(site);
    }

    Ok(sites)
}

fn property_as_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn geometry_kind(geometry: &geo_types::Geometry<f64>) -> &'static str {
    match geometry {
        geo_types::Geometry::Point(_) => "Point",
        geo_types::Geometry::Line(_) => "Line",
        geo_types::Geometry::LineString(_) => "LineString",
        geo_types::Geometry::Polygon(_) => "Polygon",
        geo_types::Geometry::MultiPoint(_) => "MultiPoint",
        geo_types::Geometry::MultiLineString(_) => "MultiLineString",
        geo_types::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo_types::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo_types::Geometry::Rect(_) => "Rect",
        geo_types::Geometry::Triangle(_) => "Triangle",
    }
}
