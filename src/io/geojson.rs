//! GeoJSON loading for the region of interest and the labelled training polygons.
//!
//! Coordinates are taken as-is and must already be in the projected metric
//! CRS of the tiles.
use std::collections::BTreeMap;
use std::path::Path;

use ::geojson::{Feature, GeoJson, Geometry, Value as GeoValue};
use serde_json::Value;
use tracing::{debug, info};

use crate::core::classifier::ClassPolygons;
use crate::core::region::{Polygon, Region};
use crate::error::{Error, Result};
use crate::types::LandClass;

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidGeometry(msg.into())
}

/// Append every polygon of `geometry` to `out`.
fn push_polygons(geometry: &Geometry, out: &mut Vec<Polygon<f64>>) -> Result<()> {
    match &geometry.value {
        GeoValue::Polygon(_) => out.push(Polygon::try_from(geometry.value.clone())?),
        GeoValue::MultiPolygon(_) => {
            let parts = geo::MultiPolygon::<f64>::try_from(geometry.value.clone())?;
            out.extend(parts.0);
        }
        GeoValue::GeometryCollection(members) => {
            for member in members {
                push_polygons(member, out)?;
            }
        }
        other => {
            return Err(invalid(format!(
                "unsupported geometry type {}",
                other.type_name()
            )));
        }
    }
    Ok(())
}

/// Features without a geometry carry nothing to rasterise and are skipped.
fn push_feature(feature: &Feature, out: &mut Vec<Polygon<f64>>) -> Result<()> {
    match &feature.geometry {
        Some(geometry) => push_polygons(geometry, out),
        None => {
            debug!(id = ?feature.id, "feature without geometry skipped");
            Ok(())
        }
    }
}

pub fn parse_region(name: &str, geojson: &GeoJson) -> Result<Region> {
    let mut polygons = Vec::new();
    match geojson {
        GeoJson::Geometry(geometry) => push_polygons(geometry, &mut polygons)?,
        GeoJson::Feature(feature) => push_feature(feature, &mut polygons)?,
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                push_feature(feature, &mut polygons)?;
            }
        }
    }
    Region::new(name, polygons)
}

fn read_geojson(path: &Path) -> Result<GeoJson> {
    Ok(std::fs::read_to_string(path)?.parse::<GeoJson>()?)
}

pub fn load_region(path: &Path, name: &str) -> Result<Region> {
    let region = parse_region(name, &read_geojson(path)?)?;
    info!(
        "Loaded region {} from {:?}: {:.2} km²",
        name,
        path,
        region.area_km2()
    );
    Ok(region)
}

fn feature_class(feature: &Feature) -> Result<LandClass> {
    match feature.property("class") {
        Some(Value::String(s)) => s.parse::<LandClass>(),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|id| u8::try_from(id).ok())
            .and_then(LandClass::from_id)
            .ok_or_else(|| invalid(format!("unknown class id {}", n))),
        _ => Err(invalid("training feature without a class property")),
    }
}

/// Group a FeatureCollection's polygons by their `class` property.
pub fn parse_training_polygons(geojson: &GeoJson) -> Result<Vec<ClassPolygons>> {
    let GeoJson::FeatureCollection(fc) = geojson else {
        return Err(invalid("training polygons must be a FeatureCollection"));
    };

    let mut by_class: BTreeMap<LandClass, Vec<Polygon<f64>>> = BTreeMap::new();
    for feature in &fc.features {
        if feature.geometry.is_none() {
            debug!(id = ?feature.id, "training feature without geometry skipped");
            continue;
        }
        let class = feature_class(feature)?;
        push_feature(feature, by_class.entry(class).or_default())?;
    }

    by_class
        .into_iter()
        .filter(|(_, polygons)| !polygons.is_empty())
        .map(|(class, polygons)| {
            Ok(ClassPolygons {
                class,
                area: Region::new(class.label(), polygons)?,
            })
        })
        .collect()
}

pub fn load_training_polygons(path: &Path) -> Result<Vec<ClassPolygons>> {
    let classes = parse_training_polygons(&read_geojson(path)?)?;
    info!("Loaded training polygons for {} classes from {:?}", classes.len(), path);
    Ok(classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn square(x0: f64, size: f64) -> Value {
        json!([[[x0, 0.0], [x0 + size, 0.0], [x0 + size, size], [x0, size], [x0, 0.0]]])
    }

    fn geojson(value: Value) -> GeoJson {
        GeoJson::from_json_value(value).unwrap()
    }

    #[test]
    fn polygon_with_hole() {
        let mut coords = square(0.0, 100.0);
        coords
            .as_array_mut()
            .unwrap()
            .push(json!([[40.0, 40.0], [60.0, 40.0], [60.0, 60.0], [40.0, 60.0], [40.0, 40.0]]));
        let region =
            parse_region("r", &geojson(json!({"type": "Polygon", "coordinates": coords}))).unwrap();
        assert!(region.contains(10.0, 10.0));
        assert!(!region.contains(50.0, 50.0));
        assert_relative_eq!(region.area_m2(), 10_000.0 - 400.0);
    }

    #[test]
    fn feature_collection_of_multipolygons() {
        let fc = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": {"type": "MultiPolygon", "coordinates": [square(0.0, 10.0), square(20.0, 10.0)]}
            }]
        });
        let region = parse_region("UAE", &geojson(fc)).unwrap();
        assert_eq!(region.polygons().len(), 2);
        assert_eq!(region.name, "UAE");
    }

    #[test]
    fn features_without_geometry_are_skipped() {
        let fc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"class": "Urban"}, "geometry": null},
                {
                    "type": "Feature",
                    "properties": {"class": "Urban"},
                    "geometry": {"type": "Polygon", "coordinates": square(0.0, 10.0)}
                }
            ]
        });
        let region = parse_region("r", &geojson(fc.clone())).unwrap();
        assert_eq!(region.polygons().len(), 1);
        assert_relative_eq!(region.area_m2(), 100.0);

        let classes = parse_training_polygons(&geojson(fc)).unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].area.polygons().len(), 1);
    }

    #[test]
    fn training_polygons_grouped_by_class() {
        let feature = |class: Value, x0: f64| {
            json!({
                "type": "Feature",
                "properties": {"class": class},
                "geometry": {"type": "Polygon", "coordinates": square(x0, 10.0)}
            })
        };
        let fc = json!({
            "type": "FeatureCollection",
            "features": [
                feature(json!("Water"), 0.0),
                feature(json!("urban"), 20.0),
                feature(json!(3), 40.0),
            ]
        });
        let classes = parse_training_polygons(&geojson(fc)).unwrap();
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].class, LandClass::Urban);
        assert_eq!(classes[1].class, LandClass::Water);
        assert_eq!(classes[1].area.polygons().len(), 2);
    }

    #[test]
    fn rejects_unknown_types_and_classes() {
        let point = geojson(json!({"type": "Point", "coordinates": [0.0, 0.0]}));
        assert!(matches!(parse_region("r", &point), Err(Error::InvalidGeometry(_))));
        let fc = json!({"type": "FeatureCollection", "features": [{
            "type": "Feature", "properties": {"class": "Snow"},
            "geometry": {"type": "Polygon", "coordinates": square(0.0, 1.0)}
        }]});
        assert!(parse_training_polygons(&geojson(fc)).is_err());
    }

    #[test]
    fn only_null_geometries_is_an_empty_region() {
        let fc = json!({"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {}, "geometry": null}
        ]});
        assert!(matches!(parse_region("r", &geojson(fc)), Err(Error::InvalidGeometry(_))));
    }
}
