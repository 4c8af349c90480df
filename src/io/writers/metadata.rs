use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::raster::GeoTransform;
use crate::error::Result;
use crate::types::{ExportTarget, LandClass};

/// Provenance of one exported raster.
#[derive(Debug, Clone)]
pub struct RasterExportMeta {
    pub description: String,
    pub region: String,
    pub target: ExportTarget,
    pub scale: f64,
    /// Year of a land-cover map, or (base, last) of a change map
    pub years: Vec<i32>,
    /// Whether the band holds class ids (true) or a self-masked change map (false)
    pub land_cover: bool,
    pub geotransform: GeoTransform,
    pub crs: Option<String>,
}

/// Flatten export metadata into upper-case key/value pairs.
pub fn extract_metadata_fields(meta: &RasterExportMeta) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();

    fields.insert("DESCRIPTION".to_string(), meta.description.clone());
    fields.insert("REGION".to_string(), meta.region.clone());
    fields.insert("EXPORT_TARGET".to_string(), meta.target.to_string());
    fields.insert("SCALE".to_string(), meta.scale.to_string());
    fields.insert(
        "YEARS".to_string(),
        meta.years
            .iter()
            .map(|y| y.to_string())
            .collect::<Vec<_>>()
            .join(","),
    );

    if meta.land_cover {
        for class in LandClass::ALL {
            fields.insert(
                format!("CLASS_{}", class.id()),
                format!("{} ({})", class.label(), class.color()),
            );
        }
    } else {
        fields.insert("CLASS_1".to_string(), "New urban".to_string());
    }

    fields.insert("CONVERSION_TOOL".to_string(), env!("CARGO_PKG_NAME").to_string());
    fields.insert(
        "CONVERSION_VERSION".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    fields.insert(
        "CONVERSION_TIMESTAMP".to_string(),
        chrono::Utc::now().to_rfc3339(),
    );

    fields
}

/// Lower-case keys, numbers as JSON numbers, plus the geotransform array and CRS.
pub fn metadata_to_json(meta: &RasterExportMeta) -> serde_json::Map<String, serde_json::Value> {
    let mut json = serde_json::Map::new();
    for (key, value) in extract_metadata_fields(meta) {
        let json_value = match value.parse::<f64>() {
            Ok(num) => serde_json::Number::from_f64(num)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::String(value)),
            Err(_) => serde_json::Value::String(value),
        };
        json.insert(key.to_lowercase(), json_value);
    }

    json.insert(
        "geotransform".to_string(),
        serde_json::Value::Array(
            meta.geotransform
                .to_gdal()
                .iter()
                .filter_map(|&v| serde_json::Number::from_f64(v).map(serde_json::Value::Number))
                .collect(),
        ),
    );
    if let Some(crs) = meta.crs.as_deref().filter(|c| !c.is_empty()) {
        json.insert("crs".to_string(), serde_json::Value::String(crs.to_string()));
    }
    json
}

/// Write `<image>.json` next to an exported raster.
pub fn create_metadata_sidecar(output_path: &Path, meta: &RasterExportMeta) -> Result<PathBuf> {
    let sidecar_path = output_path.with_extension("json");
    let json_string = serde_json::to_string_pretty(&metadata_to_json(meta))?;
    std::fs::write(&sidecar_path, json_string)?;
    info!("Created metadata sidecar: {:?}", sidecar_path);
    Ok(sidecar_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(land_cover: bool) -> RasterExportMeta {
        RasterExportMeta {
            description: "LC_2018_Final".to_string(),
            region: "UAE".to_string(),
            target: ExportTarget::Asset,
            scale: 10.0,
            years: vec![2018],
            land_cover,
            geotransform: GeoTransform::new(0.0, 100.0, 10.0, -10.0),
            crs: Some("EPSG:32640".to_string()),
        }
    }

    #[test]
    fn land_cover_legend_is_listed() {
        let fields = extract_metadata_fields(&meta(true));
        assert_eq!(fields["CLASS_0"], "Urban (red)");
        assert_eq!(fields["CLASS_3"], "Water (blue)");
        assert_eq!(fields["EXPORT_TARGET"], "Asset");
    }

    #[test]
    fn json_has_numbers_and_transform() {
        let json = metadata_to_json(&meta(false));
        assert_eq!(json["scale"], serde_json::json!(10.0));
        assert_eq!(json["class_1"], serde_json::json!("New urban"));
        assert_eq!(json["geotransform"].as_array().unwrap().len(), 6);
        assert_eq!(json["crs"], serde_json::json!("EPSG:32640"));
    }
}
