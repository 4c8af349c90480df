use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::raster::GeoTransform;
use crate::error::Result;

/// Write a `.tfw` world file next to the GeoTIFF.
/// The world file stores the transform in pixel-center convention.
pub fn write_world_file(output_image: &Path, transform: &GeoTransform) -> Result<PathBuf> {
    let world_path = output_image.with_extension("tfw");
    let gt = transform.to_gdal();

    // A: pixel size in X, D: rotation about Y, B: rotation about X, E: pixel size Y
    // C, F: center of upper-left pixel
    let (a, d, b, e) = (gt[1], gt[4], gt[2], gt[5]);
    let c = gt[0] + 0.5 * a + 0.5 * b;
    let f = gt[3] + 0.5 * d + 0.5 * e;

    let mut file = File::create(&world_path)?;
    for v in [a, d, b, e, c, f] {
        writeln!(file, "{:.12}", v)?;
    }
    Ok(world_path)
}

/// Write a .prj file with the provided projection (WKT or EPSG:XXXX)
pub fn write_prj_file(output_image: &Path, projection: &str) -> Result<PathBuf> {
    let prj_path = output_image.with_extension("prj");
    std::fs::write(&prj_path, projection.as_bytes())?;
    Ok(prj_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_file_uses_pixel_centres() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("lc.tif");
        let gt = GeoTransform::new(1000.0, 2000.0, 10.0, -10.0);
        let path = write_world_file(&image, &gt).unwrap();
        assert_eq!(path.extension().unwrap(), "tfw");
        let lines: Vec<f64> = std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| l.parse().unwrap())
            .collect();
        assert_eq!(lines, vec![10.0, 0.0, 0.0, -10.0, 1005.0, 1995.0]);
    }

    #[test]
    fn world_file_is_always_tfw() {
        let dir = tempfile::tempdir().unwrap();
        let gt = GeoTransform::new(0.0, 0.0, 10.0, -10.0);
        for name in ["Urban_Growth_2018_2024.tif", "LC_2018_Final.TIFF", "LC_2024_Final"] {
            let path = write_world_file(&dir.path().join(name), &gt).unwrap();
            assert_eq!(path.extension().unwrap(), "tfw");
            assert!(path.is_file());
        }
    }
}
