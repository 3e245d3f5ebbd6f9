use crate::overlay::error::OverlayResult;
use crate::overlay::raster::RgbaBuffer;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

pub const EXPORT_PREFIX: &str = "overlay";

pub fn timestamped_stem(now: chrono::DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

pub fn build_filename(stem: &str) -> String {
    format!("{}_{}.png", EXPORT_PREFIX, stem)
}

pub fn suggested_file_name(now: chrono::DateTime<Local>) -> String {
    build_filename(&timestamped_stem(now))
}

pub fn default_export_path(dir: &Path, now: chrono::DateTime<Local>) -> PathBuf {
    dir.join(suggested_file_name(now))
}

/// Always PNG, whatever the extension says; the alpha channel must survive.
pub fn write_png(path: &Path, image: &RgbaBuffer) -> OverlayResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, image.encode_png()?)?;
    Ok(())
}

pub fn read_image(path: &Path) -> OverlayResult<RgbaBuffer> {
    let bytes = fs::read(path)?;
    RgbaBuffer::decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::{build_filename, default_export_path, read_image, write_png};
    use crate::overlay::raster::{Rgba, RgbaBuffer};
    use chrono::{Local, TimeZone};
    use std::path::Path;

    #[test]
    fn filename_formats_timestamp() {
        let dt = Local
            .with_ymd_and_hms(2026, 1, 2, 3, 4, 5)
            .single()
            .expect("date time");
        assert!(default_export_path(Path::new("/tmp/exports"), dt)
            .ends_with("overlay_20260102_030405.png"));
        assert_eq!(build_filename("x"), "overlay_x.png");
    }

    #[test]
    fn png_file_keeps_transparency() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("out.png");
        let mut image = RgbaBuffer::new(2, 2, Rgba::rgba(10, 20, 30, 255));
        image.set_pixel(1, 1, Rgba::rgba(10, 20, 30, 0));

        write_png(&path, &image).expect("write png");
        assert_eq!(read_image(&path).expect("read png"), image);
    }
}
