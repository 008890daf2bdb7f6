//! Banner image persistence.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use image::{imageops::FilterType, ColorType, DynamicImage, ImageFormat};
use tracing::{info, warn};

pub const BANNER_WIDTH: u32 = 1200;
pub const BANNER_HEIGHT: u32 = 675;

/// Resize to the 16:9 banner size and write PNG. Undecodable payloads are
/// written as-is so nothing the provider returned is lost.
pub fn save_image(bytes: &[u8], path: &Path) -> Result<()> {
    anyhow::ensure!(!bytes.is_empty(), "no image data to save");
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    match image::load_from_memory(bytes) {
        Ok(img) => {
            info!(width = img.width(), height = img.height(), "decoded image");
            let img = match img.color() {
                ColorType::Rgb8 | ColorType::L8 => img,
                _ => DynamicImage::ImageRgb8(img.to_rgb8()),
            };
            let img = if (img.width(), img.height()) != (BANNER_WIDTH, BANNER_HEIGHT) {
                img.resize_exact(BANNER_WIDTH, BANNER_HEIGHT, FilterType::Lanczos3)
            } else {
                img
            };
            img.save_with_format(path, ImageFormat::Png)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "image saved");
        }
        Err(e) => {
            warn!(error = %e, "image decode failed, writing raw bytes");
            fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), bytes = bytes.len(), "image saved (raw)");
        }
    }
    Ok(())
}
