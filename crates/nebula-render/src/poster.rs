//! Poster images and the placeholder disc.

use std::path::{Component, Path, PathBuf};

use image::{Rgba, RgbaImage};

use crate::render_cache::MaterialError;

/// Posters are downscaled so their longer side fits this many pixels.
pub const MAX_POSTER_SIDE: u32 = 256;

/// Side length of the placeholder texture.
pub const PLACEHOLDER_SIZE: u32 = 64;

/// Resolve a poster key such as `/kqjL17yufvn9OVLyXYpvtyrFfak.jpg` inside
/// `poster_dir`. Keys may not leave the directory.
pub fn resolve_poster_path(poster_dir: &Path, key: &str) -> Result<PathBuf, MaterialError> {
    let relative = Path::new(key.trim().trim_start_matches(['/', '\\']));
    let mut path = poster_dir.to_path_buf();
    let mut parts = 0;
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                path.push(part);
                parts += 1;
            }
            Component::CurDir => {}
            _ => return Err(MaterialError::InvalidKey(key.to_owned())),
        }
    }
    if parts == 0 {
        return Err(MaterialError::InvalidKey(key.to_owned()));
    }
    Ok(path)
}

/// Load and downscale the poster stored under `key`.
pub fn load_poster(poster_dir: Option<&Path>, key: &str) -> Result<RgbaImage, MaterialError> {
    let dir = poster_dir.ok_or(MaterialError::NoPosterDir)?;
    let path = resolve_poster_path(dir, key)?;
    let image = image::open(&path).map_err(|source| MaterialError::Image {
        path: path.clone(),
        source,
    })?;

    let image = if image.width() > MAX_POSTER_SIDE || image.height() > MAX_POSTER_SIDE {
        image.thumbnail(MAX_POSTER_SIDE, MAX_POSTER_SIDE)
    } else {
        image
    };
    log::debug!(
        "Loaded poster {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image.to_rgba8())
}

/// A white disc with a soft edge, tinted per node at draw time.
pub fn placeholder_disc(size: u32) -> RgbaImage {
    let size = size.max(2);
    let center = (size as f32 - 1.0) * 0.5;
    let radius = size as f32 * 0.5;
    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 - center;
        let dy = y as f32 - center;
        let distance = (dx * dx + dy * dy).sqrt();
        // One pixel of antialiasing at the rim, slightly brighter core.
        let coverage = (radius - distance).clamp(0.0, 1.0);
        let shade = 1.0 - 0.25 * (distance / radius).clamp(0.0, 1.0);
        let value = (255.0 * shade).round() as u8;
        Rgba([value, value, value, (255.0 * coverage).round() as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_strips_leading_slash() {
        let path = resolve_poster_path(Path::new("/data/posters"), "/abc.jpg").unwrap();
        assert_eq!(path, Path::new("/data/posters/abc.jpg"));
    }

    #[test]
    fn test_resolve_rejects_escapes_and_empty() {
        let dir = Path::new("/data/posters");
        assert!(matches!(
            resolve_poster_path(dir, "../secret.jpg"),
            Err(MaterialError::InvalidKey(_))
        ));
        assert!(resolve_poster_path(dir, "/").is_err());
        assert!(resolve_poster_path(dir, "").is_err());
    }

    #[test]
    fn test_load_without_dir() {
        assert!(matches!(
            load_poster(None, "/abc.jpg"),
            Err(MaterialError::NoPosterDir)
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_poster(Some(dir.path()), "/missing.png"),
            Err(MaterialError::Image { .. })
        ));
    }

    #[test]
    fn test_load_downscales_large_posters() {
        let dir = tempfile::tempdir().unwrap();
        RgbaImage::from_pixel(300, 600, Rgba([200, 100, 50, 255]))
            .save(dir.path().join("tall.png"))
            .unwrap();

        let poster = load_poster(Some(dir.path()), "/tall.png").unwrap();
        assert_eq!(poster.height(), MAX_POSTER_SIDE);
        assert_eq!(poster.width(), 128);
    }

    #[test]
    fn test_load_keeps_small_posters() {
        let dir = tempfile::tempdir().unwrap();
        RgbaImage::from_pixel(40, 60, Rgba([1, 2, 3, 255]))
            .save(dir.path().join("small.png"))
            .unwrap();
        let poster = load_poster(Some(dir.path()), "small.png").unwrap();
        assert_eq!(poster.dimensions(), (40, 60));
        assert_eq!(poster.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn test_placeholder_is_opaque_center_transparent_corner() {
        let disc = placeholder_disc(PLACEHOLDER_SIZE);
        assert_eq!(disc.dimensions(), (PLACEHOLDER_SIZE, PLACEHOLDER_SIZE));
        assert_eq!(disc.get_pixel(32, 32)[3], 255);
        assert_eq!(disc.get_pixel(0, 0)[3], 0);
    }
}
