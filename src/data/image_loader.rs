use super::{FEATURES, HEIGHT, WIDTH};
use crate::error::{Error, Result};
use image::{GrayImage, ImageReader, imageops::FilterType};
use std::path::Path;

/// Reads an image file into the classifier's input layout.
///
/// The image is converted to grayscale, resized to [`WIDTH`]x[`HEIGHT`] and each
/// brightness is scaled into `[0, 1]`.
pub fn load_image(path: impl AsRef<Path>) -> Result<Vec<f32>> {
    let path = path.as_ref();
    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|source| Error::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;
    let image = reader.decode().map_err(|source| Error::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(pixels_from_gray(&image.to_luma8()))
}

/// Resizes (with antialiasing) and flattens a grayscale image.
///
/// # Shape
/// output: [WIDTH * HEIGHT]
pub fn pixels_from_gray(image: &GrayImage) -> Vec<f32> {
    let resized = if image.dimensions() == (WIDTH as u32, HEIGHT as u32) {
        image.clone()
    } else {
        image::imageops::resize(image, WIDTH as u32, HEIGHT as u32, FilterType::Lanczos3)
    };
    let pixels: Vec<f32> = resized
        .into_raw()
        .into_iter()
        .map(|brightness| f32::from(brightness) / 255.0)
        .collect();
    debug_assert_eq!(pixels.len(), FEATURES);
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use temp_dir::TempDir;

    #[test]
    fn loads_any_png_as_784_unit_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.child("digit.png");
        GrayImage::from_fn(40, 30, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]))
            .save(&path)
            .unwrap();

        let pixels = load_image(&path).unwrap();
        assert_eq!(pixels.len(), FEATURES);
        assert!(pixels.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn keeps_exact_values_at_native_size() {
        let image = GrayImage::from_fn(28, 28, |x, _| Luma([if x < 14 { 0 } else { 255 }]));
        let pixels = pixels_from_gray(&image);
        assert_eq!(pixels[0], 0.0);
        assert_eq!(pixels[27], 1.0);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let err = load_image(dir.child("nope.png")).unwrap_err();
        assert!(matches!(err, Error::ImageRead { .. }));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.child("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, Error::ImageDecode { .. }));
    }
}
