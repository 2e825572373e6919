//! Thumbnail generation. Four canonical sizes, longest edge
//! constrained, never upscaled, Lanczos3 resample, JPEG quality 85.
//! Operates on the already-decoded, already-oriented image produced by
//! the codec layer's single full decode.

use std::collections::BTreeMap;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

pub const THUMBNAIL_SIZES: [u32; 4] = [64, 256, 512, 1024];
const JPEG_QUALITY: u8 = 85;

/// Generate the four canonical thumbnail sizes from an already-decoded,
/// already-oriented image. Returns a map from size label to encoded JPEG
/// bytes.
pub fn generate_all(img: &DynamicImage) -> BTreeMap<u32, Vec<u8>> {
    let (src_w, src_h) = img.dimensions();
    let longest_edge = src_w.max(src_h);

    THUMBNAIL_SIZES
        .iter()
        .map(|&size| {
            let bytes = if longest_edge <= size {
                // Never upscale: use the source dimensions as-is.
                encode_jpeg(img)
            } else {
                let resized = img.resize(size, size, FilterType::Lanczos3);
                encode_jpeg(&resized)
            };
            (size, bytes)
        })
        .collect()
}

fn encode_jpeg(img: &DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    let rgb = img.to_rgb8();
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    use image::ImageEncoder;
    let (w, h) = (rgb.width(), rgb.height());
    encoder
        .write_image(rgb.as_raw(), w, h, image::ExtendedColorType::Rgb8)
        .expect("in-memory JPEG encode must not fail");
    buf
}

/// Apply an EXIF orientation transform (values 1-8) to a decoded image.
pub fn apply_orientation(img: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_upscales_below_source_size() {
        let img = DynamicImage::new_rgb8(800, 600);
        let sizes = generate_all(&img);
        let bytes_1024 = sizes.get(&1024).unwrap();
        let decoded = image::load_from_memory(bytes_1024).unwrap();
        let (w, h) = decoded.dimensions();
        assert_eq!(w.max(h), 800);
    }

    #[test]
    fn downscales_to_longest_edge() {
        let img = DynamicImage::new_rgb8(4000, 2000);
        let sizes = generate_all(&img);
        let bytes_256 = sizes.get(&256).unwrap();
        let decoded = image::load_from_memory(bytes_256).unwrap();
        let (w, h) = decoded.dimensions();
        assert_eq!(w, 256);
        assert_eq!(h, 128);
    }

    #[test]
    fn produces_all_four_sizes() {
        let img = DynamicImage::new_rgb8(2000, 2000);
        let sizes = generate_all(&img);
        assert_eq!(sizes.len(), 4);
        for s in THUMBNAIL_SIZES {
            assert!(sizes.contains_key(&s));
        }
    }
}
