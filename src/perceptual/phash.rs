//! 64-bit DCT perceptual hash. Downscale to 32x32 grayscale,
//! apply a 2D DCT, retain the top-left 8x8 low-frequency block, threshold
//! against the block's median, and serialise as 16 lowercase hex
//! characters.

use image::{imageops::FilterType, DynamicImage};

const DCT_SIZE: usize = 32;
const HASH_BLOCK: usize = 8;

pub fn compute(img: &DynamicImage) -> String {
    let gray = img
        .resize_exact(DCT_SIZE as u32, DCT_SIZE as u32, FilterType::Lanczos3)
        .to_luma8();

    let mut matrix = vec![vec![0.0f64; DCT_SIZE]; DCT_SIZE];
    for y in 0..DCT_SIZE {
        for x in 0..DCT_SIZE {
            matrix[y][x] = gray.get_pixel(x as u32, y as u32).0[0] as f64;
        }
    }

    let dct = dct_2d(&matrix);

    let mut block = Vec::with_capacity(HASH_BLOCK * HASH_BLOCK);
    for row in dct.iter().take(HASH_BLOCK) {
        for &value in row.iter().take(HASH_BLOCK) {
            block.push(value);
        }
    }

    let median = median_of(&block);

    let mut bits: u64 = 0;
    for (i, &value) in block.iter().enumerate() {
        if value > median {
            bits |= 1u64 << i;
        }
    }

    format!("{:016x}", bits)
}

/// Hamming distance between two 16-hex-character perceptual hashes.
/// Returns `None` if either string is not valid hex.
pub fn hamming_distance(a: &str, b: &str) -> Option<u32> {
    let a = u64::from_str_radix(a, 16).ok()?;
    let b = u64::from_str_radix(b, 16).ok()?;
    Some((a ^ b).count_ones())
}

/// Similarity classification by Hamming distance.
pub fn similarity_class(distance: u32) -> &'static str {
    match distance {
        0..=5 => "exact",
        6..=10 => "near",
        11..=15 => "similar",
        _ => "different",
    }
}

fn dct_2d(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = matrix.len();
    let mut rows_transformed = vec![vec![0.0; n]; n];
    for (y, row) in matrix.iter().enumerate() {
        rows_transformed[y] = dct_1d(row);
    }

    let mut result = vec![vec![0.0; n]; n];
    for x in 0..n {
        let column: Vec<f64> = rows_transformed.iter().map(|row| row[x]).collect();
        let transformed = dct_1d(&column);
        for (y, value) in transformed.into_iter().enumerate() {
            result[y][x] = value;
        }
    }
    result
}

/// 1-D DCT-II with orthonormal scaling.
fn dct_1d(input: &[f64]) -> Vec<f64> {
    let n = input.len();
    let mut output = vec![0.0; n];
    for (k, out) in output.iter_mut().enumerate() {
        let mut sum = 0.0;
        for (i, &value) in input.iter().enumerate() {
            sum += value
                * ((std::f64::consts::PI / n as f64) * (i as f64 + 0.5) * k as f64).cos();
        }
        let scale = if k == 0 {
            (1.0 / n as f64).sqrt()
        } else {
            (2.0 / n as f64).sqrt()
        };
        *out = sum * scale;
    }
    output
}

fn median_of(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_16_lowercase_hex_chars() {
        let img = DynamicImage::new_rgb8(64, 64);
        let hash = compute(&img);
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[test]
    fn identical_images_hash_identically() {
        let img = DynamicImage::new_rgb8(100, 100);
        assert_eq!(compute(&img), compute(&img));
    }

    #[test]
    fn hamming_distance_of_identical_hashes_is_zero() {
        let h = "a1b2c3d4e5f60718";
        assert_eq!(hamming_distance(h, h), Some(0));
    }

    #[test]
    fn similarity_class_thresholds() {
        assert_eq!(similarity_class(0), "exact");
        assert_eq!(similarity_class(5), "exact");
        assert_eq!(similarity_class(6), "near");
        assert_eq!(similarity_class(10), "near");
        assert_eq!(similarity_class(11), "similar");
        assert_eq!(similarity_class(15), "similar");
        assert_eq!(similarity_class(16), "different");
    }
}
