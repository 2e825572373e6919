//! Dominant-colour palette extraction. k-means in RGB space,
//! k=5, iteration cap 100, operating on a 256-edge thumbnail for cost
//! reasons. Centroid seeding is deterministic: a fixed-stride pick over
//! the luminance-sorted pixel sample, not k-means++ or any RNG.

use image::{imageops::FilterType, DynamicImage, GenericImageView};

const K: usize = 5;
const MAX_ITERATIONS: usize = 100;
const PALETTE_EDGE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DominantColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Hue in [0, 360).
    pub h: f64,
    /// Saturation in [0, 100].
    pub s: f64,
    /// Lightness in [0, 100].
    pub l: f64,
    /// Fraction of sampled pixels assigned to this centroid, in [0, 1].
    pub weight: f64,
}

/// Extract the 5-colour dominant palette. Returns `None` only if the
/// image has zero pixels (extraction failure).
pub fn extract(img: &DynamicImage) -> Option<Vec<DominantColor>> {
    let scaled = if img.width().max(img.height()) > PALETTE_EDGE {
        img.resize(PALETTE_EDGE, PALETTE_EDGE, FilterType::Triangle)
    } else {
        img.clone()
    };

    let rgb = scaled.to_rgb8();
    let mut samples: Vec<[f64; 3]> = rgb
        .pixels()
        .map(|p| [p.0[0] as f64, p.0[1] as f64, p.0[2] as f64])
        .collect();

    if samples.is_empty() {
        return None;
    }

    samples.sort_by(|a, b| luminance(a).partial_cmp(&luminance(b)).unwrap());

    let mut centroids = seed_centroids(&samples);
    let mut assignments = vec![0usize; samples.len()];

    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (i, sample) in samples.iter().enumerate() {
            let nearest = nearest_centroid(sample, &centroids);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }

        let mut sums = vec![[0.0f64; 3]; K];
        let mut counts = vec![0usize; K];
        for (i, sample) in samples.iter().enumerate() {
            let c = assignments[i];
            sums[c][0] += sample[0];
            sums[c][1] += sample[1];
            sums[c][2] += sample[2];
            counts[c] += 1;
        }
        for c in 0..K {
            if counts[c] > 0 {
                centroids[c] = [
                    sums[c][0] / counts[c] as f64,
                    sums[c][1] / counts[c] as f64,
                    sums[c][2] / counts[c] as f64,
                ];
            }
        }

        if !changed {
            break;
        }
    }

    let mut counts = vec![0usize; K];
    for &c in &assignments {
        counts[c] += 1;
    }
    let total = samples.len() as f64;

    Some(
        centroids
            .iter()
            .zip(counts.iter())
            .map(|(centroid, &count)| {
                let r = centroid[0].round().clamp(0.0, 255.0) as u8;
                let g = centroid[1].round().clamp(0.0, 255.0) as u8;
                let b = centroid[2].round().clamp(0.0, 255.0) as u8;
                let (h, s, l) = rgb_to_hsl(r, g, b);
                DominantColor {
                    r,
                    g,
                    b,
                    h,
                    s,
                    l,
                    weight: count as f64 / total,
                }
            })
            .collect(),
    )
}

fn luminance(sample: &[f64; 3]) -> f64 {
    0.299 * sample[0] + 0.587 * sample[1] + 0.114 * sample[2]
}

/// Deterministic seeding: pick every `n/k`-th sample from the
/// luminance-sorted list, centered within each stride bucket.
fn seed_centroids(sorted_samples: &[[f64; 3]]) -> Vec<[f64; 3]> {
    let n = sorted_samples.len();
    (0..K)
        .map(|i| {
            let idx = ((2 * i + 1) * n) / (2 * K);
            sorted_samples[idx.min(n - 1)]
        })
        .collect()
}

fn nearest_centroid(sample: &[f64; 3], centroids: &[[f64; 3]]) -> usize {
    centroids
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            squared_distance(sample, a)
                .partial_cmp(&squared_distance(sample, b))
                .unwrap()
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn squared_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

/// Convert RGB to HSL. H is undefined for chroma-zero inputs; represented
/// as 0 (S will be 0 too, disambiguating achromatic colours).
fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let rf = r as f64 / 255.0;
    let gf = g as f64 / 255.0;
    let bf = b as f64 / 255.0;

    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let l = (max + min) / 2.0;

    if delta.abs() < f64::EPSILON {
        return (0.0, 0.0, l * 100.0);
    }

    let s = if l < 0.5 {
        delta / (max + min)
    } else {
        delta / (2.0 - max - min)
    };

    let h = if (max - rf).abs() < f64::EPSILON {
        60.0 * (((gf - bf) / delta) % 6.0)
    } else if (max - gf).abs() < f64::EPSILON {
        60.0 * (((bf - rf) / delta) + 2.0)
    } else {
        60.0 * (((rf - gf) / delta) + 4.0)
    };

    let h = if h < 0.0 { h + 360.0 } else { h };

    (h, s * 100.0, l * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn extracts_five_colors_summing_to_one() {
        let mut img = RgbImage::new(64, 64);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = if (x / 8 + y / 8) % 2 == 0 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            };
        }
        let palette = extract(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(palette.len(), 5);
        let total_weight: f64 = palette.iter().map(|c| c.weight).sum();
        assert!((total_weight - 1.0).abs() < 0.01, "weights must sum to ~1, got {total_weight}");
    }

    #[test]
    fn is_deterministic_across_runs() {
        let mut img = RgbImage::new(32, 32);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgb([(x * 7) as u8, (y * 5) as u8, 128]);
        }
        let dynimg = DynamicImage::ImageRgb8(img);
        let first = extract(&dynimg).unwrap();
        let second = extract(&dynimg).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn achromatic_gray_has_zero_hue_and_saturation() {
        let (h, s, l) = rgb_to_hsl(128, 128, 128);
        assert_eq!(h, 0.0);
        assert_eq!(s, 0.0);
        assert!((l - 50.2).abs() < 1.0);
    }
}
