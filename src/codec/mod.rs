//! Codec layer: decode JPEG/BMP natively; for RAW, attempt a
//! full demosaic and fall back to the largest embedded JPEG preview.
//!
//! The RAW backend is a capability interface (`RawDecoder`) selected at
//! build time via Cargo features — `raw-rawler` (default) wraps the
//! `rawler` crate's demosaic path, `raw-preview-only` skips straight to
//! preview extraction. The embedded-preview fallback itself is *not* part
//! of either backend: it's intrinsic to `decode_raw`, a contract property
//! rather than a backend property.

#[cfg(feature = "raw-rawler")]
mod raw_rawler;
#[cfg(feature = "raw-preview-only")]
mod raw_preview;

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GenericImageView};

use crate::error::PipelineError;

/// Minimum mean luminance (0-255 scale) below which a decoded RAW image is
/// judged "black" and rejected in favour of the embedded-preview fallback.
const BLACK_LUMINANCE_THRESHOLD: f64 = 10.0;

/// Recognised file formats, derived from extension (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Bmp,
    Raw,
}

impl ImageFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "bmp" => Some(ImageFormat::Bmp),
            "dng" | "cr2" | "cr3" | "nef" | "arw" | "raf" | "rw2" | "orf" | "pef" => {
                Some(ImageFormat::Raw)
            }
            _ => None,
        }
    }

    /// The extension set the orchestrator's directory walk filters on.
    pub fn supported_extensions() -> &'static [&'static str] {
        &[
            "jpg", "jpeg", "bmp", "dng", "cr2", "cr3", "nef", "arw", "raf", "rw2", "orf", "pef",
        ]
    }
}

/// A capability interface over RAW-codec backends.
/// Implementations attempt a full demosaic; `decode_raw` below is
/// responsible for judging the result and falling back to preview
/// extraction, not the implementation itself.
pub trait RawDecoder {
    fn decode_full(&self, path: &Path) -> Result<DynamicImage, PipelineError>;
}

#[cfg(feature = "raw-rawler")]
fn default_raw_decoder() -> impl RawDecoder {
    raw_rawler::RawlerDecoder
}

#[cfg(all(feature = "raw-preview-only", not(feature = "raw-rawler")))]
fn default_raw_decoder() -> impl RawDecoder {
    raw_preview::PreviewOnlyDecoder
}

/// Decode an image at `path` for the given format, producing a rasterised
/// image for downstream processing. Always reads the raw file bytes once
/// and reuses them for both decode and content hashing by the caller.
pub fn decode(path: &Path, format: ImageFormat) -> Result<DynamicImage, PipelineError> {
    match format {
        ImageFormat::Jpeg | ImageFormat::Bmp => decode_native(path),
        ImageFormat::Raw => decode_raw(path),
    }
}

fn decode_native(path: &Path) -> Result<DynamicImage, PipelineError> {
    image::open(path).map_err(|e| PipelineError::decode(path, e.to_string()))
}

/// RAW decoding policy:
/// 1. Attempt full RAW decode. Accept if non-degenerate (mean luminance
///    above threshold).
/// 2. On failure or a "black" result, fall back to embedded-preview
///    extraction: first the EXIF `JPEGInterchangeFormat` tags (fast),
///    then a brute-force scan for JPEG start/end markers, picking the
///    largest valid candidate.
/// 3. If neither succeeds, fail with a `Decode` error.
fn decode_raw(path: &Path) -> Result<DynamicImage, PipelineError> {
    let decoder = default_raw_decoder();

    let full_decode = decoder.decode_full(path);
    if let Ok(img) = &full_decode {
        if is_black(img) {
            log::debug!(
                "RAW full decode of {} judged black (mean luminance below threshold); falling back to embedded preview",
                path.display()
            );
        } else if let Some((ew, eh)) = exif_dimensions(path) {
            let (dw, dh) = img.dimensions();
            if dw == ew && dh == eh {
                return full_decode;
            }
            log::debug!(
                "RAW full decode of {} is {}x{}, EXIF reports {}x{}; falling back to embedded preview",
                path.display(),
                dw,
                dh,
                ew,
                eh
            );
        } else {
            return full_decode;
        }
    } else if let Err(e) = &full_decode {
        log::debug!("RAW full decode of {} failed: {}", path.display(), e);
    }

    extract_embedded_preview(path)
        .ok_or_else(|| PipelineError::decode(path, "no full decode and no embedded preview found"))
}

/// The EXIF-reported pixel dimensions of the primary image, if present.
/// Used to reject a full RAW decode whose dimensions don't match what the
/// file's own EXIF block claims.
fn exif_dimensions(path: &Path) -> Option<(u32, u32)> {
    let file = std::fs::File::open(path).ok()?;
    let mut reader = std::io::BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;

    let width = exif
        .get_field(exif::Tag::PixelXDimension, exif::In::PRIMARY)?
        .value
        .get_uint(0)?;
    let height = exif
        .get_field(exif::Tag::PixelYDimension, exif::In::PRIMARY)?
        .value
        .get_uint(0)?;
    Some((width, height))
}

/// Mean luminance, 0-255 scale, of a downsampled sample of the image.
fn is_black(img: &DynamicImage) -> bool {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return true;
    }
    let sample = img.thumbnail(64, 64).to_luma8();
    if sample.is_empty() {
        return true;
    }
    let sum: u64 = sample.pixels().map(|p| p.0[0] as u64).sum();
    let mean = sum as f64 / sample.len() as f64;
    mean < BLACK_LUMINANCE_THRESHOLD
}

/// Embedded-preview extraction, intrinsic to the `decode_raw` contract
/// (not part of either RAW backend). Tries the EXIF
/// `JPEGInterchangeFormat`/`...Length` tags first (fast path, the same
/// one ordinary JPEG EXIF thumbnail extraction uses), then falls back
/// to a brute-force scan of the file bytes
/// for JPEG start/end markers (`0xFFD8` ... `0xFFD9`), decoding every
/// candidate and keeping the one with the largest valid dimensions.
pub fn extract_embedded_preview(path: &Path) -> Option<DynamicImage> {
    let bytes = std::fs::read(path).ok()?;

    if let Some(data) = extract_exif_preview(&bytes) {
        if let Ok(img) = image::load_from_memory(&data) {
            return Some(img);
        }
    }

    scan_for_largest_jpeg(&bytes)
}

fn extract_exif_preview(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut cursor = Cursor::new(bytes);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;

    let offset = exif
        .get_field(exif::Tag::JPEGInterchangeFormat, exif::In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    let length = exif
        .get_field(exif::Tag::JPEGInterchangeFormatLength, exif::In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;

    if length == 0 || offset.checked_add(length)? > bytes.len() {
        return None;
    }
    Some(bytes[offset..offset + length].to_vec())
}

/// Scan raw bytes for every `0xFFD8 ... 0xFFD9` span, decode each
/// candidate, and return the one with the largest pixel area. Logs the
/// dimensions chosen and the candidate count.
fn scan_for_largest_jpeg(bytes: &[u8]) -> Option<DynamicImage> {
    let mut candidates = 0usize;
    let mut best: Option<DynamicImage> = None;
    let mut best_area = 0u64;

    let mut i = 0usize;
    while i + 1 < bytes.len() {
        if bytes[i] == 0xFF && bytes[i + 1] == 0xD8 {
            if let Some(end) = find_eoi(bytes, i + 2) {
                candidates += 1;
                let slice = &bytes[i..end];
                if let Ok(img) = image::load_from_memory(slice) {
                    let (w, h) = img.dimensions();
                    let area = w as u64 * h as u64;
                    if area > best_area {
                        best_area = area;
                        best = Some(img);
                    }
                }
                i = end;
                continue;
            }
        }
        i += 1;
    }

    if let Some(img) = &best {
        let (w, h) = img.dimensions();
        log::info!(
            "embedded preview scan found {} candidate(s); chose {}x{}",
            candidates,
            w,
            h
        );
    }

    best
}

fn find_eoi(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    while i + 1 < bytes.len() {
        if bytes[i] == 0xFF && bytes[i + 1] == 0xD9 {
            return Some(i + 2);
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(ImageFormat::from_path(Path::new("a.JPG")), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_path(Path::new("a.dng")), Some(ImageFormat::Raw));
        assert_eq!(ImageFormat::from_path(Path::new("a.bmp")), Some(ImageFormat::Bmp));
        assert_eq!(ImageFormat::from_path(Path::new("a.txt")), None);
    }

    #[test]
    fn scan_for_largest_jpeg_picks_biggest_candidate() {
        let small = encode_solid_jpeg(4, 4);
        let large = encode_solid_jpeg(32, 32);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&small);
        bytes.extend_from_slice(&large);

        let found = scan_for_largest_jpeg(&bytes).expect("a candidate must be found");
        let (w, h) = found.dimensions();
        assert_eq!((w, h), (32, 32));
    }

    fn encode_solid_jpeg(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(w, h);
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
            .unwrap();
        buf
    }

    #[test]
    fn is_black_detects_zeroed_image() {
        let img = DynamicImage::new_rgb8(16, 16);
        assert!(is_black(&img));
    }
}
