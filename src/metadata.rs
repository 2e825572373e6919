//! Metadata Extractor and the canonical Photo record.
//!
//! Tag mapping is explicit and total: every field is either mapped from a
//! named EXIF tag or left null. Unknown vendor tags are ignored. GPS
//! coordinates are converted from EXIF rational degree/minute/second form
//! to signed decimal degrees. Uses `chrono` for calendar arithmetic
//! rather than hand-rolled date math.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// One row of the `photos` table. Identity, capture, temporal, geometry,
/// location, lighting, and RAW-provenance fields come from this module;
/// inferred/perceptual/membership fields are filled in by later pipeline
/// stages and carried here so a single record flows end to end through
/// the orchestrator.
#[derive(Debug, Clone)]
pub struct Photo {
    // Identity
    pub path: PathBuf,
    pub content_hash: [u8; 32],
    pub file_size: u64,
    pub mtime_ns: i64,
    pub indexed_at: DateTime<Utc>,

    // Capture
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub lens_make: Option<String>,
    pub lens_model: Option<String>,
    pub iso: Option<i64>,
    pub aperture: Option<f64>,
    pub shutter_speed: Option<String>,
    pub exposure_compensation: Option<f64>,
    pub focal_length: Option<f64>,
    pub focal_length_35mm: Option<f64>,

    // Temporal
    pub date_taken: Option<DateTime<Utc>>,
    pub date_digitized: Option<DateTime<Utc>>,

    // Geometry
    pub width: u32,
    pub height: u32,
    pub orientation: Option<u16>,
    pub color_space: Option<String>,

    // Location
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,

    // Lighting
    pub flash_fired: Option<bool>,
    pub white_balance: Option<String>,
    pub focus_distance: Option<f64>,

    // RAW provenance
    pub dng_version: Option<String>,
    pub original_raw_filename: Option<String>,

    // Inferred (filled in by `inference`)
    pub time_of_day: Option<String>,
    pub season: Option<String>,
    pub focal_category: Option<String>,
    pub shooting_condition: Option<String>,

    // Perceptual (filled in by `perceptual`)
    pub perceptual_hash: Option<String>,

    // Burst membership (filled in by `bursts`)
    pub burst_group_id: Option<String>,
    pub burst_sequence_index: Option<i64>,
    pub burst_group_size: Option<i64>,
    pub burst_representative: bool,

    // Duplicate membership (filled in by `duplicates`)
    pub duplicate_cluster_id: Option<String>,
    pub duplicate_cluster_size: Option<i64>,
    pub duplicate_representative: bool,
    pub duplicate_similarity_score: Option<f64>,
}

struct ExifFields {
    orientation: Option<u16>,
    date_taken: Option<DateTime<Utc>>,
    date_digitized: Option<DateTime<Utc>>,
    camera_make: Option<String>,
    camera_model: Option<String>,
    lens_make: Option<String>,
    lens_model: Option<String>,
    iso: Option<i64>,
    aperture: Option<f64>,
    shutter_speed: Option<String>,
    exposure_compensation: Option<f64>,
    focal_length: Option<f64>,
    focal_length_35mm: Option<f64>,
    color_space: Option<String>,
    flash_fired: Option<bool>,
    white_balance: Option<String>,
    focus_distance: Option<f64>,
    gps_latitude: Option<f64>,
    gps_longitude: Option<f64>,
    gps_altitude: Option<f64>,
    dng_version: Option<String>,
    original_raw_filename: Option<String>,
}

/// Extract the canonical metadata record for a decoded image. `width`/
/// `height` come from the already-decoded image (the codec layer's
/// output), not a second independent probe.
pub fn extract(path: &Path, width: u32, height: u32, content_hash: [u8; 32]) -> Photo {
    let fs_meta = std::fs::metadata(path).ok();
    let file_size = fs_meta.as_ref().map(|m| m.len()).unwrap_or(0);
    let mtime_ns = fs_meta
        .as_ref()
        .and_then(|m| m.modified().ok())
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0);

    let exif = read_exif(path);
    let e = exif.as_ref();

    Photo {
        path: path.to_path_buf(),
        content_hash,
        file_size,
        mtime_ns,
        indexed_at: Utc::now(),

        camera_make: e.and_then(|d| d.camera_make.clone()),
        camera_model: e.and_then(|d| d.camera_model.clone()),
        lens_make: e.and_then(|d| d.lens_make.clone()),
        lens_model: e.and_then(|d| d.lens_model.clone()),
        iso: e.and_then(|d| d.iso),
        aperture: e.and_then(|d| d.aperture),
        shutter_speed: e.and_then(|d| d.shutter_speed.clone()),
        exposure_compensation: e.and_then(|d| d.exposure_compensation),
        focal_length: e.and_then(|d| d.focal_length),
        focal_length_35mm: e.and_then(|d| d.focal_length_35mm),

        date_taken: e.and_then(|d| d.date_taken),
        date_digitized: e.and_then(|d| d.date_digitized),

        width,
        height,
        orientation: e.and_then(|d| d.orientation),
        color_space: e.and_then(|d| d.color_space.clone()),

        latitude: e.and_then(|d| d.gps_latitude),
        longitude: e.and_then(|d| d.gps_longitude),
        altitude: e.and_then(|d| d.gps_altitude),

        flash_fired: e.and_then(|d| d.flash_fired),
        white_balance: e.and_then(|d| d.white_balance.clone()),
        focus_distance: e.and_then(|d| d.focus_distance),

        dng_version: e.and_then(|d| d.dng_version.clone()),
        original_raw_filename: e.and_then(|d| d.original_raw_filename.clone()),

        time_of_day: None,
        season: None,
        focal_category: None,
        shooting_condition: None,

        perceptual_hash: None,

        burst_group_id: None,
        burst_sequence_index: None,
        burst_group_size: None,
        burst_representative: false,

        duplicate_cluster_id: None,
        duplicate_cluster_size: None,
        duplicate_representative: false,
        duplicate_similarity_score: None,
    }
}

fn read_exif(path: &Path) -> Option<ExifFields> {
    let file = std::fs::File::open(path).ok()?;
    let mut reader = std::io::BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;

    let get_str = |tag| {
        exif.get_field(tag, exif::In::PRIMARY)
            .map(|f| f.display_value().to_string())
    };

    Some(ExifFields {
        orientation: exif
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
            .map(|v| v as u16),
        date_taken: get_str(exif::Tag::DateTimeOriginal).and_then(|s| parse_exif_datetime(&s)),
        date_digitized: get_str(exif::Tag::DateTimeDigitized)
            .and_then(|s| parse_exif_datetime(&s)),
        camera_make: get_str(exif::Tag::Make),
        camera_model: get_str(exif::Tag::Model),
        lens_make: get_str(exif::Tag::LensMake),
        lens_model: get_str(exif::Tag::LensModel),
        iso: exif
            .get_field(exif::Tag::PhotographicSensitivity, exif::In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
            .map(|v| v as i64),
        aperture: get_str(exif::Tag::FNumber).and_then(|s| parse_leading_f64(&s)),
        shutter_speed: get_str(exif::Tag::ExposureTime),
        exposure_compensation: get_str(exif::Tag::ExposureBiasValue)
            .and_then(|s| parse_leading_f64(&s)),
        focal_length: get_str(exif::Tag::FocalLength).and_then(|s| parse_leading_f64(&s)),
        focal_length_35mm: exif
            .get_field(exif::Tag::FocalLengthIn35mmFilm, exif::In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
            .map(|v| v as f64),
        color_space: get_str(exif::Tag::ColorSpace),
        flash_fired: exif
            .get_field(exif::Tag::Flash, exif::In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
            .map(|v| v & 0x1 != 0),
        white_balance: get_str(exif::Tag::WhiteBalance),
        focus_distance: get_str(exif::Tag::SubjectDistance).and_then(|s| parse_leading_f64(&s)),
        gps_latitude: parse_gps_coord(&exif, exif::Tag::GPSLatitude, exif::Tag::GPSLatitudeRef),
        gps_longitude: parse_gps_coord(&exif, exif::Tag::GPSLongitude, exif::Tag::GPSLongitudeRef),
        gps_altitude: exif
            .get_field(exif::Tag::GPSAltitude, exif::In::PRIMARY)
            .and_then(|f| match &f.value {
                exif::Value::Rational(v) => v.first().map(|r| r.to_f64()),
                _ => None,
            }),
        dng_version: get_str(exif::Tag::DNGVersion),
        original_raw_filename: get_str(exif::Tag::Tag(exif::Context::Tiff, 0xC68B)),
    })
}

/// EXIF datetime format: "YYYY:MM:DD HH:MM:SS".
fn parse_exif_datetime(s: &str) -> Option<DateTime<Utc>> {
    if s.len() < 19 {
        return None;
    }
    let date = s[..10].replace(':', "-");
    let normalized = format!("{} {}", date, &s[11..19]);
    let ndt = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S").ok()?;
    Some(Utc.from_utc_datetime(&ndt))
}

/// Parse the leading numeric portion of an EXIF display value such as
/// "f/2.8" or "35 mm" or "-0.33".
fn parse_leading_f64(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit() && *c != '-')
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().ok()
}

fn parse_gps_coord(exif: &exif::Exif, coord_tag: exif::Tag, ref_tag: exif::Tag) -> Option<f64> {
    let field = exif.get_field(coord_tag, exif::In::PRIMARY)?;
    let rationals = match &field.value {
        exif::Value::Rational(v) if v.len() >= 3 => v,
        _ => return None,
    };

    let degrees = rationals[0].to_f64();
    let minutes = rationals[1].to_f64();
    let seconds = rationals[2].to_f64();
    let mut coord = degrees + minutes / 60.0 + seconds / 3600.0;

    let ref_field = exif.get_field(ref_tag, exif::In::PRIMARY)?;
    let ref_str = ref_field.display_value().to_string();
    if ref_str == "S" || ref_str == "W" {
        coord = -coord;
    }

    Some(coord)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_exif_datetime_valid() {
        let dt = parse_exif_datetime("2024:03:15 12:30:45").unwrap();
        assert_eq!(
            dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2024-03-15 12:30:45"
        );
    }

    #[test]
    fn parse_exif_datetime_rejects_short() {
        assert!(parse_exif_datetime("short").is_none());
    }

    #[test]
    fn parse_leading_f64_handles_fnumber() {
        assert_eq!(parse_leading_f64("f/2.8"), Some(2.8));
        assert_eq!(parse_leading_f64("35 mm"), Some(35.0));
        assert_eq!(parse_leading_f64("-0.33"), Some(-0.33));
        assert_eq!(parse_leading_f64(""), None);
    }

    #[test]
    fn extract_handles_missing_exif() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("synthetic.jpg");
        let img = image::DynamicImage::new_rgb8(10, 10);
        img.save(&path).unwrap();

        let photo = extract(&path, 10, 10, [0u8; 32]);
        assert!(photo.camera_make.is_none());
        assert!(photo.date_taken.is_none());
        assert_eq!(photo.width, 10);
        assert_eq!(photo.height, 10);
    }
}
