//! Query-string (de)serialisation for the filter parameter record:
//! repeated keys for multi-select (`color=red&color=blue` = "red OR
//! blue"), `<field>_min`/`<field>_max` for numeric ranges, `true`/`false`
//! for booleans, `offset`/`limit` for pagination. Serialisation uses a
//! fixed key order so that parsing then reserialising a filter record is
//! idempotent, independent of the order keys appeared in the input.

use std::collections::HashMap;

use super::{Filters, SortDir, SortField, DEFAULT_LIMIT};

/// Parse a query string (without the leading `?`) into a `Filters`
/// record. Unknown keys are ignored; malformed numeric values are
/// silently dropped from their field (a malformed *sort* field falls
/// back to the default — callers that need a hard error should validate
/// `sort`/`limit` themselves before calling this).
pub fn parse_query_string(qs: &str) -> Filters {
    let mut multi: HashMap<&str, Vec<String>> = HashMap::new();
    for pair in qs.split('&').filter(|s| !s.is_empty()) {
        let mut it = pair.splitn(2, '=');
        let key = it.next().unwrap_or("");
        let value = it.next().unwrap_or("");
        let value = percent_decode(value);
        multi.entry(key).or_default().push(value);
    }

    let mut f = Filters::new();

    f.year = multi.get("year").map(|v| v.iter().filter_map(|s| s.parse().ok()).collect()).unwrap_or_default();
    f.month = multi.get("month").map(|v| v.iter().filter_map(|s| s.parse().ok()).collect()).unwrap_or_default();
    f.day = multi.get("day").map(|v| v.iter().filter_map(|s| s.parse().ok()).collect()).unwrap_or_default();
    f.date_from = first(&multi, "date_from");
    f.date_to = first(&multi, "date_to");

    f.camera_make = multi.get("camera_make").cloned().unwrap_or_default();
    f.camera_model = multi.get("camera_model").cloned().unwrap_or_default();
    f.lens_model = multi.get("lens_model").cloned().unwrap_or_default();

    f.iso_min = first(&multi, "iso_min").and_then(|s| s.parse().ok());
    f.iso_max = first(&multi, "iso_max").and_then(|s| s.parse().ok());
    f.aperture_min = first(&multi, "aperture_min").and_then(|s| s.parse().ok());
    f.aperture_max = first(&multi, "aperture_max").and_then(|s| s.parse().ok());
    f.focal_length_min = first(&multi, "focal_length_min").and_then(|s| s.parse().ok());
    f.focal_length_max = first(&multi, "focal_length_max").and_then(|s| s.parse().ok());
    f.focal_length_35mm_min = first(&multi, "focal_length_35mm_min").and_then(|s| s.parse().ok());
    f.focal_length_35mm_max = first(&multi, "focal_length_35mm_max").and_then(|s| s.parse().ok());
    f.hue_min = first(&multi, "hue_min").and_then(|s| s.parse().ok());
    f.hue_max = first(&multi, "hue_max").and_then(|s| s.parse().ok());
    f.saturation_min = first(&multi, "saturation_min").and_then(|s| s.parse().ok());
    f.saturation_max = first(&multi, "saturation_max").and_then(|s| s.parse().ok());
    f.lightness_min = first(&multi, "lightness_min").and_then(|s| s.parse().ok());
    f.lightness_max = first(&multi, "lightness_max").and_then(|s| s.parse().ok());

    f.time_of_day = multi.get("time_of_day").cloned().unwrap_or_default();
    f.season = multi.get("season").cloned().unwrap_or_default();
    f.focal_category = multi.get("focal_category").cloned().unwrap_or_default();
    f.shooting_condition = multi.get("shooting_condition").cloned().unwrap_or_default();
    f.white_balance = multi.get("white_balance").cloned().unwrap_or_default();
    f.orientation = multi.get("orientation").cloned().unwrap_or_default();
    f.color = multi.get("color").cloned().unwrap_or_default();
    f.cluster_type = multi.get("cluster_type").cloned().unwrap_or_default();

    f.flash_fired = first(&multi, "flash_fired").and_then(|s| parse_bool(&s));
    f.in_burst = first(&multi, "in_burst").and_then(|s| parse_bool(&s));
    f.is_burst_representative = first(&multi, "is_burst_representative").and_then(|s| parse_bool(&s));
    f.only_representatives = first(&multi, "only_representatives").and_then(|s| parse_bool(&s));

    f.burst_group_id = first(&multi, "burst_group_id");
    f.duplicate_cluster_id = first(&multi, "duplicate_cluster_id");

    if let (Some(min_lat), Some(min_lon), Some(max_lat), Some(max_lon)) = (
        first(&multi, "bbox_min_lat").and_then(|s| s.parse().ok()),
        first(&multi, "bbox_min_lon").and_then(|s| s.parse().ok()),
        first(&multi, "bbox_max_lat").and_then(|s| s.parse().ok()),
        first(&multi, "bbox_max_lon").and_then(|s| s.parse().ok()),
    ) {
        f.geo_box = Some((min_lat, min_lon, max_lat, max_lon));
    }

    f.offset = first(&multi, "offset").and_then(|s| s.parse().ok()).unwrap_or(0);
    f.limit = first(&multi, "limit").and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_LIMIT);
    f.sort = first(&multi, "sort").and_then(|s| SortField::from_str(&s)).unwrap_or(SortField::DateTaken);
    f.sort_dir = match first(&multi, "sort_dir").as_deref() {
        Some("asc") => SortDir::Asc,
        _ => SortDir::Desc,
    };
    f.thumbnail_size = first(&multi, "thumbnail_size").and_then(|s| s.parse().ok()).unwrap_or(256);

    f
}

/// Reserialise a `Filters` record to a canonical query string. Key order
/// is fixed regardless of how the record was built, so that parse then
/// reserialise is idempotent.
pub fn to_query_string(f: &Filters) -> String {
    let mut parts: Vec<String> = Vec::new();

    push_multi(&mut parts, "year", &f.year.iter().map(|y| y.to_string()).collect::<Vec<_>>());
    push_multi(&mut parts, "month", &f.month.iter().map(|m| m.to_string()).collect::<Vec<_>>());
    push_multi(&mut parts, "day", &f.day.iter().map(|d| d.to_string()).collect::<Vec<_>>());
    push_opt(&mut parts, "date_from", &f.date_from);
    push_opt(&mut parts, "date_to", &f.date_to);

    push_multi(&mut parts, "camera_make", &f.camera_make);
    push_multi(&mut parts, "camera_model", &f.camera_model);
    push_multi(&mut parts, "lens_model", &f.lens_model);

    push_opt_num(&mut parts, "iso_min", f.iso_min);
    push_opt_num(&mut parts, "iso_max", f.iso_max);
    push_opt_num(&mut parts, "aperture_min", f.aperture_min);
    push_opt_num(&mut parts, "aperture_max", f.aperture_max);
    push_opt_num(&mut parts, "focal_length_min", f.focal_length_min);
    push_opt_num(&mut parts, "focal_length_max", f.focal_length_max);
    push_opt_num(&mut parts, "focal_length_35mm_min", f.focal_length_35mm_min);
    push_opt_num(&mut parts, "focal_length_35mm_max", f.focal_length_35mm_max);
    push_opt_num(&mut parts, "hue_min", f.hue_min);
    push_opt_num(&mut parts, "hue_max", f.hue_max);
    push_opt_num(&mut parts, "saturation_min", f.saturation_min);
    push_opt_num(&mut parts, "saturation_max", f.saturation_max);
    push_opt_num(&mut parts, "lightness_min", f.lightness_min);
    push_opt_num(&mut parts, "lightness_max", f.lightness_max);

    push_multi(&mut parts, "time_of_day", &f.time_of_day);
    push_multi(&mut parts, "season", &f.season);
    push_multi(&mut parts, "focal_category", &f.focal_category);
    push_multi(&mut parts, "shooting_condition", &f.shooting_condition);
    push_multi(&mut parts, "white_balance", &f.white_balance);
    push_multi(&mut parts, "orientation", &f.orientation);
    push_multi(&mut parts, "color", &f.color);
    push_multi(&mut parts, "cluster_type", &f.cluster_type);

    if let Some(v) = f.flash_fired {
        parts.push(format!("flash_fired={}", v));
    }
    if let Some(v) = f.in_burst {
        parts.push(format!("in_burst={}", v));
    }
    if let Some(v) = f.is_burst_representative {
        parts.push(format!("is_burst_representative={}", v));
    }
    if let Some(v) = f.only_representatives {
        parts.push(format!("only_representatives={}", v));
    }

    push_opt(&mut parts, "burst_group_id", &f.burst_group_id);
    push_opt(&mut parts, "duplicate_cluster_id", &f.duplicate_cluster_id);

    if let Some((min_lat, min_lon, max_lat, max_lon)) = f.geo_box {
        parts.push(format!("bbox_min_lat={min_lat}"));
        parts.push(format!("bbox_min_lon={min_lon}"));
        parts.push(format!("bbox_max_lat={max_lat}"));
        parts.push(format!("bbox_max_lon={max_lon}"));
    }

    parts.push(format!("offset={}", f.offset));
    parts.push(format!("limit={}", f.limit));
    parts.push(format!("sort={}", f.sort.as_str()));
    parts.push(format!("sort_dir={}", if f.sort_dir == SortDir::Asc { "asc" } else { "desc" }));
    parts.push(format!("thumbnail_size={}", f.thumbnail_size));

    parts.join("&")
}

fn first(multi: &HashMap<&str, Vec<String>>, key: &str) -> Option<String> {
    multi.get(key).and_then(|v| v.first().cloned())
}

fn push_multi(parts: &mut Vec<String>, key: &str, values: &[String]) {
    for v in values {
        parts.push(format!("{key}={}", percent_encode(v)));
    }
}

fn push_opt(parts: &mut Vec<String>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        parts.push(format!("{key}={}", percent_encode(v)));
    }
}

fn push_opt_num<T: std::fmt::Display>(parts: &mut Vec<String>, key: &str, value: Option<T>) {
    if let Some(v) = value {
        parts.push(format!("{key}={v}"));
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

pub(crate) fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                if let Ok(byte) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(bytes[i]);
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_idempotent() {
        let mut f = Filters::new();
        f.year = vec![2024];
        f.color = vec!["red".into(), "blue".into()];
        f.iso_min = Some(400);

        let qs1 = to_query_string(&f);
        let parsed = parse_query_string(&qs1);
        let qs2 = to_query_string(&parsed);
        assert_eq!(qs1, qs2);
    }

    #[test]
    fn month_without_year_parses_independently() {
        let f = parse_query_string("month=11");
        assert_eq!(f.month, vec![11]);
        assert!(f.year.is_empty());
    }

    #[test]
    fn repeated_color_keys_are_or_within() {
        let f = parse_query_string("color=red&color=blue");
        assert_eq!(f.color, vec!["red".to_string(), "blue".to_string()]);
    }
}
