//! Inference: purely functional mapping from metadata to
//! category labels. No external dependencies, no I/O.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Time-of-day bucket from the capture hour (local-naive, as stored).
pub fn time_of_day(capture: DateTime<Utc>) -> &'static str {
    match capture.hour() {
        5..=6 => "golden_hour_morning",
        7..=10 => "morning",
        11..=14 => "midday",
        15..=17 => "afternoon",
        18..=19 => "golden_hour_evening",
        20..=21 => "blue_hour",
        _ => "night",
    }
}

/// Season from the capture month, Northern-hemisphere convention.
pub fn season(capture: DateTime<Utc>) -> &'static str {
    match capture.month() {
        3..=5 => "spring",
        6..=8 => "summer",
        9..=11 => "autumn",
        _ => "winter",
    }
}

/// Focal category from the 35-mm-equivalent focal length. Boundaries:
/// `<35` wide, `[35,70]` normal, `(70,200]` telephoto, `>200`
/// super_telephoto.
pub fn focal_category(focal_length_35mm: f64) -> &'static str {
    if focal_length_35mm < 35.0 {
        "wide"
    } else if focal_length_35mm <= 70.0 {
        "normal"
    } else if focal_length_35mm <= 200.0 {
        "telephoto"
    } else {
        "super_telephoto"
    }
}

/// Shooting condition from flash-fired and ISO.
pub fn shooting_condition(flash_fired: bool, iso: i64) -> &'static str {
    if flash_fired {
        "flash"
    } else if iso <= 400 {
        "bright"
    } else if iso <= 1599 {
        "moderate"
    } else {
        "low_light"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, 15, hour, 0, 0).unwrap()
    }

    #[test]
    fn time_of_day_buckets() {
        assert_eq!(time_of_day(at(6, 1)), "golden_hour_morning");
        assert_eq!(time_of_day(at(9, 1)), "morning");
        assert_eq!(time_of_day(at(12, 1)), "midday");
        assert_eq!(time_of_day(at(16, 1)), "afternoon");
        assert_eq!(time_of_day(at(19, 1)), "golden_hour_evening");
        assert_eq!(time_of_day(at(21, 1)), "blue_hour");
        assert_eq!(time_of_day(at(2, 1)), "night");
    }

    #[test]
    fn season_buckets() {
        assert_eq!(season(at(12, 3)), "spring");
        assert_eq!(season(at(12, 7)), "summer");
        assert_eq!(season(at(12, 10)), "autumn");
        assert_eq!(season(at(12, 1)), "winter");
    }

    #[test]
    fn focal_category_boundaries() {
        assert_eq!(focal_category(20.0), "wide");
        assert_eq!(focal_category(34.9), "wide");
        assert_eq!(focal_category(35.0), "normal");
        assert_eq!(focal_category(70.0), "normal");
        assert_eq!(focal_category(70.1), "telephoto");
        assert_eq!(focal_category(200.0), "telephoto");
        assert_eq!(focal_category(200.1), "super_telephoto");
    }

    #[test]
    fn shooting_condition_buckets() {
        assert_eq!(shooting_condition(true, 100), "flash");
        assert_eq!(shooting_condition(false, 400), "bright");
        assert_eq!(shooting_condition(false, 1599), "moderate");
        assert_eq!(shooting_condition(false, 1600), "low_light");
    }
}
