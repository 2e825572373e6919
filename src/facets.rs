//! Facet Computer — the state-machine core. For each facet
//! dimension, computes the (value, count, selected, url) rows the UI
//! renders, applying the self-exclusion rule: a facet's own current
//! value(s) are dropped from the WHERE clause before grouping by that
//! facet's column, so the counts shown are always "what if I changed
//! only this dimension," never "what if I cleared everything."
//!
//! Shares its predicate plumbing with `crate::query`.

use std::time::{Duration, Instant};

use rusqlite::params_from_iter;
use rusqlite::types::Value;

use crate::catalog::Catalog;
use crate::error::PipelineError;
use crate::query::{self, FacetDim, Filters};

/// Soft aggregate time budget for one full facet set.
/// Facets whose turn comes after the budget is exceeded are omitted
/// entirely and the set is marked `truncated`, rather than delaying the
/// whole response for a slow tail.
const FACET_BUDGET: Duration = Duration::from_millis(200);

type ClauseList = Vec<(FacetDim, String, Vec<Value>)>;

#[derive(Debug, Clone)]
pub struct FacetValue {
    pub value: String,
    pub count: u64,
    pub selected: bool,
    /// The URL that transitions to this value's neighbour state,
    /// preserving every other filter unchanged.
    pub url: String,
}

#[derive(Debug, Clone)]
pub enum FacetResult {
    Discrete { dim: FacetDim, label: &'static str, values: Vec<FacetValue> },
    NumericRange {
        dim: FacetDim,
        label: &'static str,
        current_min: Option<f64>,
        current_max: Option<f64>,
        dataset_min: Option<f64>,
        dataset_max: Option<f64>,
    },
    Boolean { dim: FacetDim, label: &'static str, selected: bool, count_on: u64, url_on: String, url_off: String },
}

#[derive(Debug, Clone, Default)]
pub struct FacetSet {
    pub facets: Vec<FacetResult>,
    pub truncated: bool,
}

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// Compute every facet dimension for the current filter state.
pub fn compute_all(catalog: &Catalog, filters: &Filters) -> Result<FacetSet, PipelineError> {
    let start = Instant::now();
    let clauses = query::clauses_for_facets(filters);
    let mut set = FacetSet::default();

    macro_rules! budgeted {
        ($body:expr) => {
            if start.elapsed() > FACET_BUDGET {
                set.truncated = true;
            } else {
                set.facets.push($body?);
            }
        };
    }

    budgeted!(year_facet(catalog, filters, &clauses));
    budgeted!(month_facet(catalog, filters, &clauses));
    budgeted!(day_facet(catalog, filters, &clauses));

    budgeted!(discrete_facet(
        catalog, filters, &clauses, FacetDim::CameraMake, "Camera make", "photos.camera_make",
        &filters.camera_make, |f, v| toggle_vec(&mut f.camera_make, v)
    ));
    budgeted!(discrete_facet(
        catalog, filters, &clauses, FacetDim::CameraModel, "Camera model", "photos.camera_model",
        &filters.camera_model, |f, v| toggle_vec(&mut f.camera_model, v)
    ));
    budgeted!(discrete_facet(
        catalog, filters, &clauses, FacetDim::LensModel, "Lens", "photos.lens_model",
        &filters.lens_model, |f, v| toggle_vec(&mut f.lens_model, v)
    ));
    budgeted!(discrete_facet(
        catalog, filters, &clauses, FacetDim::TimeOfDay, "Time of day", "photos.time_of_day",
        &filters.time_of_day, |f, v| toggle_vec(&mut f.time_of_day, v)
    ));
    budgeted!(discrete_facet(
        catalog, filters, &clauses, FacetDim::Season, "Season", "photos.season",
        &filters.season, |f, v| toggle_vec(&mut f.season, v)
    ));
    budgeted!(discrete_facet(
        catalog, filters, &clauses, FacetDim::FocalCategory, "Focal category", "photos.focal_category",
        &filters.focal_category, |f, v| toggle_vec(&mut f.focal_category, v)
    ));
    budgeted!(discrete_facet(
        catalog, filters, &clauses, FacetDim::ShootingCondition, "Shooting condition", "photos.shooting_condition",
        &filters.shooting_condition, |f, v| toggle_vec(&mut f.shooting_condition, v)
    ));
    budgeted!(discrete_facet(
        catalog, filters, &clauses, FacetDim::WhiteBalance, "White balance", "photos.white_balance",
        &filters.white_balance, |f, v| toggle_vec(&mut f.white_balance, v)
    ));
    budgeted!(discrete_facet(
        catalog, filters, &clauses, FacetDim::Orientation, "Orientation", query::facet_orientation_expr(),
        &filters.orientation, |f, v| toggle_vec(&mut f.orientation, v)
    ));
    budgeted!(discrete_facet(
        catalog, filters, &clauses, FacetDim::Color, "Colour", query::facet_color_expr(),
        &filters.color, |f, v| toggle_vec(&mut f.color, v)
    ));
    budgeted!(discrete_facet(
        catalog, filters, &clauses, FacetDim::ClusterType, "Cluster type", "dc.cluster_type",
        &filters.cluster_type, |f, v| toggle_vec(&mut f.cluster_type, v)
    ));

    budgeted!(numeric_facet(catalog, filters, &clauses, FacetDim::Iso, "ISO", "photos.iso", filters.iso_min.map(|v| v as f64), filters.iso_max.map(|v| v as f64)));
    budgeted!(numeric_facet(catalog, filters, &clauses, FacetDim::Aperture, "Aperture", "photos.aperture", filters.aperture_min, filters.aperture_max));
    budgeted!(numeric_facet(catalog, filters, &clauses, FacetDim::FocalLength, "Focal length", "photos.focal_length", filters.focal_length_min, filters.focal_length_max));
    budgeted!(numeric_facet(catalog, filters, &clauses, FacetDim::Hue, "Hue", "pc1.hue", filters.hue_min, filters.hue_max));
    budgeted!(numeric_facet(catalog, filters, &clauses, FacetDim::Saturation, "Saturation", "pc1.saturation", filters.saturation_min, filters.saturation_max));
    budgeted!(numeric_facet(catalog, filters, &clauses, FacetDim::Lightness, "Lightness", "pc1.lightness", filters.lightness_min, filters.lightness_max));

    budgeted!(boolean_facet(
        catalog, filters, &clauses, FacetDim::FlashFired, "Flash fired", "photos.flash_fired = 1",
        filters.flash_fired.unwrap_or(false), |f, v| f.flash_fired = Some(v)
    ));
    budgeted!(boolean_facet(
        catalog, filters, &clauses, FacetDim::InBurst, "In a burst", "photos.burst_group_id IS NOT NULL",
        filters.in_burst.unwrap_or(false), |f, v| f.in_burst = Some(v)
    ));
    budgeted!(boolean_facet(
        catalog, filters, &clauses, FacetDim::IsBurstRepresentative, "Burst representative", "photos.burst_representative = 1",
        filters.is_burst_representative.unwrap_or(false), |f, v| f.is_burst_representative = Some(v)
    ));

    Ok(set)
}

fn group_query(
    catalog: &Catalog,
    expr: &str,
    where_sql: &str,
    params: &[Value],
) -> Result<Vec<(Option<String>, u64)>, PipelineError> {
    let sql = format!("SELECT {expr} AS v, COUNT(*) AS c {} WHERE {where_sql} GROUP BY v", query::FACET_BASE_FROM);
    let conn = catalog.connection();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)? as u64))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Ordering: selected first, then count descending, ties broken by
/// alphabetical/numeric natural order.
fn order_values(mut values: Vec<FacetValue>) -> Vec<FacetValue> {
    values.sort_by(|a, b| {
        b.selected
            .cmp(&a.selected)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| natural_cmp(&a.value, &b.value))
    });
    values
}

fn natural_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        _ => a.cmp(b),
    }
}

fn toggle_vec(vec: &mut Vec<String>, value: &str) {
    if let Some(pos) = vec.iter().position(|v| v == value) {
        vec.remove(pos);
    } else {
        vec.push(value.to_string());
    }
}

fn year_facet(catalog: &Catalog, filters: &Filters, clauses: &ClauseList) -> Result<FacetResult, PipelineError> {
    let (where_sql, params) = query::assemble_where(clauses, Some(FacetDim::Year));
    let rows = group_query(catalog, "COALESCE(strftime('%Y', photos.date_taken), 'Unknown')", &where_sql, &params)?;

    let values = rows
        .into_iter()
        .map(|(value, count)| {
            let value = value.unwrap_or_else(|| "Unknown".to_string());
            let selected = filters.year.iter().any(|y| format!("{y:04}") == value);
            let mut next = filters.clone();
            next.offset = 0;
            if let Ok(y) = value.parse::<i32>() {
                if let Some(pos) = next.year.iter().position(|v| *v == y) {
                    next.year.remove(pos);
                } else {
                    next.year.push(y);
                }
            }
            FacetValue { url: query::to_query_string(&next), value, count, selected }
        })
        .collect();

    Ok(FacetResult::Discrete { dim: FacetDim::Year, label: "Year", values: order_values(values) })
}

fn month_facet(catalog: &Catalog, filters: &Filters, clauses: &ClauseList) -> Result<FacetResult, PipelineError> {
    let (where_sql, params) = query::assemble_where(clauses, Some(FacetDim::Month));
    let rows = group_query(catalog, "CAST(strftime('%m', photos.date_taken) AS INTEGER)", &where_sql, &params)?;

    let values = rows
        .into_iter()
        .map(|(value, count)| {
            let month_num: Option<u32> = value.as_deref().and_then(|v| v.parse().ok());
            let label = month_num
                .and_then(|m| MONTH_NAMES.get((m as usize).wrapping_sub(1)))
                .map(|s| s.to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            let selected = month_num.is_some_and(|m| filters.month.contains(&m));
            let mut next = filters.clone();
            next.offset = 0;
            if let Some(m) = month_num {
                if let Some(pos) = next.month.iter().position(|v| *v == m) {
                    next.month.remove(pos);
                } else {
                    next.month.push(m);
                }
            }
            FacetValue { value: label, count, selected, url: query::to_query_string(&next) }
        })
        .collect();

    Ok(FacetResult::Discrete { dim: FacetDim::Month, label: "Month", values: order_values(values) })
}

fn day_facet(catalog: &Catalog, filters: &Filters, clauses: &ClauseList) -> Result<FacetResult, PipelineError> {
    let (where_sql, params) = query::assemble_where(clauses, Some(FacetDim::Day));
    let rows = group_query(catalog, "CAST(strftime('%d', photos.date_taken) AS INTEGER)", &where_sql, &params)?;

    let values = rows
        .into_iter()
        .map(|(value, count)| {
            let day_num: Option<u32> = value.as_deref().and_then(|v| v.parse().ok());
            let label = day_num.map(|d| d.to_string()).unwrap_or_else(|| "Unknown".to_string());
            let selected = day_num.is_some_and(|d| filters.day.contains(&d));
            let mut next = filters.clone();
            next.offset = 0;
            if let Some(d) = day_num {
                if let Some(pos) = next.day.iter().position(|v| *v == d) {
                    next.day.remove(pos);
                } else {
                    next.day.push(d);
                }
            }
            FacetValue { value: label, count, selected, url: query::to_query_string(&next) }
        })
        .collect();

    Ok(FacetResult::Discrete { dim: FacetDim::Day, label: "Day", values: order_values(values) })
}

fn discrete_facet(
    catalog: &Catalog,
    filters: &Filters,
    clauses: &ClauseList,
    dim: FacetDim,
    label: &'static str,
    expr: &str,
    current: &[String],
    toggle: impl Fn(&mut Filters, &str),
) -> Result<FacetResult, PipelineError> {
    let (where_sql, params) = query::assemble_where(clauses, Some(dim));
    let rows = group_query(catalog, expr, &where_sql, &params)?;

    let values = rows
        .into_iter()
        .map(|(value, count)| {
            let value = value.unwrap_or_else(|| "Unknown".to_string());
            let selected = current.iter().any(|v| v == &value);
            let mut next = filters.clone();
            next.offset = 0;
            toggle(&mut next, &value);
            FacetValue { url: query::to_query_string(&next), value, count, selected }
        })
        .collect();

    Ok(FacetResult::Discrete { dim, label, values: order_values(values) })
}

fn numeric_facet(
    catalog: &Catalog,
    _filters: &Filters,
    clauses: &ClauseList,
    dim: FacetDim,
    label: &'static str,
    column: &str,
    current_min: Option<f64>,
    current_max: Option<f64>,
) -> Result<FacetResult, PipelineError> {
    let (where_sql, params) = query::assemble_where(clauses, Some(dim));
    let sql = format!(
        "SELECT MIN({column}), MAX({column}) {} WHERE {where_sql} AND {column} IS NOT NULL",
        query::FACET_BASE_FROM
    );
    let conn = catalog.connection();
    let (dataset_min, dataset_max): (Option<f64>, Option<f64>) =
        conn.query_row(&sql, params_from_iter(params.iter()), |row| Ok((row.get(0)?, row.get(1)?)))?;

    Ok(FacetResult::NumericRange { dim, label, current_min, current_max, dataset_min, dataset_max })
}

fn boolean_facet(
    catalog: &Catalog,
    filters: &Filters,
    clauses: &ClauseList,
    dim: FacetDim,
    label: &'static str,
    on_predicate: &str,
    currently_selected: bool,
    set_value: impl Fn(&mut Filters, bool),
) -> Result<FacetResult, PipelineError> {
    let (where_sql, params) = query::assemble_where(clauses, Some(dim));
    let sql = format!("SELECT COUNT(*) {} WHERE {where_sql} AND {on_predicate}", query::FACET_BASE_FROM);
    let conn = catalog.connection();
    let count_on: i64 = conn.query_row(&sql, params_from_iter(params.iter()), |r| r.get(0))?;

    let mut on = filters.clone();
    on.offset = 0;
    set_value(&mut on, true);
    let mut off = filters.clone();
    off.offset = 0;
    set_value(&mut off, false);

    Ok(FacetResult::Boolean {
        dim,
        label,
        selected: currently_selected,
        count_on: count_on as u64,
        url_on: query::to_query_string(&on),
        url_off: query::to_query_string(&off),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    use crate::catalog::Catalog;
    use crate::metadata::Photo;
    use chrono::{TimeZone, Utc};

    fn photo(path: &str, year: i32, month: u32, camera: &str) -> Photo {
        Photo {
            path: path.into(),
            content_hash: [0u8; 32],
            file_size: 10,
            mtime_ns: 0,
            indexed_at: Utc.timestamp_opt(0, 0).unwrap(),
            camera_make: Some(camera.to_string()),
            camera_model: None,
            lens_make: None,
            lens_model: None,
            iso: Some(100),
            aperture: None,
            shutter_speed: None,
            exposure_compensation: None,
            focal_length: None,
            focal_length_35mm: None,
            date_taken: Some(Utc.with_ymd_and_hms(year, month, 10, 12, 0, 0).unwrap()),
            date_digitized: None,
            width: 100,
            height: 100,
            orientation: Some(1),
            color_space: None,
            latitude: None,
            longitude: None,
            altitude: None,
            flash_fired: Some(false),
            white_balance: None,
            focus_distance: None,
            dng_version: None,
            original_raw_filename: None,
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

    #[test]
    fn year_facet_self_excludes_current_year() {
        let tmp = tempdir().unwrap();
        let mut cat = Catalog::open(&tmp.path().join("c.db")).unwrap();
        let empty = BTreeMap::new();
        cat.upsert_photo(&photo("/a/1.jpg", 2023, 11, "Canon"), &empty, &[]).unwrap();
        for i in 0..50 {
            cat.upsert_photo(&photo(&format!("/a/{i}-2024.jpg"), 2024, 11, "Canon"), &empty, &[]).unwrap();
        }
        for i in 0..120 {
            cat.upsert_photo(&photo(&format!("/a/{i}-2023.jpg"), 2023, 11, "Canon"), &empty, &[]).unwrap();
        }

        let mut filters = Filters::new();
        filters.year = vec![2024];
        filters.month = vec![11];

        let set = compute_all(&cat, &filters).unwrap();
        let year_result = set.facets.iter().find_map(|f| match f {
            FacetResult::Discrete { dim: FacetDim::Year, values, .. } => Some(values.clone()),
            _ => None,
        }).unwrap();

        let y2023 = year_result.iter().find(|v| v.value == "2023").unwrap();
        assert_eq!(y2023.count, 121);
        assert!(!y2023.selected);

        let y2024 = year_result.iter().find(|v| v.value == "2024").unwrap();
        assert_eq!(y2024.count, 50);
        assert!(y2024.selected);
    }
}
