//! Query Engine. A filter parameter record, a SQL predicate
//! builder with AND-across-dimension/OR-within-dimension composition, and
//! pagination/sort. SQL string-building follows the same prepared-
//! statement conventions as `crate::catalog`.
//!
//! The predicate builder is shared with the Facet Computer (`crate::facets`):
//! each active filter dimension becomes one tagged `Clause`, and
//! `where_sql` assembles a WHERE clause from all clauses but an optionally
//! excluded one — the mechanical embodiment of the self-exclusion rule.

mod url;

pub use url::{parse_query_string, percent_decode, to_query_string};

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Row};

use crate::catalog::Catalog;
use crate::error::PipelineError;

/// Every dimension a facet can be computed over, and a filter clause can
/// be tagged with. Used as the self-exclusion key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FacetDim {
    Year,
    Month,
    Day,
    DateRange,
    CameraMake,
    CameraModel,
    LensModel,
    Iso,
    Aperture,
    FocalLength,
    FocalLength35mm,
    Hue,
    Saturation,
    Lightness,
    TimeOfDay,
    Season,
    FocalCategory,
    ShootingCondition,
    WhiteBalance,
    Orientation,
    Color,
    FlashFired,
    InBurst,
    IsBurstRepresentative,
    OnlyRepresentatives,
    BurstGroup,
    DuplicateCluster,
    ClusterType,
    GeoBox,
}

/// Whitelisted sort fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    DateTaken,
    Iso,
    Aperture,
    FocalLength,
    FileSize,
    IndexedAt,
}

impl SortField {
    fn column(self) -> &'static str {
        match self {
            SortField::DateTaken => "photos.date_taken",
            SortField::Iso => "photos.iso",
            SortField::Aperture => "photos.aperture",
            SortField::FocalLength => "photos.focal_length",
            SortField::FileSize => "photos.file_size",
            SortField::IndexedAt => "photos.indexed_at",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "date_taken" => Some(SortField::DateTaken),
            "iso" => Some(SortField::Iso),
            "aperture" => Some(SortField::Aperture),
            "focal_length" => Some(SortField::FocalLength),
            "file_size" => Some(SortField::FileSize),
            "indexed_at" => Some(SortField::IndexedAt),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::DateTaken => "date_taken",
            SortField::Iso => "iso",
            SortField::Aperture => "aperture",
            SortField::FocalLength => "focal_length",
            SortField::FileSize => "file_size",
            SortField::IndexedAt => "indexed_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

/// The parameter record: every filter dimension, plus pagination and
/// sort. Absent fields mean "no constraint on this dimension" — there
/// is no hierarchical relationship between fields.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub year: Vec<i32>,
    pub month: Vec<u32>,
    pub day: Vec<u32>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,

    pub camera_make: Vec<String>,
    pub camera_model: Vec<String>,
    pub lens_model: Vec<String>,

    pub iso_min: Option<i64>,
    pub iso_max: Option<i64>,
    pub aperture_min: Option<f64>,
    pub aperture_max: Option<f64>,
    pub focal_length_min: Option<f64>,
    pub focal_length_max: Option<f64>,
    pub focal_length_35mm_min: Option<f64>,
    pub focal_length_35mm_max: Option<f64>,
    pub hue_min: Option<f64>,
    pub hue_max: Option<f64>,
    pub saturation_min: Option<f64>,
    pub saturation_max: Option<f64>,
    pub lightness_min: Option<f64>,
    pub lightness_max: Option<f64>,

    pub time_of_day: Vec<String>,
    pub season: Vec<String>,
    pub focal_category: Vec<String>,
    pub shooting_condition: Vec<String>,
    pub white_balance: Vec<String>,
    pub orientation: Vec<String>,
    pub color: Vec<String>,

    pub flash_fired: Option<bool>,
    pub in_burst: Option<bool>,
    pub is_burst_representative: Option<bool>,
    pub only_representatives: Option<bool>,

    pub burst_group_id: Option<String>,
    pub duplicate_cluster_id: Option<String>,
    pub cluster_type: Vec<String>,

    /// (min_lat, min_lon, max_lat, max_lon)
    pub geo_box: Option<(f64, f64, f64, f64)>,

    pub offset: u32,
    pub limit: u32,
    pub sort: SortField,
    pub sort_dir: SortDir,
    /// Thumbnail size attached to each result row's bytes.
    pub thumbnail_size: u32,
}

impl Filters {
    pub fn new() -> Self {
        Filters {
            offset: 0,
            limit: DEFAULT_LIMIT,
            sort: SortField::DateTaken,
            sort_dir: SortDir::Desc,
            thumbnail_size: 256,
            ..Default::default()
        }
    }
}

struct Clause {
    dim: FacetDim,
    sql: String,
    params: Vec<Value>,
}

/// The expression the `color` facet/filter matches against: a
/// saturation-first classifier over the photo's primary dominant colour
/// (ordinal 1), computed in SQL via `CASE` so it can both filter and
/// GROUP BY without materializing the classification in the schema.
fn color_name_case_expr() -> &'static str {
    "CASE \
        WHEN pc1.saturation IS NULL THEN NULL \
        WHEN pc1.saturation < 15 THEN ( \
            CASE WHEN pc1.lightness < 20 THEN 'black' \
                 WHEN pc1.lightness > 80 THEN 'white' \
                 ELSE 'gray' END) \
        WHEN pc1.hue < 20 THEN 'red' \
        WHEN pc1.hue < 45 THEN (CASE WHEN pc1.lightness < 35 THEN 'brown' ELSE 'orange' END) \
        WHEN pc1.hue < 65 THEN 'yellow' \
        WHEN pc1.hue < 170 THEN 'green' \
        WHEN pc1.hue < 260 THEN 'blue' \
        WHEN pc1.hue < 320 THEN 'purple' \
        WHEN pc1.hue < 345 THEN 'pink' \
        ELSE 'red' \
     END"
}

/// The expression the `orientation` facet/filter matches against, per
/// this module's width/height-ratio classifier.
fn orientation_case_expr() -> &'static str {
    "CASE \
        WHEN CAST(photos.width AS REAL) / photos.height > 1.2 THEN 'landscape' \
        WHEN CAST(photos.width AS REAL) / photos.height < (1.0 / 1.2) THEN 'portrait' \
        ELSE 'square' \
     END"
}

fn in_placeholders(n: usize) -> String {
    std::iter::repeat("?").take(n).collect::<Vec<_>>().join(", ")
}

fn build_clauses(f: &Filters) -> Vec<Clause> {
    let mut clauses = Vec::new();

    if !f.year.is_empty() {
        let mut sql = String::from("(");
        let parts: Vec<String> = f
            .year
            .iter()
            .map(|_| "strftime('%Y', photos.date_taken) = ?".to_string())
            .collect();
        sql.push_str(&parts.join(" OR "));
        sql.push(')');
        let params = f.year.iter().map(|y| Value::from(format!("{y:04}"))).collect();
        clauses.push(Clause { dim: FacetDim::Year, sql, params });
    }

    if !f.month.is_empty() {
        let parts: Vec<String> = f
            .month
            .iter()
            .map(|_| "CAST(strftime('%m', photos.date_taken) AS INTEGER) = ?".to_string())
            .collect();
        let sql = format!("({})", parts.join(" OR "));
        let params = f.month.iter().map(|m| Value::from(*m as i64)).collect();
        clauses.push(Clause { dim: FacetDim::Month, sql, params });
    }

    if !f.day.is_empty() {
        let parts: Vec<String> = f
            .day
            .iter()
            .map(|_| "CAST(strftime('%d', photos.date_taken) AS INTEGER) = ?".to_string())
            .collect();
        let sql = format!("({})", parts.join(" OR "));
        let params = f.day.iter().map(|d| Value::from(*d as i64)).collect();
        clauses.push(Clause { dim: FacetDim::Day, sql, params });
    }

    if f.date_from.is_some() || f.date_to.is_some() {
        let mut parts = Vec::new();
        let mut params = Vec::new();
        if let Some(from) = &f.date_from {
            parts.push("photos.date_taken >= ?".to_string());
            params.push(Value::from(from.clone()));
        }
        if let Some(to) = &f.date_to {
            parts.push("photos.date_taken <= ?".to_string());
            params.push(Value::from(to.clone()));
        }
        clauses.push(Clause { dim: FacetDim::DateRange, sql: format!("({})", parts.join(" AND ")), params });
    }

    if !f.camera_make.is_empty() {
        let sql = format!("photos.camera_make IN ({})", in_placeholders(f.camera_make.len()));
        let params = f.camera_make.iter().map(|v| Value::from(v.clone())).collect();
        clauses.push(Clause { dim: FacetDim::CameraMake, sql, params });
    }

    if !f.camera_model.is_empty() {
        let sql = format!("photos.camera_model IN ({})", in_placeholders(f.camera_model.len()));
        let params = f.camera_model.iter().map(|v| Value::from(v.clone())).collect();
        clauses.push(Clause { dim: FacetDim::CameraModel, sql, params });
    }

    if !f.lens_model.is_empty() {
        let sql = format!("photos.lens_model IN ({})", in_placeholders(f.lens_model.len()));
        let params = f.lens_model.iter().map(|v| Value::from(v.clone())).collect();
        clauses.push(Clause { dim: FacetDim::LensModel, sql, params });
    }

    numeric_range_clause(&mut clauses, FacetDim::Iso, "photos.iso", f.iso_min.map(|v| v as f64), f.iso_max.map(|v| v as f64));
    numeric_range_clause(&mut clauses, FacetDim::Aperture, "photos.aperture", f.aperture_min, f.aperture_max);
    numeric_range_clause(&mut clauses, FacetDim::FocalLength, "photos.focal_length", f.focal_length_min, f.focal_length_max);
    numeric_range_clause(&mut clauses, FacetDim::FocalLength35mm, "photos.focal_length_35mm", f.focal_length_35mm_min, f.focal_length_35mm_max);
    numeric_range_clause(&mut clauses, FacetDim::Hue, "pc1.hue", f.hue_min, f.hue_max);
    numeric_range_clause(&mut clauses, FacetDim::Saturation, "pc1.saturation", f.saturation_min, f.saturation_max);
    numeric_range_clause(&mut clauses, FacetDim::Lightness, "pc1.lightness", f.lightness_min, f.lightness_max);

    multiselect_clause(&mut clauses, FacetDim::TimeOfDay, "photos.time_of_day", &f.time_of_day);
    multiselect_clause(&mut clauses, FacetDim::Season, "photos.season", &f.season);
    multiselect_clause(&mut clauses, FacetDim::FocalCategory, "photos.focal_category", &f.focal_category);
    multiselect_clause(&mut clauses, FacetDim::ShootingCondition, "photos.shooting_condition", &f.shooting_condition);
    multiselect_clause(&mut clauses, FacetDim::WhiteBalance, "photos.white_balance", &f.white_balance);
    multiselect_clause(&mut clauses, FacetDim::ClusterType, "photos.duplicate_cluster_id IS NOT NULL AND dc.cluster_type", &f.cluster_type);

    if !f.orientation.is_empty() {
        let sql = format!("{} IN ({})", orientation_case_expr(), in_placeholders(f.orientation.len()));
        let params = f.orientation.iter().map(|v| Value::from(v.clone())).collect();
        clauses.push(Clause { dim: FacetDim::Orientation, sql, params });
    }

    if !f.color.is_empty() {
        let sql = format!("{} IN ({})", color_name_case_expr(), in_placeholders(f.color.len()));
        let params = f.color.iter().map(|v| Value::from(v.clone())).collect();
        clauses.push(Clause { dim: FacetDim::Color, sql, params });
    }

    if let Some(on) = f.flash_fired {
        clauses.push(Clause {
            dim: FacetDim::FlashFired,
            sql: "photos.flash_fired = ?".to_string(),
            params: vec![Value::from(on as i64)],
        });
    }

    if let Some(on) = f.in_burst {
        let sql = if on { "photos.burst_group_id IS NOT NULL" } else { "photos.burst_group_id IS NULL" };
        clauses.push(Clause { dim: FacetDim::InBurst, sql: sql.to_string(), params: vec![] });
    }

    if let Some(on) = f.is_burst_representative {
        clauses.push(Clause {
            dim: FacetDim::IsBurstRepresentative,
            sql: "photos.burst_representative = ?".to_string(),
            params: vec![Value::from(on as i64)],
        });
    }

    if let Some(on) = f.only_representatives {
        if on {
            clauses.push(Clause {
                dim: FacetDim::OnlyRepresentatives,
                sql: "(photos.burst_group_id IS NULL OR photos.burst_representative = 1) AND \
                      (photos.duplicate_cluster_id IS NULL OR photos.duplicate_representative = 1)"
                    .to_string(),
                params: vec![],
            });
        }
    }

    if let Some(id) = &f.burst_group_id {
        clauses.push(Clause {
            dim: FacetDim::BurstGroup,
            sql: "photos.burst_group_id = ?".to_string(),
            params: vec![Value::from(id.clone())],
        });
    }

    if let Some(id) = &f.duplicate_cluster_id {
        clauses.push(Clause {
            dim: FacetDim::DuplicateCluster,
            sql: "photos.duplicate_cluster_id = ?".to_string(),
            params: vec![Value::from(id.clone())],
        });
    }

    if let Some((min_lat, min_lon, max_lat, max_lon)) = f.geo_box {
        clauses.push(Clause {
            dim: FacetDim::GeoBox,
            sql: "(photos.latitude BETWEEN ? AND ? AND photos.longitude BETWEEN ? AND ?)".to_string(),
            params: vec![
                Value::from(min_lat),
                Value::from(max_lat),
                Value::from(min_lon),
                Value::from(max_lon),
            ],
        });
    }

    clauses
}

fn numeric_range_clause(
    clauses: &mut Vec<Clause>,
    dim: FacetDim,
    column: &str,
    min: Option<f64>,
    max: Option<f64>,
) {
    if min.is_none() && max.is_none() {
        return;
    }
    let mut parts = Vec::new();
    let mut params = Vec::new();
    // Numeric-range predicates are applied only to non-null values.
    parts.push(format!("{column} IS NOT NULL"));
    if let Some(min) = min {
        parts.push(format!("{column} >= ?"));
        params.push(Value::from(min));
    }
    if let Some(max) = max {
        parts.push(format!("{column} <= ?"));
        params.push(Value::from(max));
    }
    clauses.push(Clause { dim, sql: format!("({})", parts.join(" AND ")), params });
}

fn multiselect_clause(clauses: &mut Vec<Clause>, dim: FacetDim, column: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    let has_unknown = values.iter().any(|v| v.eq_ignore_ascii_case("unknown"));
    let known: Vec<&String> = values.iter().filter(|v| !v.eq_ignore_ascii_case("unknown")).collect();

    let mut parts = Vec::new();
    let mut params = Vec::new();
    if !known.is_empty() {
        parts.push(format!("{column} IN ({})", in_placeholders(known.len())));
        params.extend(known.iter().map(|v| Value::from((*v).clone())));
    }
    if has_unknown {
        parts.push(format!("{column} IS NULL"));
    }
    clauses.push(Clause { dim, sql: format!("({})", parts.join(" OR ")), params });
}

/// Assemble a WHERE clause (without the leading `WHERE`) from every
/// active filter dimension except `exclude` — the self-exclusion rule.
/// Returns `("1=1", [])` when there are no active filters.
fn where_sql(clauses: &[Clause], exclude: Option<FacetDim>) -> (String, Vec<Value>) {
    let active: Vec<&Clause> = clauses.iter().filter(|c| Some(c.dim) != exclude).collect();
    if active.is_empty() {
        return ("1=1".to_string(), vec![]);
    }
    let sql = active.iter().map(|c| c.sql.clone()).collect::<Vec<_>>().join(" AND ");
    let params = active.iter().flat_map(|c| c.params.clone()).collect();
    (sql, params)
}

/// Whether the query needs to join `photo_colors` (ordinal 1) and/or
/// `duplicate_clusters`, used by both the result query and every facet
/// query so column references like `pc1.hue` resolve.
const BASE_FROM: &str = "FROM photos \
    LEFT JOIN photo_colors pc1 ON pc1.photo_id = photos.id AND pc1.ordinal = 1 \
    LEFT JOIN duplicate_clusters dc ON dc.id = photos.duplicate_cluster_id";

#[derive(Debug, Clone)]
pub struct PhotoSummary {
    pub id: i64,
    pub path: String,
    pub date_taken: Option<String>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub dominant_color: Option<(u8, u8, u8)>,
    pub burst_group_id: Option<String>,
    pub duplicate_cluster_id: Option<String>,
    pub thumbnail: Option<Vec<u8>>,
}

fn row_to_summary(row: &Row) -> rusqlite::Result<PhotoSummary> {
    Ok(PhotoSummary {
        id: row.get("id")?,
        path: row.get("path")?,
        date_taken: row.get("date_taken")?,
        camera_make: row.get("camera_make")?,
        camera_model: row.get("camera_model")?,
        dominant_color: match (row.get::<_, Option<i64>>("r")?, row.get::<_, Option<i64>>("g")?, row.get::<_, Option<i64>>("b")?) {
            (Some(r), Some(g), Some(b)) => Some((r as u8, g as u8, b as u8)),
            _ => None,
        },
        burst_group_id: row.get("burst_group_id")?,
        duplicate_cluster_id: row.get("duplicate_cluster_id")?,
        thumbnail: None,
    })
}

/// Run the query engine: result rows (with the requested thumbnail size's
/// bytes attached) and the total matching count, ignoring pagination.
pub fn search(catalog: &Catalog, filters: &Filters) -> Result<(Vec<PhotoSummary>, u64), PipelineError> {
    let clauses = build_clauses(filters);
    let (where_clause, params) = where_sql(&clauses, None);
    let conn = catalog.connection();

    let count_sql = format!("SELECT COUNT(*) {BASE_FROM} WHERE {where_clause}");
    let total: i64 = conn.query_row(&count_sql, params_from_iter(params.iter()), |r| r.get(0))?;

    let limit = filters.limit.min(MAX_LIMIT).max(1);
    let sort_dir = match filters.sort_dir {
        SortDir::Asc => "ASC",
        SortDir::Desc => "DESC",
    };
    let select_sql = format!(
        "SELECT photos.id AS id, photos.path AS path, photos.date_taken AS date_taken, \
                photos.camera_make AS camera_make, photos.camera_model AS camera_model, \
                photos.burst_group_id AS burst_group_id, photos.duplicate_cluster_id AS duplicate_cluster_id, \
                pc1.r AS r, pc1.g AS g, pc1.b AS b \
         {BASE_FROM} WHERE {where_clause} \
         ORDER BY {} {sort_dir} \
         LIMIT ? OFFSET ?",
        filters.sort.column()
    );

    let mut stmt = conn.prepare(&select_sql)?;
    let mut all_params = params;
    all_params.push(Value::from(limit as i64));
    all_params.push(Value::from(filters.offset as i64));

    let mut rows = stmt
        .query_map(params_from_iter(all_params.iter()), row_to_summary)?
        .collect::<Result<Vec<_>, _>>()?;

    for row in &mut rows {
        row.thumbnail = catalog.thumbnail(row.id, filters.thumbnail_size)?;
    }

    Ok((rows, total as u64))
}

pub(crate) fn clauses_for_facets(filters: &Filters) -> Vec<(FacetDim, String, Vec<Value>)> {
    build_clauses(filters)
        .into_iter()
        .map(|c| (c.dim, c.sql, c.params))
        .collect()
}

pub(crate) fn assemble_where(clauses: &[(FacetDim, String, Vec<Value>)], exclude: Option<FacetDim>) -> (String, Vec<Value>) {
    let active: Vec<&(FacetDim, String, Vec<Value>)> =
        clauses.iter().filter(|(dim, _, _)| Some(*dim) != exclude).collect();
    if active.is_empty() {
        return ("1=1".to_string(), vec![]);
    }
    let sql = active.iter().map(|(_, s, _)| s.clone()).collect::<Vec<_>>().join(" AND ");
    let params = active.iter().flat_map(|(_, _, p)| p.clone()).collect();
    (sql, params)
}

pub(crate) const FACET_BASE_FROM: &str = BASE_FROM;
pub(crate) fn facet_color_expr() -> &'static str {
    color_name_case_expr()
}
pub(crate) fn facet_orientation_expr() -> &'static str {
    orientation_case_expr()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_filters_produces_trivial_where() {
        let f = Filters::new();
        let clauses = build_clauses(&f);
        let (sql, params) = where_sql(&clauses, None);
        assert_eq!(sql, "1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn month_filter_is_independent_of_year() {
        let mut f = Filters::new();
        f.month = vec![11];
        let clauses = build_clauses(&f);
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].dim, FacetDim::Month);
    }

    #[test]
    fn self_exclusion_drops_only_the_named_dimension() {
        let mut f = Filters::new();
        f.year = vec![2024];
        f.month = vec![11];
        let clauses = build_clauses(&f);
        let (sql, _) = where_sql(&clauses, Some(FacetDim::Year));
        assert!(!sql.contains("strftime('%Y'"));
        assert!(sql.contains("strftime('%m'"));
    }

    #[test]
    fn multiselect_is_ored_within_dimension() {
        let mut f = Filters::new();
        f.color = vec!["red".into(), "blue".into()];
        let clauses = build_clauses(&f);
        assert!(clauses[0].sql.contains(" IN "));
        assert_eq!(clauses[0].params.len(), 2);
    }
}
