//! Schema definition. A single idempotent
//! `execute_batch` of `CREATE TABLE IF NOT EXISTS` + `CREATE INDEX IF NOT
//! EXISTS` statements, following the squashed-migration idiom in
//! `chehlo-gemkeep`'s `db/migrations.rs` — appropriate here since the
//! catalogue format is new and has no prior version to migrate from.

pub const CURRENT_SCHEMA_VERSION: i64 = 1;

pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY,
    path TEXT NOT NULL UNIQUE,
    content_hash BLOB NOT NULL,
    file_size INTEGER NOT NULL,
    mtime_ns INTEGER NOT NULL,
    indexed_at TEXT NOT NULL,

    camera_make TEXT,
    camera_model TEXT,
    lens_make TEXT,
    lens_model TEXT,
    iso INTEGER,
    aperture REAL,
    shutter_speed TEXT,
    exposure_compensation REAL,
    focal_length REAL,
    focal_length_35mm REAL,

    date_taken TEXT,
    date_digitized TEXT,

    width INTEGER NOT NULL,
    height INTEGER NOT NULL,
    orientation INTEGER,
    color_space TEXT,

    latitude REAL,
    longitude REAL,
    altitude REAL,

    flash_fired INTEGER,
    white_balance TEXT,
    focus_distance REAL,

    dng_version TEXT,
    original_raw_filename TEXT,

    time_of_day TEXT,
    season TEXT,
    focal_category TEXT,
    shooting_condition TEXT,

    perceptual_hash TEXT,

    burst_group_id TEXT,
    burst_sequence_index INTEGER,
    burst_group_size INTEGER,
    burst_representative INTEGER NOT NULL DEFAULT 0,

    duplicate_cluster_id TEXT,
    duplicate_cluster_size INTEGER,
    duplicate_representative INTEGER NOT NULL DEFAULT 0,
    duplicate_similarity_score REAL
);

CREATE TABLE IF NOT EXISTS thumbnails (
    photo_id INTEGER NOT NULL REFERENCES photos(id) ON DELETE CASCADE,
    size_label INTEGER NOT NULL,
    jpeg_bytes BLOB NOT NULL,
    quality INTEGER NOT NULL,
    PRIMARY KEY (photo_id, size_label)
);

CREATE TABLE IF NOT EXISTS photo_colors (
    photo_id INTEGER NOT NULL REFERENCES photos(id) ON DELETE CASCADE,
    ordinal INTEGER NOT NULL,
    r INTEGER NOT NULL,
    g INTEGER NOT NULL,
    b INTEGER NOT NULL,
    hue REAL NOT NULL,
    saturation REAL NOT NULL,
    lightness REAL NOT NULL,
    weight REAL NOT NULL,
    PRIMARY KEY (photo_id, ordinal)
);

CREATE TABLE IF NOT EXISTS burst_groups (
    id TEXT PRIMARY KEY,
    photo_count INTEGER NOT NULL,
    representative_photo_id INTEGER NOT NULL,
    time_span_seconds REAL NOT NULL,
    first_photo_ts TEXT NOT NULL,
    camera_make TEXT,
    camera_model TEXT
);

CREATE TABLE IF NOT EXISTS duplicate_clusters (
    id TEXT PRIMARY KEY,
    photo_count INTEGER NOT NULL,
    representative_photo_id INTEGER NOT NULL,
    max_distance INTEGER NOT NULL,
    cluster_type TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS photo_tags (
    photo_id INTEGER NOT NULL REFERENCES photos(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (photo_id, tag_id)
);

CREATE TABLE IF NOT EXISTS collections (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS collection_photos (
    collection_id INTEGER NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
    photo_id INTEGER NOT NULL REFERENCES photos(id) ON DELETE CASCADE,
    PRIMARY KEY (collection_id, photo_id)
);

-- Auxiliary facet-metadata table:
-- user-visible facet labels, display order, and multi-select flags for
-- the HTTP explorer's sidebar, kept alongside the data it describes
-- rather than hard-coded into the explorer.
CREATE TABLE IF NOT EXISTS facet_metadata (
    dim TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    display_order INTEGER NOT NULL,
    multi_select INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_photos_date_taken ON photos(date_taken);
CREATE INDEX IF NOT EXISTS idx_photos_camera ON photos(camera_make, camera_model);
CREATE INDEX IF NOT EXISTS idx_photos_lens_model ON photos(lens_model);
CREATE INDEX IF NOT EXISTS idx_photos_iso ON photos(iso);
CREATE INDEX IF NOT EXISTS idx_photos_aperture ON photos(aperture);
CREATE INDEX IF NOT EXISTS idx_photos_focal_length ON photos(focal_length);
CREATE INDEX IF NOT EXISTS idx_photos_time_of_day ON photos(time_of_day);
CREATE INDEX IF NOT EXISTS idx_photos_season ON photos(season);
CREATE INDEX IF NOT EXISTS idx_photos_focal_category ON photos(focal_category);
CREATE INDEX IF NOT EXISTS idx_photos_shooting_condition ON photos(shooting_condition);
CREATE INDEX IF NOT EXISTS idx_photos_perceptual_hash ON photos(perceptual_hash);
CREATE INDEX IF NOT EXISTS idx_photos_burst_group_id ON photos(burst_group_id);
CREATE INDEX IF NOT EXISTS idx_photos_duplicate_cluster_id ON photos(duplicate_cluster_id);
CREATE INDEX IF NOT EXISTS idx_photos_latlong ON photos(latitude, longitude);
CREATE INDEX IF NOT EXISTS idx_photo_colors_hue ON photo_colors(hue);
CREATE INDEX IF NOT EXISTS idx_photo_colors_saturation ON photo_colors(saturation);
";

/// Seed rows for `facet_metadata`: `(dim, label, multi_select)` in the
/// display order the explorer's sidebar renders them. `dim` matches the
/// lowercase `query::FacetDim` variant name it describes.
pub const FACET_METADATA_SEED: &[(&str, &str, bool)] = &[
    ("year", "Year", true),
    ("month", "Month", true),
    ("day", "Day", true),
    ("camera_make", "Camera make", true),
    ("camera_model", "Camera model", true),
    ("lens_model", "Lens", true),
    ("time_of_day", "Time of day", true),
    ("season", "Season", true),
    ("focal_category", "Focal category", true),
    ("shooting_condition", "Shooting condition", true),
    ("white_balance", "White balance", true),
    ("orientation", "Orientation", true),
    ("color", "Colour", true),
    ("cluster_type", "Cluster type", true),
    ("iso", "ISO", false),
    ("aperture", "Aperture", false),
    ("focal_length", "Focal length", false),
    ("hue", "Hue", false),
    ("saturation", "Saturation", false),
    ("lightness", "Lightness", false),
    ("flash_fired", "Flash fired", false),
    ("in_burst", "In a burst", false),
    ("is_burst_representative", "Burst representative", false),
];
