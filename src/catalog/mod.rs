//! Catalogue Store: schema, transactional insert/upsert,
//! BLOB storage for thumbnails, required indices. Built on a
//! `Connection` wrapper, `prepare_cached` statements, and an
//! `ON CONFLICT` upsert idiom, expanded to the full schema below.

mod schema;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::PipelineError;
use crate::metadata::Photo;
use crate::perceptual::DominantColor;

pub struct Catalog {
    conn: Connection,
}

/// The subset of a photo's fields needed to order and group for burst
/// detection.
#[derive(Debug, Clone)]
pub struct BurstCandidate {
    pub id: i64,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub date_taken: Option<DateTime<Utc>>,
    pub focal_length: Option<f64>,
}

/// The subset of a photo's fields needed for duplicate clustering.
#[derive(Debug, Clone)]
pub struct DuplicateCandidate {
    pub id: i64,
    pub perceptual_hash: String,
    pub content_hash: [u8; 32],
}

#[derive(Debug, Default)]
pub struct CatalogStats {
    pub photo_count: i64,
    pub thumbnail_count: i64,
    pub color_count: i64,
    pub burst_group_count: i64,
    pub duplicate_cluster_count: i64,
}

impl Catalog {
    pub fn open(db_path: &Path) -> Result<Self, PipelineError> {
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(schema::SCHEMA_SQL)?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_meta (id, version) VALUES (1, ?1)",
            params![schema::CURRENT_SCHEMA_VERSION],
        )?;
        for (order, (dim, label, multi_select)) in schema::FACET_METADATA_SEED.iter().enumerate() {
            conn.execute(
                "INSERT OR IGNORE INTO facet_metadata (dim, label, display_order, multi_select) VALUES (?1, ?2, ?3, ?4)",
                params![dim, label, order as i64, *multi_select as i64],
            )?;
        }
        Ok(Catalog { conn })
    }

    /// The user-visible facet labels, display order, and multi-select
    /// flags, for the HTTP
    /// explorer's sidebar.
    pub fn facet_metadata(&self) -> Result<Vec<(String, String, bool)>, PipelineError> {
        let mut stmt = self
            .conn
            .prepare("SELECT dim, label, multi_select FROM facet_metadata ORDER BY display_order")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, i64>(2)? != 0))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Direct access to the underlying connection for the query engine
    /// and facet computer, which build ad hoc SQL the
    /// catalogue's own method set doesn't anticipate.
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Returns (photo id, file size, mtime_ns) if `path` already has a
    /// row, for the orchestrator's skip-if-unchanged check.
    pub fn existing_summary(&self, path: &Path) -> Result<Option<(i64, u64, i64)>, PipelineError> {
        let path_str = path.to_string_lossy();
        let row = self
            .conn
            .query_row(
                "SELECT id, file_size, mtime_ns FROM photos WHERE path = ?1",
                params![path_str.as_ref()],
                |row| {
                    let id: i64 = row.get(0)?;
                    let size: i64 = row.get(1)?;
                    let mtime: i64 = row.get(2)?;
                    Ok((id, size as u64, mtime))
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Insert or fully replace a photo row plus its four thumbnails and
    /// up to five colour rows, all within a single transaction. Returns
    /// the photo id.
    pub fn upsert_photo(
        &mut self,
        photo: &Photo,
        thumbnails: &BTreeMap<u32, Vec<u8>>,
        colors: &[DominantColor],
    ) -> Result<i64, PipelineError> {
        let tx = self.conn.transaction()?;
        let path_str = photo.path.to_string_lossy();

        tx.execute(
            "INSERT INTO photos (
                path, content_hash, file_size, mtime_ns, indexed_at,
                camera_make, camera_model, lens_make, lens_model, iso,
                aperture, shutter_speed, exposure_compensation, focal_length, focal_length_35mm,
                date_taken, date_digitized,
                width, height, orientation, color_space,
                latitude, longitude, altitude,
                flash_fired, white_balance, focus_distance,
                dng_version, original_raw_filename,
                time_of_day, season, focal_category, shooting_condition,
                perceptual_hash
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15,
                ?16, ?17,
                ?18, ?19, ?20, ?21,
                ?22, ?23, ?24,
                ?25, ?26, ?27,
                ?28, ?29,
                ?30, ?31, ?32, ?33,
                ?34
            )
            ON CONFLICT(path) DO UPDATE SET
                content_hash = excluded.content_hash,
                file_size = excluded.file_size,
                mtime_ns = excluded.mtime_ns,
                indexed_at = excluded.indexed_at,
                camera_make = excluded.camera_make,
                camera_model = excluded.camera_model,
                lens_make = excluded.lens_make,
                lens_model = excluded.lens_model,
                iso = excluded.iso,
                aperture = excluded.aperture,
                shutter_speed = excluded.shutter_speed,
                exposure_compensation = excluded.exposure_compensation,
                focal_length = excluded.focal_length,
                focal_length_35mm = excluded.focal_length_35mm,
                date_taken = excluded.date_taken,
                date_digitized = excluded.date_digitized,
                width = excluded.width,
                height = excluded.height,
                orientation = excluded.orientation,
                color_space = excluded.color_space,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                altitude = excluded.altitude,
                flash_fired = excluded.flash_fired,
                white_balance = excluded.white_balance,
                focus_distance = excluded.focus_distance,
                dng_version = excluded.dng_version,
                original_raw_filename = excluded.original_raw_filename,
                time_of_day = excluded.time_of_day,
                season = excluded.season,
                focal_category = excluded.focal_category,
                shooting_condition = excluded.shooting_condition,
                perceptual_hash = excluded.perceptual_hash",
            params![
                path_str.as_ref(),
                &photo.content_hash[..],
                photo.file_size as i64,
                photo.mtime_ns,
                photo.indexed_at.to_rfc3339(),
                photo.camera_make,
                photo.camera_model,
                photo.lens_make,
                photo.lens_model,
                photo.iso,
                photo.aperture,
                photo.shutter_speed,
                photo.exposure_compensation,
                photo.focal_length,
                photo.focal_length_35mm,
                photo.date_taken.map(|d| d.to_rfc3339()),
                photo.date_digitized.map(|d| d.to_rfc3339()),
                photo.width,
                photo.height,
                photo.orientation,
                photo.color_space,
                photo.latitude,
                photo.longitude,
                photo.altitude,
                photo.flash_fired.map(|b| b as i64),
                photo.white_balance,
                photo.focus_distance,
                photo.dng_version,
                photo.original_raw_filename,
                photo.time_of_day,
                photo.season,
                photo.focal_category,
                photo.shooting_condition,
                photo.perceptual_hash,
            ],
        )?;

        let photo_id: i64 = tx.query_row(
            "SELECT id FROM photos WHERE path = ?1",
            params![path_str.as_ref()],
            |row| row.get(0),
        )?;

        tx.execute("DELETE FROM thumbnails WHERE photo_id = ?1", params![photo_id])?;
        for (size, bytes) in thumbnails {
            tx.execute(
                "INSERT INTO thumbnails (photo_id, size_label, jpeg_bytes, quality) VALUES (?1, ?2, ?3, ?4)",
                params![photo_id, *size, bytes, 85i64],
            )?;
        }

        tx.execute("DELETE FROM photo_colors WHERE photo_id = ?1", params![photo_id])?;
        for (ordinal, color) in colors.iter().enumerate() {
            tx.execute(
                "INSERT INTO photo_colors (photo_id, ordinal, r, g, b, hue, saturation, lightness, weight)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    photo_id,
                    (ordinal + 1) as i64,
                    color.r,
                    color.g,
                    color.b,
                    color.h,
                    color.s,
                    color.l,
                    color.weight,
                ],
            )?;
        }

        tx.commit()?;
        Ok(photo_id)
    }

    pub fn thumbnail(&self, photo_id: i64, size: u32) -> Result<Option<Vec<u8>>, PipelineError> {
        let bytes = self
            .conn
            .query_row(
                "SELECT jpeg_bytes FROM thumbnails WHERE photo_id = ?1 AND size_label = ?2",
                params![photo_id, size],
                |row| row.get(0),
            )
            .optional()?;
        Ok(bytes)
    }

    pub fn photo_path(&self, photo_id: i64) -> Result<Option<PathBuf>, PipelineError> {
        let path: Option<String> = self
            .conn
            .query_row(
                "SELECT path FROM photos WHERE id = ?1",
                params![photo_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(path.map(PathBuf::from))
    }

    /// The photo's indexed-at timestamp, used to key the HTTP
    /// explorer's thumbnail cache headers.
    pub fn photo_indexed_at(&self, photo_id: i64) -> Result<Option<String>, PipelineError> {
        let indexed_at = self
            .conn
            .query_row(
                "SELECT indexed_at FROM photos WHERE id = ?1",
                params![photo_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(indexed_at)
    }

    /// Dump every column of a photo's row plus its colour and thumbnail-
    /// size rows, for the `show` CLI command. Column order
    /// follows the schema's declaration order.
    pub fn photo_record(&self, photo_id: i64) -> Result<Option<Vec<(String, String)>>, PipelineError> {
        let mut stmt = self.conn.prepare("SELECT * FROM photos WHERE id = ?1")?;
        let mut rows = stmt.query(params![photo_id])?;
        let Some(row) = rows.next()? else { return Ok(None) };

        let column_count = row.as_ref().column_count();
        let mut fields = Vec::with_capacity(column_count);
        for i in 0..column_count {
            let name = row.as_ref().column_name(i)?.to_string();
            let value: rusqlite::types::Value = row.get(i)?;
            fields.push((name, format_value(&value)));
        }

        let colors: Vec<String> = self
            .conn
            .prepare("SELECT ordinal, r, g, b, hue, saturation, lightness, weight FROM photo_colors WHERE photo_id = ?1 ORDER BY ordinal")?
            .query_map(params![photo_id], |r| {
                Ok(format!(
                    "#{}: rgb({},{},{}) hsl({:.0},{:.0}%,{:.0}%) weight={:.3}",
                    r.get::<_, i64>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, i64>(2)?,
                    r.get::<_, i64>(3)?,
                    r.get::<_, f64>(4)?,
                    r.get::<_, f64>(5)?,
                    r.get::<_, f64>(6)?,
                    r.get::<_, f64>(7)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        fields.push(("dominant_colors".to_string(), colors.join("; ")));

        let sizes: Vec<String> = self
            .conn
            .prepare("SELECT size_label FROM thumbnails WHERE photo_id = ?1 ORDER BY size_label")?
            .query_map(params![photo_id], |r| r.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        fields.push(("thumbnail_sizes".to_string(), sizes.join(", ")));

        Ok(Some(fields))
    }

    pub fn stats(&self) -> Result<CatalogStats, PipelineError> {
        let photo_count = self.conn.query_row("SELECT COUNT(*) FROM photos", [], |r| r.get(0))?;
        let thumbnail_count =
            self.conn.query_row("SELECT COUNT(*) FROM thumbnails", [], |r| r.get(0))?;
        let color_count =
            self.conn.query_row("SELECT COUNT(*) FROM photo_colors", [], |r| r.get(0))?;
        let burst_group_count =
            self.conn.query_row("SELECT COUNT(*) FROM burst_groups", [], |r| r.get(0))?;
        let duplicate_cluster_count =
            self.conn.query_row("SELECT COUNT(*) FROM duplicate_clusters", [], |r| r.get(0))?;
        Ok(CatalogStats {
            photo_count,
            thumbnail_count,
            color_count,
            burst_group_count,
            duplicate_cluster_count,
        })
    }

    /// Attach `tag` to `photo_id`, creating the tag if it doesn't already
    /// exist. Idempotent.
    pub fn tag_photo(&mut self, photo_id: i64, tag: &str) -> Result<(), PipelineError> {
        let tx = self.conn.transaction()?;
        tx.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![tag])?;
        let tag_id: i64 =
            tx.query_row("SELECT id FROM tags WHERE name = ?1", params![tag], |r| r.get(0))?;
        tx.execute(
            "INSERT OR IGNORE INTO photo_tags (photo_id, tag_id) VALUES (?1, ?2)",
            params![photo_id, tag_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Every tag name attached to `photo_id`, alphabetically.
    pub fn tags_for_photo(&self, photo_id: i64) -> Result<Vec<String>, PipelineError> {
        let mut stmt = self.conn.prepare(
            "SELECT tags.name FROM tags
             JOIN photo_tags ON photo_tags.tag_id = tags.id
             WHERE photo_tags.photo_id = ?1
             ORDER BY tags.name",
        )?;
        let names = stmt
            .query_map(params![photo_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Every photo id tagged with `tag`, ordered by id.
    pub fn photos_with_tag(&self, tag: &str) -> Result<Vec<i64>, PipelineError> {
        let mut stmt = self.conn.prepare(
            "SELECT photo_tags.photo_id FROM photo_tags
             JOIN tags ON tags.id = photo_tags.tag_id
             WHERE tags.name = ?1
             ORDER BY photo_tags.photo_id",
        )?;
        let ids = stmt
            .query_map(params![tag], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Add `photo_id` to `collection`, creating the collection if it
    /// doesn't already exist. Idempotent.
    pub fn add_to_collection(&mut self, photo_id: i64, collection: &str) -> Result<(), PipelineError> {
        let tx = self.conn.transaction()?;
        tx.execute("INSERT OR IGNORE INTO collections (name) VALUES (?1)", params![collection])?;
        let collection_id: i64 = tx.query_row(
            "SELECT id FROM collections WHERE name = ?1",
            params![collection],
            |r| r.get(0),
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO collection_photos (collection_id, photo_id) VALUES (?1, ?2)",
            params![collection_id, photo_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Every photo id in `collection`, ordered by id.
    pub fn photos_in_collection(&self, collection: &str) -> Result<Vec<i64>, PipelineError> {
        let mut stmt = self.conn.prepare(
            "SELECT collection_photos.photo_id FROM collection_photos
             JOIN collections ON collections.id = collection_photos.collection_id
             WHERE collections.name = ?1
             ORDER BY collection_photos.photo_id",
        )?;
        let ids = stmt
            .query_map(params![collection], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// All photos ordered by (camera make, camera model, date-taken) for
    /// burst detection.
    pub fn photos_for_burst_detection(&self) -> Result<Vec<BurstCandidate>, PipelineError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, camera_make, camera_model, date_taken, focal_length
             FROM photos
             ORDER BY camera_make, camera_model, date_taken",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let date_taken: Option<String> = row.get(3)?;
                Ok(BurstCandidate {
                    id: row.get(0)?,
                    camera_make: row.get(1)?,
                    camera_model: row.get(2)?,
                    date_taken: date_taken.and_then(|s| parse_rfc3339(&s)),
                    focal_length: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All photos with a perceptual hash, for duplicate clustering.
    pub fn photos_for_duplicate_detection(&self) -> Result<Vec<DuplicateCandidate>, PipelineError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, perceptual_hash, content_hash FROM photos WHERE perceptual_hash IS NOT NULL",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let content_hash: Vec<u8> = row.get(2)?;
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, content_hash))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, hash, content)| {
                let mut arr = [0u8; 32];
                if content.len() != 32 {
                    return None;
                }
                arr.copy_from_slice(&content);
                Some(DuplicateCandidate { id, perceptual_hash: hash, content_hash: arr })
            })
            .collect())
    }

    /// Clears all prior burst-group state (groups table + photo
    /// membership columns), per this module's "cleared at the start of a
    /// run" lifecycle.
    pub fn clear_burst_groups(&mut self) -> Result<(), PipelineError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM burst_groups", [])?;
        tx.execute(
            "UPDATE photos SET burst_group_id = NULL, burst_sequence_index = NULL,
             burst_group_size = NULL, burst_representative = 0",
            [],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn insert_burst_group(
        &mut self,
        id: &str,
        member_ids: &[i64],
        representative_id: i64,
        time_span_seconds: f64,
        first_photo_ts: DateTime<Utc>,
        camera_make: Option<&str>,
        camera_model: Option<&str>,
    ) -> Result<(), PipelineError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO burst_groups (id, photo_count, representative_photo_id, time_span_seconds, first_photo_ts, camera_make, camera_model)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![id, member_ids.len() as i64, representative_id, time_span_seconds, first_photo_ts.to_rfc3339(), camera_make, camera_model],
        )?;
        for (idx, &photo_id) in member_ids.iter().enumerate() {
            tx.execute(
                "UPDATE photos SET burst_group_id = ?1, burst_sequence_index = ?2, burst_group_size = ?3, burst_representative = ?4
                 WHERE id = ?5",
                params![id, idx as i64, member_ids.len() as i64, (photo_id == representative_id) as i64, photo_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Clears all prior duplicate-cluster state, per this module's
    /// "cleared at the start of a run" lifecycle.
    pub fn clear_duplicate_clusters(&mut self) -> Result<(), PipelineError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM duplicate_clusters", [])?;
        tx.execute(
            "UPDATE photos SET duplicate_cluster_id = NULL, duplicate_cluster_size = NULL,
             duplicate_representative = 0, duplicate_similarity_score = NULL",
            [],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn insert_duplicate_cluster(
        &mut self,
        id: &str,
        member_ids: &[i64],
        representative_id: i64,
        max_distance: u32,
        cluster_type: &str,
        member_scores: &[(i64, f64)],
    ) -> Result<(), PipelineError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO duplicate_clusters (id, photo_count, representative_photo_id, max_distance, cluster_type)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, member_ids.len() as i64, representative_id, max_distance as i64, cluster_type],
        )?;
        for &photo_id in member_ids {
            let score = member_scores
                .iter()
                .find(|(id, _)| *id == photo_id)
                .map(|(_, s)| *s);
            tx.execute(
                "UPDATE photos SET duplicate_cluster_id = ?1, duplicate_cluster_size = ?2,
                 duplicate_representative = ?3, duplicate_similarity_score = ?4
                 WHERE id = ?5",
                params![id, member_ids.len() as i64, (photo_id == representative_id) as i64, score, photo_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Check referential and invariant constraints ( invariants,
    /// the `verify` CLI command).
    pub fn verify(&self) -> Result<Vec<String>, PipelineError> {
        let mut violations = Vec::new();

        let orphan_thumbs: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM thumbnails WHERE photo_id NOT IN (SELECT id FROM photos)",
            [],
            |r| r.get(0),
        )?;
        if orphan_thumbs > 0 {
            violations.push(format!("{orphan_thumbs} thumbnail row(s) reference a missing photo"));
        }

        let orphan_colors: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM photo_colors WHERE photo_id NOT IN (SELECT id FROM photos)",
            [],
            |r| r.get(0),
        )?;
        if orphan_colors > 0 {
            violations.push(format!("{orphan_colors} colour row(s) reference a missing photo"));
        }

        let bad_thumb_counts: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM (
                SELECT photo_id, COUNT(*) c FROM thumbnails GROUP BY photo_id HAVING c != 4
             )",
            [],
            |r| r.get(0),
        )?;
        if bad_thumb_counts > 0 {
            violations.push(format!("{bad_thumb_counts} photo(s) do not have exactly four thumbnails"));
        }

        let bad_weight_sums: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM (
                SELECT photo_id, SUM(weight) s FROM photo_colors GROUP BY photo_id
                HAVING s < 0.99 OR s > 1.01
             )",
            [],
            |r| r.get(0),
        )?;
        if bad_weight_sums > 0 {
            violations.push(format!("{bad_weight_sums} photo(s) have colour weights not summing to ~1.0"));
        }

        let mut stmt = self
            .conn
            .prepare("SELECT perceptual_hash FROM photos WHERE perceptual_hash IS NOT NULL")?;
        let bad_hashes = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .filter(|h| !is_valid_phash(h))
            .count();
        if bad_hashes > 0 {
            violations.push(format!("{bad_hashes} perceptual hash(es) do not match ^[0-9a-f]{{16}}$"));
        }

        Ok(violations)
    }
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|d| d.with_timezone(&Utc))
}

fn format_value(value: &rusqlite::types::Value) -> String {
    match value {
        rusqlite::types::Value::Null => "NULL".to_string(),
        rusqlite::types::Value::Integer(i) => i.to_string(),
        rusqlite::types::Value::Real(f) => f.to_string(),
        rusqlite::types::Value::Text(s) => s.clone(),
        rusqlite::types::Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

fn is_valid_phash(s: &str) -> bool {
    s.len() == 16 && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Photo;

    fn sample_photo(path: &str) -> Photo {
        Photo {
            path: PathBuf::from(path),
            content_hash: [1u8; 32],
            file_size: 1000,
            mtime_ns: 123,
            indexed_at: Utc.timestamp_opt(0, 0).unwrap(),
            camera_make: Some("Canon".into()),
            camera_model: Some("EOS R5".into()),
            lens_make: None,
            lens_model: None,
            iso: Some(100),
            aperture: Some(2.8),
            shutter_speed: None,
            exposure_compensation: None,
            focal_length: Some(50.0),
            focal_length_35mm: Some(50.0),
            date_taken: Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
            date_digitized: None,
            width: 4000,
            height: 3000,
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
            time_of_day: Some("midday".into()),
            season: Some("winter".into()),
            focal_category: Some("normal".into()),
            shooting_condition: Some("bright".into()),
            perceptual_hash: Some("0123456789abcdef".into()),
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
    fn upsert_and_read_back_photo() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cat = Catalog::open(&tmp.path().join("cat.db")).unwrap();
        let photo = sample_photo("/a/b.jpg");
        let mut thumbs = BTreeMap::new();
        thumbs.insert(64, vec![1, 2, 3]);
        thumbs.insert(256, vec![4, 5, 6]);
        thumbs.insert(512, vec![7, 8, 9]);
        thumbs.insert(1024, vec![10, 11, 12]);
        let colors = vec![];

        let id = cat.upsert_photo(&photo, &thumbs, &colors).unwrap();
        assert!(id > 0);

        let existing = cat.existing_summary(Path::new("/a/b.jpg")).unwrap().unwrap();
        assert_eq!(existing.0, id);
        assert_eq!(existing.1, 1000);

        let thumb = cat.thumbnail(id, 64).unwrap().unwrap();
        assert_eq!(thumb, vec![1, 2, 3]);
    }

    #[test]
    fn verify_flags_missing_thumbnails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cat = Catalog::open(&tmp.path().join("cat.db")).unwrap();
        let photo = sample_photo("/a/c.jpg");
        let empty = BTreeMap::new();
        cat.upsert_photo(&photo, &empty, &[]).unwrap();

        let violations = cat.verify().unwrap();
        assert!(violations.iter().any(|v| v.contains("four thumbnails")));
    }

    #[test]
    fn tagging_a_photo_is_idempotent_and_queryable() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cat = Catalog::open(&tmp.path().join("cat.db")).unwrap();
        let id = cat.upsert_photo(&sample_photo("/a/d.jpg"), &BTreeMap::new(), &[]).unwrap();

        cat.tag_photo(id, "sunset").unwrap();
        cat.tag_photo(id, "beach").unwrap();
        cat.tag_photo(id, "sunset").unwrap();

        assert_eq!(cat.tags_for_photo(id).unwrap(), vec!["beach", "sunset"]);
        assert_eq!(cat.photos_with_tag("sunset").unwrap(), vec![id]);
        assert!(cat.photos_with_tag("nonexistent").unwrap().is_empty());
    }

    #[test]
    fn collections_group_photos_by_name() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cat = Catalog::open(&tmp.path().join("cat.db")).unwrap();
        let a = cat.upsert_photo(&sample_photo("/a/e.jpg"), &BTreeMap::new(), &[]).unwrap();
        let b = cat.upsert_photo(&sample_photo("/a/f.jpg"), &BTreeMap::new(), &[]).unwrap();

        cat.add_to_collection(a, "vacation").unwrap();
        cat.add_to_collection(b, "vacation").unwrap();
        cat.add_to_collection(a, "vacation").unwrap();

        assert_eq!(cat.photos_in_collection("vacation").unwrap(), vec![a, b]);
    }
}
