//! Indexing Orchestrator. Walks a directory tree, filters by
//! extension, dispatches file paths to a fixed worker pool over a bounded
//! queue, and aggregates statistics. Per-file failures are isolated: they
//! are caught, counted, logged with path and kind, and the worker moves
//! on to the next path.
//!
//! Follows the fixed-worker-thread-pool idiom used for HTTP request
//! handling elsewhere in this codebase (`std::thread::Builder` pool
//! pulling off a shared receiver), generalized to file processing, and
//! `chehlo-gemkeep`'s `import/pipeline.rs` for the stats-record-and-skip-
//! if-unchanged shape.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use image::GenericImageView;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::catalog::Catalog;
use crate::codec::{self, ImageFormat};
use crate::config::Config;
use crate::error::PipelineError;
use crate::inference;
use crate::metadata::{self, Photo};
use crate::perceptual::{palette, phash, thumbnail};
use crate::stats::{Stats, StatsSnapshot};

/// The bounded work queue depth between the directory walk and the
/// worker pool.
const QUEUE_DEPTH: usize = 100;
/// Progress is reported every this many processed files.
const PROGRESS_INTERVAL: u64 = 100;

/// Walk `root`, filter by the codec layer's supported extension set, and
/// index every matching file into `catalog_path`. Returns the final
/// statistics snapshot.
pub fn run(root: &Path, config: &Config) -> Result<StatsSnapshot, PipelineError> {
    let catalog = Catalog::open(&config.catalogue_path)?;
    let catalog = Arc::new(Mutex::new(catalog));
    let stats = Arc::new(Stats::new());

    let (sender, receiver) = crossbeam_channel::bounded::<PathBuf>(QUEUE_DEPTH);

    let workers: Vec<_> = (0..config.workers.max(1))
        .map(|i| {
            let receiver = receiver.clone();
            let catalog = Arc::clone(&catalog);
            let stats = Arc::clone(&stats);
            let perf_stats = config.perf_stats;
            std::thread::Builder::new()
                .name(format!("photodex-worker-{i}"))
                .spawn(move || worker_loop(receiver, catalog, stats, perf_stats))
                .expect("failed to spawn indexing worker")
        })
        .collect();

    let extensions = ImageFormat::supported_extensions();
    let mut found = 0u64;
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if !matches {
            continue;
        }
        found += 1;
        if sender.send(path.to_path_buf()).is_err() {
            break;
        }
    }
    stats.record_found(found);
    drop(sender);

    for w in workers {
        let _ = w.join();
    }

    Ok(stats.snapshot())
}

fn worker_loop(
    receiver: crossbeam_channel::Receiver<PathBuf>,
    catalog: Arc<Mutex<Catalog>>,
    stats: Arc<Stats>,
    perf_stats: bool,
) {
    while let Ok(path) = receiver.recv() {
        match process_one(&path, &catalog, &stats, perf_stats) {
            Ok(Outcome::Skipped) => stats.record_skipped(),
            Ok(Outcome::Inserted) => stats.record_processed(),
            Ok(Outcome::Updated) => {
                stats.record_processed();
                stats.record_updated();
            }
            Err(e) => {
                log::warn!("indexing failure for {}: {} ({})", path.display(), e, e.kind());
                stats.record_failed(e.kind());
            }
        }

        let processed = stats.processed_count();
        if processed > 0 && processed % PROGRESS_INTERVAL == 0 {
            log::info!("indexed {processed} files");
        }
    }
}

enum Outcome {
    Skipped,
    Inserted,
    Updated,
}

fn process_one(
    path: &Path,
    catalog: &Arc<Mutex<Catalog>>,
    stats: &Arc<Stats>,
    perf_stats: bool,
) -> Result<Outcome, PipelineError> {
    let fs_meta = std::fs::metadata(path)
        .map_err(|e| PipelineError::decode(path, format!("cannot stat file: {e}")))?;
    let file_size = fs_meta.len();

    let content_hash = time_stage("hash", perf_stats, stats, || hash_file(path))?;

    let existing = {
        let cat = catalog.lock().unwrap();
        cat.existing_summary(path)?
    };
    let is_update = if let Some((_, existing_size, existing_mtime)) = existing {
        let mtime_ns = fs_meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0);
        if existing_size == file_size && existing_mtime == mtime_ns {
            return Ok(Outcome::Skipped);
        }
        true
    } else {
        false
    };

    let format = ImageFormat::from_path(path)
        .ok_or_else(|| PipelineError::decode(path, "unsupported extension"))?;

    let decoded = time_stage("decode", perf_stats, stats, || codec::decode(path, format))?;

    let mut photo = time_stage("metadata", perf_stats, stats, || {
        Ok::<Photo, PipelineError>(metadata::extract(path, decoded.width(), decoded.height(), content_hash))
    })?;

    let oriented = thumbnail::apply_orientation(decoded, photo.orientation.unwrap_or(1));

    let thumbnails = time_stage("thumbnail", perf_stats, stats, || {
        Ok::<_, PipelineError>(thumbnail::generate_all(&oriented))
    })?;

    let colors = time_stage("palette", perf_stats, stats, || {
        Ok::<_, PipelineError>(palette::extract(&oriented).unwrap_or_default())
    })?;

    let hash = time_stage("phash", perf_stats, stats, || {
        Ok::<_, PipelineError>(phash::compute(&oriented))
    })?;
    photo.perceptual_hash = Some(hash);

    apply_inference(&mut photo);

    {
        let mut cat = catalog.lock().unwrap();
        cat.upsert_photo(&photo, &thumbnails, &colors)?;
    }

    Ok(if is_update { Outcome::Updated } else { Outcome::Inserted })
}

fn time_stage<T>(
    stage: &str,
    perf_stats: bool,
    stats: &Arc<Stats>,
    f: impl FnOnce() -> Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    if !perf_stats {
        return f();
    }
    let start = Instant::now();
    let result = f();
    stats.record_stage_time(stage, start.elapsed());
    result
}

fn hash_file(path: &Path) -> Result<[u8; 32], PipelineError> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| PipelineError::decode(path, format!("cannot open file: {e}")))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 65536];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| PipelineError::decode(path, format!("read error: {e}")))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}

/// Fill in the inference fields (time-of-day, season, focal category,
/// shooting condition) from the already-populated capture/temporal
/// fields. Null inputs leave the output null.
fn apply_inference(photo: &mut Photo) {
    photo.time_of_day = photo.date_taken.map(inference::time_of_day).map(String::from);
    photo.season = photo.date_taken.map(inference::season).map(String::from);
    photo.focal_category = photo
        .focal_length_35mm
        .map(inference::focal_category)
        .map(String::from);
    let flash_fired = photo.flash_fired.unwrap_or(false);
    photo.shooting_condition = if flash_fired {
        Some(inference::shooting_condition(true, 0).to_string())
    } else {
        photo
            .iso
            .map(|iso| inference::shooting_condition(false, iso).to_string())
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    #[test]
    fn hash_file_is_stable_for_identical_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.jpg");
        let img = DynamicImage::new_rgb8(8, 8);
        img.save(&path).unwrap();

        let h1 = hash_file(&path).unwrap();
        let h2 = hash_file(&path).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn run_indexes_a_small_directory() {
        let src_dir = tempfile::tempdir().unwrap();
        let img = DynamicImage::new_rgb8(32, 32);
        img.save(src_dir.path().join("one.jpg")).unwrap();
        img.save(src_dir.path().join("two.bmp")).unwrap();
        std::fs::write(src_dir.path().join("ignore.txt"), b"not a photo").unwrap();

        let cat_dir = tempfile::tempdir().unwrap();
        let mut config = Config::new(cat_dir.path().join("cat.db"));
        config.workers = 2;

        let snapshot = run(src_dir.path(), &config).unwrap();
        assert_eq!(snapshot.found, 2);
        assert_eq!(snapshot.processed, 2);
        assert_eq!(snapshot.failed, 0);
    }

    #[test]
    fn rerun_with_no_changes_skips_everything() {
        let src_dir = tempfile::tempdir().unwrap();
        let img = DynamicImage::new_rgb8(16, 16);
        img.save(src_dir.path().join("one.jpg")).unwrap();

        let cat_dir = tempfile::tempdir().unwrap();
        let config = Config::new(cat_dir.path().join("cat.db"));

        let first = run(src_dir.path(), &config).unwrap();
        assert_eq!(first.processed, 1);

        let second = run(src_dir.path(), &config).unwrap();
        assert_eq!(second.processed, 0);
        assert_eq!(second.skipped, 1);
    }
}
