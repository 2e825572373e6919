//! Burst Detector. Groups consecutive photos from the same
//! camera taken within a short time window and similar focal length into
//! a single burst, choosing the middle photo as representative. One
//! forward scan over a catalogue-ordered vector, emitting groups as it
//! goes, extending each open group by a time/focal-length tolerance check
//! rather than by hash distance.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::catalog::{BurstCandidate, Catalog};
use crate::config::Config;
use crate::error::PipelineError;

#[derive(Debug, Clone)]
pub struct BurstGroup {
    pub id: String,
    pub member_ids: Vec<i64>,
    pub representative_id: i64,
    pub time_span_seconds: f64,
    pub first_photo_ts: DateTime<Utc>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
}

/// Detect burst groups across the whole catalogue and persist them,
/// replacing any prior burst state. Returns the groups found.
pub fn detect_and_store(catalog: &mut Catalog, config: &Config) -> Result<Vec<BurstGroup>, PipelineError> {
    let candidates = catalog.photos_for_burst_detection()?;
    let groups = detect(&candidates, config);

    catalog.clear_burst_groups()?;
    for group in &groups {
        catalog.insert_burst_group(
            &group.id,
            &group.member_ids,
            group.representative_id,
            group.time_span_seconds,
            group.first_photo_ts,
            group.camera_make.as_deref(),
            group.camera_model.as_deref(),
        )?;
    }
    Ok(groups)
}

/// Pure grouping logic over an already (camera, date-taken)-ordered
/// candidate list. Exposed separately from `detect_and_store` so it can
/// be unit tested without a database.
fn detect(candidates: &[BurstCandidate], config: &Config) -> Vec<BurstGroup> {
    let mut groups = Vec::new();
    let mut i = 0;

    while i < candidates.len() {
        let anchor = &candidates[i];
        if anchor.date_taken.is_none() {
            i += 1;
            continue;
        }

        let mut run = vec![i];
        let mut j = i + 1;
        while j < candidates.len() {
            let prev = &candidates[j - 1];
            let cur = &candidates[j];

            let same_camera =
                cur.camera_make == anchor.camera_make && cur.camera_model == anchor.camera_model;
            let within_time = match (prev.date_taken, cur.date_taken) {
                (Some(p), Some(c)) => {
                    (c - p).num_milliseconds().unsigned_abs() as f64 / 1000.0
                        <= config.burst_time_window.as_secs_f64()
                }
                _ => false,
            };
            let within_focal = match (prev.focal_length, cur.focal_length) {
                (Some(p), Some(c)) => (p - c).abs() <= config.burst_focal_tolerance,
                (None, None) => true,
                _ => false,
            };

            if same_camera && within_time && within_focal {
                run.push(j);
                j += 1;
            } else {
                break;
            }
        }

        if run.len() >= config.burst_min_size {
            let members: Vec<&BurstCandidate> = run.iter().map(|&idx| &candidates[idx]).collect();
            let first_ts = members[0].date_taken.unwrap();
            let last_ts = members[members.len() - 1].date_taken.unwrap();
            let representative = members[members.len() / 2];

            groups.push(BurstGroup {
                id: Uuid::new_v4().to_string(),
                member_ids: members.iter().map(|m| m.id).collect(),
                representative_id: representative.id,
                time_span_seconds: (last_ts - first_ts).num_milliseconds().unsigned_abs() as f64
                    / 1000.0,
                first_photo_ts: first_ts,
                camera_make: anchor.camera_make.clone(),
                camera_model: anchor.camera_model.clone(),
            });
        }

        i = j.max(i + 1);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candidate(id: i64, secs_offset: i64, focal: Option<f64>) -> BurstCandidate {
        BurstCandidate {
            id,
            camera_make: Some("Canon".into()),
            camera_model: Some("EOS R5".into()),
            date_taken: Some(Utc.timestamp_opt(1_700_000_000 + secs_offset, 0).unwrap()),
            focal_length: focal,
        }
    }

    #[test]
    fn groups_close_shots_into_one_burst() {
        let config = Config::default();
        let candidates = vec![
            candidate(1, 0, Some(50.0)),
            candidate(2, 1, Some(50.0)),
            candidate(3, 2, Some(51.0)),
        ];
        let groups = detect(&candidates, &config);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].member_ids, vec![1, 2, 3]);
        assert_eq!(groups[0].representative_id, 2);
    }

    #[test]
    fn separates_groups_beyond_time_window() {
        let config = Config::default();
        let candidates = vec![
            candidate(1, 0, Some(50.0)),
            candidate(2, 1, Some(50.0)),
            candidate(3, 120, Some(50.0)),
            candidate(4, 121, Some(50.0)),
        ];
        let groups = detect(&candidates, &config);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn below_min_size_is_not_a_burst() {
        let mut config = Config::default();
        config.burst_min_size = 3;
        let candidates = vec![candidate(1, 0, Some(50.0)), candidate(2, 1, Some(50.0))];
        let groups = detect(&candidates, &config);
        assert!(groups.is_empty());
    }

    #[test]
    fn focal_length_change_breaks_the_run() {
        let config = Config::default();
        let candidates = vec![
            candidate(1, 0, Some(50.0)),
            candidate(2, 1, Some(50.0)),
            candidate(3, 2, Some(80.0)),
        ];
        let groups = detect(&candidates, &config);
        assert!(groups.is_empty() || groups[0].member_ids != vec![1, 2, 3]);
    }
}
