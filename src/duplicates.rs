//! Duplicate Clusterer. Exact content-hash matches form
//! clusters ahead of anything perceptual; remaining photos are clustered
//! by Hamming distance over their perceptual hash using a BK-tree for
//! radius queries, then expanded by density until no more neighbours
//! fall within the configured threshold: a union-find-free forward
//! clustering pass with `HashMap`-keyed grouping for exact matches,
//! extended with a BK-tree for the near-duplicate pass.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::catalog::{Catalog, DuplicateCandidate};
use crate::config::Config;
use crate::error::PipelineError;
use crate::perceptual::phash;

#[derive(Debug, Clone)]
pub struct DuplicateCluster {
    pub id: String,
    pub member_ids: Vec<i64>,
    pub representative_id: i64,
    pub max_distance: u32,
    pub cluster_type: &'static str,
    pub member_scores: Vec<(i64, f64)>,
}

/// Detect duplicate clusters across the whole catalogue and persist
/// them, replacing any prior duplicate state.
pub fn detect_and_store(
    catalog: &mut Catalog,
    config: &Config,
) -> Result<Vec<DuplicateCluster>, PipelineError> {
    let candidates = catalog.photos_for_duplicate_detection()?;
    let clusters = detect(&candidates, config.analysis_hamming_threshold);

    catalog.clear_duplicate_clusters()?;
    for cluster in &clusters {
        catalog.insert_duplicate_cluster(
            &cluster.id,
            &cluster.member_ids,
            cluster.representative_id,
            cluster.max_distance,
            cluster.cluster_type,
            &cluster.member_scores,
        )?;
    }
    Ok(clusters)
}

fn detect(candidates: &[DuplicateCandidate], threshold: u32) -> Vec<DuplicateCluster> {
    let mut clusters = Vec::new();
    let mut claimed: HashSet<i64> = HashSet::new();

    // Exact-content-hash pass: groups sharing a byte-identical file,
    // regardless of perceptual hash, take priority.
    let mut by_content: HashMap<[u8; 32], Vec<&DuplicateCandidate>> = HashMap::new();
    for c in candidates {
        by_content.entry(c.content_hash).or_default().push(c);
    }
    for group in by_content.values() {
        if group.len() < 2 {
            continue;
        }
        let member_ids: Vec<i64> = group.iter().map(|c| c.id).collect();
        for id in &member_ids {
            claimed.insert(*id);
        }
        clusters.push(DuplicateCluster {
            id: Uuid::new_v4().to_string(),
            representative_id: group[0].id,
            max_distance: 0,
            cluster_type: "exact",
            member_scores: member_ids.iter().map(|&id| (id, 0.0)).collect(),
            member_ids,
        });
    }

    // Near-duplicate pass: BK-tree radius search over perceptual hashes
    // of the remaining photos, then expand each seed by density until no
    // further neighbour falls within `threshold`.
    let remaining: Vec<&DuplicateCandidate> =
        candidates.iter().filter(|c| !claimed.contains(&c.id)).collect();

    let mut tree = BkTree::new();
    for c in &remaining {
        tree.insert(c.id, &c.perceptual_hash);
    }

    let by_id: HashMap<i64, &DuplicateCandidate> = remaining.iter().map(|c| (c.id, *c)).collect();

    for c in &remaining {
        if claimed.contains(&c.id) {
            continue;
        }
        let mut cluster_ids: HashSet<i64> = HashSet::new();
        cluster_ids.insert(c.id);

        // Expand by density: repeatedly pull in anything within
        // `threshold` of any already-clustered member.
        loop {
            let mut grew = false;
            let frontier: Vec<i64> = cluster_ids.iter().copied().collect();
            for member_id in frontier {
                let Some(member) = by_id.get(&member_id) else { continue };
                for (neighbor_id, distance) in tree.within(&member.perceptual_hash, threshold) {
                    if !claimed.contains(&neighbor_id) && cluster_ids.insert(neighbor_id) {
                        let _ = distance;
                        grew = true;
                    }
                }
            }
            if !grew {
                break;
            }
        }

        if cluster_ids.len() < 2 {
            continue;
        }

        for id in &cluster_ids {
            claimed.insert(*id);
        }

        let members: Vec<&DuplicateCandidate> =
            cluster_ids.iter().filter_map(|id| by_id.get(id).copied()).collect();

        let max_distance = pairwise_max_distance(&members);
        let cluster_type = phash::similarity_class(max_distance);
        let mean_scores = mean_distance_scores(&members);
        let representative_id = mean_scores
            .iter()
            .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(id, _)| *id)
            .unwrap_or(members[0].id);

        clusters.push(DuplicateCluster {
            id: Uuid::new_v4().to_string(),
            member_ids: members.iter().map(|m| m.id).collect(),
            representative_id,
            max_distance,
            cluster_type,
            member_scores: mean_scores,
        });
    }

    clusters
}

fn pairwise_max_distance(members: &[&DuplicateCandidate]) -> u32 {
    let mut max = 0u32;
    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            if let Some(d) = phash::hamming_distance(&members[i].perceptual_hash, &members[j].perceptual_hash) {
                max = max.max(d);
            }
        }
    }
    max
}

fn mean_distance_scores(members: &[&DuplicateCandidate]) -> Vec<(i64, f64)> {
    members
        .iter()
        .map(|m| {
            let total: u32 = members
                .iter()
                .filter(|other| other.id != m.id)
                .filter_map(|other| phash::hamming_distance(&m.perceptual_hash, &other.perceptual_hash))
                .sum();
            let count = (members.len() - 1).max(1);
            (m.id, total as f64 / count as f64)
        })
        .collect()
}

/// A BK-tree over 64-bit hex-encoded perceptual hashes, keyed by Hamming
/// distance. Supports radius queries in roughly O(log n) expected tree
/// descents rather than the O(n) pairwise scan a flat list would need.
struct BkTree {
    root: Option<Box<BkNode>>,
}

struct BkNode {
    id: i64,
    hash: String,
    children: HashMap<u32, Box<BkNode>>,
}

impl BkTree {
    fn new() -> Self {
        BkTree { root: None }
    }

    fn insert(&mut self, id: i64, hash: &str) {
        let Some(root) = &mut self.root else {
            self.root = Some(Box::new(BkNode { id, hash: hash.to_string(), children: HashMap::new() }));
            return;
        };
        let mut node = root.as_mut();
        loop {
            let distance = phash::hamming_distance(&node.hash, hash).unwrap_or(64);
            if distance == 0 {
                return;
            }
            if node.children.contains_key(&distance) {
                node = node.children.get_mut(&distance).unwrap();
            } else {
                node.children.insert(
                    distance,
                    Box::new(BkNode { id, hash: hash.to_string(), children: HashMap::new() }),
                );
                return;
            }
        }
    }

    fn within(&self, hash: &str, radius: u32) -> Vec<(i64, u32)> {
        let mut results = Vec::new();
        if let Some(root) = &self.root {
            Self::search(root, hash, radius, &mut results);
        }
        results
    }

    fn search(node: &BkNode, hash: &str, radius: u32, out: &mut Vec<(i64, u32)>) {
        let distance = phash::hamming_distance(&node.hash, hash).unwrap_or(64);
        if distance <= radius {
            out.push((node.id, distance));
        }
        let lower = distance.saturating_sub(radius);
        let upper = distance + radius;
        for (&edge, child) in &node.children {
            if edge >= lower && edge <= upper {
                Self::search(child, hash, radius, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, hash: &str, content: u8) -> DuplicateCandidate {
        DuplicateCandidate { id, perceptual_hash: hash.to_string(), content_hash: [content; 32] }
    }

    #[test]
    fn exact_content_matches_form_an_exact_cluster() {
        let candidates =
            vec![candidate(1, "0000000000000000", 7), candidate(2, "ffffffffffffffff", 7)];
        let clusters = detect(&candidates, 15);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].cluster_type, "exact");
        assert_eq!(clusters[0].max_distance, 0);
    }

    #[test]
    fn near_identical_hashes_cluster_within_threshold() {
        let candidates = vec![
            candidate(1, "0000000000000000", 1),
            candidate(2, "0000000000000001", 2),
            candidate(3, "00000000000000ff", 3),
        ];
        let clusters = detect(&candidates, 15);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].member_ids.len(), 3);
    }

    #[test]
    fn distant_hashes_do_not_cluster() {
        let candidates = vec![candidate(1, "0000000000000000", 1), candidate(2, "ffffffffffffffff", 2)];
        let clusters = detect(&candidates, 15);
        assert!(clusters.is_empty());
    }

    #[test]
    fn bktree_within_finds_inserted_neighbor() {
        let mut tree = BkTree::new();
        tree.insert(1, "0000000000000000");
        tree.insert(2, "0000000000000003");
        let hits = tree.within("0000000000000000", 5);
        assert!(hits.iter().any(|(id, _)| *id == 2));
    }
}
