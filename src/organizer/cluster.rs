use crate::config::{ClusteringConfig, Linkage};
use crate::error::ClusteringError;
use tracing::debug;

/// A group of semantically similar files
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Renumbered so that ids follow the order of each cluster's first member
    pub id: usize,
    /// Indices into the clustered vector set, ascending
    pub members: Vec<usize>,
    /// Average embedding of the members
    pub centroid: Vec<f32>,
    /// Member closest to the centroid
    pub medoid: usize,
    /// More members than the configured cap; kept whole, never split
    pub oversized: bool,
    /// Folder name, set by the labeler
    pub label: Option<String>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members ordered by closeness to the centroid, ties by index
    pub fn members_by_centrality(&self, vectors: &[Vec<f32>]) -> Vec<usize> {
        let mut ranked: Vec<(usize, f32)> = self
            .members
            .iter()
            .map(|&m| (m, cosine_similarity(&vectors[m], &self.centroid)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().map(|(m, _)| m).collect()
    }
}

/// Threshold-driven agglomerative clustering over cosine distance
///
/// No cluster count is given up front: the two closest groups are merged
/// until the closest remaining pair is farther apart than the threshold.
pub struct ClusterEngine {
    distance_threshold: f32,
    linkage: Linkage,
    max_cluster_size: usize,
}

impl ClusterEngine {
    pub fn new(config: &ClusteringConfig) -> Self {
        Self {
            distance_threshold: config.distance_threshold,
            linkage: config.linkage,
            max_cluster_size: config.max_cluster_size,
        }
    }

    /// Cluster id for each input vector
    pub fn assign(&self, vectors: &[Vec<f32>]) -> Result<Vec<usize>, ClusteringError> {
        let clusters = self.cluster(vectors)?;
        let mut assignment = vec![0; vectors.len()];
        for cluster in &clusters {
            for &member in &cluster.members {
                assignment[member] = cluster.id;
            }
        }
        Ok(assignment)
    }

    /// Group vectors into clusters
    ///
    /// An empty input gives no clusters; a single vector is its own
    /// singleton. Non-finite components or differing dimensions are errors.
    pub fn cluster(&self, vectors: &[Vec<f32>]) -> Result<Vec<Cluster>, ClusteringError> {
        validate(vectors)?;

        let groups = if vectors.len() < 2 {
            (0..vectors.len()).map(|i| vec![i]).collect()
        } else {
            self.agglomerate(vectors)
        };

        let mut clusters: Vec<Cluster> = groups
            .into_iter()
            .map(|members| {
                let centroid = centroid(vectors, &members);
                let medoid = medoid(vectors, &members, &centroid);
                Cluster {
                    id: 0,
                    oversized: members.len() > self.max_cluster_size,
                    members,
                    centroid,
                    medoid,
                    label: None,
                }
            })
            .collect();

        clusters.sort_by_key(|c| c.members[0]);
        for (id, cluster) in clusters.iter_mut().enumerate() {
            cluster.id = id;
        }

        debug!(
            "Clustered {} vectors into {} clusters (threshold {}, {:?} linkage)",
            vectors.len(),
            clusters.len(),
            self.distance_threshold,
            self.linkage
        );
        Ok(clusters)
    }

    fn agglomerate(&self, vectors: &[Vec<f32>]) -> Vec<Vec<usize>> {
        let n = vectors.len();
        let mut dist = vec![0.0f32; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = cosine_distance(&vectors[i], &vectors[j]);
                dist[i * n + j] = d;
                dist[j * n + i] = d;
            }
        }

        let mut groups: Vec<Option<Vec<usize>>> = (0..n).map(|i| Some(vec![i])).collect();

        loop {
            // Closest active pair; strict comparison keeps the lowest (i, j) on ties
            let mut best: Option<(usize, usize, f32)> = None;
            for i in 0..n {
                if groups[i].is_none() {
                    continue;
                }
                for j in (i + 1)..n {
                    if groups[j].is_none() {
                        continue;
                    }
                    let d = dist[i * n + j];
                    if best.map_or(true, |(_, _, b)| d < b) {
                        best = Some((i, j, d));
                    }
                }
            }

            let (i, j, d) = match best {
                Some(pair) if pair.2 <= self.distance_threshold => pair,
                _ => break,
            };

            let size_i = groups[i].as_ref().map_or(0, Vec::len) as f32;
            let size_j = groups[j].as_ref().map_or(0, Vec::len) as f32;

            // Lance-Williams update of distances to the merged group (kept at i)
            for k in 0..n {
                if k == i || k == j || groups[k].is_none() {
                    continue;
                }
                let dik = dist[i * n + k];
                let djk = dist[j * n + k];
                let merged = match self.linkage {
                    Linkage::Average => (size_i * dik + size_j * djk) / (size_i + size_j),
                    Linkage::Complete => dik.max(djk),
                    Linkage::Single => dik.min(djk),
                };
                dist[i * n + k] = merged;
                dist[k * n + i] = merged;
            }

            let absorbed = groups[j].take().unwrap_or_default();
            if let Some(group) = groups[i].as_mut() {
                group.extend(absorbed);
                group.sort_unstable();
            }
            debug!("Merged groups {} and {} at distance {:.4}", i, j, d);
        }

        groups.into_iter().flatten().collect()
    }
}

fn validate(vectors: &[Vec<f32>]) -> Result<(), ClusteringError> {
    let Some(first) = vectors.first() else {
        return Ok(());
    };
    let expected = first.len();
    for (index, vector) in vectors.iter().enumerate() {
        if vector.len() != expected {
            return Err(ClusteringError::DimensionMismatch {
                index,
                got: vector.len(),
                expected,
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(ClusteringError::NonFinite { index });
        }
    }
    Ok(())
}

fn centroid(vectors: &[Vec<f32>], members: &[usize]) -> Vec<f32> {
    let dimension = vectors[members[0]].len();
    let mut centroid = vec![0.0f32; dimension];
    for &m in members {
        for (c, v) in centroid.iter_mut().zip(&vectors[m]) {
            *c += v;
        }
    }
    let count = members.len() as f32;
    for c in &mut centroid {
        *c /= count;
    }
    centroid
}

fn medoid(vectors: &[Vec<f32>], members: &[usize], centroid: &[f32]) -> usize {
    let mut best = members[0];
    let mut best_sim = f32::NEG_INFINITY;
    for &m in members {
        let sim = cosine_similarity(&vectors[m], centroid);
        if sim > best_sim {
            best_sim = sim;
            best = m;
        }
    }
    best
}

/// Compute cosine similarity between two vectors
///
/// Zero vectors and length mismatches have similarity 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Cosine distance in `[0, 2]`
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - cosine_similarity(a, b)).clamp(0.0, 2.0)
}
