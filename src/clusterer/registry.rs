use super::distance::l2_distance;
use super::embedding::Embedding;
use super::error::ClusterError;
use super::types::{cluster_label, Cluster, ClusterId, DEFAULT_LABEL_PREFIX};

/// Default L2 cutoff for ArcFace embeddings
pub const DEFAULT_THRESHOLD: f32 = 1.1;

/// Default embedding length (ArcFace / buffalo_l)
pub const DEFAULT_EMBEDDING_DIM: usize = 512;

/// Default tolerance for the unit-norm check
pub const DEFAULT_NORM_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    /// Strict upper bound on member distance for a match
    pub threshold: f32,
    /// Length every embedding must have
    pub embedding_dim: usize,
    /// When set, reject embeddings whose norm is further than this from 1
    pub norm_tolerance: Option<f32>,
    /// Prefix used to build cluster labels
    pub label_prefix: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            norm_tolerance: Some(DEFAULT_NORM_TOLERANCE),
            label_prefix: DEFAULT_LABEL_PREFIX.to_string(),
        }
    }
}

impl RegistryConfig {
    pub fn new(threshold: f32, embedding_dim: usize) -> Self {
        Self {
            threshold,
            embedding_dim,
            ..Self::default()
        }
    }

    pub fn with_norm_tolerance(mut self, tolerance: Option<f32>) -> Self {
        self.norm_tolerance = tolerance;
        self
    }

    pub fn with_label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.label_prefix = prefix.into();
        self
    }
}

/// Online greedy single-linkage clustering.
///
/// Clusters are kept in creation order and members in arrival order. Each
/// [`assign`](Self::assign) scans clusters front to back and stops at the
/// first one holding any member closer than the threshold, so the result
/// depends on the order embeddings arrive in. Nothing is ever merged,
/// split or removed.
#[derive(Debug)]
pub struct ClusterRegistry {
    config: RegistryConfig,
    clusters: Vec<Cluster>,
    next_id: ClusterId,
}

impl ClusterRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self, ClusterError> {
        if !(config.threshold.is_finite() && config.threshold > 0.0) {
            return Err(ClusterError::InvalidThreshold(config.threshold));
        }
        if config.embedding_dim == 0 {
            return Err(ClusterError::InvalidDimension);
        }

        Ok(Self {
            config,
            clusters: Vec::new(),
            next_id: 1,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Place `embedding` in the first matching cluster, or in a new one.
    ///
    /// A rejected embedding leaves the registry untouched.
    pub fn assign(&mut self, embedding: Embedding) -> Result<ClusterHandle<'_>, ClusterError> {
        self.check(&embedding)?;

        match self.find_match(&embedding) {
            Some(idx) => {
                let cluster = &mut self.clusters[idx];
                cluster.members.push(embedding);
                Ok(ClusterHandle {
                    cluster,
                    created: false,
                })
            }
            None => {
                let id = self.next_id;
                self.next_id += 1;
                let label = cluster_label(&self.config.label_prefix, id);
                self.clusters.push(Cluster::new(id, label, embedding));

                let idx = self.clusters.len() - 1;
                Ok(ClusterHandle {
                    cluster: &mut self.clusters[idx],
                    created: true,
                })
            }
        }
    }

    fn check(&self, embedding: &Embedding) -> Result<(), ClusterError> {
        if embedding.dim() != self.config.embedding_dim {
            return Err(ClusterError::DimensionMismatch {
                expected: self.config.embedding_dim,
                found: embedding.dim(),
            });
        }

        if let Some(tolerance) = self.config.norm_tolerance {
            let norm = embedding.norm();
            if !((norm - 1.0).abs() <= tolerance) {
                return Err(ClusterError::NotNormalized { norm, tolerance });
            }
        }

        Ok(())
    }

    fn find_match(&self, embedding: &Embedding) -> Option<usize> {
        let threshold = self.config.threshold;
        self.clusters.iter().position(|cluster| {
            cluster
                .members
                .iter()
                .any(|member| l2_distance(embedding.as_slice(), member.as_slice()) < threshold)
        })
    }

    /// Clusters in creation order
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn get(&self, id: ClusterId) -> Option<&Cluster> {
        // ids are dense and start at 1
        id.checked_sub(1)
            .and_then(|idx| self.clusters.get(idx as usize))
    }

    /// Mutable handle to an existing cluster, for recording side effects later.
    pub fn handle(&mut self, id: ClusterId) -> Option<ClusterHandle<'_>> {
        let idx = id.checked_sub(1)? as usize;
        self.clusters.get_mut(idx).map(|cluster| ClusterHandle {
            cluster,
            created: false,
        })
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Sum of members across all clusters
    pub fn total_members(&self) -> usize {
        self.clusters.iter().map(Cluster::member_count).sum()
    }
}

/// Result of an assignment: the cluster that received the embedding.
///
/// Also the place where the caller records that the copy and crop side
/// effects were performed, so each fires at most once.
#[derive(Debug)]
pub struct ClusterHandle<'a> {
    cluster: &'a mut Cluster,
    created: bool,
}

impl<'a> ClusterHandle<'a> {
    pub fn id(&self) -> ClusterId {
        self.cluster.id
    }

    pub fn label(&self) -> &str {
        &self.cluster.label
    }

    /// Whether this assignment created the cluster
    pub fn created(&self) -> bool {
        self.created
    }

    pub fn member_count(&self) -> usize {
        self.cluster.member_count()
    }

    /// Should the source image still be copied into this cluster?
    pub fn is_new_for_source(&self, source: &str) -> bool {
        !self.cluster.has_source(source)
    }

    /// Mark `source` as copied. Returns true if it was not recorded before.
    pub fn record_source(&mut self, source: &str) -> bool {
        self.cluster.record_source(source)
    }

    /// Should a representative crop still be saved for this cluster?
    pub fn needs_representative(&self) -> bool {
        !self.cluster.has_representative
    }

    /// Mark the representative as saved. Returns true only the first time.
    pub fn record_representative(&mut self) -> bool {
        self.cluster.record_representative()
    }

    pub fn cluster(&self) -> &Cluster {
        &*self.cluster
    }
}
