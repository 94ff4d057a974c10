use std::collections::HashSet;

use super::embedding::Embedding;

/// Cluster identifier. Starts at 1 and is never reused within a registry.
pub type ClusterId = u32;

/// Default prefix for cluster labels (`Persona_001`, `Persona_002`, ...)
pub const DEFAULT_LABEL_PREFIX: &str = "Persona";

/// Build the externally visible label for a cluster id
pub fn cluster_label(prefix: &str, id: ClusterId) -> String {
    format!("{}_{:03}", prefix, id)
}

/// One group of embeddings believed to belong to the same person
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Creation-order identifier
    pub(crate) id: ClusterId,
    /// Folder/group name derived from `id`
    pub(crate) label: String,
    /// Members in arrival order, append-only
    pub(crate) members: Vec<Embedding>,
    /// Source images already attributed to this cluster
    pub(crate) seen_sources: HashSet<String>,
    /// Same set in arrival order, for reporting
    pub(crate) source_order: Vec<String>,
    /// Set once the representative crop has been written
    pub(crate) has_representative: bool,
}

impl Cluster {
    pub(crate) fn new(id: ClusterId, label: String, first: Embedding) -> Self {
        Self {
            id,
            label,
            members: vec![first],
            seen_sources: HashSet::new(),
            source_order: Vec::new(),
            has_representative: false,
        }
    }

    pub fn id(&self) -> ClusterId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn members(&self) -> &[Embedding] {
        &self.members
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Source identifiers in the order they were first recorded
    pub fn sources(&self) -> &[String] {
        &self.source_order
    }

    pub fn has_source(&self, source: &str) -> bool {
        self.seen_sources.contains(source)
    }

    pub fn has_representative(&self) -> bool {
        self.has_representative
    }

    /// Returns true the first time `source` is seen by this cluster.
    pub(crate) fn record_source(&mut self, source: &str) -> bool {
        if self.seen_sources.insert(source.to_string()) {
            self.source_order.push(source.to_string());
            true
        } else {
            false
        }
    }

    /// Returns true only on the call that flips the flag.
    pub(crate) fn record_representative(&mut self) -> bool {
        !std::mem::replace(&mut self.has_representative, true)
    }
}
