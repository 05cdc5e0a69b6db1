use crate::error::PipelineError;
use crate::models::SortMode;
use crate::organizer::generator::is_reserved_name;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Why a file goes to its folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PlanOrigin {
    /// Member of a semantic cluster
    Cluster { id: usize },
    /// Binary, empty, unsupported or failed file
    Fallback,
    /// Extension or date mode
    Metadata,
}

/// One file and its destination folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub source: PathBuf,
    pub folder: String,
    pub origin: PlanOrigin,
}

/// Counters describing one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub files: usize,
    pub clustered: usize,
    pub fallback: usize,
    /// Files whose extraction or embedding failed (counted in `fallback` too)
    pub failed: usize,
    pub clusters: usize,
    pub generated_labels: usize,
    pub elapsed_ms: u64,
}

/// File to folder mapping produced by a run
///
/// Immutable once built: entries are ordered by source path, every source
/// appears once, and every folder is a single safe path segment.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationPlan {
    base: PathBuf,
    mode: SortMode,
    entries: Vec<PlanEntry>,
    stats: RunStats,
}

impl OrganizationPlan {
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn mode(&self) -> SortMode {
        self.mode
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Destination folder of a file
    pub fn folder_for(&self, source: &Path) -> Option<&str> {
        self.entries
            .binary_search_by(|e| e.source.as_path().cmp(source))
            .ok()
            .map(|i| self.entries[i].folder.as_str())
    }

    /// Files grouped by destination folder, folders sorted by name
    pub fn by_folder(&self) -> BTreeMap<&str, Vec<&PlanEntry>> {
        let mut groups: BTreeMap<&str, Vec<&PlanEntry>> = BTreeMap::new();
        for entry in &self.entries {
            groups.entry(entry.folder.as_str()).or_default().push(entry);
        }
        groups
    }
}

/// Whether a folder name is one safe path segment on every common filesystem
pub fn is_safe_folder_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && !is_reserved_name(name)
}

/// Collects plan entries and checks the plan invariants
pub struct PlanBuilder {
    base: PathBuf,
    mode: SortMode,
    entries: Vec<PlanEntry>,
    seen: HashSet<PathBuf>,
}

impl PlanBuilder {
    pub fn new(base: impl Into<PathBuf>, mode: SortMode) -> Self {
        Self {
            base: base.into(),
            mode,
            entries: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn add(&mut self, source: PathBuf, folder: String, origin: PlanOrigin) -> Result<(), PipelineError> {
        if !is_safe_folder_name(&folder) {
            return Err(PipelineError::Internal(format!(
                "unsafe destination folder name {:?}",
                folder
            )));
        }
        if !self.seen.insert(source.clone()) {
            return Err(PipelineError::Internal(format!(
                "file planned twice: {}",
                source.display()
            )));
        }
        self.entries.push(PlanEntry {
            source,
            folder,
            origin,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn build(mut self, stats: RunStats) -> OrganizationPlan {
        self.entries.sort_by(|a, b| a.source.cmp(&b.source));
        OrganizationPlan {
            base: self.base,
            mode: self.mode,
            entries: self.entries,
            stats,
        }
    }
}
