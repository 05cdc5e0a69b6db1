use crate::organizer::plan::{OrganizationPlan, PlanOrigin};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Represents a file move operation
#[derive(Debug, Clone)]
pub struct MoveOperation {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub origin: PlanOrigin,
}

/// Represents a directory creation operation
#[derive(Debug, Clone)]
pub struct CreateDirOperation {
    pub path: PathBuf,
}

/// Human-readable view of a plan, shown before confirmation
#[derive(Debug, Clone, Default)]
pub struct PreviewTree {
    pub directories_to_create: Vec<CreateDirOperation>,
    pub files_to_move: Vec<MoveOperation>,
}

impl PreviewTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the preview for a plan; folders that already exist are not
    /// listed for creation
    pub fn from_plan(plan: &OrganizationPlan) -> Self {
        let mut tree = Self::new();
        for (folder, entries) in plan.by_folder() {
            let dir = plan.base().join(folder);
            if !dir.is_dir() {
                tree.add_directory(dir.clone());
            }
            for entry in entries {
                let file_name = entry.source.file_name().unwrap_or_default();
                tree.add_move(entry.source.clone(), dir.join(file_name), entry.origin);
            }
        }
        tree
    }

    /// Add a directory to be created
    pub fn add_directory(&mut self, path: PathBuf) {
        self.directories_to_create.push(CreateDirOperation { path });
    }

    /// Add a file move operation
    pub fn add_move(&mut self, source: PathBuf, destination: PathBuf, origin: PlanOrigin) {
        self.files_to_move.push(MoveOperation {
            source,
            destination,
            origin,
        });
    }

    /// Check if there are any operations
    pub fn is_empty(&self) -> bool {
        self.directories_to_create.is_empty() && self.files_to_move.is_empty()
    }
}

impl fmt::Display for PreviewTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Proposed changes:")?;

        // Group files by directory
        let mut dir_files: BTreeMap<PathBuf, Vec<&MoveOperation>> = BTreeMap::new();
        for op in &self.files_to_move {
            let dir = op
                .destination
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| op.destination.clone());
            dir_files.entry(dir).or_default().push(op);
        }

        for (dir, files) in &dir_files {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| dir.display().to_string());
            let tag = if files.iter().all(|op| op.origin == PlanOrigin::Fallback) {
                " (fallback)"
            } else {
                ""
            };
            writeln!(f, "📁 {}/{}", name, tag)?;

            for file_op in files {
                let file_name = file_op
                    .source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "unknown".to_string());
                writeln!(f, "  📄 {}", file_name)?;
            }
        }

        write!(
            f,
            "\nCreate {} directories, move {} files",
            self.directories_to_create.len(),
            self.files_to_move.len()
        )
    }
}
