use crate::organizer::plan::OrganizationPlan;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Sink that carries out an organization plan
#[async_trait::async_trait]
pub trait ApplyPlan: Send + Sync {
    async fn apply(&self, plan: &OrganizationPlan) -> Result<ApplyReport>;
}

/// What happened to each planned file
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    pub dry_run: bool,
    pub moved: Vec<MovedFile>,
    /// Sources that no longer exist
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<FailedMove>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedMove {
    pub source: PathBuf,
    pub reason: String,
}

/// Handles safe file reorganization with dry-run support
///
/// Never overwrites: a name already present in the destination folder gets a
/// `_<timestamp>` suffix, then `_<n>`. A failed move leaves the source alone.
pub struct FileMover {
    base_path: PathBuf,
    dry_run: bool,
}

impl FileMover {
    /// Create a new FileMover for the given base directory
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let base_path = base_path
            .as_ref()
            .canonicalize()
            .context("Failed to canonicalize base path")?;

        if !base_path.is_dir() {
            anyhow::bail!("Base path is not a directory: {}", base_path.display());
        }

        Ok(Self {
            base_path,
            dry_run: false,
        })
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Get the base path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Reject plans that would touch anything outside the base directory
    pub fn validate(&self, plan: &OrganizationPlan) -> Result<()> {
        for entry in plan.entries() {
            let source = self.resolve_source(&entry.source);
            if source.parent() != Some(self.base_path.as_path()) {
                anyhow::bail!("Source file outside base path: {}", entry.source.display());
            }
            let destination = self.base_path.join(&entry.folder);
            if destination.parent() != Some(self.base_path.as_path()) {
                anyhow::bail!("Destination outside base path: {}", destination.display());
            }
        }
        Ok(())
    }

    /// Absolute source path with a canonical parent; the file itself is not
    /// resolved, so a symlink is moved rather than its target
    fn resolve_source(&self, source: &Path) -> PathBuf {
        let absolute = if source.is_absolute() {
            source.to_path_buf()
        } else {
            self.base_path.join(source)
        };
        if let (Some(parent), Some(name)) = (absolute.parent(), absolute.file_name()) {
            if let Ok(parent) = parent.canonicalize() {
                return parent.join(name);
            }
        }
        absolute
    }

    async fn move_one(&self, source: &Path, folder: &str) -> Result<PathBuf> {
        let file_name = source
            .file_name()
            .with_context(|| format!("No file name in {}", source.display()))?;
        let dir = self.base_path.join(folder);

        if !self.dry_run {
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }

        let destination = unique_destination(&dir, Path::new(file_name));
        if !self.dry_run {
            tokio::fs::rename(source, &destination).await.with_context(|| {
                format!(
                    "Failed to move {} to {}",
                    source.display(),
                    destination.display()
                )
            })?;
        }
        Ok(destination)
    }
}

#[async_trait::async_trait]
impl ApplyPlan for FileMover {
    async fn apply(&self, plan: &OrganizationPlan) -> Result<ApplyReport> {
        self.validate(plan)?;

        let mut report = ApplyReport {
            dry_run: self.dry_run,
            ..ApplyReport::default()
        };

        for entry in plan.entries() {
            let source = self.resolve_source(&entry.source);
            if !source.is_file() {
                debug!("Skipping {}: no longer exists", source.display());
                report.skipped.push(entry.source.clone());
                continue;
            }

            match self.move_one(&source, &entry.folder).await {
                Ok(destination) => {
                    debug!("{} -> {}", source.display(), destination.display());
                    report.moved.push(MovedFile {
                        source: entry.source.clone(),
                        destination,
                    });
                }
                Err(e) => {
                    warn!("{:#}", e);
                    report.failed.push(FailedMove {
                        source: entry.source.clone(),
                        reason: format!("{:#}", e),
                    });
                }
            }
        }

        info!(
            "{} {} files, {} skipped, {} failed",
            if self.dry_run { "Would move" } else { "Moved" },
            report.moved.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

/// First free name for `file_name` inside `dir`
fn unique_destination(dir: &Path, file_name: &Path) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file_name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let timestamp = chrono::Utc::now().timestamp();

    let candidate = dir.join(format!("{}_{}{}", stem, timestamp, ext));
    if !candidate.exists() {
        return candidate;
    }

    let mut n = 1;
    loop {
        let candidate = dir.join(format!("{}_{}_{}{}", stem, timestamp, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SortMode;
    use crate::organizer::plan::{PlanBuilder, PlanOrigin, RunStats};
    use std::fs;
    use tempfile::TempDir;

    fn plan_for(base: &Path, moves: &[(&str, &str)]) -> OrganizationPlan {
        let mut builder = PlanBuilder::new(base, SortMode::AiSemantic);
        for (file, folder) in moves {
            builder
                .add(base.join(file), folder.to_string(), PlanOrigin::Fallback)
                .unwrap();
        }
        builder.build(RunStats::default())
    }

    #[tokio::test]
    async fn test_mover_creation() {
        let temp_dir = TempDir::new().unwrap();
        let mover = FileMover::new(temp_dir.path()).unwrap();
        assert_eq!(mover.base_path(), temp_dir.path().canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_mover_dry_run_touches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("file1.txt"), "content").unwrap();
        let mover = FileMover::new(temp_dir.path()).unwrap().with_dry_run(true);

        let plan = plan_for(temp_dir.path(), &[("file1.txt", "folder1")]);
        let report = mover.apply(&plan).await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.moved.len(), 1);
        assert!(!temp_dir.path().join("folder1").exists());
        assert!(temp_dir.path().join("file1.txt").exists());
    }

    #[tokio::test]
    async fn test_mover_moves_files() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("test.txt");
        fs::write(&test_file, "content").unwrap();
        let mover = FileMover::new(temp_dir.path()).unwrap();

        let plan = plan_for(temp_dir.path(), &[("test.txt", "moved")]);
        let report = mover.apply(&plan).await.unwrap();

        assert_eq!(report.moved.len(), 1);
        assert!(!test_file.exists());
        assert!(temp_dir.path().join("moved/test.txt").exists());
    }

    #[tokio::test]
    async fn test_mover_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("Notes")).unwrap();
        fs::write(temp_dir.path().join("Notes/a.txt"), "old").unwrap();
        fs::write(temp_dir.path().join("a.txt"), "new").unwrap();
        let mover = FileMover::new(temp_dir.path()).unwrap();

        let plan = plan_for(temp_dir.path(), &[("a.txt", "Notes")]);
        let report = mover.apply(&plan).await.unwrap();

        let destination = &report.moved[0].destination;
        assert_ne!(destination, &temp_dir.path().canonicalize().unwrap().join("Notes/a.txt"));
        assert_eq!(fs::read_to_string(temp_dir.path().join("Notes/a.txt")).unwrap(), "old");
        assert_eq!(fs::read_to_string(destination).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_mover_skips_vanished_files() {
        let temp_dir = TempDir::new().unwrap();
        let mover = FileMover::new(temp_dir.path()).unwrap();
        let plan = plan_for(temp_dir.path(), &[("gone.txt", "Somewhere")]);

        let report = mover.apply(&plan).await.unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert!(report.moved.is_empty());
    }

    #[tokio::test]
    async fn test_mover_rejects_outside_base() {
        let temp_dir = TempDir::new().unwrap();
        let other_dir = TempDir::new().unwrap();
        fs::write(other_dir.path().join("file.txt"), "x").unwrap();
        let mover = FileMover::new(temp_dir.path()).unwrap();

        let plan = plan_for(other_dir.path(), &[("file.txt", "Folder")]);
        assert!(mover.apply(&plan).await.is_err());
        assert!(other_dir.path().join("file.txt").exists());
    }
}
