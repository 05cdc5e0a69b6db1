//! Sequences scanning, extraction, embedding, clustering and labeling for
//! one directory and produces an [`OrganizationPlan`](crate::organizer::OrganizationPlan).
//!
//! Per-file and per-cluster failures are absorbed: the file goes to its
//! fallback bucket (or the cluster gets a fallback name) and a warning is
//! emitted. Only scan failures, model initialization failures and internal
//! invariant violations end the run in `Failed`.

use crate::config::Config;
use crate::embeddings::{ConfiguredEmbeddingLoader, Embedder, EmbeddingProvider};
use crate::error::{ClusteringError, PipelineError, ScanError};
use crate::extractor::ExtractorRegistry;
use crate::llm::{ConfiguredGenerationLoader, LlmProvider};
use crate::models::{ExtractionStatus, FileMeta, FileRecord, SortMode};
use crate::organizer::bucket::{fallback_bucket, metadata_bucket};
use crate::organizer::{Cluster, ClusterEngine, Labeler, NameRegistry, PlanBuilder, PlanOrigin, RunStats};
use crate::pipeline::model::{LazyModel, ModelLoader};
use crate::pipeline::progress::{EventEmitter, RunOutcome};
use crate::pipeline::state::PipelineState;
use crate::scanner::{scan_directory, ScanResult};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type EmbeddingLoader = Arc<dyn ModelLoader<dyn EmbeddingProvider>>;
type GenerationLoader = Arc<dyn ModelLoader<dyn LlmProvider>>;

/// Why a run stopped early
enum Halt {
    Cancelled,
    Failed(PipelineError),
}

impl From<PipelineError> for Halt {
    fn from(err: PipelineError) -> Self {
        Halt::Failed(err)
    }
}

impl From<ScanError> for Halt {
    fn from(err: ScanError) -> Self {
        Halt::Failed(err.into())
    }
}

impl From<ClusteringError> for Halt {
    fn from(err: ClusteringError) -> Self {
        Halt::Failed(err.into())
    }
}

/// Model handles and counters owned by a single run
///
/// Dropped when the run returns, which releases both models whatever the
/// outcome.
struct RunContext<'a> {
    events: &'a mut EventEmitter,
    cancel: &'a CancellationToken,
    embedding: LazyModel<dyn EmbeddingProvider>,
    generation: LazyModel<dyn LlmProvider>,
    stats: RunStats,
}

impl RunContext<'_> {
    fn check_cancelled(&self) -> Result<(), Halt> {
        if self.cancel.is_cancelled() {
            Err(Halt::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Runs the organizing pipeline; one instance can serve many runs
pub struct Orchestrator {
    config: Config,
    registry: ExtractorRegistry,
    embedding_loader: EmbeddingLoader,
    generation_loader: GenerationLoader,
}

impl Orchestrator {
    pub fn new(config: Config, embedding_loader: EmbeddingLoader, generation_loader: GenerationLoader) -> Self {
        let registry = ExtractorRegistry::new(config.extraction.clone());
        Self {
            config,
            registry,
            embedding_loader,
            generation_loader,
        }
    }

    /// Orchestrator with the models named in the configuration
    pub fn from_config(config: Config) -> Self {
        let embedding_loader: EmbeddingLoader =
            Arc::new(ConfiguredEmbeddingLoader::new(config.embedding.clone()));
        let generation_loader: GenerationLoader =
            Arc::new(ConfiguredGenerationLoader::new(config.llm.clone()));
        Self::new(config, embedding_loader, generation_loader)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Organize `dir` and report through `events`
    ///
    /// Ends in `PlanReady`, `Cancelled` or `Failed`; the matching state
    /// transition has been emitted by the time this returns. The terminal
    /// `Finished` event is left to the caller.
    pub async fn run(
        &self,
        dir: &Path,
        mode: SortMode,
        events: &mut EventEmitter,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let started = Instant::now();
        let mut ctx = RunContext {
            events,
            cancel,
            embedding: LazyModel::new(Arc::clone(&self.embedding_loader)),
            generation: LazyModel::new(Arc::clone(&self.generation_loader)),
            stats: RunStats::default(),
        };

        let result = match self.config.validate() {
            Err(message) => Err(Halt::Failed(PipelineError::InvalidConfig(message))),
            Ok(()) => match mode {
                SortMode::AiSemantic => self.run_semantic(dir, &mut ctx).await,
                SortMode::FileExtension | SortMode::DateModified => {
                    self.run_metadata(dir, mode, &mut ctx).await
                }
            },
        };

        match result {
            Ok(builder) => {
                ctx.stats.elapsed_ms = started.elapsed().as_millis() as u64;
                let plan = builder.build(ctx.stats.clone());
                if let Err(e) = ctx.events.transition(PipelineState::PlanReady).await {
                    return fail(ctx.events, e).await;
                }
                info!(
                    "Plan ready: {} files, {} clusters, {} in fallback",
                    plan.len(),
                    plan.stats().clusters,
                    plan.stats().fallback
                );
                RunOutcome::PlanReady(plan)
            }
            Err(Halt::Cancelled) => {
                info!("Run cancelled");
                let _ = ctx.events.transition(PipelineState::Cancelled).await;
                RunOutcome::Cancelled
            }
            Err(Halt::Failed(e)) => fail(ctx.events, e).await,
        }
    }

    async fn scan(&self, dir: &Path, ctx: &mut RunContext<'_>) -> Result<ScanResult, Halt> {
        ctx.events.transition(PipelineState::Scanning).await?;
        let owned = dir.to_path_buf();
        let scan = tokio::task::spawn_blocking(move || scan_directory(&owned))
            .await
            .map_err(|e| PipelineError::Internal(format!("scan task aborted: {}", e)))??;

        let count = scan.files.len();
        ctx.stats.files = count;
        ctx.events.progress(count, count, Some(format!("{} files found", count))).await;
        ctx.check_cancelled()?;
        Ok(scan)
    }

    /// File-extension and date-modified modes: metadata only
    async fn run_metadata(&self, dir: &Path, mode: SortMode, ctx: &mut RunContext<'_>) -> Result<PlanBuilder, Halt> {
        let scan = self.scan(dir, ctx).await?;
        let max_len = self.config.labeling.max_label_len;

        // Folder names come from metadata; the semantic stages are skipped
        ctx.events.transition(PipelineState::Labeling).await?;
        let total = scan.files.len();
        let mut builder = PlanBuilder::new(&scan.root, mode);
        for (done, meta) in scan.files.into_iter().enumerate() {
            let folder = metadata_bucket(&meta, mode, max_len).ok_or_else(|| {
                PipelineError::Internal(format!("no metadata bucket for mode {}", mode))
            })?;
            let name = crate::utils::display_name(&meta.path);
            builder.add(meta.path, folder, PlanOrigin::Metadata)?;
            ctx.events.progress(done + 1, total, Some(name)).await;
            ctx.check_cancelled()?;
        }
        Ok(builder)
    }

    async fn run_semantic(&self, dir: &Path, ctx: &mut RunContext<'_>) -> Result<PlanBuilder, Halt> {
        let scan = self.scan(dir, ctx).await?;

        let mut records = self.extract_all(scan.files, ctx).await?;
        ctx.check_cancelled()?;

        let (embeddable, vectors) = self.embed_all(&mut records, ctx).await?;
        ctx.check_cancelled()?;

        ctx.events.transition(PipelineState::Clustering).await?;
        let mut clusters = ClusterEngine::new(&self.config.clustering).cluster(&vectors)?;
        ctx.stats.clusters = clusters.len();
        ctx.stats.clustered = embeddable.len();
        ctx.events
            .progress(1, 1, Some(format!("{} clusters", clusters.len())))
            .await;
        for cluster in clusters.iter().filter(|c| c.oversized) {
            let message = format!(
                "cluster {} has {} files (cap {}); naming it from a sample",
                cluster.id,
                cluster.len(),
                self.config.clustering.max_cluster_size
            );
            warn!("{}", message);
            ctx.events.warning(None, message).await;
        }
        ctx.check_cancelled()?;

        // Fallback folders are decided first so cluster names can avoid them
        let max_len = self.config.labeling.max_label_len;
        let policy = self.config.pipeline.fallback;
        let mut in_cluster = vec![false; records.len()];
        for &index in &embeddable {
            in_cluster[index] = true;
        }
        let fallback: Vec<(usize, String)> = records
            .iter()
            .enumerate()
            .filter(|(i, _)| !in_cluster[*i])
            .map(|(i, r)| (i, fallback_bucket(&r.meta, r.kind, policy, max_len)))
            .collect();

        let mut names = NameRegistry::new(max_len);
        for existing in &scan.existing_dirs {
            names.reserve(existing);
        }
        for (_, folder) in &fallback {
            names.reserve(folder);
        }

        self.label_all(&mut clusters, &records, &embeddable, &vectors, &mut names, ctx)
            .await?;
        ctx.check_cancelled()?;

        let mut builder = PlanBuilder::new(&scan.root, SortMode::AiSemantic);
        for cluster in &clusters {
            let label = cluster.label.clone().ok_or_else(|| {
                PipelineError::Internal(format!("cluster {} has no label", cluster.id))
            })?;
            for &member in &cluster.members {
                let record = &records[embeddable[member]];
                builder.add(
                    record.path().to_path_buf(),
                    label.clone(),
                    PlanOrigin::Cluster { id: cluster.id },
                )?;
            }
        }
        ctx.stats.fallback = fallback.len();
        for (index, folder) in fallback {
            builder.add(records[index].path().to_path_buf(), folder, PlanOrigin::Fallback)?;
        }

        if builder.len() != records.len() {
            return Err(PipelineError::Internal(format!(
                "plan covers {} of {} files",
                builder.len(),
                records.len()
            ))
            .into());
        }
        Ok(builder)
    }

    /// Extract text from every file with a bounded worker pool
    async fn extract_all(&self, files: Vec<FileMeta>, ctx: &mut RunContext<'_>) -> Result<Vec<FileRecord>, Halt> {
        ctx.events.transition(PipelineState::Extracting).await?;
        let total = files.len();
        let workers = self.config.pipeline.workers;
        let registry = &self.registry;
        let cancel = ctx.cancel;

        let mut units = stream::iter(files.into_iter().enumerate())
            .map(|(index, meta)| async move {
                // Units not started before cancellation are skipped
                if cancel.is_cancelled() {
                    return None;
                }
                let kind = registry.detect(&meta);
                let extraction = registry.extract(&meta, kind).await;
                let mut record = FileRecord::new(meta, kind);
                record.set_extraction(
                    extraction.text,
                    extraction.status,
                    extraction.error.map(|e| e.to_string()),
                );
                Some((index, record))
            })
            .buffer_unordered(workers);

        let mut slots: Vec<Option<FileRecord>> = (0..total).map(|_| None).collect();
        let mut completed = 0;
        while let Some(unit) = units.next().await {
            let Some((index, record)) = unit else {
                continue;
            };
            completed += 1;
            if record.status() == ExtractionStatus::Failed {
                ctx.stats.failed += 1;
                let message = format!(
                    "extraction failed: {}",
                    record.error().unwrap_or("unknown error")
                );
                warn!("{}: {}", record.path().display(), message);
                ctx.events.warning(Some(record.path()), message).await;
            }
            let name = crate::utils::display_name(record.path());
            slots[index] = Some(record);
            ctx.events.progress(completed, total, Some(name)).await;
        }
        drop(units);
        ctx.check_cancelled()?;

        slots
            .into_iter()
            .map(|slot| {
                slot.ok_or_else(|| Halt::Failed(PipelineError::Internal("missing extraction result".into())))
            })
            .collect()
    }

    /// Embed every record with enough text; returns the embedded record
    /// indices and their vectors, in the same order
    async fn embed_all(
        &self,
        records: &mut [FileRecord],
        ctx: &mut RunContext<'_>,
    ) -> Result<(Vec<usize>, Vec<Vec<f32>>), Halt> {
        ctx.events.transition(PipelineState::Embedding).await?;

        let min_chars = self.config.extraction.min_chars;
        let candidates: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.status() == ExtractionStatus::Success && r.text().trim().chars().count() >= min_chars
            })
            .map(|(i, _)| i)
            .collect();
        let total = candidates.len();
        debug!("{} of {} files have text to embed", total, records.len());

        if candidates.is_empty() {
            ctx.events.progress(0, 0, Some("nothing to embed".to_string())).await;
            return Ok((Vec::new(), Vec::new()));
        }

        // First use of the embedding model
        let provider = ctx
            .embedding
            .get()
            .await
            .map_err(PipelineError::EmbeddingModelUnavailable)?;
        let embedder = Embedder::new(provider, self.config.embedding.max_input_chars);
        info!("Embedding {} files with {}", total, embedder.model_name());

        let cancel = ctx.cancel;
        let embedder = &embedder;
        // Batches own their text so the run future stays `Send`
        let batches: Vec<Vec<(usize, String)>> = candidates
            .chunks(self.config.embedding.batch_size)
            .map(|chunk| chunk.iter().map(|&i| (i, records[i].text().to_string())).collect())
            .collect();

        let mut units = stream::iter(batches)
            .map(|batch| async move {
                if cancel.is_cancelled() {
                    return None;
                }
                let inputs: Vec<&str> = batch.iter().map(|(_, t)| t.as_str()).collect();
                let results = embedder.embed_batch(&inputs).await;
                Some(
                    batch
                        .into_iter()
                        .map(|(i, _)| i)
                        .zip(results)
                        .collect::<Vec<_>>(),
                )
            })
            .buffer_unordered(self.config.pipeline.workers);

        let mut outcomes = Vec::with_capacity(total);
        let mut completed = 0;
        while let Some(unit) = units.next().await {
            let Some(batch) = unit else {
                continue;
            };
            completed += batch.len();
            outcomes.extend(batch);
            ctx.events.progress(completed, total, None).await;
        }
        drop(units);
        ctx.check_cancelled()?;

        outcomes.sort_by_key(|(i, _)| *i);
        let mut embedded = Vec::new();
        let mut vectors = Vec::new();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(Some(vector)) => {
                    embedded.push(index);
                    vectors.push(vector);
                }
                Ok(None) => {}
                Err(e) => {
                    let record = &mut records[index];
                    record.mark_failed(format!("embedding failed: {}", e));
                    ctx.stats.failed += 1;
                    warn!("{}: embedding failed: {}", record.path().display(), e);
                    ctx.events
                        .warning(Some(record.path()), format!("embedding failed: {}", e))
                        .await;
                }
            }
        }
        Ok((embedded, vectors))
    }

    /// Name every cluster, one at a time
    async fn label_all(
        &self,
        clusters: &mut [Cluster],
        records: &[FileRecord],
        embeddable: &[usize],
        vectors: &[Vec<f32>],
        names: &mut NameRegistry,
        ctx: &mut RunContext<'_>,
    ) -> Result<(), Halt> {
        ctx.events.transition(PipelineState::Labeling).await?;
        let total = clusters.len();
        if total == 0 {
            ctx.events.progress(0, 0, None).await;
            return Ok(());
        }

        // First use of the generation model
        let model = ctx.generation.get().await;
        if let Err(reason) = &model {
            if self.config.labeling.require_generation_model {
                return Err(PipelineError::GenerationModelUnavailable(reason.clone()).into());
            }
            let message = format!("generation model unavailable, using fallback names: {}", reason);
            warn!("{}", message);
            ctx.events.warning(None, message).await;
        }

        let labeler = Labeler::new(self.config.labeling.clone());
        let sample_size = self.config.labeling.sample_size;

        for (done, cluster) in clusters.iter_mut().enumerate() {
            ctx.check_cancelled()?;

            let sample: Vec<&FileRecord> = cluster
                .members_by_centrality(vectors)
                .into_iter()
                .take(sample_size)
                .map(|m| &records[embeddable[m]])
                .collect();
            let provider = model
                .as_ref()
                .map(|m| &**m)
                .map_err(|e| e.as_str());

            let label = labeler.label(provider, cluster.id, &sample).await;
            if label.generated {
                ctx.stats.generated_labels += 1;
            } else if model.is_ok() {
                if let Some(e) = &label.error {
                    ctx.events
                        .warning(None, format!("cluster {}: {}; using fallback name", cluster.id, e))
                        .await;
                }
            }

            let name = names.claim(&label.name);
            debug!("Cluster {} ({} files) -> {}", cluster.id, cluster.len(), name);
            cluster.label = Some(name.clone());
            ctx.events.progress(done + 1, total, Some(name)).await;
        }
        Ok(())
    }
}

async fn fail(events: &mut EventEmitter, err: PipelineError) -> RunOutcome {
    warn!("Run failed ({}): {}", err.reason(), err);
    let _ = events.transition(PipelineState::Failed).await;
    RunOutcome::failed(&err)
}
