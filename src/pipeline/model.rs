//! Lazily initialized model handles.
//!
//! The orchestrator receives loaders at construction and wraps each in a
//! fresh [`LazyModel`] per run. The model is loaded on first use, at most
//! once; a failed load is remembered so later callers see the same error
//! without retrying. Dropping the handle at the end of the run releases the
//! model on every exit path.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Produces a model handle on demand
#[async_trait::async_trait]
pub trait ModelLoader<M: ?Sized + Send + Sync>: Send + Sync {
    async fn load(&self) -> Result<Arc<M>>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Loader that hands out an already constructed model
pub struct Preloaded<M: ?Sized> {
    model: Arc<M>,
    name: String,
}

impl<M: ?Sized> Preloaded<M> {
    pub fn new(model: Arc<M>, name: impl Into<String>) -> Self {
        Self {
            model,
            name: name.into(),
        }
    }
}

#[async_trait::async_trait]
impl<M: ?Sized + Send + Sync> ModelLoader<M> for Preloaded<M> {
    async fn load(&self) -> Result<Arc<M>> {
        Ok(Arc::clone(&self.model))
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Loader that always fails, for a model that is switched off
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl<M: ?Sized + Send + Sync> ModelLoader<M> for Unavailable {
    async fn load(&self) -> Result<Arc<M>> {
        anyhow::bail!("{}", self.reason)
    }

    fn describe(&self) -> String {
        "unavailable".to_string()
    }
}

/// Init-once model handle owned by a single run
pub struct LazyModel<M: ?Sized + Send + Sync> {
    loader: Arc<dyn ModelLoader<M>>,
    cell: OnceCell<Result<Arc<M>, String>>,
}

impl<M: ?Sized + Send + Sync> LazyModel<M> {
    pub fn new(loader: Arc<dyn ModelLoader<M>>) -> Self {
        Self {
            loader,
            cell: OnceCell::new(),
        }
    }

    /// Load on first call; every later call returns the same outcome
    pub async fn get(&self) -> Result<Arc<M>, String> {
        self.cell
            .get_or_init(|| async {
                let name = self.loader.describe();
                match self.loader.load().await {
                    Ok(model) => {
                        info!("Loaded model: {}", name);
                        Ok(model)
                    }
                    Err(e) => {
                        warn!("Failed to load model {}: {:#}", name, e);
                        Err(format!("{:#}", e))
                    }
                }
            })
            .await
            .clone()
    }

    /// Whether a load has been attempted and succeeded
    pub fn is_loaded(&self) -> bool {
        matches!(self.cell.get(), Some(Ok(_)))
    }

    /// Whether any load has been attempted
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}
