//! Multi-output parallel rendering.
//!
//! Each output's pipeline runs independently on a bounded rayon thread
//! pool. Results come back in input order regardless of completion order,
//! and one output failing never aborts its siblings. The TTS cache is the
//! only shared mutable resource and is safe across concurrent compiles.

use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::{TetoError, TetoResult};
use crate::fx::EffectRegistry;
use crate::generator::VideoGenerator;
use crate::media::MediaBackend;
use crate::timeline::Project;

/// Per-output progress callback: `(index, path)` of a finished output.
pub type OutputProgress = Arc<dyn Fn(usize, &std::path::Path) + Send + Sync>;

pub struct ParallelDriver {
    backend: Arc<dyn MediaBackend>,
    effects: EffectRegistry,
    /// Worker cap; defaults to the logical CPU count.
    pub max_workers: Option<usize>,
    pub verbose: bool,
    progress: Option<OutputProgress>,
}

impl ParallelDriver {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            backend,
            effects: EffectRegistry::builtin(),
            max_workers: None,
            verbose: false,
            progress: None,
        }
    }

    pub fn with_effects(mut self, effects: EffectRegistry) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    pub fn with_progress(mut self, progress: OutputProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    fn build_thread_pool(&self) -> TetoResult<rayon::ThreadPool> {
        let workers = self.max_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| TetoError::internal(format!("failed to build thread pool: {e}")))
    }

    /// Render every project. The i-th result corresponds to the i-th input
    /// project; overall success requires every entry to be `Ok`.
    pub fn render_all(&self, projects: Vec<Project>) -> TetoResult<Vec<TetoResult<PathBuf>>> {
        let pool = self.build_thread_pool()?;
        let generator = VideoGenerator::with_effects(self.backend.clone(), self.effects.clone());
        let verbose = self.verbose;
        let progress = self.progress.clone();

        let results: Vec<TetoResult<PathBuf>> = pool.install(|| {
            projects
                .into_par_iter()
                .enumerate()
                .map(|(i, project)| {
                    let result = generator.generate(project, None, verbose);
                    match &result {
                        Ok(path) => {
                            tracing::info!(output = %path.display(), index = i, "output complete");
                            if let Some(progress) = &progress {
                                progress(i, path);
                            }
                        }
                        Err(e) => {
                            tracing::warn!(index = i, error = %e, "output failed");
                        }
                    }
                    result
                })
                .collect()
        });
        Ok(results)
    }
}
