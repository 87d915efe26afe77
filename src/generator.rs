//! Single-project render driver.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::error::TetoResult;
use crate::fx::EffectRegistry;
use crate::media::MediaBackend;
use crate::pipeline::{Pipeline, ProgressSink, RenderContext};
use crate::steps::default_pipeline;
use crate::timeline::Project;

/// Owns a pipeline and renders one project per call. The default chain can
/// be replaced wholesale with [`VideoGenerator::with_pipeline`].
pub struct VideoGenerator {
    pipeline: Pipeline,
}

impl VideoGenerator {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self::with_effects(backend, EffectRegistry::builtin())
    }

    pub fn with_effects(backend: Arc<dyn MediaBackend>, effects: EffectRegistry) -> Self {
        Self {
            pipeline: default_pipeline(backend, effects),
        }
    }

    pub fn with_pipeline(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Render a project to its configured output path.
    pub fn generate(
        &self,
        project: Project,
        progress: Option<ProgressSink>,
        verbose: bool,
    ) -> TetoResult<PathBuf> {
        let path = project.output.path.clone();
        let mut ctx = RenderContext::new(project).with_verbose(verbose);
        ctx.progress = progress;
        self.pipeline.run(&mut ctx)?;
        Ok(path)
    }

    /// Render with a cancellation flag checked between steps.
    pub fn generate_with_cancel(
        &self,
        project: Project,
        cancel: &AtomicBool,
        verbose: bool,
    ) -> TetoResult<PathBuf> {
        let path = project.output.path.clone();
        let mut ctx = RenderContext::new(project).with_verbose(verbose);
        self.pipeline.run_with_cancel(&mut ctx, cancel)?;
        Ok(path)
    }
}
