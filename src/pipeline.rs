//! The render pipeline: an ordered chain of processing steps sharing one
//! mutable [`RenderContext`].
//!
//! Steps are replaceable and the default order is fixed: video layers →
//! audio layers → audio merge → stamps → subtitles → encode → cleanup.
//! Each step either produces a new clip state or forwards the context
//! unchanged.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::clip::{Clip, CompositeClip};
use crate::error::{TetoError, TetoResult};
use crate::timeline::Project;

/// Progress sink; messages are coarse, one per step or per output.
pub type ProgressSink = Box<dyn Fn(&str) + Send + Sync>;

/// Mutable state threaded through the chain by unique reference. Parallel
/// renders own disjoint contexts.
pub struct RenderContext {
    pub project: Project,
    pub video_clip: Option<CompositeClip>,
    pub audio_clips: Vec<Clip>,
    pub output_size: Option<(u32, u32)>,
    pub progress: Option<ProgressSink>,
    pub verbose: bool,
}

impl RenderContext {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            video_clip: None,
            audio_clips: Vec::new(),
            output_size: None,
            progress: None,
            verbose: false,
        }
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn report_progress(&self, message: &str) {
        if let Some(sink) = &self.progress {
            sink(message);
        }
    }
}

pub trait ProcessingStep: Send + Sync {
    /// Stable identifier used by `replace`/`insert_after`.
    fn name(&self) -> &'static str;

    fn process(&self, ctx: &mut RenderContext) -> TetoResult<()>;
}

/// Ordered step chain.
pub struct Pipeline {
    steps: Vec<Box<dyn ProcessingStep>>,
}

impl Pipeline {
    pub fn new(steps: Vec<Box<dyn ProcessingStep>>) -> Self {
        Self { steps }
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Swap out the step with the given name. Unknown names are an error,
    /// so a typo cannot silently leave the default in place.
    pub fn replace(mut self, name: &str, step: Box<dyn ProcessingStep>) -> TetoResult<Self> {
        let index = self
            .steps
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| TetoError::validation(format!("no pipeline step named '{name}'")))?;
        self.steps[index] = step;
        Ok(self)
    }

    pub fn insert_after(mut self, name: &str, step: Box<dyn ProcessingStep>) -> TetoResult<Self> {
        let index = self
            .steps
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| TetoError::validation(format!("no pipeline step named '{name}'")))?;
        self.steps.insert(index + 1, step);
        Ok(self)
    }

    pub fn run(&self, ctx: &mut RenderContext) -> TetoResult<()> {
        let no_cancel = AtomicBool::new(false);
        self.run_with_cancel(ctx, &no_cancel)
    }

    /// Run the chain, checking `cancel` between steps. Cancellation is not
    /// honored mid-step; after a cancelled run the cleanup step has been
    /// executed, so resources acquired by completed steps are released.
    pub fn run_with_cancel(&self, ctx: &mut RenderContext, cancel: &AtomicBool) -> TetoResult<()> {
        for (i, step) in self.steps.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                tracing::info!(step = step.name(), "render cancelled");
                self.run_cleanup(ctx);
                return Err(TetoError::Other(anyhow::anyhow!(
                    "render cancelled before step '{}'",
                    step.name()
                )));
            }
            tracing::debug!(step = step.name(), index = i, "pipeline step");
            step.process(ctx)?;
        }
        Ok(())
    }

    fn run_cleanup(&self, ctx: &mut RenderContext) {
        if let Some(cleanup) = self.steps.iter().find(|s| s.name() == "cleanup") {
            let _ = cleanup.process(ctx);
        }
    }
}
