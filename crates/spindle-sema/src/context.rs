// context.rs
//! Options and the shared resource manager handed to every analyzer.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::registry::ManifestationRegistry;

/// Knobs for a compilation run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Upper bound on files analyzed concurrently.
    pub worker_threads: usize,
    /// A hard error in any file raises the abort flag for all others.
    pub fail_fast: bool,
    /// Emit unused-variable warnings.
    pub warn_unused: bool,
    /// Stop recording soft errors for a file once this many were recorded.
    pub max_soft_errors: Option<usize>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            worker_threads: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            fail_fast: false,
            warn_unused: true,
            max_soft_errors: None,
        }
    }
}

impl PipelineOptions {
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_warn_unused(mut self, warn: bool) -> Self {
        self.warn_unused = warn;
        self
    }

    pub fn with_max_soft_errors(mut self, max: usize) -> Self {
        self.max_soft_errors = Some(max);
        self
    }
}

/// Resources shared by all files of one compilation.
#[derive(Debug, Clone, Default)]
pub struct CompilationContext {
    pub options: PipelineOptions,
    abort: Arc<AtomicBool>,
    manifestations: ManifestationRegistry,
}

impl CompilationContext {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            abort: Arc::new(AtomicBool::new(false)),
            manifestations: ManifestationRegistry::new(),
        }
    }

    /// Request cooperative cancellation. Files notice it between stages.
    pub fn abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    /// Handle to the flag, for drivers that cancel from elsewhere.
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    pub fn manifestations(&self) -> &ManifestationRegistry {
        &self.manifestations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_flag_is_shared_between_clones() {
        let ctx = CompilationContext::new(PipelineOptions::default());
        let clone = ctx.clone();
        assert!(!clone.is_aborted());
        ctx.abort();
        assert!(clone.is_aborted());
    }

    #[test]
    fn test_worker_threads_never_zero() {
        let options = PipelineOptions::default().with_worker_threads(0);
        assert_eq!(options.worker_threads, 1);
    }
}
