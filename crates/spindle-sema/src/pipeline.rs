// pipeline.rs
//! Per-file analysis on a bounded worker pool.
//!
//! Every file gets its own [`Analyzer`] and scope arena. Files share only the
//! [`CompilationContext`]: options, the abort flag and the manifestation
//! registry. The abort flag is checked before each stage, so a cancelled file
//! stops at the next stage boundary.

use rayon::prelude::*;
use spindle_frontend::Program;

use crate::analyzer::{AnalysisOutput, Analyzer, TypeError, TypeWarning};
use crate::context::CompilationContext;

/// How analysis of one file ended.
#[derive(Debug)]
pub enum FileOutcome {
    Completed(AnalysisOutput),
    /// At least one error. A hard error, if any, is the last entry.
    Failed {
        errors: Vec<TypeError>,
        warnings: Vec<TypeWarning>,
    },
    /// The abort flag was raised before the file finished.
    Cancelled,
}

#[derive(Debug)]
pub struct FileReport {
    pub file: String,
    pub outcome: FileOutcome,
}

impl FileReport {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, FileOutcome::Completed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, FileOutcome::Cancelled)
    }

    pub fn errors(&self) -> &[TypeError] {
        match &self.outcome {
            FileOutcome::Failed { errors, .. } => errors,
            FileOutcome::Completed(_) | FileOutcome::Cancelled => &[],
        }
    }

    pub fn warnings(&self) -> &[TypeWarning] {
        match &self.outcome {
            FileOutcome::Completed(output) => &output.warnings,
            FileOutcome::Failed { warnings, .. } => warnings,
            FileOutcome::Cancelled => &[],
        }
    }

    /// Diagnostics in their structured text form, errors first.
    pub fn render(&self) -> Vec<String> {
        self.errors()
            .iter()
            .map(|e| e.render(&self.file))
            .chain(self.warnings().iter().map(|w| w.render(&self.file)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Collect,
    Check,
    Finalize,
}

impl Stage {
    const ALL: [Stage; 3] = [Stage::Collect, Stage::Check, Stage::Finalize];

    fn run(self, analyzer: &mut Analyzer<'_>) -> Result<(), TypeError> {
        match self {
            Stage::Collect => analyzer.collect(),
            Stage::Check => analyzer.check(),
            Stage::Finalize => analyzer.finalize(),
        }
    }
}

pub struct Pipeline {
    ctx: CompilationContext,
}

impl Pipeline {
    pub fn new(ctx: CompilationContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &CompilationContext {
        &self.ctx
    }

    /// Analyze `programs` concurrently, at most `worker_threads` at a time.
    /// Reports come back in input order.
    pub fn check_files(&self, programs: &[Program]) -> Vec<FileReport> {
        let threads = self.ctx.options.worker_threads.max(1).min(programs.len().max(1));
        tracing::debug!(files = programs.len(), threads, "sizing worker pool");
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("spindle-sema-{i}"))
            .build();
        match pool {
            Ok(pool) => pool.install(|| programs.par_iter().map(|p| self.check_file(p)).collect()),
            Err(err) => {
                tracing::warn!(error = %err, "worker pool unavailable, analyzing sequentially");
                programs.iter().map(|p| self.check_file(p)).collect()
            }
        }
    }

    /// Analyze a single file on the calling thread.
    pub fn check_file(&self, program: &Program) -> FileReport {
        let file = program.file.clone();
        let mut analyzer = Analyzer::new(program, &self.ctx);
        for stage in Stage::ALL {
            if self.ctx.is_aborted() {
                tracing::debug!(file = %file, ?stage, "abort flag observed, skipping remaining stages");
                return FileReport {
                    file,
                    outcome: FileOutcome::Cancelled,
                };
            }
            if let Err(hard) = stage.run(&mut analyzer) {
                tracing::debug!(file = %file, ?stage, error = %hard.error, "hard error");
                if self.ctx.options.fail_fast {
                    self.ctx.abort();
                }
                let mut errors = analyzer.take_errors();
                errors.push(hard);
                return FileReport {
                    file,
                    outcome: FileOutcome::Failed {
                        errors,
                        warnings: analyzer.warnings().to_vec(),
                    },
                };
            }
        }

        let errors = analyzer.take_errors();
        let outcome = if errors.is_empty() {
            FileOutcome::Completed(analyzer.into_output())
        } else {
            FileOutcome::Failed {
                errors,
                warnings: analyzer.warnings().to_vec(),
            }
        };
        FileReport { file, outcome }
    }
}
