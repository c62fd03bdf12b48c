//! Miette integration for pretty error reporting.

use miette::{Diagnostic, Severity};
use thiserror::Error;

use super::{AggregateError, Phase, PipeError, StageError};

/// A diagnostic wrapper for pipeline errors compatible with miette.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct StageDiagnostic {
    /// The error message
    pub message: String,

    #[source]
    /// The underlying error source
    pub source: Option<PipeError>,

    #[help]
    /// Help text for the user
    pub help: Option<String>,

    #[diagnostic(severity)]
    /// Severity level
    pub severity: Severity,
}

fn help_for(phase: Phase) -> &'static str {
    match phase {
        Phase::Build => "Check the pipeline specification: stage names, labels and separators",
        Phase::Commit => "A stage rejected its position or stream wiring before the pipeline started",
        Phase::Dispatch => "A stage failed while the pipeline was running",
    }
}

impl From<StageError> for StageDiagnostic {
    fn from(e: StageError) -> Self {
        let message = match e.code() {
            Some(code) => format!("[{}] {} (rc={})", e.phase, e.stage, code),
            None => format!("[{}] {}", e.phase, e.stage),
        };
        StageDiagnostic {
            message,
            help: Some(help_for(e.phase).into()),
            source: Some(e.error),
            severity: Severity::Error,
        }
    }
}

impl From<AggregateError> for StageDiagnostic {
    fn from(agg: AggregateError) -> Self {
        match agg.into_representative() {
            Some(e) => StageDiagnostic::from(e),
            None => StageDiagnostic {
                message: "Unknown pipeline error".into(),
                source: None,
                help: None,
                severity: Severity::Error,
            },
        }
    }
}

impl From<AggregateError> for miette::Report {
    fn from(agg: AggregateError) -> Self {
        miette::Report::new(StageDiagnostic::from(agg))
    }
}
