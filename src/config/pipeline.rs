//! Run configuration loaded from YAML or JSON.

use serde::Deserialize;

use super::spec::SpecSyntax;

/// Configuration for one pipeline run.
///
/// ```yaml
/// pipeline: "literal hello | console"
/// stage_separator: "!"
/// log_filter: "stagepipe=debug"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipeConfig {
    /// The pipeline specification text
    pub pipeline: String,
    /// Stage separator, `|` when absent
    #[serde(default)]
    pub stage_separator: Option<char>,
    /// Pipeline segment separator, `?` when absent
    #[serde(default)]
    pub end_char: Option<char>,
    /// `tracing` filter directive used by the command line tool
    #[serde(default)]
    pub log_filter: Option<String>,
}

impl PipeConfig {
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            ..Self::default()
        }
    }

    pub fn with_stage_separator(mut self, c: char) -> Self {
        self.stage_separator = Some(c);
        self
    }

    pub fn with_end_char(mut self, c: char) -> Self {
        self.end_char = Some(c);
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// The syntax characters, with defaults filled in.
    pub fn syntax(&self) -> SpecSyntax {
        let mut syntax = SpecSyntax::default();
        if let Some(c) = self.stage_separator {
            syntax = syntax.with_stage_separator(c);
        }
        if let Some(c) = self.end_char {
            syntax = syntax.with_end_char(c);
        }
        syntax
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    #[cfg(feature = "json")]
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
