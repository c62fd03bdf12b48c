//! Registry mapping stage names to factories.
//!
//! A registry is an ordinary value: build one (usually starting from
//! `stages::builtin_registry()`), register your own stages on it, and hand it to
//! the builder. Nothing is global.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{BuildError, PipeError};
use crate::stage::Stage;

/// Arguments of one stage as written in the specification.
///
/// The engine never interprets `operands`; each factory parses its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageArgs {
    /// Stage name as written
    pub name: String,
    /// Everything after the stage name, trimmed
    pub operands: String,
}

impl StageArgs {
    pub fn new(name: impl Into<String>, operands: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operands: operands.into(),
        }
    }

    pub fn has_operands(&self) -> bool {
        !self.operands.is_empty()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.operands.split_whitespace()
    }

    /// Error for operands a factory cannot accept.
    pub fn invalid(&self, message: impl Into<String>) -> PipeError {
        PipeError::Build(BuildError::InvalidArguments {
            stage: self.name.clone(),
            message: message.into(),
        })
    }
}

/// Creates a stage instance from its arguments.
pub type StageFactory =
    Arc<dyn Fn(&StageArgs) -> Result<Box<dyn Stage>, PipeError> + Send + Sync>;

/// Registry of named stage factories. Names are case-insensitive.
#[derive(Clone, Default)]
pub struct StageRegistry {
    factories: BTreeMap<String, StageFactory>,
}

impl fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageRegistry")
            .field("stages", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StageRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register a factory under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&StageArgs) -> Result<Box<dyn Stage>, PipeError> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.to_ascii_lowercase(), Arc::new(factory));
    }

    /// Register a factory (builder pattern).
    pub fn with_stage<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&StageArgs) -> Result<Box<dyn Stage>, PipeError> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn has_stage(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiate the stage named in `args`.
    pub fn create(&self, args: &StageArgs) -> Result<Box<dyn Stage>, BuildError> {
        let factory = self
            .factories
            .get(&args.name.to_ascii_lowercase())
            .ok_or_else(|| BuildError::UnknownStage(args.name.clone()))?;

        factory(args).map_err(|e| match e {
            PipeError::Build(build) => build,
            other => BuildError::InvalidArguments {
                stage: args.name.clone(),
                message: other.to_string(),
            },
        })
    }
}
