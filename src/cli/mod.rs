//! Command line helpers for stagepipe.
//!
//! `SpecArg` carries the pipeline specification as typed by the user. A value
//! starting with `@` names a file holding the specification; anything else is
//! the specification itself.
//!
//! ```rust,ignore
//! use sarge::prelude::*;
//! use stagepipe::cli::SpecArg;
//!
//! let mut reader = ArgumentReader::new();
//! let spec_ref = reader.add::<SpecArg>(tag::both('s', "spec"));
//! let args = reader.parse()?;
//! let text = spec_ref.get(&args).and_then(Result::ok).map(|s| s.resolve()).transpose()?;
//! ```

use std::fs;
use std::io;
use std::path::Path;

use crate::config::PipeConfig;

mod sarge;

/// Log filter used when neither `RUST_LOG`, the config file nor `--log` set one.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// A pipeline specification argument: inline text or `@path`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecArg(pub String);

impl SpecArg {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn raw(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The file named by an `@path` argument.
    pub fn file(&self) -> Option<&Path> {
        self.0.strip_prefix('@').map(Path::new)
    }

    /// The specification text, read from the file for `@path` arguments.
    pub fn resolve(&self) -> io::Result<String> {
        match self.file() {
            Some(path) => fs::read_to_string(path).map(|text| text.trim_end().to_string()),
            None => Ok(self.0.clone()),
        }
    }
}

/// Load a `PipeConfig` from a YAML file.
pub fn load_config(path: impl AsRef<Path>) -> Result<PipeConfig, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    Ok(PipeConfig::from_yaml_str(&text)?)
}

/// Pick the log filter: explicit flag first, then the config file, then the
/// default. `RUST_LOG` is consulted by the caller before any of these.
pub fn log_filter(flag: Option<&str>, config: Option<&PipeConfig>) -> String {
    flag.map(str::to_string)
        .or_else(|| config.and_then(|c| c.log_filter.clone()))
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}
