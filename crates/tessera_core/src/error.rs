//! # Runtime Error Types
//!
//! Lookups in the core return `Option`; only the ambient operations around it
//! (configuration, worker threads, named system control) can fail.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while configuring or driving a runtime.
#[derive(Error, Debug)]
pub enum TesseraError {
    /// A configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Io {
        /// The file that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A configuration file is not valid TOML or has the wrong shape.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The OS refused to start a worker thread.
    #[error("failed to spawn worker thread for system `{system}`: {source}")]
    ThreadSpawn {
        /// The system being activated.
        system: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// No system with this name is registered.
    #[error("system not found: {0}")]
    SystemNotFound(String),
}

/// Result type for runtime operations.
pub type TesseraResult<T> = Result<T, TesseraError>;
