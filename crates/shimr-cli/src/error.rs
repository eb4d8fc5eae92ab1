//! Errors raised before resolution can start.

use std::path::PathBuf;

use shimr_core::CoreError;
use shimr_resolve::ResolveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("no manifest given: pass --manifest or set SHIMR_MANIFEST")]
    NoManifest,

    #[error("failed to read manifest '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("manifest refers to unknown type '{name}'")]
    UnknownType { name: String },

    #[error("type '{contract}' has no member named '{member}'")]
    UnknownMember { contract: String, member: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl CliError {
    /// Process exit code: 1 for internal faults, 3 for anything wrong with
    /// the manifest or its file.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Resolve(_) => 1,
            _ => 3,
        }
    }
}
