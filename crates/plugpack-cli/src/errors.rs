//! Top-level error type for the CLI runtime.

use plugpack_config::ConfigError;
use plugpack_core::BuildError;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("invalid build options: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Build(#[from] BuildError),
}
