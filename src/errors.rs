use crate::config::ConfigError;
use crate::render::RenderError;
use crate::resolver::ResolveError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read package listing {}: {source}", path.display())]
    Listing {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
