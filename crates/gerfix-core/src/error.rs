use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid signature pattern: {0}")]
    PatternParse(String),

    #[error("Signature not found in scanned module: {0}")]
    SignatureNotFound(String),

    #[error("Failed to resolve module: {0}")]
    ModuleResolve(String),

    #[error("Failed to resolve export {module}!{symbol}")]
    ExportResolve { module: String, symbol: String },

    #[error("Failed to install hook at {address:#x}: {message}")]
    HookInstall { address: usize, message: String },

    #[error("Address {address:#x} is already hooked")]
    AlreadyHooked { address: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the affected fix can simply be skipped while the others
    /// proceed. Configuration and module-resolution failures cannot; they
    /// take the whole install sequence down.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Error::SignatureNotFound(_)
                | Error::ExportResolve { .. }
                | Error::HookInstall { .. }
                | Error::AlreadyHooked { .. }
        )
    }
}
