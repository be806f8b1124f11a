//! Configuration and CLI handling

pub mod cli;
pub mod format;
pub mod settings;

pub use cli::Cli;
pub use format::OutputFormat;
pub use settings::MixSettings;
