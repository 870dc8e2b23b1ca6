pub mod cascade;
pub mod config;
pub mod editorconfig;
pub mod glob;

pub use cascade::{ConfigCascade, IndentSize, ResolvedConfig, EDITORCONFIG_FILE_NAME};
pub use config::{AppConfig, EditorConfigOverride};
pub use editorconfig::{EditorConfigFile, Section};
pub use glob::GlobPattern;
