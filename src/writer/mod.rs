//! Output stages: text re-serialization and raw block dumps.
pub mod bin;
pub mod text;
