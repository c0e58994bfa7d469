//! PDF Editor Core Library
//!
//! Virtual page editing over a committed PDF buffer: reorder and rotate are
//! staged in an [`doc_model::EditStore`] and materialized on save.
//!
//! Pending rotations belong to a page, not to a visual slot: moving a rotated
//! page carries its rotation along and does not commit first. Hosts that want
//! the commit-before-reorder sequence set
//! [`EditorConfig::commit_before_reorder`].

pub mod config;
pub mod controller;
pub mod error;

pub use config::EditorConfig;
pub use controller::Editor;
pub use error::{EditorError, EditorResult};
