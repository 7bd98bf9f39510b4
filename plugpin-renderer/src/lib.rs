//! # plugpin-renderer
//!
//! Tera-based template engine that renders the generated plugin artifact
//! from an ordered list of [`PluginEntry`](plugpin_core::PluginEntry) values.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use plugpin_core::PluginEntry;
//! use plugpin_renderer::Renderer;
//!
//! fn render(entries: &[PluginEntry]) {
//!     if let Ok(renderer) = Renderer::new() {
//!         if let Ok(text) = renderer.render("generated", entries) {
//!             print!("{text}");
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{ArtifactContext, EntryCtx};
pub use engine::{Renderer, TemplateEngine, ARTIFACT_TEMPLATE};
pub use error::RenderError;
