//! Tera rendering engine: [`TemplateEngine`] and [`Renderer`].
//!
//! The artifact template is baked into the binary. A user template file can
//! replace it; it receives the same [`ArtifactContext`].

use std::path::{Path, PathBuf};

use tera::Tera;

use plugpin_core::PluginEntry;

use crate::context::ArtifactContext;
use crate::error::RenderError;

/// Name under which the artifact template is registered.
pub const ARTIFACT_TEMPLATE: &str = "plugins.nix.tera";

const EMBEDDED: &str = include_str!("templates/plugins.nix.tera");

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

fn build_tera(user_template: Option<&Path>) -> Result<Tera, RenderError> {
    let source = match user_template {
        Some(path) => std::fs::read_to_string(path).map_err(|e| io_err(path, e))?,
        None => EMBEDDED.to_string(),
    };

    let mut tera = Tera::default();
    tera.add_raw_template(ARTIFACT_TEMPLATE, &source)?;
    Ok(tera)
}

/// Normalise to LF line endings with exactly one trailing newline.
fn normalize_output(rendered: &str) -> String {
    let mut out = rendered.replace("\r\n", "\n");
    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based engine holding the artifact template.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Construct a new [`TemplateEngine`] from the embedded template, or from
    /// `user_template` when given.
    pub fn new(user_template: Option<&Path>) -> Result<Self, RenderError> {
        let tera = build_tera(user_template)?;
        Ok(TemplateEngine { tera })
    }

    /// Render the artifact for `ctx`.
    pub fn render(&self, ctx: &ArtifactContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        let rendered = self.tera.render(ARTIFACT_TEMPLATE, &tera_ctx)?;
        Ok(normalize_output(&rendered))
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Renders plugin entries into the generated artifact.
///
/// Create once with [`Renderer::new`] and reuse.
pub struct Renderer {
    engine: TemplateEngine,
}

impl Renderer {
    /// Construct a new [`Renderer`] with the embedded template.
    pub fn new() -> Result<Self, RenderError> {
        Ok(Renderer { engine: TemplateEngine::new(None)? })
    }

    /// Construct a [`Renderer`] from a template file on disk.
    pub fn with_template(path: &Path) -> Result<Self, RenderError> {
        Ok(Renderer { engine: TemplateEngine::new(Some(path))? })
    }

    /// Render `entries` (in order) under a `header` comment.
    pub fn render(&self, header: &str, entries: &[PluginEntry]) -> Result<String, RenderError> {
        let ctx = ArtifactContext::new(header, entries);
        self.engine.render(&ctx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_new_succeeds() {
        Renderer::new().expect("Renderer::new should succeed with embedded template");
    }

    #[test]
    fn empty_entries_render_empty_set() {
        let renderer = Renderer::new().unwrap();
        let out = renderer.render("header", &[]).unwrap();
        assert_eq!(out, "# header\n{\n}\n");
    }

    #[test]
    fn normalize_collapses_trailing_newlines_and_crlf() {
        assert_eq!(normalize_output("a\r\nb\n\n\n"), "a\nb\n");
        assert_eq!(normalize_output("a"), "a\n");
    }

    #[test]
    fn missing_user_template_is_io_error() {
        let err = Renderer::with_template(Path::new("/nonexistent/plugpin.tera"))
            .err()
            .expect("should fail");
        assert!(matches!(err, RenderError::Io { .. }));
    }
}
