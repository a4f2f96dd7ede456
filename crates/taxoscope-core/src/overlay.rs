//! # Annotation Overlay
//!
//! The single transient info panel anchored to a hovered node.
//! At most one annotation is visible; `show` replaces whatever is up.

use crate::{TaxonDetail, TaxonId};
use serde::{Deserialize, Serialize};

/// Content of a visible overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Node the panel is anchored to. Screen position is the renderer's job.
    pub anchor: TaxonId,
    /// Panel title (the taxon name).
    pub title: String,
    /// Rendered HTML body.
    pub body_html: String,
}

/// Holder of the (at most one) visible annotation.
#[derive(Debug, Clone, Default)]
pub struct AnnotationOverlay {
    current: Option<Annotation>,
}

impl AnnotationOverlay {
    /// Create an overlay with nothing visible.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show an annotation, returning the one it replaced.
    pub fn show(
        &mut self,
        anchor: TaxonId,
        title: impl Into<String>,
        body_html: impl Into<String>,
    ) -> Option<Annotation> {
        self.current.replace(Annotation {
            anchor,
            title: title.into(),
            body_html: body_html.into(),
        })
    }

    /// Hide the visible annotation, returning it.
    pub fn dismiss(&mut self) -> Option<Annotation> {
        self.current.take()
    }

    /// The visible annotation.
    #[must_use]
    pub fn current(&self) -> Option<&Annotation> {
        self.current.as_ref()
    }
}

/// Render the overlay body: `<img src="…" /><br>summary`.
///
/// Both the image URL and the summary are escaped; the summary is plain text.
#[must_use]
pub fn render_body(detail: &TaxonDetail) -> String {
    let summary = escape_html(&detail.summary);
    match detail.image.as_deref().filter(|s| !s.is_empty()) {
        Some(image) => format!("<img src=\"{}\" /><br>{}", escape_html(image), summary),
        None => summary,
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_replaces_visible_annotation() {
        let mut overlay = AnnotationOverlay::new();
        assert!(overlay.show(TaxonId::new("A"), "Animalia", "x").is_none());

        let replaced = overlay.show(TaxonId::new("B"), "Chordata", "y");
        assert_eq!(replaced.map(|a| a.anchor), Some(TaxonId::new("A")));
        assert_eq!(
            overlay.current().map(|a| &a.anchor),
            Some(&TaxonId::new("B"))
        );
    }

    #[test]
    fn dismiss_clears() {
        let mut overlay = AnnotationOverlay::new();
        overlay.show(TaxonId::new("A"), "Animalia", "x");
        assert!(overlay.dismiss().is_some());
        assert!(overlay.current().is_none());
        assert!(overlay.dismiss().is_none());
    }

    #[test]
    fn body_includes_image_and_escapes() {
        let detail = TaxonDetail {
            summary: "Cats & <dogs>".to_string(),
            image: Some("https://img.example/a\".png".to_string()),
            url: None,
        };
        assert_eq!(
            render_body(&detail),
            "<img src=\"https://img.example/a&quot;.png\" /><br>Cats &amp; &lt;dogs&gt;"
        );
    }

    #[test]
    fn body_without_image_is_summary_only() {
        let detail = TaxonDetail {
            summary: "Multicellular eukaryotes.".to_string(),
            ..TaxonDetail::default()
        };
        assert_eq!(render_body(&detail), "Multicellular eukaryotes.");
    }
}
