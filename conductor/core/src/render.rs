//! Rich-Text Rendering
//!
//! Converts the accumulated response text (markdown with LaTeX-style math)
//! into an HTML fragment that surfaces can insert as-is.
//!
//! Rendering never fails. Raw HTML in the source is escaped rather than
//! passed through, and math the parser cannot make sense of stays literal
//! text. Math spans come out as `<code class="language-math ...">` elements
//! for a browser surface to typeset.

use markdown::{CompileOptions, Constructs, Options, ParseOptions};

/// Text → safe HTML fragment
pub trait RichTextRenderer: Send + Sync {
    /// Render `text` to HTML. Must not panic on malformed input.
    fn render(&self, text: &str) -> String;
}

/// GFM markdown with inline (`$x$`) and block (`$$ ... $$`) math
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    /// Create a renderer
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn options() -> Options {
        Options {
            parse: ParseOptions {
                constructs: Constructs {
                    math_flow: true,
                    math_text: true,
                    ..Constructs::gfm()
                },
                ..ParseOptions::gfm()
            },
            compile: CompileOptions {
                allow_dangerous_html: false,
                allow_dangerous_protocol: false,
                ..CompileOptions::gfm()
            },
        }
    }
}

impl RichTextRenderer for MarkdownRenderer {
    fn render(&self, text: &str) -> String {
        match markdown::to_html_with_options(text, &Self::options()) {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(error = ?err, "Markdown rendering failed, falling back to escaped text");
                escaped_paragraph(text)
            }
        }
    }
}

/// The source as a single paragraph of literal text
fn escaped_paragraph(text: &str) -> String {
    format!("<p>{}</p>", html_escape::encode_text(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_markdown() {
        let html = MarkdownRenderer::new().render("# Title\n\nSome **bold** text.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_renders_inline_and_block_math() {
        let renderer = MarkdownRenderer::new();

        let inline = renderer.render("Euler: $e^{i\\pi} + 1 = 0$");
        assert!(inline.contains("math-inline"));

        let block = renderer.render("$$\n\\int_0^1 x\\,dx\n$$");
        assert!(block.contains("math-display"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = MarkdownRenderer::new().render("<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_malformed_math_degrades() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("Broken $\\frac{1}{ and more");
        assert!(html.contains("Broken"));
        assert!(html.contains("and more"));

        // Unclosed math block runs to the end of the document instead of failing
        let html = renderer.render("$$\n\\frac{");
        assert!(!html.is_empty());
    }

    #[test]
    fn test_escaped_paragraph_keeps_text_literal() {
        assert_eq!(
            escaped_paragraph("a < b && **c**"),
            "<p>a &lt; b &amp;&amp; **c**</p>"
        );
    }
}
