use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use crate::application::render::types::RenderError;

/// Highlight `code` into a classed `<pre>` element. Languages without a known
/// grammar are emitted as escaped plain text.
pub(crate) fn highlight_code(
    language: Option<&str>,
    code: &str,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<String, RenderError> {
    let lang_token = language
        .map(|lang| lang.trim().to_ascii_lowercase())
        .filter(|lang| !lang.is_empty())
        .unwrap_or_else(|| "text".to_string());
    let syntax =
        find_syntax(syntax_set, &lang_token).unwrap_or_else(|| syntax_set.find_syntax_plain_text());

    let mut code_with_newline = code.to_string();
    if !code_with_newline.ends_with('\n') {
        code_with_newline.push('\n');
    }

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, *class_style);

    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| RenderError::Highlighting {
                language: lang_token.clone(),
                message: err.to_string(),
            })?;
    }

    let highlighted = generator.finalize();
    Ok(code_element(&lang_token, &highlighted))
}

/// Unhighlighted fallback with the same element structure.
pub(crate) fn plain_code(language: Option<&str>, code: &str) -> String {
    let lang_token = language
        .map(|lang| lang.trim().to_ascii_lowercase())
        .filter(|lang| !lang.is_empty())
        .unwrap_or_else(|| "text".to_string());
    code_element(&lang_token, &super::blocks::escape_text(code))
}

fn code_element(lang_token: &str, inner_html: &str) -> String {
    let lang = super::blocks::escape_attribute(lang_token);
    format!(
        "<pre class=\"syntax-highlight syntax-lang-{lang}\" data-language=\"{lang}\"><code class=\"language-{lang} syntax-code\">{inner_html}</code></pre>"
    )
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    syntax_set
        .find_syntax_by_token(token)
        .or_else(|| syntax_set.find_syntax_by_name(token))
        .or_else(|| syntax_set.find_syntax_by_extension(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> (SyntaxSet, ClassStyle) {
        (
            SyntaxSet::load_defaults_newlines(),
            ClassStyle::SpacedPrefixed { prefix: "syntax-" },
        )
    }

    #[test]
    fn known_language_gets_prefixed_classes() {
        let (syntax_set, class_style) = fixtures();
        let html = highlight_code(Some("rs"), "fn main() {}", &syntax_set, &class_style)
            .expect("highlight");

        assert!(html.starts_with("<pre class=\"syntax-highlight syntax-lang-rs\""));
        assert!(html.contains("class=\"language-rs syntax-code\""));
        assert!(html.contains("syntax-source"));
        assert!(html.ends_with("</code></pre>"));
    }

    #[test]
    fn unknown_language_is_escaped_plain_text() {
        let (syntax_set, class_style) = fixtures();
        let html = highlight_code(
            Some("brainfunk"),
            "<script>alert(1)</script>",
            &syntax_set,
            &class_style,
        )
        .expect("highlight");

        assert!(html.contains("data-language=\"brainfunk\""));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn plain_code_escapes_markup() {
        let html = plain_code(None, "a < b && c");
        assert!(html.contains("data-language=\"text\""));
        assert!(html.contains("a &lt; b &amp;&amp; c"));
    }
}
