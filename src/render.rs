//! Markdown to HTML conversion using pulldown-cmark.
//!
//! Besides stock CommonMark + GFM extensions, a paragraph whose text
//! begins with `{.name}` or `{#name}` gets that tag stripped from the
//! visible text and attached as a `class` or `id` attribute on the
//! emitted `<p>` element:
//!
//! ```text
//! {.note} Remember to hydrate.   ->   <p class="note">Remember to hydrate.</p>
//! {#warn} Be careful.            ->   <p id="warn">Be careful.</p>
//! ```
//!
//! Only a single leading tag per paragraph is recognized, and only when
//! it is literally the first inline text of the paragraph.

use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html};
use regex::Regex;

/// Leading paragraph tag: `{.class-name}` or `{#id-name}` plus the
/// padding that separates it from the visible text.
static PARA_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{([.#])([A-Za-z][A-Za-z0-9_-]*)\}[ \t]*").unwrap());

/// Dialect: tables, strikethrough and task lists on; single newlines are
/// NOT hard breaks; no smart punctuation. Raw HTML in the document is
/// passed through untouched (the renderer trusts local input).
fn render_options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts
}

/// Convert markdown source to an HTML fragment.
///
/// Deterministic and side-effect free; never fails for UTF-8 input.
pub fn render(source: &str) -> String {
    let events: Vec<Event> = Parser::new_ext(source, render_options()).collect();
    let mut out = String::with_capacity(source.len() * 2);
    html::push_html(&mut out, attach_paragraph_tags(events).into_iter());
    out
}

/// Parsed leading tag: attribute name, attribute value, remaining text.
fn split_tag(text: &str) -> Option<(&'static str, String, String)> {
    let caps = PARA_TAG.captures(text)?;
    let attr = if &caps[1] == "." { "class" } else { "id" };
    let rest = text[caps.get(0)?.end()..].to_string();
    Some((attr, caps[2].to_string(), rest))
}

/// Rewrite paragraphs whose first text node carries a leading tag.
///
/// The `<p>` open/close pair is replaced by raw HTML events so the
/// attribute survives `push_html`; everything inside the paragraph goes
/// through the normal pipeline. Paragraphs never nest, so one flag is
/// enough to find the matching close.
fn attach_paragraph_tags(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut it = events.into_iter().peekable();
    let mut tagged = false;

    while let Some(event) = it.next() {
        match event {
            Event::Start(Tag::Paragraph) => {
                let tag = match it.peek() {
                    Some(Event::Text(text)) => split_tag(text),
                    _ => None,
                };
                let Some((attr, name, rest)) = tag else {
                    out.push(Event::Start(Tag::Paragraph));
                    continue;
                };
                it.next(); // consume the text node carrying the tag
                out.push(Event::Html(CowStr::from(format!("<p {attr}=\"{name}\">"))));
                if !rest.is_empty() {
                    out.push(Event::Text(CowStr::from(rest)));
                }
                tagged = true;
            }
            Event::End(TagEnd::Paragraph) if tagged => {
                out.push(Event::Html(CowStr::from("</p>\n")));
                tagged = false;
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_is_deterministic() {
        let source = "# Title\n\nSome *emphasis* and `code`.\n\n- a\n- b\n";
        assert_eq!(render(source), render(source));
    }

    #[test]
    fn class_tag_becomes_attribute() {
        assert_eq!(render("{.note} Hello"), "<p class=\"note\">Hello</p>\n");
    }

    #[test]
    fn id_tag_becomes_attribute() {
        assert_eq!(render("{#warn} Be careful"), "<p id=\"warn\">Be careful</p>\n");
    }

    #[test]
    fn plain_paragraph_gains_no_attribute() {
        assert_eq!(render("Hello"), "<p>Hello</p>\n");
    }

    #[test]
    fn tag_alone_yields_empty_paragraph() {
        assert_eq!(render("{.note}"), "<p class=\"note\"></p>\n");
    }

    #[test]
    fn tag_must_lead_the_paragraph() {
        // Mid-text braces are ordinary text
        let html = render("Hello {.note}");
        assert_eq!(html, "<p>Hello {.note}</p>\n");

        // A paragraph opening with inline markup has no leading text node
        let html = render("*x* {.note}");
        assert!(!html.contains("class=\"note\""));
    }

    #[test]
    fn only_first_tag_is_recognized() {
        let html = render("{.note} {#warn} text");
        assert_eq!(html, "<p class=\"note\">{#warn} text</p>\n");
    }

    #[test]
    fn tagged_paragraph_keeps_inline_markup() {
        let html = render("{.note} some *emphasis* here");
        assert_eq!(
            html,
            "<p class=\"note\">some <em>emphasis</em> here</p>\n"
        );
    }

    #[test]
    fn surrounding_blocks_are_untouched() {
        let html = render("# Title\n\n{.lead} Intro text\n\nplain");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<p class=\"lead\">Intro text</p>"));
        assert!(html.contains("<p>plain</p>"));
    }

    #[test]
    fn tables_are_enabled() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn single_newline_is_not_a_hard_break() {
        let html = render("line one\nline two");
        assert!(!html.contains("<br"));
    }

    #[test]
    fn raw_html_passes_through() {
        let html = render("<div class=\"x\">kept</div>");
        assert!(html.contains("<div class=\"x\">kept</div>"));
    }

    #[test]
    fn strikethrough_is_enabled() {
        assert!(render("~~gone~~").contains("<del>gone</del>"));
    }
}
