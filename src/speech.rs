//! Speech playback seam and markdown sanitization.
//!
//! Speech synthesis itself is an external collaborator; the controller only
//! hands plain text to a [`SpeechPlayer`]. Before playback, AI responses are
//! stripped of structural markdown so the synthesizer never reads out
//! asterisks, URLs, or fence markers.

use pulldown_cmark::{Event, Options, Parser, TagEnd};

/// Receives plain text for playback.
///
/// Implementations must not block the caller for the duration of playback.
pub trait SpeechPlayer: Send + Sync {
    fn speak(&self, text: &str);
}

/// Discards playback requests. Used when no synthesizer is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSpeech;

impl SpeechPlayer for NoopSpeech {
    fn speak(&self, _text: &str) {}
}

/// Strips structural markdown for speech playback.
///
/// Emphasis markers are dropped, links and images keep only their text/alt,
/// headings and block quotes keep their content, code fences and inline code
/// keep the inner text, and list markers and horizontal rules vanish. All
/// whitespace is collapsed to single spaces.
#[must_use]
pub fn sanitize_text_for_speech(markdown: &str) -> String {
    if markdown.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    for event in Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push(' '),
            Event::End(end) => match end {
                TagEnd::Paragraph
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::Heading(_)
                | TagEnd::BlockQuote(_) => out.push(' '),
                _ => {}
            },
            _ => {}
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn strips_emphasis_links_and_inline_code() {
        assert_eq!(
            sanitize_text_for_speech("**bold** and [link](url) and `code`"),
            "bold and link and code"
        );
    }

    #[test]
    fn strikethrough_keeps_content() {
        assert_eq!(
            sanitize_text_for_speech("~~gone~~ stays"),
            "gone stays"
        );
    }

    #[test]
    fn images_keep_alt_text() {
        assert_eq!(
            sanitize_text_for_speech("See ![a chart](https://x/y.png) here"),
            "See a chart here"
        );
    }

    #[test]
    fn headings_and_quotes_keep_content() {
        assert_eq!(
            sanitize_text_for_speech("# Title\n\n> quoted words\n\nbody"),
            "Title quoted words body"
        );
    }

    #[test]
    fn code_fences_keep_inner_text() {
        let input = "before\n\n```rust\nlet x = 1;\n```\n\nafter";
        assert_eq!(sanitize_text_for_speech(input), "before let x = 1; after");
    }

    #[test]
    fn list_markers_and_rules_vanish() {
        let input = "- one\n- two\n\n---\n\n1. three";
        assert_eq!(sanitize_text_for_speech(input), "one two three");
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(
            sanitize_text_for_speech("line one\n\n\nline   two"),
            "line one line two"
        );
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize_text_for_speech(""), "");
    }
}
