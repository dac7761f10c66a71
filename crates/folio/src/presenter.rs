//! Terminal output.
//!
//! Canned text from the knowledge base may carry `**bold**` and `*emphasis*`
//! markers; [`render_markup`] turns those into terminal styles. Anything the
//! user typed, and anything a language model wrote, is printed as-is.

use anyhow::Result;
use console::{Style, style};
use serde::Serialize;

use folio_matcher::MatchResult;
use folio_retrieval::Answer;

/// A run of canned text with one style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span<'a> {
    Plain(&'a str),
    Bold(&'a str),
    Emphasis(&'a str),
}

/// Split canned text into styled runs.
///
/// Markers without a closing partner stay literal.
pub fn parse_markup(text: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find('*') {
        if start > 0 {
            spans.push(Span::Plain(&rest[..start]));
        }
        let marked = &rest[start..];

        if let Some(inner) = marked.strip_prefix("**")
            && let Some(end) = inner.find("**")
            && is_flanked(&inner[..end])
        {
            spans.push(Span::Bold(&inner[..end]));
            rest = &inner[end + 2..];
            continue;
        }
        if !marked.starts_with("**")
            && let Some(inner) = marked.strip_prefix('*')
            && let Some(end) = inner.find('*')
            && is_flanked(&inner[..end])
        {
            spans.push(Span::Emphasis(&inner[..end]));
            rest = &inner[end + 1..];
            continue;
        }

        spans.push(Span::Plain(&marked[..1]));
        rest = &marked[1..];
    }

    if !rest.is_empty() {
        spans.push(Span::Plain(rest));
    }
    spans
}

/// Marked text must be non-empty and must not start or end with whitespace,
/// so `2 * 3 * 4` is not emphasis.
fn is_flanked(inner: &str) -> bool {
    !inner.is_empty() && inner.trim() == inner
}

/// Render canned text with terminal styles.
pub fn render_markup(text: &str) -> String {
    parse_markup(text)
        .into_iter()
        .map(|span| match span {
            Span::Plain(s) => s.to_string(),
            Span::Bold(s) => style(s).bold().to_string(),
            Span::Emphasis(s) => style(s).italic().to_string(),
        })
        .collect()
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_dim(msg: &str) {
    println!("{}", Style::new().dim().apply_to(msg));
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", Style::new().red().apply_to("Error:"), msg);
}

/// Numbered suggestion list, as offered after every reply.
pub fn print_suggestions(suggestions: &[String]) {
    if suggestions.is_empty() {
        return;
    }
    println!();
    print_dim("Try asking:");
    for (i, s) in suggestions.iter().enumerate() {
        println!("  {} {}", style(format!("{}.", i + 1)).cyan(), s);
    }
}

/// Print a keyword matcher reply.
pub fn print_match(result: &MatchResult) {
    println!("{}", render_markup(&result.answer));
    print_suggestions(&result.suggestions);
}

/// Print a retriever reply with its sources and stage timings.
pub fn print_answer(answer: &Answer, verbose: bool) {
    println!("{}", answer.answer);

    if !answer.sources.is_empty() {
        println!();
        print_dim("Sources:");
        for (i, source) in answer.sources.iter().enumerate() {
            let topic = source.metadata.topic.as_deref().unwrap_or("-");
            println!(
                "  {}. {} {} {}",
                i + 1,
                style(&source.id).cyan(),
                Style::new().dim().apply_to(format!("[{}]", topic)),
                Style::new().dim().apply_to(format!("(score: {:.3})", source.score))
            );
            if verbose {
                println!("     {}", Style::new().dim().apply_to(&source.content));
            }
        }
    }

    let t = &answer.timing;
    println!();
    print_dim(&format!(
        "mode: {} | embed {:.1}ms | retrieve {:.1}ms | generate {:.1}ms | total {:.1}ms",
        answer.mode, t.embed_ms, t.retrieve_ms, t.generate_ms, t.total_ms
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_one_span() {
        assert_eq!(parse_markup("no markers"), vec![Span::Plain("no markers")]);
        assert!(parse_markup("").is_empty());
    }

    #[test]
    fn test_bold_and_emphasis() {
        assert_eq!(
            parse_markup("I use **Power BI** and *SQL* daily"),
            vec![
                Span::Plain("I use "),
                Span::Bold("Power BI"),
                Span::Plain(" and "),
                Span::Emphasis("SQL"),
                Span::Plain(" daily"),
            ]
        );
    }

    #[test]
    fn test_refresher_prefix() {
        let spans = parse_markup(folio_matcher::MEMORY_PREFIX);
        assert_eq!(
            spans[0],
            Span::Emphasis("We covered this before, but here's a refresher:")
        );
    }

    #[test]
    fn test_unclosed_markers_stay_literal() {
        let rendered: String = parse_markup("2 * 3 = 6, **oops")
            .into_iter()
            .map(|span| match span {
                Span::Plain(s) => s,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(rendered, "2 * 3 = 6, **oops");
    }

    #[test]
    fn test_render_without_colors_strips_markers() {
        console::set_colors_enabled(false);
        assert_eq!(render_markup("**Skills**: *Python*"), "Skills: Python");
    }
}
