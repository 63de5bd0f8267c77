//! Turning raw provider output into publishable markup and the metadata
//! derived from it.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>|(?m)^[ \t]*#[ \t]+([^\n]+)").expect("valid regex")
});

static H1_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>.*?</h1>").expect("valid regex"));

static META_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*\**meta[ -]?beschrijving\**:\**[ \t]*(.+?)[ \t]*$").expect("valid regex")
});

const ELLIPSIS: &str = "...";

pub fn strip_tags(content: &str) -> String {
    TAG.replace_all(content, " ").into_owned()
}

/// Whitespace-separated words of the tag-stripped text.
pub fn word_count(content: &str) -> usize {
    strip_tags(content).split_whitespace().count()
}

/// Blocks separated by blank lines, or `<p>` elements when the text is
/// markup on consecutive lines, whichever is larger.
pub fn paragraph_count(content: &str) -> usize {
    let blocks = content
        .split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .count();
    let paragraphs = content.matches("<p>").count() + content.matches("<p ").count();
    blocks.max(paragraphs)
}

/// First level-1 heading (`<h1>` element or `# ` line), else the fallback.
pub fn extract_title(raw: &str, fallback: &str) -> String {
    HEADING
        .captures(raw)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| normalize_whitespace(&strip_tags(m.as_str())))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

pub fn extract_meta_description(raw: &str) -> Option<String> {
    META_LINE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches('*').trim().to_string())
        .filter(|s| !s.is_empty())
}

/// True when every block already starts with a tag, i.e. the content is
/// the output of [`to_markup`].
pub fn is_formatted(content: &str) -> bool {
    let mut blocks = content.split("\n\n").map(str::trim).filter(|b| !b.is_empty()).peekable();
    blocks.peek().is_some() && blocks.all(|b| b.starts_with('<'))
}

/// Convert markdown-like structure into HTML.
///
/// Drops the level-1 heading and any meta-description line, turns `##`/`###`
/// into `<h2>`/`<h3>`, bullet and numbered lines into `<ul>` lists, and wraps
/// remaining text blocks in `<p>`. Formatted input is returned unchanged.
pub fn to_markup(raw: &str) -> String {
    if is_formatted(raw) && !HEADING.is_match(raw) {
        return raw.trim().to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut title_dropped = false;

    for line in raw.lines() {
        let trimmed = line.trim();

        if META_LINE.is_match(trimmed) {
            continue;
        }

        let rest;
        let current = if title_dropped {
            trimmed
        } else {
            match without_title(trimmed) {
                Some(remainder) => {
                    title_dropped = true;
                    if remainder.is_empty() {
                        continue;
                    }
                    rest = remainder;
                    rest.as_str()
                }
                None => trimmed,
            }
        };

        if let Some(text) = current.strip_prefix("### ") {
            push_block(&mut lines, format!("<h3>{}</h3>", text.trim()));
        } else if let Some(text) = current.strip_prefix("## ").or_else(|| current.strip_prefix("# ")) {
            // Later level-1 headings are demoted.
            push_block(&mut lines, format!("<h2>{}</h2>", text.trim()));
        } else if let Some(item) = list_item(current) {
            lines.push(format!("<li>{}</li>", item));
        } else {
            lines.push(current.to_string());
        }
    }

    group_blocks(&lines)
}

/// The line with its level-1 heading removed, if it carries one.
fn without_title(line: &str) -> Option<String> {
    if line.starts_with("# ") {
        return Some(String::new());
    }
    H1_ELEMENT
        .is_match(line)
        .then(|| H1_ELEMENT.replace(line, "").trim().to_string())
}

/// Headings always stand alone as a block.
fn push_block(lines: &mut Vec<String>, block: String) {
    lines.push(String::new());
    lines.push(block);
    lines.push(String::new());
}

fn list_item(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix("* ").or_else(|| line.strip_prefix("- ")) {
        return Some(rest.trim());
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(". ") {
            return Some(rest.trim());
        }
    }
    None
}

fn group_blocks(lines: &[String]) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut text: Vec<&str> = Vec::new();
    let mut items: Vec<&str> = Vec::new();

    fn flush_text(text: &mut Vec<&str>, blocks: &mut Vec<String>) {
        if text.is_empty() {
            return;
        }
        let joined = text.join("\n");
        if joined.starts_with('<') {
            blocks.push(joined);
        } else {
            blocks.push(format!("<p>{}</p>", joined));
        }
        text.clear();
    }

    fn flush_items(items: &mut Vec<&str>, blocks: &mut Vec<String>) {
        if items.is_empty() {
            return;
        }
        blocks.push(format!("<ul>\n{}\n</ul>", items.join("\n")));
        items.clear();
    }

    for line in lines {
        if line.is_empty() {
            flush_items(&mut items, &mut blocks);
            flush_text(&mut text, &mut blocks);
        } else if line.starts_with("<li>") {
            flush_text(&mut text, &mut blocks);
            items.push(line);
        } else {
            flush_items(&mut items, &mut blocks);
            text.push(line);
        }
    }
    flush_items(&mut items, &mut blocks);
    flush_text(&mut text, &mut blocks);

    blocks.join("\n\n")
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain-text excerpt of at most `max_chars` characters, cut at the last
/// word boundary and suffixed with `...` when truncated.
pub fn excerpt(content: &str, max_chars: usize) -> String {
    let plain = normalize_whitespace(&strip_tags(content));
    if plain.chars().count() <= max_chars {
        return plain;
    }

    let head: String = plain.chars().take(max_chars).collect();
    // The cut lands on a word boundary when the next character is a space.
    let next_is_space = plain.chars().nth(max_chars).is_some_and(char::is_whitespace);
    let cut = if next_is_space {
        head.as_str()
    } else {
        match head.rfind(' ') {
            Some(idx) if idx > 0 => &head[..idx],
            _ => head.as_str(),
        }
    };

    format!("{}{}", cut.trim_end(), ELLIPSIS)
}

pub fn reading_time_minutes(word_count: usize, words_per_minute: usize) -> u32 {
    let wpm = words_per_minute.max(1);
    (word_count.div_ceil(wpm)).max(1) as u32
}

/// URL slug: ASCII, lower-case, hyphen-separated, at most `max_len` chars.
pub fn slugify(text: &str, max_len: usize) -> String {
    let ascii: String = text.nfkd().filter(char::is_ascii).collect();

    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > max_len {
        slug.truncate(max_len);
    }
    slug.trim_matches('-').to_string()
}

/// Truncate to at most `max_chars` characters without splitting a char.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_from_h1_element() {
        assert_eq!(
            extract_title("<h1>Test Titel</h1><p>...</p>", "Onderwerp"),
            "Test Titel"
        );
    }

    #[test]
    fn title_from_markdown_heading() {
        let raw = "Inleiding\n# Reewild herkennen\n## Kenmerken\n# Tweede";
        assert_eq!(extract_title(raw, "Onderwerp"), "Reewild herkennen");
    }

    #[test]
    fn title_falls_back_without_heading() {
        assert_eq!(extract_title("<p>Geen kop hier</p>\n## Sub", "Onderwerp"), "Onderwerp");
    }

    #[test]
    fn meta_description_line_is_found() {
        let raw = "# Titel\n\n**Meta beschrijving:** Alles over reewild.\n\nTekst";
        assert_eq!(extract_meta_description(raw).as_deref(), Some("Alles over reewild."));
        assert!(extract_meta_description("Tekst").is_none());
    }

    #[test]
    fn markup_converts_structure() {
        let raw = "# Titel\n\nMeta beschrijving: weg ermee\n\n## Hoofdsectie\nDit is een paragraaf.\n\n### Subsectie\n* Item 1\n* Item 2\n1. Stap een\n\nSlot.";
        let html = to_markup(raw);

        assert!(html.contains("<h2>Hoofdsectie</h2>"));
        assert!(html.contains("<p>Dit is een paragraaf.</p>"));
        assert!(html.contains("<h3>Subsectie</h3>"));
        assert!(html.contains("<ul>\n<li>Item 1</li>\n<li>Item 2</li>\n<li>Stap een</li>\n</ul>"));
        assert!(html.contains("<p>Slot.</p>"));
        assert!(!html.contains("Titel"));
        assert!(!html.contains("weg ermee"));
    }

    #[test]
    fn markup_is_idempotent() {
        let raw = "# Titel\n\nInleiding over de jacht.\n\n## Sectie\n- a\n- b\n\nSlot.";
        let once = to_markup(raw);
        assert!(is_formatted(&once));
        assert_eq!(to_markup(&once), once);
    }

    #[test]
    fn html_input_keeps_its_blocks() {
        let raw = "<h1>Titel</h1>\n\n<p>Een.</p>\n\n<p>Twee.</p>";
        assert_eq!(to_markup(raw), "<p>Een.</p>\n\n<p>Twee.</p>");
    }

    #[test]
    fn inline_h1_is_removed_from_content() {
        let html = to_markup("<h1>Test Titel</h1><p>Eerste alinea.</p>");
        assert_eq!(html, "<p>Eerste alinea.</p>");
    }

    #[test]
    fn later_level_one_headings_are_demoted() {
        let raw = "# Titel\n\nIntro.\n\n# Tweede kop\n\nMeer.";
        let html = to_markup(raw);
        assert!(html.contains("<h2>Tweede kop</h2>"));
        assert_eq!(to_markup(&html), html);
        assert_eq!(extract_title(&html, "Onderwerp"), "Onderwerp");
    }

    #[test]
    fn excerpt_short_input_unchanged() {
        let text = "Korte tekst over wild.";
        assert_eq!(excerpt(text, 160), text);
    }

    #[test]
    fn excerpt_truncates_on_word_boundary() {
        let text = "Dit is een zeer lange tekst. ".repeat(20);
        let out = excerpt(&text, 160);
        assert!(out.chars().count() <= 163);
        assert!(out.ends_with("..."));
        let body = out.trim_end_matches("...");
        assert!(text.starts_with(body));
        assert!(!body.ends_with(' '));
    }

    #[test]
    fn excerpt_of_exactly_limit_is_kept() {
        let text = "a".repeat(160);
        assert_eq!(excerpt(&text, 160), text);
    }

    #[test]
    fn excerpt_of_unbroken_text_still_bounded() {
        let text = "x".repeat(400);
        let out = excerpt(&text, 160);
        assert_eq!(out.chars().count(), 163);
    }

    #[test]
    fn excerpt_counts_characters_not_bytes() {
        let text = "één reeën ".repeat(40);
        let out = excerpt(&text, 160);
        assert!(out.chars().count() <= 163);
    }

    #[test]
    fn reading_time_boundaries() {
        assert_eq!(reading_time_minutes(0, 250), 1);
        assert_eq!(reading_time_minutes(250, 250), 1);
        assert_eq!(reading_time_minutes(251, 250), 2);
        assert_eq!(reading_time_minutes(500, 250), 2);
        assert_eq!(reading_time_minutes(501, 250), 3);
    }

    #[test]
    fn slug_is_ascii_and_bounded() {
        assert_eq!(slugify("Reeën & Wilde Zwijnen: Gids 2025!", 50), "reeen-wilde-zwijnen-gids-2025");
        let long = slugify(&"jachtexamen ".repeat(10), 50);
        assert!(long.len() <= 50);
        assert!(!long.ends_with('-'));
    }

    #[test]
    fn word_and_paragraph_counts() {
        assert_eq!(word_count("<p>een twee</p><p>drie</p>"), 3);
        assert_eq!(paragraph_count("a\n\nb\n\n\n\nc"), 3);
        assert_eq!(paragraph_count("<p>a</p>\n<p>b</p>\n<p>c</p>\n<p>d</p>"), 4);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("reeën", 4), "reeë");
        assert_eq!(truncate_chars("kort", 10), "kort");
    }
}
