//! Lightweight wikitext helpers for consumers of revision markup.
//!
//! This is not a wikitext renderer: it strips the constructs that get in the
//! way of plain-text processing and pulls out links and categories.

use once_cell::sync::Lazy;
use regex::Regex;

static CATEGORY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[Category:([^|\]]+?)(?:\|[^\]]+)?\]\]").unwrap());

static LINK_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[([^\[\]]*)\]\]").unwrap());

static LANG_LINK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[[a-z\-]+:[^\]]+\]\]").unwrap());

// <ref> bodies can hold comments and URLs that confuse the later passes
static REF_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<ref[^>/]*>.*?</ref>|<ref[^>]*/>").unwrap());

static HTML_COMMENT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static EXTERNAL_LINK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[https?://[^\s\]]+(?:\s([^\]]*))?\]").unwrap());

static URL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s<]+").unwrap());

static HTML_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^!][^>]*>").unwrap());

static EMPHASIS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"'{2,}").unwrap());

static BLANK_LINES_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// An ordinary article link, e.g. `[[Target|anchor]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub target: String,
    pub anchor: String,
}

/// Title line followed by the markup reduced to readable text.
pub fn plain_text(title: &str, markup: &str) -> String {
    let s = LANG_LINK_REGEX.replace_all(markup, " ");
    let s = REF_REGEX.replace_all(&s, " ");
    let s = HTML_COMMENT_REGEX.replace_all(&s, " ");
    let s = strip_templates(&s);
    let s = CATEGORY_REGEX.replace_all(&s, " ");
    let s = EXTERNAL_LINK_REGEX.replace_all(&s, "$1");
    // comments go first so a URL cannot swallow a comment terminator
    let s = URL_REGEX.replace_all(&s, " ");
    let s = LINK_REGEX.replace_all(&s, |caps: &regex::Captures<'_>| link_text(&caps[1]).to_string());
    let s = HTML_TAG_REGEX.replace_all(&s, " ");
    let s = EMPHASIS_REGEX.replace_all(&s, "");
    let body = BLANK_LINES_REGEX.replace_all(s.trim(), "\n\n");

    format!("{}\n{}", title, body)
}

/// Visible text of a `[[...]]` link body.
fn link_text(inner: &str) -> &str {
    if let Some(rest) = strip_file_prefix(inner) {
        // captions are the last field of file links
        return rest.rsplit('|').next().unwrap_or("");
    }
    inner.rsplit('|').next().unwrap_or(inner)
}

fn strip_file_prefix(inner: &str) -> Option<&str> {
    let (ns, rest) = inner.split_once(':')?;
    let ns = ns.trim();
    (ns.eq_ignore_ascii_case("file") || ns.eq_ignore_ascii_case("image")).then_some(rest)
}

/// Ordinary links in document order. Empty, namespaced and page-internal
/// links are skipped; the anchor defaults to the target.
pub fn extract_links(markup: &str) -> Vec<Link> {
    LINK_REGEX
        .captures_iter(markup)
        .filter_map(|caps| {
            let inner = caps.get(1)?.as_str();
            if inner.is_empty() || inner.contains('\n') {
                return None;
            }
            let (target, anchor) = match inner.split_once('|') {
                Some((t, a)) => (t, Some(a)),
                None => (inner, None),
            };
            if target.contains(':') {
                return None;
            }
            let target = target.split('#').next().unwrap_or("").trim();
            if target.is_empty() {
                return None;
            }
            Some(Link {
                target: target.to_string(),
                anchor: anchor.unwrap_or(target).to_string(),
            })
        })
        .collect()
}

pub fn extract_categories(markup: &str) -> Vec<String> {
    CATEGORY_REGEX
        .captures_iter(markup)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Removes `{{...}}` templates, including nested ones.
pub fn strip_templates(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut run_start = 0;

    while i < bytes.len() {
        if i + 1 < bytes.len() && bytes[i] == b'{' && bytes[i + 1] == b'{' {
            if run_start < i {
                result.push_str(&text[run_start..i]);
            }
            let mut depth: i32 = 0;
            while i + 1 < bytes.len() {
                if bytes[i] == b'{' && bytes[i + 1] == b'{' {
                    depth += 1;
                    i += 2;
                } else if bytes[i] == b'}' && bytes[i + 1] == b'}' {
                    depth -= 1;
                    i += 2;
                    if depth == 0 {
                        break;
                    }
                } else {
                    i += 1;
                }
            }
            if depth > 0 {
                // unclosed template runs to the end of the text
                i = bytes.len();
            }
            run_start = i;
        } else {
            i += 1;
        }
    }

    if run_start < bytes.len() {
        result.push_str(&text[run_start..]);
    }

    result
}
