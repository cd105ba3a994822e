//! Template post-processing applied to raw page HTML before it is shown.
//!
//! Relative asset references in `src="…"`, `href="…"`, `url("…")` and
//! `url('…')` are rebased onto the template's base path so pages render
//! outside the template directory.

use regex::{Captures, Regex};
use std::sync::OnceLock;

static ATTRIBUTE_REF: OnceLock<Regex> = OnceLock::new();
static CSS_URL_REF: OnceLock<Regex> = OnceLock::new();

const UNTOUCHED_PREFIXES: &[&str] = &[
    "http:",
    "https:",
    "//",
    "/",
    "#",
    "mailto:",
    "tel:",
    "data:",
    "javascript:",
];

fn attribute_ref() -> &'static Regex {
    ATTRIBUTE_REF.get_or_init(|| {
        Regex::new(r#"(?P<lead>(?:^|\s)(?i:src|href)\s*=\s*")(?P<url>[^"]*)""#).expect("static pattern")
    })
}

fn css_url_ref() -> &'static Regex {
    CSS_URL_REF.get_or_init(|| {
        Regex::new(r#"(?P<lead>url\(\s*(?P<quote>["']))(?P<url>[^"')]*)"#).expect("static pattern")
    })
}

/// Whether `url` is relative and not yet rebased onto `base_path`
pub fn needs_prefix(url: &str, base_path: &str) -> bool {
    let trimmed = url.trim_start();
    if trimmed.is_empty() || trimmed.starts_with(base_path) {
        return false;
    }
    let lower = trimmed.to_ascii_lowercase();
    !UNTOUCHED_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Rebase relative asset references onto `base_path`. Idempotent.
pub fn process_template(html: &str, base_path: &str) -> String {
    let rebase = |caps: &Captures, tail: &str| {
        let url = &caps["url"];
        if needs_prefix(url, base_path) {
            format!("{}{}{}{}", &caps["lead"], base_path, url, tail)
        } else {
            format!("{}{}{}", &caps["lead"], url, tail)
        }
    };

    let html = attribute_ref().replace_all(html, |caps: &Captures| rebase(caps, "\""));
    let html = css_url_ref().replace_all(&html, |caps: &Captures| rebase(caps, ""));
    html.into_owned()
}
