//! Selector application for configured extraction fields
//!
//! CSS expressions are evaluated directly with `scraper`, including the
//! `::text` and `::attr(name)` suffixes callers commonly carry over from
//! crawler frameworks. XPath descriptors are accepted for the simple descendant/attribute
//! subset and translated onto CSS evaluation; anything that cannot be
//! translated behaves as a non-matching selector and yields an empty list,
//! which is also the contract for invalid or no-match selectors.

use crate::domain::SelectorSpec;
use scraper::{Html, Selector};

/// What to pull out of each matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ExtractMode {
    Text,
    Attr(String),
}

/// Apply one selector descriptor, collecting all matches in document order.
pub fn apply_selector(html: &Html, spec: &SelectorSpec) -> Vec<String> {
    let (css, mode) = match spec {
        SelectorSpec::Css(expr) => parse_css_expr(expr),
        SelectorSpec::Xpath(expr) => match xpath_to_css(expr) {
            Some(translated) => translated,
            None => return Vec::new(),
        },
    };

    let selector = match Selector::parse(&css) {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    html.select(&selector)
        .filter_map(|element| match &mode {
            ExtractMode::Text => {
                let text = element.text().collect::<String>().trim().to_string();
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
            ExtractMode::Attr(name) => element.value().attr(name).map(str::to_string),
        })
        .collect()
}

/// Split off a trailing `::text` / `::attr(name)` pseudo-element.
fn parse_css_expr(expr: &str) -> (String, ExtractMode) {
    let expr = expr.trim();
    if let Some(stripped) = expr.strip_suffix("::text") {
        return (stripped.trim().to_string(), ExtractMode::Text);
    }
    if let Some(pos) = expr.rfind("::attr(") {
        let rest = &expr[pos + "::attr(".len()..];
        if let Some(name) = rest.strip_suffix(')') {
            return (expr[..pos].trim().to_string(), ExtractMode::Attr(name.to_string()));
        }
    }
    (expr.to_string(), ExtractMode::Text)
}

/// Translate a simple XPath expression to CSS.
///
/// Supported: `//tag`, `/tag`, `*`, attribute predicates `[@attr='value']`,
/// a trailing `/text()` step, and a trailing `/@attr` step. Anything else
/// (positional predicates, functions, axes) returns `None`.
fn xpath_to_css(expr: &str) -> Option<(String, ExtractMode)> {
    let expr = expr.trim();
    if !expr.starts_with('/') {
        return None;
    }

    let mut css = String::new();
    let mut mode = ExtractMode::Text;
    let mut rest = expr;

    while !rest.is_empty() {
        let descendant = if let Some(after) = rest.strip_prefix("//") {
            rest = after;
            true
        } else if let Some(after) = rest.strip_prefix('/') {
            rest = after;
            false
        } else {
            return None;
        };

        let step_end = step_boundary(rest);
        let step = &rest[..step_end];
        rest = &rest[step_end..];

        if step == "text()" {
            // Only valid as the final step.
            if !rest.is_empty() || css.is_empty() {
                return None;
            }
            mode = ExtractMode::Text;
            break;
        }

        if let Some(attr) = step.strip_prefix('@') {
            if !rest.is_empty() || css.is_empty() || !is_name(attr) {
                return None;
            }
            mode = ExtractMode::Attr(attr.to_string());
            break;
        }

        let css_step = step_to_css(step)?;
        if !css.is_empty() {
            css.push_str(if descendant { " " } else { " > " });
        }
        css.push_str(&css_step);
    }

    if css.is_empty() {
        return None;
    }
    Some((css, mode))
}

/// Find the end of the current step, ignoring slashes inside predicates.
fn step_boundary(s: &str) -> usize {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => return i,
            _ => {}
        }
    }
    s.len()
}

/// Translate one step (`tag`, `*`, `tag[@attr='value']`) to CSS.
fn step_to_css(step: &str) -> Option<String> {
    let (name, predicate) = match step.find('[') {
        Some(pos) => {
            let pred = step[pos..].strip_prefix('[')?.strip_suffix(']')?;
            (&step[..pos], Some(pred))
        }
        None => (step, None),
    };

    if name != "*" && !is_name(name) {
        return None;
    }

    let mut css = name.to_string();
    if let Some(pred) = predicate {
        let pred = pred.strip_prefix('@')?;
        let eq = pred.find('=')?;
        let attr = &pred[..eq];
        let value = pred[eq + 1..].trim();
        let value = value
            .strip_prefix('\'')
            .and_then(|v| v.strip_suffix('\''))
            .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))?;
        if !is_name(attr) {
            return None;
        }
        css.push_str(&format!("[{attr}=\"{value}\"]"));
    }
    Some(css)
}

fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
