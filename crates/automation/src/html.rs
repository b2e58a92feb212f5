//! HTML reduction for prompt embedding.
//!
//! The raw visible snapshot is far too large and noisy for a prompt.
//! [`clean_html`] strips non-semantic elements and known ad containers;
//! [`merge_frames`] splices child-frame markup into the main document
//! so one cleaned string describes the whole visible form.

use lol_html::{element, rewrite_str, RewriteStrSettings};

/// Container selectors that never carry form semantics.
const NOISE_SELECTORS: &[&str] = &[
    "script",
    "style",
    "noscript",
    "iframe",
    "svg",
    "meta",
    "link",
    "[id*='google_ads']",
    "[id*='ad-']",
    "[class*='advert']",
    "[class*='cookie-banner']",
    "[aria-hidden='true']",
];

/// Strip noise elements and collapse whitespace runs. Falls back to the
/// input unchanged if the rewriter rejects the document.
pub fn clean_html(html: &str) -> String {
    let mut handlers = Vec::new();
    for selector in NOISE_SELECTORS {
        handlers.push(element!(selector, |el| {
            el.remove();
            Ok(())
        }));
    }
    // Inline styles add bulk without semantics.
    handlers.push(element!("*", |el| {
        el.remove_attribute("style");
        Ok(())
    }));

    let cleaned = match rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::default()
        },
    ) {
        Ok(out) => out,
        Err(e) => {
            tracing::warn!(error = %e, "HTML rewrite failed, using raw markup");
            html.to_string()
        }
    };

    collapse_whitespace(&cleaned)
}

/// Reduce whitespace runs to single spaces, preserving tag boundaries.
fn collapse_whitespace(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_space = false;
    for c in html.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out.trim().to_string()
}

/// The inner markup of `<body>`, or the whole document when no body tag
/// is present (frame snapshots are often bare fragments).
pub fn body_inner(html: &str) -> &str {
    let lower = html.to_lowercase();
    let start = match lower.find("<body") {
        Some(tag) => match lower[tag..].find('>') {
            Some(gt) => tag + gt + 1,
            None => return html,
        },
        None => return html,
    };
    let end = lower.rfind("</body>").unwrap_or(html.len());
    if end <= start {
        return html;
    }
    &html[start..end]
}

/// Splice each frame's body content into the main document before its
/// closing body tag, wrapped in a marker so the planner can tell frame
/// content apart.
pub fn merge_frames(main: &str, frames: &[String]) -> String {
    if frames.is_empty() {
        return main.to_string();
    }
    let mut merged_frames = String::new();
    for (i, frame) in frames.iter().enumerate() {
        merged_frames.push_str(&format!(
            "<div data-frame-index=\"{i}\">{}</div>",
            body_inner(frame)
        ));
    }
    match main.to_lowercase().rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(main.len() + merged_frames.len());
            out.push_str(&main[..pos]);
            out.push_str(&merged_frames);
            out.push_str(&main[pos..]);
            out
        }
        None => {
            let mut out = main.to_string();
            out.push_str(&merged_frames);
            out
        }
    }
}
