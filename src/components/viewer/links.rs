//! Cross-reference rewriting for rendered insight bodies.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static WIKILINK: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"\[\[([^\]|]+)(?:\|([^\]]+))?\]\]").expect("wikilink pattern compiles")
});

/// Anchors the backend already resolved for its own page script.
static BACKEND_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"<a\s+href="javascript:app\.loadInsight\('([^']*)'\)"\s+class="wikilink">"#)
		.expect("backend anchor pattern compiles")
});

/// Attribute the viewer's delegated click handler looks for.
pub const LINK_ATTRIBUTE: &str = "data-insight-id";

/// Insight id a link target points at: `[[../notes/idea.md]]` means `idea`.
pub fn link_target_id(target: &str) -> String {
	let target = target.trim();
	let last = target.rsplit('/').next().unwrap_or(target);
	last.strip_suffix(".md").unwrap_or(last).to_string()
}

/// Fragment that deep-links to an insight.
pub fn insight_href(id: &str) -> String {
	format!("#insight={}", urlencoding::encode(id))
}

/// Insight id named by a URL fragment: `#insight=<id>` or a bare `#<id>`.
pub fn deep_link_id(fragment: &str) -> Option<String> {
	let fragment = fragment.trim_start_matches('#');
	let raw = fragment.strip_prefix("insight=").unwrap_or(fragment);
	let id = urlencoding::decode(raw).ok()?.trim().to_string();
	(!id.is_empty()).then_some(id)
}

fn unescape_html(s: &str) -> String {
	s.replace("&quot;", "\"")
		.replace("&#39;", "'")
		.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&amp;", "&")
}

fn escape_attr(s: &str) -> String {
	s.replace('&', "&amp;")
		.replace('"', "&quot;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
}

fn anchor_open(id: &str) -> String {
	format!(
		r#"<a class="wikilink" {}="{}" href="{}">"#,
		LINK_ATTRIBUTE,
		escape_attr(id),
		insight_href(id)
	)
}

/// Turn `[[target]]`, `[[target|display]]` and backend-resolved anchors in
/// rendered HTML into links the viewer can activate. The input is already
/// escaped HTML, so display text is copied as is. Unresolved
/// `wikilink-orphan` spans are left alone.
pub fn rewrite_cross_references(html: &str) -> String {
	let html = BACKEND_ANCHOR.replace_all(html, |caps: &Captures| {
		anchor_open(&unescape_html(&caps[1]))
	});
	WIKILINK
		.replace_all(&html, |caps: &Captures| {
			let target = caps[1].trim();
			let display = caps.get(2).map_or(target, |m| m.as_str().trim());
			format!(
				"{}{}</a>",
				anchor_open(&link_target_id(&unescape_html(target))),
				display
			)
		})
		.into_owned()
}
