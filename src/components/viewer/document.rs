use log::{debug, error};
use pulldown_cmark::{Options, Parser, html};
use url::Url;

use super::links::{LINK_ATTRIBUTE, link_target_id, rewrite_cross_references};
use crate::api::InsightDetail;
use crate::error::ApiError;
use crate::events::{EventTable, Evented, Shared};
use crate::state::{AppState, Generation};

/// Source values the capture pipeline writes when it has no real URL.
const PLACEHOLDER_SOURCES: &[&str] = &["", "unknown", "n/a", "none", "manual"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoveltyLevel {
	Low,
	Medium,
	High,
}

impl NoveltyLevel {
	pub fn of(score: f64) -> Self {
		if score >= 0.7 {
			NoveltyLevel::High
		} else if score >= 0.4 {
			NoveltyLevel::Medium
		} else {
			NoveltyLevel::Low
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			NoveltyLevel::Low => "Low",
			NoveltyLevel::Medium => "Medium",
			NoveltyLevel::High => "High",
		}
	}
}

/// An insight ready for display.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedInsight {
	pub id: String,
	pub title: String,
	pub theme: String,
	pub theme_color: String,
	pub novelty: f64,
	pub novelty_level: NoveltyLevel,
	pub date: Option<String>,
	pub source_link: Option<String>,
	pub concepts: Vec<String>,
	pub tags: Vec<String>,
	pub body_html: String,
	pub filename: Option<String>,
}

impl RenderedInsight {
	pub fn render(detail: InsightDetail, theme_color: String) -> Self {
		let novelty = detail.novelty_score.clamp(0.0, 1.0);
		let body = match detail.html_content {
			Some(html) if !html.trim().is_empty() => html,
			_ => markdown_to_html(detail.content.as_deref().unwrap_or_default()),
		};
		Self {
			title: detail
				.source_title
				.filter(|t| !t.trim().is_empty())
				.unwrap_or_else(|| detail.id.clone()),
			id: detail.id,
			theme: detail.theme.unwrap_or_else(|| "Other".to_string()),
			theme_color,
			novelty,
			novelty_level: NoveltyLevel::of(novelty),
			date: detail.date_added.as_deref().and_then(date_part),
			source_link: detail.source_url.as_deref().and_then(source_link),
			concepts: detail.concepts,
			tags: detail.tags,
			body_html: sanitize_body(&rewrite_cross_references(&body)),
			filename: detail.filename,
		}
	}

	pub fn novelty_percent(&self) -> u32 {
		(self.novelty * 100.0).round() as u32
	}
}

pub fn markdown_to_html(markdown: &str) -> String {
	let options = Options::ENABLE_TABLES | Options::ENABLE_TASKLISTS | Options::ENABLE_STRIKETHROUGH;
	let mut out = String::with_capacity(markdown.len() * 3 / 2);
	html::push_html(&mut out, Parser::new_ext(markdown, options));
	out
}

/// Strip scripts, event handlers and unknown tags from a body before it
/// reaches the DOM. Cross-reference anchors and task-list checkboxes survive.
pub fn sanitize_body(html: &str) -> String {
	ammonia::Builder::default()
		.add_tags(["input"])
		.add_tag_attributes("a", ["class", LINK_ATTRIBUTE])
		.add_tag_attributes("span", ["class"])
		.add_tag_attributes("code", ["class"])
		.add_tag_attributes("input", ["type", "checked", "disabled"])
		.clean(html)
		.to_string()
}

/// `2024-02-03T10:00:00` and `2024-02-03 10:00` both become `2024-02-03`.
pub fn date_part(raw: &str) -> Option<String> {
	let raw = raw.trim();
	let date = raw.split(['T', ' ']).next().unwrap_or(raw);
	(!date.is_empty()).then(|| date.to_string())
}

/// Only real `http(s)` sources are linked.
pub fn source_link(raw: &str) -> Option<String> {
	let raw = raw.trim();
	if PLACEHOLDER_SOURCES.contains(&raw.to_ascii_lowercase().as_str()) {
		return None;
	}
	let url = Url::parse(raw).ok()?;
	if !matches!(url.scheme(), "http" | "https") {
		return None;
	}
	let host = url.host_str()?;
	if host == "example.com" || host.ends_with(".example.com") {
		return None;
	}
	Some(url.into())
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum ViewerContent {
	#[default]
	Empty,
	Loading {
		id: String,
	},
	Loaded(Box<RenderedInsight>),
	Failed {
		id: String,
		message: String,
	},
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewerEvent {
	/// A cross reference in the body was followed.
	LinkActivated(String),
}

/// Detail pane for the selected insight.
pub struct DocumentViewer {
	state: Shared<AppState>,
	content: ViewerContent,
	generation: Generation,
	events: EventTable<ViewerEvent>,
}

impl Evented for DocumentViewer {
	type Event = ViewerEvent;

	fn events(&mut self) -> &mut EventTable<ViewerEvent> {
		&mut self.events
	}
}

impl DocumentViewer {
	pub fn new(state: Shared<AppState>) -> Self {
		Self {
			state,
			content: ViewerContent::Empty,
			generation: Generation::default(),
			events: EventTable::default(),
		}
	}

	/// Show the loading state for `id`; the returned generation must be
	/// handed back to [`DocumentViewer::finish_load`].
	pub fn begin_load(&mut self, id: &str) -> u64 {
		self.content = ViewerContent::Loading { id: id.to_string() };
		self.generation.advance()
	}

	/// Returns `false` when a newer load has started since.
	pub fn finish_load(&mut self, generation: u64, result: Result<InsightDetail, ApiError>) -> bool {
		if !self.generation.is_current(generation) {
			debug!("discarding stale insight load (generation {})", generation);
			return false;
		}
		let id = self.loading_id().unwrap_or_default();
		self.content = match result {
			Ok(detail) => {
				let color = self
					.state
					.borrow()
					.theme_color(detail.theme.as_deref().unwrap_or("Other"));
				ViewerContent::Loaded(Box::new(RenderedInsight::render(detail, color)))
			}
			Err(err) => {
				error!("failed to load insight {}: {}", id, err);
				ViewerContent::Failed {
					id,
					message: err.status_line(),
				}
			}
		};
		true
	}

	pub fn clear(&mut self) {
		self.generation.advance();
		self.content = ViewerContent::Empty;
	}

	pub fn activate_link(&mut self, target: &str) {
		let id = link_target_id(target);
		if !id.is_empty() {
			self.events.queue(ViewerEvent::LinkActivated(id));
		}
	}

	pub fn content(&self) -> &ViewerContent {
		&self.content
	}

	/// Id of the insight currently on screen, once loaded.
	pub fn shown_id(&self) -> Option<&str> {
		match &self.content {
			ViewerContent::Loaded(insight) => Some(&insight.id),
			_ => None,
		}
	}

	fn loading_id(&self) -> Option<String> {
		match &self.content {
			ViewerContent::Loading { id } => Some(id.clone()),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::rc::Rc;

	use super::*;
	use crate::events::{dispatch, subscribe};

	fn detail(id: &str) -> InsightDetail {
		InsightDetail {
			id: id.into(),
			source_title: Some(format!("Title of {}", id)),
			theme: Some("AI".into()),
			novelty_score: 0.82,
			date_added: Some("2024-02-03T10:00:00".into()),
			source_url: Some("https://arxiv.org/abs/1706.03762".into()),
			concepts: vec!["attention".into()],
			tags: vec!["ml".into()],
			content: Some("# Heading\n\nLinks to [[other]].".into()),
			html_content: None,
			filename: Some(format!("{}.md", id)),
		}
	}

	fn viewer() -> DocumentViewer {
		let state: Shared<AppState> = Rc::default();
		state
			.borrow_mut()
			.theme_colors
			.insert("AI".into(), "#3b82f6".into());
		DocumentViewer::new(state)
	}

	#[test]
	fn renders_markdown_body_with_links() {
		let mut viewer = viewer();
		let generation = viewer.begin_load("x");
		assert!(viewer.finish_load(generation, Ok(detail("x"))));
		let ViewerContent::Loaded(insight) = viewer.content() else {
			panic!("expected loaded content");
		};
		assert_eq!(insight.title, "Title of x");
		assert_eq!(insight.theme_color, "#3b82f6");
		assert_eq!(insight.date.as_deref(), Some("2024-02-03"));
		assert_eq!(insight.novelty_level, NoveltyLevel::High);
		assert_eq!(insight.novelty_percent(), 82);
		assert!(insight.body_html.contains("<h1>Heading</h1>"));
		assert!(insight.body_html.contains(r#"data-insight-id="other""#));
		assert_eq!(insight.filename.as_deref(), Some("x.md"));
		assert_eq!(viewer.shown_id(), Some("x"));
	}

	#[test]
	fn prefers_backend_html() {
		let mut d = detail("x");
		d.html_content = Some("<p>server side</p>".into());
		let insight = RenderedInsight::render(d, "#fff".into());
		assert_eq!(insight.body_html, "<p>server side</p>");
	}

	#[test]
	fn captured_html_cannot_run_script() {
		let mut d = detail("x");
		d.content = Some(
			"Hello <img src=x onerror=\"alert(document.cookie)\"> [[other]]\n\n<script>alert(1)</script>"
				.into(),
		);
		let body = RenderedInsight::render(d, "#fff".into()).body_html;
		assert!(!body.contains("onerror"));
		assert!(!body.contains("<script"));
		assert!(body.contains(r#"data-insight-id="other""#));
		assert!(body.contains(r##"href="#insight=other""##));
		assert!(body.contains(r#"class="wikilink""#));

		let mut d = detail("y");
		d.html_content = Some(r#"<p onclick="steal()">hi <a href="javascript:steal()">x</a></p>"#.into());
		let body = RenderedInsight::render(d, "#fff".into()).body_html;
		assert!(!body.contains("onclick"));
		assert!(!body.contains("javascript:"));
	}

	#[test]
	fn task_lists_survive_cleaning() {
		let html = sanitize_body(&markdown_to_html("- [x] done"));
		assert!(html.contains("<input"));
		assert!(html.contains(r#"type="checkbox""#));
	}

	#[test]
	fn fast_clicks_show_latest_only() {
		let mut viewer = viewer();
		let first = viewer.begin_load("a");
		let second = viewer.begin_load("b");
		assert!(viewer.finish_load(second, Ok(detail("b"))));
		assert!(!viewer.finish_load(first, Ok(detail("a"))));
		assert_eq!(viewer.shown_id(), Some("b"));
	}

	#[test]
	fn failure_is_inline() {
		let mut viewer = viewer();
		let generation = viewer.begin_load("gone");
		viewer.finish_load(
			generation,
			Err(ApiError::Status {
				status: 404,
				detail: "Insight gone not found".into(),
			}),
		);
		assert_eq!(
			*viewer.content(),
			ViewerContent::Failed {
				id: "gone".into(),
				message: "Not found".into(),
			}
		);
	}

	#[test]
	fn clear_drops_in_flight_load() {
		let mut viewer = viewer();
		let generation = viewer.begin_load("a");
		viewer.clear();
		assert!(!viewer.finish_load(generation, Ok(detail("a"))));
		assert_eq!(*viewer.content(), ViewerContent::Empty);
	}

	#[test]
	fn placeholder_sources_suppressed() {
		assert_eq!(source_link("Unknown"), None);
		assert_eq!(source_link("manual"), None);
		assert_eq!(source_link("https://example.com/article"), None);
		assert_eq!(source_link("ftp://files.org/a"), None);
		assert_eq!(
			source_link(" https://arxiv.org/abs/1706.03762 ").as_deref(),
			Some("https://arxiv.org/abs/1706.03762")
		);
	}

	#[test]
	fn novelty_levels() {
		assert_eq!(NoveltyLevel::of(0.1), NoveltyLevel::Low);
		assert_eq!(NoveltyLevel::of(0.4), NoveltyLevel::Medium);
		assert_eq!(NoveltyLevel::of(0.7).label(), "High");
	}

	#[test]
	fn links_activate_chained_loads() {
		let viewer = Rc::new(RefCell::new(viewer()));
		let seen = Rc::new(RefCell::new(Vec::new()));
		let log = seen.clone();
		subscribe(&viewer, move |e: &ViewerEvent| log.borrow_mut().push(e.clone()));
		dispatch(&viewer, |v| v.activate_link("../AI/attention.md"));
		dispatch(&viewer, |v| v.activate_link("  "));
		assert_eq!(*seen.borrow(), vec![ViewerEvent::LinkActivated("attention".into())]);
	}
}
