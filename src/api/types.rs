//! JSON shapes of the vault backend.
//!
//! The backend speaks snake_case; camelCase aliases are accepted too.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::components::force_graph::{GraphSnapshot, InsightNode, LinkEdge};
use crate::components::navigation::{SearchResult, Theme};
use crate::state::DEFAULT_THEME_COLOR;

fn default_novelty() -> f64 {
	0.5
}

/// The backend writes `null` for a note whose frontmatter has an empty score.
fn novelty<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_else(default_novelty))
}

/// Treat an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de> + Default,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ThemeSummary {
	#[serde(default)]
	pub color: Option<String>,
	#[serde(default)]
	pub count: usize,
	#[serde(default, alias = "latestDate")]
	pub latest_date: Option<String>,
}

/// `GET /api/vault/themes`: theme name to summary.
pub type ThemesPayload = BTreeMap<String, ThemeSummary>;

pub fn themes_from(payload: ThemesPayload) -> Vec<Theme> {
	payload
		.into_iter()
		.map(|(name, summary)| Theme {
			name,
			color: summary.color.unwrap_or_else(|| DEFAULT_THEME_COLOR.to_string()),
			count: summary.count,
			latest_date: summary.latest_date,
		})
		.collect()
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct WireNode {
	pub id: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub theme: Option<String>,
	#[serde(default = "default_novelty", deserialize_with = "novelty", alias = "noveltyScore")]
	pub novelty_score: f64,
	#[serde(default)]
	pub color: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct WireEdge {
	pub source: String,
	pub target: String,
	#[serde(default)]
	pub display: Option<String>,
	#[serde(default, rename = "type")]
	pub kind: Option<String>,
}

/// Orphans arrive either as bare ids or as unresolved wikilink records.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WireOrphan {
	Id(String),
	Link {
		link: String,
		#[serde(default)]
		referenced_by: Vec<String>,
	},
}

/// `GET /api/vault/graph`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct GraphPayload {
	#[serde(default, deserialize_with = "nullable")]
	pub nodes: Vec<WireNode>,
	#[serde(default, deserialize_with = "nullable")]
	pub edges: Vec<WireEdge>,
	#[serde(default, deserialize_with = "nullable")]
	pub orphans: Vec<WireOrphan>,
}

impl GraphPayload {
	/// Orphan ids are recomputed from the edges; only unresolved links survive.
	pub fn into_snapshot(self) -> GraphSnapshot {
		let nodes = self
			.nodes
			.into_iter()
			.map(|n| {
				let label = n.label.unwrap_or_else(|| n.id.clone());
				InsightNode::new(
					n.id,
					label,
					n.theme.unwrap_or_else(|| "Other".to_string()),
					n.color.unwrap_or_else(|| DEFAULT_THEME_COLOR.to_string()),
					n.novelty_score,
				)
			})
			.collect();
		let edges = self
			.edges
			.into_iter()
			.map(|e| LinkEdge {
				display_label: e.display.unwrap_or_else(|| e.target.clone()),
				source_id: e.source,
				target_id: e.target,
				kind: e.kind.unwrap_or_else(|| "wikilink".to_string()),
			})
			.collect();
		let unresolved = self
			.orphans
			.into_iter()
			.filter_map(|o| match o {
				WireOrphan::Link { link, .. } => Some(link),
				WireOrphan::Id(_) => None,
			})
			.collect();
		GraphSnapshot::new(nodes, edges).with_unresolved_links(unresolved)
	}
}

/// Parameters of one search call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
	pub text: String,
	pub theme: Option<String>,
	pub semantic: bool,
	pub limit: usize,
}

/// `GET /api/vault/search`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SearchResponse {
	#[serde(default)]
	pub count: usize,
	/// `false` when the backend fell back to keyword matching.
	#[serde(default)]
	pub semantic: bool,
	#[serde(default, deserialize_with = "nullable")]
	pub results: Vec<SearchResult>,
}

/// `GET /api/vault/insight/{id}`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct InsightDetail {
	pub id: String,
	#[serde(default, alias = "sourceTitle")]
	pub source_title: Option<String>,
	#[serde(default)]
	pub theme: Option<String>,
	#[serde(default = "default_novelty", deserialize_with = "novelty", alias = "noveltyScore")]
	pub novelty_score: f64,
	#[serde(default, alias = "dateAdded")]
	pub date_added: Option<String>,
	#[serde(default, alias = "sourceUrl")]
	pub source_url: Option<String>,
	#[serde(default, deserialize_with = "nullable")]
	pub concepts: Vec<String>,
	#[serde(default, deserialize_with = "nullable")]
	pub tags: Vec<String>,
	#[serde(default)]
	pub content: Option<String>,
	#[serde(default, alias = "htmlContent")]
	pub html_content: Option<String>,
	#[serde(default)]
	pub filename: Option<String>,
}

/// `GET /api/vault/embedding-index/status`.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct IndexStatus {
	#[serde(default)]
	pub built: bool,
	#[serde(default)]
	pub count: Option<usize>,
}

/// `POST /api/vault/embedding-index/build`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct IndexBuildReport {
	#[serde(default)]
	pub status: String,
	#[serde(default)]
	pub count: usize,
	#[serde(default)]
	pub message: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn graph_payload_from_backend() {
		let raw = r##"{
			"nodes": [
				{"id": "attention", "label": "Attention Is All You Need", "theme": "AI",
				 "novelty_score": 0.8, "color": "#3b82f6", "concepts": ["transformers"]},
				{"id": "bare", "theme": "AI"}
			],
			"edges": [
				{"source": "attention", "target": "bare", "type": "wikilink", "display": "see"},
				{"source": "attention", "target": "missing", "type": "wikilink"}
			],
			"orphans": [{"link": "missing", "referenced_by": ["attention"]}]
		}"##;
		let payload: GraphPayload = serde_json::from_str(raw).unwrap();
		let snapshot = payload.into_snapshot();

		assert_eq!(snapshot.nodes.len(), 2);
		let bare = &snapshot.nodes[1];
		assert_eq!(bare.label, "bare");
		assert_eq!(bare.novelty_score, 0.5);
		assert_eq!(bare.color, DEFAULT_THEME_COLOR);
		assert_eq!(snapshot.edges[0].display_label, "see");
		assert_eq!(snapshot.edges[1].display_label, "missing");
		assert_eq!(snapshot.unresolved_links, vec!["missing".to_string()]);
		assert!(snapshot.orphan_ids.is_empty());
	}

	#[test]
	fn camel_case_and_id_orphans() {
		let raw = r#"{
			"nodes": [{"id": "a", "label": "A", "theme": "T", "noveltyScore": 0.1}],
			"edges": [],
			"orphans": ["a"]
		}"#;
		let snapshot = serde_json::from_str::<GraphPayload>(raw)
			.unwrap()
			.into_snapshot();
		assert_eq!(snapshot.nodes[0].novelty_score, 0.1);
		assert_eq!(snapshot.orphan_ids, vec!["a".to_string()]);
		assert!(snapshot.unresolved_links.is_empty());
	}

	#[test]
	fn null_novelty_does_not_sink_the_graph() {
		let raw = r#"{
			"nodes": [
				{"id": "a", "label": "A", "theme": "AI", "novelty_score": null},
				{"id": "b", "label": "B", "theme": "AI", "novelty_score": 0.9}
			],
			"edges": [{"source": "a", "target": "b"}]
		}"#;
		let snapshot = serde_json::from_str::<GraphPayload>(raw)
			.unwrap()
			.into_snapshot();
		assert_eq!(snapshot.nodes.len(), 2);
		assert_eq!(snapshot.nodes[0].novelty_score, 0.5);
		assert_eq!(snapshot.nodes[1].novelty_score, 0.9);

		let detail: InsightDetail =
			serde_json::from_str(r#"{"id": "a", "noveltyScore": null}"#).unwrap();
		assert_eq!(detail.novelty_score, 0.5);
	}

	#[test]
	fn themes_are_sorted_by_name() {
		let raw = r##"{
			"Psychology": {"count": 3, "color": "#10b981", "latest_date": "2024-05-01"},
			"AI": {"count": 7, "color": "#3b82f6"}
		}"##;
		let themes = themes_from(serde_json::from_str(raw).unwrap());
		assert_eq!(themes[0].name, "AI");
		assert_eq!(themes[0].count, 7);
		assert_eq!(themes[1].latest_date.as_deref(), Some("2024-05-01"));
	}

	#[test]
	fn insight_detail_tolerates_nulls() {
		let raw = r#"{
			"id": "x", "source_title": "X", "theme": "AI", "novelty_score": 0.7,
			"date_added": "2024-02-03T10:00:00", "source_url": "",
			"concepts": null, "tags": ["ml"], "content": "body", "filename": "x.md"
		}"#;
		let detail: InsightDetail = serde_json::from_str(raw).unwrap();
		assert!(detail.concepts.is_empty());
		assert_eq!(detail.tags, vec!["ml".to_string()]);
		assert_eq!(detail.html_content, None);
	}

	#[test]
	fn keyword_fallback_search() {
		let raw = r#"{"results": [{"id": "a", "label": "A", "theme": "AI", "score": null, "snippet": null}],
			"count": 1, "semantic": false}"#;
		let response: SearchResponse = serde_json::from_str(raw).unwrap();
		assert!(!response.semantic);
		assert_eq!(response.results[0].score, None);
	}
}
