use std::collections::{HashMap, HashSet};

/// One insight as the graph engine sees it.
///
/// `x`, `y`, `vx`, `vy` belong to the simulation; `fx`, `fy` pin the node
/// while it is dragged. Highlight and dim state are never stored here.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InsightNode {
	pub id: String,
	pub label: String,
	pub theme: String,
	pub color: String,
	pub novelty_score: f64,
	pub connection_count: usize,
	pub x: f64,
	pub y: f64,
	pub vx: f64,
	pub vy: f64,
	pub fx: Option<f64>,
	pub fy: Option<f64>,
}

impl InsightNode {
	pub fn new(
		id: impl Into<String>,
		label: impl Into<String>,
		theme: impl Into<String>,
		color: impl Into<String>,
		novelty_score: f64,
	) -> Self {
		Self {
			id: id.into(),
			label: label.into(),
			theme: theme.into(),
			color: color.into(),
			novelty_score: novelty_score.clamp(0.0, 1.0),
			..Self::default()
		}
	}

	pub fn is_pinned(&self) -> bool {
		self.fx.is_some() && self.fy.is_some()
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkEdge {
	pub source_id: String,
	pub target_id: String,
	pub display_label: String,
	pub kind: String,
}

impl LinkEdge {
	pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
		let target = target.into();
		Self {
			source_id: source.into(),
			display_label: target.clone(),
			target_id: target,
			kind: "wikilink".to_string(),
		}
	}
}

/// Immutable input to one render cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphSnapshot {
	pub nodes: Vec<InsightNode>,
	pub edges: Vec<LinkEdge>,
	/// Nodes with no connection in `edges`, in node order.
	pub orphan_ids: Vec<String>,
	/// Wikilink targets the backend could not resolve to any insight.
	pub unresolved_links: Vec<String>,
}

impl GraphSnapshot {
	pub fn new(nodes: Vec<InsightNode>, edges: Vec<LinkEdge>) -> Self {
		let counts = connection_counts(&nodes, &edges);
		let orphan_ids = nodes
			.iter()
			.filter(|n| counts.get(n.id.as_str()).copied().unwrap_or(0) == 0)
			.map(|n| n.id.clone())
			.collect();
		Self {
			nodes,
			edges,
			orphan_ids,
			unresolved_links: Vec::new(),
		}
	}

	pub fn with_unresolved_links(mut self, links: Vec<String>) -> Self {
		self.unresolved_links = links;
		self
	}
}

/// Edges per node id. Edges with an endpoint outside `nodes` are ignored,
/// matching the engine's drop policy for dangling edges. A self-loop counts once.
pub fn connection_counts<'a>(
	nodes: &'a [InsightNode],
	edges: &[LinkEdge],
) -> HashMap<&'a str, usize> {
	let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
	let mut counts: HashMap<&'a str, usize> =
		nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
	for edge in edges {
		if !known.contains(edge.source_id.as_str()) || !known.contains(edge.target_id.as_str()) {
			continue;
		}
		if let Some(c) = counts.get_mut(edge.source_id.as_str()) {
			*c += 1;
		}
		if edge.target_id != edge.source_id {
			if let Some(c) = counts.get_mut(edge.target_id.as_str()) {
				*c += 1;
			}
		}
	}
	counts
}
