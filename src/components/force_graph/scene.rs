//! Visual encodings and the render-target seam.
//!
//! The engine turns its model into [`VisualElement`]s every frame; a
//! [`RenderTarget`] only has to keep a retained set of them and draw.

use serde::Deserialize;

use super::state::ViewTransform;
use super::types::InsightNode;

/// Which node attribute drives the radius.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RadiusPolicy {
	/// Better-connected insights are drawn larger.
	#[default]
	Connections,
	/// Legacy encoding: more novel insights are drawn larger.
	Novelty,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RadiusConfig {
	pub policy: RadiusPolicy,
	pub base: f64,
	/// Growth factor applied to `sqrt(connection_count)`.
	pub per_connection: f64,
	/// Growth at novelty 1.0 under [`RadiusPolicy::Novelty`].
	pub novelty_span: f64,
	pub min: f64,
	pub max: f64,
}

impl Default for RadiusConfig {
	fn default() -> Self {
		Self {
			policy: RadiusPolicy::Connections,
			base: 4.0,
			per_connection: 2.0,
			novelty_span: 8.0,
			min: 4.0,
			max: 16.0,
		}
	}
}

impl RadiusConfig {
	pub fn radius(&self, node: &InsightNode) -> f64 {
		let growth = match self.policy {
			RadiusPolicy::Connections => self.per_connection * (node.connection_count as f64).sqrt(),
			RadiusPolicy::Novelty => self.novelty_span * node.novelty_score.clamp(0.0, 1.0),
		};
		(self.base + growth).clamp(self.min, self.max)
	}
}

/// Stable identity of a visual element across frames.
///
/// Variant order is paint order: edges under nodes under labels.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKey {
	Edge {
		source: String,
		target: String,
		/// Distinguishes parallel edges between the same pair.
		ordinal: usize,
	},
	Node(String),
	Label(String),
}

/// Emphasis from the search highlight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Emphasis {
	#[default]
	Baseline,
	Emphasized,
	Deemphasized,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HoverRole {
	#[default]
	None,
	Hovered,
	Neighbor,
}

/// View-level state of one element, recomputed every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VisualFlags {
	pub dimmed: bool,
	pub emphasis: Emphasis,
	pub selected: bool,
	pub hover: HoverRole,
}

impl VisualFlags {
	/// Search emphasis wins over the theme dim.
	pub fn opacity(&self) -> f64 {
		match self.emphasis {
			Emphasis::Emphasized => 1.0,
			Emphasis::Deemphasized => 0.12,
			Emphasis::Baseline if self.dimmed => 0.15,
			Emphasis::Baseline => 0.9,
		}
	}

	pub fn is_baseline(&self) -> bool {
		!self.dimmed && self.emphasis == Emphasis::Baseline
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
	Node {
		x: f64,
		y: f64,
		radius: f64,
		color: String,
	},
	Edge {
		x1: f64,
		y1: f64,
		x2: f64,
		y2: f64,
		/// Radius of the target node, so arrows stop at its rim.
		target_radius: f64,
		source_radius: f64,
	},
	Label {
		x: f64,
		y: f64,
		text: String,
	},
}

#[derive(Clone, Debug, PartialEq)]
pub struct VisualElement {
	pub key: ElementKey,
	pub shape: Shape,
	pub flags: VisualFlags,
}

/// Frame-wide values a target needs to draw.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameInfo {
	pub transform: ViewTransform,
	pub width: f64,
	pub height: f64,
	/// Eased hover highlight strength, 0 to 1.
	pub hover_t: f64,
	pub flow_time: f64,
}

/// Minimal retained-mode drawing surface.
pub trait RenderTarget {
	fn mount(&mut self, element: &VisualElement);
	fn update(&mut self, element: &VisualElement);
	fn remove(&mut self, key: &ElementKey);
	/// Draw everything currently mounted.
	fn present(&mut self, frame: &FrameInfo);
}

#[cfg(test)]
mod tests {
	use super::*;

	fn with_connections(count: usize, novelty: f64) -> InsightNode {
		let mut node = InsightNode::new("n", "n", "t", "#000", novelty);
		node.connection_count = count;
		node
	}

	#[test]
	fn radius_is_monotone_and_bounded() {
		let config = RadiusConfig::default();
		let mut previous = 0.0;
		for count in 0..200 {
			let r = config.radius(&with_connections(count, 0.5));
			assert!(r >= previous, "radius shrank at {count}");
			assert!((config.min..=config.max).contains(&r));
			previous = r;
		}
		assert_eq!(previous, config.max);
	}

	#[test]
	fn novelty_policy_ignores_connections() {
		let config = RadiusConfig {
			policy: RadiusPolicy::Novelty,
			..RadiusConfig::default()
		};
		let sparse = config.radius(&with_connections(0, 0.9));
		let dense = config.radius(&with_connections(50, 0.9));
		assert_eq!(sparse, dense);
		assert!(config.radius(&with_connections(0, 0.1)) < sparse);
	}

	#[test]
	fn emphasis_dominates_dim() {
		let highlighted_but_dimmed = VisualFlags {
			dimmed: true,
			emphasis: Emphasis::Emphasized,
			..VisualFlags::default()
		};
		let dimmed = VisualFlags {
			dimmed: true,
			..VisualFlags::default()
		};
		assert!(highlighted_but_dimmed.opacity() > VisualFlags::default().opacity());
		assert!(dimmed.opacity() < VisualFlags::default().opacity());
	}

	#[test]
	fn paint_order_follows_variants() {
		let edge = ElementKey::Edge {
			source: "z".into(),
			target: "z".into(),
			ordinal: 0,
		};
		assert!(edge < ElementKey::Node("a".into()));
		assert!(ElementKey::Node("z".into()) < ElementKey::Label("a".into()));
	}
}
