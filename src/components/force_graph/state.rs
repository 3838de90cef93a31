use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use serde::Deserialize;

use super::scene::{
	ElementKey, Emphasis, FrameInfo, HoverRole, RadiusConfig, RadiusPolicy, RenderTarget, Shape,
	VisualElement, VisualFlags,
};
use super::simulation::{Simulation, Spring};
use super::types::{GraphSnapshot, InsightNode, LinkEdge, connection_counts};
use crate::config::{ExplorerConfig, ZoomConfig};
use crate::events::{EventTable, Evented};

/// Extra pick radius around a node, in world units.
pub const HIT_SLOP: f64 = 4.0;
/// Pointer travel in screen pixels that turns a press into a drag.
pub const CLICK_SLOP: f64 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

/// What happens to a node's pin when the user lets go of it.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DragRelease {
	/// Unpin and let the simulation move the node again.
	#[default]
	Release,
	/// Keep the node where it was dropped.
	SettleInPlace,
}

/// Events the engine reports upward.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
	NodeClicked(String),
	NodeHovered(Option<String>),
}

/// Pointer gesture state machine.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Interaction {
	#[default]
	Idle,
	/// Button down on a node; becomes a click or a drag.
	Pressed { id: String, start_x: f64, start_y: f64 },
	/// The dragged node's position belongs to this gesture alone.
	Dragging { id: String, grab_dx: f64, grab_dy: f64 },
	Panning {
		start_x: f64,
		start_y: f64,
		transform_start_x: f64,
		transform_start_y: f64,
	},
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<usize>,
	pub neighbors: HashSet<usize>,
	pub highlight_t: f64,
	pub prev_node: Option<usize>,
	pub prev_neighbors: HashSet<usize>,
	delay_t: f64,
}

pub struct GraphEngine {
	nodes: Vec<InsightNode>,
	index: HashMap<String, usize>,
	edges: Vec<LinkEdge>,
	springs: Vec<Spring>,
	radii: Vec<f64>,
	orphan_ids: Vec<String>,
	unresolved_links: Vec<String>,
	dropped_edges: usize,
	simulation: Simulation,
	radius: RadiusConfig,
	drag_release: DragRelease,
	zoom: ZoomConfig,
	pub transform: ViewTransform,
	interaction: Interaction,
	pub hover: HoverState,
	selection: Option<String>,
	theme_filter: Option<String>,
	search_highlight: Option<HashSet<String>>,
	width: f64,
	height: f64,
	flow_time: f64,
	dirty: bool,
	mounted: HashSet<ElementKey>,
	events: EventTable<GraphEvent>,
}

impl Evented for GraphEngine {
	type Event = GraphEvent;

	fn events(&mut self) -> &mut EventTable<GraphEvent> {
		&mut self.events
	}
}

impl GraphEngine {
	pub fn new(config: &ExplorerConfig, width: f64, height: f64) -> Self {
		Self {
			nodes: Vec::new(),
			index: HashMap::new(),
			edges: Vec::new(),
			springs: Vec::new(),
			radii: Vec::new(),
			orphan_ids: Vec::new(),
			unresolved_links: Vec::new(),
			dropped_edges: 0,
			simulation: Simulation::new(config.simulation.clone(), width, height),
			radius: config.radius.clone(),
			drag_release: config.drag_release,
			zoom: config.zoom.clone(),
			transform: ViewTransform::default(),
			interaction: Interaction::Idle,
			hover: HoverState::default(),
			selection: None,
			theme_filter: None,
			search_highlight: None,
			width,
			height,
			flow_time: 0.0,
			dirty: true,
			mounted: HashSet::new(),
			events: EventTable::default(),
		}
	}

	/// Replace the working node and edge set, keeping positions of known ids.
	pub fn ingest(&mut self, snapshot: GraphSnapshot) {
		let GraphSnapshot {
			nodes: incoming,
			edges,
			unresolved_links,
			..
		} = snapshot;

		let mut previous: HashMap<String, InsightNode> =
			self.nodes.drain(..).map(|n| (n.id.clone(), n)).collect();
		let mut nodes: Vec<InsightNode> = Vec::with_capacity(incoming.len());
		let mut index = HashMap::with_capacity(incoming.len());
		let mut carried = 0;

		for mut node in incoming {
			if index.contains_key(&node.id) {
				warn!("duplicate insight id {:?} in snapshot, keeping the first", node.id);
				continue;
			}
			match previous.remove(&node.id) {
				Some(old) => {
					node.x = old.x;
					node.y = old.y;
					node.vx = old.vx;
					node.vy = old.vy;
					node.fx = old.fx;
					node.fy = old.fy;
					carried += 1;
				}
				None => {
					let (x, y) = self.simulation.initial_position(nodes.len());
					node.x = x;
					node.y = y;
					node.vx = 0.0;
					node.vy = 0.0;
					node.fx = None;
					node.fy = None;
				}
			}
			index.insert(node.id.clone(), nodes.len());
			nodes.push(node);
		}

		let total_edges = edges.len();
		let kept: Vec<LinkEdge> = edges
			.into_iter()
			.filter(|e| index.contains_key(&e.source_id) && index.contains_key(&e.target_id))
			.collect();
		self.dropped_edges = total_edges - kept.len();
		if self.dropped_edges > 0 {
			warn!(
				"dropped {} of {} links with an endpoint outside the snapshot",
				self.dropped_edges, total_edges
			);
		}

		let counts: Vec<usize> = {
			let by_id = connection_counts(&nodes, &kept);
			nodes.iter().map(|n| by_id[n.id.as_str()]).collect()
		};
		for (node, count) in nodes.iter_mut().zip(&counts) {
			node.connection_count = *count;
		}

		let strength_max = self.simulation.params.link_strength_max;
		self.springs = kept
			.iter()
			.map(|e| Spring::new(index[&e.source_id], index[&e.target_id], &counts, strength_max))
			.collect();
		self.orphan_ids = nodes
			.iter()
			.filter(|n| n.connection_count == 0)
			.map(|n| n.id.clone())
			.collect();

		self.nodes = nodes;
		self.index = index;
		self.edges = kept;
		self.unresolved_links = unresolved_links;
		self.recompute_radii();

		let lost_drag = self
			.dragged_id()
			.is_some_and(|id| !self.index.contains_key(id));
		if lost_drag {
			debug!("dragged node left the graph, ending drag");
			self.interaction = Interaction::Idle;
			self.simulation.set_alpha_target(0.0);
		}
		// hover indices point into the old node vector
		if self.hover.node.take().is_some() {
			self.events.queue(GraphEvent::NodeHovered(None));
		}
		self.hover = HoverState::default();
		self.simulation.restart();
		self.dirty = true;

		info!(
			"ingested {} insights and {} links ({} carried over)",
			self.nodes.len(),
			self.edges.len(),
			carried
		);
		if !self.unresolved_links.is_empty() {
			info!(
				"{} wikilink targets do not resolve to an insight",
				self.unresolved_links.len()
			);
			debug!("unresolved wikilinks: {:?}", self.unresolved_links);
		}
	}

	fn recompute_radii(&mut self) {
		self.radii = self.nodes.iter().map(|n| self.radius.radius(n)).collect();
	}

	pub fn set_radius_policy(&mut self, policy: RadiusPolicy) {
		if self.radius.policy != policy {
			self.radius.policy = policy;
			self.recompute_radii();
			self.dirty = true;
		}
	}

	pub fn nodes(&self) -> &[InsightNode] {
		&self.nodes
	}

	pub fn node(&self, id: &str) -> Option<&InsightNode> {
		self.index.get(id).map(|&i| &self.nodes[i])
	}

	pub fn edges(&self) -> &[LinkEdge] {
		&self.edges
	}

	pub fn orphan_ids(&self) -> &[String] {
		&self.orphan_ids
	}

	pub fn unresolved_links(&self) -> &[String] {
		&self.unresolved_links
	}

	pub fn dropped_edges(&self) -> usize {
		self.dropped_edges
	}

	pub fn radius_of(&self, id: &str) -> Option<f64> {
		self.index.get(id).map(|&i| self.radii[i])
	}

	pub fn simulation(&self) -> &Simulation {
		&self.simulation
	}

	pub fn is_running(&self) -> bool {
		self.simulation.is_running()
	}

	pub fn interaction(&self) -> &Interaction {
		&self.interaction
	}

	pub fn size(&self) -> (f64, f64) {
		(self.width, self.height)
	}

	// ---- filter, highlight, selection ----

	/// Dim every node whose theme differs from `theme`; `None` clears dimming.
	pub fn set_theme_filter(&mut self, theme: Option<&str>) {
		let next = theme.map(str::to_owned);
		if self.theme_filter != next {
			self.theme_filter = next;
			self.dirty = true;
		}
	}

	pub fn clear_filter(&mut self) {
		self.set_theme_filter(None);
	}

	pub fn theme_filter(&self) -> Option<&str> {
		self.theme_filter.as_deref()
	}

	/// Emphasize `ids` and de-emphasize everything else; empty restores baseline.
	pub fn highlight_search_results(&mut self, ids: &[String]) {
		let next = if ids.is_empty() {
			None
		} else {
			Some(ids.iter().cloned().collect::<HashSet<_>>())
		};
		if self.search_highlight != next {
			self.search_highlight = next;
			self.dirty = true;
		}
	}

	pub fn has_search_highlight(&self) -> bool {
		self.search_highlight.is_some()
	}

	/// Set the selection without reporting it; used to follow the viewer.
	pub fn select(&mut self, id: Option<&str>) {
		let next = id.map(str::to_owned);
		if self.selection != next {
			self.selection = next;
			self.dirty = true;
		}
	}

	pub fn selection(&self) -> Option<&str> {
		self.selection.as_deref()
	}

	/// Select `id` and report the click upward.
	pub fn click_node(&mut self, id: &str) {
		if !self.index.contains_key(id) {
			return;
		}
		self.select(Some(id));
		self.events.queue(GraphEvent::NodeClicked(id.to_owned()));
	}

	fn node_flags(&self, idx: usize) -> VisualFlags {
		let node = &self.nodes[idx];
		VisualFlags {
			dimmed: self.theme_filter.as_ref().is_some_and(|t| node.theme != *t),
			emphasis: match &self.search_highlight {
				None => Emphasis::Baseline,
				Some(ids) if ids.contains(&node.id) => Emphasis::Emphasized,
				Some(_) => Emphasis::Deemphasized,
			},
			selected: self.selection.as_deref() == Some(node.id.as_str()),
			hover: if self.is_hovered(idx) {
				HoverRole::Hovered
			} else if self.has_active_highlight() && self.is_highlighted(idx) {
				HoverRole::Neighbor
			} else {
				HoverRole::None
			},
		}
	}

	fn edge_flags(&self, spring: &Spring) -> VisualFlags {
		let (s, t) = (&self.nodes[spring.source], &self.nodes[spring.target]);
		VisualFlags {
			dimmed: self
				.theme_filter
				.as_ref()
				.is_some_and(|theme| s.theme != *theme && t.theme != *theme),
			emphasis: match &self.search_highlight {
				None => Emphasis::Baseline,
				Some(ids) if ids.contains(&s.id) && ids.contains(&t.id) => Emphasis::Emphasized,
				Some(_) => Emphasis::Deemphasized,
			},
			selected: false,
			hover: if self.has_active_highlight()
				&& self.is_highlighted(spring.source)
				&& self.is_highlighted(spring.target)
			{
				HoverRole::Neighbor
			} else {
				HoverRole::None
			},
		}
	}

	// ---- rendering ----

	/// Every visual element for the current frame, in paint order.
	pub fn elements(&self) -> Vec<VisualElement> {
		let mut out = Vec::with_capacity(self.springs.len() + self.nodes.len() * 2);
		let mut ordinals: HashMap<(usize, usize), usize> = HashMap::new();

		for spring in &self.springs {
			let ordinal = ordinals.entry((spring.source, spring.target)).or_insert(0);
			let (s, t) = (&self.nodes[spring.source], &self.nodes[spring.target]);
			out.push(VisualElement {
				key: ElementKey::Edge {
					source: s.id.clone(),
					target: t.id.clone(),
					ordinal: *ordinal,
				},
				shape: Shape::Edge {
					x1: s.x,
					y1: s.y,
					x2: t.x,
					y2: t.y,
					source_radius: self.radii[spring.source],
					target_radius: self.radii[spring.target],
				},
				flags: self.edge_flags(spring),
			});
			*ordinal += 1;
		}

		for (idx, node) in self.nodes.iter().enumerate() {
			let flags = self.node_flags(idx);
			let radius = self.radii[idx];
			out.push(VisualElement {
				key: ElementKey::Node(node.id.clone()),
				shape: Shape::Node {
					x: node.x,
					y: node.y,
					radius,
					color: node.color.clone(),
				},
				flags,
			});
			out.push(VisualElement {
				key: ElementKey::Label(node.id.clone()),
				shape: Shape::Label {
					x: node.x + radius + 3.0,
					y: node.y + 3.0,
					text: node.label.clone(),
				},
				flags,
			});
		}
		out
	}

	pub fn frame_info(&self) -> FrameInfo {
		FrameInfo {
			transform: self.transform,
			width: self.width,
			height: self.height,
			hover_t: self.hover.highlight_t,
			flow_time: self.flow_time,
		}
	}

	/// Bring `target` in line with the model: mount, update, remove, present.
	pub fn sync(&mut self, target: &mut impl RenderTarget) {
		let elements = self.elements();
		let live: HashSet<ElementKey> = elements.iter().map(|e| e.key.clone()).collect();

		let stale: Vec<ElementKey> = self.mounted.difference(&live).cloned().collect();
		for key in &stale {
			target.remove(key);
			self.mounted.remove(key);
		}
		for element in &elements {
			if self.mounted.insert(element.key.clone()) {
				target.mount(element);
			} else {
				target.update(element);
			}
		}
		target.present(&self.frame_info());
	}

	/// Advance physics and animations; `true` when the frame must be redrawn.
	pub fn tick(&mut self, dt: f64) -> bool {
		let moving = self.simulation.tick(&mut self.nodes, &self.springs, &self.radii);
		let fading = self.advance_hover(dt);
		if moving || fading {
			self.flow_time += dt;
		}
		let redraw = moving || fading || self.dirty;
		self.dirty = false;
		redraw
	}

	fn advance_hover(&mut self, dt: f64) -> bool {
		let before = self.hover.highlight_t;
		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			}
			if self.hover.highlight_t > 0.99 {
				self.hover.highlight_t = 1.0;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
		self.hover.highlight_t != before || (self.hover.node.is_some() && self.hover.highlight_t < 1.0)
	}

	// ---- hover (neighbour highlight) ----

	pub fn set_hover(&mut self, node: Option<usize>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// keep the previous set around for the fade-out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let Some(idx) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			for spring in &self.springs {
				if spring.source == idx {
					self.hover.neighbors.insert(spring.target);
				} else if spring.target == idx {
					self.hover.neighbors.insert(spring.source);
				}
			}
		}
		self.dirty = true;
		let hovered = node.map(|i| self.nodes[i].id.clone());
		self.events.queue(GraphEvent::NodeHovered(hovered));
	}

	pub fn is_highlighted(&self, idx: usize) -> bool {
		self.hover.node == Some(idx)
			|| self.hover.neighbors.contains(&idx)
			|| self.hover.prev_node == Some(idx)
			|| self.hover.prev_neighbors.contains(&idx)
	}

	pub fn is_hovered(&self, idx: usize) -> bool {
		self.hover.node == Some(idx) || self.hover.prev_node == Some(idx)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	// ---- pointer ----

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Nearest node under a screen position.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<usize> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		self.nodes
			.iter()
			.enumerate()
			.filter_map(|(i, node)| {
				let dist = (node.x - gx).hypot(node.y - gy);
				(dist < self.radii[i] + HIT_SLOP).then_some((i, dist))
			})
			.min_by(|a, b| a.1.total_cmp(&b.1))
			.map(|(i, _)| i)
	}

	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		self.interaction = match self.node_at_position(sx, sy) {
			Some(idx) => Interaction::Pressed {
				id: self.nodes[idx].id.clone(),
				start_x: sx,
				start_y: sy,
			},
			None => Interaction::Panning {
				start_x: sx,
				start_y: sy,
				transform_start_x: self.transform.x,
				transform_start_y: self.transform.y,
			},
		};
	}

	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		match self.interaction.clone() {
			Interaction::Idle => {
				let hovered = self.node_at_position(sx, sy);
				self.set_hover(hovered);
			}
			Interaction::Pressed {
				id,
				start_x,
				start_y,
			} => {
				if (sx - start_x).hypot(sy - start_y) <= CLICK_SLOP {
					return;
				}
				let (px, py) = self.screen_to_graph(start_x, start_y);
				let grab = self.node(&id).map(|n| (n.x - px, n.y - py));
				if let Some((grab_dx, grab_dy)) = grab {
					if self.start_drag(&id) {
						self.interaction = Interaction::Dragging {
							id,
							grab_dx,
							grab_dy,
						};
						let (gx, gy) = self.screen_to_graph(sx, sy);
						self.drag_to(gx + grab_dx, gy + grab_dy);
					}
				}
			}
			Interaction::Dragging {
				grab_dx, grab_dy, ..
			} => {
				let (gx, gy) = self.screen_to_graph(sx, sy);
				self.drag_to(gx + grab_dx, gy + grab_dy);
			}
			Interaction::Panning {
				start_x,
				start_y,
				transform_start_x,
				transform_start_y,
			} => {
				self.transform.x = transform_start_x + (sx - start_x);
				self.transform.y = transform_start_y + (sy - start_y);
				self.dirty = true;
			}
		}
	}

	pub fn pointer_up(&mut self) {
		if self.dragged_id().is_some() {
			self.end_drag();
			return;
		}
		if let Interaction::Pressed { id, .. } = std::mem::take(&mut self.interaction) {
			self.click_node(&id);
		}
	}

	pub fn pointer_leave(&mut self) {
		if self.dragged_id().is_some() {
			self.end_drag();
		}
		self.interaction = Interaction::Idle;
		self.set_hover(None);
	}

	// ---- drag ----

	/// Pin `id` where it is and wake the simulation so neighbours react.
	pub fn start_drag(&mut self, id: &str) -> bool {
		let Some(&idx) = self.index.get(id) else {
			return false;
		};
		if self.dragged_id().is_some() {
			self.end_drag();
		}
		let node = &mut self.nodes[idx];
		node.fx = Some(node.x);
		node.fy = Some(node.y);
		self.interaction = Interaction::Dragging {
			id: id.to_owned(),
			grab_dx: 0.0,
			grab_dy: 0.0,
		};
		let target = self.simulation.params.drag_alpha_target;
		self.simulation.set_alpha_target(target);
		self.dirty = true;
		true
	}

	/// Move the dragged node's pin to graph coordinates.
	pub fn drag_to(&mut self, gx: f64, gy: f64) {
		let Some(&idx) = self.dragged_id().and_then(|id| self.index.get(id)) else {
			return;
		};
		let node = &mut self.nodes[idx];
		node.fx = Some(gx);
		node.fy = Some(gy);
		node.x = gx;
		node.y = gy;
		self.dirty = true;
	}

	pub fn end_drag(&mut self) {
		let Interaction::Dragging { id, .. } = std::mem::take(&mut self.interaction) else {
			return;
		};
		if self.drag_release == DragRelease::Release {
			if let Some(&idx) = self.index.get(&id) {
				self.nodes[idx].fx = None;
				self.nodes[idx].fy = None;
			}
		}
		self.simulation.set_alpha_target(0.0);
		self.dirty = true;
	}

	pub fn dragged_id(&self) -> Option<&str> {
		match &self.interaction {
			Interaction::Dragging { id, .. } => Some(id),
			_ => None,
		}
	}

	// ---- viewport ----

	/// Zoom by `factor` keeping the screen point `(sx, sy)` fixed.
	pub fn zoom_at(&mut self, factor: f64, sx: f64, sy: f64) {
		let new_k = (self.transform.k * factor).clamp(self.zoom.min, self.zoom.max);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
		self.dirty = true;
	}

	pub fn wheel(&mut self, sx: f64, sy: f64, delta_y: f64) {
		// horizontal scrolls report no vertical delta
		if delta_y == 0.0 {
			return;
		}
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		self.zoom_at(factor, sx, sy);
	}

	pub fn zoom_in(&mut self) {
		self.zoom_at(self.zoom.step, self.width / 2.0, self.height / 2.0);
	}

	pub fn zoom_out(&mut self) {
		self.zoom_at(1.0 / self.zoom.step, self.width / 2.0, self.height / 2.0);
	}

	pub fn reset_view(&mut self) {
		self.transform = ViewTransform::default();
		self.dirty = true;
	}

	/// Recenter on a new viewport size. Same-size calls are ignored.
	pub fn resize(&mut self, width: f64, height: f64) -> bool {
		if width == self.width && height == self.height {
			return false;
		}
		self.width = width;
		self.height = height;
		self.simulation.set_center(width / 2.0, height / 2.0);
		let alpha = self.simulation.params.resize_alpha;
		self.simulation.reheat(alpha);
		self.dirty = true;
		true
	}
}
