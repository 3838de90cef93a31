//! Force simulation with a decaying energy scalar (`alpha`).
//!
//! Each tick: link springs, many-body repulsion, integration with velocity
//! decay, centering, then positional collision resolution.

use std::f64::consts::PI;

use serde::Deserialize;

use super::types::InsightNode;

/// Tunables for the force model.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationParameters {
	/// Rest length of a link spring.
	pub link_distance: f64,
	/// Upper bound for a single link's spring strength.
	pub link_strength_max: f64,
	/// Many-body strength; negative repels.
	pub charge_strength: f64,
	/// Pairs farther apart than this do not interact.
	pub charge_max_distance: f64,
	pub charge_min_distance: f64,
	/// Fraction of the layout's offset from the center removed per tick.
	pub center_strength: f64,
	pub collision_padding: f64,
	pub velocity_decay: f64,
	pub alpha_min: f64,
	pub alpha_decay: f64,
	/// Energy target while a node is being dragged.
	pub drag_alpha_target: f64,
	/// Energy injected by a viewport resize.
	pub resize_alpha: f64,
}

impl Default for SimulationParameters {
	fn default() -> Self {
		let alpha_min: f64 = 0.001;
		Self {
			link_distance: 60.0,
			link_strength_max: 1.0,
			charge_strength: -150.0,
			charge_max_distance: 400.0,
			charge_min_distance: 1.0,
			center_strength: 1.0,
			collision_padding: 2.0,
			velocity_decay: 0.4,
			alpha_min,
			// reaches alpha_min from 1.0 in ~300 ticks
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
			drag_alpha_target: 0.3,
			resize_alpha: 0.3,
		}
	}
}

/// A link resolved to node indices, with its precomputed spring strength.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spring {
	pub source: usize,
	pub target: usize,
	pub strength: f64,
	/// Share of the correction applied to the target (by degree).
	pub bias: f64,
}

impl Spring {
	pub fn new(source: usize, target: usize, degree: &[usize], strength_max: f64) -> Self {
		let (ds, dt) = (degree[source].max(1) as f64, degree[target].max(1) as f64);
		Self {
			source,
			target,
			strength: strength_max.min(1.0 / ds.min(dt)),
			bias: ds / (ds + dt),
		}
	}
}

pub struct Simulation {
	pub params: SimulationParameters,
	alpha: f64,
	alpha_target: f64,
	center: (f64, f64),
}

impl Simulation {
	pub fn new(params: SimulationParameters, width: f64, height: f64) -> Self {
		Self {
			params,
			alpha: 0.0,
			alpha_target: 0.0,
			center: (width / 2.0, height / 2.0),
		}
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn center(&self) -> (f64, f64) {
		self.center
	}

	pub fn is_running(&self) -> bool {
		self.alpha >= self.params.alpha_min
	}

	/// Full restart, used after ingest.
	pub fn restart(&mut self) {
		self.alpha = 1.0;
	}

	/// Raise the energy to at least `alpha` without lowering it.
	pub fn reheat(&mut self, alpha: f64) {
		self.alpha = self.alpha.max(alpha);
	}

	pub fn set_alpha_target(&mut self, target: f64) {
		self.alpha_target = target;
		self.reheat(target);
	}

	pub fn set_center(&mut self, x: f64, y: f64) {
		self.center = (x, y);
	}

	/// Place unpositioned nodes on a phyllotaxis spiral around the center.
	pub fn initial_position(&self, slot: usize) -> (f64, f64) {
		let radius = 10.0 * (0.5 + slot as f64).sqrt();
		let angle = slot as f64 * PI * (3.0 - 5f64.sqrt());
		(
			self.center.0 + radius * angle.cos(),
			self.center.1 + radius * angle.sin(),
		)
	}

	/// Advance one step. Returns `false` once the layout has settled.
	pub fn tick(&mut self, nodes: &mut [InsightNode], springs: &[Spring], radii: &[f64]) -> bool {
		if !self.is_running() {
			return false;
		}
		self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;

		self.apply_springs(nodes, springs);
		self.apply_charge(nodes);
		self.integrate(nodes);
		self.apply_centering(nodes);
		self.apply_collisions(nodes, radii);
		true
	}

	fn apply_springs(&self, nodes: &mut [InsightNode], springs: &[Spring]) {
		for spring in springs {
			let (s, t) = (spring.source, spring.target);
			if s == t {
				continue;
			}
			let mut dx = nodes[t].x + nodes[t].vx - nodes[s].x - nodes[s].vx;
			let mut dy = nodes[t].y + nodes[t].vy - nodes[s].y - nodes[s].vy;
			if dx == 0.0 && dy == 0.0 {
				dx = jiggle(s + t);
			}
			let len = (dx * dx + dy * dy).sqrt();
			let k = (len - self.params.link_distance) / len * self.alpha * spring.strength;
			dx *= k;
			dy *= k;
			nodes[t].vx -= dx * spring.bias;
			nodes[t].vy -= dy * spring.bias;
			nodes[s].vx += dx * (1.0 - spring.bias);
			nodes[s].vy += dy * (1.0 - spring.bias);
		}
	}

	fn apply_charge(&self, nodes: &mut [InsightNode]) {
		let max_d2 = self.params.charge_max_distance.powi(2);
		let min_d2 = self.params.charge_min_distance.powi(2);
		let strength = self.params.charge_strength * self.alpha;
		if strength == 0.0 {
			return;
		}
		for i in 0..nodes.len() {
			for j in (i + 1)..nodes.len() {
				let mut dx = nodes[j].x - nodes[i].x;
				let dy = nodes[j].y - nodes[i].y;
				let mut d2 = dx * dx + dy * dy;
				if d2 >= max_d2 {
					continue;
				}
				if d2 == 0.0 {
					dx = jiggle(i * 31 + j);
					d2 = dx * dx;
				}
				// magnitude falls off as 1 / distance
				let w = strength / d2.max(min_d2);
				nodes[i].vx += dx * w;
				nodes[i].vy += dy * w;
				nodes[j].vx -= dx * w;
				nodes[j].vy -= dy * w;
			}
		}
	}

	fn integrate(&self, nodes: &mut [InsightNode]) {
		let keep = 1.0 - self.params.velocity_decay;
		for node in nodes.iter_mut() {
			if let (Some(fx), Some(fy)) = (node.fx, node.fy) {
				node.x = fx;
				node.y = fy;
				node.vx = 0.0;
				node.vy = 0.0;
				continue;
			}
			node.vx *= keep;
			node.vy *= keep;
			node.x += node.vx;
			node.y += node.vy;
		}
	}

	fn apply_centering(&self, nodes: &mut [InsightNode]) {
		if nodes.is_empty() || self.params.center_strength == 0.0 {
			return;
		}
		let n = nodes.len() as f64;
		let (sx, sy) = nodes.iter().fold((0.0, 0.0), |(sx, sy), n| (sx + n.x, sy + n.y));
		let shift_x = (sx / n - self.center.0) * self.params.center_strength;
		let shift_y = (sy / n - self.center.1) * self.params.center_strength;
		for node in nodes.iter_mut().filter(|n| !n.is_pinned()) {
			node.x -= shift_x;
			node.y -= shift_y;
		}
	}

	fn apply_collisions(&self, nodes: &mut [InsightNode], radii: &[f64]) {
		for i in 0..nodes.len() {
			for j in (i + 1)..nodes.len() {
				let (pin_i, pin_j) = (nodes[i].is_pinned(), nodes[j].is_pinned());
				if pin_i && pin_j {
					continue;
				}
				let reach = radii[i] + radii[j] + self.params.collision_padding;
				let mut dx = nodes[j].x - nodes[i].x;
				let dy = nodes[j].y - nodes[i].y;
				let mut d2 = dx * dx + dy * dy;
				if d2 >= reach * reach {
					continue;
				}
				let coincident = d2 == 0.0;
				if coincident {
					dx = jiggle(i * 17 + j);
					d2 = dx * dx;
				}
				let dist = d2.sqrt();
				let (ux, uy) = (dx / dist, dy / dist);
				let overlap = if coincident { reach } else { reach - dist };
				let (share_i, share_j) = match (pin_i, pin_j) {
					(true, false) => (0.0, 1.0),
					(false, true) => (1.0, 0.0),
					_ => (0.5, 0.5),
				};
				nodes[i].x -= ux * overlap * share_i;
				nodes[i].y -= uy * overlap * share_i;
				nodes[j].x += ux * overlap * share_j;
				nodes[j].y += uy * overlap * share_j;
			}
		}
	}
}

/// Tiny, never-zero, deterministic offset for coincident points.
fn jiggle(seed: usize) -> f64 {
	((seed % 13) as f64 - 6.5) * 1e-6
}

#[cfg(test)]
mod tests {
	use super::*;

	fn at(id: &str, x: f64, y: f64) -> InsightNode {
		let mut node = InsightNode::new(id, id, "t", "#000", 0.5);
		node.x = x;
		node.y = y;
		node
	}

	fn quiet() -> SimulationParameters {
		SimulationParameters {
			charge_strength: 0.0,
			center_strength: 0.0,
			..SimulationParameters::default()
		}
	}

	#[test]
	fn settles_and_stops() {
		let mut sim = Simulation::new(SimulationParameters::default(), 400.0, 300.0);
		let mut nodes = vec![at("a", 190.0, 150.0), at("b", 210.0, 150.0)];
		let degree = [1, 1];
		let springs = [Spring::new(0, 1, &degree, 1.0)];
		sim.restart();
		let mut ticks = 0;
		while sim.tick(&mut nodes, &springs, &[5.0, 5.0]) {
			ticks += 1;
			assert!(ticks < 1000, "simulation never settled");
		}
		assert!(!sim.is_running());
		assert!(ticks > 200);
	}

	#[test]
	fn spring_pulls_toward_rest_length() {
		let mut sim = Simulation::new(quiet(), 0.0, 0.0);
		let mut nodes = vec![at("a", 0.0, 0.0), at("b", 300.0, 0.0)];
		let springs = [Spring::new(0, 1, &[1, 1], 1.0)];
		sim.restart();
		for _ in 0..300 {
			sim.tick(&mut nodes, &springs, &[5.0, 5.0]);
		}
		let dist = (nodes[1].x - nodes[0].x).abs();
		assert!((dist - 60.0).abs() < 5.0, "distance {dist}");
	}

	#[test]
	fn repulsion_ignores_distant_pairs() {
		let params = SimulationParameters {
			center_strength: 0.0,
			charge_max_distance: 100.0,
			..SimulationParameters::default()
		};
		let mut sim = Simulation::new(params, 0.0, 0.0);
		let mut nodes = vec![at("a", 0.0, 0.0), at("b", 500.0, 0.0)];
		sim.restart();
		sim.tick(&mut nodes, &[], &[5.0, 5.0]);
		assert_eq!(nodes[0].x, 0.0);
		assert_eq!(nodes[1].x, 500.0);
	}

	#[test]
	fn collision_separates_coincident_nodes() {
		let mut sim = Simulation::new(quiet(), 0.0, 0.0);
		let mut nodes = vec![at("a", 50.0, 50.0), at("b", 50.0, 50.0)];
		sim.restart();
		sim.tick(&mut nodes, &[], &[6.0, 4.0]);
		let dist = ((nodes[1].x - nodes[0].x).powi(2) + (nodes[1].y - nodes[0].y).powi(2)).sqrt();
		assert!(dist >= 12.0 - 1e-9, "distance {dist}");
	}

	#[test]
	fn pinned_node_holds_its_pin() {
		let mut sim = Simulation::new(SimulationParameters::default(), 400.0, 400.0);
		let mut nodes = vec![at("a", 10.0, 10.0), at("b", 12.0, 10.0)];
		nodes[0].fx = Some(10.0);
		nodes[0].fy = Some(10.0);
		let springs = [Spring::new(0, 1, &[1, 1], 1.0)];
		sim.restart();
		for _ in 0..50 {
			sim.tick(&mut nodes, &springs, &[5.0, 5.0]);
		}
		assert_eq!((nodes[0].x, nodes[0].y), (10.0, 10.0));
	}

	#[test]
	fn centering_pulls_layout_to_viewport_center() {
		let params = SimulationParameters {
			charge_strength: 0.0,
			..SimulationParameters::default()
		};
		let mut sim = Simulation::new(params, 200.0, 200.0);
		let mut nodes = vec![at("a", 0.0, 0.0), at("b", 40.0, 0.0)];
		sim.restart();
		sim.tick(&mut nodes, &[], &[5.0, 5.0]);
		let mean_x = (nodes[0].x + nodes[1].x) / 2.0;
		let mean_y = (nodes[0].y + nodes[1].y) / 2.0;
		assert!((mean_x - 100.0).abs() < 1e-9);
		assert!((mean_y - 100.0).abs() < 1e-9);
	}

	#[test]
	fn drag_target_keeps_energy_up() {
		let mut sim = Simulation::new(SimulationParameters::default(), 100.0, 100.0);
		let mut nodes = vec![at("a", 50.0, 50.0)];
		sim.set_alpha_target(0.3);
		for _ in 0..2000 {
			sim.tick(&mut nodes, &[], &[5.0]);
		}
		assert!(sim.is_running());
		sim.set_alpha_target(0.0);
		let mut guard = 0;
		while sim.tick(&mut nodes, &[], &[5.0]) {
			guard += 1;
			assert!(guard < 1000);
		}
	}

	#[test]
	fn spring_strength_is_bounded() {
		let spring = Spring::new(0, 1, &[1, 1], 0.7);
		assert_eq!(spring.strength, 0.7);
		let busy = Spring::new(0, 1, &[4, 8], 1.0);
		assert_eq!(busy.strength, 0.25);
		assert!((busy.bias - 4.0 / 12.0).abs() < 1e-12);
	}
}
