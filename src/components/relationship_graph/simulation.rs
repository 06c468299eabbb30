use std::collections::HashMap;

use super::config::LayoutParameters;
use super::geometry::Point;
use super::store::GraphStore;
use super::types::{GraphLink, GraphNode, NodeId};

/// Combined communication weight of a link in both directions. Meaningful
/// pulses count ten times as much as regular ones.
pub fn communication_weight(link: &GraphLink) -> f64 {
	let (forward, reverse) = (&link.source_to_target, &link.target_to_source);
	forward.regular()
		+ reverse.regular()
		+ forward.meaningful() * 10.0
		+ reverse.meaningful() * 10.0
}

/// Rest length of a link for a given communication weight: busy pairs sit
/// close together, silent pairs are pushed far apart.
pub fn link_distance(total: f64) -> f64 {
	if total <= 0.0 {
		500.0
	} else if total < 10.0 {
		300.0 - total * 5.0
	} else if total < 40.0 {
		250.0 - (total - 10.0) * 4.0
	} else {
		(130.0 - total.powf(1.2) / 10.0).max(30.0)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
	/// Positions were updated and the layout is still warm.
	Moved,
	/// Positions were updated and the layout just cooled below `alpha_min`.
	Settled,
	/// The simulation is stopped; nothing moved.
	Idle,
}

#[derive(Clone, Debug)]
struct Spring {
	source: usize,
	target: usize,
	distance: f64,
	bias: f64,
}

/// Same generator d3 uses for its jiggle, so coincident nodes separate the same way every run.
#[derive(Clone, Debug)]
struct Lcg(u32);

impl Lcg {
	fn next(&mut self) -> f64 {
		self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
		self.0 as f64 / 4_294_967_296.0
	}

	fn jiggle(&mut self) -> f64 {
		(self.next() - 0.5) * 1e-6
	}
}

pub struct Simulation {
	params: LayoutParameters,
	alpha: f64,
	alpha_target: f64,
	running: bool,
	center: Point,
	ids: Vec<NodeId>,
	velocities: Vec<Point>,
	springs: Vec<Spring>,
	random: Lcg,
}

impl Simulation {
	pub fn new(params: LayoutParameters, store: &GraphStore, center: Point) -> Self {
		let mut simulation = Self {
			params,
			alpha: 1.0,
			alpha_target: 0.0,
			running: true,
			center,
			ids: Vec::new(),
			velocities: Vec::new(),
			springs: Vec::new(),
			random: Lcg(1),
		};
		simulation.bind(store);
		simulation
	}

	/// Re-reads the store layout after its collections were replaced. Velocities
	/// follow their node ids.
	pub fn bind(&mut self, store: &GraphStore) {
		let previous: HashMap<NodeId, Point> = self
			.ids
			.iter()
			.copied()
			.zip(self.velocities.iter().copied())
			.collect();
		self.ids = store.nodes().iter().map(|node| node.id).collect();
		self.velocities = self
			.ids
			.iter()
			.map(|id| previous.get(id).copied().unwrap_or_default())
			.collect();
		self.springs = build_springs(store);
	}

	/// Full restart after membership changed.
	pub fn restart(&mut self, store: &GraphStore) {
		self.bind(store);
		self.alpha = 1.0;
		self.running = true;
	}

	/// Link weights changed but nobody came or went: re-derive rest lengths
	/// and warm the layout up enough for them to take effect.
	pub fn reweight(&mut self, store: &GraphStore) {
		self.bind(store);
		self.alpha = self.alpha.max(self.params.reweight_alpha);
		self.running = true;
	}

	#[cfg(test)]
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	#[cfg(test)]
	pub fn is_running(&self) -> bool {
		self.running
	}

	pub fn stop(&mut self) {
		self.running = false;
	}

	pub fn set_center(&mut self, center: Point) {
		self.center = center;
	}

	/// Pins a node at `point` for the length of a drag and keeps the layout warm
	/// so its neighbours follow.
	pub fn pin(&mut self, store: &mut GraphStore, id: NodeId, point: Point) {
		let Some(node) = store.node_mut(id) else {
			return;
		};
		node.fixed_x = Some(point.x);
		node.fixed_y = Some(point.y);
		self.alpha_target = self.params.drag_alpha_target;
		self.running = true;
	}

	pub fn release(&mut self, store: &mut GraphStore, id: NodeId) {
		if let Some(node) = store.node_mut(id) {
			node.fixed_x = None;
			node.fixed_y = None;
		}
		self.alpha_target = 0.0;
	}

	/// Advances the layout by one tick, writing new positions into `store`.
	pub fn step(&mut self, store: &mut GraphStore) -> Tick {
		if !self.running {
			return Tick::Idle;
		}
		if self.velocities.len() != store.len() {
			self.bind(store);
		}

		self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;
		let alpha = self.alpha;

		let Self {
			params,
			center,
			velocities,
			springs,
			random,
			..
		} = self;

		apply_charge(store.nodes(), velocities, random, params.charge_strength * alpha);
		apply_collision(store.nodes(), velocities, random, params.collide_radius);
		apply_center(store.nodes_mut(), *center);
		apply_links(store.nodes(), velocities, springs, random, alpha * params.link_strength);
		integrate(store.nodes_mut(), velocities, params.velocity_decay);

		if self.alpha < self.params.alpha_min {
			self.running = false;
			Tick::Settled
		} else {
			Tick::Moved
		}
	}
}

fn build_springs(store: &GraphStore) -> Vec<Spring> {
	let mut degree = vec![0usize; store.len()];
	let resolved: Vec<(usize, usize, &GraphLink)> = store
		.links()
		.iter()
		.filter_map(|link| Some((store.slot(link.source)?, store.slot(link.target)?, link)))
		.collect();
	for &(source, target, _) in &resolved {
		degree[source] += 1;
		degree[target] += 1;
	}
	resolved
		.into_iter()
		.map(|(source, target, link)| Spring {
			source,
			target,
			distance: link_distance(communication_weight(link)),
			bias: degree[source] as f64 / (degree[source] + degree[target]) as f64,
		})
		.collect()
}

fn apply_charge(nodes: &[GraphNode], velocities: &mut [Point], random: &mut Lcg, strength: f64) {
	for i in 0..nodes.len() {
		for j in 0..nodes.len() {
			if i == j {
				continue;
			}
			let (mut dx, mut dy) = (nodes[j].x - nodes[i].x, nodes[j].y - nodes[i].y);
			let mut l = dx * dx + dy * dy;
			if dx == 0.0 {
				dx = random.jiggle();
				l += dx * dx;
			}
			if dy == 0.0 {
				dy = random.jiggle();
				l += dy * dy;
			}
			if l == 0.0 {
				continue;
			}
			if l < 1.0 {
				l = l.sqrt();
			}
			velocities[i].x += dx * strength / l;
			velocities[i].y += dy * strength / l;
		}
	}
}

fn apply_collision(nodes: &[GraphNode], velocities: &mut [Point], random: &mut Lcg, radius: f64) {
	let reach = radius * 2.0;
	for i in 0..nodes.len() {
		let (xi, yi) = (nodes[i].x + velocities[i].x, nodes[i].y + velocities[i].y);
		for j in (i + 1)..nodes.len() {
			let mut dx = xi - nodes[j].x - velocities[j].x;
			let mut dy = yi - nodes[j].y - velocities[j].y;
			let mut l = dx * dx + dy * dy;
			if l >= reach * reach {
				continue;
			}
			if dx == 0.0 {
				dx = random.jiggle();
				l += dx * dx;
			}
			if dy == 0.0 {
				dy = random.jiggle();
				l += dy * dy;
			}
			let distance = l.sqrt();
			let push = (reach - distance) / distance;
			dx *= push;
			dy *= push;
			// Equal radii share the correction evenly.
			velocities[i].x += dx * 0.5;
			velocities[i].y += dy * 0.5;
			velocities[j].x -= dx * 0.5;
			velocities[j].y -= dy * 0.5;
		}
	}
}

fn apply_center(nodes: &mut [GraphNode], center: Point) {
	if nodes.is_empty() {
		return;
	}
	let n = nodes.len() as f64;
	let mean_x = nodes.iter().map(|node| node.x).sum::<f64>() / n;
	let mean_y = nodes.iter().map(|node| node.y).sum::<f64>() / n;
	let (shift_x, shift_y) = (mean_x - center.x, mean_y - center.y);
	for node in nodes {
		node.x -= shift_x;
		node.y -= shift_y;
	}
}

fn apply_links(
	nodes: &[GraphNode],
	velocities: &mut [Point],
	springs: &[Spring],
	random: &mut Lcg,
	strength: f64,
) {
	for spring in springs {
		let (s, t) = (spring.source, spring.target);
		let mut dx = nodes[t].x + velocities[t].x - nodes[s].x - velocities[s].x;
		let mut dy = nodes[t].y + velocities[t].y - nodes[s].y - velocities[s].y;
		if dx == 0.0 {
			dx = random.jiggle();
		}
		if dy == 0.0 {
			dy = random.jiggle();
		}
		let l = (dx * dx + dy * dy).sqrt();
		let k = (l - spring.distance) / l * strength;
		dx *= k;
		dy *= k;
		velocities[t].x -= dx * spring.bias;
		velocities[t].y -= dy * spring.bias;
		velocities[s].x += dx * (1.0 - spring.bias);
		velocities[s].y += dy * (1.0 - spring.bias);
	}
}

fn integrate(nodes: &mut [GraphNode], velocities: &mut [Point], decay: f64) {
	for (node, velocity) in nodes.iter_mut().zip(velocities.iter_mut()) {
		match node.fixed_x {
			Some(fx) => {
				node.x = fx;
				velocity.x = 0.0;
			}
			None => {
				velocity.x *= decay;
				node.x += velocity.x;
			}
		}
		match node.fixed_y {
			Some(fy) => {
				node.y = fy;
				velocity.y = 0.0;
			}
			None => {
				velocity.y *= decay;
				node.y += velocity.y;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::relationship_graph::types::{DirectionalRate, GraphData, GraphLink};

	fn close(a: f64, b: f64, eps: f64) -> bool {
		(a - b).abs() < eps
	}

	fn distance(store: &GraphStore, a: NodeId, b: NodeId) -> f64 {
		store.position(a).unwrap().distance_to(store.position(b).unwrap())
	}

	fn pair(link: Option<GraphLink>, gap: f64) -> GraphStore {
		GraphStore::new(&GraphData {
			nodes: vec![
				GraphNode::new(1, "a", 400.0 - gap / 2.0, 300.0),
				GraphNode::new(2, "b", 400.0 + gap / 2.0, 300.0),
			],
			links: link.into_iter().collect(),
		})
	}

	fn run_until_settled(simulation: &mut Simulation, store: &mut GraphStore) -> usize {
		for steps in 1..=1000 {
			if simulation.step(store) == Tick::Settled {
				return steps;
			}
		}
		panic!("layout never settled");
	}

	#[test]
	fn distance_table() {
		assert_eq!(link_distance(0.0), 500.0);
		assert_eq!(link_distance(5.0), 275.0);
		assert_eq!(link_distance(10.0), 250.0);
		assert_eq!(link_distance(20.0), 210.0);
		assert!(close(link_distance(100.0), 130.0 - 100f64.powf(1.2) / 10.0, 1e-9));
		assert!(close(link_distance(100.0), 104.88, 0.01));
		assert_eq!(link_distance(10_000.0), 30.0);
	}

	#[test]
	fn meaningful_pulses_weigh_ten_times() {
		let link = GraphLink::new(1, 1, 2)
			.with_rates(DirectionalRate::new(2.0, 1.0), DirectionalRate::new(3.0, 0.5));
		assert!(close(communication_weight(&link), 2.0 + 3.0 + 10.0 + 5.0, 1e-9));
	}

	#[test]
	fn settles_once_then_idles() {
		let mut store = pair(None, 100.0);
		let mut simulation =
			Simulation::new(LayoutParameters::default(), &store, Point::new(400.0, 300.0));
		let steps = run_until_settled(&mut simulation, &mut store);
		// 0.95^n < 0.001 first holds at n = 135.
		assert_eq!(steps, 135);
		assert!(!simulation.is_running());
		assert_eq!(simulation.step(&mut store), Tick::Idle);
	}

	#[test]
	fn unlinked_nodes_repel() {
		let mut store = pair(None, 100.0);
		let mut simulation =
			Simulation::new(LayoutParameters::default(), &store, Point::new(400.0, 300.0));
		simulation.step(&mut store);
		assert!(distance(&store, 1, 2) > 100.0);
	}

	#[test]
	fn overlapping_nodes_are_pushed_apart() {
		let mut store = pair(None, 10.0);
		let mut simulation =
			Simulation::new(LayoutParameters::default(), &store, Point::new(400.0, 300.0));
		for _ in 0..20 {
			simulation.step(&mut store);
		}
		assert!(distance(&store, 1, 2) > 60.0);
	}

	#[test]
	fn center_force_keeps_mean_on_viewport_center() {
		let mut store = pair(None, 100.0);
		for node in store.nodes_mut() {
			node.x += 150.0;
		}
		let mut simulation =
			Simulation::new(LayoutParameters::default(), &store, Point::new(400.0, 300.0));
		simulation.step(&mut store);
		let mean_x = store.nodes().iter().map(|n| n.x).sum::<f64>() / 2.0;
		let mean_y = store.nodes().iter().map(|n| n.y).sum::<f64>() / 2.0;
		assert!(close(mean_x, 400.0, 1e-6));
		assert!(close(mean_y, 300.0, 1e-6));
	}

	#[test]
	fn busy_link_pulls_pair_to_rest_length() {
		let link = GraphLink::new(1, 1, 2)
			.with_rates(DirectionalRate::new(0.0, 5.0), DirectionalRate::new(0.0, 5.0));
		let mut store = pair(Some(link), 400.0);
		let mut simulation =
			Simulation::new(LayoutParameters::default(), &store, Point::new(400.0, 300.0));
		run_until_settled(&mut simulation, &mut store);
		assert!(close(distance(&store, 1, 2), link_distance(100.0), 30.0));
	}

	#[test]
	fn pinned_node_holds_until_released() {
		let mut store = pair(None, 100.0);
		let mut simulation =
			Simulation::new(LayoutParameters::default(), &store, Point::new(400.0, 300.0));
		run_until_settled(&mut simulation, &mut store);

		simulation.pin(&mut store, 1, Point::new(100.0, 120.0));
		assert!(simulation.is_running());
		for _ in 0..200 {
			assert_ne!(simulation.step(&mut store), Tick::Settled);
		}
		assert_eq!(store.position(1), Some(Point::new(100.0, 120.0)));
		assert!(simulation.alpha() > 0.2);

		simulation.release(&mut store, 1);
		assert!(!store.node(1).unwrap().is_pinned());
		run_until_settled(&mut simulation, &mut store);
	}

	#[test]
	fn reweight_warms_without_full_restart() {
		let mut store = pair(Some(GraphLink::new(1, 1, 2)), 100.0);
		let mut simulation =
			Simulation::new(LayoutParameters::default(), &store, Point::new(400.0, 300.0));
		run_until_settled(&mut simulation, &mut store);
		simulation.reweight(&store);
		assert!(simulation.is_running());
		assert!(close(simulation.alpha(), 0.3, 1e-12));
		simulation.restart(&store);
		assert_eq!(simulation.alpha(), 1.0);
	}
}
