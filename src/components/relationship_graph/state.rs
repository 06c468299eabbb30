use log::{debug, info};

use super::config::GraphConfig;
use super::emphasis::Emphasis;
use super::fps::FpsCounter;
use super::geometry::Point;
use super::pulses::{PulseEngine, PulseSprite};
use super::scene::Scene;
use super::simulation::{Simulation, Tick};
use super::store::{GraphStore, StoreChange};
use super::types::{GraphData, NodeId};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragState {
	pub node: NodeId,
	/// Node centre minus pointer position at grab time, so the node does not jump.
	pub offset: Point,
}

pub struct FrameOutput<'a> {
	pub sprites: Vec<PulseSprite<'a>>,
	pub fps: Option<u32>,
}

/// Everything one mounted graph view owns.
pub struct GraphViewState {
	pub store: GraphStore,
	pub simulation: Simulation,
	pub scene: Scene,
	pub pulses: PulseEngine,
	pub fps: FpsCounter,
	pub width: f64,
	pub height: f64,
	config: GraphConfig,
	hovered: Option<NodeId>,
	drag: Option<DragState>,
	reconcile_at: Option<f64>,
}

impl GraphViewState {
	pub fn new(data: &GraphData, config: GraphConfig, width: f64, height: f64, now: f64) -> Self {
		let store = GraphStore::new(data);
		let simulation = Simulation::new(
			config.layout.clone(),
			&store,
			Point::new(width / 2.0, height / 2.0),
		);
		let mut scene = Scene::new(config.scene.clone());
		scene.apply_diff(&store, &Emphasis::derive(None, &store), now);
		info!(
			"Graph view mounted with {} nodes and {} links",
			store.len(),
			store.links().len()
		);

		Self {
			pulses: PulseEngine::new(config.pulses.clone()),
			fps: FpsCounter::new(config.fps_window_ms),
			reconcile_at: Some(now + config.settle_delay_ms),
			store,
			simulation,
			scene,
			width,
			height,
			config,
			hovered: None,
			drag: None,
		}
	}

	#[cfg(test)]
	pub fn hovered(&self) -> Option<NodeId> {
		self.hovered
	}

	pub fn drag(&self) -> Option<DragState> {
		self.drag
	}

	pub fn emphasis(&self) -> Emphasis {
		Emphasis::derive(self.hovered, &self.store)
	}

	/// Takes in new collections from outside. Returns whether the layout was restarted.
	pub fn replace_data(&mut self, data: &GraphData, now: f64) -> StoreChange {
		let change = self.store.replace(data);
		if self.hovered.is_some_and(|id| !self.store.contains(id)) {
			self.hovered = None;
		}
		if self.drag.is_some_and(|drag| !self.store.contains(drag.node)) {
			self.drag = None;
		}

		if change.membership {
			self.simulation.restart(&self.store);
		} else if change.rates {
			self.simulation.reweight(&self.store);
		} else {
			self.simulation.bind(&self.store);
		}
		if change.membership || change.rates {
			self.reconcile_at = Some(now + self.config.settle_delay_ms);
		}

		let emphasis = self.emphasis();
		let diff = self.scene.apply_diff(&self.store, &emphasis, now);
		debug!(
			"Graph data replaced: {} nodes, {} links, membership: {}, rates: {}, scene {:?}",
			self.store.len(),
			self.store.links().len(),
			change.membership,
			change.rates,
			diff
		);
		change
	}

	/// Topmost node under `point`, using the enlarged hover radius as the hit area.
	pub fn node_at(&self, point: Point) -> Option<NodeId> {
		self.store.node_at(point, self.config.scene.hover_radius)
	}

	pub fn set_hover(&mut self, hovered: Option<NodeId>, now: f64) -> bool {
		let hovered = hovered.filter(|&id| self.store.contains(id));
		if self.hovered == hovered {
			return false;
		}
		self.hovered = hovered;
		let emphasis = self.emphasis();
		self.scene.apply_diff(&self.store, &emphasis, now);
		true
	}

	/// Grabs the node under `point`, if any. Returns whether a drag started.
	pub fn begin_drag(&mut self, point: Point, now: f64) -> bool {
		let Some(id) = self.node_at(point) else {
			return false;
		};
		let Some(position) = self.store.position(id) else {
			return false;
		};
		self.drag = Some(DragState {
			node: id,
			offset: Point::new(position.x - point.x, position.y - point.y),
		});
		self.simulation.pin(&mut self.store, id, position);
		self.pulses.reconcile(&self.store, now, true);
		true
	}

	pub fn drag_to(&mut self, point: Point) -> bool {
		let Some(drag) = self.drag else {
			return false;
		};
		let target = Point::new(point.x + drag.offset.x, point.y + drag.offset.y);
		self.simulation.pin(&mut self.store, drag.node, target);
		true
	}

	pub fn end_drag(&mut self, now: f64) -> bool {
		let Some(drag) = self.drag.take() else {
			return false;
		};
		self.simulation.release(&mut self.store, drag.node);
		self.pulses.reconcile(&self.store, now, true);
		true
	}

	/// One layout tick. Positions reach the scene in the same call; a settle
	/// also reconciles the pulse set against the final geometry.
	pub fn layout_tick(&mut self, now: f64) -> Tick {
		let tick = self.simulation.step(&mut self.store);
		if tick == Tick::Idle {
			return tick;
		}
		self.scene.sync_positions(&self.store);
		if tick == Tick::Settled {
			let outcome = self.pulses.reconcile(&self.store, now, false);
			debug!(
				"Layout settled; pulses created: {}, dropped: {}, live: {}",
				outcome.created,
				outcome.dropped,
				self.pulses.len()
			);
		}
		tick
	}

	/// Per-display-frame work for the pulse layer.
	pub fn frame(&mut self, now: f64) -> FrameOutput<'_> {
		if self.reconcile_at.is_some_and(|at| now >= at) {
			self.reconcile_at = None;
			let outcome = self.pulses.reconcile(&self.store, now, false);
			debug!(
				"Pulses reconciled; created: {}, dropped: {}, live: {}",
				outcome.created,
				outcome.dropped,
				self.pulses.len()
			);
		}
		self.scene.prune(now);
		let fps = self.fps.frame(now);
		let emphasis = self.emphasis();
		let sprites = self.pulses.advance(&self.store, &emphasis, now);
		FrameOutput { sprites, fps }
	}

	/// Moves the layout centre to the new viewport. Returns whether the size
	/// changed, in which case the layout is warmed up to re-centre.
	pub fn resize(&mut self, width: f64, height: f64) -> bool {
		if self.width == width && self.height == height {
			return false;
		}
		self.width = width;
		self.height = height;
		self.simulation
			.set_center(Point::new(width / 2.0, height / 2.0));
		self.simulation.reweight(&self.store);
		self.scene.invalidate();
		true
	}

	/// Stops all per-frame work. Safe to call more than once.
	pub fn teardown(&mut self) {
		self.simulation.stop();
		self.pulses.clear();
		self.reconcile_at = None;
		self.drag = None;
		self.hovered = None;
	}

	pub fn snapshot(&self) -> GraphData {
		self.store.snapshot()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::relationship_graph::types::{DirectionalRate, GraphLink, GraphNode};

	fn data() -> GraphData {
		GraphData {
			nodes: vec![
				GraphNode::new(1, "Ada", 300.0, 300.0).with_highlight(true),
				GraphNode::new(2, "Brook", 500.0, 300.0),
				GraphNode::new(3, "Cyd", 400.0, 450.0),
			],
			links: vec![
				GraphLink::new(1, 1, 2)
					.with_rates(DirectionalRate::new(5.0, 1.0), DirectionalRate::new(2.0, 0.0)),
				GraphLink::new(2, 2, 3)
					.with_rates(DirectionalRate::new(1.0, 0.0), DirectionalRate::default()),
			],
		}
	}

	fn view() -> GraphViewState {
		GraphViewState::new(&data(), GraphConfig::default(), 800.0, 600.0, 0.0)
	}

	#[test]
	fn pulses_appear_after_the_settle_delay() {
		let mut view = view();
		assert!(view.frame(50.0).sprites.is_empty());
		let sprites = view.frame(100.0).sprites.len();
		// 4 + 1 + 2 on the first link, 2 on the second.
		assert_eq!(sprites, 9);
	}

	#[test]
	fn settling_reconciles_pulses() {
		let mut view = view();
		let mut ticks = 0;
		while view.layout_tick(16.0 * ticks as f64) != Tick::Settled {
			ticks += 1;
			assert!(ticks < 1000);
		}
		assert_eq!(view.pulses.len(), 9);
		assert_eq!(view.layout_tick(0.0), Tick::Idle);
		let node = view.store.node(2).unwrap();
		assert_eq!(view.scene.node(2).unwrap().position, Point::new(node.x, node.y));
	}

	#[test]
	fn hover_drives_emphasis_everywhere() {
		let mut view = view();
		assert_eq!(view.emphasis(), Emphasis::new(None, [1].into_iter().collect()));
		assert!(view.set_hover(Some(3), 500.0));
		assert!(!view.set_hover(Some(3), 510.0));
		assert_eq!(view.emphasis(), Emphasis::Hover(3));
		assert_eq!(view.scene.node(1).unwrap().opacity.target(), 0.3);
		assert_eq!(view.scene.node(3).unwrap().radius.target(), 14.0);

		let sprites = view.frame(1_000.0).sprites;
		assert!(sprites.iter().any(|s| s.opacity > 0.0 && s.opacity <= 0.25));

		assert!(view.set_hover(None, 2_000.0));
		assert_eq!(view.scene.node(1).unwrap().opacity.target(), 1.0);
		assert_eq!(view.scene.node(2).unwrap().opacity.target(), 0.3);
	}

	#[test]
	fn hovering_unknown_node_is_ignored() {
		let mut view = view();
		assert!(!view.set_hover(Some(99), 0.0));
		assert_eq!(view.hovered(), None);
	}

	#[test]
	fn drag_pins_then_releases() {
		let mut view = view();
		assert!(!view.begin_drag(Point::new(10.0, 10.0), 0.0));
		assert!(view.begin_drag(Point::new(303.0, 298.0), 0.0));
		assert_eq!(view.drag().map(|d| d.node), Some(1));
		// Grabbing refreshes and fills the pulse set straight away.
		assert_eq!(view.pulses.len(), 9);

		view.drag_to(Point::new(103.0, 98.0));
		for i in 0..30 {
			view.layout_tick(i as f64 * 16.0);
		}
		assert_eq!(view.store.position(1), Some(Point::new(100.0, 100.0)));
		let sprites_follow = view.frame(600.0).sprites.iter().all(|s| s.position.x.is_finite());
		assert!(sprites_follow);

		assert!(view.end_drag(700.0));
		assert!(!view.store.node(1).unwrap().is_pinned());
		assert!(!view.end_drag(800.0));
	}

	#[test]
	fn membership_change_restarts_layout_and_drops_pulses() {
		let mut view = view();
		view.frame(100.0);
		view.set_hover(Some(3), 150.0);
		for i in 0..400 {
			view.layout_tick(i as f64);
		}
		assert!(!view.simulation.is_running());

		let mut next = data();
		next.nodes.retain(|n| n.id != 3);
		next.links.retain(|l| !l.touches(3));
		let change = view.replace_data(&next, 10_000.0);
		assert!(change.membership);
		assert_eq!(view.simulation.alpha(), 1.0);
		assert_eq!(view.hovered(), None);
		assert!(view.scene.node(3).unwrap().exiting);

		view.frame(10_050.0);
		assert!(view.pulses.pulses().iter().all(|p| p.target != 3));
		view.frame(10_300.0);
		assert!(view.scene.node(3).is_none());
	}

	#[test]
	fn attribute_change_leaves_layout_alone() {
		let mut view = view();
		for i in 0..400 {
			view.layout_tick(i as f64);
		}
		let mut next = view.snapshot();
		next.nodes[1].highlighted = true;
		let change = view.replace_data(&next, 5_000.0);
		assert_eq!(change, StoreChange::default());
		assert!(!view.simulation.is_running());
		assert_eq!(view.scene.node(2).unwrap().opacity.target(), 1.0);
	}

	#[test]
	fn resize_recentres_a_settled_layout() {
		let mut view = view();
		let mut ticks = 0;
		while view.layout_tick(ticks as f64) != Tick::Settled {
			ticks += 1;
		}
		assert!(view.resize(1_000.0, 800.0));
		assert!(view.simulation.is_running());
		assert!(!view.resize(1_000.0, 800.0));

		let mut ticks = 0;
		while view.layout_tick(ticks as f64) != Tick::Settled {
			ticks += 1;
			assert!(ticks < 1_000);
		}
		let count = view.store.len() as f64;
		let mean_x = view.store.nodes().iter().map(|n| n.x).sum::<f64>() / count;
		let mean_y = view.store.nodes().iter().map(|n| n.y).sum::<f64>() / count;
		assert!((mean_x - 500.0).abs() < 1.0);
		assert!((mean_y - 400.0).abs() < 1.0);
	}

	#[test]
	fn teardown_is_idempotent() {
		let mut view = view();
		view.frame(100.0);
		view.teardown();
		view.teardown();
		assert!(view.pulses.is_empty());
		assert_eq!(view.layout_tick(0.0), Tick::Idle);
		assert!(view.frame(5_000.0).sprites.is_empty());
	}
}
