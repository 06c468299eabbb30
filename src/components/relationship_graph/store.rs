use std::collections::{HashMap, HashSet};

use log::warn;

use super::geometry::Point;
use super::types::{GraphData, GraphLink, GraphNode, LinkId, NodeId};

/// What changed when new collections were handed to the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreChange {
	/// Node or link membership differs from before.
	pub membership: bool,
	/// Some retained link carries different rates.
	pub rates: bool,
}

/// Single source of truth for node state. Nodes live in insertion order and are
/// looked up by id through `index`; links refer to nodes by id only.
#[derive(Clone, Debug, Default)]
pub struct GraphStore {
	nodes: Vec<GraphNode>,
	index: HashMap<NodeId, usize>,
	links: Vec<GraphLink>,
}

impl GraphStore {
	pub fn new(data: &GraphData) -> Self {
		let mut store = Self::default();
		store.replace(data);
		store
	}

	/// Replaces both collections. Nodes already present keep the position the
	/// layout gave them; everything else is taken from `data`.
	pub fn replace(&mut self, data: &GraphData) -> StoreChange {
		let old_nodes: HashSet<NodeId> = self.index.keys().copied().collect();
		let old_links: HashMap<LinkId, GraphLink> =
			self.links.drain(..).map(|link| (link.id, link)).collect();

		let mut nodes = Vec::with_capacity(data.nodes.len());
		let mut index = HashMap::with_capacity(data.nodes.len());
		for incoming in &data.nodes {
			if index.contains_key(&incoming.id) {
				warn!("Skipping duplicate node id {}", incoming.id);
				continue;
			}
			let mut node = incoming.clone();
			if let Some(current) = self.node(incoming.id) {
				node.x = current.x;
				node.y = current.y;
				node.fixed_x = current.fixed_x;
				node.fixed_y = current.fixed_y;
			}
			index.insert(node.id, nodes.len());
			nodes.push(node);
		}

		let links: Vec<GraphLink> = data
			.links
			.iter()
			.filter(|link| {
				if link.source == link.target {
					warn!("Skipping link {}: source and target are both {}", link.id, link.source);
					return false;
				}
				if !index.contains_key(&link.source) || !index.contains_key(&link.target) {
					warn!(
						"Skipping link {}: endpoint {} or {} is not a known node",
						link.id, link.source, link.target
					);
					return false;
				}
				true
			})
			.cloned()
			.collect();

		let membership = old_nodes.len() != index.len()
			|| index.keys().any(|id| !old_nodes.contains(id))
			|| old_links.len() != links.len()
			|| links.iter().any(|link| match old_links.get(&link.id) {
				Some(old) => old.source != link.source || old.target != link.target,
				None => true,
			});
		let rates = links.iter().any(|link| {
			old_links.get(&link.id).is_some_and(|old| {
				old.source_to_target != link.source_to_target
					|| old.target_to_source != link.target_to_source
			})
		});

		self.nodes = nodes;
		self.index = index;
		self.links = links;
		StoreChange { membership, rates }
	}

	pub fn nodes(&self) -> &[GraphNode] {
		&self.nodes
	}

	pub fn nodes_mut(&mut self) -> &mut [GraphNode] {
		&mut self.nodes
	}

	pub fn links(&self) -> &[GraphLink] {
		&self.links
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	#[cfg(test)]
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn contains(&self, id: NodeId) -> bool {
		self.index.contains_key(&id)
	}

	/// Position of a node within `nodes()`.
	pub fn slot(&self, id: NodeId) -> Option<usize> {
		self.index.get(&id).copied()
	}

	pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
		self.slot(id).map(|slot| &self.nodes[slot])
	}

	pub fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
		let slot = self.slot(id)?;
		Some(&mut self.nodes[slot])
	}

	pub fn position(&self, id: NodeId) -> Option<Point> {
		self.node(id).map(|node| Point::new(node.x, node.y))
	}

	pub fn link_endpoints(&self, link: &GraphLink) -> Option<(Point, Point)> {
		Some((self.position(link.source)?, self.position(link.target)?))
	}

	pub fn highlighted(&self) -> HashSet<NodeId> {
		self.nodes
			.iter()
			.filter(|node| node.highlighted)
			.map(|node| node.id)
			.collect()
	}

	/// Topmost node whose centre lies within `radius` of `point`. Later nodes are
	/// drawn over earlier ones, so the search runs back to front.
	pub fn node_at(&self, point: Point, radius: f64) -> Option<NodeId> {
		self.nodes
			.iter()
			.rev()
			.find(|node| Point::new(node.x, node.y).distance_to(point) < radius)
			.map(|node| node.id)
	}

	/// Copy of the current collections, positions included.
	pub fn snapshot(&self) -> GraphData {
		GraphData {
			nodes: self.nodes.clone(),
			links: self.links.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::relationship_graph::types::DirectionalRate;

	fn sample() -> GraphData {
		GraphData {
			nodes: vec![
				GraphNode::new(1, "Ada", 10.0, 10.0),
				GraphNode::new(2, "Brook", 50.0, 10.0),
				GraphNode::new(3, "Cyd", 90.0, 10.0),
			],
			links: vec![GraphLink::new(1, 1, 2), GraphLink::new(2, 2, 3)],
		}
	}

	#[test]
	fn lookups_go_through_the_index() {
		let store = GraphStore::new(&sample());
		assert_eq!(store.len(), 3);
		assert_eq!(store.position(2), Some(Point::new(50.0, 10.0)));
		assert_eq!(store.slot(3), Some(2));
		assert!(store.node(9).is_none());
	}

	#[test]
	fn moving_a_node_is_seen_through_its_links() {
		let mut store = GraphStore::new(&sample());
		if let Some(node) = store.node_mut(2) {
			node.x = 70.0;
		}
		let link = store.links()[0].clone();
		let (_, target) = store.link_endpoints(&link).unwrap();
		assert_eq!(target, Point::new(70.0, 10.0));
	}

	#[test]
	fn malformed_links_are_skipped() {
		let mut data = sample();
		data.links.push(GraphLink::new(3, 1, 1));
		data.links.push(GraphLink::new(4, 1, 42));
		let store = GraphStore::new(&data);
		assert_eq!(store.links().len(), 2);
	}

	#[test]
	fn replace_keeps_layout_positions() {
		let mut store = GraphStore::new(&sample());
		if let Some(node) = store.node_mut(1) {
			node.x = 400.0;
		}
		let mut data = sample();
		data.nodes[0].name = "Ada L.".into();
		let change = store.replace(&data);
		assert_eq!(change, StoreChange::default());
		assert_eq!(store.node(1).map(|n| n.x), Some(400.0));
		assert_eq!(store.node(1).map(|n| n.name.as_str()), Some("Ada L."));
	}

	#[test]
	fn replace_reports_membership_and_rate_changes() {
		let mut store = GraphStore::new(&sample());

		let mut data = sample();
		data.links[0].source_to_target = DirectionalRate::new(3.0, 0.0);
		assert_eq!(
			store.replace(&data),
			StoreChange {
				membership: false,
				rates: true
			}
		);

		data.nodes.pop();
		data.links.pop();
		assert!(store.replace(&data).membership);
		assert!(!store.contains(3));
	}

	#[test]
	fn hit_test_prefers_topmost() {
		let mut data = sample();
		data.nodes[1].x = 12.0;
		let store = GraphStore::new(&data);
		assert_eq!(store.node_at(Point::new(11.0, 10.0), 10.0), Some(2));
		assert_eq!(store.node_at(Point::new(200.0, 200.0), 10.0), None);
	}
}
