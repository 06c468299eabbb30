use std::collections::HashSet;

use super::store::GraphStore;
use super::types::{GraphLink, GraphNode, NodeId};

pub const NODE_FOCUSED: f64 = 1.0;
pub const NODE_DIMMED: f64 = 0.3;
pub const LINK_FOCUSED: f64 = 0.8;
pub const LINK_DIMMED: f64 = 0.2;
pub const LINK_AT_REST: f64 = 0.7;

/// Which nodes the viewer is currently paying attention to.
///
/// Exactly one mode applies: a hovered node wins over the highlighted set, and
/// the highlighted set wins over the neutral state.
#[derive(Clone, Debug, PartialEq)]
pub enum Emphasis {
	Neutral,
	Hover(NodeId),
	Highlight(HashSet<NodeId>),
}

impl Emphasis {
	pub fn new(hovered: Option<NodeId>, highlighted: HashSet<NodeId>) -> Self {
		match hovered {
			Some(id) => Emphasis::Hover(id),
			None if !highlighted.is_empty() => Emphasis::Highlight(highlighted),
			None => Emphasis::Neutral,
		}
	}

	pub fn derive(hovered: Option<NodeId>, store: &GraphStore) -> Self {
		match hovered {
			Some(id) => Emphasis::Hover(id),
			None => Self::new(None, store.highlighted()),
		}
	}

	fn focuses_node(&self, id: NodeId) -> Option<bool> {
		match self {
			Emphasis::Neutral => None,
			Emphasis::Hover(hovered) => Some(*hovered == id),
			Emphasis::Highlight(set) => Some(set.contains(&id)),
		}
	}

	fn focuses_pair(&self, source: NodeId, target: NodeId) -> Option<bool> {
		match self {
			Emphasis::Neutral => None,
			Emphasis::Hover(hovered) => Some(*hovered == source || *hovered == target),
			Emphasis::Highlight(set) => Some(set.contains(&source) || set.contains(&target)),
		}
	}

	pub fn node_opacity(&self, node: &GraphNode) -> f64 {
		match self.focuses_node(node.id) {
			None | Some(true) => NODE_FOCUSED,
			Some(false) => NODE_DIMMED,
		}
	}

	pub fn link_opacity(&self, link: &GraphLink) -> f64 {
		match self.focuses_pair(link.source, link.target) {
			None => LINK_AT_REST,
			Some(true) => LINK_FOCUSED,
			Some(false) => LINK_DIMMED,
		}
	}

	/// Factor applied to a pulse's own fade envelope.
	pub fn pulse_multiplier(&self, source: NodeId, target: NodeId, dimmed: f64) -> f64 {
		match self.focuses_pair(source, target) {
			Some(false) => dimmed,
			None | Some(true) => 1.0,
		}
	}

	pub fn hovered(&self) -> Option<NodeId> {
		match self {
			Emphasis::Hover(id) => Some(*id),
			_ => None,
		}
	}
}
