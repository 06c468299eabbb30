pub type NodeId = u32;
pub type LinkId = u32;

/// Communication rate in one direction of a link, in pulses per minute.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DirectionalRate {
	pub pulses_per_minute: f64,
	pub meaningful_pulses_per_minute: f64,
}

impl DirectionalRate {
	pub fn new(pulses_per_minute: f64, meaningful_pulses_per_minute: f64) -> Self {
		Self {
			pulses_per_minute,
			meaningful_pulses_per_minute,
		}
	}

	pub fn regular(&self) -> f64 {
		sanitize_rate(self.pulses_per_minute)
	}

	pub fn meaningful(&self) -> f64 {
		sanitize_rate(self.meaningful_pulses_per_minute)
	}
}

// NaN, infinities and negatives all count as "no communication".
fn sanitize_rate(rate: f64) -> f64 {
	if rate.is_finite() && rate > 0.0 {
		rate
	} else {
		0.0
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
	pub id: NodeId,
	pub name: String,
	pub x: f64,
	pub y: f64,
	pub fixed_x: Option<f64>,
	pub fixed_y: Option<f64>,
	pub highlighted: bool,
	pub color: String,
}

impl GraphNode {
	pub fn new(id: NodeId, name: impl Into<String>, x: f64, y: f64) -> Self {
		Self {
			id,
			name: name.into(),
			x,
			y,
			fixed_x: None,
			fixed_y: None,
			highlighted: false,
			color: "#FFFFFF".into(),
		}
	}

	pub fn with_color(mut self, color: impl Into<String>) -> Self {
		self.color = color.into();
		self
	}

	pub fn with_highlight(mut self, highlighted: bool) -> Self {
		self.highlighted = highlighted;
		self
	}

	#[cfg(test)]
	pub fn is_pinned(&self) -> bool {
		self.fixed_x.is_some() || self.fixed_y.is_some()
	}
}

/// A link between two nodes. Endpoints are node ids resolved through the store,
/// never copies of the nodes themselves.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphLink {
	pub id: LinkId,
	pub source: NodeId,
	pub target: NodeId,
	pub source_to_target: DirectionalRate,
	pub target_to_source: DirectionalRate,
}

impl GraphLink {
	pub fn new(id: LinkId, source: NodeId, target: NodeId) -> Self {
		Self {
			id,
			source,
			target,
			source_to_target: DirectionalRate::default(),
			target_to_source: DirectionalRate::default(),
		}
	}

	pub fn with_rates(mut self, forward: DirectionalRate, reverse: DirectionalRate) -> Self {
		self.source_to_target = forward;
		self.target_to_source = reverse;
		self
	}

	pub fn touches(&self, id: NodeId) -> bool {
		self.source == id || self.target == id
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphData {
	pub nodes: Vec<GraphNode>,
	pub links: Vec<GraphLink>,
}
