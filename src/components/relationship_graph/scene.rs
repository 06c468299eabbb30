use std::collections::{HashMap, HashSet};

use super::config::SceneParameters;
use super::emphasis::Emphasis;
use super::geometry::Point;
use super::store::GraphStore;
use super::types::NodeId;

/// Something a [`Tween`] can blend between.
pub trait Interpolate: Copy + PartialEq {
	fn interpolate(self, to: Self, t: f64) -> Self;
}

impl Interpolate for f64 {
	fn interpolate(self, to: Self, t: f64) -> Self {
		self + (to - self) * t
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb {
	pub r: f64,
	pub g: f64,
	pub b: f64,
}

impl Rgb {
	pub const WHITE: Rgb = Rgb {
		r: 255.0,
		g: 255.0,
		b: 255.0,
	};

	/// Parses `#RRGGBB` or `#RGB`.
	pub fn parse(hex: &str) -> Option<Self> {
		let digits = hex.trim().strip_prefix('#')?;
		if !digits.is_ascii() {
			return None;
		}
		let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(f64::from);
		match digits.len() {
			6 => Some(Rgb {
				r: channel(&digits[0..2])?,
				g: channel(&digits[2..4])?,
				b: channel(&digits[4..6])?,
			}),
			3 => Some(Rgb {
				r: channel(&digits[0..1])? * 17.0,
				g: channel(&digits[1..2])? * 17.0,
				b: channel(&digits[2..3])? * 17.0,
			}),
			_ => None,
		}
	}

	pub fn to_css(self) -> String {
		format!(
			"rgb({}, {}, {})",
			self.r.round() as u8,
			self.g.round() as u8,
			self.b.round() as u8
		)
	}
}

impl Interpolate for Rgb {
	fn interpolate(self, to: Self, t: f64) -> Self {
		Rgb {
			r: self.r.interpolate(to.r, t),
			g: self.g.interpolate(to.g, t),
			b: self.b.interpolate(to.b, t),
		}
	}
}

fn ease_cubic_in_out(t: f64) -> f64 {
	if t < 0.5 {
		4.0 * t * t * t
	} else {
		1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
	}
}

/// A value moving from `from` to `to` over `duration` milliseconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween<T> {
	from: T,
	to: T,
	start: f64,
	duration: f64,
}

impl<T: Interpolate> Tween<T> {
	pub fn fixed(value: T) -> Self {
		Self {
			from: value,
			to: value,
			start: 0.0,
			duration: 0.0,
		}
	}

	pub fn new(from: T, to: T, start: f64, duration: f64) -> Self {
		Self {
			from,
			to,
			start,
			duration,
		}
	}

	#[cfg(test)]
	pub fn target(&self) -> T {
		self.to
	}

	pub fn value_at(&self, now: f64) -> T {
		if self.duration <= 0.0 || now >= self.start + self.duration {
			return self.to;
		}
		if now <= self.start {
			return self.from;
		}
		let t = ease_cubic_in_out((now - self.start) / self.duration);
		self.from.interpolate(self.to, t)
	}

	/// Heads for `to` starting from wherever the value is right now.
	pub fn retarget(&mut self, to: T, now: f64, duration: f64) {
		if self.to == to {
			return;
		}
		self.from = self.value_at(now);
		self.to = to;
		self.start = now;
		self.duration = duration;
	}

	pub fn is_done(&self, now: f64) -> bool {
		self.from == self.to || now >= self.start + self.duration
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeElement {
	pub id: NodeId,
	pub position: Point,
	pub label: String,
	pub fill: Tween<Rgb>,
	pub opacity: Tween<f64>,
	pub radius: Tween<f64>,
	pub exiting: bool,
}

impl NodeElement {
	fn is_settled(&self, now: f64) -> bool {
		self.fill.is_done(now) && self.opacity.is_done(now) && self.radius.is_done(now)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkElement {
	/// Ordered (source, target) pair.
	pub key: (NodeId, NodeId),
	pub source: Point,
	pub target: Point,
	pub opacity: Tween<f64>,
	pub stroke_width: Tween<f64>,
	pub exiting: bool,
}

impl LinkElement {
	fn is_settled(&self, now: f64) -> bool {
		self.opacity.is_done(now) && self.stroke_width.is_done(now)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneDiff {
	pub entered: usize,
	pub updated: usize,
	pub exited: usize,
}

/// Retained visual state of nodes and links. Attribute changes are tweened;
/// positions follow the layout directly.
pub struct Scene {
	params: SceneParameters,
	nodes: Vec<NodeElement>,
	links: Vec<LinkElement>,
	dirty: bool,
}

impl Scene {
	pub fn new(params: SceneParameters) -> Self {
		Self {
			params,
			nodes: Vec::new(),
			links: Vec::new(),
			dirty: true,
		}
	}

	pub fn params(&self) -> &SceneParameters {
		&self.params
	}

	pub fn nodes(&self) -> &[NodeElement] {
		&self.nodes
	}

	pub fn links(&self) -> &[LinkElement] {
		&self.links
	}

	#[cfg(test)]
	pub fn node(&self, id: NodeId) -> Option<&NodeElement> {
		self.nodes.iter().find(|element| element.id == id)
	}

	#[cfg(test)]
	pub fn link(&self, key: (NodeId, NodeId)) -> Option<&LinkElement> {
		self.links.iter().find(|element| element.key == key)
	}

	/// Reconciles elements against the store: new entities fade in, missing
	/// ones fade out, retained ones transition to their new attributes.
	pub fn apply_diff(&mut self, store: &GraphStore, emphasis: &Emphasis, now: f64) -> SceneDiff {
		let mut diff = SceneDiff::default();
		let duration = self.params.transition_ms;
		let hovered = emphasis.hovered();

		let slots: HashMap<NodeId, usize> = self
			.nodes
			.iter()
			.enumerate()
			.map(|(slot, element)| (element.id, slot))
			.collect();
		let mut present = HashSet::with_capacity(store.len());
		for node in store.nodes() {
			present.insert(node.id);
			let opacity = emphasis.node_opacity(node);
			let radius = if hovered == Some(node.id) {
				self.params.hover_radius
			} else {
				self.params.node_radius
			};
			let fill = Rgb::parse(&node.color).unwrap_or(Rgb::WHITE);
			let position = Point::new(node.x, node.y);

			match slots.get(&node.id) {
				Some(&slot) => {
					let element = &mut self.nodes[slot];
					element.exiting = false;
					element.position = position;
					element.label.clone_from(&node.name);
					element.fill.retarget(fill, now, duration);
					element.opacity.retarget(opacity, now, duration);
					element.radius.retarget(radius, now, duration);
					diff.updated += 1;
				}
				None => {
					self.nodes.push(NodeElement {
						id: node.id,
						position,
						label: node.name.clone(),
						fill: Tween::fixed(fill),
						opacity: Tween::new(0.0, opacity, now, duration),
						radius: Tween::fixed(radius),
						exiting: false,
					});
					diff.entered += 1;
				}
			}
		}
		for element in &mut self.nodes {
			if !present.contains(&element.id) && !element.exiting {
				element.exiting = true;
				element.opacity.retarget(0.0, now, duration);
				diff.exited += 1;
			}
		}

		let slots: HashMap<(NodeId, NodeId), usize> = self
			.links
			.iter()
			.enumerate()
			.map(|(slot, element)| (element.key, slot))
			.collect();
		let mut present = HashSet::with_capacity(store.links().len());
		for link in store.links() {
			let Some((source, target)) = store.link_endpoints(link) else {
				continue;
			};
			let key = (link.source, link.target);
			present.insert(key);
			let opacity = emphasis.link_opacity(link);
			let width = match hovered {
				Some(id) if link.touches(id) => self.params.hover_stroke_width,
				_ => self.params.stroke_width,
			};

			match slots.get(&key) {
				Some(&slot) => {
					let element = &mut self.links[slot];
					element.exiting = false;
					element.source = source;
					element.target = target;
					element.opacity.retarget(opacity, now, duration);
					element.stroke_width.retarget(width, now, duration);
					diff.updated += 1;
				}
				None => {
					self.links.push(LinkElement {
						key,
						source,
						target,
						opacity: Tween::new(0.0, opacity, now, duration),
						stroke_width: Tween::fixed(width),
						exiting: false,
					});
					diff.entered += 1;
				}
			}
		}
		for element in &mut self.links {
			if !present.contains(&element.key) && !element.exiting {
				element.exiting = true;
				element.opacity.retarget(0.0, now, duration);
				diff.exited += 1;
			}
		}

		self.dirty = true;
		diff
	}

	/// Copies current layout positions onto every live element.
	pub fn sync_positions(&mut self, store: &GraphStore) {
		for element in &mut self.nodes {
			if let Some(position) = store.position(element.id) {
				element.position = position;
			}
		}
		for element in &mut self.links {
			let (Some(source), Some(target)) =
				(store.position(element.key.0), store.position(element.key.1))
			else {
				continue;
			};
			element.source = source;
			element.target = target;
		}
		self.dirty = true;
	}

	/// Destroys elements whose exit fade has finished.
	pub fn prune(&mut self, now: f64) -> usize {
		let before = self.nodes.len() + self.links.len();
		self.nodes
			.retain(|element| !(element.exiting && element.opacity.is_done(now)));
		self.links
			.retain(|element| !(element.exiting && element.opacity.is_done(now)));
		let removed = before - self.nodes.len() - self.links.len();
		if removed > 0 {
			self.dirty = true;
		}
		removed
	}

	pub fn needs_paint(&self, now: f64) -> bool {
		self.dirty
			|| self.nodes.iter().any(|element| !element.is_settled(now))
			|| self.links.iter().any(|element| !element.is_settled(now))
	}

	pub fn invalidate(&mut self) {
		self.dirty = true;
	}

	pub fn mark_painted(&mut self) {
		self.dirty = false;
	}
}
