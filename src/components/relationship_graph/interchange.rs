//! Story files: the JSON format the editor imports and exports.
//!
//! Node positions are stored as percentages of the viewport so a story
//! opens at the same relative layout on any screen size. Older files carry
//! nodes without `x`/`y`/`color`; those are laid out along the horizontal
//! centre line on import.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{DirectionalRate, GraphData, GraphLink, GraphNode, LinkId, NodeId};

#[derive(Debug, Error)]
pub enum InterchangeError {
	#[error("Malformed story JSON: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Graph has no nodes to export")]
	EmptyGraph,

	#[error("Viewport {width}x{height} cannot hold a graph")]
	InvalidViewport { width: f64, height: f64 },

	#[error("Link {link} references unknown node {node}")]
	DanglingLink { link: LinkId, node: NodeId },

	#[error("Link {link} connects a node to itself")]
	SelfLink { link: LinkId },
}

pub type Result<T> = std::result::Result<T, InterchangeError>;

/// Size of the drawing surface positions are relative to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	pub width: f64,
	pub height: f64,
}

impl Viewport {
	pub fn new(width: f64, height: f64) -> Self {
		Self { width, height }
	}

	fn check(self) -> Result<Self> {
		let usable = |v: f64| v.is_finite() && v > 0.0;
		if usable(self.width) && usable(self.height) {
			Ok(self)
		} else {
			Err(InterchangeError::InvalidViewport {
				width: self.width,
				height: self.height,
			})
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTime {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub year: Option<i32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub month: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub day: Option<u32>,
}

/// Event details stored alongside the graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoryMeta {
	pub event_time: EventTime,
	pub title: String,
	pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportedStory {
	pub data: GraphData,
	pub meta: StoryMeta,
	/// At least one node came without a stored position.
	pub legacy_format: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoryFile {
	#[serde(default)]
	event_time: EventTime,
	#[serde(default)]
	event_title: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	event_description: Option<String>,
	nodes: Vec<NodeRecord>,
	#[serde(default)]
	links: Vec<LinkRecord>,
}

#[derive(Serialize, Deserialize)]
struct NodeRecord {
	id: NodeId,
	name: String,
	#[serde(default)]
	highlighted: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	x: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	y: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	color: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct LinkRecord {
	id: LinkId,
	source: NodeId,
	target: NodeId,
	#[serde(rename = "sourceToTargetPPM", default, deserialize_with = "lenient_rates")]
	source_to_target: RateRecord,
	#[serde(rename = "targetToSourcePPM", default, deserialize_with = "lenient_rates")]
	target_to_source: RateRecord,
}

#[derive(Clone, Copy, Default, Serialize, Deserialize)]
struct RateRecord {
	ppm: f64,
	mppm: f64,
}

impl From<DirectionalRate> for RateRecord {
	fn from(rate: DirectionalRate) -> Self {
		Self {
			ppm: rate.pulses_per_minute,
			mppm: rate.meaningful_pulses_per_minute,
		}
	}
}

impl From<RateRecord> for DirectionalRate {
	fn from(record: RateRecord) -> Self {
		DirectionalRate::new(record.ppm, record.mppm)
	}
}

/// Missing, null or non-numeric rate fields read as zero.
fn lenient_rates<'de, D>(deserializer: D) -> std::result::Result<RateRecord, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let value = serde_json::Value::deserialize(deserializer)?;
	let field = |key: &str| value.get(key).and_then(serde_json::Value::as_f64).unwrap_or(0.0);
	Ok(RateRecord {
		ppm: field("ppm"),
		mppm: field("mppm"),
	})
}

fn check_links(nodes: &[NodeId], links: &[(LinkId, NodeId, NodeId)]) -> Result<()> {
	let known: HashSet<NodeId> = nodes.iter().copied().collect();
	for &(link, source, target) in links {
		if source == target {
			return Err(InterchangeError::SelfLink { link });
		}
		if let Some(node) = [source, target].into_iter().find(|id| !known.contains(id)) {
			return Err(InterchangeError::DanglingLink { link, node });
		}
	}
	Ok(())
}

/// Serializes a graph and its event details as a story file.
pub fn export_json(data: &GraphData, meta: &StoryMeta, viewport: Viewport) -> Result<String> {
	if data.nodes.is_empty() {
		return Err(InterchangeError::EmptyGraph);
	}
	let viewport = viewport.check()?;
	check_links(
		&data.nodes.iter().map(|n| n.id).collect::<Vec<_>>(),
		&data.links.iter().map(|l| (l.id, l.source, l.target)).collect::<Vec<_>>(),
	)?;

	let file = StoryFile {
		event_time: meta.event_time,
		event_title: meta.title.clone(),
		event_description: meta.description.clone(),
		nodes: data
			.nodes
			.iter()
			.map(|node| NodeRecord {
				id: node.id,
				name: node.name.clone(),
				highlighted: node.highlighted,
				x: Some(node.x / viewport.width * 100.0),
				y: Some(node.y / viewport.height * 100.0),
				color: Some(node.color.clone()),
			})
			.collect(),
		links: data
			.links
			.iter()
			.map(|link| LinkRecord {
				id: link.id,
				source: link.source,
				target: link.target,
				source_to_target: link.source_to_target.into(),
				target_to_source: link.target_to_source.into(),
			})
			.collect(),
	};
	Ok(serde_json::to_string_pretty(&file)?)
}

/// Parses a story file, converting stored percentages back to pixels.
pub fn import_json(text: &str, viewport: Viewport) -> Result<ImportedStory> {
	let viewport = viewport.check()?;
	let file: StoryFile = serde_json::from_str(text)?;
	check_links(
		&file.nodes.iter().map(|n| n.id).collect::<Vec<_>>(),
		&file.links.iter().map(|l| (l.id, l.source, l.target)).collect::<Vec<_>>(),
	)?;

	let count = file.nodes.len() as f64;
	let mut legacy_format = false;
	let nodes = file
		.nodes
		.into_iter()
		.enumerate()
		.map(|(index, record)| {
			let node = match (record.x, record.y) {
				(Some(x), Some(y)) => GraphNode::new(
					record.id,
					record.name,
					x / 100.0 * viewport.width,
					y / 100.0 * viewport.height,
				)
				.with_color(record.color.unwrap_or_else(|| "#FFFFFF".to_string())),
				_ => {
					legacy_format = true;
					GraphNode::new(
						record.id,
						record.name,
						index as f64 / count * viewport.width,
						viewport.height / 2.0,
					)
				}
			};
			node.with_highlight(record.highlighted)
		})
		.collect();

	let links = file
		.links
		.into_iter()
		.map(|record| {
			GraphLink::new(record.id, record.source, record.target)
				.with_rates(record.source_to_target.into(), record.target_to_source.into())
		})
		.collect();

	Ok(ImportedStory {
		data: GraphData { nodes, links },
		meta: StoryMeta {
			event_time: file.event_time,
			title: file.event_title,
			description: file.event_description,
		},
		legacy_format,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	const VIEW: Viewport = Viewport {
		width: 800.0,
		height: 600.0,
	};

	fn story() -> GraphData {
		GraphData {
			nodes: vec![
				GraphNode::new(1, "Ada", 200.0, 150.0).with_color("#FF8800"),
				GraphNode::new(2, "Brook", 640.0, 420.0).with_highlight(true),
				GraphNode::new(3, "Cyr", 400.0, 300.0),
			],
			links: vec![
				GraphLink::new(10, 1, 2)
					.with_rates(DirectionalRate::new(4.0, 1.0), DirectionalRate::new(0.0, 2.5)),
				GraphLink::new(11, 2, 3)
					.with_rates(DirectionalRate::new(1.5, 0.0), DirectionalRate::default()),
			],
		}
	}

	fn meta() -> StoryMeta {
		StoryMeta {
			event_time: EventTime {
				year: Some(1914),
				month: Some(6),
				day: Some(28),
			},
			title: "Sarajevo".to_string(),
			description: Some("Archduke visits".to_string()),
		}
	}

	#[test]
	fn export_then_import_preserves_graph() {
		let data = story();
		let text = export_json(&data, &meta(), VIEW).unwrap();
		let imported = import_json(&text, VIEW).unwrap();

		assert!(!imported.legacy_format);
		assert_eq!(imported.meta, meta());
		assert_eq!(imported.data.links, data.links);
		assert_eq!(imported.data.nodes.len(), data.nodes.len());
		for (a, b) in imported.data.nodes.iter().zip(&data.nodes) {
			assert_eq!(
				(a.id, &a.name, a.highlighted, &a.color),
				(b.id, &b.name, b.highlighted, &b.color)
			);
			assert!((a.x - b.x).abs() < 1e-9);
			assert!((a.y - b.y).abs() < 1e-9);
		}
	}

	#[test]
	fn positions_are_stored_as_percentages() {
		let text = export_json(&story(), &meta(), VIEW).unwrap();
		let value: serde_json::Value = serde_json::from_str(&text).unwrap();
		let first = &value["nodes"][0];
		assert_eq!(first["x"].as_f64(), Some(25.0));
		assert_eq!(first["y"].as_f64(), Some(25.0));
		assert_eq!(value["links"][0]["sourceToTargetPPM"]["ppm"].as_f64(), Some(4.0));
		assert_eq!(value["links"][0]["targetToSourcePPM"]["mppm"].as_f64(), Some(2.5));
		assert_eq!(value["eventTime"]["year"].as_i64(), Some(1914));
		assert!(first.get("fx").is_none());
	}

	#[test]
	fn import_scales_to_a_different_viewport() {
		let text = export_json(&story(), &meta(), VIEW).unwrap();
		let imported = import_json(&text, Viewport::new(400.0, 300.0)).unwrap();
		assert!((imported.data.nodes[0].x - 100.0).abs() < 1e-9);
		assert!((imported.data.nodes[0].y - 75.0).abs() < 1e-9);
	}

	#[test]
	fn legacy_nodes_spread_along_centre_line() {
		let text = r##"{
			"eventTitle": "Old",
			"nodes": [
				{ "id": 1, "name": "A", "highlighted": false },
				{ "id": 2, "name": "B", "highlighted": true },
				{ "id": 3, "name": "C", "highlighted": false,
				  "x": 50, "y": 10, "color": "#123456" },
				{ "id": 4, "name": "D", "highlighted": false }
			],
			"links": []
		}"##;
		let imported = import_json(text, VIEW).unwrap();
		assert!(imported.legacy_format);
		let nodes = &imported.data.nodes;
		assert_eq!((nodes[0].x, nodes[0].y), (0.0, 300.0));
		assert_eq!((nodes[1].x, nodes[1].y), (200.0, 300.0));
		assert_eq!(nodes[0].color, "#FFFFFF");
		assert!(nodes[1].highlighted);
		assert_eq!((nodes[2].x, nodes[2].y), (400.0, 60.0));
		assert_eq!(nodes[2].color, "#123456");
		assert_eq!(nodes[3].x, 600.0);
	}

	#[test]
	fn unreadable_rates_import_as_zero() {
		let text = r##"{
			"nodes": [
				{ "id": 1, "name": "A", "x": 0, "y": 0, "color": "#FFFFFF" },
				{ "id": 2, "name": "B", "x": 10, "y": 10, "color": "#FFFFFF" }
			],
			"links": [
				{ "id": 5, "source": 1, "target": 2,
				  "sourceToTargetPPM": { "ppm": "lots", "mppm": 3 },
				  "targetToSourcePPM": null }
			]
		}"##;
		let link = &import_json(text, VIEW).unwrap().data.links[0];
		assert_eq!(link.source_to_target, DirectionalRate::new(0.0, 3.0));
		assert_eq!(link.target_to_source, DirectionalRate::default());
	}

	#[test]
	fn import_rejects_broken_links() {
		let dangling = r##"{
			"nodes": [{ "id": 1, "name": "A" }],
			"links": [{ "id": 7, "source": 1, "target": 9 }]
		}"##;
		assert!(matches!(
			import_json(dangling, VIEW),
			Err(InterchangeError::DanglingLink { link: 7, node: 9 })
		));

		let looped = r##"{
			"nodes": [{ "id": 1, "name": "A" }],
			"links": [{ "id": 8, "source": 1, "target": 1 }]
		}"##;
		assert!(matches!(import_json(looped, VIEW), Err(InterchangeError::SelfLink { link: 8 })));
	}

	#[test]
	fn export_rejects_empty_graph_and_bad_viewport() {
		assert!(matches!(
			export_json(&GraphData::default(), &meta(), VIEW),
			Err(InterchangeError::EmptyGraph)
		));
		assert!(matches!(
			export_json(&story(), &meta(), Viewport::new(0.0, 600.0)),
			Err(InterchangeError::InvalidViewport { .. })
		));
	}

	#[test]
	fn malformed_json_is_an_error() {
		assert!(matches!(import_json("{ nodes: ", VIEW), Err(InterchangeError::Json(_))));
	}
}
