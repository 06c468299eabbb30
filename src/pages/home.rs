use leptos::prelude::*;
use log::{debug, info, warn};

use crate::components::relationship_graph::{
	GraphData, NodeId, RelationshipGraph, StoryMeta, Viewport, export_json, import_json,
};

const DEMO_STORY: &str = include_str!("../../assets/demo_story.json");

/// Current window size, falling back to a typical desktop viewport.
fn window_viewport() -> Viewport {
	let size = |value: Result<wasm_bindgen::JsValue, wasm_bindgen::JsValue>, fallback: f64| {
		value.ok().and_then(|v| v.as_f64()).unwrap_or(fallback)
	};
	match web_sys::window() {
		Some(window) => Viewport::new(
			size(window.inner_width(), 1280.0),
			size(window.inner_height(), 800.0),
		),
		None => Viewport::new(1280.0, 800.0),
	}
}

fn toggle_highlight(data: &mut GraphData, id: NodeId) {
	if let Some(node) = data.nodes.iter_mut().find(|node| node.id == id) {
		node.highlighted = !node.highlighted;
	}
}

/// Demo story viewer
#[component]
pub fn Home() -> impl IntoView {
	let story = import_json(DEMO_STORY, window_viewport());
	let (data, meta) = match &story {
		Ok(story) => {
			info!(
				"Loaded story \"{}\" with {} nodes and {} links",
				story.meta.title,
				story.data.nodes.len(),
				story.data.links.len()
			);
			(story.data.clone(), story.meta.clone())
		}
		Err(err) => {
			warn!("Demo story failed to load: {}", err);
			(GraphData::default(), StoryMeta::default())
		}
	};
	let notice = story.map(|story| {
		story.legacy_format.then(|| {
			view! {
				<p class="notice">"Older story format: some nodes were placed automatically."</p>
			}
		})
	});

	let graph = RwSignal::new(data);
	let fps = RwSignal::new(0u32);
	let title = meta.title.clone();
	let description = meta.description.clone().unwrap_or_default();
	let meta = StoredValue::new(meta);

	let on_settle = Callback::new(move |settled: GraphData| {
		meta.with_value(|meta| match export_json(&settled, meta, window_viewport()) {
			Ok(text) => debug!("Layout settled:\n{}", text),
			Err(err) => warn!("Could not export settled layout: {}", err),
		});
	});

	let toggles = move || {
		graph
			.with(|data| {
				data.nodes
					.iter()
					.map(|node| (node.id, node.name.clone(), node.highlighted))
					.collect::<Vec<_>>()
			})
			.into_iter()
			.map(|(id, name, highlighted)| {
				let class = if highlighted {
					"highlight-toggle active"
				} else {
					"highlight-toggle"
				};
				view! {
					<button
						class=class
						on:click=move |_| graph.update(|data| toggle_highlight(data, id))
					>
						{name}
					</button>
				}
			})
			.collect_view()
	};

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<RelationshipGraph data=graph fps=fps on_settle=on_settle />
				<div class="graph-overlay">
					<h1>{title}</h1>
					<p class="subtitle">{description}</p>
					{notice}
					<p class="fps">{move || format!("{} fps", fps.get())}</p>
					<div class="highlight-toggles">{toggles}</div>
				</div>
			</div>
		</ErrorBoundary>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn demo_story_parses() {
		let story = import_json(DEMO_STORY, Viewport::new(1000.0, 800.0)).unwrap();
		assert!(!story.legacy_format);
		assert!(story.data.nodes.len() >= 5);
		assert!(!story.data.links.is_empty());
	}

	#[test]
	fn toggling_flips_one_node() {
		let mut data = import_json(DEMO_STORY, Viewport::new(1000.0, 800.0)).unwrap().data;
		let before: Vec<bool> = data.nodes.iter().map(|n| n.highlighted).collect();
		let id = data.nodes[1].id;
		toggle_highlight(&mut data, id);
		assert_eq!(data.nodes[1].highlighted, !before[1]);
		assert_eq!(data.nodes[0].highlighted, before[0]);
	}
}
