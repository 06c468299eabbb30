use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use leptos::prelude::*;
use log::debug;
use send_wrapper::SendWrapper;
use web_sys::{HtmlCanvasElement, MouseEvent};

use super::config::GraphConfig;
use super::frame_loop::{self, AnimationLoop, LoopControl, ViewLoops, Watchdog};
use super::geometry::Point;
use super::render;
use super::simulation::Tick;
use super::state::GraphViewState;
use super::types::GraphData;

type SharedState = Rc<RefCell<Option<GraphViewState>>>;

const STRUCTURE_STYLE: &str =
	"position: absolute; inset: 0; width: 100%; height: 100%; display: block; cursor: grab;";
/// The overlay sits above the structure and lets pointer input through.
const OVERLAY_STYLE: &str =
	"position: absolute; inset: 0; width: 100%; height: 100%; pointer-events: none; z-index: 10;";

fn pointer(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> Point {
	let rect = canvas.get_bounding_client_rect();
	Point::new(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

/// Relationship graph with animated communication pulses.
///
/// Structure (links, nodes, labels) is painted on the lower canvas from a
/// retained scene; pulses are repainted every frame on an overlay that lets
/// pointer input through.
#[component]
pub fn RelationshipGraph(
	#[prop(into)] data: Signal<GraphData>,
	#[prop(optional)] config: Option<GraphConfig>,
	#[prop(optional)] fps: Option<RwSignal<u32>>,
	#[prop(optional)] on_settle: Option<Callback<GraphData>>,
) -> impl IntoView {
	let config = config.unwrap_or_default();
	let structure_ref = NodeRef::<leptos::html::Canvas>::new();
	let pulse_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: SharedState = Rc::new(RefCell::new(None));
	let loops: Rc<RefCell<Option<ViewLoops>>> = Rc::new(RefCell::new(None));
	let (state_init, loops_init) = (state.clone(), loops.clone());

	Effect::new(move |_| {
		let data = data.get();
		let (Some(structure), Some(overlay)) = (structure_ref.get(), pulse_ref.get()) else {
			return;
		};
		let now = frame_loop::now();

		if let Some(ref mut s) = *state_init.borrow_mut() {
			s.replace_data(&data, now);
			if let Some(loops) = loops_init.borrow().as_ref() {
				loops.layout.start();
			}
			return;
		}

		let rect = structure.get_bounding_client_rect();
		let (w, h) = match (rect.width(), rect.height()) {
			(w, h) if w > 0.0 && h > 0.0 => (w, h),
			_ => (800.0, 600.0),
		};
		*state_init.borrow_mut() = Some(GraphViewState::new(&data, config.clone(), w, h, now));

		let state_layout = state_init.clone();
		let layout = AnimationLoop::new("layout", move |timestamp| {
			let (tick, snapshot) = {
				let mut guard = state_layout.borrow_mut();
				let Some(s) = guard.as_mut() else {
					return LoopControl::Stop;
				};
				let tick = s.layout_tick(timestamp);
				let snapshot = (tick == Tick::Settled && on_settle.is_some()).then(|| s.snapshot());
				(tick, snapshot)
			};
			if let (Some(callback), Some(snapshot)) = (on_settle, snapshot) {
				callback.run(snapshot);
			}
			match tick {
				Tick::Moved => LoopControl::Continue,
				Tick::Settled | Tick::Idle => LoopControl::Stop,
			}
		});

		let (state_frame, pulse_params) = (state_init.clone(), config.pulses.clone());
		let layout_frame = layout.clone();
		let frame = AnimationLoop::new("frame", move |timestamp| {
			let mut guard = state_frame.borrow_mut();
			let Some(s) = guard.as_mut() else {
				return LoopControl::Continue;
			};
			if let Some(surface) = render::prepare(&structure) {
				if surface.resized && s.resize(surface.width, surface.height) {
					layout_frame.start();
				}
				if s.scene.needs_paint(timestamp) {
					render::draw_scene(&surface, &s.scene, timestamp);
					s.scene.mark_painted();
				}
			}
			let overlay_surface = render::prepare(&overlay);
			let output = s.frame(timestamp);
			if let Some(surface) = overlay_surface {
				render::draw_pulses(&surface, &output.sprites, &pulse_params);
			}
			if let (Some(sink), Some(reading)) = (fps, output.fps) {
				sink.set(reading);
			}
			LoopControl::Continue
		});

		layout.start();
		frame.start();

		let state_watch = state_init.clone();
		let watchdog = Watchdog::new(frame.clone(), move || state_watch.borrow().is_some());
		watchdog.arm(Duration::from_millis(config.watchdog_interval_ms as u64));

		*loops_init.borrow_mut() = Some(ViewLoops {
			frame,
			layout,
			watchdog,
		});
	});

	let teardown = SendWrapper::new((state.clone(), loops.clone()));
	on_cleanup(move || {
		let (state, loops) = &*teardown;
		if let Some(loops) = loops.borrow_mut().take() {
			loops.stop_all();
		}
		if let Some(mut s) = state.borrow_mut().take() {
			s.teardown();
		}
		debug!("Graph view torn down");
	});

	let (state_md, loops_md) = (state.clone(), loops.clone());
	let on_mousedown = move |ev: MouseEvent| {
		let Some(canvas) = structure_ref.get() else {
			return;
		};
		let point = pointer(&canvas, &ev);
		let grabbed = match state_md.borrow_mut().as_mut() {
			Some(s) => s.begin_drag(point, frame_loop::now()),
			None => false,
		};
		if grabbed {
			if let Some(loops) = loops_md.borrow().as_ref() {
				loops.layout.start();
			}
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = structure_ref.get() else {
			return;
		};
		let point = pointer(&canvas, &ev);
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			if s.drag().is_some() {
				s.drag_to(point);
			} else {
				let hovered = s.node_at(point);
				s.set_hover(hovered, frame_loop::now());
			}
		}
	};

	let (state_mu, loops_mu) = (state.clone(), loops.clone());
	let on_mouseup = move |_: MouseEvent| {
		let released = match state_mu.borrow_mut().as_mut() {
			Some(s) => s.end_drag(frame_loop::now()),
			None => false,
		};
		if released {
			if let Some(loops) = loops_mu.borrow().as_ref() {
				loops.layout.start();
			}
		}
	};

	let state_ml = state;
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			let now = frame_loop::now();
			s.end_drag(now);
			s.set_hover(None, now);
		}
	};

	view! {
		<div
			class="relationship-graph"
			style="position: relative; width: 100%; height: 100%; overflow: hidden;"
		>
			<canvas
				node_ref=structure_ref
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				style=STRUCTURE_STYLE
			/>
			<canvas
				node_ref=pulse_ref
				style=OVERLAY_STYLE
			/>
		</div>
	}
}
