use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use leptos::prelude::{IntervalHandle, set_interval_with_handle};
use log::warn;
use wasm_bindgen::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopControl {
	Continue,
	Stop,
}

struct LoopInner {
	name: &'static str,
	handle: Cell<Option<i32>>,
	callback: RefCell<Option<Closure<dyn FnMut(f64)>>>,
}

impl LoopInner {
	fn schedule(&self) {
		if self.handle.get().is_some() {
			return;
		}
		let Some(window) = web_sys::window() else {
			return;
		};
		let callback = self.callback.borrow();
		let Some(cb) = callback.as_ref() else {
			return;
		};
		match window.request_animation_frame(cb.as_ref().unchecked_ref()) {
			Ok(handle) => self.handle.set(Some(handle)),
			Err(err) => warn!("{}: request_animation_frame failed: {:?}", self.name, err),
		}
	}

	fn cancel(&self) {
		let Some(handle) = self.handle.take() else {
			return;
		};
		if let Some(window) = web_sys::window() {
			let _ = window.cancel_animation_frame(handle);
		}
	}
}

impl Drop for LoopInner {
	fn drop(&mut self) {
		self.cancel();
	}
}

/// A `requestAnimationFrame` loop. The body runs once per display frame with
/// the frame timestamp until it asks to stop or the loop is stopped from outside.
/// Both `start` and `stop` are idempotent.
#[derive(Clone)]
pub struct AnimationLoop {
	inner: Rc<LoopInner>,
}

impl AnimationLoop {
	pub fn new(name: &'static str, mut body: impl FnMut(f64) -> LoopControl + 'static) -> Self {
		let inner = Rc::new(LoopInner {
			name,
			handle: Cell::new(None),
			callback: RefCell::new(None),
		});
		let weak: Weak<LoopInner> = Rc::downgrade(&inner);
		*inner.callback.borrow_mut() = Some(Closure::new(move |timestamp: f64| {
			let Some(inner) = weak.upgrade() else {
				return;
			};
			inner.handle.set(None);
			if body(timestamp) == LoopControl::Continue {
				inner.schedule();
			}
		}));
		Self { inner }
	}

	pub fn start(&self) {
		self.inner.schedule();
	}

	pub fn stop(&self) {
		self.inner.cancel();
	}

	/// Whether a frame is currently scheduled.
	pub fn is_running(&self) -> bool {
		self.inner.handle.get().is_some()
	}
}

/// A stopped loop is only restarted while its view is still mounted.
fn needs_restart(live: bool, running: bool) -> bool {
	live && !running
}

struct WatchdogInner {
	target: AnimationLoop,
	live: Box<dyn Fn() -> bool>,
	handle: Cell<Option<IntervalHandle>>,
}

/// Periodically checks that a loop is still scheduled and restarts it if not.
#[derive(Clone)]
pub struct Watchdog {
	inner: Rc<WatchdogInner>,
}

impl Watchdog {
	pub fn new(target: AnimationLoop, live: impl Fn() -> bool + 'static) -> Self {
		Self {
			inner: Rc::new(WatchdogInner {
				target,
				live: Box::new(live),
				handle: Cell::new(None),
			}),
		}
	}

	/// One check. Returns whether the loop had to be restarted.
	pub fn check(&self) -> bool {
		let inner = &self.inner;
		if !needs_restart((inner.live)(), inner.target.is_running()) {
			return false;
		}
		warn!("{} loop found stopped; restarting it", inner.target.inner.name);
		inner.target.start();
		true
	}

	/// Starts the periodic check. Arming an armed watchdog does nothing.
	pub fn arm(&self, interval: Duration) {
		if self.is_armed() {
			return;
		}
		let this = self.clone();
		match set_interval_with_handle(
			move || {
				this.check();
			},
			interval,
		) {
			Ok(handle) => self.inner.handle.set(Some(handle)),
			Err(err) => warn!("Could not start loop watchdog: {:?}", err),
		}
	}

	pub fn disarm(&self) {
		if let Some(handle) = self.inner.handle.take() {
			handle.clear();
		}
	}

	pub fn is_armed(&self) -> bool {
		let handle = self.inner.handle.take();
		let armed = handle.is_some();
		self.inner.handle.set(handle);
		armed
	}
}

/// The loops driving one mounted view.
#[derive(Clone)]
pub struct ViewLoops {
	/// Per display frame: pulses, fps, repainting.
	pub frame: AnimationLoop,
	/// Runs while the layout is warm.
	pub layout: AnimationLoop,
	pub watchdog: Watchdog,
}

impl ViewLoops {
	/// Stops everything. Safe to call more than once.
	pub fn stop_all(&self) {
		self.watchdog.disarm();
		self.frame.stop();
		self.layout.stop();
	}
}

/// Current high resolution time in milliseconds, matching rAF timestamps.
pub fn now() -> f64 {
	web_sys::window()
		.and_then(|window| window.performance())
		.map(|performance| performance.now())
		.unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn restart_only_when_live_and_stopped() {
		assert!(needs_restart(true, false));
		assert!(!needs_restart(true, true));
		assert!(!needs_restart(false, false));
		assert!(!needs_restart(false, true));
	}
}
