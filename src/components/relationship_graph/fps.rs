/// Counts frames over a rolling window and reports the achieved rate.
#[derive(Clone, Debug)]
pub struct FpsCounter {
	window_ms: f64,
	window_start: Option<f64>,
	frames: u32,
}

impl FpsCounter {
	pub fn new(window_ms: f64) -> Self {
		Self {
			window_ms,
			window_start: None,
			frames: 0,
		}
	}

	/// Records one frame at `now` and returns a fresh reading whenever a window closes.
	pub fn frame(&mut self, now: f64) -> Option<u32> {
		// The frame that opens a window only marks its start.
		let Some(start) = self.window_start else {
			self.window_start = Some(now);
			return None;
		};
		self.frames += 1;
		let elapsed = now - start;
		if elapsed < self.window_ms || elapsed <= 0.0 {
			return None;
		}
		let fps = (self.frames as f64 / elapsed * 1000.0).round() as u32;
		self.frames = 0;
		self.window_start = Some(now);
		Some(fps)
	}
}
