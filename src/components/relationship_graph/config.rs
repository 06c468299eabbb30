use super::pulses::GlowTier;

/// Force simulation tunables. Field names follow the usual d3-force vocabulary.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutParameters {
	pub charge_strength: f64,
	/// Collision radius of every node; two centres closer than twice this are pushed apart.
	pub collide_radius: f64,
	pub link_strength: f64,
	pub alpha_decay: f64,
	pub alpha_min: f64,
	/// Fraction of velocity kept after each tick.
	pub velocity_decay: f64,
	pub drag_alpha_target: f64,
	/// Temperature the layout is reheated to when only link weights change.
	pub reweight_alpha: f64,
}

impl Default for LayoutParameters {
	fn default() -> Self {
		Self {
			charge_strength: -30.0,
			collide_radius: 40.0,
			link_strength: 1.0,
			alpha_decay: 0.05,
			alpha_min: 0.001,
			velocity_decay: 0.6,
			drag_alpha_target: 0.3,
			reweight_alpha: 0.3,
		}
	}
}

/// How many pulses a (link, direction, tier) group gets for a given rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PulseCountRule {
	pub divisor: f64,
	pub min: usize,
	pub max: usize,
}

impl PulseCountRule {
	pub fn count(&self, rate: f64) -> usize {
		if rate <= 0.0 {
			return 0;
		}
		let raw = (rate / self.divisor).ceil() as usize;
		raw.clamp(self.min, self.max)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct PulseStyle {
	pub color: String,
	pub scale: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PulseParameters {
	pub period_ms: f64,
	pub path_samples: usize,
	pub restale_threshold: f64,
	pub look_ahead: usize,
	pub dim_multiplier: f64,
	pub min_rate: f64,
	pub standard_count: PulseCountRule,
	pub bloom_count: PulseCountRule,
	pub arc_radius: f64,
	pub standard_blur: f64,
	pub bloom_blur: f64,
	pub forward_standard: PulseStyle,
	pub forward_bloom: PulseStyle,
	pub reverse_standard: PulseStyle,
	pub reverse_bloom: PulseStyle,
}

impl PulseParameters {
	pub fn count_rule(&self, tier: GlowTier) -> PulseCountRule {
		match tier {
			GlowTier::Standard => self.standard_count,
			GlowTier::Bloom => self.bloom_count,
		}
	}

	pub fn style(&self, reverse: bool, tier: GlowTier) -> &PulseStyle {
		match (reverse, tier) {
			(false, GlowTier::Standard) => &self.forward_standard,
			(false, GlowTier::Bloom) => &self.forward_bloom,
			(true, GlowTier::Standard) => &self.reverse_standard,
			(true, GlowTier::Bloom) => &self.reverse_bloom,
		}
	}

	pub fn blur(&self, tier: GlowTier) -> f64 {
		match tier {
			GlowTier::Standard => self.standard_blur,
			GlowTier::Bloom => self.bloom_blur,
		}
	}
}

impl Default for PulseParameters {
	fn default() -> Self {
		Self {
			period_ms: 2000.0,
			path_samples: 100,
			restale_threshold: 1.0,
			look_ahead: 5,
			dim_multiplier: 0.25,
			min_rate: 0.1,
			standard_count: PulseCountRule {
				divisor: 1.5,
				min: 2,
				max: 5,
			},
			bloom_count: PulseCountRule {
				divisor: 3.0,
				min: 1,
				max: 3,
			},
			arc_radius: 8.0,
			standard_blur: 5.0,
			bloom_blur: 15.0,
			forward_standard: PulseStyle {
				color: "#FF3030".into(),
				scale: 1.0,
			},
			forward_bloom: PulseStyle {
				color: "#FF0000".into(),
				scale: 1.2,
			},
			reverse_standard: PulseStyle {
				color: "#30A0FF".into(),
				scale: 1.0,
			},
			reverse_bloom: PulseStyle {
				color: "#00A0FF".into(),
				scale: 1.2,
			},
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneParameters {
	pub transition_ms: f64,
	pub node_radius: f64,
	pub hover_radius: f64,
	pub stroke_width: f64,
	pub hover_stroke_width: f64,
	pub label_offset: (f64, f64),
	pub background: String,
}

impl Default for SceneParameters {
	fn default() -> Self {
		Self {
			transition_ms: 200.0,
			node_radius: 10.0,
			hover_radius: 14.0,
			stroke_width: 2.0,
			hover_stroke_width: 4.0,
			label_offset: (15.0, 5.0),
			background: "#1a1a2e".into(),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphConfig {
	pub layout: LayoutParameters,
	pub pulses: PulseParameters,
	pub scene: SceneParameters,
	pub watchdog_interval_ms: f64,
	pub settle_delay_ms: f64,
	pub fps_window_ms: f64,
}

impl Default for GraphConfig {
	fn default() -> Self {
		Self {
			layout: LayoutParameters::default(),
			pulses: PulseParameters::default(),
			scene: SceneParameters::default(),
			watchdog_interval_ms: 1000.0,
			settle_delay_ms: 100.0,
			fps_window_ms: 500.0,
		}
	}
}
