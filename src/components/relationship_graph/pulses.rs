use std::collections::HashSet;
use std::f64::consts::PI;

use super::config::PulseParameters;
use super::emphasis::Emphasis;
use super::geometry::{Point, path_is_stale, sample_path};
use super::store::GraphStore;
use super::types::{GraphLink, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GlowTier {
	/// Regular communication.
	Standard,
	/// Meaningful communication: fewer pulses, wider glow.
	Bloom,
}

/// Direction/tier combinations of a link, in the order they are spawned.
const GROUPS: [(bool, GlowTier); 4] = [
	(false, GlowTier::Standard),
	(false, GlowTier::Bloom),
	(true, GlowTier::Standard),
	(true, GlowTier::Bloom),
];

type GroupKey = (NodeId, NodeId, bool, GlowTier);

fn group_rate(link: &GraphLink, reverse: bool, tier: GlowTier) -> f64 {
	let rate = if reverse {
		&link.target_to_source
	} else {
		&link.source_to_target
	};
	match tier {
		GlowTier::Standard => rate.regular(),
		GlowTier::Bloom => rate.meaningful(),
	}
}

/// Fade in over the first tenth of a loop, fade out over the last.
pub fn envelope(progress: f64) -> f64 {
	if progress < 0.1 {
		progress * 10.0
	} else if progress > 0.9 {
		(1.0 - progress) * 10.0
	} else {
		1.0
	}
}

/// One directional pulse looping along a link for as long as the link exists.
#[derive(Clone, Debug, PartialEq)]
pub struct Pulse {
	pub source: NodeId,
	pub target: NodeId,
	/// Sampled from source to target; reverse pulses read it back to front.
	pub path: Vec<Point>,
	pub progress: f64,
	pub opacity: f64,
	pub color: String,
	pub scale: f64,
	pub reverse: bool,
	pub started_at: f64,
	pub period_ms: f64,
	pub tier: GlowTier,
}

impl Pulse {
	fn key(&self) -> GroupKey {
		(self.source, self.target, self.reverse, self.tier)
	}

	pub fn progress_at(&self, now: f64) -> f64 {
		if self.period_ms <= 0.0 {
			return 0.0;
		}
		(now - self.started_at).rem_euclid(self.period_ms) / self.period_ms
	}

	fn point(&self, index: usize) -> Point {
		if self.reverse {
			self.path[self.path.len() - 1 - index]
		} else {
			self.path[index]
		}
	}

	/// Where and how to draw this pulse at its current progress.
	fn sprite(&self, look_ahead: usize, emphasis: f64) -> Option<PulseSprite<'_>> {
		let last = self.path.len().checked_sub(1)?;
		let index = ((self.progress * last as f64).floor() as usize).min(last);
		let position = self.point(index);
		let look = if self.reverse {
			index.saturating_sub(look_ahead)
		} else {
			(index + look_ahead).min(last)
		};
		let toward = self.point(look);
		let mut angle = (toward.y - position.y).atan2(toward.x - position.x);
		if self.reverse {
			angle += PI;
		}
		Some(PulseSprite {
			position,
			angle,
			opacity: self.opacity * emphasis,
			color: &self.color,
			scale: self.scale,
			tier: self.tier,
		})
	}
}

/// Draw instruction for one pulse in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PulseSprite<'a> {
	pub position: Point,
	pub angle: f64,
	pub opacity: f64,
	pub color: &'a str,
	pub scale: f64,
	pub tier: GlowTier,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reconciled {
	pub created: usize,
	pub dropped: usize,
}

pub struct PulseEngine {
	params: PulseParameters,
	pulses: Vec<Pulse>,
}

impl PulseEngine {
	pub fn new(params: PulseParameters) -> Self {
		Self {
			params,
			pulses: Vec::new(),
		}
	}

	#[cfg(test)]
	pub fn pulses(&self) -> &[Pulse] {
		&self.pulses
	}

	pub fn len(&self) -> usize {
		self.pulses.len()
	}

	#[cfg(test)]
	pub fn is_empty(&self) -> bool {
		self.pulses.is_empty()
	}

	pub fn clear(&mut self) {
		self.pulses.clear();
	}

	/// Drops every pulse whose source or target node is gone.
	pub fn prune(&mut self, store: &GraphStore) -> usize {
		let before = self.pulses.len();
		self.pulses
			.retain(|pulse| store.contains(pulse.source) && store.contains(pulse.target));
		before - self.pulses.len()
	}

	/// Re-samples paths from current node positions. Without `force`, only
	/// paths whose endpoints drifted past the threshold are touched.
	pub fn refresh_paths(&mut self, store: &GraphStore, force: bool) {
		let (samples, threshold) = (self.params.path_samples, self.params.restale_threshold);
		for pulse in &mut self.pulses {
			let (Some(source), Some(target)) =
				(store.position(pulse.source), store.position(pulse.target))
			else {
				continue;
			};
			if force || path_is_stale(&pulse.path, source, target, threshold) {
				pulse.path = sample_path(source, target, samples);
			}
		}
	}

	/// Brings the pulse set in line with the current links and rates.
	///
	/// Groups that still have a positive rate keep their pulses (phase and start
	/// time included) and only get fresh paths. Groups whose rate dropped to zero,
	/// or whose link or nodes disappeared, lose their pulses. Groups with a
	/// positive rate and no pulses are spawned, staggered across one interval.
	pub fn reconcile(&mut self, store: &GraphStore, now: f64, force_paths: bool) -> Reconciled {
		let mut dropped = self.prune(store);

		let wanted: Vec<(GroupKey, &GraphLink, f64)> = store
			.links()
			.iter()
			.flat_map(|link| {
				GROUPS.into_iter().filter_map(move |(reverse, tier)| {
					let rate = group_rate(link, reverse, tier);
					(rate > 0.0).then_some(((link.source, link.target, reverse, tier), link, rate))
				})
			})
			.collect();
		let wanted_keys: HashSet<GroupKey> = wanted.iter().map(|(key, _, _)| *key).collect();

		let before = self.pulses.len();
		self.pulses.retain(|pulse| wanted_keys.contains(&pulse.key()));
		dropped += before - self.pulses.len();

		self.refresh_paths(store, force_paths);

		let existing: HashSet<GroupKey> = self.pulses.iter().map(Pulse::key).collect();
		let mut created = 0;
		for (key, link, rate) in wanted {
			if existing.contains(&key) {
				continue;
			}
			let Some((source, target)) = store.link_endpoints(link) else {
				continue;
			};
			let path = sample_path(source, target, self.params.path_samples);
			created += self.spawn(key, path, rate, now);
		}

		Reconciled { created, dropped }
	}

	fn spawn(&mut self, key: GroupKey, path: Vec<Point>, rate: f64, now: f64) -> usize {
		let (source, target, reverse, tier) = key;
		let count = self.params.count_rule(tier).count(rate);
		let interval = 60_000.0 / rate.max(self.params.min_rate);
		let style = self.params.style(reverse, tier);
		for i in 0..count {
			let progress = i as f64 / count as f64;
			self.pulses.push(Pulse {
				source,
				target,
				path: path.clone(),
				progress,
				opacity: envelope(progress),
				color: style.color.clone(),
				scale: style.scale,
				reverse,
				started_at: now - i as f64 * (interval / count as f64),
				period_ms: self.params.period_ms,
				tier,
			});
		}
		count
	}

	/// Per-frame update: retire orphans, refresh drifted paths, advance
	/// progress and fade, and return what to draw.
	pub fn advance(
		&mut self,
		store: &GraphStore,
		emphasis: &Emphasis,
		now: f64,
	) -> Vec<PulseSprite<'_>> {
		self.prune(store);
		self.refresh_paths(store, false);
		for pulse in &mut self.pulses {
			pulse.progress = pulse.progress_at(now);
			pulse.opacity = envelope(pulse.progress);
		}

		let (look_ahead, dimmed) = (self.params.look_ahead, self.params.dim_multiplier);
		self.pulses
			.iter()
			.filter_map(|pulse| {
				let multiplier = emphasis.pulse_multiplier(pulse.source, pulse.target, dimmed);
				pulse.sprite(look_ahead, multiplier)
			})
			.collect()
	}
}
