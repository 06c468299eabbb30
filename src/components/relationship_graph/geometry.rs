#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn distance_to(self, other: Point) -> f64 {
		let (dx, dy) = (other.x - self.x, other.y - self.y);
		(dx * dx + dy * dy).sqrt()
	}

	pub fn lerp(self, other: Point, t: f64) -> Point {
		Point::new(
			self.x + (other.x - self.x) * t,
			self.y + (other.y - self.y) * t,
		)
	}
}

/// Samples `count + 1` evenly spaced points from `source` to `target`, both ends included.
pub fn sample_path(source: Point, target: Point, count: usize) -> Vec<Point> {
	if count == 0 {
		return vec![source];
	}
	(0..=count)
		.map(|i| source.lerp(target, i as f64 / count as f64))
		.collect()
}

/// True when either endpoint has drifted at least `threshold` away from the
/// ends of `path`. An empty path is always stale.
pub fn path_is_stale(path: &[Point], source: Point, target: Point, threshold: f64) -> bool {
	let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
		return true;
	};
	first.distance_to(source) >= threshold || last.distance_to(target) >= threshold
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sample_path_includes_both_ends() {
		let points = sample_path(Point::new(0.0, 0.0), Point::new(100.0, 50.0), 100);
		assert_eq!(points.len(), 101);
		assert_eq!(points[0], Point::new(0.0, 0.0));
		assert_eq!(points[100], Point::new(100.0, 50.0));
		assert!((points[50].x - 50.0).abs() < 1e-9);
		assert!((points[50].y - 25.0).abs() < 1e-9);
	}

	#[test]
	fn zero_count_degenerates_to_source() {
		let points = sample_path(Point::new(3.0, 4.0), Point::new(9.0, 9.0), 0);
		assert_eq!(points, vec![Point::new(3.0, 4.0)]);
	}

	#[test]
	fn staleness_uses_unit_threshold() {
		let path = sample_path(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 10);
		assert!(!path_is_stale(&path, Point::new(0.5, 0.5), Point::new(10.0, 0.0), 1.0));
		assert!(path_is_stale(&path, Point::new(0.0, 0.0), Point::new(11.0, 0.0), 1.0));
		assert!(path_is_stale(&[], Point::new(0.0, 0.0), Point::new(0.0, 0.0), 1.0));
	}
}
