use std::f64::consts::PI;

use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::config::PulseParameters;
use super::pulses::PulseSprite;
use super::scene::Scene;

pub struct Surface {
	pub ctx: CanvasRenderingContext2d,
	pub width: f64,
	pub height: f64,
	pub resized: bool,
}

/// Matches the backing store to the displayed size (only touching it on a
/// mismatch) and hands back the 2d context. `None` means skip this frame.
pub fn prepare(canvas: &HtmlCanvasElement) -> Option<Surface> {
	let rect = canvas.get_bounding_client_rect();
	let (width, height) = (rect.width().floor(), rect.height().floor());
	let resized = canvas.width() != width as u32 || canvas.height() != height as u32;
	if resized {
		canvas.set_width(width as u32);
		canvas.set_height(height as u32);
	}
	let ctx = canvas
		.get_context("2d")
		.ok()
		.flatten()?
		.dyn_into::<CanvasRenderingContext2d>()
		.ok()?;
	Some(Surface {
		ctx,
		width,
		height,
		resized,
	})
}

/// Paints nodes, labels and links from the retained scene.
pub fn draw_scene(surface: &Surface, scene: &Scene, now: f64) {
	let ctx = &surface.ctx;
	let params = scene.params();
	ctx.set_fill_style_str(&params.background);
	ctx.fill_rect(0.0, 0.0, surface.width, surface.height);

	// Links underneath nodes.
	ctx.set_stroke_style_str("white");
	for link in scene.links() {
		ctx.set_global_alpha(link.opacity.value_at(now));
		ctx.set_line_width(link.stroke_width.value_at(now));
		ctx.begin_path();
		ctx.move_to(link.source.x, link.source.y);
		ctx.line_to(link.target.x, link.target.y);
		ctx.stroke();
	}

	let (label_dx, label_dy) = params.label_offset;
	ctx.set_font("14px sans-serif");
	for node in scene.nodes() {
		let (x, y) = (node.position.x, node.position.y);
		ctx.set_global_alpha(node.opacity.value_at(now));
		ctx.begin_path();
		let _ = ctx.arc(x, y, node.radius.value_at(now).max(0.0), 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&node.fill.value_at(now).to_css());
		ctx.fill();

		ctx.set_fill_style_str("white");
		let _ = ctx.fill_text(&node.label, x + label_dx, y + label_dy);
	}
	ctx.set_global_alpha(1.0);
}

/// Clears the overlay and paints one crescent per pulse.
pub fn draw_pulses(surface: &Surface, sprites: &[PulseSprite<'_>], params: &PulseParameters) {
	let ctx = &surface.ctx;
	ctx.clear_rect(0.0, 0.0, surface.width, surface.height);

	for sprite in sprites {
		if sprite.opacity <= 0.0 {
			continue;
		}
		ctx.save();
		ctx.set_global_alpha(sprite.opacity);
		let _ = ctx.translate(sprite.position.x, sprite.position.y);
		let _ = ctx.rotate(sprite.angle - PI / 2.0);
		ctx.set_shadow_blur(params.blur(sprite.tier));
		ctx.set_shadow_color(sprite.color);

		let radius = params.arc_radius * sprite.scale;
		ctx.begin_path();
		let _ = ctx.arc(0.0, 0.0, radius, 0.0, PI);
		let _ = ctx.arc_with_anticlockwise(0.0, 0.0, radius * 0.6, PI, 0.0, true);
		ctx.close_path();
		ctx.set_fill_style_str(sprite.color);
		ctx.fill();
		ctx.restore();
	}
}
