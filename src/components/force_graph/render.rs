use std::collections::BTreeMap;
use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::scene::{ElementKey, FrameInfo, HoverRole, RenderTarget, Shape, VisualElement};

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

/// Retained element set drawn onto a 2D canvas.
pub struct CanvasTarget {
	ctx: CanvasRenderingContext2d,
	elements: BTreeMap<ElementKey, VisualElement>,
}

impl CanvasTarget {
	pub fn new(ctx: CanvasRenderingContext2d) -> Self {
		Self {
			ctx,
			elements: BTreeMap::new(),
		}
	}
}

impl RenderTarget for CanvasTarget {
	fn mount(&mut self, element: &VisualElement) {
		self.elements.insert(element.key.clone(), element.clone());
	}

	fn update(&mut self, element: &VisualElement) {
		if let Some(slot) = self.elements.get_mut(&element.key) {
			*slot = element.clone();
		}
	}

	fn remove(&mut self, key: &ElementKey) {
		self.elements.remove(key);
	}

	fn present(&mut self, frame: &FrameInfo) {
		let ctx = &self.ctx;
		ctx.set_fill_style_str("#1a1a2e");
		ctx.fill_rect(0.0, 0.0, frame.width, frame.height);
		ctx.save();
		let _ = ctx.translate(frame.transform.x, frame.transform.y);
		let _ = ctx.scale(frame.transform.k, frame.transform.k);
		// BTreeMap order is paint order: edges, nodes, labels
		for element in self.elements.values() {
			match &element.shape {
				Shape::Edge { .. } => draw_edge(ctx, element, frame),
				Shape::Node { .. } => draw_node(ctx, element, frame),
				Shape::Label { .. } => draw_label(ctx, element, frame),
			}
		}
		let _ = ctx.set_line_dash(&js_sys::Array::new());
		ctx.restore();
	}
}

fn draw_edge(ctx: &CanvasRenderingContext2d, element: &VisualElement, frame: &FrameInfo) {
	let Shape::Edge {
		x1,
		y1,
		x2,
		y2,
		source_radius,
		target_radius,
	} = element.shape
	else {
		return;
	};
	let k = frame.transform.k;
	let (line_width, dash, gap, arrow_size) = (1.5 / k, 8.0 / k, 4.0 / k, 8.0 / k);
	let (dx, dy) = (x2 - x1, y2 - y1);
	let dist = (dx * dx + dy * dy).sqrt();
	if dist < 0.001 {
		return;
	}

	let opacity = element.flags.opacity();
	let t = ease_out_cubic(frame.hover_t);
	// hovered neighbourhood brightens, everything else fades with t
	let (edge_alpha, width) = match element.flags.hover {
		HoverRole::None if frame.hover_t > 0.0 => {
			(0.6 * opacity * (1.0 - 0.75 * t), line_width * (1.0 - 0.3 * t))
		}
		HoverRole::None => (0.6 * opacity, line_width),
		_ => ((0.6 + 0.3 * t) * opacity.max(0.5), line_width * (1.0 + 0.3 * t)),
	};
	let arrow_alpha = (edge_alpha + 0.2).min(1.0);

	ctx.set_stroke_style_str(&format!("rgba(100, 180, 255, {})", edge_alpha));
	ctx.set_line_width(width);
	let _ = ctx.set_line_dash(&js_sys::Array::of2(
		&JsValue::from_f64(dash),
		&JsValue::from_f64(gap),
	));
	ctx.set_line_dash_offset(-(frame.flow_time * 30.0) % (dash + gap));

	let (ux, uy) = (dx / dist, dy / dist);
	ctx.begin_path();
	ctx.move_to(x1 + ux * source_radius, y1 + uy * source_radius);
	ctx.line_to(
		x2 - ux * (target_radius + arrow_size),
		y2 - uy * (target_radius + arrow_size),
	);
	ctx.stroke();

	let _ = ctx.set_line_dash(&js_sys::Array::new());
	ctx.set_fill_style_str(&format!("rgba(100, 180, 255, {})", arrow_alpha));
	let (tip_x, tip_y) = (x2 - ux * target_radius, y2 - uy * target_radius);
	let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
	let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
	ctx.begin_path();
	ctx.move_to(tip_x, tip_y);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();
}

fn draw_node(ctx: &CanvasRenderingContext2d, element: &VisualElement, frame: &FrameInfo) {
	let Shape::Node {
		x,
		y,
		radius,
		ref color,
	} = element.shape
	else {
		return;
	};
	let (t, k) = (ease_out_cubic(frame.hover_t), frame.transform.k);
	let flags = element.flags;

	let (alpha, radius, glow_radius) = match flags.hover {
		HoverRole::Hovered => (
			1.0,
			radius * (1.0 + 0.35 * t),
			radius * (1.8 + 1.2 * t),
		),
		HoverRole::Neighbor => (1.0, radius * (1.0 + 0.2 * t), radius * (1.4 + 0.6 * t)),
		HoverRole::None => (
			flags.opacity() * (1.0 - 0.7 * t),
			radius * (1.0 - 0.15 * t),
			0.0,
		),
	};

	if glow_radius > 0.0 && t > 0.01 {
		if let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, glow_radius) {
			let glow = if flags.hover == HoverRole::Hovered {
				0.35 * t
			} else {
				0.2 * t
			};
			let _ = gradient.add_color_stop(0.0, &format!("rgba(255, 255, 255, {})", glow));
			let _ = gradient.add_color_stop(0.6, &format!("rgba(200, 220, 255, {})", glow * 0.3));
			let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
			ctx.begin_path();
			let _ = ctx.arc(x, y, glow_radius, 0.0, 2.0 * PI);
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
			ctx.fill();
		}
	}

	ctx.set_global_alpha(alpha);
	ctx.begin_path();
	let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(color);
	ctx.fill();
	ctx.set_global_alpha(1.0);

	if flags.selected || (flags.hover == HoverRole::Hovered && t > 0.01) {
		let ring = if flags.selected { 0.9 } else { 0.7 * t };
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius + 2.0 / k, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", ring));
		ctx.set_line_width(1.5 / k);
		ctx.stroke();
	}
}

fn draw_label(ctx: &CanvasRenderingContext2d, element: &VisualElement, frame: &FrameInfo) {
	let Shape::Label { x, y, ref text } = element.shape else {
		return;
	};
	let t = ease_out_cubic(frame.hover_t);
	let alpha = match element.flags.hover {
		HoverRole::None => element.flags.opacity() * 0.8 * (1.0 - 0.7 * t),
		_ => 1.0,
	};
	ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", alpha));
	ctx.set_font(&format!("{}px sans-serif", 10.0 / frame.transform.k.max(0.5)));
	let _ = ctx.fill_text(text, x, y);
}
