//! Canvas rendering for the dependency graph.
//!
//! Rendering uses multiple passes for correct z-ordering:
//! 1. Background (screen space)
//! 2. Dimmed edges, then emphasised edges with their arrow heads (world space)
//! 3. Node boxes with team accent, label and team line
//!
//! Emphasis is derived per frame from the hovered id and the adjacency list.

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::hover::{is_edge_emphasized, is_emphasized};
use super::model::GraphNode;
use super::scale::{ScaleConfig, ScaledValues};
use super::theme::{Color, Theme};
use super::view::{EdgeRoute, GraphViewState};

/// Longest label drawn before truncation, in characters.
const MAX_LABEL_CHARS: usize = 22;

/// Attempt to smooth values that would otherwise cause abrupt visual changes.
fn smooth_step(t: f64) -> f64 {
	t * t * (3.0 - 2.0 * t)
}

/// Alpha multiplier of a de-emphasised element at the current fade level.
fn dimmed_alpha(state: &GraphViewState, theme: &Theme) -> f64 {
	1.0 - (1.0 - theme.dim_alpha) * smooth_step(state.fade.level())
}

/// Renders the complete graph to the canvas.
pub fn render(
	state: &GraphViewState,
	ctx: &CanvasRenderingContext2d,
	config: &ScaleConfig,
	theme: &Theme,
) {
	let scale = ScaledValues::new(config, state.transform.k);

	ctx.set_fill_style_str(&theme.background.to_css());
	ctx.fill_rect(0.0, 0.0, state.width, state.height);

	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);

	draw_edges(state, ctx, config, &scale, theme);
	draw_nodes(state, ctx, &scale, theme);

	ctx.restore();
}

fn draw_edges(
	state: &GraphViewState,
	ctx: &CanvasRenderingContext2d,
	config: &ScaleConfig,
	scale: &ScaledValues,
	theme: &Theme,
) {
	let source = state.dim_source();
	let dim = dimmed_alpha(state, theme);
	let dash_offset = scale.dash_offset(state.flow_time, config.edge.flow_speed);

	// Dimmed edges first so emphasised ones are never drawn underneath.
	let (emphasised, dimmed): (Vec<&EdgeRoute>, Vec<&EdgeRoute>) = state
		.routes
		.iter()
		.partition(|r| is_edge_emphasized(source, &r.id.consumer, &r.id.provider));

	for route in dimmed {
		let color = edge_color(route, theme, false).fade(dim);
		draw_edge(ctx, config, scale, route, color, scale.edge_line_width, dash_offset);
	}
	for route in emphasised {
		let hovered = source.is_some();
		let color = edge_color(route, theme, hovered);
		let width = if hovered {
			scale.edge_line_width * (1.0 + 0.6 * smooth_step(state.fade.level()))
		} else {
			scale.edge_line_width
		};
		draw_edge(ctx, config, scale, route, color, width, dash_offset);
	}

	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn edge_color(route: &EdgeRoute, theme: &Theme, highlighted: bool) -> Color {
	if highlighted {
		theme.edge.highlight
	} else if route.animated {
		theme.edge.animated
	} else {
		theme.edge.color
	}
}

fn draw_edge(
	ctx: &CanvasRenderingContext2d,
	config: &ScaleConfig,
	scale: &ScaledValues,
	route: &EdgeRoute,
	color: Color,
	width: f64,
	dash_offset: f64,
) {
	let Some((&first, rest)) = route.points.split_first() else {
		return;
	};
	let Some(&last) = rest.last() else {
		return;
	};

	ctx.set_stroke_style_str(&color.to_css());
	ctx.set_line_width(width);
	if route.animated {
		let (dash, gap) = config.edge.dash_pattern;
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(dash),
			&JsValue::from_f64(gap),
		));
		ctx.set_line_dash_offset(dash_offset);
	} else {
		let _ = ctx.set_line_dash(&js_sys::Array::new());
	}

	// Stop the line at the arrow's base; the head covers the rest.
	let prev = rest
		.len()
		.checked_sub(2)
		.map(|i| rest[i])
		.unwrap_or(first);
	let (dx, dy) = (last.0 - prev.0, last.1 - prev.1);
	let len = (dx * dx + dy * dy).sqrt();
	let (ux, uy) = if len > 0.001 { (dx / len, dy / len) } else { (1.0, 0.0) };
	let arrow = scale.arrow_size.min(len);

	ctx.begin_path();
	ctx.move_to(first.0, first.1);
	for &(x, y) in &rest[..rest.len() - 1] {
		ctx.line_to(x, y);
	}
	ctx.line_to(last.0 - ux * arrow, last.1 - uy * arrow);
	ctx.stroke();

	let _ = ctx.set_line_dash(&js_sys::Array::new());
	ctx.set_fill_style_str(&color.to_css());
	let (back_x, back_y) = (last.0 - ux * arrow, last.1 - uy * arrow);
	let (px, py) = (-uy * arrow * 0.5, ux * arrow * 0.5);
	ctx.begin_path();
	ctx.move_to(last.0, last.1);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();
}

fn draw_nodes(
	state: &GraphViewState,
	ctx: &CanvasRenderingContext2d,
	scale: &ScaledValues,
	theme: &Theme,
) {
	let source = state.dim_source();
	let dim = dimmed_alpha(state, theme);

	// Pass 1: dimmed nodes. Pass 2: emphasised nodes on top.
	for pass_emphasised in [false, true] {
		for node in &state.graph.model.nodes {
			let emphasised = is_emphasized(source, &node.id, &state.adjacency);
			if emphasised != pass_emphasised {
				continue;
			}
			let alpha = if emphasised { 1.0 } else { dim };
			let hovered = source == Some(node.id.as_str()) && state.fade.level() > 0.0;
			draw_node(ctx, node, state.node_size, scale, theme, alpha, hovered);
		}
	}
}

fn rounded_rect(ctx: &CanvasRenderingContext2d, x: f64, y: f64, w: f64, h: f64, r: f64) {
	let r = r.min(w / 2.0).min(h / 2.0);
	ctx.begin_path();
	ctx.move_to(x + r, y);
	let _ = ctx.arc_to(x + w, y, x + w, y + h, r);
	let _ = ctx.arc_to(x + w, y + h, x, y + h, r);
	let _ = ctx.arc_to(x, y + h, x, y, r);
	let _ = ctx.arc_to(x, y, x + w, y, r);
	ctx.close_path();
}

fn truncate_label(label: &str) -> String {
	if label.chars().count() <= MAX_LABEL_CHARS {
		label.to_string()
	} else {
		let mut out: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
		out.push('…');
		out
	}
}

fn draw_node(
	ctx: &CanvasRenderingContext2d,
	node: &GraphNode,
	(w, h): (f64, f64),
	scale: &ScaledValues,
	theme: &Theme,
	alpha: f64,
	hovered: bool,
) {
	let style = &theme.node;
	let (x, y) = (node.x, node.y);
	let accent = theme.palette.for_team(node.team.as_deref());

	ctx.set_global_alpha(alpha);

	rounded_rect(ctx, x, y, w, h, style.corner_radius);
	let fill = if node.standout {
		style.fill.lerp(accent, 0.12)
	} else {
		style.fill
	};
	ctx.set_fill_style_str(&fill.to_css());
	ctx.fill();

	ctx.save();
	ctx.clip();
	ctx.set_fill_style_str(&accent.to_css());
	ctx.fill_rect(x, y, style.accent_width, h);
	ctx.restore();

	rounded_rect(ctx, x, y, w, h, style.corner_radius);
	let (border, border_width) = if node.standout {
		(style.standout_border, scale.border_width * 2.5)
	} else if hovered {
		(accent.darken(0.2), scale.border_width * 2.0)
	} else {
		(style.border, scale.border_width)
	};
	ctx.set_stroke_style_str(&border.to_css());
	ctx.set_line_width(border_width);
	ctx.stroke();

	let text_x = x + style.accent_width + 10.0;
	ctx.set_text_baseline("middle");
	ctx.set_fill_style_str(&style.label.to_css());
	ctx.set_font(&scale.label_font);
	let label_y = if scale.show_sublabel { y + h * 0.36 } else { y + h / 2.0 };
	let _ = ctx.fill_text(&truncate_label(node.label()), text_x, label_y);

	if scale.show_sublabel {
		ctx.set_fill_style_str(&style.sublabel.to_css());
		ctx.set_font(&scale.sublabel_font);
		let team = node.team.as_deref().unwrap_or("Unknown team");
		let _ = ctx.fill_text(&truncate_label(team), text_x, y + h * 0.7);
	}

	ctx.set_global_alpha(1.0);
}
