//! Leptos component wrapping the dependency graph canvas.
//!
//! The component builds the graph model from the `data` signal, runs the
//! layered layout off the event handlers, and shows a loading indicator until
//! positions are known. Once laid out, an animation loop driven by
//! `requestAnimationFrame` renders the view each frame. Panning is by drag;
//! zoom is only available through the on-canvas buttons, so wheel events are
//! left to the page.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use leptos::callback::{Callable, Callback};
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{debug, warn};
use send_wrapper::SendWrapper;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, Window};

use super::hover::provide_hover_context;
use super::layout::{LaidOutGraph, LayeredLayout, layout_or_origin};
use super::model::{DuplicatePolicy, EdgeId, build_graph};
use super::render;
use super::scale::{ScaleConfig, ScaledValues};
use super::sequence::RequestSequencer;
use super::theme::{ColorMode, Theme};
use super::types::{Dependency, DependencyData};
use super::view::GraphViewState;

/// Pointer travel, in pixels, after which a press becomes a pan instead of a click.
const CLICK_SLOP: f64 = 3.0;

/// Bundles the view state with the visual configuration it is drawn with.
struct GraphContext {
	view: Option<GraphViewState>,
	scale: ScaleConfig,
	theme: Theme,
	width: f64,
	height: f64,
}

/// What a click on the canvas landed on.
enum ClickTarget {
	Node(String),
	Edge(EdgeId),
}

#[derive(Clone, Copy)]
enum ZoomAction {
	In,
	Out,
	Fit,
}

/// What is drawn over the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Overlay {
	Loading,
	Empty,
	None,
}

/// An empty graph while the dataset is still being fetched is not yet known
/// to be empty.
fn overlay(fetching: bool, laid_out: Option<&LaidOutGraph>) -> Overlay {
	match laid_out {
		None => Overlay::Loading,
		Some(graph) if graph.model.nodes.is_empty() => {
			if fetching {
				Overlay::Loading
			} else {
				Overlay::Empty
			}
		}
		Some(_) => Overlay::None,
	}
}

/// Browser callbacks held by one mounted graph: the animation frame closure,
/// the window resize listener and the id of the pending frame.
struct LoopHandles<C> {
	animate: Rc<RefCell<Option<C>>>,
	resize: Rc<RefCell<Option<C>>>,
	frame: Rc<Cell<Option<i32>>>,
}

impl<C> Clone for LoopHandles<C> {
	fn clone(&self) -> Self {
		Self {
			animate: self.animate.clone(),
			resize: self.resize.clone(),
			frame: self.frame.clone(),
		}
	}
}

impl<C> LoopHandles<C> {
	fn new() -> Self {
		Self {
			animate: Rc::new(RefCell::new(None)),
			resize: Rc::new(RefCell::new(None)),
			frame: Rc::new(Cell::new(None)),
		}
	}

	/// Empties every slot, returning the pending frame and both callbacks.
	fn release(&self) -> (Option<i32>, Option<C>, Option<C>) {
		(
			self.frame.take(),
			self.animate.borrow_mut().take(),
			self.resize.borrow_mut().take(),
		)
	}
}

fn local_position(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

/// Renders the application dependency graph on a canvas element.
///
/// `main_application` is drawn as the standout node and its edges are
/// animated. Clicking an edge reports the dependency behind it through
/// `on_edge_click`; clicks that no longer match the current dataset are
/// ignored. The component sizes itself to its parent container unless
/// `fullscreen` or explicit `width`/`height` are given.
#[component]
pub fn DependencyGraph(
	#[prop(into)] data: Signal<DependencyData>,
	#[prop(optional, into)] main_application: MaybeProp<String>,
	#[prop(optional, into)] dark_mode: MaybeProp<bool>,
	#[prop(optional)] duplicate_policy: DuplicatePolicy,
	#[prop(into)] on_edge_click: Callback<Dependency>,
	#[prop(optional, into)] on_node_click: Option<Callback<String>>,
	/// Set while the dataset is being fetched.
	#[prop(optional, into)]
	fetching: MaybeProp<bool>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let hover = provide_hover_context();
	let scale = ScaleConfig::default();
	let node_size = scale.node_size();

	let context: Rc<RefCell<GraphContext>> = Rc::new(RefCell::new(GraphContext {
		view: None,
		scale,
		theme: Theme::default(),
		width: width.unwrap_or(800.0),
		height: height.unwrap_or(600.0),
	}));
	let handles: LoopHandles<Closure<dyn FnMut()>> = LoopHandles::new();
	let running = Arc::new(AtomicBool::new(false));
	let sequencer = Arc::new(RequestSequencer::new());

	let model = Memo::new(move |_| {
		let main = main_application.get();
		data.with(|d| build_graph(d, main.as_deref(), duplicate_policy))
	});
	let laid_out: RwSignal<Option<LaidOutGraph>> = RwSignal::new(None);
	let cursor = RwSignal::new("grab");

	// Layout: every new model gets a ticket; only the newest result lands.
	let sequencer_layout = sequencer.clone();
	Effect::new(move |_| {
		let snapshot = model.get();
		let ticket = sequencer_layout.issue();
		laid_out.set(None);
		let sequencer = sequencer_layout.clone();
		spawn_local(async move {
			let result = layout_or_origin(&LayeredLayout, &snapshot, Some(node_size)).await;
			if sequencer.is_current(ticket) {
				laid_out.set(Some(result));
			} else {
				debug!("cosmos-graph: discarding stale layout result");
			}
		});
	});

	let context_theme = context.clone();
	Effect::new(move |_| {
		let dark = dark_mode.get().unwrap_or(false);
		context_theme.borrow_mut().theme = Theme::for_mode(ColorMode::from_dark(dark));
	});

	let context_view = context.clone();
	Effect::new(move |_| {
		let mut c = context_view.borrow_mut();
		let view = laid_out.get().map(|graph| {
			GraphViewState::new(graph, node_size, c.width, c.height, &c.scale.zoom)
		});
		c.view = view;
	});

	let (context_init, handles_init, running_init) =
		(context.clone(), handles.clone(), running.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if running_init.swap(true, Ordering::SeqCst) {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			warn!("cosmos-graph: no window, graph canvas stays blank");
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.filter(|w| *w > 0.0)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.filter(|h| *h > 0.0)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = match canvas.get_context("2d") {
			Ok(Some(ctx)) => match ctx.dyn_into() {
				Ok(ctx) => ctx,
				Err(_) => return,
			},
			_ => {
				warn!("cosmos-graph: canvas 2d context unavailable");
				return;
			}
		};

		{
			let mut c = context_init.borrow_mut();
			c.width = w;
			c.height = h;
			let zoom = c.scale.zoom.clone();
			if let Some(ref mut view) = c.view {
				view.resize(w, h);
				view.fit_view(&zoom);
			}
		}

		if fullscreen {
			let (context_resize, canvas_resize) = (context_init.clone(), canvas.clone());
			*handles_init.resize.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				let mut c = context_resize.borrow_mut();
				c.width = nw;
				c.height = nh;
				if let Some(ref mut view) = c.view {
					view.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *handles_init.resize.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (context_anim, handles_anim, running_anim) =
			(context_init.clone(), handles_init.clone(), running_init.clone());
		*handles_init.animate.borrow_mut() = Some(Closure::new(move || {
			if !running_anim.load(Ordering::SeqCst) {
				return;
			}
			{
				let mut guard = context_anim.borrow_mut();
				let c = &mut *guard;
				if let Some(ref mut view) = c.view {
					let dt = 0.016;
					let hovered = hover.hovered.get_untracked();
					view.tick(dt, hovered.as_deref());
					render::render(view, &ctx, &c.scale, &c.theme);
				}
			}
			if let Some(ref cb) = *handles_anim.animate.borrow() {
				if let Some(window) = web_sys::window() {
					let id = window.request_animation_frame(cb.as_ref().unchecked_ref()).ok();
					handles_anim.frame.set(id);
				}
			}
		}));
		if let Some(ref cb) = *handles_init.animate.borrow() {
			let id = window.request_animation_frame(cb.as_ref().unchecked_ref()).ok();
			handles_init.frame.set(id);
		}
	});

	let (running_cleanup, sequencer_cleanup) = (running.clone(), sequencer.clone());
	let handles_cleanup = SendWrapper::new(handles);
	on_cleanup(move || {
		running_cleanup.store(false, Ordering::SeqCst);
		sequencer_cleanup.invalidate();
		hover.clear();

		// The animation closure holds its own slot; emptying it breaks the cycle.
		let (frame, animate, resize) = handles_cleanup.take().release();
		if let Some(window) = web_sys::window() {
			if let Some(id) = frame {
				let _ = window.cancel_animation_frame(id);
			}
			if let Some(ref cb) = resize {
				let _ =
					window.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}
		drop(animate);
	});

	let context_md = context.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = local_position(&canvas.into(), &ev);
		if let Some(ref mut view) = context_md.borrow_mut().view {
			view.pan.active = true;
			view.pan.moved = false;
			view.pan.start_x = x;
			view.pan.start_y = y;
			view.pan.transform_start_x = view.transform.x;
			view.pan.transform_start_y = view.transform.y;
		}
	};

	let context_mm = context.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = local_position(&canvas.into(), &ev);
		let mut c = context_mm.borrow_mut();
		let tolerance = c
			.view
			.as_ref()
			.map(|v| ScaledValues::new(&c.scale, v.transform.k).hit_tolerance)
			.unwrap_or_default();
		let Some(ref mut view) = c.view else {
			return;
		};

		if view.pan.active {
			let (dx, dy) = (x - view.pan.start_x, y - view.pan.start_y);
			if !view.pan.moved && dx.hypot(dy) > CLICK_SLOP {
				view.pan.moved = true;
				cursor.set("grabbing");
			}
			if view.pan.moved {
				view.transform.x = view.pan.transform_start_x + dx;
				view.transform.y = view.pan.transform_start_y + dy;
			}
			return;
		}

		let node = view.node_at_position(x, y).map(|n| n.id.clone());
		let over_edge = node.is_none() && view.edge_at_position(x, y, tolerance).is_some();
		drop(c);
		cursor.set(if node.is_some() || over_edge {
			"pointer"
		} else {
			"grab"
		});
		hover.set(node.as_deref());
	};

	let context_mu = context.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = local_position(&canvas.into(), &ev);
		let target = {
			let mut c = context_mu.borrow_mut();
			let tolerance = c
				.view
				.as_ref()
				.map(|v| ScaledValues::new(&c.scale, v.transform.k).hit_tolerance)
				.unwrap_or_default();
			let Some(ref mut view) = c.view else {
				return;
			};
			let was_click = view.pan.active && !view.pan.moved;
			view.pan.active = false;
			view.pan.moved = false;
			if !was_click {
				None
			} else if let Some(node) = view.node_at_position(x, y) {
				Some(ClickTarget::Node(node.id.clone()))
			} else {
				view.edge_at_position(x, y, tolerance)
					.cloned()
					.map(ClickTarget::Edge)
			}
		};
		cursor.set("grab");

		// The borrow is released before callbacks run; they may update signals
		// whose effects touch the view state.
		match target {
			Some(ClickTarget::Edge(id)) => {
				let dependency = model.with_untracked(|m| m.resolve_edge(&id).cloned());
				match dependency {
					Some(dependency) => on_edge_click.run(dependency),
					None => debug!("cosmos-graph: ignoring click on stale edge {}", id),
				}
			}
			Some(ClickTarget::Node(id)) => {
				if let Some(cb) = on_node_click {
					cb.run(id);
				}
			}
			None => {}
		}
	};

	let context_ml = context.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut view) = context_ml.borrow_mut().view {
			view.pan.active = false;
			view.pan.moved = false;
		}
		cursor.set("grab");
		hover.clear();
	};

	let context_zoom = context.clone();
	let zoom = move |action: ZoomAction| {
		let mut c = context_zoom.borrow_mut();
		let config = c.scale.zoom.clone();
		if let Some(ref mut view) = c.view {
			match action {
				ZoomAction::In => view.zoom_by(config.step, &config),
				ZoomAction::Out => view.zoom_by(1.0 / config.step, &config),
				ZoomAction::Fit => view.fit_view(&config),
			}
		}
	};
	let (zoom_in, zoom_out, zoom_fit) = (zoom.clone(), zoom.clone(), zoom);

	let current_overlay =
		move || laid_out.with(|g| overlay(fetching.get().unwrap_or(false), g.as_ref()));
	let loading = move || current_overlay() == Overlay::Loading;
	let empty = move || current_overlay() == Overlay::Empty;

	view! {
		<div class="dependency-graph" style="position: relative;">
			<Show when=loading>
				<div class="dependency-graph-loading" role="status">
					"Loading dependency graph…"
				</div>
			</Show>
			<Show when=empty>
				<div class="dependency-graph-empty">"No dependencies to display"</div>
			</Show>
			<canvas
				node_ref=canvas_ref
				class="dependency-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				style:display="block"
				style:cursor=move || cursor.get()
				style:visibility=move || if loading() { "hidden" } else { "visible" }
			/>
			<div class="dependency-graph-controls">
				<button title="Zoom in" on:click=move |_| zoom_in(ZoomAction::In)>"+"</button>
				<button title="Zoom out" on:click=move |_| zoom_out(ZoomAction::Out)>"−"</button>
				<button title="Fit view" on:click=move |_| zoom_fit(ZoomAction::Fit)>"Fit"</button>
			</div>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::dependency_graph::model::{GraphModel, GraphNode};

	fn graph(ids: &[&str]) -> LaidOutGraph {
		LaidOutGraph {
			model: GraphModel {
				nodes: ids
					.iter()
					.map(|id| GraphNode {
						id: id.to_string(),
						name: None,
						team: None,
						standout: false,
						x: 0.0,
						y: 0.0,
					})
					.collect(),
				edges: Vec::new(),
			},
			degraded: false,
		}
	}

	#[test]
	fn loading_until_laid_out() {
		assert_eq!(overlay(false, None), Overlay::Loading);
		assert_eq!(overlay(true, None), Overlay::Loading);
	}

	#[test]
	fn empty_graph_while_fetching_is_still_loading() {
		let empty = graph(&[]);
		assert_eq!(overlay(true, Some(&empty)), Overlay::Loading);
		assert_eq!(overlay(false, Some(&empty)), Overlay::Empty);
	}

	#[test]
	fn refetch_keeps_current_graph_visible() {
		let shown = graph(&["A", "B"]);
		assert_eq!(overlay(true, Some(&shown)), Overlay::None);
		assert_eq!(overlay(false, Some(&shown)), Overlay::None);
	}

	#[test]
	fn release_empties_every_handle_once() {
		let handles: LoopHandles<String> = LoopHandles::new();
		*handles.animate.borrow_mut() = Some("animate".into());
		*handles.resize.borrow_mut() = Some("resize".into());
		handles.frame.set(Some(7));

		let shared = handles.clone();
		assert_eq!(
			shared.release(),
			(Some(7), Some("animate".to_string()), Some("resize".to_string()))
		);
		assert_eq!(handles.release(), (None, None, None));
		assert!(handles.animate.borrow().is_none());
	}

	/// Stands in for the frame closure, which captures the handles it lives in.
	struct Frame {
		_handles: LoopHandles<Frame>,
		_marker: Rc<()>,
	}

	#[test]
	fn releasing_the_animation_slot_breaks_the_cycle() {
		let handles: LoopHandles<Frame> = LoopHandles::new();
		let marker = Rc::new(());
		*handles.animate.borrow_mut() = Some(Frame {
			_handles: handles.clone(),
			_marker: marker.clone(),
		});
		assert_eq!(Rc::strong_count(&handles.animate), 2);
		assert_eq!(Rc::strong_count(&marker), 2);

		let (_, animate, _) = handles.release();
		drop(animate);
		assert_eq!(Rc::strong_count(&handles.animate), 1);
		assert_eq!(Rc::strong_count(&marker), 1);
	}
}
