use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use leptos::prelude::*;
use log::warn;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent};

use super::render::CanvasTarget;
use super::state::GraphEngine;
use crate::events::{Shared, dispatch};
use crate::runtime::{BrowserRuntime, Debouncer, Runtime};

const FRAME_DT: f64 = 0.016;

fn parent_size(canvas: &HtmlCanvasElement) -> (f64, f64) {
	canvas
		.parent_element()
		.map(|p| (p.client_width() as f64, p.client_height() as f64))
		.filter(|(w, h)| *w > 0.0 && *h > 0.0)
		.unwrap_or((800.0, 600.0))
}

fn pointer_position(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

/// Fit the canvas to its parent and tell the engine; no-op when unchanged.
fn fit_canvas(canvas: &HtmlCanvasElement, engine: &Shared<GraphEngine>) {
	let (w, h) = parent_size(canvas);
	if engine.borrow().size() == (w, h) {
		return;
	}
	canvas.set_width(w as u32);
	canvas.set_height(h as u32);
	dispatch(engine, |e| e.resize(w, h));
}

/// Canvas view of a [`GraphEngine`]: drives the animation loop and forwards
/// pointer input. Events the engine raises reach its subscribers.
#[component]
pub fn ForceGraphCanvas(
	engine: Shared<GraphEngine>,
	#[prop(default = Duration::from_millis(150))] resize_debounce: Duration,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (engine_init, animate_init, resize_cb_init) =
		(engine.clone(), animate.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let ctx: CanvasRenderingContext2d = match canvas.get_context("2d") {
			Ok(Some(ctx)) => match ctx.dyn_into() {
				Ok(ctx) => ctx,
				Err(_) => return,
			},
			_ => {
				warn!("2d canvas context unavailable");
				return;
			}
		};
		fit_canvas(&canvas, &engine_init);

		// window resizes arrive in bursts; only the last one in the window counts
		let debouncer = Rc::new(RefCell::new(Debouncer::default()));
		let (engine_resize, canvas_resize) = (engine_init.clone(), canvas.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let token = debouncer.borrow_mut().restart();
			let (engine, canvas, debouncer) =
				(engine_resize.clone(), canvas_resize.clone(), debouncer.clone());
			BrowserRuntime.set_timeout(
				resize_debounce,
				Box::new(move || {
					if debouncer.borrow_mut().fire(&token) {
						fit_canvas(&canvas, &engine);
					}
				}),
			);
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let target = Rc::new(RefCell::new(CanvasTarget::new(ctx)));
		let (engine_anim, animate_inner) = (engine_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			{
				let mut engine = engine_anim.borrow_mut();
				if engine.tick(FRAME_DT) {
					engine.sync(&mut *target.borrow_mut());
				}
			}
			if let (Some(cb), Some(window)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let engine_md = engine.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = pointer_position(&canvas, &ev);
		dispatch(&engine_md, |e| e.pointer_down(x, y));
	};

	let engine_mm = engine.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = pointer_position(&canvas, &ev);
		dispatch(&engine_mm, |e| e.pointer_move(x, y));
	};

	let engine_mu = engine.clone();
	let on_mouseup = move |_: MouseEvent| {
		dispatch(&engine_mu, |e| e.pointer_up());
	};

	let engine_ml = engine.clone();
	let on_mouseleave = move |_: MouseEvent| {
		dispatch(&engine_ml, |e| e.pointer_leave());
	};

	let engine_wh = engine;
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = pointer_position(&canvas, &ev);
		dispatch(&engine_wh, |e| e.wheel(x, y, ev.delta_y()));
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
