//! Task and timer capability.
//!
//! Everything asynchronous in the explorer goes through [`Runtime`], so the
//! coordinator can be driven by the browser event loop or by a manual clock.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;

/// Single-threaded executor plus one-shot timers.
pub trait Runtime {
	/// Run a future to completion on the current thread.
	fn spawn_local(&self, task: LocalBoxFuture<'static, ()>);

	/// Call `callback` once after `delay`.
	fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>);
}

/// Cooperative cancellation flag shared between a scheduler and a callback.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.0.set(true);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.get()
	}
}

/// Keeps only the most recent of a burst of requests alive.
#[derive(Debug, Default)]
pub struct Debouncer {
	current: Option<CancelToken>,
}

impl Debouncer {
	/// Cancel the pending request (if any) and hand out a token for a new one.
	pub fn restart(&mut self) -> CancelToken {
		self.cancel();
		let token = CancelToken::new();
		self.current = Some(token.clone());
		token
	}

	pub fn cancel(&mut self) {
		if let Some(token) = self.current.take() {
			token.cancel();
		}
	}

	/// Consume `token` if it is the live one; `false` for superseded tokens.
	pub fn fire(&mut self, token: &CancelToken) -> bool {
		if token.is_cancelled() {
			return false;
		}
		self.current = None;
		true
	}
}

/// [`Runtime`] backed by the browser task queue.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserRuntime;

impl Runtime for BrowserRuntime {
	fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
		leptos::task::spawn_local(task);
	}

	fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) {
		leptos::prelude::set_timeout(callback, delay);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn restart_cancels_the_previous_token() {
		let mut debouncer = Debouncer::default();
		let first = debouncer.restart();
		let second = debouncer.restart();
		assert!(first.is_cancelled());
		assert!(!second.is_cancelled());
		assert!(!debouncer.fire(&first));
		assert!(debouncer.fire(&second));
	}

	#[test]
	fn cancel_clears_pending() {
		let mut debouncer = Debouncer::default();
		let token = debouncer.restart();
		debouncer.cancel();
		assert!(!debouncer.fire(&token));
	}
}
