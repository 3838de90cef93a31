//! Typed event tables.
//!
//! Components queue events while they are mutably borrowed and the owner
//! delivers them through [`dispatch`] once the borrow has been released, so a
//! handler may freely call back into any component, including the emitter.

use std::cell::RefCell;
use std::rc::Rc;

/// Shared, single-threaded ownership of a component.
pub type Shared<T> = Rc<RefCell<T>>;

/// Handle returned by [`EventTable::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Rc<dyn Fn(&E)>;

/// Subscribers plus the events queued since the last delivery.
pub struct EventTable<E> {
	handlers: Vec<(SubscriptionId, Handler<E>)>,
	queued: Vec<E>,
	next_id: u64,
}

impl<E> Default for EventTable<E> {
	fn default() -> Self {
		Self {
			handlers: Vec::new(),
			queued: Vec::new(),
			next_id: 0,
		}
	}
}

impl<E> EventTable<E> {
	pub fn subscribe(&mut self, handler: impl Fn(&E) + 'static) -> SubscriptionId {
		let id = SubscriptionId(self.next_id);
		self.next_id += 1;
		self.handlers.push((id, Rc::new(handler)));
		id
	}

	pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
		let before = self.handlers.len();
		self.handlers.retain(|(sid, _)| *sid != id);
		self.handlers.len() != before
	}

	/// Queue an event for delivery after the current borrow ends.
	pub fn queue(&mut self, event: E) {
		self.queued.push(event);
	}

	pub fn has_queued(&self) -> bool {
		!self.queued.is_empty()
	}

	fn take(&mut self) -> (Vec<E>, Vec<Handler<E>>) {
		let handlers = self.handlers.iter().map(|(_, h)| h.clone()).collect();
		(std::mem::take(&mut self.queued), handlers)
	}
}

/// A component that owns an [`EventTable`].
pub trait Evented {
	type Event;

	fn events(&mut self) -> &mut EventTable<Self::Event>;
}

/// Run `f` against the component, then deliver whatever it queued.
pub fn dispatch<T, R>(component: &Shared<T>, f: impl FnOnce(&mut T) -> R) -> R
where
	T: Evented,
{
	let (result, events, handlers) = {
		let mut inner = component.borrow_mut();
		let result = f(&mut inner);
		let (events, handlers) = inner.events().take();
		(result, events, handlers)
	};
	for event in &events {
		for handler in &handlers {
			handler(event);
		}
	}
	result
}

/// Subscribe to a shared component without holding the borrow afterwards.
pub fn subscribe<T>(component: &Shared<T>, handler: impl Fn(&T::Event) + 'static) -> SubscriptionId
where
	T: Evented,
{
	component.borrow_mut().events().subscribe(handler)
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use super::*;

	#[derive(Default)]
	struct Counter {
		value: u32,
		events: EventTable<u32>,
	}

	impl Evented for Counter {
		type Event = u32;

		fn events(&mut self) -> &mut EventTable<u32> {
			&mut self.events
		}
	}

	impl Counter {
		fn bump(&mut self) {
			self.value += 1;
			self.events.queue(self.value);
		}
	}

	#[test]
	fn handlers_may_reenter_the_emitter() {
		let counter: Shared<Counter> = Rc::default();
		let seen = Rc::new(RefCell::new(Vec::new()));

		let (inner, log) = (counter.clone(), seen.clone());
		subscribe(&counter, move |v: &u32| {
			log.borrow_mut().push(*v);
			// reading the emitter inside the handler must not panic
			assert_eq!(inner.borrow().value, *v);
		});

		dispatch(&counter, |c| c.bump());
		dispatch(&counter, |c| c.bump());
		assert_eq!(*seen.borrow(), vec![1, 2]);
	}

	#[test]
	fn unsubscribe_stops_delivery() {
		let counter: Shared<Counter> = Rc::default();
		let hits = Rc::new(Cell::new(0));
		let h = hits.clone();
		let id = subscribe(&counter, move |_| h.set(h.get() + 1));

		dispatch(&counter, |c| c.bump());
		assert!(counter.borrow_mut().events().unsubscribe(id));
		dispatch(&counter, |c| c.bump());
		assert_eq!(hits.get(), 1);
		assert!(!counter.borrow().events.has_queued());
	}
}
