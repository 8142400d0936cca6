use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::addr::RcAddr;

/// Property name announced when the current value changes.
pub const VALUE: &str = "Value";

/// Property name announced when the validation state changes.
pub const HAS_ERRORS: &str = "HasErrors";

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Event {
	/// Fired before a new value is stored.
	ValueChanging,
	/// Fired once the assignment has fully completed.
	ValueChanged,
	PropertyChanged(&'static str),
	/// Command bindings should ask their commands again whether they can
	/// execute.
	RequerySuggested,
}

/// How a notifier announces that its owner changed.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Kind {
	/// A plain entity: any `PropertyChanged` is a change.
	Plain,
	/// An observable value: a change is complete on `ValueChanged`.
	Value,
}

impl Event {
	pub fn is_change(&self, kind: Kind) -> bool {
		match (kind, self) {
			(Kind::Plain, Event::PropertyChanged(_)) => true,
			(Kind::Value, Event::ValueChanged) => true,
			_ => false,
		}
	}
}

/// Handle of one subscription, used to unsubscribe.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct Token(u64);

type Listener = Rc<dyn Fn(&Event)>;

/// Publish/subscribe hub for [`Event`]s.
///
/// Listeners run synchronously in subscription order. A listener may
/// subscribe or unsubscribe others while an event is being delivered;
/// listeners removed that way are not called for the rest of that
/// delivery, listeners added that way are first called for the next one.
#[derive(Clone)]
pub struct Notifier {
	body: Rc<NotifierBody>,
}

pub(crate) struct NotifierBody {
	kind: Kind,
	next: Cell<u64>,
	listeners: RefCell<SmallVec<[(Token, Listener); 4]>>,
}

impl Default for Notifier {
	fn default() -> Self {
		Notifier::new()
	}
}

impl Notifier {
	/// Creates a notifier for a plain entity.
	pub fn new() -> Self {
		Self::with_kind(Kind::Plain)
	}

	pub(crate) fn with_kind(kind: Kind) -> Self {
		Notifier {
			body: Rc::new(NotifierBody {
				kind,
				next: Cell::new(0),
				listeners: RefCell::new(SmallVec::new()),
			}),
		}
	}

	pub fn kind(&self) -> Kind {
		self.body.kind
	}

	pub fn subscribe(&self, listener: impl Fn(&Event) + 'static) -> Token {
		let token = Token(self.body.next.get());
		self.body.next.set(token.0 + 1);
		self.body
			.listeners
			.borrow_mut()
			.push((token, Rc::new(listener)));
		token
	}

	/// Subscribes `func` to the change signal that matches this
	/// notifier's [`Kind`].
	pub fn on_change(&self, func: impl Fn() + 'static) -> Token {
		let kind = self.kind();
		self.subscribe(move |event| {
			if event.is_change(kind) {
				func()
			}
		})
	}

	pub fn unsubscribe(&self, token: Token) -> bool {
		let mut listeners = self.body.listeners.borrow_mut();
		match listeners.iter().position(|(t, _)| *t == token) {
			Some(index) => {
				listeners.remove(index);
				true
			}
			None => false,
		}
	}

	pub fn listener_count(&self) -> usize {
		self.body.listeners.borrow().len()
	}

	fn is_subscribed(&self, token: Token) -> bool {
		self.body.listeners.borrow().iter().any(|(t, _)| *t == token)
	}

	pub fn emit(&self, event: Event) {
		let snapshot: SmallVec<[(Token, Listener); 4]> = self.body.listeners.borrow().clone();
		for (token, listener) in snapshot {
			if self.is_subscribed(token) {
				listener(&event);
			}
		}
	}

	pub fn property_changed(&self, name: &'static str) {
		self.emit(Event::PropertyChanged(name))
	}

	pub fn ptr_eq(&self, other: &Notifier) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}

	pub(crate) fn addr(&self) -> RcAddr<NotifierBody> {
		RcAddr::new(self.body.clone())
	}
}

impl fmt::Debug for Notifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Notifier")
			.field("kind", &self.body.kind)
			.field("listeners", &self.listener_count())
			.finish()
	}
}
