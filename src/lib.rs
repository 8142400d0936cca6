//! Observable values for view models.
//!
//! An [`Observable`] holds a value, announces changes through its
//! [`Notifier`] and carries declarative validation state. A [`Derived`]
//! value is recomputed from a mutable collection of items whenever one of
//! the items' triggers changes, and can push external edits back into the
//! items. A [`Relay`] turns an action plus an enablement predicate into a
//! [`Command`] that re-queries its enablement through a [`CommandManager`].

pub mod iter;
pub mod macros;

mod addr;
mod command;
mod dependencies;
mod derived;
mod error;
mod notifier;
mod observable;
mod settings;
mod validation;
mod value;

pub use command::{Command, CommandManager, Relay, Requery};
pub use derived::Derived;
pub use error::Error;
pub use notifier::{Event, Kind, Notifier, Token, HAS_ERRORS, VALUE};
pub use observable::{Observable, Toggle};
pub use settings::Settings;
pub use value::{Access, Value};

/// Who initiated an assignment.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Origin {
	/// The value assigned itself, e.g. a derived value recomputing.
	Internal,
	/// A caller wrote the value, e.g. a two-way binding.
	External,
}

/// Assignment state of an observable.
///
/// Every transition starts from `Idle` and returns to it when the guarded
/// section ends, including when it unwinds.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Phase {
	Idle,
	/// A derived value function is running.
	Evaluating,
	/// Between `ValueChanging` and `ValueChanged`.
	Assigning,
}

/// Anything that announces its changes through a [`Notifier`].
pub trait Notify {
	fn notifier(&self) -> &Notifier;
}

/// Change-notifying parts of an item whose changes should cause the
/// values derived from it to recompute.
pub trait Triggers {
	fn triggers(&self) -> Vec<Notifier> {
		Vec::new()
	}
}

impl<T> Triggers for std::rc::Rc<T>
where
	T: Triggers + ?Sized,
{
	fn triggers(&self) -> Vec<Notifier> {
		T::triggers(self)
	}
}

impl Notify for Notifier {
	fn notifier(&self) -> &Notifier {
		self
	}
}

impl Triggers for Notifier {
	fn triggers(&self) -> Vec<Notifier> {
		vec![self.clone()]
	}
}
