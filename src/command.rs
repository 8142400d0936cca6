use std::any::{type_name, Any};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::{Error, Event, Notifier, Notify, Token, Value};

/// An invocable command, as seen by whatever binds it to a control.
pub trait Command {
	fn can_execute(&self, parameter: &dyn Any) -> bool;

	fn execute(&self, parameter: &dyn Any) -> Result<(), Error>;

	/// Subscribes to the signal telling bindings to ask
	/// [`can_execute`](Command::can_execute) again.
	fn can_execute_changed(&self, listener: Rc<dyn Fn()>) -> Token;

	fn remove_can_execute_changed(&self, token: Token) -> bool;
}

/// The requery broadcast shared by a group of commands.
///
/// Enablement of many commands is re-evaluated in one pass off this single
/// signal instead of one signal per command.
// Alias only so `automock` accepts the signature; it rejects literal `dyn Fn`.
type Listener = Rc<dyn Fn()>;

#[cfg_attr(test, mockall::automock)]
pub trait CommandManager {
	fn requery_suggested(&self, listener: Listener) -> Token;

	fn remove_requery_suggested(&self, token: Token) -> bool;

	fn invalidate_requery_suggested(&self);
}

/// Scoped [`CommandManager`]: lives as long as the relays holding it.
#[derive(Default)]
pub struct Requery {
	notifier: Notifier,
}

impl Requery {
	pub fn new() -> Self {
		Requery::default()
	}

	pub fn listener_count(&self) -> usize {
		self.notifier.listener_count()
	}
}

impl CommandManager for Requery {
	fn requery_suggested(&self, listener: Rc<dyn Fn()>) -> Token {
		self.notifier.subscribe(move |event| {
			if *event == Event::RequerySuggested {
				listener()
			}
		})
	}

	fn remove_requery_suggested(&self, token: Token) -> bool {
		self.notifier.unsubscribe(token)
	}

	fn invalidate_requery_suggested(&self) {
		trace!(listeners = self.notifier.listener_count(), "requery suggested");
		self.notifier.emit(Event::RequerySuggested);
	}
}

/// A command relaying to closures. Without a predicate it can always
/// execute.
pub struct Relay<P> {
	execute: Box<dyn Fn(&P)>,
	can_execute: Option<Box<dyn Fn(&P) -> bool>>,
	manager: Rc<dyn CommandManager>,
	enabled: Option<(Notifier, Token)>,
}

impl<P> Relay<P>
where
	P: 'static,
{
	pub fn new(manager: &Rc<dyn CommandManager>, execute: impl Fn(&P) + 'static) -> Self {
		Relay {
			execute: Box::new(execute),
			can_execute: None,
			manager: manager.clone(),
			enabled: None,
		}
	}

	pub fn with_predicate(
		manager: &Rc<dyn CommandManager>,
		execute: impl Fn(&P) + 'static,
		can_execute: impl Fn(&P) -> bool + 'static,
	) -> Self {
		Relay {
			execute: Box::new(execute),
			can_execute: Some(Box::new(can_execute)),
			manager: manager.clone(),
			enabled: None,
		}
	}

	/// Enabled while `enabled` holds `true`; every change of it suggests a
	/// requery through `manager`.
	pub fn with_value(
		manager: &Rc<dyn CommandManager>,
		execute: impl Fn(&P) + 'static,
		enabled: impl Into<Value<bool>>,
	) -> Self {
		let enabled = enabled.into();
		let notifier = enabled.notifier().clone();
		let token = notifier.on_change({
			let manager = manager.clone();
			move || manager.invalidate_requery_suggested()
		});

		let mut relay = Self::with_predicate(manager, execute, move |_| *enabled.get_ref());
		relay.enabled = Some((notifier, token));
		relay
	}

	pub fn can_execute_with(&self, parameter: &P) -> bool {
		match &self.can_execute {
			Some(can_execute) => can_execute(parameter),
			None => true,
		}
	}

	pub fn execute_with(&self, parameter: &P) {
		(self.execute)(parameter)
	}

	pub fn manager(&self) -> &Rc<dyn CommandManager> {
		&self.manager
	}
}

impl<P> Command for Relay<P>
where
	P: 'static,
{
	fn can_execute(&self, parameter: &dyn Any) -> bool {
		if self.can_execute.is_none() {
			return true;
		}

		match parameter.downcast_ref::<P>() {
			Some(parameter) => self.can_execute_with(parameter),
			None => {
				debug!(expected = type_name::<P>(), "command parameter has the wrong type");
				false
			}
		}
	}

	fn execute(&self, parameter: &dyn Any) -> Result<(), Error> {
		let parameter = parameter.downcast_ref::<P>().ok_or_else(|| {
			Error::InvalidArgument(format!("command parameter is not a `{}`", type_name::<P>()))
		})?;
		self.execute_with(parameter);
		Ok(())
	}

	fn can_execute_changed(&self, listener: Rc<dyn Fn()>) -> Token {
		self.manager.requery_suggested(listener)
	}

	fn remove_can_execute_changed(&self, token: Token) -> bool {
		self.manager.remove_requery_suggested(token)
	}
}

impl<P> Drop for Relay<P> {
	fn drop(&mut self) {
		if let Some((notifier, token)) = self.enabled.take() {
			notifier.unsubscribe(token);
		}
	}
}
