use std::cell::{Cell, Ref, RefCell};
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::validation::{self, Validator};
use crate::value::{Access, Value};
use crate::{Error, Event, Kind, Notifier, Notify, Origin, Phase, Token, Triggers, HAS_ERRORS, VALUE};

/// A mutable value that announces its changes and carries validation
/// state.
///
/// Assigning a value equal to the current one does nothing. Any other
/// assignment runs, in order: `ValueChanging`, store, validation,
/// `PropertyChanged("Value")`, `ValueChanged`.
pub struct Observable<T> {
	pub(crate) body: Rc<Body<T>>,
}

pub(crate) struct Body<T> {
	value: RefCell<T>,
	pub(crate) phase: Cell<Phase>,
	disposed: Cell<bool>,
	notifier: Notifier,
	validator: RefCell<Validator<T>>,
	revalidate: Rc<dyn Fn()>,
}

/// Holds a [`Phase`] for the lifetime of the guard and puts it back to
/// `Idle` on drop.
pub(crate) struct PhaseGuard<'a> {
	phase: &'a Cell<Phase>,
}

impl<'a> PhaseGuard<'a> {
	pub fn enter(phase: &'a Cell<Phase>, next: Phase) -> Result<Self, Error> {
		if phase.get() != Phase::Idle {
			return Err(Error::Reentrant);
		}
		phase.set(next);
		Ok(PhaseGuard { phase })
	}
}

impl Drop for PhaseGuard<'_> {
	fn drop(&mut self) {
		self.phase.set(Phase::Idle);
	}
}

pub trait Toggle {
	fn toggle(&mut self);
}

impl Toggle for bool {
	fn toggle(&mut self) {
		*self = !*self
	}
}

impl<T> Clone for Observable<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> Default for Observable<T>
where
	T: Default + PartialEq + 'static,
{
	fn default() -> Self {
		Observable::new(Default::default())
	}
}

impl<T> Observable<T>
where
	T: PartialEq + 'static,
{
	pub fn new(value: T) -> Self {
		Observable {
			body: Body::new(value),
		}
	}

	#[inline]
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.body.value.borrow().clone()
	}

	#[inline]
	pub fn get_ref(&self) -> Ref<'_, T> {
		self.body.value.borrow()
	}

	/// Assigns `value` as an external write. Returns whether the value
	/// changed.
	#[inline]
	pub fn set(&self, value: T) -> Result<bool, Error> {
		self.body.assign(value, Origin::External, None)
	}

	pub fn toggle(&self) -> Result<bool, Error>
	where
		T: Toggle + Clone,
	{
		let mut value = self.get();
		value.toggle();
		self.set(value)
	}

	pub fn phase(&self) -> Phase {
		self.body.phase.get()
	}

	/// `true` between `ValueChanging` and `ValueChanged`.
	pub fn is_changing(&self) -> bool {
		self.phase() == Phase::Assigning
	}

	pub fn error(&self) -> String {
		self.body.validator.borrow().error().to_owned()
	}

	pub fn has_errors(&self) -> bool {
		!self.body.validator.borrow().error().is_empty()
	}

	/// Error of a single property; only `"Value"` is validated.
	pub fn error_for(&self, property: &str) -> Option<String> {
		(property == VALUE).then(|| self.error())
	}

	pub fn subscribe(&self, listener: impl Fn(&Event) + 'static) -> Token {
		self.body.notifier.subscribe(listener)
	}

	pub fn unsubscribe(&self, token: Token) -> bool {
		self.body.notifier.unsubscribe(token)
	}

	/// Adds a rule that must hold for the value to be valid, then
	/// re-validates.
	pub fn add_validation(
		&self,
		predicate: impl Fn(&T) -> bool + 'static,
		message: &str,
	) -> Result<(), Error> {
		if self.is_disposed() {
			return Err(Error::Disposed);
		}
		self.body
			.validator
			.borrow_mut()
			.add_rule(Rc::new(predicate), message)?;
		self.body.validate();
		Ok(())
	}

	pub fn rule_count(&self) -> usize {
		self.body.validator.borrow().rule_count()
	}

	/// Re-validates whenever `source` changes.
	pub fn add_validation_trigger<N>(&self, source: &N)
	where
		N: Notify + ?Sized,
	{
		if self.is_disposed() {
			return;
		}
		self.body
			.validator
			.borrow_mut()
			.add_trigger(source.notifier(), &self.body.revalidate);
	}

	pub fn remove_validation_trigger<N>(&self, source: &N)
	where
		N: Notify + ?Sized,
	{
		self.body
			.validator
			.borrow_mut()
			.remove_trigger(source.notifier());
	}

	pub fn validation_trigger_count(&self) -> usize {
		self.body.validator.borrow().trigger_count()
	}

	/// Clears all rules and triggers. Further writes are rejected.
	pub fn dispose(&self) {
		if self.body.disposed.replace(true) {
			return;
		}
		self.body.validator.borrow_mut().clear();
		debug!("observable disposed");
	}

	pub fn is_disposed(&self) -> bool {
		self.body.disposed.get()
	}

	pub fn as_value(&self) -> Value<T> {
		Value::new(self.body.clone())
	}
}

impl<T> Body<T>
where
	T: PartialEq + 'static,
{
	pub(crate) fn new(value: T) -> Rc<Self> {
		let body = Rc::new_cyclic(|this: &Weak<Body<T>>| {
			let this = this.clone();
			Body {
				value: RefCell::new(value),
				phase: Cell::new(Phase::Idle),
				disposed: Cell::new(false),
				notifier: Notifier::with_kind(Kind::Value),
				validator: RefCell::new(Validator::new()),
				revalidate: Rc::new(move || {
					if let Some(body) = this.upgrade() {
						body.validate()
					}
				}),
			}
		});

		// The initial value is an internal assignment: it validates and
		// announces itself, but never writes back.
		body.on_assigned();
		body
	}

	pub(crate) fn assign(
		&self,
		value: T,
		origin: Origin,
		write_back: Option<&dyn Fn(&T)>,
	) -> Result<bool, Error> {
		if self.disposed.get() {
			return Err(Error::Disposed);
		}

		if *self.value.borrow() == value {
			return Ok(false);
		}

		{
			let _guard = PhaseGuard::enter(&self.phase, Phase::Assigning).map_err(|err| {
				warn!(?origin, phase = ?self.phase.get(), "rejected nested assignment");
				err
			})?;

			self.notifier.emit(Event::ValueChanging);
			*self.value.borrow_mut() = value;
			trace!(?origin, "value assigned");
			self.on_assigned();

			if let (Origin::External, Some(write_back)) = (origin, write_back) {
				let value = self.value.borrow();
				write_back(&*value);
			}
		}

		self.notifier.emit(Event::ValueChanged);
		Ok(true)
	}

	fn on_assigned(&self) {
		self.validate();
		self.notifier.property_changed(VALUE);
	}

	pub(crate) fn validate(&self) {
		if self.disposed.get() {
			return;
		}

		let rules = self.validator.borrow().rules();
		let error = validation::evaluate(&rules, &*self.value.borrow());
		if self.validator.borrow_mut().replace_error(error) {
			trace!(error = %self.validator.borrow().error(), "validation changed");
			self.notifier.property_changed(HAS_ERRORS);
			self.notifier.property_changed(VALUE);
		}
	}
}

impl<T> Access<T> for Body<T>
where
	T: 'static,
{
	fn get_ref(&self) -> Ref<'_, T> {
		self.value.borrow()
	}

	fn notifier(&self) -> &Notifier {
		&self.notifier
	}

	fn phase(&self) -> Phase {
		self.phase.get()
	}

	fn error(&self) -> String {
		self.validator.borrow().error().to_owned()
	}
}

impl<T> Notify for Observable<T> {
	fn notifier(&self) -> &Notifier {
		&self.body.notifier
	}
}

impl<T> Triggers for Observable<T> {
	fn triggers(&self) -> Vec<Notifier> {
		vec![self.body.notifier.clone()]
	}
}

impl<T> From<Observable<T>> for Value<T>
where
	T: 'static,
{
	fn from(observable: Observable<T>) -> Self {
		Value::new(observable.body)
	}
}

/// Handles compare by identity, not by value.
impl<T> PartialEq for Observable<T> {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}
}

impl<T> Debug for Observable<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.body.value.borrow().fmt(f)
	}
}
