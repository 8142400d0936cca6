use std::cell::Ref;
use std::rc::Rc;

use crate::{Notifier, Notify, Phase};

/// Read side shared by every observable, plain or derived.
pub trait Access<T>: 'static {
	fn get_ref(&self) -> Ref<'_, T>;
	fn notifier(&self) -> &Notifier;
	fn phase(&self) -> Phase;
	fn error(&self) -> String;
}

/// Read-only handle to an [`Observable`](crate::Observable) or a
/// [`Derived`](crate::Derived) value.
pub struct Value<T> {
	value: Rc<dyn Access<T>>,
}

impl<T> Clone for Value<T> {
	fn clone(&self) -> Self {
		Value {
			value: self.value.clone(),
		}
	}
}

impl<T> Value<T>
where
	T: 'static,
{
	pub fn new(value: Rc<dyn Access<T>>) -> Self {
		Value { value }
	}

	#[inline]
	pub fn get_ref(&self) -> Ref<'_, T> {
		self.value.get_ref()
	}

	#[inline]
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.value.get_ref().clone()
	}

	pub fn is_changing(&self) -> bool {
		self.value.phase() == Phase::Assigning
	}

	pub fn error(&self) -> String {
		self.value.error()
	}

	pub fn has_errors(&self) -> bool {
		!self.value.error().is_empty()
	}
}

impl<T> Notify for Value<T>
where
	T: 'static,
{
	fn notifier(&self) -> &Notifier {
		self.value.notifier()
	}
}
