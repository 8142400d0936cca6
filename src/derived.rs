use std::cell::{Ref, RefCell};
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::dependencies::Dependencies;
use crate::observable::PhaseGuard;
use crate::value::{Access, Value};
use crate::{Error, Event, Notifier, Notify, Observable, Origin, Phase, Token, Triggers};

type Selector<I> = Box<dyn Fn(&I) -> Vec<Notifier>>;
type ValueFn<I, T> = Rc<dyn Fn(&[I]) -> T>;
type WriteBack<I, T> = Rc<dyn Fn(&[I], &T)>;
type Linked = SmallVec<[Notifier; 2]>;

/// A value computed from a mutable collection of items.
///
/// Every item contributes the notifiers returned by the selector; a change
/// on any of them recomputes the value. Adding, removing or replacing items
/// recomputes once per call, however many items are involved. An external
/// [`set`](Derived::set) is pushed back into the items by the write-back
/// callback, if there is one.
pub struct Derived<I, T> {
	body: Rc<DerivedBody<I, T>>,
}

struct DerivedBody<I, T> {
	base: Observable<T>,
	items: RefCell<Vec<I>>,
	/// Notifiers linked for each item when it was added, index-aligned
	/// with `items`. Removal unlinks these, whatever the item reports now.
	linked: RefCell<Vec<Linked>>,
	selector: Selector<I>,
	value_fn: RefCell<ValueFn<I, T>>,
	write_back: RefCell<Option<WriteBack<I, T>>>,
	links: RefCell<Dependencies>,
	recompute: Rc<dyn Fn()>,
}

impl<I, T> Clone for Derived<I, T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<I, T> Derived<I, T>
where
	I: 'static,
	T: PartialEq + 'static,
{
	pub fn new<S, F>(items: impl IntoIterator<Item = I>, selector: S, value_fn: F) -> Self
	where
		S: Fn(&I) -> Vec<Notifier> + 'static,
		F: Fn(&[I]) -> T + 'static,
	{
		let items: Vec<I> = items.into_iter().collect();
		Derived {
			body: Rc::new_cyclic(|this: &Weak<DerivedBody<I, T>>| {
				let recompute: Rc<dyn Fn()> = Rc::new({
					let this = this.clone();
					move || {
						if let Some(body) = this.upgrade() {
							body.on_trigger()
						}
					}
				});

				let mut links = Dependencies::new();
				let linked: Vec<Linked> = items
					.iter()
					.map(|item| link_item::<I>(&mut links, &selector, item, &recompute))
					.collect();

				let value = value_fn(items.as_slice());
				DerivedBody {
					base: Observable::new(value),
					items: RefCell::new(items),
					linked: RefCell::new(linked),
					selector: Box::new(selector),
					value_fn: RefCell::new(Rc::new(value_fn)),
					write_back: RefCell::new(None),
					links: RefCell::new(links),
					recompute,
				}
			}),
		}
	}

	/// Tracks each item's own [`Triggers`].
	pub fn from_items<F>(items: impl IntoIterator<Item = I>, value_fn: F) -> Self
	where
		I: Triggers,
		F: Fn(&[I]) -> T + 'static,
	{
		Self::new(items, I::triggers, value_fn)
	}

	/// Sets the callback that pushes external writes back into the items.
	#[must_use]
	pub fn with_write_back(self, write_back: impl Fn(&[I], &T) + 'static) -> Self {
		*self.body.write_back.borrow_mut() = Some(Rc::new(write_back));
		self
	}

	#[inline]
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.body.base.get()
	}

	#[inline]
	pub fn get_ref(&self) -> Ref<'_, T> {
		self.body.base.get_ref()
	}

	/// Assigns `value` as an external write and hands it to the write-back
	/// callback. The items it touches do not cause a recomputation.
	pub fn set(&self, value: T) -> Result<bool, Error> {
		let write_back = self.body.write_back.borrow().clone();
		let items = &self.body.items;
		let push: &dyn Fn(&T) = &move |value: &T| {
			if let Some(write_back) = &write_back {
				write_back(items.borrow().as_slice(), value);
			}
		};
		self.body
			.base
			.body
			.assign(value, Origin::External, Some(push))
	}

	pub fn items(&self) -> Ref<'_, [I]> {
		Ref::map(self.body.items.borrow(), |items| items.as_slice())
	}

	pub fn len(&self) -> usize {
		self.body.items.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.body.items.borrow().is_empty()
	}

	/// Number of distinct notifiers currently listened to.
	pub fn trigger_count(&self) -> usize {
		self.body.links.borrow().len()
	}

	pub fn add_item(&self, item: I) -> Result<(), Error> {
		self.add_items([item])
	}

	pub fn add_items(&self, items: impl IntoIterator<Item = I>) -> Result<(), Error> {
		self.body.ensure_idle()?;
		self.body.link_items(items);
		self.body.evaluate().map(drop)
	}

	pub fn remove_item(&self, item: &I) -> Result<(), Error>
	where
		I: PartialEq,
	{
		self.remove_items([item])
	}

	/// Removes the first item equal to each of `items`; unknown items are
	/// ignored.
	pub fn remove_items<'a>(&self, items: impl IntoIterator<Item = &'a I>) -> Result<(), Error>
	where
		I: PartialEq + 'a,
	{
		self.body.ensure_idle()?;
		let removed = self.body.unlink_items(items);
		trace!(removed, "items removed");
		self.body.evaluate().map(drop)
	}

	pub fn remove_all_items(&self) -> Result<(), Error> {
		self.body.ensure_idle()?;
		self.body.clear_items();
		self.body.evaluate().map(drop)
	}

	/// Replaces the tracked items.
	pub fn configure(&self, items: impl IntoIterator<Item = I>) -> Result<(), Error> {
		self.body.ensure_idle()?;
		self.body.clear_items();
		self.body.link_items(items);
		self.body.evaluate().map(drop)
	}

	/// Replaces the tracked items, the value function and the write-back
	/// callback.
	pub fn configure_with<F, W>(
		&self,
		items: impl IntoIterator<Item = I>,
		value_fn: F,
		write_back: W,
	) -> Result<(), Error>
	where
		F: Fn(&[I]) -> T + 'static,
		W: Fn(&[I], &T) + 'static,
	{
		self.body.ensure_idle()?;
		self.body.clear_items();
		self.body.link_items(items);
		*self.body.value_fn.borrow_mut() = Rc::new(value_fn);
		*self.body.write_back.borrow_mut() = Some(Rc::new(write_back));
		self.body.evaluate().map(drop)
	}

	pub fn phase(&self) -> Phase {
		self.body.base.phase()
	}

	pub fn is_changing(&self) -> bool {
		self.body.base.is_changing()
	}

	pub fn error(&self) -> String {
		self.body.base.error()
	}

	pub fn has_errors(&self) -> bool {
		self.body.base.has_errors()
	}

	pub fn error_for(&self, property: &str) -> Option<String> {
		self.body.base.error_for(property)
	}

	pub fn subscribe(&self, listener: impl Fn(&Event) + 'static) -> Token {
		self.body.base.subscribe(listener)
	}

	pub fn unsubscribe(&self, token: Token) -> bool {
		self.body.base.unsubscribe(token)
	}

	pub fn add_validation(
		&self,
		predicate: impl Fn(&T) -> bool + 'static,
		message: &str,
	) -> Result<(), Error> {
		self.body.base.add_validation(predicate, message)
	}

	/// Adds a rule that also sees the current items.
	pub fn add_item_validation(
		&self,
		predicate: impl Fn(&T, &[I]) -> bool + 'static,
		message: &str,
	) -> Result<(), Error> {
		let this = Rc::downgrade(&self.body);
		self.body.base.add_validation(
			move |value| {
				let Some(body) = this.upgrade() else {
					return true;
				};
				let items = body.items.borrow();
				predicate(value, items.as_slice())
			},
			message,
		)
	}

	pub fn rule_count(&self) -> usize {
		self.body.base.rule_count()
	}

	pub fn add_validation_trigger<N>(&self, source: &N)
	where
		N: Notify + ?Sized,
	{
		self.body.base.add_validation_trigger(source)
	}

	pub fn remove_validation_trigger<N>(&self, source: &N)
	where
		N: Notify + ?Sized,
	{
		self.body.base.remove_validation_trigger(source)
	}

	/// Stops tracking every item, then disposes the value itself.
	pub fn dispose(&self) {
		self.body.clear_items();
		self.body.base.dispose();
	}

	pub fn is_disposed(&self) -> bool {
		self.body.base.is_disposed()
	}

	pub fn as_value(&self) -> Value<T> {
		Value::new(self.body.clone())
	}
}

impl<I, T> DerivedBody<I, T>
where
	I: 'static,
	T: PartialEq + 'static,
{
	fn ensure_idle(&self) -> Result<(), Error> {
		if self.base.is_disposed() {
			return Err(Error::Disposed);
		}
		if self.base.phase() != Phase::Idle {
			warn!(phase = ?self.base.phase(), "rejected item change during assignment");
			return Err(Error::Reentrant);
		}
		Ok(())
	}

	fn on_trigger(&self) {
		let phase = self.base.phase();
		if phase != Phase::Idle {
			debug!(?phase, "recomputation skipped");
			return;
		}

		if let Err(err) = self.evaluate() {
			warn!(%err, "recomputation failed");
		}
	}

	fn evaluate(&self) -> Result<bool, Error> {
		let value = {
			let _guard = PhaseGuard::enter(&self.base.body.phase, Phase::Evaluating)?;
			let value_fn = self.value_fn.borrow().clone();
			let items = self.items.borrow();
			trace!(items = items.len(), "recomputing derived value");
			value_fn(items.as_slice())
		};

		self.base.body.assign(value, Origin::Internal, None)
	}

	fn link_items(&self, items: impl IntoIterator<Item = I>) {
		let items: Vec<I> = items.into_iter().collect();
		let linked: Vec<Linked> = {
			let mut links = self.links.borrow_mut();
			items
				.iter()
				.map(|item| link_item::<I>(&mut links, &*self.selector, item, &self.recompute))
				.collect()
		};
		self.items.borrow_mut().extend(items);
		self.linked.borrow_mut().extend(linked);
	}

	fn unlink_items<'a>(&self, items: impl IntoIterator<Item = &'a I>) -> usize
	where
		I: PartialEq + 'a,
	{
		let mut removed = 0;
		for item in items {
			let position = self.items.borrow().iter().position(|it| it == item);
			let Some(index) = position else {
				continue;
			};

			self.items.borrow_mut().remove(index);
			let linked = self.linked.borrow_mut().remove(index);
			let mut links = self.links.borrow_mut();
			for trigger in &linked {
				links.unlink(trigger);
			}
			removed += 1;
		}
		removed
	}

	fn clear_items(&self) {
		self.links.borrow_mut().clear();
		self.linked.borrow_mut().clear();
		let items = std::mem::take(&mut *self.items.borrow_mut());
		drop(items);
	}
}

/// Links the triggers `selector` reports for `item` and returns them, so
/// the same set can be unlinked later.
fn link_item<I>(
	links: &mut Dependencies,
	selector: &dyn Fn(&I) -> Vec<Notifier>,
	item: &I,
	recompute: &Rc<dyn Fn()>,
) -> Linked {
	let triggers: Linked = selector(item).into_iter().collect();
	for trigger in &triggers {
		links.link(trigger, recompute);
	}
	triggers
}

impl<I, T> Access<T> for DerivedBody<I, T>
where
	I: 'static,
	T: 'static,
{
	fn get_ref(&self) -> Ref<'_, T> {
		self.base.body.get_ref()
	}

	fn notifier(&self) -> &Notifier {
		self.base.body.notifier()
	}

	fn phase(&self) -> Phase {
		self.base.body.phase()
	}

	fn error(&self) -> String {
		self.base.body.error()
	}
}

impl<I, T> Notify for Derived<I, T> {
	fn notifier(&self) -> &Notifier {
		self.body.base.notifier()
	}
}

impl<I, T> Triggers for Derived<I, T> {
	fn triggers(&self) -> Vec<Notifier> {
		vec![self.body.base.notifier().clone()]
	}
}

impl<I, T> From<Derived<I, T>> for Value<T>
where
	I: 'static,
	T: 'static,
{
	fn from(derived: Derived<I, T>) -> Self {
		Value::new(derived.body)
	}
}

impl<I, T> Debug for Derived<I, T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.body.base.fmt(f)
	}
}
