use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use mockall::predicate::eq;
use viewtools::{Derived, Error, Notifier, Notify, Observable, Phase, Triggers};

use crate::mock::{SharedMock, Spy};
use crate::trace;

#[derive(Clone, PartialEq)]
struct Task {
	title: &'static str,
	done: Observable<bool>,
}

impl Task {
	fn new(title: &'static str, done: bool) -> Self {
		Task {
			title,
			done: Observable::new(done),
		}
	}
}

impl Triggers for Task {
	fn triggers(&self) -> Vec<Notifier> {
		vec![self.done.notifier().clone()]
	}
}

fn done_count(tasks: &[Task]) -> usize {
	tasks.iter().filter(|task| task.done.get()).count()
}

/// Counts how often the value function ran.
fn counted(calls: &Rc<Cell<usize>>) -> impl Fn(&[Task]) -> usize + 'static {
	let calls = calls.clone();
	move |tasks| {
		calls.set(calls.get() + 1);
		done_count(tasks)
	}
}

#[test]
fn adding_items_recomputes_once() {
	trace();
	let mock = SharedMock::new();
	mock.get()
		.expect_computed()
		.with(eq(1))
		.times(1)
		.return_const(());

	let done = Derived::from_items([Task::new("a", false), Task::new("b", true)], {
		let mock = mock.clone();
		move |tasks: &[Task]| {
			let count = done_count(tasks);
			mock.get().computed(count);
			count
		}
	});
	assert_eq!(done.get(), 1);
	mock.get().checkpoint();

	mock.get()
		.expect_computed()
		.with(eq(2))
		.times(1)
		.return_const(());
	done.add_items([Task::new("c", true)]).unwrap();
	mock.get().checkpoint();

	assert_eq!(done.get(), 2);
	assert_eq!(done.len(), 3);
}

#[test]
fn bulk_add_runs_the_value_function_once() {
	let calls = Rc::new(Cell::new(0));
	let done = Derived::from_items(Vec::<Task>::new(), counted(&calls));
	assert_eq!(calls.get(), 1);

	done.add_items((0..5).map(|_| Task::new("bulk", true))).unwrap();
	assert_eq!(calls.get(), 2);
	assert_eq!(done.get(), 5);
	assert_eq!(done.trigger_count(), 5);
}

#[test]
fn item_changes_recompute() {
	let tasks = [Task::new("a", false), Task::new("b", false)];
	let done = Derived::from_items(tasks.clone(), done_count);

	tasks[0].done.set(true).unwrap();
	assert_eq!(done.get(), 1);
	tasks[1].done.set(true).unwrap();
	assert_eq!(done.get(), 2);
}

#[test]
fn removed_items_no_longer_trigger() {
	let calls = Rc::new(Cell::new(0));
	let kept = Task::new("kept", true);
	let removed = Task::new("removed", true);
	let done = Derived::from_items([kept.clone(), removed.clone()], counted(&calls));
	assert_eq!(done.get(), 2);

	done.remove_item(&removed).unwrap();
	assert_eq!(done.get(), 1);
	assert_eq!(removed.done.notifier().listener_count(), 0);

	let before = calls.get();
	removed.done.set(false).unwrap();
	assert_eq!(calls.get(), before);
	assert_eq!(done.get(), 1);

	done.remove_item(&Task::new("unknown", true)).unwrap();
	assert_eq!(done.len(), 1);
}

#[test]
fn duplicate_items_share_one_subscription() {
	let calls = Rc::new(Cell::new(0));
	let task = Task::new("twice", false);
	let done = Derived::from_items([task.clone(), task.clone()], counted(&calls));
	assert_eq!(done.trigger_count(), 1);
	assert_eq!(task.done.notifier().listener_count(), 1);

	let before = calls.get();
	task.done.set(true).unwrap();
	assert_eq!(calls.get(), before + 1);
	assert_eq!(done.get(), 2);

	done.remove_item(&task).unwrap();
	assert_eq!(done.get(), 1);
	assert_eq!(task.done.notifier().listener_count(), 1);

	done.remove_item(&task).unwrap();
	assert_eq!(done.get(), 0);
	assert_eq!(task.done.notifier().listener_count(), 0);
}

#[derive(Clone, PartialEq)]
struct Counter {
	done: Observable<bool>,
	touched: Observable<u32>,
}

#[test]
fn value_function_writing_its_dependencies_does_not_recurse() {
	let calls = Rc::new(Cell::new(0));
	let item = Counter {
		done: Observable::new(false),
		touched: Observable::new(0),
	};

	let done = Derived::new(
		[item.clone()],
		|item: &Counter| vec![item.done.notifier().clone(), item.touched.notifier().clone()],
		{
			let calls = calls.clone();
			move |items: &[Counter]| {
				calls.set(calls.get() + 1);
				for item in items {
					item.touched.set(item.touched.get() + 1).unwrap();
				}
				items.iter().filter(|item| item.done.get()).count()
			}
		},
	);
	assert_eq!(calls.get(), 1);

	item.done.set(true).unwrap();
	assert_eq!(calls.get(), 2);
	assert_eq!(item.touched.get(), 2);
	assert_eq!(done.get(), 1);
	assert_eq!(done.phase(), Phase::Idle);
}

#[test]
fn external_write_is_pushed_back_without_recomputing() {
	let calls = Rc::new(Cell::new(0));
	let pushed = Rc::new(Cell::new(0));
	let tasks = [Task::new("a", false), Task::new("b", true)];

	let all_done = Derived::from_items(tasks.clone(), {
		let calls = calls.clone();
		move |tasks: &[Task]| {
			calls.set(calls.get() + 1);
			tasks.iter().all(|task| task.done.get())
		}
	})
	.with_write_back({
		let pushed = pushed.clone();
		move |tasks, done| {
			pushed.set(pushed.get() + 1);
			for task in tasks {
				task.done.set(*done).unwrap();
			}
		}
	});
	assert!(!all_done.get());

	assert_eq!(all_done.set(true), Ok(true));
	assert_eq!(pushed.get(), 1);
	assert_eq!(calls.get(), 1);
	assert!(tasks.iter().all(|task| task.done.get()));

	tasks[0].done.set(false).unwrap();
	assert!(!all_done.get());
	assert_eq!(calls.get(), 2);
	assert_eq!(pushed.get(), 1);
}

#[test]
fn recomputation_never_writes_back() {
	let pushed = Rc::new(Cell::new(0));
	let tasks = vec![Task::new("a", true)];
	let done = Derived::from_items(tasks, done_count);

	done.configure_with(
		[Task::new("b", true), Task::new("c", true)],
		done_count,
		{
			let pushed = pushed.clone();
			move |_, _| pushed.set(pushed.get() + 1)
		},
	)
	.unwrap();
	assert_eq!(done.get(), 2);
	assert_eq!(pushed.get(), 0);

	done.add_item(Task::new("d", true)).unwrap();
	assert_eq!(pushed.get(), 0);

	done.set(0).unwrap();
	assert_eq!(pushed.get(), 1);
}

#[test]
fn configure_replaces_items_and_formula() {
	let old = Task::new("old", true);
	let summary = Derived::from_items([old.clone()], |tasks: &[Task]| done_count(tasks).to_string());
	assert_eq!(summary.get(), "1");

	let fresh = [Task::new("x", false), Task::new("y", true)];
	summary
		.configure_with(
			fresh.clone(),
			|tasks: &[Task]| {
				tasks
					.iter()
					.filter(|task| !task.done.get())
					.map(|task| task.title)
					.collect::<Vec<_>>()
					.join(",")
			},
			|_, _| {},
		)
		.unwrap();

	assert_eq!(summary.get(), "x");
	assert_eq!(old.done.notifier().listener_count(), 0);

	fresh[1].done.set(false).unwrap();
	assert_eq!(summary.get(), "x,y");

	summary.configure([old.clone()]).unwrap();
	assert_eq!(summary.get(), "");
	assert_eq!(fresh[0].done.notifier().listener_count(), 0);
}

#[test]
fn remove_all_items_and_dispose() {
	let tasks = [Task::new("a", true), Task::new("b", true)];
	let done = Derived::from_items(tasks.clone(), done_count);

	done.remove_all_items().unwrap();
	assert_eq!(done.get(), 0);
	assert!(done.is_empty());
	assert_eq!(done.trigger_count(), 0);

	done.add_items(tasks.clone()).unwrap();
	done.add_validation(|count| *count < 5, "too many").unwrap();
	done.dispose();
	done.dispose();

	assert!(done.is_disposed());
	assert_eq!(done.rule_count(), 0);
	assert_eq!(tasks[0].done.notifier().listener_count(), 0);
	assert_eq!(done.add_item(Task::new("late", true)), Err(Error::Disposed));
	assert_eq!(done.len(), 0);
}

#[test]
fn item_validation_sees_the_items() {
	let tasks = [Task::new("a", false), Task::new("b", false)];
	let done = Derived::from_items(tasks.clone(), done_count);
	done.add_item_validation(
		|count, tasks| *count < tasks.len(),
		"at least one task must stay open",
	)
	.unwrap();
	assert!(!done.has_errors());

	tasks[0].done.set(true).unwrap();
	tasks[1].done.set(true).unwrap();
	assert!(done.has_errors());
	assert_eq!(done.error(), "at least one task must stay open");

	done.add_item(Task::new("c", false)).unwrap();
	assert!(!done.has_errors());
}

#[test]
fn panicking_value_function_leaves_a_usable_value() {
	let done = Derived::from_items([Task::new("a", true)], |tasks: &[Task]| {
		assert!(tasks.len() < 3, "too many tasks");
		done_count(tasks)
	});

	let extra = [Task::new("b", true), Task::new("c", true)];
	let result = catch_unwind(AssertUnwindSafe(|| done.add_items(extra.clone())));
	assert!(result.is_err());
	assert_eq!(done.phase(), Phase::Idle);
	assert_eq!(done.get(), 1);

	done.remove_item(&extra[1]).unwrap();
	assert_eq!(done.get(), 2);
}

struct Photo {
	name: RefCell<String>,
	notifier: Notifier,
}

impl Photo {
	fn new(name: &str) -> Rc<Self> {
		Rc::new(Photo {
			name: RefCell::new(name.to_owned()),
			notifier: Notifier::new(),
		})
	}

	fn rename(&self, name: &str) {
		*self.name.borrow_mut() = name.to_owned();
		self.notifier.property_changed("Name");
	}
}

impl Triggers for Photo {
	fn triggers(&self) -> Vec<Notifier> {
		vec![self.notifier.clone()]
	}
}

#[test]
fn plain_entities_trigger_on_property_changed() {
	let first = Photo::new("a.jpg");
	let names = Derived::from_items([first.clone(), Photo::new("b.jpg")], |photos: &[Rc<Photo>]| {
		photos
			.iter()
			.map(|photo| photo.name.borrow().clone())
			.collect::<Vec<_>>()
			.join(";")
	});
	assert_eq!(names.get(), "a.jpg;b.jpg");

	first.rename("c.jpg");
	assert_eq!(names.get(), "c.jpg;b.jpg");
}

struct Fixed(u32);

impl Triggers for Fixed {}

#[test]
fn items_without_triggers_never_recompute_on_their_own() {
	let total = Derived::from_items([Fixed(1), Fixed(2)], |items: &[Fixed]| {
		items.iter().map(|item| item.0).sum::<u32>()
	});
	assert_eq!(total.get(), 3);
	assert_eq!(total.trigger_count(), 0);

	total.add_item(Fixed(4)).unwrap();
	assert_eq!(total.get(), 7);
}

#[test]
fn dropping_the_derived_value_unsubscribes() {
	let task = Task::new("a", false);
	{
		let done = Derived::from_items([task.clone()], done_count);
		assert_eq!(task.done.notifier().listener_count(), 1);
		assert_eq!(done.get(), 0);
	}
	assert_eq!(task.done.notifier().listener_count(), 0);
}

#[test]
fn derived_values_can_feed_other_derived_values() {
	let tasks = [Task::new("a", false), Task::new("b", false)];
	let done = Derived::from_items(tasks.clone(), done_count);
	let finished = Derived::from_items([done.clone()], |counts: &[Derived<Task, usize>]| {
		counts[0].get() == 2
	});

	tasks[0].done.set(true).unwrap();
	assert!(!finished.get());
	tasks[1].done.set(true).unwrap();
	assert!(finished.get());
}

#[test]
fn read_handles_share_the_derived_state() {
	let tasks = [Task::new("a", true), Task::new("b", false)];
	let done = Derived::from_items(tasks.clone(), done_count);
	done.add_validation(|count| *count > 1, "finish another task").unwrap();

	let value = done.as_value();
	assert_eq!(value.get(), 1);
	assert!(value.has_errors());
	assert!(!value.is_changing());

	tasks[1].done.set(true).unwrap();
	assert_eq!(value.get(), 2);
	assert_eq!(value.error(), "");

	let titles: Vec<_> = done.items().iter().map(|task| task.title).collect();
	assert_eq!(titles, vec!["a", "b"]);
}

/// An entity whose trigger can be swapped after it was added.
struct Slot {
	value: Cell<i32>,
	notifier: RefCell<Notifier>,
}

impl Slot {
	fn new(value: i32) -> Rc<Self> {
		Rc::new(Slot {
			value: Cell::new(value),
			notifier: RefCell::new(Notifier::new()),
		})
	}

	fn store(&self, value: i32) {
		self.value.set(value);
		self.notifier.borrow().property_changed("Value");
	}
}

impl PartialEq for Slot {
	fn eq(&self, other: &Self) -> bool {
		std::ptr::eq(self, other)
	}
}

impl Triggers for Slot {
	fn triggers(&self) -> Vec<Notifier> {
		vec![self.notifier.borrow().clone()]
	}
}

fn slot_sum(slots: &[Rc<Slot>]) -> i32 {
	slots.iter().map(|slot| slot.value.get()).sum()
}

#[test]
fn removal_unlinks_the_triggers_linked_on_add() {
	let a = Slot::new(1);
	let b = Slot::new(2);
	let sum = Derived::from_items([a.clone(), b.clone()], slot_sum);
	assert_eq!(sum.get(), 3);

	let linked_for_a = a.notifier.replace(b.notifier.borrow().clone());
	sum.remove_item(&a).unwrap();
	assert_eq!(linked_for_a.listener_count(), 0);
	assert_eq!(sum.trigger_count(), 1);

	b.store(40);
	assert_eq!(sum.get(), 40);
}

#[test]
fn reconfiguring_releases_swapped_triggers() {
	let a = Slot::new(1);
	let sum = Derived::from_items([a.clone()], slot_sum);

	let linked_for_a = a.notifier.replace(Notifier::new());
	sum.configure([Slot::new(5)]).unwrap();
	assert_eq!(linked_for_a.listener_count(), 0);
	assert_eq!(sum.get(), 5);
}

#[test]
fn items_sharing_a_notifier_keep_triggering_after_one_is_removed() {
	let shared = Notifier::new();
	let a = Slot::new(1);
	let b = Slot::new(2);
	*a.notifier.borrow_mut() = shared.clone();
	*b.notifier.borrow_mut() = shared.clone();

	let sum = Derived::from_items([a.clone(), b.clone()], slot_sum);
	assert_eq!(shared.listener_count(), 1);

	sum.remove_item(&a).unwrap();
	assert_eq!(sum.get(), 2);
	assert_eq!(shared.listener_count(), 1);

	b.store(7);
	assert_eq!(sum.get(), 7);

	sum.remove_item(&b).unwrap();
	assert_eq!(shared.listener_count(), 0);
}
