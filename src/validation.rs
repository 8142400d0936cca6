use std::rc::Rc;

use smallvec::SmallVec;

use crate::dependencies::Dependencies;
use crate::{Error, Notifier};

pub(crate) type Predicate<T> = Rc<dyn Fn(&T) -> bool>;

pub(crate) struct Rule<T> {
	predicate: Predicate<T>,
	message: String,
}

pub(crate) type Rules<T> = SmallVec<[Rc<Rule<T>>; 4]>;

/// Rule set of one observable together with its last computed error.
pub(crate) struct Validator<T> {
	rules: Rules<T>,
	error: String,
	triggers: Dependencies,
}

impl<T> Validator<T> {
	pub fn new() -> Self {
		Validator {
			rules: SmallVec::new(),
			error: String::new(),
			triggers: Dependencies::new(),
		}
	}

	pub fn add_rule(&mut self, predicate: Predicate<T>, message: &str) -> Result<(), Error> {
		if message.trim().is_empty() {
			return Err(Error::InvalidArgument(
				"validation message must not be empty".into(),
			));
		}

		self.rules.push(Rc::new(Rule {
			predicate,
			message: message.to_owned(),
		}));

		Ok(())
	}

	/// Rules are evaluated on a snapshot so a predicate may touch the
	/// owning observable without holding this validator borrowed.
	pub fn rules(&self) -> Rules<T> {
		self.rules.clone()
	}

	pub fn rule_count(&self) -> usize {
		self.rules.len()
	}

	pub fn error(&self) -> &str {
		&self.error
	}

	/// Stores `error`, returning whether it differs from the previous one.
	pub fn replace_error(&mut self, error: String) -> bool {
		if self.error == error {
			return false;
		}
		self.error = error;
		true
	}

	pub fn add_trigger(&mut self, trigger: &Notifier, handler: &Rc<dyn Fn()>) {
		self.triggers.link(trigger, handler);
	}

	pub fn remove_trigger(&mut self, trigger: &Notifier) {
		self.triggers.unlink(trigger);
	}

	pub fn trigger_count(&self) -> usize {
		self.triggers.len()
	}

	pub fn clear(&mut self) {
		self.rules.clear();
		self.triggers.clear();
	}
}

/// Joins the messages of every failing rule, in the order the rules were
/// added.
pub(crate) fn evaluate<T>(rules: &[Rc<Rule<T>>], value: &T) -> String {
	rules
		.iter()
		.filter(|rule| !(rule.predicate)(value))
		.map(|rule| rule.message.as_str())
		.collect::<Vec<_>>()
		.join("\n")
}
