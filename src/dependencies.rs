use std::collections::BTreeMap;
use std::rc::Rc;

use crate::addr::RcAddr;
use crate::notifier::{Notifier, NotifierBody, Token};

/// Edge table from one dependent to the notifiers it listens to.
///
/// Each notifier is subscribed at most once; linking it again only counts
/// the extra reference, so one event still runs the handler once.
pub(crate) struct Dependencies {
	edges: BTreeMap<RcAddr<NotifierBody>, Edge>,
}

struct Edge {
	notifier: Notifier,
	token: Token,
	count: usize,
}

impl Default for Dependencies {
	fn default() -> Self {
		Dependencies::new()
	}
}

impl Dependencies {
	pub fn new() -> Self {
		Self {
			edges: BTreeMap::new(),
		}
	}

	/// Returns `true` when this created a new subscription.
	pub fn link(&mut self, notifier: &Notifier, handler: &Rc<dyn Fn()>) -> bool {
		if let Some(edge) = self.edges.get_mut(&notifier.addr()) {
			edge.count += 1;
			return false;
		}

		let handler = handler.clone();
		let token = notifier.on_change(move || handler());
		self.edges.insert(
			notifier.addr(),
			Edge {
				notifier: notifier.clone(),
				token,
				count: 1,
			},
		);

		true
	}

	/// Returns `true` when this removed the subscription.
	pub fn unlink(&mut self, notifier: &Notifier) -> bool {
		let key = notifier.addr();
		let Some(edge) = self.edges.get_mut(&key) else {
			return false;
		};

		edge.count -= 1;
		if edge.count > 0 {
			return false;
		}

		if let Some(edge) = self.edges.remove(&key) {
			edge.notifier.unsubscribe(edge.token);
		}

		true
	}

	pub fn clear(&mut self) {
		for (_, edge) in std::mem::take(&mut self.edges) {
			edge.notifier.unsubscribe(edge.token);
		}
	}

	pub fn len(&self) -> usize {
		self.edges.len()
	}
}

impl Drop for Dependencies {
	fn drop(&mut self) {
		self.clear()
	}
}
