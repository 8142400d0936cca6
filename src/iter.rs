//! Iterator adapters for ordering, grouping and batching item collections,
//! on top of [`Itertools`].

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use itertools::Itertools;

pub trait IteratorExt: Iterator + Sized {
	/// Yields `fallback` when the source turns out to be empty.
	fn default_if_empty<D>(self, fallback: D) -> DefaultIfEmpty<Self, D::IntoIter>
	where
		D: IntoIterator<Item = Self::Item>,
	{
		DefaultIfEmpty {
			source: Some(self),
			seen: false,
			fallback: Some(fallback.into_iter()),
		}
	}

	/// Like [`default_if_empty`](IteratorExt::default_if_empty), but only
	/// builds the single fallback item when it is needed.
	fn default_if_empty_with<F>(self, factory: F) -> DefaultIfEmpty<Self, Lazy<F>>
	where
		F: FnOnce() -> Self::Item,
	{
		DefaultIfEmpty {
			source: Some(self),
			seen: false,
			fallback: Some(Lazy(Some(factory))),
		}
	}

	/// Drops the last `count` items.
	fn skip_last(self, count: usize) -> SkipLast<Self> {
		SkipLast {
			iter: self,
			buffer: VecDeque::with_capacity(count + 1),
			count,
		}
	}

	/// Keeps only the last `count` items.
	fn take_last(self, count: usize) -> std::vec::IntoIter<Self::Item> {
		self.tail(count).collect::<Vec<_>>().into_iter()
	}

	/// Splits the items into batches of `size`; the last batch may be
	/// shorter.
	///
	/// # Panics
	///
	/// Panics when `size` is zero.
	fn chunked(self, size: usize) -> std::vec::IntoIter<Vec<Self::Item>> {
		let chunks = self.chunks(size);
		let batches: Vec<Vec<Self::Item>> = chunks.into_iter().map(|chunk| chunk.collect()).collect();
		batches.into_iter()
	}

	/// Stable sort by a key compared with `compare`.
	fn sorted_by_key_with<K, F, C>(self, key: F, compare: C) -> std::vec::IntoIter<Self::Item>
	where
		F: Fn(&Self::Item) -> K,
		C: Fn(&K, &K) -> Ordering,
	{
		self.sorted_by(|a, b| compare(&key(a), &key(b)))
	}

	/// Stable sort by a key compared with `compare`, largest first.
	fn sorted_by_key_with_desc<K, F, C>(self, key: F, compare: C) -> std::vec::IntoIter<Self::Item>
	where
		F: Fn(&Self::Item) -> K,
		C: Fn(&K, &K) -> Ordering,
	{
		self.sorted_by(|a, b| compare(&key(b), &key(a)))
	}

	/// Groups items by key, keeping their relative order inside each group.
	fn grouped_by<K, F>(self, key: F) -> HashMap<K, Vec<Self::Item>>
	where
		K: Hash + Eq,
		F: FnMut(&Self::Item) -> K,
	{
		self.into_group_map_by(key)
	}
}

impl<I: Iterator> IteratorExt for I {}

pub struct DefaultIfEmpty<I, D> {
	source: Option<I>,
	seen: bool,
	fallback: Option<D>,
}

impl<I, D> Iterator for DefaultIfEmpty<I, D>
where
	I: Iterator,
	D: Iterator<Item = I::Item>,
{
	type Item = I::Item;

	fn next(&mut self) -> Option<Self::Item> {
		if let Some(source) = &mut self.source {
			match source.next() {
				Some(item) => {
					self.seen = true;
					return Some(item);
				}
				None => {
					self.source = None;
					if self.seen {
						self.fallback = None;
					}
				}
			}
		}

		self.fallback.as_mut()?.next()
	}
}

/// Yields the result of a factory once.
pub struct Lazy<F>(Option<F>);

impl<F, T> Iterator for Lazy<F>
where
	F: FnOnce() -> T,
{
	type Item = T;

	fn next(&mut self) -> Option<T> {
		self.0.take().map(|factory| factory())
	}
}

pub struct SkipLast<I: Iterator> {
	iter: I,
	buffer: VecDeque<I::Item>,
	count: usize,
}

impl<I: Iterator> Iterator for SkipLast<I> {
	type Item = I::Item;

	fn next(&mut self) -> Option<Self::Item> {
		while self.buffer.len() <= self.count {
			self.buffer.push_back(self.iter.next()?);
		}
		self.buffer.pop_front()
	}
}
