use std::{
	hash::Hash,
	num::NonZeroUsize,
	sync::{Mutex, MutexGuard, PoisonError},
	time::Duration,
};

use lru::LruCache;
use tokio::time::Instant;

/// In-process TTL cache. Past `max_entries` the oldest insert is evicted.
///
/// Reads go through `peek`, so only inserts move an entry to the back of the eviction order.
pub struct TtlCache<K, V> {
	ttl: Duration,
	entries: Mutex<LruCache<K, (Instant, V)>>,
}
impl<K, V> TtlCache<K, V>
where
	K: Eq + Hash,
	V: Clone,
{
	pub fn new(ttl: Duration, max_entries: usize) -> Self {
		let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);

		Self { ttl, entries: Mutex::new(LruCache::new(capacity)) }
	}

	pub fn get(&self, key: &K) -> Option<V> {
		let mut entries = self.entries();
		let (stored_at, value) = entries.peek(key)?;

		if stored_at.elapsed() < self.ttl {
			return Some(value.clone());
		}

		entries.pop(key);

		None
	}

	pub fn insert(&self, key: K, value: V) {
		self.entries().put(key, (Instant::now(), value));
	}

	pub fn len(&self) -> usize {
		self.entries().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn entries(&self) -> MutexGuard<'_, LruCache<K, (Instant, V)>> {
		self.entries.lock().unwrap_or_else(PoisonError::into_inner)
	}
}
