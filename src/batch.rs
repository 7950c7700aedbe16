use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fxhash::{FxHashMap, FxHashSet};

use crate::notifier::NotifierBody;
use crate::{Error, Notifier, PropertyName, Result};

/// Property changes recorded while a batch is open.
///
/// Not meant to be shared between threads, the owning notifier keeps it
/// behind a lock only so that the notifier itself stays `Sync`.
pub(crate) struct BatchState {
	id: u64,
	origins: FxHashMap<PropertyName, Origin>,
	ordered: Vec<PropertyName>,
}

struct Origin {
	value: Box<dyn Any + Send>,
	changed: bool,
}

impl BatchState {
	fn new(id: u64) -> Self {
		BatchState {
			id,
			origins: FxHashMap::default(),
			ordered: Vec::new(),
		}
	}

	/// The first report of a property pins its origin value, every report
	/// compares the newest value against it.
	pub(crate) fn add_change<T>(
		&mut self,
		property: PropertyName,
		old: T,
		new: &T,
		comparer: Option<&dyn Fn(&T, &T) -> bool>,
	) where
		T: Send + 'static,
	{
		let origin = self
			.origins
			.entry(property.clone())
			.or_insert_with(|| Origin {
				value: Box::new(old),
				changed: true,
			});

		origin.changed = match (comparer, origin.value.downcast_ref::<T>()) {
			(Some(eq), Some(value)) => !eq(value, new),
			_ => true,
		};

		self.ordered.push(property);
	}

	/// Changed properties in order of their first report.
	pub(crate) fn changed_properties(&self) -> Vec<PropertyName> {
		let mut seen = FxHashSet::default();
		self.ordered
			.iter()
			.filter(|name| seen.insert(*name))
			.filter(|name| self.origins.get(*name).map_or(false, |origin| origin.changed))
			.cloned()
			.collect()
	}
}

/// An open batch of property changes on a [`Notifier`].
///
/// Closing the batch announces every property whose final value differs
/// from its value when the batch began, once, in the order the properties
/// were first changed.
#[must_use = "changes are not announced until the batch is closed"]
pub struct Batch {
	notifier: Arc<NotifierBody>,
	id: u64,
	released: AtomicBool,
}

impl Notifier {
	/// Starts recording property changes. Fails if a batch is already open.
	pub fn begin_batch(&self) -> Result<Batch> {
		let mut batch = self.body.batch.lock();
		if batch.is_some() {
			return Err(Error::InvalidOperation(
				"a batch is already active on this notifier".into(),
			));
		}

		let id = self.body.next_batch.fetch_add(1, Ordering::Relaxed);
		*batch = Some(BatchState::new(id));
		tracing::debug!(notifier = %self.id(), batch = id, "batch started");

		Ok(Batch {
			notifier: self.body.clone(),
			id,
			released: AtomicBool::new(false),
		})
	}

	/// Runs `func` inside a batch and closes it afterwards.
	pub fn batch<R>(&self, func: impl FnOnce() -> R) -> Result<R> {
		let batch = self.begin_batch()?;
		let result = func();
		batch.close()?;
		Ok(result)
	}

	pub fn in_batch(&self) -> bool {
		self.body.batch.lock().is_some()
	}
}

impl Batch {
	/// Ends the batch and announces the coalesced changes. Closing twice is
	/// a no-op.
	pub fn close(&self) -> Result<()> {
		if self.released.swap(true, Ordering::AcqRel) {
			return Ok(());
		}

		let state = {
			let mut batch = self.notifier.batch.lock();
			match batch.take() {
				Some(state) if state.id == self.id => state,
				other => {
					*batch = other;
					return Err(Error::InvalidOperation(
						"batch is not the active batch of its notifier".into(),
					));
				}
			}
		};

		let changed = state.changed_properties();
		tracing::debug!(
			notifier = %self.notifier.id(),
			batch = self.id,
			reported = state.ordered.len(),
			changed = changed.len(),
			"batch closed"
		);

		if !changed.is_empty() {
			NotifierBody::notify_many(&self.notifier, changed.into_iter());
		}

		Ok(())
	}

	pub fn is_closed(&self) -> bool {
		self.released.load(Ordering::Acquire)
	}
}

impl Drop for Batch {
	fn drop(&mut self) {
		if let Err(err) = self.close() {
			tracing::error!(%err, "failed to close batch");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::BatchState;
	use crate::PropertyName;

	fn name(s: &str) -> PropertyName {
		s.into()
	}

	#[test]
	fn round_trip_is_not_a_change() {
		let eq: &dyn Fn(&i32, &i32) -> bool = &|a, b| a == b;
		let mut state = BatchState::new(0);

		state.add_change(name("x"), 1, &2, Some(eq));
		state.add_change(name("x"), 2, &1, Some(eq));

		assert!(state.changed_properties().is_empty());
	}

	#[test]
	fn origin_is_pinned_by_first_report() {
		let eq: &dyn Fn(&i32, &i32) -> bool = &|a, b| a == b;
		let mut state = BatchState::new(0);

		state.add_change(name("x"), 1, &2, Some(eq));
		state.add_change(name("x"), 2, &3, Some(eq));
		state.add_change(name("x"), 3, &1, Some(eq));
		state.add_change(name("x"), 1, &4, Some(eq));

		assert_eq!(state.changed_properties(), vec![name("x")]);
	}

	#[test]
	fn missing_comparer_always_changes() {
		let mut state = BatchState::new(0);

		state.add_change::<i32>(name("x"), 1, &2, None);
		state.add_change::<i32>(name("x"), 2, &1, None);

		assert_eq!(state.changed_properties(), vec![name("x")]);
	}

	#[test]
	fn first_occurrence_order() {
		let eq: &dyn Fn(&i32, &i32) -> bool = &|a, b| a == b;
		let mut state = BatchState::new(0);

		state.add_change(name("b"), 0, &1, Some(eq));
		state.add_change(name("a"), 0, &1, Some(eq));
		state.add_change(name("c"), 0, &1, Some(eq));
		state.add_change(name("b"), 1, &2, Some(eq));
		state.add_change(name("c"), 1, &0, Some(eq));

		assert_eq!(state.changed_properties(), vec![name("b"), name("a")]);
	}
}
