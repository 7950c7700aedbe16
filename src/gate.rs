use std::sync::atomic::{AtomicBool, AtomicIsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::notifier::{NotifierBody, Sink};
use crate::{Error, Notifier, PropertyChanged, Result};

/// Runs a deferred delivery task, e.g. on a specific thread or event loop.
pub type Executor = Arc<dyn Fn(Box<dyn FnOnce() + Send>) + Send + Sync>;

/// Reference counter value once the gate has been released for good.
const DISPOSED: isize = -1;

/// A suppression scope: while installed as the notifier's sink, every
/// announcement is appended to `buffer` instead of being delivered.
pub(crate) struct GateBody {
	notifier: Weak<NotifierBody>,
	executor: Option<Executor>,
	references: AtomicIsize,
	/// `None` once the gate stopped accepting events.
	buffer: Mutex<Option<Vec<PropertyChanged>>>,
}

/// A handle onto the suppression scope of a [`Notifier`].
///
/// All handles obtained while a scope is open refer to the same scope. The
/// buffered announcements are delivered once, in order, when the last
/// handle is closed or dropped.
#[must_use = "announcements stay suppressed until the handle is closed"]
pub struct Suppression {
	gate: Arc<GateBody>,
	released: AtomicBool,
}

impl Notifier {
	/// Suppresses announcements of this notifier until the returned handle
	/// (and any other handle onto the same scope) is closed.
	pub fn begin_suppression(&self) -> Suppression {
		self.begin_suppression_with(None)
	}

	/// Like [`Notifier::begin_suppression`], flushing through `executor`.
	///
	/// The executor only applies when this call opens the scope. Joining a
	/// scope that is already open keeps its executor.
	pub fn begin_suppression_with(&self, executor: Option<Executor>) -> Suppression {
		let mut candidate: Option<Arc<GateBody>> = None;

		loop {
			let current = self.body.sink.load();

			if let Sink::Gate(gate) = &**current {
				if let Some(handle) = gate.try_acquire() {
					return handle;
				}

				// the open gate is closing, wait for it to restore the direct sink
				std::hint::spin_loop();
				continue;
			}

			let gate = candidate
				.get_or_insert_with(|| {
					Arc::new(GateBody::new(Arc::downgrade(&self.body), executor.clone()))
				})
				.clone();

			let prev = self
				.body
				.sink
				.compare_and_swap(&current, Arc::new(Sink::Gate(gate)));

			if Arc::ptr_eq(&prev, &current) {
				// installed, never reuse it: it may be closed before we join it
				candidate = None;
				tracing::debug!(notifier = %self.id(), "suppression scope opened");
			}
		}
	}

	/// Whether a suppression scope is currently open.
	pub fn is_suppressed(&self) -> bool {
		matches!(**self.body.sink.load(), Sink::Gate(_))
	}
}

impl GateBody {
	fn new(notifier: Weak<NotifierBody>, executor: Option<Executor>) -> Self {
		GateBody {
			notifier,
			executor,
			references: AtomicIsize::new(0),
			buffer: Mutex::new(Some(Vec::new())),
		}
	}

	/// Hands the event back if the gate no longer buffers.
	pub(crate) fn push(&self, event: PropertyChanged) -> std::result::Result<(), PropertyChanged> {
		match &mut *self.buffer.lock() {
			Some(buffer) => {
				buffer.push(event);
				Ok(())
			}
			None => Err(event),
		}
	}

	pub(crate) fn execute(&self, task: Box<dyn FnOnce() + Send>) {
		match &self.executor {
			Some(executor) => executor(task),
			None => task(),
		}
	}

	fn try_acquire(self: &Arc<Self>) -> Option<Suppression> {
		let mut current = self.references.load(Ordering::Acquire);

		loop {
			if current == DISPOSED {
				return None;
			}

			debug_assert!(current >= 0);

			match self.references.compare_exchange_weak(
				current,
				current + 1,
				Ordering::AcqRel,
				Ordering::Acquire,
			) {
				Ok(_) => {
					return Some(Suppression {
						gate: self.clone(),
						released: AtomicBool::new(false),
					})
				}
				Err(actual) => current = actual,
			}
		}
	}

	/// Drops one reference, the holder that drops the last one closes the gate.
	fn release(&self) -> Result<()> {
		let mut current = self.references.load(Ordering::Acquire);

		loop {
			if current == DISPOSED {
				return Ok(());
			}

			debug_assert!(current > 0);

			let next = if current == 1 { DISPOSED } else { current - 1 };

			match self.references.compare_exchange_weak(
				current,
				next,
				Ordering::AcqRel,
				Ordering::Acquire,
			) {
				Ok(_) if next == DISPOSED => return self.close(),
				Ok(_) => return Ok(()),
				Err(actual) => current = actual,
			}
		}
	}

	fn close(&self) -> Result<()> {
		let Some(notifier) = self.notifier.upgrade() else {
			let dropped = self.buffer.lock().take().map_or(0, |events| events.len());
			tracing::debug!(dropped, "suppression scope outlived its notifier");
			return Ok(());
		};

		let current = notifier.sink.load();
		let is_active = match &**current {
			Sink::Gate(gate) => std::ptr::eq(Arc::as_ptr(gate), self),
			Sink::Direct => false,
		};

		if !is_active {
			return Err(Error::InvalidOperation(
				"suppression scope is not the active sink of its notifier".into(),
			));
		}

		let prev = notifier
			.sink
			.compare_and_swap(&current, Arc::new(Sink::Direct));

		if !Arc::ptr_eq(&prev, &current) {
			return Err(Error::InvalidOperation(
				"suppression scope was replaced while closing".into(),
			));
		}

		let events = self.buffer.lock().take().unwrap_or_default();
		tracing::debug!(notifier = %notifier.id(), buffered = events.len(), "suppression scope closed");

		if !events.is_empty() {
			self.execute(Box::new(move || {
				// whatever sink is active now receives the events, possibly a newer gate
				for event in events {
					NotifierBody::dispatch(&notifier, event);
				}
			}));
		}

		Ok(())
	}
}

impl Suppression {
	/// Releases this handle. Closing twice is a no-op.
	pub fn close(&self) -> Result<()> {
		if self.released.swap(true, Ordering::AcqRel) {
			return Ok(());
		}

		self.gate.release()
	}

	pub fn is_closed(&self) -> bool {
		self.released.load(Ordering::Acquire)
	}

	/// Number of announcements waiting for this scope to close.
	pub fn pending(&self) -> usize {
		self.gate
			.buffer
			.lock()
			.as_ref()
			.map_or(0, |events| events.len())
	}
}

impl Drop for Suppression {
	fn drop(&mut self) {
		if let Err(err) = self.close() {
			tracing::error!(%err, "failed to close suppression scope");
		}
	}
}

impl std::fmt::Debug for Suppression {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Suppression")
			.field("closed", &self.is_closed())
			.field("pending", &self.pending())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use parking_lot::Mutex;

	use crate::{ChangeSource, Notifier, PropertyChanged};

	fn recorder(notifier: &Notifier) -> Arc<Mutex<Vec<String>>> {
		let seen = Arc::new(Mutex::new(Vec::new()));
		notifier.subscribe(Arc::new({
			let seen = seen.clone();
			move |event: &PropertyChanged| seen.lock().push(event.property.to_string())
		}));
		seen
	}

	#[test]
	fn handles_share_one_scope() {
		let notifier = Notifier::new();
		let seen = recorder(&notifier);

		let a = notifier.begin_suppression();
		let b = notifier.begin_suppression();
		assert!(Arc::ptr_eq(&a.gate, &b.gate));
		assert_eq!(a.gate.references.load(std::sync::atomic::Ordering::Acquire), 2);

		notifier.notify("x");
		assert_eq!(b.pending(), 1);

		b.close().unwrap();
		assert!(seen.lock().is_empty());
		assert!(notifier.is_suppressed());

		a.close().unwrap();
		assert_eq!(*seen.lock(), vec!["x".to_string()]);
		assert!(!notifier.is_suppressed());
	}

	#[test]
	fn closing_twice_releases_one_reference() {
		let notifier = Notifier::new();
		let seen = recorder(&notifier);

		let a = notifier.begin_suppression();
		let b = notifier.begin_suppression();
		notifier.notify("x");

		b.close().unwrap();
		b.close().unwrap();
		assert!(notifier.is_suppressed());
		assert!(seen.lock().is_empty());

		drop(a);
		assert_eq!(seen.lock().len(), 1);
	}

	#[test]
	fn closed_gate_forwards_late_events() {
		let notifier = Notifier::new();
		let seen = recorder(&notifier);

		let handle = notifier.begin_suppression();
		let gate = handle.gate.clone();
		handle.close().unwrap();

		let event = crate::PropertyChanged {
			sender: notifier.id(),
			property: "late".into(),
		};
		assert!(gate.push(event).is_err());
		assert!(seen.lock().is_empty());
	}
}
