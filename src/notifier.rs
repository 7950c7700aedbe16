use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use smallvec::SmallVec;

use crate::batch::BatchState;
use crate::gate::GateBody;
use crate::{ChangeSource, Handler, PropertyChanged, PropertyName, SubscriptionId};

/// Address-derived identity of a [`Notifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NotifierId(usize);

impl std::fmt::Display for NotifierId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:#x}", self.0)
	}
}

/// The property-changed event source of a model.
///
/// Models embed a `Notifier` and hand it out through
/// [`Object::change_source`](crate::Object::change_source). Clones share the
/// same subscribers, gate and batch.
#[derive(Clone, Default)]
pub struct Notifier {
	pub(crate) body: Arc<NotifierBody>,
}

pub(crate) struct NotifierBody {
	handlers: RwLock<BTreeMap<SubscriptionId, Handler>>,
	next_id: AtomicU64,
	/// Where announcements go right now, see [`Sink`].
	pub(crate) sink: ArcSwap<Sink>,
	pub(crate) batch: Mutex<Option<BatchState>>,
	pub(crate) next_batch: AtomicU64,
}

pub(crate) enum Sink {
	Direct,
	Gate(Arc<GateBody>),
}

impl Default for NotifierBody {
	fn default() -> Self {
		NotifierBody {
			handlers: RwLock::new(BTreeMap::new()),
			next_id: AtomicU64::new(0),
			sink: ArcSwap::from_pointee(Sink::Direct),
			batch: Mutex::new(None),
			next_batch: AtomicU64::new(0),
		}
	}
}

impl Notifier {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn id(&self) -> NotifierId {
		self.body.id()
	}

	/// Announces a change of `property`.
	pub fn notify(&self, property: impl Into<PropertyName>) {
		let event = PropertyChanged {
			sender: self.id(),
			property: property.into(),
		};
		NotifierBody::dispatch(&self.body, event);
	}

	/// Announces several properties in order.
	pub fn notify_many<I>(&self, properties: I)
	where
		I: IntoIterator,
		I::Item: Into<PropertyName>,
	{
		NotifierBody::notify_many(&self.body, properties.into_iter().map(Into::into));
	}

	/// Assigns `value` to `slot` and announces `property` unless the old and
	/// new values compare equal.
	///
	/// Inside an open [`Batch`](crate::Batch) the change is recorded instead of
	/// being announced.
	pub fn change_property<T>(
		&self,
		slot: &RwLock<T>,
		value: T,
		property: impl Into<PropertyName>,
	) -> bool
	where
		T: PartialEq + Send + 'static,
	{
		let eq: &dyn Fn(&T, &T) -> bool = &|a, b| a == b;
		self.change_property_with(slot, value, property, Some(eq))
	}

	/// Like [`Notifier::change_property`] with a custom comparer. Without a
	/// comparer every assignment counts as a change.
	pub fn change_property_with<T>(
		&self,
		slot: &RwLock<T>,
		value: T,
		property: impl Into<PropertyName>,
		comparer: Option<&dyn Fn(&T, &T) -> bool>,
	) -> bool
	where
		T: Send + 'static,
	{
		let mut current = slot.write();
		if let Some(eq) = comparer {
			if eq(&*current, &value) {
				return false;
			}
		}

		let old = std::mem::replace(&mut *current, value);
		let current = RwLockWriteGuard::downgrade(current);
		let property = property.into();

		{
			let mut batch = self.body.batch.lock();
			if let Some(batch) = batch.as_mut() {
				batch.add_change(property, old, &*current, comparer);
				return true;
			}
		}

		std::mem::drop(current);
		self.notify(property);
		true
	}

	/// Drops every registered handler.
	pub fn clear_subscribers(&self) {
		self.body.handlers.write().clear();
	}
}

impl NotifierBody {
	pub(crate) fn id(&self) -> NotifierId {
		NotifierId(self as *const NotifierBody as usize)
	}

	pub(crate) fn notify_many(this: &Arc<NotifierBody>, properties: impl Iterator<Item = PropertyName>) {
		let sender = this.id();
		for property in properties {
			NotifierBody::dispatch(this, PropertyChanged { sender, property });
		}
	}

	/// Routes an event through the current sink.
	pub(crate) fn dispatch(this: &Arc<NotifierBody>, event: PropertyChanged) {
		let gate = match &**this.sink.load() {
			Sink::Direct => None,
			Sink::Gate(gate) => Some(gate.clone()),
		};

		match gate {
			None => this.invoke(&event),
			Some(gate) => {
				if let Err(event) = gate.push(event) {
					// the gate stopped buffering after we looked it up
					let this = this.clone();
					gate.execute(Box::new(move || NotifierBody::dispatch(&this, event)));
				}
			}
		}
	}

	fn invoke(&self, event: &PropertyChanged) {
		let handlers = {
			let handlers = self.handlers.read();
			handlers.values().cloned().collect::<SmallVec<[Handler; 4]>>()
		};

		for handler in handlers {
			handler(event);
		}
	}
}

impl ChangeSource for Notifier {
	fn subscribe(&self, handler: Handler) -> SubscriptionId {
		let id = SubscriptionId(self.body.next_id.fetch_add(1, Ordering::Relaxed));
		self.body.handlers.write().insert(id, handler);
		tracing::trace!(notifier = %self.id(), subscription = id.0, "subscribed");
		id
	}

	fn unsubscribe(&self, id: SubscriptionId) -> bool {
		let removed = self.body.handlers.write().remove(&id).is_some();
		tracing::trace!(notifier = %self.id(), subscription = id.0, removed, "unsubscribed");
		removed
	}

	fn subscriber_count(&self) -> usize {
		self.body.handlers.read().len()
	}
}

impl Debug for Notifier {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Notifier")
			.field("id", &self.id())
			.field("subscribers", &self.subscriber_count())
			.finish()
	}
}
