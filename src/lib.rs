pub mod macros;

mod accessor;
mod batch;
mod chain;
mod error;
mod gate;
mod notifier;
mod path;
mod property;
mod refresh;
mod value;

use std::any::Any;
use std::sync::Arc;

pub use accessor::{Getters, ObjectAccessor, ValueAccessor};
pub use batch::Batch;
pub use chain::{listen_path, listen_path_with, PathListener};
pub use error::{Error, Result};
pub use gate::{Executor, Suppression};
pub use notifier::{Notifier, NotifierId};
pub use path::Path;
pub use property::{ModelProperty, Toggle};
pub use refresh::{ModelProperties, PropertyMeta, RefreshMap, RefreshRegistry};
pub use value::{Value, WeakValue};

pub type PropertyName = Arc<str>;

/// Callback registered on a [`ChangeSource`].
pub type Handler = Arc<dyn Fn(&PropertyChanged) + Send + Sync>;

/// Anything that can sit in an observed object graph.
pub trait Object: Send + Sync + 'static {
	fn as_any(&self) -> &dyn Any;

	/// Returns the change notification interface of this object,
	/// if it announces property changes at all.
	fn change_source(&self) -> Option<&dyn ChangeSource> {
		None
	}

	/// Reads a property by name. Used by [`ObjectAccessor`].
	fn property(&self, _name: &str) -> Option<Value> {
		None
	}
}

pub trait ChangeSource {
	fn subscribe(&self, handler: Handler) -> SubscriptionId;

	/// Returns `false` if `id` was not registered.
	fn unsubscribe(&self, id: SubscriptionId) -> bool;

	fn subscriber_count(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub(crate) u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChanged {
	pub sender: NotifierId,
	pub property: PropertyName,
}
