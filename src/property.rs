use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};

use crate::{ChangeSource, Notifier, Object, Value};

/// A single observable value, announced as the property `"Value"`.
///
/// Cloning shares the value and the subscribers.
pub struct ModelProperty<T> {
	body: Arc<PropertyBody<T>>,
}

struct PropertyBody<T> {
	value: RwLock<T>,
	notifier: Notifier,
}

impl<T> Clone for ModelProperty<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> Default for ModelProperty<T>
where
	T: Default + Send + Sync + 'static,
{
	fn default() -> Self {
		ModelProperty::new(Default::default())
	}
}

pub trait Toggle {
	fn toggle(&mut self);
}

impl Toggle for bool {
	fn toggle(&mut self) {
		*self = !*self
	}
}

impl<T> ModelProperty<T>
where
	T: Send + Sync + 'static,
{
	pub const NAME: &'static str = "Value";

	pub fn new(value: T) -> Self {
		ModelProperty {
			body: Arc::new(PropertyBody {
				value: RwLock::new(value),
				notifier: Notifier::new(),
			}),
		}
	}

	#[inline]
	pub fn get_ref(&self) -> MappedRwLockReadGuard<'_, T> {
		RwLockReadGuard::map(self.body.value.read(), |value| value)
	}

	#[inline]
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.body.value.read().clone()
	}

	/// Assigns without announcing anything.
	#[inline]
	pub fn set(&self, value: T) {
		*self.body.value.write() = value;
	}

	/// Assigns and announces `"Value"` if the value changed.
	#[inline]
	pub fn change(&self, value: T) -> bool
	where
		T: PartialEq,
	{
		self.body
			.notifier
			.change_property(&self.body.value, value, Self::NAME)
	}

	#[inline]
	pub fn replace(&self, value: T) -> T
	where
		T: Clone + PartialEq,
	{
		let old = self.get();
		self.change(value);
		old
	}

	/// Edits the value in place and announces it if it changed.
	#[inline]
	pub fn update(&self, func: impl FnOnce(&mut T)) -> bool
	where
		T: Clone + PartialEq,
	{
		let mut value = self.get();
		func(&mut value);
		self.change(value)
	}

	#[inline]
	pub fn toggle(&self) -> bool
	where
		T: Toggle + Clone + PartialEq,
	{
		self.update(T::toggle)
	}

	pub fn notifier(&self) -> &Notifier {
		&self.body.notifier
	}
}

impl<T> Object for ModelProperty<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn as_any(&self) -> &dyn Any {
		self
	}

	fn change_source(&self) -> Option<&dyn ChangeSource> {
		Some(&self.body.notifier)
	}

	fn property(&self, name: &str) -> Option<Value> {
		(name == Self::NAME).then(|| Value::data(self.get()))
	}
}

impl<T> Debug for ModelProperty<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.body.value.read().fmt(f)
	}
}
