use std::any::Any;
use std::fmt::Debug;
use std::sync::{Arc, Weak};

use crate::Object;

/// A value produced by resolving one property of an object.
///
/// Objects can be traversed further and may announce changes, plain data
/// is a leaf.
#[derive(Clone)]
pub enum Value {
	Object(Arc<dyn Object>),
	Data(Arc<dyn Any + Send + Sync>),
}

impl Value {
	pub fn object<O: Object>(object: Arc<O>) -> Self {
		Value::Object(object)
	}

	pub fn data<T: Any + Send + Sync>(value: T) -> Self {
		Value::Data(Arc::new(value))
	}

	pub fn as_object(&self) -> Option<&Arc<dyn Object>> {
		match self {
			Value::Object(object) => Some(object),
			Value::Data(_) => None,
		}
	}

	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		match self {
			Value::Object(object) => object.as_any().downcast_ref::<T>(),
			Value::Data(data) => data.downcast_ref::<T>(),
		}
	}

	pub fn downgrade(&self) -> WeakValue {
		match self {
			Value::Object(object) => WeakValue::Object(Arc::downgrade(object)),
			Value::Data(data) => WeakValue::Data(Arc::downgrade(data)),
		}
	}

	/// Identity comparison, two values are equal if they share the allocation.
	pub fn ptr_eq(&self, other: &Value) -> bool {
		match (self, other) {
			(Value::Object(a), Value::Object(b)) => {
				Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
			}
			(Value::Data(a), Value::Data(b)) => {
				Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
			}
			_ => false,
		}
	}
}

impl Debug for Value {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Value::Object(object) => write!(f, "Object({:p})", Arc::as_ptr(object) as *const ()),
			Value::Data(data) => write!(f, "Data({:p})", Arc::as_ptr(data) as *const ()),
		}
	}
}

impl<O: Object> From<Arc<O>> for Value {
	fn from(object: Arc<O>) -> Self {
		Value::Object(object)
	}
}

/// Non-owning counterpart of [`Value`].
#[derive(Clone)]
pub enum WeakValue {
	Object(Weak<dyn Object>),
	Data(Weak<dyn Any + Send + Sync>),
}

impl WeakValue {
	pub fn upgrade(&self) -> Option<Value> {
		match self {
			WeakValue::Object(object) => object.upgrade().map(Value::Object),
			WeakValue::Data(data) => data.upgrade().map(Value::Data),
		}
	}

	pub fn is_alive(&self) -> bool {
		match self {
			WeakValue::Object(object) => object.strong_count() > 0,
			WeakValue::Data(data) => data.strong_count() > 0,
		}
	}
}
