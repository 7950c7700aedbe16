use std::any::{Any, TypeId};
use std::sync::Arc;

use fxhash::FxHashMap;

use crate::{Error, PropertyName, Result, Value};

/// Reads a named property of a value.
///
/// Missing or unreadable properties resolve to `Ok(None)`. Only an invalid
/// property name is an error.
pub trait ValueAccessor: Send + Sync {
	fn get_value(&self, target: &Value, property: &str) -> Result<Option<Value>>;
}

pub(crate) fn check_property_name(property: &str) -> Result<()> {
	if property.is_empty() {
		return Err(Error::InvalidArgument("property name is empty".into()));
	}
	Ok(())
}

/// Resolves properties through [`Object::property`]. Plain data has no
/// properties.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectAccessor;

impl ValueAccessor for ObjectAccessor {
	fn get_value(&self, target: &Value, property: &str) -> Result<Option<Value>> {
		check_property_name(property)?;

		Ok(match target {
			Value::Object(object) => object.property(property),
			Value::Data(_) => None,
		})
	}
}

type Getter = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;

/// A table of typed getters keyed by concrete type and property name.
///
/// ```
/// use std::sync::Arc;
/// use observe_path::{Getters, Object, Value, ValueAccessor};
///
/// struct Point { x: i32 }
///
/// impl Object for Point {
/// 	fn as_any(&self) -> &dyn std::any::Any { self }
/// }
///
/// let getters = Getters::new().with::<Point>("x", |p| Some(Value::data(p.x)));
/// let value = getters.get_value(&Value::object(Arc::new(Point { x: 3 })), "x").unwrap();
/// assert_eq!(value.unwrap().downcast_ref::<i32>(), Some(&3));
/// ```
#[derive(Default, Clone)]
pub struct Getters {
	getters: FxHashMap<(TypeId, PropertyName), Getter>,
}

impl Getters {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register<T: Any>(
		&mut self,
		property: impl Into<PropertyName>,
		getter: impl Fn(&T) -> Option<Value> + Send + Sync + 'static,
	) {
		let getter: Getter = Arc::new(move |target: &dyn Any| {
			target.downcast_ref::<T>().and_then(|target| getter(target))
		});
		self.getters
			.insert((TypeId::of::<T>(), property.into()), getter);
	}

	pub fn with<T: Any>(
		mut self,
		property: impl Into<PropertyName>,
		getter: impl Fn(&T) -> Option<Value> + Send + Sync + 'static,
	) -> Self {
		self.register::<T>(property, getter);
		self
	}

	pub fn len(&self) -> usize {
		self.getters.len()
	}

	pub fn is_empty(&self) -> bool {
		self.getters.is_empty()
	}
}

impl ValueAccessor for Getters {
	fn get_value(&self, target: &Value, property: &str) -> Result<Option<Value>> {
		check_property_name(property)?;

		let target: &dyn Any = match target {
			Value::Object(object) => object.as_any(),
			Value::Data(data) => &**data,
		};

		let key = ((*target).type_id(), PropertyName::from(property));
		Ok(self.getters.get(&key).and_then(|getter| getter(target)))
	}
}

impl<A: ValueAccessor + ?Sized> ValueAccessor for Arc<A> {
	fn get_value(&self, target: &Value, property: &str) -> Result<Option<Value>> {
		(**self).get_value(target, property)
	}
}

impl std::fmt::Debug for Getters {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Getters")
			.field("len", &self.getters.len())
			.finish()
	}
}
