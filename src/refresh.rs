use std::any::TypeId;
use std::sync::Arc;

use fxhash::FxHashMap;
use parking_lot::RwLock;

use crate::notifier::NotifierBody;
use crate::{Notifier, PropertyName};

/// Refresh metadata of one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMeta {
	pub name: PropertyName,
	pub group: i32,
	/// Ascending.
	pub order: i32,
}

impl PropertyMeta {
	pub fn new(name: impl Into<PropertyName>) -> Self {
		PropertyMeta {
			name: name.into(),
			group: 0,
			order: 0,
		}
	}

	pub fn group(mut self, group: i32) -> Self {
		self.group = group;
		self
	}

	pub fn order(mut self, order: i32) -> Self {
		self.order = order;
		self
	}
}

/// Types that can list the properties to announce on a refresh.
pub trait ModelProperties: 'static {
	fn model_properties() -> Vec<PropertyMeta>;
}

/// Properties to announce on a refresh, in announcement order.
#[derive(Debug, Clone, Default)]
pub struct RefreshMap {
	properties: Vec<PropertyName>,
	groups: FxHashMap<i32, Vec<PropertyName>>,
}

impl RefreshMap {
	pub fn new(mut meta: Vec<PropertyMeta>) -> Self {
		meta.sort_by_key(|meta| meta.order);

		let mut groups: FxHashMap<i32, Vec<PropertyName>> = FxHashMap::default();
		for meta in &meta {
			groups.entry(meta.group).or_default().push(meta.name.clone());
		}

		RefreshMap {
			properties: meta.into_iter().map(|meta| meta.name).collect(),
			groups,
		}
	}

	pub fn properties(&self) -> &[PropertyName] {
		&self.properties
	}

	/// Empty for unknown groups.
	pub fn group(&self, group: i32) -> &[PropertyName] {
		self.groups.get(&group).map(Vec::as_slice).unwrap_or(&[])
	}
}

/// Memoizes a [`RefreshMap`] per type.
#[derive(Default)]
pub struct RefreshRegistry {
	maps: RwLock<FxHashMap<TypeId, Arc<RefreshMap>>>,
}

impl RefreshRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn resolve<T: ModelProperties>(&self) -> Arc<RefreshMap> {
		let key = TypeId::of::<T>();
		if let Some(map) = self.maps.read().get(&key) {
			return map.clone();
		}

		self.maps
			.write()
			.entry(key)
			.or_insert_with(|| Arc::new(RefreshMap::new(T::model_properties())))
			.clone()
	}

	pub fn len(&self) -> usize {
		self.maps.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl Notifier {
	/// Announces every property listed in `map`.
	pub fn refresh_properties(&self, map: &RefreshMap) {
		NotifierBody::notify_many(&self.body, map.properties().iter().cloned());
	}

	/// Announces the properties of one group of `map`.
	pub fn refresh_group(&self, map: &RefreshMap, group: i32) {
		NotifierBody::notify_many(&self.body, map.group(group).iter().cloned());
	}
}
