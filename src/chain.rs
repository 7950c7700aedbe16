use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::{
	Error, Object, ObjectAccessor, Path, PropertyChanged, PropertyName, Result, SubscriptionId,
	Value, ValueAccessor, WeakValue,
};

type Callback = Arc<dyn Fn(Option<Value>) + Send + Sync>;

/// Listens to `path` starting at `root` and calls `callback` with the value
/// at the end of the path every time a property along it is announced.
///
/// The callback does not run for the current value, only for changes, and
/// it runs for every announcement even if the resolved value is the same.
/// Intermediate objects are resubscribed automatically when they get
/// replaced. Only weak references into the object graph are kept.
pub fn listen_path<P>(
	root: Arc<dyn Object>,
	path: P,
	callback: impl Fn(Option<Value>) + Send + Sync + 'static,
) -> Result<PathListener>
where
	P: TryInto<Path>,
	Error: From<P::Error>,
{
	listen_path_with(root, path, Arc::new(ObjectAccessor), callback)
}

/// Like [`listen_path`] with a custom [`ValueAccessor`].
pub fn listen_path_with<P>(
	root: Arc<dyn Object>,
	path: P,
	accessor: Arc<dyn ValueAccessor>,
	callback: impl Fn(Option<Value>) + Send + Sync + 'static,
) -> Result<PathListener>
where
	P: TryInto<Path>,
	Error: From<P::Error>,
{
	let path = path.try_into()?;

	if root.change_source().is_none() {
		return Err(Error::InvalidArgument(
			"root object does not announce property changes".into(),
		));
	}

	let body = Arc::new_cyclic(|this| ChainBody {
		root: Arc::downgrade(&root),
		accessor,
		inner: Mutex::new(ChainInner {
			nodes: path.segments().iter().cloned().map(PathNode::new).collect(),
			callback: Some(Arc::new(callback)),
			generation: 0,
		}),
		path,
		this: this.clone(),
	});

	body.subscribe_all(Value::Object(root))?;
	tracing::trace!(path = %body.path, "listening");

	Ok(PathListener { body })
}

/// A live subscription created by [`listen_path`]. Dropping it stops the
/// listener.
///
/// Announcements are expected to arrive one at a time. Concurrent
/// announcements on the same chain are serialized by an internal lock, a
/// [`ValueAccessor`] must not announce changes while reading a value.
#[must_use = "the listener stops as soon as it is dropped"]
pub struct PathListener {
	body: Arc<ChainBody>,
}

struct ChainBody {
	path: Path,
	root: Weak<dyn Object>,
	accessor: Arc<dyn ValueAccessor>,
	inner: Mutex<ChainInner>,
	this: Weak<ChainBody>,
}

struct ChainInner {
	nodes: SmallVec<[PathNode; 4]>,
	/// `None` once disposed.
	callback: Option<Callback>,
	generation: u64,
}

/// One segment of the path and the object currently supplying it.
struct PathNode {
	property: PropertyName,
	target: Option<WeakValue>,
	subscription: Option<Registration>,
}

struct Registration {
	source: Weak<dyn Object>,
	id: SubscriptionId,
	/// Tells events of this registration apart from those of replaced ones.
	generation: u64,
}

impl PathListener {
	pub fn path(&self) -> &Path {
		&self.body.path
	}

	/// Unsubscribes from every object along the path. Idempotent.
	pub fn dispose(&self) {
		self.body.dispose();
	}

	pub fn is_disposed(&self) -> bool {
		self.body.inner.lock().callback.is_none()
	}

	/// Resolves the whole path from the root right now, without touching
	/// the subscriptions.
	pub fn current(&self) -> Option<Value> {
		let mut value = self.body.root.upgrade().map(Value::Object);
		for property in self.body.path.segments() {
			value = self.body.resolve(&value?, property);
		}
		value
	}

	/// Number of path segments with a live registration.
	pub fn subscribed(&self) -> usize {
		self.body
			.inner
			.lock()
			.nodes
			.iter()
			.filter(|node| node.subscription.is_some())
			.count()
	}
}

impl Drop for PathListener {
	fn drop(&mut self) {
		self.body.dispose();
	}
}

impl std::fmt::Debug for PathListener {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PathListener")
			.field("path", &self.body.path)
			.field("disposed", &self.is_disposed())
			.finish()
	}
}

impl ChainBody {
	fn subscribe_all(&self, root: Value) -> Result<()> {
		let mut inner = self.inner.lock();
		let last = inner.nodes.len() - 1;
		let mut value = Some(root);

		for index in 0..=last {
			let Some(target) = value.take() else {
				break;
			};

			self.subscribe(&mut inner, index, &target);

			if index < last {
				let property = inner.nodes[index].property.clone();
				match self.accessor.get_value(&target, &property) {
					Ok(next) => value = next,
					Err(err) => {
						for node in inner.nodes.iter_mut().rev() {
							node.unsubscribe();
						}
						inner.callback = None;
						return Err(err);
					}
				}
			}
		}

		Ok(())
	}

	fn on_changed(&self, index: usize, generation: u64) {
		let (callback, value) = {
			let mut inner = self.inner.lock();

			let Some(callback) = inner.callback.clone() else {
				return;
			};

			let is_current = matches!(
				&inner.nodes[index].subscription,
				Some(registration) if registration.generation == generation
			);

			if !is_current {
				tracing::trace!(path = %self.path, index, "ignoring event from a replaced object");
				return;
			}

			if self.root.strong_count() == 0 {
				tracing::trace!(path = %self.path, "root is gone, stopping");
				std::mem::drop(inner);
				self.dispose();
				return;
			}

			let value = self.rewire(&mut inner, index);
			(callback, value)
		};

		callback(value);
	}

	/// Rebuilds every node after `index` from the current value of
	/// `index` and returns the value at the end of the path.
	fn rewire(&self, inner: &mut ChainInner, index: usize) -> Option<Value> {
		for node in inner.nodes[index + 1..].iter_mut().rev() {
			node.unsubscribe();
		}

		let mut value = {
			let node = &inner.nodes[index];
			let target = node.target.as_ref().and_then(WeakValue::upgrade);
			target.and_then(|target| self.resolve(&target, &node.property))
		};

		for next in index + 1..inner.nodes.len() {
			let target = value?;
			self.subscribe(inner, next, &target);
			value = self.resolve(&target, &inner.nodes[next].property);
		}

		tracing::trace!(path = %self.path, index, resolved = value.is_some(), "rewired");
		value
	}

	fn resolve(&self, target: &Value, property: &str) -> Option<Value> {
		match self.accessor.get_value(target, property) {
			Ok(value) => value,
			Err(err) => {
				tracing::warn!(path = %self.path, property, %err, "failed to read property");
				None
			}
		}
	}

	fn subscribe(&self, inner: &mut ChainInner, index: usize, target: &Value) {
		inner.generation += 1;
		let generation = inner.generation;

		let node = &mut inner.nodes[index];
		debug_assert!(node.subscription.is_none());
		node.target = Some(target.downgrade());

		let Value::Object(object) = target else {
			return;
		};
		let Some(source) = object.change_source() else {
			return;
		};

		let chain = self.this.clone();
		let property = node.property.clone();
		let id = source.subscribe(Arc::new(move |event: &PropertyChanged| {
			if *event.property != *property {
				return;
			}
			if let Some(chain) = chain.upgrade() {
				chain.on_changed(index, generation);
			}
		}));

		node.subscription = Some(Registration {
			source: Arc::downgrade(object),
			id,
			generation,
		});
	}

	fn dispose(&self) {
		let mut inner = self.inner.lock();
		if inner.callback.take().is_none() {
			return;
		}

		for node in inner.nodes.iter_mut() {
			node.unsubscribe();
		}

		tracing::trace!(path = %self.path, "disposed");
	}
}

impl PathNode {
	fn new(property: PropertyName) -> Self {
		PathNode {
			property,
			target: None,
			subscription: None,
		}
	}

	fn unsubscribe(&mut self) {
		if let Some(registration) = self.subscription.take() {
			if let Some(object) = registration.source.upgrade() {
				if let Some(source) = object.change_source() {
					source.unsubscribe(registration.id);
				}
			}
		}

		self.target = None;
	}
}
