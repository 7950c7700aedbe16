use std::sync::Arc;

use observe_path::{
	listen_path, ChangeSource, Error, ModelProperties, Notifier, PropertyChanged, PropertyMeta,
	RefreshRegistry,
};
use parking_lot::{Mutex, RwLock};


use models::{int, trace, S1, S3};

fn recorder(notifier: &Notifier) -> Arc<Mutex<Vec<String>>> {
	let seen = Arc::new(Mutex::new(Vec::new()));
	notifier.subscribe(Arc::new({
		let seen = seen.clone();
		move |event: &PropertyChanged| seen.lock().push(event.property.to_string())
	}));
	seen
}

#[test]
fn round_trip_is_not_announced() {
	let s1 = S1::new(1);
	let seen = recorder(&s1.notifier);

	let batch = s1.notifier.begin_batch().unwrap();
	assert!(s1.set_v(2));
	assert!(s1.set_v(1));
	assert!(seen.lock().is_empty());
	batch.close().unwrap();

	assert!(seen.lock().is_empty());
	assert_eq!(s1.v(), 1);
}

#[test]
fn several_changes_are_announced_once() {
	let s1 = S1::new(1);
	let seen = recorder(&s1.notifier);

	let batch = s1.notifier.begin_batch().unwrap();
	s1.set_v(2);
	s1.set_v(3);
	batch.close().unwrap();
	batch.close().unwrap();

	assert_eq!(*seen.lock(), vec!["v".to_string()]);
}

#[test]
fn one_batch_at_a_time() {
	let notifier = Notifier::new();

	let batch = notifier.begin_batch().unwrap();
	assert!(notifier.in_batch());
	assert!(matches!(
		notifier.begin_batch(),
		Err(Error::InvalidOperation(_))
	));

	drop(batch);

	assert!(!notifier.in_batch());
	assert!(notifier.begin_batch().is_ok());
}

#[test]
fn announced_in_first_change_order() {
	let notifier = Notifier::new();
	let seen = recorder(&notifier);
	let a = RwLock::new(0);
	let b = RwLock::new(0);
	let c = RwLock::new(0);

	notifier
		.batch(|| {
			notifier.change_property(&b, 1, "b");
			notifier.change_property(&c, 1, "c");
			notifier.change_property(&a, 1, "a");
			notifier.change_property(&b, 2, "b");
			notifier.change_property(&c, 0, "c");
		})
		.unwrap();

	assert_eq!(*seen.lock(), vec!["b".to_string(), "a".to_string()]);
}

#[test]
fn no_comparer_always_counts() {
	let notifier = Notifier::new();
	let seen = recorder(&notifier);
	let x = RwLock::new(1);

	notifier
		.batch(|| {
			assert!(notifier.change_property_with(&x, 2, "x", None));
			assert!(notifier.change_property_with(&x, 1, "x", None));
		})
		.unwrap();

	assert_eq!(*seen.lock(), vec!["x".to_string()]);

	// same value outside a batch still announces
	assert!(notifier.change_property_with(&x, 1, "x", None));
	assert_eq!(seen.lock().len(), 2);
}

#[test]
fn listener_sees_the_final_value_once() {
	trace();
	let s3 = S3::tree(0);
	let s1 = s3.s2().unwrap().s1().unwrap();
	let seen = Arc::new(Mutex::new(Vec::new()));

	let _listener = listen_path(s3.clone(), "S2.S1.v", {
		let seen = seen.clone();
		move |value| seen.lock().push(int(value))
	})
	.unwrap();

	s1.notifier
		.batch(|| {
			s1.set_v(1);
			s1.set_v(2);
			s1.set_v(3);
		})
		.unwrap();

	assert_eq!(*seen.lock(), vec![Some(3)]);
}

#[test]
fn batch_inside_a_gate() {
	let notifier = Notifier::new();
	let seen = recorder(&notifier);
	let x = RwLock::new(0);

	let gate = notifier.begin_suppression();
	notifier
		.batch(|| {
			notifier.change_property(&x, 1, "x");
			notifier.change_property(&x, 2, "x");
		})
		.unwrap();

	assert!(seen.lock().is_empty());
	assert_eq!(gate.pending(), 1);

	gate.close().unwrap();

	assert_eq!(*seen.lock(), vec!["x".to_string()]);
}

impl ModelProperties for S1 {
	fn model_properties() -> Vec<PropertyMeta> {
		vec![
			PropertyMeta::new("w").group(1).order(1),
			PropertyMeta::new("v").group(2),
		]
	}
}

#[test]
fn refresh_announces_listed_properties() {
	let registry = RefreshRegistry::new();
	let s1 = S1::new(0);
	let seen = recorder(&s1.notifier);

	let map = registry.resolve::<S1>();
	s1.notifier.refresh_properties(&map);
	s1.notifier.refresh_group(&map, 1);
	s1.notifier.refresh_group(&map, 9);

	assert_eq!(
		*seen.lock(),
		vec!["v".to_string(), "w".to_string(), "w".to_string()]
	);
}
