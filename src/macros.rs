pub use enclose::*;

/// Shorthand for [`listen_path`](crate::listen_path) that clones the listed
/// captures into the callback.
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use observe_path::{listen, ModelProperty};
///
/// let prop = Arc::new(ModelProperty::new(1));
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let _listener = listen!(prop.clone(), "Value", (seen) value => {
/// 	seen.lock().unwrap().push(*value.unwrap().downcast_ref::<i32>().unwrap());
/// })
/// .unwrap();
///
/// prop.change(2);
/// assert_eq!(*seen.lock().unwrap(), vec![2]);
/// ```
#[macro_export]
macro_rules! listen {
    ($root:expr, $path:expr, ( $($d_tt:tt)* ) $value:ident => $($b:tt)*) => {
        $crate::listen_path($root, $path, $crate::macros::enclose!(($( $d_tt )*) move |$value: ::std::option::Option<$crate::Value>| { $($b)* }))
    };
    ($root:expr, $path:expr, $value:ident => $($b:tt)*) => {
        $crate::listen_path($root, $path, move |$value: ::std::option::Option<$crate::Value>| { $($b)* })
    };
}
