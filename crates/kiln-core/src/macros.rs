/// Builds a `ValueObject` from `key => value` pairs.
#[macro_export]
macro_rules! object {
    ( $( $key:expr => $value:expr ),* $(,)? ) => {{
        #[allow(unused_mut)]
        let mut object = $crate::stmt::ValueObject::new();
        $( object.insert($key, $value); )*
        object
    }};
}
