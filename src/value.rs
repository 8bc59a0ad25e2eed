/// Marker trait for values the store refuses to accept.
///
/// [`TtlStore`] rejects null-sentinel values on insert and update so that a
/// stored value can never be mistaken for an absent one. What counts as the
/// sentinel depends on the type: the empty string, an empty collection,
/// `None`, `false`, numeric zero.
///
/// Wrap values in [`Option`] (or a newtype with an `is_null` of your own)
/// when an empty string or zero is a legitimate payload; only `None` is
/// rejected there.
///
/// [`TtlStore`]: crate::TtlStore
pub trait NullValue {
    /// Returns `true` if this value is the type's empty/null sentinel.
    fn is_null(&self) -> bool;
}

impl NullValue for str {
    fn is_null(&self) -> bool {
        self.is_empty()
    }
}

impl NullValue for String {
    fn is_null(&self) -> bool {
        self.is_empty()
    }
}

impl<T> NullValue for [T] {
    fn is_null(&self) -> bool {
        self.is_empty()
    }
}

impl<T> NullValue for Vec<T> {
    fn is_null(&self) -> bool {
        self.is_empty()
    }
}

impl<T> NullValue for Option<T> {
    fn is_null(&self) -> bool {
        self.is_none()
    }
}

impl NullValue for bool {
    fn is_null(&self) -> bool {
        !*self
    }
}

impl<'a, T> NullValue for &'a T
where
    T: NullValue + ?Sized,
{
    fn is_null(&self) -> bool {
        (**self).is_null()
    }
}

macro_rules! null_value_zero {
    ($($t:ty)*) => {$(
        impl NullValue for $t {
            fn is_null(&self) -> bool {
                *self == 0
            }
        }
    )*};
}

null_value_zero! { u8 u16 u32 u64 u128 usize i8 i16 i32 i64 i128 isize }

impl NullValue for f32 {
    fn is_null(&self) -> bool {
        *self == 0.0
    }
}

impl NullValue for f64 {
    fn is_null(&self) -> bool {
        *self == 0.0
    }
}

#[cfg(test)]
mod test_value {
    use super::NullValue;

    #[test]
    fn test_strings() {
        assert!("".is_null());
        assert!(String::new().is_null());
        assert!(!"x".is_null());
        assert!(!String::from("x").is_null());
    }

    #[test]
    fn test_collections() {
        assert!(Vec::<u8>::new().is_null());
        assert!(!vec![1u8].is_null());

        let empty: &[u8] = &[];
        assert!(empty.is_null());
    }

    #[test]
    fn test_option() {
        // Some(0) is a legitimate payload; only None is the sentinel.
        assert!(Option::<u32>::None.is_null());
        assert!(!Some(0u32).is_null());
        assert!(!Some("").is_null());
    }

    #[test]
    fn test_scalars() {
        assert!(0u32.is_null());
        assert!(0i64.is_null());
        assert!(0.0f64.is_null());
        assert!(false.is_null());
        assert!(!1u32.is_null());
        assert!(!true.is_null());
    }

    #[test]
    fn test_reference() {
        let v = String::from("x");
        assert!(!(&v).is_null());
        assert!((&String::new()).is_null());
    }
}
