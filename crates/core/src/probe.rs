//! Default probe: the reference instance for "was this field customized".

use crate::field::ConfigType;

/// A fresh default instance of `T`.
///
/// Built anew on every call so nested values never alias live state.
pub fn default_of<T: ConfigType>() -> T {
    T::default()
}

/// Fields of `obj` holding an explicit, non-default value.
pub fn customized_fields<T: ConfigType>(obj: &T) -> Vec<&'static str> {
    let defaults = default_of::<T>();
    let fields = T::fields();
    fields
        .iter()
        .filter(|field| field.differs(&defaults, obj, &defaults))
        .map(|field| field.name())
        .collect()
}
