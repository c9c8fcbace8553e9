//! Merge engine: default-aware, field-by-field merging of configuration
//! objects.
//!
//! Merge semantics for each field, with `p` the primary value, `s` the
//! secondary value and `d` the value on a fresh default instance:
//! - `p` absent, `s` present: take `s`
//! - otherwise take `s` only when `p ≠ s` and `s ≠ d`
//! - nested configuration fields recurse, using the parent default's nested
//!   value as their defaults
//!
//! A later, less specific source therefore never clobbers an earlier explicit
//! value with its own defaults.

use crate::field::ConfigType;
use crate::probe::default_of;

/// Merge `secondary` into `primary` in place.
pub fn merge_with<T: ConfigType>(primary: &mut T, secondary: &T) {
    let defaults = default_of::<T>();
    merge_with_defaults(primary, secondary, &defaults);
}

/// Merge `secondary` into `primary` against an explicit default instance.
pub fn merge_with_defaults<T: ConfigType>(primary: &mut T, secondary: &T, defaults: &T) {
    let fields = T::fields();
    for field in fields.iter() {
        field.merge(primary, secondary, defaults);
    }
}

/// Merge with possibly-absent operands.
///
/// An absent secondary leaves the primary untouched. An absent primary is
/// treated as a default instance, so the result is present whenever either
/// operand is.
pub fn merge_optional<T: ConfigType>(primary: Option<T>, secondary: Option<&T>) -> Option<T> {
    let Some(secondary) = secondary else {
        return primary;
    };
    let mut primary = primary.unwrap_or_else(default_of::<T>);
    merge_with(&mut primary, secondary);
    Some(primary)
}

/// Fold `objects` left-to-right onto a default instance.
pub fn merge<'a, T, I>(objects: I) -> T
where
    T: ConfigType,
    I: IntoIterator<Item = &'a T>,
{
    merge_seeded(objects, default_of::<T>())
}

/// Fold `objects` left-to-right onto `seed`.
pub fn merge_seeded<'a, T, I>(objects: I, seed: T) -> T
where
    T: ConfigType,
    I: IntoIterator<Item = &'a T>,
{
    let defaults = default_of::<T>();
    objects.into_iter().fold(seed, |mut merged, object| {
        merge_with_defaults(&mut merged, object, &defaults);
        merged
    })
}

/// Method form of [`merge_with`].
pub trait MergeWith {
    fn merge_with(&mut self, other: &Self);
}

impl<T: ConfigType> MergeWith for T {
    fn merge_with(&mut self, other: &Self) {
        merge_with(self, other);
    }
}

/// Method form of [`merge`] and [`merge_seeded`] for iterators of references.
pub trait MergeAll<'a, T: ConfigType + 'a>: IntoIterator<Item = &'a T> + Sized {
    fn merged(self) -> T {
        merge(self)
    }

    fn merged_onto(self, seed: T) -> T {
        merge_seeded(self, seed)
    }
}

impl<'a, T, I> MergeAll<'a, T> for I
where
    T: ConfigType + 'a,
    I: IntoIterator<Item = &'a T>,
{
}
