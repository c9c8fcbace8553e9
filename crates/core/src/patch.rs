//! Minimal patch objects for partial persistence.

use crate::error::{Error, Result};
use crate::field::ConfigType;

/// An instance with every field absent.
pub fn blank<T: ConfigType>() -> T {
    let mut obj = T::default();
    let fields = T::fields();
    for field in fields.iter() {
        field.clear(&mut obj);
    }
    obj
}

/// A blank instance carrying only the named fields of `source`.
pub fn patch<T: ConfigType, S: AsRef<str>>(source: &T, names: &[S]) -> Result<T> {
    let mut out = blank::<T>();
    copy_fields(&mut out, source, names)?;
    Ok(out)
}

/// Copy the named fields of `source` onto `target`, leaving the rest alone.
pub fn copy_fields<T: ConfigType, S: AsRef<str>>(
    target: &mut T,
    source: &T,
    names: &[S],
) -> Result<()> {
    let fields = T::fields();
    for name in names {
        let name = name.as_ref();
        let field = fields.get(name).ok_or_else(|| Error::UnknownField {
            field: name.to_string(),
        })?;
        field.copy(target, source);
    }
    Ok(())
}
