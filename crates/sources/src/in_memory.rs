//! In-memory source: useful for testing and programmatic layers.

use layerconf_core::{ConfigSource, ConfigType, SourceError, SourceFlags};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug)]
struct State<T> {
    current: Option<T>,
    saved: Vec<T>,
}

/// A source holding an optional object in memory.
///
/// Clones share state, so a test can keep one handle and hand another to a
/// manager, then inspect what was saved.
#[derive(Debug)]
pub struct MemorySource<T> {
    name: String,
    flags: SourceFlags,
    state: Rc<RefCell<State<T>>>,
}

impl<T> Clone for MemorySource<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            flags: self.flags,
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: ConfigType> MemorySource<T> {
    pub fn new(obj: T) -> Self {
        Self::from_option(Some(obj))
    }

    /// A source with nothing to contribute.
    pub fn empty() -> Self {
        Self::from_option(None)
    }

    pub fn from_option(obj: Option<T>) -> Self {
        Self {
            name: "memory".into(),
            flags: SourceFlags::default(),
            state: Rc::new(RefCell::new(State {
                current: obj,
                saved: Vec::new(),
            })),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn primary(mut self) -> Self {
        self.flags.primary = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.flags.required = true;
        self
    }

    pub fn persistent(mut self) -> Self {
        self.flags.persistent = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.flags.read_only = true;
        self
    }

    /// The object currently held.
    pub fn current(&self) -> Option<T> {
        self.state.borrow().current.clone()
    }

    /// Replace the held object without recording a save.
    pub fn set(&self, obj: Option<T>) {
        self.state.borrow_mut().current = obj;
    }

    /// Every object stored by `save` or `partial_save`, oldest first.
    pub fn saved(&self) -> Vec<T> {
        self.state.borrow().saved.clone()
    }

    pub fn save_count(&self) -> usize {
        self.state.borrow().saved.len()
    }

    fn store(&self, obj: T) {
        let mut state = self.state.borrow_mut();
        state.saved.push(obj.clone());
        state.current = Some(obj);
    }
}

impl<T: ConfigType> ConfigSource<T> for MemorySource<T> {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn flags(&self) -> SourceFlags {
        self.flags
    }

    fn config(&mut self) -> Result<Option<T>, SourceError> {
        Ok(self.current())
    }

    // Nothing is cached apart from the held object itself.
    fn invalidate(&mut self) {}

    fn save(&mut self, obj: &T) -> Result<(), SourceError> {
        self.store(obj.clone());
        Ok(())
    }

    fn partial_save(&mut self, obj: &T, fields: &[&str]) -> Result<(), SourceError> {
        let mut updated = self.current().unwrap_or_default();
        let table = T::fields();
        for &name in fields {
            let field = table
                .get(name)
                .ok_or_else(|| SourceError::UnknownField(name.to_string()))?;
            field.copy(&mut updated, obj);
        }
        self.store(updated);
        Ok(())
    }
}
