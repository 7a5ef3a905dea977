//! Typed, change-aware key/value store.
//!
//! Every subsystem in this crate that exposes feedback or accepts commands does so through an
//! [`InterfaceBundle`]: a declared set of named attributes, each carrying a current and a previous
//! value. The previous/current split is what [`changed`](InterfaceBundle::changed) and
//! [`rising_edge`](InterfaceBundle::rising_edge) are built on, and it is the foundation the rest of
//! the crate's change-detection (goal-reached edges, new-fault edges, command latching) relies on.

use std::collections::HashMap;
use std::fmt;

/// The declared type of an [`InterfaceBundle`] attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    /// A boolean flag.
    Bit,
    U8,
    U16,
    U32,
    I8,
    F64,
    /// A UTF-8 string.
    Str,
}

/// A value stored in an [`InterfaceBundle`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttrValue {
    Bit(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    I8(i8),
    F64(f64),
    Str(String),
}

impl AttrValue {
    /// The [`DataType`] this value conforms to.
    pub fn data_type(&self) -> DataType {
        match self {
            AttrValue::Bit(_) => DataType::Bit,
            AttrValue::U8(_) => DataType::U8,
            AttrValue::U16(_) => DataType::U16,
            AttrValue::U32(_) => DataType::U32,
            AttrValue::I8(_) => DataType::I8,
            AttrValue::F64(_) => DataType::F64,
            AttrValue::Str(_) => DataType::Str,
        }
    }

    /// Truthiness used by [`InterfaceBundle::rising_edge`]: booleans by their value, numerics by
    /// non-zero-ness, strings by non-emptiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            AttrValue::Bit(b) => *b,
            AttrValue::U8(v) => *v != 0,
            AttrValue::U16(v) => *v != 0,
            AttrValue::U32(v) => *v != 0,
            AttrValue::I8(v) => *v != 0,
            AttrValue::F64(v) => *v != 0.0,
            AttrValue::Str(s) => !s.is_empty(),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            AttrValue::Bit(b) => *b,
            other => panic!("attribute is {:?}, not Bit", other.data_type()),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            AttrValue::U8(v) => *v,
            other => panic!("attribute is {:?}, not U8", other.data_type()),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            AttrValue::U16(v) => *v,
            other => panic!("attribute is {:?}, not U16", other.data_type()),
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            AttrValue::U32(v) => *v,
            other => panic!("attribute is {:?}, not U32", other.data_type()),
        }
    }

    pub fn as_i8(&self) -> i8 {
        match self {
            AttrValue::I8(v) => *v,
            other => panic!("attribute is {:?}, not I8", other.data_type()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AttrValue::Str(s) => s,
            other => panic!("attribute is {:?}, not Str", other.data_type()),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bit(b) => write!(f, "{b}"),
            AttrValue::U8(v) => write!(f, "{v}"),
            AttrValue::U16(v) => write!(f, "{v}"),
            AttrValue::U32(v) => write!(f, "{v}"),
            AttrValue::I8(v) => write!(f, "{v}"),
            AttrValue::F64(v) => write!(f, "{v}"),
            AttrValue::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bit(v)
    }
}
impl From<u8> for AttrValue {
    fn from(v: u8) -> Self {
        AttrValue::U8(v)
    }
}
impl From<u16> for AttrValue {
    fn from(v: u16) -> Self {
        AttrValue::U16(v)
    }
}
impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        AttrValue::U32(v)
    }
}
impl From<i8> for AttrValue {
    fn from(v: i8) -> Self {
        AttrValue::I8(v)
    }
}
impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::F64(v)
    }
}
impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}
impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_string())
    }
}

/// Typed, change-aware key/value store.
///
/// Attributes are declared once (normally at construction) with [`declare`](Self::declare); the
/// declared set is then frozen. `update()` only ever mutates the *current* snapshot; `advance()`
/// copies current into previous and must be called exactly once per tick, immediately after the
/// tick's `write()` phase completes (see the cyclic pipeline in [`crate::pipeline`]).
#[derive(Debug, Default)]
pub struct InterfaceBundle {
    declared: HashMap<String, DataType>,
    current: HashMap<String, AttrValue>,
    previous: HashMap<String, AttrValue>,
    frozen: bool,
}

impl InterfaceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an attribute with its default value and type. Panics if called after
    /// [`freeze`](Self::freeze), or if `default`'s type doesn't match `dtype`.
    pub fn declare(&mut self, key: impl Into<String>, default: impl Into<AttrValue>, dtype: DataType) {
        assert!(!self.frozen, "cannot declare attributes after the bundle is frozen");
        let key = key.into();
        let default = default.into();
        assert_eq!(
            default.data_type(),
            dtype,
            "default value for {key:?} is {:?}, but declared type is {dtype:?}",
            default.data_type()
        );
        self.current.insert(key.clone(), default.clone());
        self.previous.insert(key.clone(), default);
        self.declared.insert(key, dtype);
    }

    /// Freeze the declared attribute set. Further `declare()` calls will panic.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Set current values for one or more declared attributes.
    ///
    /// Accessing an undeclared key, or writing a value whose type doesn't match the attribute's
    /// declared type, is a programmer error and panics.
    pub fn update<'a, I>(&mut self, updates: I)
    where
        I: IntoIterator<Item = (&'a str, AttrValue)>,
    {
        for (key, value) in updates {
            let dtype = *self
                .declared
                .get(key)
                .unwrap_or_else(|| panic!("undeclared interface attribute {key:?}"));
            assert_eq!(
                value.data_type(),
                dtype,
                "type mismatch updating {key:?}: declared {dtype:?}, got {:?}",
                value.data_type()
            );
            self.current.insert(key.to_string(), value);
        }
    }

    /// Set a single attribute's current value. Convenience wrapper over [`update`](Self::update).
    pub fn set(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.update([(key, value.into())]);
    }

    /// Current value of a declared attribute. Panics if `key` was never declared.
    pub fn get(&self, key: &str) -> &AttrValue {
        self.current
            .get(key)
            .unwrap_or_else(|| panic!("undeclared interface attribute {key:?}"))
    }

    /// Previous-tick value of a declared attribute (the snapshot as of the last `advance()`).
    pub fn get_old(&self, key: &str) -> &AttrValue {
        self.previous
            .get(key)
            .unwrap_or_else(|| panic!("undeclared interface attribute {key:?}"))
    }

    /// `true` if `key`'s current value differs from its previous-tick value.
    pub fn changed(&self, key: &str) -> bool {
        self.get(key) != self.get_old(key)
    }

    /// `true` if `key`'s previous value was falsy and its current value is truthy.
    pub fn rising_edge(&self, key: &str) -> bool {
        !self.get_old(key).is_truthy() && self.get(key).is_truthy()
    }

    /// Copy every attribute's current value into its previous slot. Must be called exactly once
    /// per tick, after `write()` and before the next `read()`.
    pub fn advance(&mut self) {
        for (key, value) in self.current.iter() {
            self.previous.insert(key.clone(), value.clone());
        }
    }

    /// Iterate over all declared attribute names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.declared.keys().map(String::as_str)
    }

    /// Snapshot of every attribute's current value, keyed by name.
    pub fn snapshot(&self) -> HashMap<String, AttrValue> {
        self.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> InterfaceBundle {
        let mut b = InterfaceBundle::new();
        b.declare("fault", false, DataType::Bit);
        b.declare("error_code", 0u32, DataType::U32);
        b.declare("description", "No error", DataType::Str);
        b.freeze();
        b
    }

    #[test]
    fn declared_keys_always_present_with_defaults() {
        let b = bundle();
        assert_eq!(b.get("fault").as_bool(), false);
        assert_eq!(b.get("error_code").as_u32(), 0);
        assert_eq!(b.get("description").as_str(), "No error");
    }

    #[test]
    fn changed_tracks_current_vs_previous() {
        let mut b = bundle();
        assert!(!b.changed("fault"));
        b.set("fault", true);
        assert!(b.changed("fault"));
        b.advance();
        assert!(!b.changed("fault"));
        assert_eq!(b.get_old("fault").as_bool(), true);
    }

    #[test]
    fn rising_edge_requires_falsy_then_truthy() {
        let mut b = bundle();
        b.set("error_code", 0u32);
        b.advance();
        assert!(!b.rising_edge("error_code"));
        b.set("error_code", 42u32);
        assert!(b.rising_edge("error_code"));
        b.advance();
        assert!(!b.rising_edge("error_code"));
        b.set("error_code", 43u32);
        // Nonzero to nonzero is not a rising edge.
        assert!(!b.rising_edge("error_code"));
    }

    #[test]
    fn advance_equalizes_current_and_previous() {
        let mut b = bundle();
        b.set("fault", true);
        b.set("error_code", 7u32);
        b.advance();
        assert_eq!(b.get("fault"), b.get_old("fault"));
        assert_eq!(b.get("error_code"), b.get_old("error_code"));
    }

    #[test]
    #[should_panic(expected = "undeclared")]
    fn undeclared_read_is_fatal() {
        let b = bundle();
        b.get("not_a_real_key");
    }

    #[test]
    #[should_panic(expected = "type mismatch")]
    fn type_mismatch_is_fatal() {
        let mut b = bundle();
        b.set("fault", 1u8);
    }
}
