//! Small value types shared across layers.

use serde::{Serialize, Serializer};

/// An optional asset slot on a cape.
///
/// Serialized as the inner value when present and as `false` when absent, which
/// is the shape descriptor consumers expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<T> {
    Present(T),
    Absent,
}

impl<T> Slot<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Slot<U> {
        match self {
            Slot::Present(value) => Slot::Present(f(value)),
            Slot::Absent => Slot::Absent,
        }
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Slot::Present(value),
            None => Slot::Absent,
        }
    }
}

impl<T: Serialize> Serialize for Slot<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Slot::Present(value) => value.serialize(serializer),
            Slot::Absent => serializer.serialize_bool(false),
        }
    }
}
