//! Information bags: typed key to value maps attached to ports.
//!
//! A bag is owned per (node, port, connection slot) and carries both
//! capability metadata (whole extent, maximum piece count) and the current
//! request (update extent). The key set is closed: every key and its value
//! type are fixed at compile time.

use std::collections::HashMap;
use std::sync::Arc;

use crate::data::DataObject;
use crate::extent::Extent;

/// The closed set of bag keys. A key's value type never varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// The maximal extent a producer could ever realize (`Value::Extent`).
    WholeExtent,
    /// The currently requested sub-region (`Value::Extent`).
    UpdateExtent,
    /// Whether a consumer has explicitly initialized the update request
    /// (`Value::Bool`). Uninitialized requests default to the whole domain.
    UpdateInitialized,
    /// Upper bound on pieces an unstructured producer can split into;
    /// `-1` means unbounded (`Value::Int`).
    MaxPieces,
    /// Spatial placement of structured samples, `[origin xyz, spacing xyz]`
    /// (`Value::Doubles`).
    SpatialMetadata,
    /// The produced data object on an output port (`Value::Data`).
    DataObject,
}

/// A bag value. Missing keys are represented by absence, never by a variant.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Extent(Extent),
    Doubles(Vec<f64>),
    Data(Arc<dyn DataObject>),
}

/// Key to value map with O(1) lookup.
///
/// `get` on a missing key returns `None`; callers that rely on presence must
/// check `has` first. There is no error path for absence.
#[derive(Debug, Clone, Default)]
pub struct InformationBag {
    entries: HashMap<Key, Value>,
}

impl InformationBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: Key) -> Option<&Value> {
        self.entries.get(&key)
    }

    pub fn set(&mut self, key: Key, value: Value) {
        self.entries.insert(key, value);
    }

    pub fn has(&self, key: Key) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn remove(&mut self, key: Key) -> Option<Value> {
        self.entries.remove(&key)
    }

    /// Duplicates a single entry from `src` into this bag. A key absent from
    /// `src` is left untouched here.
    pub fn copy_entry(&mut self, src: &InformationBag, key: Key) {
        if let Some(value) = src.get(key) {
            self.entries.insert(key, value.clone());
        }
    }

    // Typed accessors. Each returns `None` when the key is absent or, in
    // debug builds, asserts when the key holds a value of the wrong type.

    pub fn whole_extent(&self) -> Option<Extent> {
        self.extent_entry(Key::WholeExtent)
    }

    pub fn set_whole_extent(&mut self, extent: impl Into<Extent>) {
        self.set(Key::WholeExtent, Value::Extent(extent.into()));
    }

    pub fn update_extent(&self) -> Option<Extent> {
        self.extent_entry(Key::UpdateExtent)
    }

    pub fn set_update_extent(&mut self, extent: impl Into<Extent>) {
        self.set(Key::UpdateExtent, Value::Extent(extent.into()));
    }

    pub fn update_initialized(&self) -> bool {
        matches!(self.get(Key::UpdateInitialized), Some(Value::Bool(true)))
    }

    pub fn set_update_initialized(&mut self, initialized: bool) {
        self.set(Key::UpdateInitialized, Value::Bool(initialized));
    }

    pub fn max_pieces(&self) -> Option<i64> {
        match self.get(Key::MaxPieces) {
            Some(Value::Int(n)) => Some(*n),
            Some(other) => {
                debug_assert!(false, "MaxPieces holds {other:?}");
                None
            }
            None => None,
        }
    }

    pub fn set_max_pieces(&mut self, max: i64) {
        self.set(Key::MaxPieces, Value::Int(max));
    }

    pub fn spatial_metadata(&self) -> Option<&[f64]> {
        match self.get(Key::SpatialMetadata) {
            Some(Value::Doubles(v)) => Some(v.as_slice()),
            Some(other) => {
                debug_assert!(false, "SpatialMetadata holds {other:?}");
                None
            }
            None => None,
        }
    }

    pub fn set_spatial_metadata(&mut self, values: Vec<f64>) {
        self.set(Key::SpatialMetadata, Value::Doubles(values));
    }

    pub fn data_object(&self) -> Option<&Arc<dyn DataObject>> {
        match self.get(Key::DataObject) {
            Some(Value::Data(d)) => Some(d),
            Some(other) => {
                debug_assert!(false, "DataObject holds {other:?}");
                None
            }
            None => None,
        }
    }

    pub fn set_data_object(&mut self, data: Arc<dyn DataObject>) {
        self.set(Key::DataObject, Value::Data(data));
    }

    pub fn take_data_object(&mut self) -> Option<Arc<dyn DataObject>> {
        match self.remove(Key::DataObject) {
            Some(Value::Data(d)) => Some(d),
            Some(other) => {
                debug_assert!(false, "DataObject holds {other:?}");
                None
            }
            None => None,
        }
    }

    fn extent_entry(&self, key: Key) -> Option<Extent> {
        match self.get(key) {
            Some(Value::Extent(e)) => Some(*e),
            Some(other) => {
                debug_assert!(false, "{key:?} holds {other:?}");
                None
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extent::StructuredExtent;

    #[test]
    fn missing_keys_are_absent_not_errors() {
        let bag = InformationBag::new();
        assert!(!bag.has(Key::WholeExtent));
        assert!(bag.get(Key::WholeExtent).is_none());
        assert!(bag.whole_extent().is_none());
    }

    #[test]
    fn copy_entry_duplicates_one_key() {
        let mut src = InformationBag::new();
        src.set_whole_extent(StructuredExtent::line(0, 99));
        src.set_max_pieces(4);

        let mut dst = InformationBag::new();
        dst.copy_entry(&src, Key::WholeExtent);
        assert_eq!(
            dst.whole_extent(),
            Some(Extent::Structured(StructuredExtent::line(0, 99)))
        );
        assert!(!dst.has(Key::MaxPieces));

        // Copying an absent key leaves the destination untouched.
        dst.set_max_pieces(2);
        dst.copy_entry(&InformationBag::new(), Key::MaxPieces);
        assert_eq!(dst.max_pieces(), Some(2));
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut bag = InformationBag::new();
        bag.set_update_extent(StructuredExtent::line(0, 9));
        bag.set_update_extent(StructuredExtent::line(5, 7));
        assert_eq!(
            bag.update_extent(),
            Some(Extent::Structured(StructuredExtent::line(5, 7)))
        );
    }
}
