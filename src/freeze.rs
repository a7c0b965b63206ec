//! Deep immutability enforcement.
//!
//! Freezing walks a field table and seals every writable field: open records
//! and arrays are sealed children first, then handed to an [`Interner`] so that
//! the published copy is the shared one. Fields that are already read only are
//! never entered again, which keeps shared structure from being re-walked and
//! makes freezing twice a no-op.

use std::mem;
use std::sync::Arc;

use crate::construct::Interner;
use crate::datatype::{Fields, Node, Record, Slot, Value};

/// Seal every writable field of `fields` in place.
pub fn freeze(fields: &mut Fields, interner: &dyn Interner) {
    for slot in fields.values_mut() {
        freeze_slot(slot, interner);
    }
}

fn freeze_slot(slot: &mut Slot, interner: &dyn Interner) {
    if !slot.writable {
        return;
    }
    let node = mem::replace(&mut slot.node, Node::Shared(Value::Null));
    slot.node = Node::Shared(seal(node, interner));
    slot.writable = false;
}

/// Convert an open node into published data, sealing children first.
pub fn seal(node: Node, interner: &dyn Interner) -> Value {
    match node {
        Node::Shared(value) => interner.intern(value),
        Node::Record(fields) => {
            let record: Record = fields
                .into_iter()
                .map(|(name, slot)| (Arc::<str>::from(name), seal_slot(slot, interner)))
                .collect();
            interner.intern(Value::Record(Arc::new(record)))
        }
        Node::Array(slots) => {
            let items: Arc<[Value]> =
                slots.into_iter().map(|slot| seal_slot(slot, interner)).collect();
            interner.intern(Value::Array(items))
        }
    }
}

fn seal_slot(slot: Slot, interner: &dyn Interner) -> Value {
    match slot.node {
        Node::Shared(value) if !slot.writable => value,
        node => seal(node, interner),
    }
}

/// Publish a frozen field table as a record.
pub fn publish(fields: Fields, interner: &dyn Interner) -> Record {
    fields
        .into_iter()
        .map(|(name, slot)| (Arc::<str>::from(name), seal_slot(slot, interner)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construct::{Detached, Store};
    use serde_json::json;

    fn fields(json: serde_json::Value) -> Fields {
        match Node::from(json) {
            Node::Record(fields) => fields,
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn every_reachable_field_is_sealed() {
        let mut table = fields(json!({ "key1": { "key2": { "key3": [ { "key4": "value" } ] } } }));
        freeze(&mut table, &Detached);
        let slot = &table["key1"];
        assert!(!slot.is_writable());
        match slot.node() {
            Node::Shared(value) => {
                assert_eq!(value.path("key2.key3.0.key4").and_then(Value::as_str), Some("value"))
            }
            other => panic!("expected a sealed node, got {other:?}"),
        }
    }

    #[test]
    fn freezing_twice_is_a_no_op() {
        let store = Store::default();
        let mut table = fields(json!({ "a": { "b": "c" } }));
        freeze(&mut table, &store);
        let before = table["a"].node().to_value();
        let kept = store.value_count();
        freeze(&mut table, &store);
        assert!(table["a"].node().to_value().is_same(&before));
        assert_eq!(store.value_count(), kept);
    }

    #[test]
    fn equal_structure_is_shared_through_the_store() {
        let store = Store::default();
        let mut one = fields(json!({ "test": { "again": { "and": "test" } } }));
        let mut two = fields(json!({ "again": { "and": "test" } }));
        freeze(&mut one, &store);
        freeze(&mut two, &store);
        let deep = one["test"].node().to_value();
        let shallow = two["again"].node().to_value();
        assert!(deep.child("again").unwrap().is_same(&shallow));
    }

    #[test]
    fn only_writable_fields_are_touched() {
        let store = Store::default();
        let mut table = fields(json!({ "open": "x" }));
        table.insert(String::from("closed"), Slot::sealed(Value::from("y")));
        freeze(&mut table, &store);
        // the sealed string was never handed to the store
        assert_eq!(store.value_count(), 1);
        let record = publish(table, &store);
        assert_eq!(record.len(), 2);
    }
}
