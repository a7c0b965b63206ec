//! The construction context: the mutable scratch object a value object is
//! built in. It starts out holding `original` (read only) and `value` (a
//! writable copy of the original), collects parsed properties and composites,
//! and is finally published as an [`Instance`](crate::datatype::Instance).

use std::mem;

use crate::construct::Interner;
use crate::datatype::{Cursor, Fields, Instance, NULL_NODE, Node, SEPARATOR, Slot, Value};
use crate::error::ConstructionError;
use crate::freeze::seal;

pub const ORIGINAL: &str = "original";
pub const VALUE: &str = "value";

#[derive(Debug)]
pub struct Context {
    pub(crate) fields: Fields,
}

impl Context {
    pub(crate) fn seed(original: Value) -> Self {
        let mut fields = Fields::new();
        let value = Node::thaw(&original);
        fields.insert(ORIGINAL.to_owned(), Slot::sealed(original));
        fields.insert(VALUE.to_owned(), Slot::open(value));
        Self { fields }
    }
    /// The raw input, exactly as given.
    pub fn original(&self) -> &Value {
        match self.field(ORIGINAL) {
            Some(Node::Shared(value)) => value,
            _ => &NULL_NODE_VALUE,
        }
    }
    /// The working value. Pre-parsers may replace it or add to it.
    pub fn value(&self) -> &Node {
        self.field(VALUE).unwrap_or(&NULL_NODE)
    }
    pub fn field(&self, name: &str) -> Option<&Node> {
        self.fields.get(name).map(Slot::node)
    }
    pub fn fields(&self) -> &Fields {
        &self.fields
    }
    /// A copy of whatever sits at a dotted path.
    pub fn get(&self, path: &str) -> Option<Node> {
        let mut segments = path.split(SEPARATOR);
        let first = segments.next()?;
        let start = Cursor::Node(self.field(first)?);
        segments
            .try_fold(start, |focus, segment| focus.child(segment))
            .map(Cursor::to_node)
    }
    /// The string at a dotted path, if there is one.
    pub fn get_str(&self, path: &str) -> Option<String> {
        self.get(path).and_then(|node| node.as_str().map(str::to_owned))
    }
    /// Whether assigning to `path` would be accepted right now.
    pub fn is_writable(&self, path: &str) -> bool {
        let (parents, last) = split(path);
        let mut fields = &self.fields;
        for (depth, segment) in parents.iter().enumerate() {
            let Some(slot) = fields.get(*segment) else {
                return true;
            };
            if !slot.writable {
                return false;
            }
            fields = match &slot.node {
                Node::Record(inner) => inner,
                // a shared record is thawed on write, so every level below it is open
                Node::Shared(shared @ Value::Record(_)) => {
                    return open_below(shared, &parents[depth + 1..]);
                }
                _ => return false,
            };
        }
        fields.get(last).is_none_or(Slot::is_writable)
    }
    /// Assign `node` at a dotted path and hand back what was assigned.
    ///
    /// Missing levels above the last are created as open records. Assigning to
    /// a read only field, or beneath one, is an immutability violation, and
    /// assigning beneath a scalar is refused.
    pub fn set(&mut self, path: &str, node: impl Into<Node>) -> Result<Node, ConstructionError> {
        let node = node.into();
        let (parents, last) = split(path);
        let mut fields = &mut self.fields;
        for segment in parents {
            let slot = fields
                .entry(segment.to_owned())
                .or_insert_with(|| Slot::open(Node::record()));
            if !slot.writable {
                return Err(ConstructionError::ImmutabilityViolation {
                    path: path.to_owned(),
                });
            }
            let thawed = match &slot.node {
                Node::Shared(shared @ Value::Record(_)) => Some(Node::thaw(shared)),
                _ => None,
            };
            if let Some(thawed) = thawed {
                slot.node = thawed;
            }
            fields = match &mut slot.node {
                Node::Record(inner) => inner,
                _ => {
                    return Err(ConstructionError::NotARecord {
                        path: path.to_owned(),
                    });
                }
            };
        }
        match fields.get_mut(last) {
            Some(slot) if !slot.writable => Err(ConstructionError::ImmutabilityViolation {
                path: path.to_owned(),
            }),
            Some(slot) => {
                slot.node = node.clone();
                Ok(node)
            }
            None => {
                fields.insert(last.to_owned(), Slot::open(node.clone()));
                Ok(node)
            }
        }
    }

    /// Put a composite in place, both at the top level and inside `value`,
    /// turning `value` into a record first if it is not one.
    pub(crate) fn adopt(&mut self, name: &str, instance: Instance) {
        let node = Node::from(instance);
        if self.fields.get(name).is_none_or(Slot::is_writable) {
            self.fields.insert(name.to_owned(), Slot::open(node.clone()));
        }
        let value = self
            .fields
            .entry(VALUE.to_owned())
            .or_insert_with(|| Slot::open(Node::record()));
        if !value.writable {
            return;
        }
        let current = mem::replace(&mut value.node, Node::record());
        value.node = match current {
            Node::Record(fields) => Node::Record(fields),
            Node::Shared(shared @ Value::Record(_)) => Node::thaw(&shared),
            _ => Node::record(),
        };
        if let Node::Record(fields) = &mut value.node {
            fields.insert(name.to_owned(), Slot::open(node));
        }
    }

    /// Swap `original` for the copy the interner shares, nested values included.
    pub(crate) fn share_original(&mut self, interner: &dyn Interner) {
        let Some(slot) = self.fields.get_mut(ORIGINAL) else {
            return;
        };
        let shared = match &slot.node {
            Node::Shared(value) => seal(Node::thaw(value), interner),
            _ => return,
        };
        slot.node = Node::Shared(shared);
    }

    /// Mirror each top level field of a record `value` as a sibling property.
    /// `original` and `value` themselves are never replaced this way.
    pub(crate) fn flatten(&mut self) {
        let value = self.value();
        let names = value.field_names();
        let mirrored: Vec<(String, Node)> = names
            .into_iter()
            .filter(|name| name != ORIGINAL && name != VALUE)
            .filter_map(|name| value.child(&name).map(|node| (name, node)))
            .collect();
        for (name, node) in mirrored {
            if self.fields.get(&name).is_none_or(Slot::is_writable) {
                self.fields.insert(name, Slot::open(node));
            }
        }
    }
}

static NULL_NODE_VALUE: Value = Value::Null;

// beneath a shared record every level has to be a record or missing
fn open_below(mut focus: &Value, parents: &[&str]) -> bool {
    for segment in parents {
        match focus.child(segment) {
            None => return true,
            Some(child @ Value::Record(_)) => focus = child,
            Some(_) => return false,
        }
    }
    true
}

/// Split a dotted path into its parent segments and its last segment.
pub(crate) fn split(path: &str) -> (Vec<&str>, &str) {
    let mut segments: Vec<&str> = path.split(SEPARATOR).collect();
    let last = segments.pop().unwrap_or(path);
    (segments, last)
}
