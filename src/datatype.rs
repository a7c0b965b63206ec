// used to print out readable forms of values and instances
use std::fmt;
use std::sync::Arc;

// published records and records under construction keep their fields in insertion order
use indexmap::IndexMap;
use serde_json::Number;

use crate::construct::{StructuralKey, TypeKey};

/// Separator between the segments of a property path, as in `parsed.nested`.
pub const SEPARATOR: char = '.';

// ------------- Value -------------
/// Published, immutable data.
///
/// Strings, arrays and records are reference counted so that the store can hand
/// out one shared copy per structurally equal value. Nothing here exposes mutable
/// access, which is what makes a published object graph deeply immutable.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(Arc<str>),
    Array(Arc<[Value]>),
    Record(Arc<Record>),
    Instance(Instance),
}

static NULL: Value = Value::Null;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(i) => Some(i),
            _ => None,
        }
    }
    /// One step down: a record field, an array position, or a field of an instance.
    pub fn child(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Record(r) => r.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            Value::Instance(i) => i.get(segment),
            _ => None,
        }
    }
    /// Follow a dotted path such as `key1.key2.key3`.
    pub fn path(&self, path: &str) -> Option<&Value> {
        path.split(SEPARATOR)
            .try_fold(self, |focus, segment| focus.child(segment))
    }
    /// True when both sides are the very same canonical value, not merely equal ones.
    /// Scalars carry no identity and compare by value.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Arc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Record(a), Value::Record(b)) => Arc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => a.is_same(b),
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => false,
        }
    }
    /// Plain data, with every nested instance unwrapped into its own value.
    pub fn value_of(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => items.iter().map(Value::value_of).collect(),
            Value::Record(r) => serde_json::Value::Object(
                r.iter()
                    .map(|(name, value)| (name.to_string(), value.value_of()))
                    .collect(),
            ),
            Value::Instance(i) => i.value_of(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value_of())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(Arc::from(s)),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Record(Arc::new(
                map.into_iter()
                    .map(|(name, value)| (Arc::<str>::from(name), Value::from(value)))
                    .collect(),
            )),
        }
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from(n))
    }
}
impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(Number::from(n))
    }
}
impl From<f64> for Value {
    // NaN and infinities have no JSON form
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}
impl From<Instance> for Value {
    fn from(i: Instance) -> Self {
        Value::Instance(i)
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ------------- Record -------------
/// Immutable field table of a published record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: IndexMap<Arc<str>, Value>,
}
impl Record {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (&**name, value))
    }
    pub fn len(&self) -> usize {
        self.fields.len()
    }
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
impl FromIterator<(Arc<str>, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (Arc<str>, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

// ------------- Instance -------------
#[derive(Debug)]
struct Kept {
    type_key: TypeKey,
    type_name: Arc<str>,
    key: StructuralKey,
    fields: Record,
}

/// A canonical value object. Cloning shares the same instance.
///
/// Equality is identity: two handles are equal only when they point at the
/// same canonical instance, which the store guarantees for structurally equal
/// input of the same type.
#[derive(Clone)]
pub struct Instance(Arc<Kept>);

impl Instance {
    pub(crate) fn new(
        type_key: TypeKey,
        type_name: Arc<str>,
        key: StructuralKey,
        fields: Record,
    ) -> Self {
        Self(Arc::new(Kept {
            type_key,
            type_name,
            key,
            fields,
        }))
    }
    pub fn type_key(&self) -> TypeKey {
        self.0.type_key
    }
    pub fn type_name(&self) -> &str {
        &self.0.type_name
    }
    /// The structural key of the raw input this instance was built from.
    pub fn key(&self) -> &StructuralKey {
        &self.0.key
    }
    /// The raw input, exactly as given.
    pub fn original(&self) -> &Value {
        self.get("original").unwrap_or(&NULL)
    }
    /// The validated working value.
    pub fn value(&self) -> &Value {
        self.get("value").unwrap_or(&NULL)
    }
    /// A top level property: `original`, `value`, a flattened field of the value,
    /// a parsed property or a composite.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.fields.get(name)
    }
    pub fn path(&self, path: &str) -> Option<&Value> {
        let (first, rest) = match path.split_once(SEPARATOR) {
            Some((first, rest)) => (first, Some(rest)),
            None => (path, None),
        };
        let focus = self.get(first)?;
        match rest {
            Some(rest) => focus.path(rest),
            None => Some(focus),
        }
    }
    pub fn fields(&self) -> &Record {
        &self.0.fields
    }
    pub fn is_same(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
    pub fn value_of(&self) -> serde_json::Value {
        self.value().value_of()
    }
}
impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}
impl Eq for Instance {}
impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value_of())
    }
}
impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({})", self.type_name(), self.value_of())
    }
}

// ------------- Node -------------
/// Construction-time data. Records and arrays stay open for writes until the
/// freezer seals them into shared [`Value`]s; every field carries its own
/// writability flag.
#[derive(Clone, Debug)]
pub enum Node {
    Shared(Value),
    Array(Vec<Slot>),
    Record(Fields),
}

pub type Fields = IndexMap<String, Slot>;

pub(crate) static NULL_NODE: Node = Node::Shared(Value::Null);

#[derive(Clone, Debug)]
pub struct Slot {
    pub(crate) node: Node,
    pub(crate) writable: bool,
}
impl Slot {
    pub(crate) fn open(node: Node) -> Self {
        Self {
            node,
            writable: true,
        }
    }
    pub(crate) fn sealed(value: Value) -> Self {
        Self {
            node: Node::Shared(value),
            writable: false,
        }
    }
    pub fn node(&self) -> &Node {
        &self.node
    }
    pub fn is_writable(&self) -> bool {
        self.writable
    }
}

impl Node {
    pub fn record() -> Self {
        Node::Record(Fields::new())
    }
    /// A writable copy of a published value. Instances stay shared.
    pub fn thaw(value: &Value) -> Self {
        match value {
            Value::Record(r) => Node::Record(
                r.iter()
                    .map(|(name, value)| (name.to_owned(), Slot::open(Node::thaw(value))))
                    .collect(),
            ),
            Value::Array(items) => {
                Node::Array(items.iter().map(|v| Slot::open(Node::thaw(v))).collect())
            }
            other => Node::Shared(other.clone()),
        }
    }
    pub fn is_record(&self) -> bool {
        matches!(self, Node::Record(_) | Node::Shared(Value::Record(_)))
    }
    pub fn is_null(&self) -> bool {
        matches!(self, Node::Shared(Value::Null))
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Shared(v) => v.as_str(),
            _ => None,
        }
    }
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Shared(v) => v.as_i64(),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Shared(v) => v.as_bool(),
            _ => None,
        }
    }
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Node::Shared(v) => v.as_instance(),
            _ => None,
        }
    }
    /// Names of the top level fields when this is a record, open or shared.
    pub fn field_names(&self) -> Vec<String> {
        match self {
            Node::Record(fields) => fields.keys().cloned().collect(),
            Node::Shared(Value::Record(r)) => r.iter().map(|(name, _)| name.to_owned()).collect(),
            _ => Vec::new(),
        }
    }
    /// A copy of one step down, open or shared.
    pub fn child(&self, segment: &str) -> Option<Node> {
        self.cursor().child(segment).map(Cursor::to_node)
    }
    pub(crate) fn cursor(&self) -> Cursor<'_> {
        Cursor::Node(self)
    }
    /// Snapshot as published data, without interning.
    pub fn to_value(&self) -> Value {
        match self {
            Node::Shared(v) => v.clone(),
            Node::Array(slots) => Value::Array(slots.iter().map(|s| s.node.to_value()).collect()),
            Node::Record(fields) => Value::Record(Arc::new(
                fields
                    .iter()
                    .map(|(name, slot)| (Arc::<str>::from(name.as_str()), slot.node.to_value()))
                    .collect(),
            )),
        }
    }
    pub fn value_of(&self) -> serde_json::Value {
        self.to_value().value_of()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.to_value() == other.to_value()
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Node::thaw(&value)
    }
}
impl From<serde_json::Value> for Node {
    fn from(json: serde_json::Value) -> Self {
        Node::thaw(&Value::from(json))
    }
}
impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Shared(Value::from(s))
    }
}
impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Shared(Value::from(s))
    }
}
impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Shared(Value::Bool(b))
    }
}
impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Node::Shared(Value::from(n))
    }
}
impl From<Instance> for Node {
    fn from(i: Instance) -> Self {
        Node::Shared(Value::Instance(i))
    }
}
impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(v: Option<T>) -> Self {
        v.map_or(Node::Shared(Value::Null), Into::into)
    }
}

// ------------- Cursor -------------
/// Borrowed position inside a node tree, which may cross into shared data.
#[derive(Clone, Copy)]
pub(crate) enum Cursor<'a> {
    Node(&'a Node),
    Value(&'a Value),
}
impl<'a> Cursor<'a> {
    pub(crate) fn child(self, segment: &str) -> Option<Cursor<'a>> {
        match self {
            Cursor::Value(v) => v.child(segment).map(Cursor::Value),
            Cursor::Node(Node::Shared(v)) => v.child(segment).map(Cursor::Value),
            Cursor::Node(Node::Record(fields)) => {
                fields.get(segment).map(|s| Cursor::Node(&s.node))
            }
            Cursor::Node(Node::Array(slots)) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| slots.get(i))
                .map(|s| Cursor::Node(&s.node)),
        }
    }
    pub(crate) fn to_node(self) -> Node {
        match self {
            Cursor::Node(node) => node.clone(),
            Cursor::Value(value) => Node::Shared(value.clone()),
        }
    }
}
