//! The canonical store and its keepers.
//!
//! A "keeper" owns constructs and guarantees their uniqueness, in the sense that
//! keeping something structurally equal to what is already kept hands back the
//! kept copy instead. Two keepers are needed:
//! - ValueKeeper, a type independent table of shared strings, arrays and records
//! - InstanceKeeper, one table of canonical instances per value object type
//!
//! Both are keyed by a [`StructuralKey`], a digest of a canonical encoding of the
//! value, so that keys are independent of which object produced the value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// other keepers use HashMap
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

// staged values are collected behind a shared reference
use std::cell::RefCell;

// used to print out readable forms of keys
use std::fmt;

use lazy_static::lazy_static;
use serde_json::Number;
use tracing::{debug, info};

use crate::datatype::{Instance, Value};
use crate::settings::{KeyOrder, Settings};

pub type KeyHasher = BuildHasherDefault<SeaHasher>;

// ------------- TypeKey -------------
/// Identity of a defined value object type. Two types with the same name
/// still get different keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct TypeKey(u64);

static NEXT_TYPE: AtomicU64 = AtomicU64::new(1);

impl TypeKey {
    pub(crate) fn generate() -> Self {
        Self(NEXT_TYPE.fetch_add(1, Ordering::Relaxed))
    }
    pub fn id(&self) -> u64 {
        self.0
    }
}
impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ------------- StructuralKey -------------
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructuralKey([u8; 32]);

impl StructuralKey {
    /// Derive the key of a value. Every variant is tagged and every string and
    /// collection is length prefixed, so distinct shapes cannot encode alike.
    pub fn of(value: &Value, order: KeyOrder) -> Self {
        let mut hasher = blake3::Hasher::new();
        encode(value, order, &mut hasher);
        Self(*hasher.finalize().as_bytes())
    }
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}
impl fmt::Display for StructuralKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
impl fmt::Debug for StructuralKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "StructuralKey({})", self)
    }
}

fn encode_str(s: &str, hasher: &mut blake3::Hasher) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

// integral floats key like the integer they equal, so 1.0 and 1 are one value
fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn encode(value: &Value, order: KeyOrder, hasher: &mut blake3::Hasher) {
    match value {
        Value::Null => {
            hasher.update(b"n");
        }
        Value::Bool(b) => {
            hasher.update(if *b { b"t" } else { b"f" });
        }
        Value::Number(n) => {
            hasher.update(b"#");
            encode_str(&number_text(n), hasher);
        }
        Value::String(s) => {
            hasher.update(b"s");
            encode_str(s, hasher);
        }
        Value::Array(items) => {
            hasher.update(b"[");
            hasher.update(&(items.len() as u64).to_le_bytes());
            for item in items.iter() {
                encode(item, order, hasher);
            }
        }
        Value::Record(record) => {
            hasher.update(b"{");
            hasher.update(&(record.len() as u64).to_le_bytes());
            let mut fields: Vec<(&str, &Value)> = record.iter().collect();
            if order == KeyOrder::Sorted {
                fields.sort_unstable_by(|a, b| a.0.cmp(b.0));
            }
            for (name, field) in fields {
                encode_str(name, hasher);
                encode(field, order, hasher);
            }
        }
        // instances are already canonical, so their own key stands in for their content
        Value::Instance(instance) => {
            hasher.update(b"@");
            hasher.update(&instance.type_key().id().to_le_bytes());
            hasher.update(instance.key().as_bytes());
        }
    }
}

// ------------- ValueKeeper -------------
#[derive(Debug, Default)]
pub struct ValueKeeper {
    kept: HashMap<StructuralKey, Value, KeyHasher>,
}
impl ValueKeeper {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn get(&self, key: &StructuralKey) -> Option<Value> {
        self.kept.get(key).cloned()
    }
    pub fn keep(&mut self, key: StructuralKey, value: Value) -> (Value, bool) {
        match self.kept.entry(key) {
            Entry::Occupied(e) => (e.get().clone(), true),
            Entry::Vacant(e) => (e.insert(value).clone(), false),
        }
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

// ------------- InstanceKeeper -------------
#[derive(Debug, Default)]
pub struct InstanceKeeper {
    kept: HashMap<TypeKey, HashMap<StructuralKey, Instance, KeyHasher>, KeyHasher>,
    length: usize,
}
impl InstanceKeeper {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn get(&self, type_key: TypeKey, key: &StructuralKey) -> Option<Instance> {
        self.kept.get(&type_key)?.get(key).cloned()
    }
    /// Insert if absent. The kept instance is returned either way, so that the
    /// caller always continues with the one true copy.
    pub fn keep(
        &mut self,
        type_key: TypeKey,
        key: StructuralKey,
        instance: Instance,
    ) -> (Instance, bool) {
        let table = self.kept.entry(type_key).or_default();
        match table.entry(key) {
            Entry::Occupied(e) => (e.get().clone(), true),
            Entry::Vacant(e) => {
                self.length += 1;
                (e.insert(instance).clone(), false)
            }
        }
    }
    pub fn count(&self, type_key: TypeKey) -> usize {
        self.kept.get(&type_key).map_or(0, HashMap::len)
    }
    pub fn len(&self) -> usize {
        self.length
    }
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

// ------------- Interner -------------
/// Turns a freshly sealed value into the copy that should be published.
pub trait Interner {
    fn intern(&self, value: Value) -> Value;
}

/// Publishes values as they are, leaving every store untouched. Used when
/// checking validity without constructing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl Interner for Detached {
    fn intern(&self, value: Value) -> Value {
        value
    }
}

// ------------- Store -------------
/// The canonical store: owns the keepers and hands out shared, read only copies.
///
/// Cloning a store shares its tables. Lookup followed by insert happens under a
/// single lock, so concurrent construction of equal input still yields one
/// canonical instance.
#[derive(Clone, Debug)]
pub struct Store {
    order: KeyOrder,
    value_keeper: Arc<Mutex<ValueKeeper>>,
    instance_keeper: Arc<Mutex<InstanceKeeper>>,
}

lazy_static! {
    static ref GLOBAL: Store = Store::new(KeyOrder::default());
}

// every keeper update is a single insert, so a poisoned table is still consistent
fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Store {
    pub fn new(order: KeyOrder) -> Self {
        Self {
            order,
            value_keeper: Arc::new(Mutex::new(ValueKeeper::new())),
            instance_keeper: Arc::new(Mutex::new(InstanceKeeper::new())),
        }
    }
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.key_order)
    }
    /// The process wide store used by [`crate::definition::ValueObjectType::define`].
    pub fn global() -> Store {
        GLOBAL.clone()
    }
    pub fn order(&self) -> KeyOrder {
        self.order
    }
    pub fn key_of(&self, value: &Value) -> StructuralKey {
        StructuralKey::of(value, self.order)
    }
    pub fn lookup(&self, type_key: TypeKey, value: &Value) -> Option<Instance> {
        self.lookup_key(type_key, &self.key_of(value))
    }
    pub fn lookup_key(&self, type_key: TypeKey, key: &StructuralKey) -> Option<Instance> {
        guard(&self.instance_keeper).get(type_key, key)
    }
    pub fn insert(&self, type_key: TypeKey, value: &Value, instance: Instance) -> Instance {
        self.insert_key(type_key, self.key_of(value), instance)
    }
    pub fn insert_key(
        &self,
        type_key: TypeKey,
        key: StructuralKey,
        instance: Instance,
    ) -> Instance {
        let (kept, _previously_kept) = guard(&self.instance_keeper).keep(type_key, key, instance);
        kept
    }
    /// Like [`Store::insert_key`], also telling whether an equal instance was kept before.
    pub fn keep_instance(
        &self,
        type_key: TypeKey,
        key: StructuralKey,
        instance: Instance,
    ) -> (Instance, bool) {
        guard(&self.instance_keeper).keep(type_key, key, instance)
    }
    /// Share a value through the type independent table. Scalars and instances
    /// carry no structure to share and are returned as they are.
    pub fn keep_value(&self, value: Value) -> Value {
        if !shareable(&value) {
            return value;
        }
        let key = self.key_of(&value);
        guard(&self.value_keeper).keep(key, value).0
    }
    /// Intern against this store without writing to it until committed.
    pub fn stage(&self) -> Staging<'_> {
        Staging {
            store: self,
            pending: RefCell::new(HashMap::default()),
        }
    }
    pub fn count(&self, type_key: TypeKey) -> usize {
        guard(&self.instance_keeper).count(type_key)
    }
    /// Number of canonical instances over all types.
    pub fn len(&self) -> usize {
        guard(&self.instance_keeper).len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.value_count() == 0
    }
    pub fn value_count(&self) -> usize {
        guard(&self.value_keeper).len()
    }
    /// Drop every table. Live instances stay valid; they are just no longer
    /// handed out for future equal input.
    pub fn clear(&self) {
        let mut instances = guard(&self.instance_keeper);
        let mut values = guard(&self.value_keeper);
        info!(instances = instances.len(), values = values.len(), "clearing canonical store");
        *instances = InstanceKeeper::new();
        *values = ValueKeeper::new();
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(KeyOrder::default())
    }
}

impl Interner for Store {
    fn intern(&self, value: Value) -> Value {
        self.keep_value(value)
    }
}

fn shareable(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Array(_) | Value::Record(_))
}

// ------------- Staging -------------
/// Shares values already kept by the store and collects new ones aside, so
/// that an abandoned construction leaves the value table as it was.
pub struct Staging<'a> {
    store: &'a Store,
    pending: RefCell<HashMap<StructuralKey, Value, KeyHasher>>,
}

impl Staging<'_> {
    /// Number of values that would be added by a commit.
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }
    /// Keep every staged value. A value kept meanwhile by someone else wins.
    pub fn commit(self) {
        let pending = self.pending.into_inner();
        if pending.is_empty() {
            return;
        }
        let mut keeper = guard(&self.store.value_keeper);
        debug!(values = pending.len(), "committing staged values");
        for (key, value) in pending {
            keeper.keep(key, value);
        }
    }
}

impl Interner for Staging<'_> {
    fn intern(&self, value: Value) -> Value {
        if !shareable(&value) {
            return value;
        }
        let key = self.store.key_of(&value);
        if let Some(kept) = guard(&self.store.value_keeper).get(&key) {
            return kept;
        }
        self.pending.borrow_mut().entry(key).or_insert(value).clone()
    }
}

impl fmt::Debug for Staging<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Staging").field("pending", &self.pending()).finish()
    }
}
