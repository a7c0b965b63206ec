//! Composite building: properties whose value is a canonical instance of
//! another value object type, fed from the pre-parsed property of the same name.

use std::sync::Arc;

use crate::construct::TypeKey;
use crate::datatype::{Fields, Instance, Value};
use crate::error::ConstructionError;

/// Whether a construction publishes into the store or only checks validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Look up, intern and keep: the normal construction path.
    Canonical,
    /// Build throwaway instances without touching any store.
    Detached,
}

/// Something that can build a canonical instance from raw input.
pub trait Composable: Send + Sync {
    fn type_key(&self) -> TypeKey;
    fn type_name(&self) -> &str;
    fn compose(&self, raw: Value, mode: Mode) -> Result<Instance, ConstructionError>;
}

pub type Composites = Vec<(String, Arc<dyn Composable>)>;

/// Build every composite from the derived property of the same name. A missing
/// derived property counts as no input. The first failure aborts the lot.
pub fn build(
    derived: &Fields,
    composites: &Composites,
    mode: Mode,
) -> Result<Vec<(String, Instance)>, ConstructionError> {
    composites
        .iter()
        .map(|(name, composable)| {
            let raw = derived
                .get(name)
                .map_or(Value::Null, |slot| slot.node().to_value());
            composable.compose(raw, mode).map(|instance| (name.clone(), instance))
        })
        .collect()
}
