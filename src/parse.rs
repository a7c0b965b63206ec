//! Nested property application.
//!
//! A parser maps a dotted property path to a rule: either a literal or a
//! derivation that is handed the context being built. Rules run in declared
//! order, and every level above the last segment is materialised as an open
//! record when missing. A destination that is already read only is left alone.

use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use crate::context::{Context, split};
use crate::datatype::{Fields, Node, SEPARATOR, Slot, Value};
use crate::error::ConstructionError;

lazy_static! {
    // one or more non-empty segments separated by single dots
    static ref PROPERTY_PATH: Regex = Regex::new(r"^[^.]+(\.[^.]+)*$").unwrap();
}

// ------------- PropertyPath -------------
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    path: String,
}
impl PropertyPath {
    pub fn parse(path: &str) -> Option<Self> {
        PROPERTY_PATH.is_match(path).then(|| Self {
            path: path.to_owned(),
        })
    }
    pub fn as_str(&self) -> &str {
        &self.path
    }
    /// The top level property this path starts at.
    pub fn head(&self) -> &str {
        self.path.split(SEPARATOR).next().unwrap_or(&self.path)
    }
}
impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

// ------------- Rule -------------
pub type Derivation = Arc<dyn Fn(&mut Context) -> Result<Node, ConstructionError> + Send + Sync>;

#[derive(Clone)]
pub enum Rule {
    Literal(Value),
    Derive(Derivation),
}
impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rule::Literal(value) => write!(f, "Literal({})", value),
            Rule::Derive(_) => write!(f, "Derive(..)"),
        }
    }
}

/// Parsers in declaration order.
pub type Parsers = Vec<(PropertyPath, Rule)>;

/// Apply `parsers` to `ctx` in order. Returns the top level properties that
/// were written, as they stood once every rule had run.
pub fn apply(ctx: &mut Context, parsers: &Parsers) -> Result<Fields, ConstructionError> {
    let mut written: Vec<&str> = Vec::new();
    for (path, rule) in parsers {
        let (parents, last) = split(path.as_str());
        let writable = match materialize(&mut ctx.fields, &parents) {
            Some(fields) => fields.get(last).is_none_or(Slot::is_writable),
            None => false,
        };
        if !writable {
            trace!(path = %path, "skipping read only destination");
            continue;
        }
        let node = match rule {
            Rule::Literal(value) => Node::thaw(value),
            Rule::Derive(derive) => derive(ctx)?,
        };
        // the derivation may have reshaped the context, so walk the path again
        let Some(fields) = materialize(&mut ctx.fields, &parents) else {
            trace!(path = %path, "skipping read only destination");
            continue;
        };
        if fields.get(last).is_some_and(|slot| !slot.writable) {
            trace!(path = %path, "skipping read only destination");
            continue;
        }
        fields.insert(last.to_owned(), Slot::open(node));
        if !written.contains(&path.head()) {
            written.push(path.head());
        }
    }
    Ok(written
        .into_iter()
        .filter_map(|name| {
            ctx.fields
                .get(name)
                .map(|slot| (name.to_owned(), slot.clone()))
        })
        .collect())
}

/// Walk `parents`, opening or creating records on the way. Gives up at the
/// first read only level.
fn materialize<'a>(mut fields: &'a mut Fields, parents: &[&str]) -> Option<&'a mut Fields> {
    for segment in parents {
        let slot = fields
            .entry((*segment).to_owned())
            .or_insert_with(|| Slot::open(Node::record()));
        if !slot.writable {
            return None;
        }
        if !matches!(slot.node, Node::Record(_)) {
            slot.node = match &slot.node {
                Node::Shared(shared @ Value::Record(_)) => Node::thaw(shared),
                _ => Node::record(),
            };
        }
        fields = match &mut slot.node {
            Node::Record(inner) => inner,
            _ => return None,
        };
    }
    Some(fields)
}
