//! Keepsake – canonical, deeply immutable value objects.
//!
//! A *value object* is identified by its content alone. Defining a type yields a
//! constructor; constructing from structurally equal input always hands back the
//! very same instance, so identity comparison doubles as equality:
//! * A [`definition::Definition`] names a validation rule plus optional
//!   pre-parsers, composites and post-parsers.
//! * A [`definition::ValueObjectType`] is the vetted constructor for a definition.
//! * An [`datatype::Instance`] is the published, read only result. It always
//!   carries `original` (the raw input) and `value` (the working value), plus
//!   whatever parsers, composites and flattening added.
//!
//! Instances and the strings, arrays and records inside them are owned and
//! deduplicated by "keeper" structures in a [`construct::Store`], so equal nested
//! values are shared through `Arc` across instances and across types.
//!
//! ## Modules
//! * [`construct`] – Type and structural keys, keepers and the store.
//! * [`datatype`] – Published values and the open nodes they are built from.
//! * [`context`] – The scratch object derivations and validation see.
//! * [`parse`] – Property paths and the nested parser applicator.
//! * [`compose`] – Composite building.
//! * [`freeze`] – Deep sealing and publishing.
//! * [`definition`] – Definitions and the construction protocol.
//! * [`settings`] / [`telemetry`] – Configuration and log output.
//!
//! ## Identity
//! Structural keys are blake3 digests of a canonical encoding of the raw input.
//! By default record field order is part of that encoding; set `key_order` to
//! `sorted` (see [`settings::Settings`]) to make it irrelevant. A float with an
//! integral value keys like the integer it equals, so `1.0` and `1` are one value.
//!
//! ## Quick Start
//! ```
//! use keepsake::{Definition, Store, ValueObjectType};
//! use serde_json::json;
//!
//! let store = Store::default();
//! let email = ValueObjectType::define_in(
//!     &store,
//!     "Email",
//!     Definition::new()
//!         .validate(|ctx| ctx.value().as_str().is_some_and(|s| s.contains('@')))
//!         .pre_parse("domain", |ctx| {
//!             Ok(ctx.value().as_str().and_then(|s| s.split('@').nth(1)).into())
//!         }),
//! )
//! .unwrap();
//!
//! let a = email.construct("someone@example.com").unwrap();
//! let b = email.construct(json!("someone@example.com")).unwrap();
//! assert!(a.is_same(&b));
//! assert_eq!(a.path("domain").and_then(|v| v.as_str()), Some("example.com"));
//! assert!(!email.validate("nobody"));
//! ```

pub mod compose;
pub mod construct;
pub mod context;
pub mod datatype;
pub mod definition;
pub mod error;
pub mod freeze;
pub mod parse;
pub mod settings;
pub mod telemetry;

pub use compose::{Composable, Mode};
pub use construct::{Store, StructuralKey, TypeKey};
pub use context::Context;
pub use datatype::{Instance, Node, Record, Value};
pub use definition::{Definition, Validatable, ValueObjectType};
pub use error::{ConstructionError, DefinitionError, KeepsakeError};
pub use settings::{KeyOrder, Settings};
