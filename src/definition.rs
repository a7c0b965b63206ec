//! Value object definitions and the construction protocol.
//!
//! A [`Definition`] is plain data: a validation rule, optional pre-parsers,
//! composites and post-parsers. [`ValueObjectType::define`] vets it and hands
//! back the constructor. Constructing runs, in order:
//!
//! 1. reject missing input
//! 2. keep the raw input as `original`, read only
//! 3. seed `value` with a writable copy of it
//! 4. pre-parse
//! 5. build composites and merge them into the top level and into `value`
//! 6. validate
//! 7. share `original` and mirror the top level fields of a record `value`
//! 8. freeze
//! 9. post-parse
//! 10. freeze again
//! 11. publish, keeping the instance unless an equal one is already kept
//!
//! A construction that fails at any step leaves the store as it was: shared
//! values are staged and only kept together with the instance.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::compose::{self, Composable, Composites, Mode};
use crate::construct::{Detached, Interner, Store, TypeKey};
use crate::context::{Context, ORIGINAL, VALUE};
use crate::datatype::{Instance, Node, Value};
use crate::error::{ConstructionError, DefinitionError};
use crate::freeze::{freeze, publish};
use crate::parse::{self, Parsers, PropertyPath, Rule};

// ------------- Validatable -------------
/// The validation rule of a value object type.
pub trait Validatable: Send + Sync {
    fn validate(&self, ctx: &Context) -> bool;
}

struct ValidateFn<F>(F);

impl<F> Validatable for ValidateFn<F>
where
    F: Fn(&Context) -> bool + Send + Sync,
{
    fn validate(&self, ctx: &Context) -> bool {
        (self.0)(ctx)
    }
}

// ------------- Definition -------------
#[derive(Clone, Default)]
pub struct Definition {
    validate: Option<Arc<dyn Validatable>>,
    pre_parsers: Vec<(String, Rule)>,
    composites: Composites,
    post_parsers: Vec<(String, Rule)>,
}

impl Definition {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(ValidateFn(validate)));
        self
    }
    pub fn validator(mut self, validator: impl Validatable + 'static) -> Self {
        self.validate = Some(Arc::new(validator));
        self
    }
    pub fn pre_parse<F>(mut self, path: impl Into<String>, derive: F) -> Self
    where
        F: Fn(&mut Context) -> Result<Node, ConstructionError> + Send + Sync + 'static,
    {
        self.pre_parsers.push((path.into(), Rule::Derive(Arc::new(derive))));
        self
    }
    pub fn pre_literal(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.pre_parsers.push((path.into(), Rule::Literal(value.into())));
        self
    }
    /// Build the property `name` as an instance of `composite`, from the
    /// pre-parsed property of the same name.
    pub fn composite(self, name: impl Into<String>, composite: &ValueObjectType) -> Self {
        self.composite_with(name, Arc::new(composite.clone()))
    }
    pub fn composite_with(
        mut self,
        name: impl Into<String>,
        composite: Arc<dyn Composable>,
    ) -> Self {
        self.composites.push((name.into(), composite));
        self
    }
    pub fn post_parse<F>(mut self, path: impl Into<String>, derive: F) -> Self
    where
        F: Fn(&mut Context) -> Result<Node, ConstructionError> + Send + Sync + 'static,
    {
        self.post_parsers.push((path.into(), Rule::Derive(Arc::new(derive))));
        self
    }
    pub fn post_literal(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.post_parsers.push((path.into(), Rule::Literal(value.into())));
        self
    }
}

fn vet(name: &str, parsers: Vec<(String, Rule)>) -> Result<Parsers, DefinitionError> {
    parsers
        .into_iter()
        .map(|(path, rule)| match PropertyPath::parse(&path) {
            Some(path) => Ok((path, rule)),
            None => Err(DefinitionError::InvalidPath {
                name: name.to_owned(),
                path,
            }),
        })
        .collect()
}

// ------------- ValueObjectType -------------
struct Kind {
    key: TypeKey,
    name: Arc<str>,
    validate: Arc<dyn Validatable>,
    pre_parsers: Parsers,
    composites: Composites,
    post_parsers: Parsers,
    store: Store,
}

/// The constructor of a defined value object type. Cheap to clone.
#[derive(Clone)]
pub struct ValueObjectType {
    kind: Arc<Kind>,
}

impl ValueObjectType {
    /// Define a type whose instances live in the process wide store.
    pub fn define(
        name: impl Into<String>,
        definition: impl Into<Option<Definition>>,
    ) -> Result<Self, DefinitionError> {
        Self::define_in(&Store::global(), name, definition)
    }

    /// Define a type whose instances live in `store`.
    pub fn define_in(
        store: &Store,
        name: impl Into<String>,
        definition: impl Into<Option<Definition>>,
    ) -> Result<Self, DefinitionError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DefinitionError::MissingName);
        }
        let Some(definition) = definition.into() else {
            return Err(DefinitionError::MissingDefinition { name });
        };
        let Some(validate) = definition.validate else {
            return Err(DefinitionError::MissingValidation { name });
        };
        if let Some((property, _)) = definition
            .composites
            .iter()
            .find(|(property, _)| property == ORIGINAL || property == VALUE)
        {
            return Err(DefinitionError::ReservedName {
                name,
                property: property.clone(),
            });
        }
        let pre_parsers = vet(&name, definition.pre_parsers)?;
        let post_parsers = vet(&name, definition.post_parsers)?;
        let key = TypeKey::generate();
        debug!(type_name = %name, type_key = %key, "defined value object type");
        Ok(Self {
            kind: Arc::new(Kind {
                key,
                name: Arc::from(name),
                validate,
                pre_parsers,
                composites: definition.composites,
                post_parsers,
                store: store.clone(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.kind.name
    }
    pub fn key(&self) -> TypeKey {
        self.kind.key
    }
    pub fn store(&self) -> &Store {
        &self.kind.store
    }
    pub fn is_type_of(&self, instance: &Instance) -> bool {
        instance.type_key() == self.kind.key
    }

    /// Build, or reuse, the canonical instance for `raw`.
    pub fn construct(&self, raw: impl Into<Value>) -> Result<Instance, ConstructionError> {
        self.build(raw.into(), Mode::Canonical)
    }

    /// Check `raw` without constructing: pre-parse, build composites without
    /// keeping them, and validate. Nothing is frozen and no store is written.
    pub fn validate(&self, raw: impl Into<Value>) -> bool {
        match self.prepare(raw.into(), Mode::Detached) {
            Ok(ctx) => self.kind.validate.validate(&ctx),
            Err(err) => {
                debug!(type_name = %self.kind.name, error = %err, "validation check failed");
                false
            }
        }
    }

    fn no_input(&self) -> ConstructionError {
        ConstructionError::NoInput {
            type_name: self.kind.name.to_string(),
        }
    }

    // steps 1 through 5
    fn prepare(&self, raw: Value, mode: Mode) -> Result<Context, ConstructionError> {
        if raw.is_null() {
            return Err(self.no_input());
        }
        let mut ctx = Context::seed(raw);
        let derived = parse::apply(&mut ctx, &self.kind.pre_parsers)?;
        for (name, instance) in compose::build(&derived, &self.kind.composites, mode)? {
            ctx.adopt(&name, instance);
        }
        Ok(ctx)
    }

    fn build(&self, raw: Value, mode: Mode) -> Result<Instance, ConstructionError> {
        if raw.is_null() {
            return Err(self.no_input());
        }
        let key = self.kind.store.key_of(&raw);
        if mode == Mode::Canonical {
            if let Some(kept) = self.kind.store.lookup_key(self.kind.key, &key) {
                debug!(type_name = %self.kind.name, key = %key, "reusing canonical instance");
                return Ok(kept);
            }
        }
        // shared values stay staged until the instance is complete
        let staging = self.kind.store.stage();
        let interner: &dyn Interner = match mode {
            Mode::Canonical => &staging,
            Mode::Detached => &Detached,
        };
        let mut ctx = self.prepare(raw, mode)?;
        if !self.kind.validate.validate(&ctx) {
            return Err(ConstructionError::ValidationFailed {
                type_name: self.kind.name.to_string(),
            });
        }
        ctx.share_original(interner);
        ctx.flatten();
        freeze(&mut ctx.fields, interner);
        parse::apply(&mut ctx, &self.kind.post_parsers)?;
        freeze(&mut ctx.fields, interner);
        let instance = Instance::new(
            self.kind.key,
            Arc::clone(&self.kind.name),
            key,
            publish(ctx.fields, interner),
        );
        match mode {
            Mode::Canonical => {
                staging.commit();
                let (kept, previously_kept) =
                    self.kind.store.keep_instance(self.kind.key, key, instance);
                if previously_kept {
                    debug!(
                        type_name = %self.kind.name,
                        key = %key,
                        "discarding duplicate of a canonical instance"
                    );
                } else {
                    debug!(type_name = %self.kind.name, key = %key, "published canonical instance");
                }
                Ok(kept)
            }
            Mode::Detached => Ok(instance),
        }
    }
}

impl Composable for ValueObjectType {
    fn type_key(&self) -> TypeKey {
        self.kind.key
    }
    fn type_name(&self) -> &str {
        &self.kind.name
    }
    fn compose(&self, raw: Value, mode: Mode) -> Result<Instance, ConstructionError> {
        self.build(raw, mode)
    }
}

impl fmt::Debug for ValueObjectType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ValueObjectType")
            .field("name", &self.kind.name)
            .field("key", &self.kind.key)
            .field("pre_parsers", &self.kind.pre_parsers.len())
            .field("composites", &self.kind.composites.len())
            .field("post_parsers", &self.kind.post_parsers.len())
            .finish()
    }
}
