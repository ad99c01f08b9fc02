//! Variant expansion
//!
//! A [`ResourceBuilder`] knows how to build one kind of object for any
//! variant. [`expand`] binds every builder to every variant, producing the
//! flat list of zero-argument constructors the passes walk.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Name of one member of a parameterized resource family, e.g. `ingressgateway`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variant(String);

impl Variant {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::ConfigError(
                "variant name must not be empty".to_string(),
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type BuildFn<R> = dyn Fn(&Variant) -> Result<R> + Send + Sync;

/// A named, variant-parameterized constructor for one kind of resource.
pub struct ResourceBuilder<R> {
    name: &'static str,
    build: Arc<BuildFn<R>>,
}

impl<R> Clone for ResourceBuilder<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            build: Arc::clone(&self.build),
        }
    }
}

impl<R> fmt::Debug for ResourceBuilder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceBuilder")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<R> ResourceBuilder<R> {
    pub fn new<F>(name: &'static str, build: F) -> Self
    where
        F: Fn(&Variant) -> Result<R> + Send + Sync + 'static,
    {
        Self {
            name,
            build: Arc::new(build),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn build(&self, variant: &Variant) -> Result<R> {
        (self.build)(variant)
    }
}

/// A resource that has not been constructed yet.
///
/// Constructing it has no side effects, so it may be built for inspection
/// before (or instead of) being converged.
pub struct Pending<R> {
    origin: String,
    variant: Option<Variant>,
    build: Box<dyn Fn() -> Result<R> + Send + Sync>,
}

impl<R> fmt::Debug for Pending<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("origin", &self.origin)
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}

impl<R> Pending<R> {
    pub fn new<F>(origin: impl Into<String>, build: F) -> Self
    where
        F: Fn() -> Result<R> + Send + Sync + 'static,
    {
        Self {
            origin: origin.into(),
            variant: None,
            build: Box::new(build),
        }
    }

    /// `<variant>/<builder>` for expanded items, the descriptor name otherwise
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn variant(&self) -> Option<&Variant> {
        self.variant.as_ref()
    }

    pub fn build(&self) -> Result<R> {
        (self.build)()
    }
}

/// Bind every builder to every variant.
///
/// Output is variant-major: all builders for `variants[0]` in builder order,
/// then all builders for `variants[1]`, and so on.
pub fn expand<R: 'static>(variants: &[Variant], builders: &[ResourceBuilder<R>]) -> Vec<Pending<R>> {
    let mut expanded = Vec::with_capacity(variants.len() * builders.len());

    for variant in variants {
        for builder in builders {
            let bound = variant.clone();
            let build = Arc::clone(&builder.build);
            expanded.push(Pending {
                origin: format!("{}/{}", variant, builder.name),
                variant: Some(variant.clone()),
                build: Box::new(move || build(&bound)),
            });
        }
    }

    expanded
}
