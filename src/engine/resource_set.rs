//! Declarative selection of the variants, builders and dynamic resources
//! taking part in one run.

use std::collections::BTreeSet;

use super::dynamic::DynamicResourceWithDesiredState;
use super::expand::{expand, Pending, ResourceBuilder, Variant};
use crate::error::{Error, Result};

/// An item participating in a run only when its flag is set.
#[derive(Clone, Debug)]
pub struct Gated<T> {
    pub enabled: bool,
    pub item: T,
}

impl<T> Gated<T> {
    pub fn new(enabled: bool, item: T) -> Self {
        Self { enabled, item }
    }

    pub fn always(item: T) -> Self {
        Self::new(true, item)
    }
}

/// Keep enabled items, preserving declaration order.
pub fn select_enabled<T>(items: impl IntoIterator<Item = Gated<T>>) -> Vec<T> {
    items
        .into_iter()
        .filter(|g| g.enabled)
        .map(|g| g.item)
        .collect()
}

/// Everything one reconciliation run will touch.
#[derive(Debug)]
pub struct ResourceSet<R> {
    variants: Vec<Variant>,
    builders: Vec<ResourceBuilder<R>>,
    dynamic: Vec<DynamicResourceWithDesiredState>,
}

impl<R: 'static> ResourceSet<R> {
    /// Rejects duplicate variant names and variants with nothing to build.
    pub fn new(
        variants: Vec<Variant>,
        builders: Vec<ResourceBuilder<R>>,
        dynamic: Vec<DynamicResourceWithDesiredState>,
    ) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for variant in &variants {
            if !seen.insert(variant.as_str()) {
                return Err(Error::ConfigError(format!(
                    "variant {variant} is configured more than once"
                )));
            }
        }

        if !variants.is_empty() && builders.is_empty() {
            return Err(Error::ConfigError(format!(
                "no resource builders configured for variants [{}]",
                variants
                    .iter()
                    .map(Variant::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        Ok(Self {
            variants,
            builders,
            dynamic,
        })
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn builders(&self) -> &[ResourceBuilder<R>] {
        &self.builders
    }

    pub fn dynamic(&self) -> &[DynamicResourceWithDesiredState] {
        &self.dynamic
    }

    /// The typed pass input.
    pub fn expand(&self) -> Vec<Pending<R>> {
        expand(&self.variants, &self.builders)
    }
}
