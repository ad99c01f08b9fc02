//! Generic reconciliation engine
//!
//! Expands resource builders across named variants, then converges the
//! resulting objects one by one through a [`Converge`] adapter. Both the
//! typed and the dynamic pass share a single fail-fast loop ([`run_pass`]).

mod dynamic;
mod expand;
mod identity;
mod pass;
mod resource_set;

pub use dynamic::{
    BoundDynamic, DesiredState, DesiredStateFn, DynamicResource, DynamicResourceWithDesiredState,
};
pub use expand::{expand, Pending, ResourceBuilder, Variant};
pub use identity::{Identify, ResourceRef};
pub use pass::{reconcile_all, reconcile_dynamic, run_pass, Converge, Outcome, Pass, PassSummary};
pub use resource_set::{select_enabled, Gated, ResourceSet};
