//! Kubernetes-facing collaborators of the reconciliation engine: the object
//! model for typed resources and the convergence primitives.

mod converge;
pub mod matcher;
mod object;
mod recording;

pub use converge::{KubeConverger, FIELD_MANAGER};
pub use object::{typed_ref, ManagedObject};
pub use recording::{RecordingStore, Write};
