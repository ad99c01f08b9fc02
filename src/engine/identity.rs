use std::fmt;

/// Enough of an object's identity for an operator to find it in the cluster.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceRef {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceRef {
    /// `apps/v1`, or just `v1` for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {} {}/{}", self.kind, self.api_version(), ns, self.name),
            None => write!(f, "{} {} {}", self.kind, self.api_version(), self.name),
        }
    }
}

/// Anything a pass can report on when convergence fails.
pub trait Identify {
    fn resource_ref(&self) -> ResourceRef;
}
