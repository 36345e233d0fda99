use crate::error::{ProcurementError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Fixed list of contracting bodies records are allowed to name.
///
/// An empty catalog places no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractingBodyCatalog {
    bodies: BTreeSet<String>,
}

impl ContractingBodyCatalog {
    pub fn new<I, S>(bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            bodies: bodies
                .into_iter()
                .map(|b| b.as_ref().trim().to_string())
                .filter(|b| !b.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn contains(&self, body: &str) -> bool {
        self.is_empty() || self.bodies.contains(body.trim())
    }

    pub fn validate(&self, body: &str) -> Result<()> {
        if self.contains(body) {
            Ok(())
        } else {
            Err(ProcurementError::UnknownContractingBody(body.to_string()))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.bodies.iter().map(String::as_str)
    }
}
