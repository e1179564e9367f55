//! Ordered resource declaration graph
//!
//! The graph holds declarations in the exact order they were authored.
//! `push` rejects any declaration that references a resource not yet in
//! the graph, so a graph that builds successfully is always applicable
//! front to back.

use crate::error::{CloudError, Result};
use crate::resource::{AttrRef, ResourceDecl, ResourceKind};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Ordered set of resource declarations
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceGraph {
    decls: Vec<ResourceDecl>,

    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration, enforcing declared-before-use
    pub fn push(&mut self, decl: ResourceDecl) -> Result<()> {
        if self.index.contains_key(&decl.name) {
            return Err(CloudError::DuplicateResource(decl.name.clone()));
        }

        for referenced in decl.references() {
            if !self.index.contains_key(referenced) {
                return Err(CloudError::UndeclaredReference {
                    resource: decl.name.clone(),
                    referenced: referenced.to_string(),
                });
            }
        }

        tracing::debug!("Declared {} {}", decl.kind, decl.name);
        self.index.insert(decl.name.clone(), self.decls.len());
        self.decls.push(decl);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ResourceDecl> {
        self.index.get(name).map(|i| &self.decls[*i])
    }

    /// Iterate declarations in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ResourceDecl> {
        self.decls.iter()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn count_kind(&self, kind: ResourceKind) -> usize {
        self.decls.iter().filter(|d| d.kind == kind).count()
    }

    pub fn by_kind(&self, kind: ResourceKind) -> Vec<&ResourceDecl> {
        self.decls.iter().filter(|d| d.kind == kind).collect()
    }
}

/// Attribute values recorded while applying a graph
///
/// Keyed by declaration name; every applied resource records at least
/// its `id` attribute.
#[derive(Debug, Clone, Default)]
pub struct Outputs {
    values: HashMap<String, BTreeMap<String, String>>,
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        resource: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.values
            .entry(resource.into())
            .or_default()
            .insert(attribute.into(), value.into());
    }

    pub fn get(&self, resource: &str, attribute: &str) -> Option<&str> {
        self.values
            .get(resource)
            .and_then(|attrs| attrs.get(attribute))
            .map(|s| s.as_str())
    }

    /// Resolve a reference against recorded outputs
    pub fn resolve(&self, attr_ref: &AttrRef) -> Result<String> {
        self.get(&attr_ref.resource, &attr_ref.attribute)
            .map(|s| s.to_string())
            .ok_or_else(|| CloudError::UnresolvedReference {
                resource: attr_ref.resource.clone(),
                attribute: attr_ref.attribute.clone(),
            })
    }
}
