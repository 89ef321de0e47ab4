//! The mesh interface consumed by domain-aware concatenations.
//!
//! Mesh construction itself happens elsewhere; all a concatenation needs to know is the
//! canonical ordering of domains and the number of points in every submesh.
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Query interface of a discretisation mesh.
///
/// Every domain consists of one or more submeshes, one per secondary index (for example one per
/// current collector point).
pub trait MeshTopology: Debug + Send + Sync {
    /// All domains known to the mesh, in canonical order.
    fn domain_order(&self) -> &[String];

    /// Number of submeshes (secondary points) of the domain.
    fn num_submeshes(&self, domain: &str) -> Option<usize>;

    /// Number of points in the submesh of `domain` with the given secondary index.
    fn npts(&self, domain: &str, secondary_index: usize) -> Option<usize>;
}

/// Point counts of the submeshes of each domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmeshPoints {
    domain_order: Vec<String>,
    npts: Vec<Vec<usize>>,
}

impl SubmeshPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a domain with the point count of each of its submeshes.
    ///
    /// Domains are ordered canonically in the order they are added.
    pub fn with_domain(mut self, domain: impl Into<String>, npts: impl IntoIterator<Item = usize>) -> Self {
        let domain = domain.into();
        let npts: Vec<_> = npts.into_iter().collect();
        match self.domain_order.iter().position(|d| *d == domain) {
            Some(idx) => self.npts[idx] = npts,
            None => {
                self.domain_order.push(domain);
                self.npts.push(npts);
            }
        }
        self
    }

    fn domain_index(&self, domain: &str) -> Option<usize> {
        self.domain_order.iter().position(|d| d == domain)
    }
}

impl MeshTopology for SubmeshPoints {
    fn domain_order(&self) -> &[String] {
        &self.domain_order
    }

    fn num_submeshes(&self, domain: &str) -> Option<usize> {
        self.domain_index(domain).map(|idx| self.npts[idx].len())
    }

    fn npts(&self, domain: &str, secondary_index: usize) -> Option<usize> {
        self.domain_index(domain)
            .and_then(|idx| self.npts[idx].get(secondary_index))
            .copied()
    }
}

pub(crate) fn num_submeshes(mesh: &dyn MeshTopology, domain: &str) -> Result<usize> {
    mesh.num_submeshes(domain)
        .ok_or_else(|| Error::UnknownDomain(domain.to_string()))
}

pub(crate) fn npts(mesh: &dyn MeshTopology, domain: &str, secondary_index: usize) -> Result<usize> {
    mesh.npts(domain, secondary_index).ok_or_else(|| {
        Error::SizeMismatch(format!(
            "domain `{}` has no submesh with secondary index {}",
            domain, secondary_index
        ))
    })
}
