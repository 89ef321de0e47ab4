use super::{Concatenation, ConcatenationKind, MatrixStack};
use crate::domain::{merge_auxiliary_domains, merge_domains, sort_by_domain_order};
use crate::error::{Error, Result};
use crate::mesh::{self, MeshTopology};
use crate::state_vector::StateVector;
use crate::symbol::{Symbol, SymbolKind};
use crate::value::Value;
use itertools::izip;
use log::debug;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;

/// Ordered map from domain to one slice per secondary index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSlices {
    entries: Vec<(String, Vec<Range<usize>>)>,
}

impl DomainSlices {
    pub fn get(&self, domain: &str) -> Option<&[Range<usize>]> {
        self.entries
            .iter()
            .find(|(d, _)| d == domain)
            .map(|(_, slices)| slices.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Range<usize>])> {
        self.entries
            .iter()
            .map(|(domain, slices)| (domain.as_str(), slices.as_slice()))
    }

    /// Number of domains.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, domain: &str, slice: Range<usize>) {
        match self.entries.iter_mut().find(|(d, _)| d == domain) {
            Some((_, slices)) => slices.push(slice),
            None => self.entries.push((domain.to_string(), vec![slice])),
        }
    }
}

/// Slice bookkeeping of a domain concatenation.
///
/// A layout depends only on the mesh and on the domains of the concatenation and its children,
/// so it can be shared between concatenations that only differ in their children.
#[derive(Debug)]
pub struct DomainLayout {
    mesh: Arc<dyn MeshTopology>,
    secondary_dimensions_npts: usize,
    size: usize,
    slices: DomainSlices,
    children_slices: Vec<DomainSlices>,
}

impl DomainLayout {
    fn new(mesh: Arc<dyn MeshTopology>, domain: &[String], children: &[Symbol]) -> Result<Self> {
        let first_domain = domain.first().ok_or_else(|| {
            Error::DomainConflict(
                "domain cannot be empty for a domain concatenation. \
                 Perhaps the children should have been broadcast first?"
                    .to_string(),
            )
        })?;
        let secondary_dimensions_npts = mesh::num_submeshes(mesh.as_ref(), first_domain)?;
        let (slices, size) = create_slices(mesh.as_ref(), domain, secondary_dimensions_npts)?;
        let children_slices = children
            .iter()
            .map(|child| {
                if child.domain().is_empty() {
                    return Err(Error::DomainConflict(format!(
                        "every child of a domain concatenation needs a domain, but `{}` has none",
                        child.name()
                    )));
                }
                create_slices(mesh.as_ref(), child.domain(), secondary_dimensions_npts).map(|(slices, _)| slices)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            mesh,
            secondary_dimensions_npts,
            size,
            slices,
            children_slices,
        })
    }

    pub fn mesh(&self) -> &dyn MeshTopology {
        self.mesh.as_ref()
    }

    /// Number of times every per-domain block is repeated.
    pub fn secondary_dimensions_npts(&self) -> usize {
        self.secondary_dimensions_npts
    }

    /// Length of the concatenated vector.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Output slices of every domain of the concatenation.
    pub fn slices(&self) -> &DomainSlices {
        &self.slices
    }

    /// Slices of every child, addressing the child's own vector.
    pub fn children_slices(&self) -> &[DomainSlices] {
        &self.children_slices
    }

    /// Copies every per-domain block of every child vector into its place in the output.
    pub(crate) fn scatter(&self, children_eval: Vec<Value>) -> Result<Value> {
        let vectors = children_eval
            .into_iter()
            .map(Value::into_vector)
            .collect::<Result<Vec<_>>>()?;
        let output = self.scatter_into(DVector::zeros(self.size), &vectors)?;
        Ok(Value::Vector(output))
    }

    fn scatter_into<T: nalgebra::Scalar + Copy>(
        &self,
        mut output: DVector<T>,
        children: &[DVector<T>],
    ) -> Result<DVector<T>> {
        if children.len() != self.children_slices.len() {
            return Err(Error::SizeMismatch(format!(
                "domain concatenation has slices for {} children, but got {}",
                self.children_slices.len(),
                children.len()
            )));
        }
        for (child, child_slices) in izip!(children, &self.children_slices) {
            for (domain, local_slices) in child_slices.iter() {
                let global_slices = self
                    .slices
                    .get(domain)
                    .ok_or_else(|| Error::UnknownDomain(domain.to_string()))?;
                for (local, global) in izip!(local_slices, global_slices) {
                    if local.len() != global.len() || local.end > child.len() || global.end > output.len() {
                        return Err(Error::SizeMismatch(format!(
                            "cannot copy rows {:?} of a vector of length {} into rows {:?} of domain `{}`",
                            local,
                            child.len(),
                            global,
                            domain
                        )));
                    }
                    output
                        .rows_mut(global.start, global.len())
                        .copy_from(&child.rows(local.start, local.len()));
                }
            }
        }
        Ok(output)
    }
}

/// Lays out the domains one block per submesh, with the secondary index as the outer loop.
///
/// Returns the slices and the total length.
fn create_slices(
    mesh: &dyn MeshTopology,
    domain: &[String],
    secondary_dimensions_npts: usize,
) -> Result<(DomainSlices, usize)> {
    if let Some(first_domain) = domain.first() {
        let second_pts = mesh::num_submeshes(mesh, first_domain)?;
        if second_pts != secondary_dimensions_npts {
            return Err(Error::SizeMismatch(format!(
                "concatenation and children must have the same number of points in secondary \
                 dimensions, but `{}` has {} instead of {}",
                first_domain, second_pts, secondary_dimensions_npts
            )));
        }
    }

    let mut slices = DomainSlices::default();
    let mut end = 0;
    for i in 0..secondary_dimensions_npts {
        for d in domain {
            let start = end;
            end += mesh::npts(mesh, d, i)?;
            slices.push(d, start..end);
        }
    }
    Ok((slices, end))
}

/// Concatenation of symbols on disjoint domains, ordered and sized according to a mesh.
#[derive(Debug, Copy, Clone)]
pub struct DomainConcatenation;

impl DomainConcatenation {
    /// Creates a domain concatenation, computing its slice layout from the mesh.
    ///
    /// Every child must have a domain, and every child must have the same number of secondary
    /// points as the concatenation.
    pub fn new(children: Vec<Symbol>, mesh: Arc<dyn MeshTopology>) -> Result<Symbol> {
        let domain = sorted_domain(&children, mesh.as_ref())?;
        let layout = DomainLayout::new(mesh, &domain, &children)?;
        debug!(
            "Built domain concatenation layout over {:?}: size {}, {} secondary points",
            domain, layout.size, layout.secondary_dimensions_npts
        );
        build(children, domain, Arc::new(layout))
    }

    /// Creates a domain concatenation of new children reusing an existing slice layout.
    ///
    /// The children must have the same domains as those the layout was computed for.
    pub fn from_layout(children: Vec<Symbol>, layout: Arc<DomainLayout>) -> Result<Symbol> {
        if children.len() != layout.children_slices.len() {
            return Err(Error::SizeMismatch(format!(
                "layout was computed for {} children, but got {}",
                layout.children_slices.len(),
                children.len()
            )));
        }
        let domain = sorted_domain(&children, layout.mesh())?;
        build(children, domain, layout)
    }
}

fn sorted_domain(children: &[Symbol], mesh: &dyn MeshTopology) -> Result<Vec<String>> {
    let mut domain = merge_domains(children)?;
    sort_by_domain_order(&mut domain, mesh.domain_order())?;
    Ok(domain)
}

fn build(children: Vec<Symbol>, domain: Vec<String>, layout: Arc<DomainLayout>) -> Result<Symbol> {
    let auxiliary_domains = merge_auxiliary_domains(&children)?;
    Ok(Symbol::from_parts(
        "domain concatenation",
        domain,
        auxiliary_domains,
        SymbolKind::Concatenation(Concatenation {
            children,
            kind: ConcatenationKind::Domain(layout),
        }),
    ))
}

/// Stacks the children's Jacobians restricted to each secondary point, secondary index first.
pub(super) fn jac(children: &[Symbol], layout: &DomainLayout, variable: &StateVector) -> Result<Symbol> {
    let mut child_jacs = Vec::with_capacity(children.len());
    for (child, child_slices) in izip!(children, &layout.children_slices) {
        let local_slices = match child_slices.iter().collect::<Vec<_>>().as_slice() {
            [(_, local_slices)] => *local_slices,
            _ => {
                return Err(Error::UnsupportedOperation(
                    "Jacobian only implemented for when each child has a single domain".to_string(),
                ))
            }
        };
        child_jacs.push((child.jac_state_vector(variable)?, local_slices));
    }

    let mut jacs = Vec::with_capacity(layout.secondary_dimensions_npts * children.len());
    for i in 0..layout.secondary_dimensions_npts {
        for (child_jac, local_slices) in &child_jacs {
            jacs.push(Symbol::row_slice(child_jac.clone(), local_slices[i].clone()));
        }
    }
    MatrixStack::new(jacs)
}

/// Collapses a concatenation of state vectors that together read one contiguous range of `y`,
/// in order, into a single state vector.
pub(super) fn simplify(children: Vec<Symbol>, layout: &Arc<DomainLayout>) -> Result<Symbol> {
    let state_vectors: Option<Vec<&StateVector>> = children.iter().map(Symbol::as_state_vector).collect();
    if let Some(state_vectors) = state_vectors {
        if let Some(range) = contiguous_read(&state_vectors, layout) {
            debug!("Collapsing domain concatenation of {} state vectors into y[{:?}]", children.len(), range);
            let settings = *state_vectors[0].settings();
            return StateVector::builder([range]).with_settings(settings).build();
        }
    }
    Ok(DomainConcatenation::from_layout(children, Arc::clone(layout))?.with_domain(Vec::<String>::new()))
}

/// The range of `y` read by the concatenation, if it is exactly `0..n` in output order.
///
/// The masks must partition `0..n` and the scattered read indices must be increasing.
fn contiguous_read(state_vectors: &[&StateVector], layout: &DomainLayout) -> Option<Range<usize>> {
    let len = state_vectors
        .iter()
        .map(|sv| sv.evaluation_array().len())
        .max()?;
    let mut coverage = vec![0usize; len];
    for sv in state_vectors {
        for (count, &selected) in coverage.iter_mut().zip(sv.evaluation_array()) {
            if selected {
                *count += 1;
            }
        }
    }
    if len == 0 || coverage.iter().any(|&count| count != 1) {
        return None;
    }

    let read_indices: Vec<DVector<usize>> = state_vectors
        .iter()
        .map(|sv| {
            let indices = sv
                .evaluation_array()
                .iter()
                .enumerate()
                .filter(|(_, selected)| **selected)
                .map(|(index, _)| index);
            DVector::from_iterator(sv.size(), indices)
        })
        .collect();
    let scattered = layout
        .scatter_into(DVector::from_element(layout.size, usize::MAX), &read_indices)
        .ok()?;
    let in_order = scattered.len() == len && scattered.iter().enumerate().all(|(i, &index)| i == index);
    in_order.then(|| 0..len)
}
