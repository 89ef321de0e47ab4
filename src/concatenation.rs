//! Concatenation of sibling symbols into a single vector (or sparse matrix).
//!
//! All concatenations share one algorithm: merge the children's domains, evaluate the children
//! and combine their values. What differs between the kinds is how values are combined, how
//! Jacobians are formed and how the node simplifies, which is captured by
//! [`ConcatenationKind`].
use crate::domain::{merge_auxiliary_domains, merge_domains, AuxiliaryDomains};
use crate::error::{Error, Result};
use crate::state_vector::StateVector;
use crate::symbol::{Symbol, SymbolKind};
use crate::value::Value;
use nalgebra::DVector;
use std::sync::Arc;

mod domain;
mod flat;
mod matrix_stack;

pub use domain::{DomainConcatenation, DomainLayout, DomainSlices};
pub use flat::FlatConcatenation;
pub use matrix_stack::MatrixStack;

#[derive(Debug, Clone)]
pub enum ConcatenationKind {
    /// Generic concatenation, combining children flatly.
    Plain { check_domain: bool },
    /// Domain-agnostic flat concatenation of vectors.
    Flat,
    /// Scatter of per-domain child vectors into the ordering prescribed by a mesh.
    Domain(Arc<DomainLayout>),
    /// Vertical stack of sparse matrices.
    MatrixStack,
}

/// An ordered list of children together with the way they are combined.
#[derive(Debug, Clone)]
pub struct Concatenation {
    children: Vec<Symbol>,
    kind: ConcatenationKind,
}

impl Concatenation {
    /// Creates a plain concatenation.
    ///
    /// With `check_domain`, the children must live on pairwise disjoint domains and have
    /// compatible auxiliary domains, and the concatenation lives on the union of their domains.
    /// Otherwise the concatenation has no domain.
    pub fn new(children: Vec<Symbol>, check_domain: bool) -> Result<Symbol> {
        build_concatenation(
            "concatenation",
            children,
            check_domain,
            ConcatenationKind::Plain { check_domain },
        )
    }

    pub fn children(&self) -> &[Symbol] {
        &self.children
    }

    pub fn kind(&self) -> &ConcatenationKind {
        &self.kind
    }

    /// The slice layout, if this is a domain concatenation.
    pub fn domain_layout(&self) -> Option<&DomainLayout> {
        match &self.kind {
            ConcatenationKind::Domain(layout) => Some(layout.as_ref()),
            _ => None,
        }
    }

    /// Combines the values of the children. No children combine to an empty vector.
    pub(crate) fn combine(&self, children_eval: Vec<Value>) -> Result<Value> {
        if children_eval.is_empty() {
            return Ok(Value::empty());
        }
        match &self.kind {
            ConcatenationKind::Plain { .. } | ConcatenationKind::Flat => concatenate_flat(children_eval),
            ConcatenationKind::Domain(layout) => layout.scatter(children_eval),
            ConcatenationKind::MatrixStack => matrix_stack::stack(children_eval),
        }
    }

    pub(crate) fn jac(&self, variable: &StateVector) -> Result<Symbol> {
        match &self.kind {
            ConcatenationKind::Flat => flat::jac(&self.children, variable),
            ConcatenationKind::Domain(layout) => domain::jac(&self.children, layout, variable),
            ConcatenationKind::Plain { .. } => Err(Error::UnsupportedOperation(
                "Jacobian of a plain concatenation; use a flat or domain concatenation".to_string(),
            )),
            ConcatenationKind::MatrixStack => Err(Error::UnsupportedOperation(
                "Jacobian of a matrix stack".to_string(),
            )),
        }
    }

    /// Rebuilds a concatenation of the same kind over new children.
    pub(crate) fn new_copy_with(&self, children: Vec<Symbol>) -> Result<Symbol> {
        match &self.kind {
            ConcatenationKind::Plain { check_domain } => Concatenation::new(children, *check_domain),
            ConcatenationKind::Flat => FlatConcatenation::new(children),
            ConcatenationKind::Domain(layout) => DomainConcatenation::from_layout(children, Arc::clone(layout)),
            ConcatenationKind::MatrixStack => MatrixStack::new(children),
        }
    }

    /// Simplified concatenation over already simplified children.
    pub(crate) fn simplify_with(&self, children: Vec<Symbol>) -> Result<Symbol> {
        match &self.kind {
            ConcatenationKind::Flat => flat::simplify(children),
            ConcatenationKind::Domain(layout) => domain::simplify(children, layout),
            ConcatenationKind::Plain { .. } | ConcatenationKind::MatrixStack => {
                Ok(self.new_copy_with(children)?.with_domain(Vec::<String>::new()))
            }
        }
    }
}

fn build_concatenation(
    name: &str,
    children: Vec<Symbol>,
    check_domain: bool,
    kind: ConcatenationKind,
) -> Result<Symbol> {
    let (domain, auxiliary_domains) = if check_domain {
        (merge_domains(&children)?, merge_auxiliary_domains(&children)?)
    } else {
        (Vec::new(), AuxiliaryDomains::new())
    };
    Ok(Symbol::from_parts(
        name,
        domain,
        auxiliary_domains,
        SymbolKind::Concatenation(Concatenation { children, kind }),
    ))
}

fn concatenate_flat(children_eval: Vec<Value>) -> Result<Value> {
    let mut entries = Vec::with_capacity(children_eval.iter().map(Value::nrows).sum());
    for value in children_eval {
        match value {
            Value::Scalar(s) => entries.push(s),
            Value::Vector(v) => entries.extend(v.iter()),
            Value::Matrix(_) => {
                return Err(Error::UnsupportedOperation(
                    "flat concatenation of sparse matrices; use a matrix stack".to_string(),
                ))
            }
        }
    }
    Ok(Value::Vector(DVector::from_vec(entries)))
}
