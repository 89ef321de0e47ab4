use super::{build_concatenation, ConcatenationKind, MatrixStack};
use crate::error::Result;
use crate::state_vector::StateVector;
use crate::symbol::Symbol;
use nalgebra::DVector;

/// Concatenation of equations that do not care about domains.
///
/// Used where an equation legitimately spans several domains. Whenever the layout of the
/// result must follow a mesh, use [`DomainConcatenation`](super::DomainConcatenation) instead.
#[derive(Debug, Copy, Clone)]
pub struct FlatConcatenation;

impl FlatConcatenation {
    /// Creates a flat concatenation of the children.
    ///
    /// Children that evaluate to a number are multiplied by a vector of length one, so that every
    /// child evaluates to a vector.
    pub fn new(children: Vec<Symbol>) -> Result<Symbol> {
        let children = children
            .into_iter()
            .map(|child| {
                if child.evaluates_to_number()? {
                    Symbol::multiply(child, Symbol::vector(DVector::from_element(1, 1.0)))
                } else {
                    Ok(child)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        build_concatenation("flat concatenation", children, false, ConcatenationKind::Flat)
    }
}

/// Vertical stack of the children's Jacobians.
pub(super) fn jac(children: &[Symbol], variable: &StateVector) -> Result<Symbol> {
    if children.is_empty() {
        return Ok(Symbol::scalar(0.0));
    }
    let jacs = children
        .iter()
        .map(|child| child.jac_state_vector(variable))
        .collect::<Result<Vec<_>>>()?;
    MatrixStack::new(jacs)
}

/// Splices the children of nested flat concatenations into a single flat concatenation.
pub(super) fn simplify(children: Vec<Symbol>) -> Result<Symbol> {
    let mut new_children = Vec::with_capacity(children.len());
    for child in children {
        if let Some(nested) = child
            .as_concatenation()
            .filter(|c| matches!(c.kind(), ConcatenationKind::Flat))
        {
            new_children.extend(nested.children().iter().cloned());
            continue;
        }
        new_children.push(child);
    }
    Ok(FlatConcatenation::new(new_children)?.with_domain(Vec::<String>::new()))
}
