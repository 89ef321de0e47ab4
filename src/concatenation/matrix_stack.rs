use super::{build_concatenation, ConcatenationKind};
use crate::error::Result;
use crate::symbol::Symbol;
use crate::value::Value;
use discretise_sparse::vstack;

/// Vertical stack of sparse matrices, ignoring domains.
///
/// This is how Jacobian blocks are assembled.
#[derive(Debug, Copy, Clone)]
pub struct MatrixStack;

impl MatrixStack {
    pub fn new(children: Vec<Symbol>) -> Result<Symbol> {
        build_concatenation("sparse stack", children, false, ConcatenationKind::MatrixStack)
    }
}

pub(super) fn stack(children_eval: Vec<Value>) -> Result<Value> {
    let matrices: Vec<_> = children_eval.into_iter().map(Value::into_csr).collect();
    Ok(Value::Matrix(vstack(&matrices)?))
}
