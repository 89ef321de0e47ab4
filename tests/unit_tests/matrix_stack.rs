use crate::{dense, state_vector};
use discretise::nalgebra::DMatrix;
use discretise::nalgebra_sparse::CsrMatrix;
use discretise::{Error, MatrixStack, Symbol, Value};
use matrixcompare::assert_matrix_eq;

fn sparse(dense: DMatrix<f64>) -> Symbol {
    Symbol::matrix(CsrMatrix::from(&dense))
}

#[test]
fn matrix_stack_stacks_vertically() -> eyre::Result<()> {
    let top = DMatrix::from_row_slice(1, 3, &[1.0, 0.0, 2.0]);
    let bottom = DMatrix::from_row_slice(2, 3, &[0.0, 3.0, 0.0, 4.0, 0.0, 5.0]);
    let stack = MatrixStack::new(vec![sparse(top.clone()), sparse(bottom.clone())])?;
    assert_eq!(stack.name(), "sparse stack");
    assert!(stack.domain().is_empty());

    let value = stack.evaluate(None, None)?;
    assert!(value.as_matrix().is_some());
    let mut expected = DMatrix::<f64>::zeros(3, 3);
    expected.rows_mut(0, 1).copy_from(&top);
    expected.rows_mut(1, 2).copy_from(&bottom);
    assert_matrix_eq!(dense(&value), expected);
    assert_eq!(stack.size()?, 3);
    Ok(())
}

#[test]
fn matrix_stack_ignores_domains() -> eyre::Result<()> {
    let a = sparse(DMatrix::identity(2, 2)).with_domain(["separator"]);
    let b = sparse(DMatrix::identity(2, 2)).with_domain(["separator"]);
    let stack = MatrixStack::new(vec![a, b])?;
    assert!(stack.domain().is_empty());
    assert_eq!(stack.size()?, 4);
    Ok(())
}

#[test]
fn empty_matrix_stack_is_empty() -> eyre::Result<()> {
    let stack = MatrixStack::new(Vec::new())?;
    assert_eq!(stack.evaluate(None, None)?, Value::empty());
    assert_eq!(stack.size()?, 0);
    Ok(())
}

#[test]
fn matrix_stack_rejects_mismatched_columns() -> eyre::Result<()> {
    let stack = MatrixStack::new(vec![
        sparse(DMatrix::identity(2, 2)),
        sparse(DMatrix::identity(2, 3)),
    ])?;
    assert!(matches!(stack.evaluate(None, None), Err(Error::SizeMismatch(_))));
    Ok(())
}

#[test]
fn matrix_stack_has_no_jacobian() -> eyre::Result<()> {
    let stack = MatrixStack::new(vec![sparse(DMatrix::identity(2, 2))])?;
    assert!(matches!(stack.jac(&state_vector(0..2)), Err(Error::UnsupportedOperation(_))));
    Ok(())
}
