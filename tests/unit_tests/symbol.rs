use crate::{dense_jacobian, index_vector, state_vector};
use discretise::nalgebra::{DMatrix, DVector};
use discretise::nalgebra_sparse::CsrMatrix;
use discretise::{Error, Symbol, SymbolKind, Value};
use matrixcompare::assert_matrix_eq;
use std::collections::BTreeMap;

#[test]
fn time_evaluates_to_t() -> eyre::Result<()> {
    let t = Symbol::time();
    assert_eq!(t.evaluate(Some(2.5), None)?, Value::Scalar(2.5));
    assert!(matches!(t.evaluate(None, None), Err(Error::InvalidArgument(_))));
    assert!(t.evaluates_to_number()?);
    Ok(())
}

#[test]
fn multiplication_broadcasts_single_entries() -> eyre::Result<()> {
    let y = index_vector(4);
    let product = Symbol::multiply(Symbol::scalar(2.0), state_vector(1..4))?;
    assert_eq!(
        product.evaluate(None, Some(&y))?,
        Value::Vector(DVector::from_vec(vec![2.0, 4.0, 6.0]))
    );

    let product = Symbol::multiply(state_vector(1..4), Symbol::vector(DVector::from_vec(vec![3.0])))?;
    assert_eq!(
        product.evaluate(None, Some(&y))?,
        Value::Vector(DVector::from_vec(vec![3.0, 6.0, 9.0]))
    );

    let mismatched = Symbol::multiply(state_vector(0..2), state_vector(0..3))?;
    assert!(matches!(mismatched.evaluate(None, Some(&y)), Err(Error::SizeMismatch(_))));
    Ok(())
}

#[test]
fn multiplication_takes_domain_of_operands() -> eyre::Result<()> {
    let a = state_vector(0..2).with_domain(["negative electrode"]);
    let b = state_vector(2..4).with_domain(["separator"]);

    let product = Symbol::multiply(Symbol::scalar(2.0), a.clone())?;
    assert_eq!(product.domain(), ["negative electrode".to_string()]);
    assert!(matches!(Symbol::multiply(a, b), Err(Error::DomainConflict(_))));
    Ok(())
}

#[test]
fn multiplication_merges_auxiliary_domains() -> eyre::Result<()> {
    let aux = BTreeMap::from([("secondary".to_string(), vec!["current collector".to_string()])]);
    let other = BTreeMap::from([("secondary".to_string(), vec!["negative particle".to_string()])]);

    let a = state_vector(0..2).with_auxiliary_domains(aux.clone());
    let product = Symbol::multiply(a.clone(), Symbol::scalar(1.0))?;
    assert_eq!(product.auxiliary_domains(), &aux);

    let b = state_vector(0..2).with_auxiliary_domains(other);
    assert!(matches!(Symbol::multiply(a, b), Err(Error::DomainConflict(_))));
    Ok(())
}

#[test]
fn jacobian_of_product_with_constant_scales_rows() -> eyre::Result<()> {
    let variable = state_vector(0..2);
    let product = Symbol::multiply(Symbol::vector(DVector::from_vec(vec![2.0, 3.0])), state_vector(0..2))?;
    let jac = dense_jacobian(&product.jac(&variable)?)?;
    assert_matrix_eq!(jac, DMatrix::from_diagonal(&DVector::from_vec(vec![2.0, 3.0])));

    let nonlinear = Symbol::multiply(state_vector(0..2), state_vector(0..2))?;
    assert!(matches!(nonlinear.jac(&variable), Err(Error::UnsupportedOperation(_))));
    Ok(())
}

#[test]
fn jacobians_of_constants_and_time_are_zero() -> eyre::Result<()> {
    let variable = state_vector(0..3);

    let jac = dense_jacobian(&Symbol::scalar(4.0).jac(&variable)?)?;
    assert_matrix_eq!(jac, DMatrix::<f64>::zeros(1, 3));

    let jac = dense_jacobian(&Symbol::time().jac(&variable)?)?;
    assert_matrix_eq!(jac, DMatrix::<f64>::zeros(1, 3));

    let jac = dense_jacobian(&Symbol::vector(DVector::from_element(2, 1.0)).jac(&variable)?)?;
    assert_matrix_eq!(jac, DMatrix::<f64>::zeros(2, 3));

    let matrix = Symbol::matrix(CsrMatrix::identity(3));
    assert!(matches!(matrix.jac(&variable), Err(Error::UnsupportedOperation(_))));
    Ok(())
}

#[test]
fn row_slice_selects_rows_of_child() -> eyre::Result<()> {
    let y = index_vector(6);
    let slice = Symbol::row_slice(state_vector(1..6), 1..3);
    assert_eq!(
        slice.evaluate(None, Some(&y))?,
        Value::Vector(DVector::from_vec(vec![2.0, 3.0]))
    );

    let out_of_bounds = Symbol::row_slice(state_vector(1..3), 1..3);
    assert!(matches!(out_of_bounds.evaluate(None, Some(&y)), Err(Error::SizeMismatch(_))));

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(2, 6, &[
        0.0, 0.0, 1.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
    ]);
    assert_matrix_eq!(dense_jacobian(&slice.jac(&state_vector(0..6))?)?, expected);
    Ok(())
}

#[test]
fn simplify_folds_constant_products() -> eyre::Result<()> {
    let product = Symbol::multiply(Symbol::scalar(2.0), Symbol::vector(DVector::from_vec(vec![1.0, 2.0])))?;
    let simplified = product.simplify()?;
    assert!(matches!(simplified.kind(), SymbolKind::Vector(_)));
    assert_eq!(
        simplified.evaluate(None, None)?,
        Value::Vector(DVector::from_vec(vec![2.0, 4.0]))
    );

    let product = Symbol::multiply(Symbol::scalar(2.0), state_vector(0..2))?;
    assert!(matches!(product.simplify()?.kind(), SymbolKind::Multiplication(..)));
    Ok(())
}

#[test]
fn copies_and_simplifications_keep_assigned_domains() -> eyre::Result<()> {
    let aux = BTreeMap::from([("secondary".to_string(), vec!["current collector".to_string()])]);
    let product = Symbol::multiply(Symbol::scalar(2.0), state_vector(0..2))?
        .with_domain(["a"])
        .with_auxiliary_domains(aux.clone());
    let slice = Symbol::row_slice(state_vector(0..4), 1..3)
        .with_domain(["b"])
        .with_auxiliary_domains(aux.clone());

    for symbol in [product, slice] {
        let copy = symbol.new_copy()?;
        assert_eq!(copy.id(), symbol.id());
        assert_eq!(copy.domain(), symbol.domain());
        assert_eq!(copy.auxiliary_domains(), &aux);

        let simplified = symbol.simplify()?;
        assert_eq!(simplified.domain(), symbol.domain());
        assert_eq!(simplified.auxiliary_domains(), &aux);
    }

    let folded = Symbol::multiply(Symbol::scalar(2.0), Symbol::scalar(3.0))?
        .with_domain(["a"])
        .with_auxiliary_domains(aux.clone())
        .simplify()?;
    assert_eq!(folded.domain(), ["a".to_string()]);
    assert_eq!(folded.auxiliary_domains(), &aux);
    Ok(())
}
