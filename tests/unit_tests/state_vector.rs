use crate::{dense_jacobian, index_vector, state_vector};
use discretise::nalgebra::{DMatrix, DVector};
use discretise::{DiscretisationSettings, Error, StateVector, Value};
use discretise::proptest::disjoint_slices;
use matrixcompare::assert_matrix_eq;
use proptest::prelude::*;

#[test]
fn state_vector_reads_single_slice() -> eyre::Result<()> {
    let sv = state_vector(2..5);
    assert_eq!(sv.name(), "y[2:5]");
    assert!(sv.domain().is_empty());

    let value = sv.evaluate(None, Some(&index_vector(10)))?;
    assert_eq!(value, Value::Vector(DVector::from_vec(vec![2.0, 3.0, 4.0])));
    assert_eq!(sv.size()?, 3);
    Ok(())
}

#[test]
fn state_vector_reads_multiple_slices_in_index_order() -> eyre::Result<()> {
    let sv = StateVector::new([0..2, 5..7])?;
    assert_eq!(sv.name(), "y[0:2,5:7]");
    let value = sv.evaluate(Some(1.0), Some(&index_vector(8)))?;
    assert_eq!(value, Value::Vector(DVector::from_vec(vec![0.0, 1.0, 5.0, 6.0])));

    let sv = StateVector::new([0..1, 2..3, 4..5])?;
    assert_eq!(sv.name(), "y[0:1,2:3,...,4:5]");
    Ok(())
}

#[test]
fn state_vector_bookkeeping() -> eyre::Result<()> {
    let symbol = StateVector::builder([1..3, 4..6])
        .with_name("c")
        .with_domain(["negative electrode"])
        .build()?;
    let sv = symbol.as_state_vector().unwrap();

    assert_eq!(symbol.name(), "c");
    assert_eq!(symbol.domain(), ["negative electrode".to_string()]);
    assert_eq!(sv.first_point(), 1);
    assert_eq!(sv.last_point(), 6);
    assert_eq!(sv.size(), 4);
    assert_eq!(sv.evaluation_array(), [false, true, true, false, true, true]);
    Ok(())
}

#[test]
fn state_vectors_with_same_mask_share_id() -> eyre::Result<()> {
    let split = StateVector::builder([0..2, 2..4]).with_name("x").build()?;
    let whole = StateVector::builder([0..4]).with_name("x").build()?;
    assert_eq!(split.id(), whole.id());

    let renamed = StateVector::builder([0..4]).with_name("z").build()?;
    assert_ne!(whole.id(), renamed.id());

    let elsewhere = StateVector::builder([0..4]).with_name("x").with_domain(["separator"]).build()?;
    assert_ne!(whole.id(), elsewhere.id());
    Ok(())
}

#[test]
#[allow(clippy::reversed_empty_ranges)]
fn state_vector_rejects_malformed_slices() {
    let no_slices: [std::ops::Range<usize>; 0] = [];
    assert!(matches!(StateVector::new(no_slices), Err(Error::InvalidArgument(_))));
    assert!(matches!(StateVector::new([3..1]), Err(Error::InvalidArgument(_))));
}

#[test]
fn state_vector_evaluation_requires_long_enough_y() {
    let sv = state_vector(2..5);
    assert!(matches!(sv.evaluate(None, None), Err(Error::InvalidArgument(_))));
    assert!(matches!(
        sv.evaluate(None, Some(&index_vector(4))),
        Err(Error::SizeMismatch(_))
    ));
}

#[test]
fn supplied_evaluation_array_is_recomputed_only_in_debug_mode() -> eyre::Result<()> {
    let stale = vec![true, false, false];

    let trusted = StateVector::builder([1..3])
        .with_evaluation_array(stale.clone())
        .build()?;
    let trusted = trusted.as_state_vector().unwrap();
    assert_eq!(trusted.evaluation_array(), [true, false, false]);
    assert_eq!(trusted.size(), 1);

    let checked = StateVector::builder([1..3])
        .with_evaluation_array(stale)
        .with_settings(DiscretisationSettings::debug())
        .build()?;
    let checked = checked.as_state_vector().unwrap();
    assert_eq!(checked.evaluation_array(), [false, true, true]);
    assert_eq!(checked.size(), 2);
    assert!(checked.settings().debug_mode);
    Ok(())
}

#[test]
fn new_copy_reuses_evaluation_array() -> eyre::Result<()> {
    let symbol = StateVector::builder([0..2])
        .with_name("T")
        .with_domain(["current collector"])
        .build()?;
    let copy = symbol.new_copy()?;
    assert_eq!(copy.id(), symbol.id());
    assert_eq!(copy.name(), "T");
    assert_eq!(copy.domain(), symbol.domain());
    assert_eq!(
        copy.as_state_vector().unwrap().evaluation_array(),
        symbol.as_state_vector().unwrap().evaluation_array()
    );
    Ok(())
}

#[test]
fn state_vector_jacobian_is_identity_on_shared_indices() -> eyre::Result<()> {
    let variable = state_vector(0..4);

    let jac = dense_jacobian(&state_vector(0..4).jac(&variable)?)?;
    assert_matrix_eq!(jac, DMatrix::<f64>::identity(4, 4));

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(2, 4, &[
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ]);
    let jac = dense_jacobian(&state_vector(2..4).jac(&variable)?)?;
    assert_matrix_eq!(jac, expected);

    let jac = dense_jacobian(&state_vector(4..6).jac(&variable)?)?;
    assert_matrix_eq!(jac, DMatrix::<f64>::zeros(2, 4));
    Ok(())
}

#[test]
fn multi_slice_state_vector_jacobian_stacks_every_slice() -> eyre::Result<()> {
    let variable = state_vector(0..4);
    let sv = StateVector::new([0..1, 3..4])?;

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(2, 4, &[
        1.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ]);
    assert_matrix_eq!(dense_jacobian(&sv.jac(&variable)?)?, expected);
    Ok(())
}

#[test]
fn jacobian_requires_single_slice_state_vector_variable() -> eyre::Result<()> {
    let sv = state_vector(0..2);
    let multi_slice = StateVector::new([0..1, 2..3])?;
    assert!(matches!(sv.jac(&multi_slice), Err(Error::UnsupportedOperation(_))));

    let time = discretise::Symbol::time();
    assert!(matches!(sv.jac(&time), Err(Error::InvalidArgument(_))));
    Ok(())
}

#[test]
fn state_vector_reads_from_given_vector() -> eyre::Result<()> {
    let sv = state_vector(0..3);
    let y = DVector::from_vec(vec![10.0, 20.0, 30.0, 40.0]);
    assert_eq!(
        sv.evaluate(None, Some(&y))?,
        Value::Vector(DVector::from_vec(vec![10.0, 20.0, 30.0]))
    );
    let short = DVector::from_vec(vec![10.0, 20.0]);
    assert!(matches!(sv.evaluate(None, Some(&short)), Err(Error::SizeMismatch(_))));
    Ok(())
}

#[test]
fn state_vector_jacobian_with_respect_to_itself_and_disjoint_slice() -> eyre::Result<()> {
    let sv = state_vector(2..5);
    assert_matrix_eq!(dense_jacobian(&sv.jac(&sv)?)?, DMatrix::<f64>::identity(3, 3));
    assert_matrix_eq!(
        dense_jacobian(&sv.jac(&state_vector(6..8))?)?,
        DMatrix::<f64>::zeros(3, 2)
    );
    Ok(())
}

proptest! {
    #[test]
    fn state_vector_selects_exactly_its_slices(slices in disjoint_slices(4, 5)) {
        let n = slices.last().map(|s| s.end).unwrap_or(0) + 1;
        let sv = StateVector::new(slices.clone()).unwrap();
        let y = index_vector(n);

        let expected: Vec<f64> = slices.iter().flat_map(|s| s.clone()).map(|i| i as f64).collect();
        prop_assert_eq!(sv.evaluate(None, Some(&y)).unwrap(), Value::Vector(DVector::from_vec(expected.clone())));

        // Every selected entry has a single unit derivative at its own index
        let jac = dense_jacobian(&sv.jac(&state_vector(0..n)).unwrap()).unwrap();
        prop_assert_eq!(jac.nrows(), expected.len());
        prop_assert_eq!(jac * &y, DVector::from_vec(expected));
    }
}
