//! Leaf nodes reading slices of the external state vector `y`.
use crate::domain::AuxiliaryDomains;
use crate::error::{Error, Result};
use crate::settings::DiscretisationSettings;
use crate::symbol::{Symbol, SymbolKind};
use discretise_sparse::{index_coincidence, vstack};
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use std::ops::Range;
use std::sync::Arc;

/// Reads the entries of `y` selected by one or more half-open slices.
///
/// The selected entries are recorded in a boolean evaluation mask of length `last_point`, which
/// also determines the identity of the node: state vectors with the same name, domain and mask
/// are considered the same node, regardless of how their slices were specified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateVector {
    y_slices: Vec<Range<usize>>,
    first_point: usize,
    last_point: usize,
    evaluation_array: Arc<[bool]>,
    size: usize,
    settings: DiscretisationSettings,
}

impl StateVector {
    /// Creates an unnamed state vector on no domain.
    pub fn new(y_slices: impl IntoIterator<Item = Range<usize>>) -> Result<Symbol> {
        Self::builder(y_slices).build()
    }

    pub fn builder(y_slices: impl IntoIterator<Item = Range<usize>>) -> StateVectorBuilder {
        StateVectorBuilder {
            y_slices: y_slices.into_iter().collect(),
            name: None,
            domain: Vec::new(),
            auxiliary_domains: AuxiliaryDomains::new(),
            evaluation_array: None,
            settings: DiscretisationSettings::default(),
        }
    }

    pub fn y_slices(&self) -> &[Range<usize>] {
        &self.y_slices
    }

    /// Start of the first slice.
    pub fn first_point(&self) -> usize {
        self.first_point
    }

    /// End of the last slice.
    pub fn last_point(&self) -> usize {
        self.last_point
    }

    pub fn evaluation_array(&self) -> &[bool] {
        &self.evaluation_array
    }

    /// Number of entries read from `y`.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn settings(&self) -> &DiscretisationSettings {
        &self.settings
    }

    /// Selects the masked entries of `y`, in index order.
    pub fn evaluate(&self, y: Option<&DVector<f64>>) -> Result<DVector<f64>> {
        let y = y.ok_or_else(|| Error::InvalidArgument("a state vector cannot be evaluated without y".to_string()))?;
        if y.len() < self.evaluation_array.len() {
            return Err(Error::SizeMismatch(format!(
                "y has length {}, but the state vector reads up to index {}",
                y.len(),
                self.evaluation_array.len()
            )));
        }
        let selected = y
            .iter()
            .zip(self.evaluation_array.iter())
            .filter(|(_, selected)| **selected)
            .map(|(value, _)| *value);
        Ok(DVector::from_iterator(self.size, selected))
    }

    pub fn evaluate_for_shape(&self) -> DVector<f64> {
        DVector::from_element(self.size, f64::NAN)
    }

    /// Derivative with respect to the single-slice state vector `variable`.
    ///
    /// Each slice of `self` contributes a block with ones where it reads the same global index as
    /// `variable`. The blocks are stacked in slice order.
    pub fn jac(&self, variable: &StateVector) -> Result<CsrMatrix<f64>> {
        if variable.y_slices.len() != 1 {
            return Err(Error::UnsupportedOperation(
                "Jacobian only implemented for a single-slice state vector".to_string(),
            ));
        }
        let variable_indices = variable.first_point..variable.last_point;
        let blocks: Vec<CsrMatrix<f64>> = self
            .y_slices
            .iter()
            .map(|y_slice| index_coincidence(y_slice.clone(), variable_indices.clone()))
            .collect();
        Ok(vstack(&blocks)?)
    }

    /// Copy of `symbol` (which must wrap `self`) that reuses the evaluation mask.
    pub(crate) fn new_copy(&self, symbol: &Symbol) -> Result<Symbol> {
        Self::builder(self.y_slices.iter().cloned())
            .with_name(symbol.name())
            .with_domain(symbol.domain().iter().cloned())
            .with_auxiliary_domains(symbol.auxiliary_domains().clone())
            .with_evaluation_array(self.evaluation_array.clone())
            .with_settings(self.settings)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct StateVectorBuilder {
    y_slices: Vec<Range<usize>>,
    name: Option<String>,
    domain: Vec<String>,
    auxiliary_domains: AuxiliaryDomains,
    evaluation_array: Option<Arc<[bool]>>,
    settings: DiscretisationSettings,
}

impl StateVectorBuilder {
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    pub fn with_domain<S: Into<String>>(self, domain: impl IntoIterator<Item = S>) -> Self {
        Self {
            domain: domain.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    pub fn with_auxiliary_domains(self, auxiliary_domains: AuxiliaryDomains) -> Self {
        Self {
            auxiliary_domains,
            ..self
        }
    }

    /// Supplies a precomputed evaluation mask.
    ///
    /// The mask is trusted as is, unless the settings enable debug mode, in which case it is
    /// recomputed from the slices.
    pub fn with_evaluation_array(self, evaluation_array: impl Into<Arc<[bool]>>) -> Self {
        Self {
            evaluation_array: Some(evaluation_array.into()),
            ..self
        }
    }

    pub fn with_settings(self, settings: DiscretisationSettings) -> Self {
        Self { settings, ..self }
    }

    pub fn build(self) -> Result<Symbol> {
        let (first, last) = match (self.y_slices.first(), self.y_slices.last()) {
            (Some(first), Some(last)) => (first.clone(), last.clone()),
            _ => {
                return Err(Error::InvalidArgument(
                    "a state vector needs at least one slice".to_string(),
                ))
            }
        };
        if let Some(bad) = self.y_slices.iter().find(|s| s.start > s.end) {
            return Err(Error::InvalidArgument(format!(
                "slice {}:{} has a start past its end",
                bad.start, bad.end
            )));
        }

        let evaluation_array = match self.evaluation_array {
            Some(array) if !self.settings.debug_mode => array,
            _ => compute_evaluation_array(&self.y_slices, last.end),
        };
        let size = evaluation_array.iter().filter(|&&selected| selected).count();
        let name = self.name.unwrap_or_else(|| default_name(&self.y_slices));

        let state_vector = StateVector {
            y_slices: self.y_slices,
            first_point: first.start,
            last_point: last.end,
            evaluation_array,
            size,
            settings: self.settings,
        };
        Ok(Symbol::from_parts(
            name,
            self.domain,
            self.auxiliary_domains,
            SymbolKind::StateVector(state_vector),
        ))
    }
}

/// Marks every index covered by a slice. Indices at or past `len` are not representable in the
/// mask and are ignored.
fn compute_evaluation_array(y_slices: &[Range<usize>], len: usize) -> Arc<[bool]> {
    let mut array = vec![false; len];
    for y_slice in y_slices {
        for selected in array.iter_mut().take(y_slice.end).skip(y_slice.start) {
            *selected = true;
        }
    }
    array.into()
}

fn default_name(y_slices: &[Range<usize>]) -> String {
    let fmt = |s: &Range<usize>| format!("{}:{}", s.start, s.end);
    match y_slices {
        [] => "y[]".to_string(),
        [only] => format!("y[{}]", fmt(only)),
        [first, second] => format!("y[{},{}]", fmt(first), fmt(second)),
        [first, second, .., last] => format!("y[{},{},...,{}]", fmt(first), fmt(second), fmt(last)),
    }
}
