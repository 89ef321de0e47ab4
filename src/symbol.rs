//! Expression tree nodes.
//!
//! A [`Symbol`] is a node header (name, domains and a structural id) together with a
//! [`SymbolKind`] describing what the node computes. Trees are exclusively owned: children are
//! stored by value and every copy or simplification produces a fresh tree.
use crate::concatenation::Concatenation;
use crate::domain::{merge_auxiliary_domains, AuxiliaryDomains};
use crate::error::{Error, Result};
use crate::state_vector::StateVector;
use crate::value::Value;
use log::trace;
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};
use std::mem::discriminant;
use std::ops::Range;

/// Structural identity of a symbol.
///
/// Two symbols have the same id if they have the same kind, name, domain and content. For
/// state vectors the content is the evaluation mask, so state vectors built from different
/// slices that select the same entries share an id. Compound nodes use the ids of their children.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u64);

/// Values computed during a single evaluation, keyed by symbol id.
///
/// Cached values depend on `t` and `y`, so a memo must be created for each outer evaluation and
/// never reused for another one.
#[derive(Debug, Clone, Default)]
pub struct KnownEvals {
    values: FxHashMap<SymbolId, Value>,
}

impl KnownEvals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.values.contains_key(&symbol.id())
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Value> {
        self.values.get(&symbol.id())
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    name: String,
    domain: Vec<String>,
    auxiliary_domains: AuxiliaryDomains,
    id: SymbolId,
    kind: SymbolKind,
}

#[derive(Debug, Clone)]
pub enum SymbolKind {
    Scalar(f64),
    Vector(DVector<f64>),
    Matrix(CsrMatrix<f64>),
    /// The independent time variable.
    Time,
    StateVector(StateVector),
    /// Elementwise product of two symbols.
    Multiplication(Box<Symbol>, Box<Symbol>),
    /// A contiguous range of rows of the child.
    RowSlice(Box<Symbol>, Range<usize>),
    Concatenation(Concatenation),
}

impl Symbol {
    pub(crate) fn from_parts(
        name: impl Into<String>,
        domain: Vec<String>,
        auxiliary_domains: AuxiliaryDomains,
        kind: SymbolKind,
    ) -> Self {
        let name = name.into();
        let id = compute_id(&name, &domain, &kind);
        Self {
            name,
            domain,
            auxiliary_domains,
            id,
            kind,
        }
    }

    pub fn scalar(value: f64) -> Self {
        Self::from_parts(value.to_string(), Vec::new(), AuxiliaryDomains::new(), SymbolKind::Scalar(value))
    }

    pub fn vector(value: DVector<f64>) -> Self {
        let name = format!("Column vector of length {}", value.len());
        Self::from_parts(name, Vec::new(), AuxiliaryDomains::new(), SymbolKind::Vector(value))
    }

    pub fn matrix(value: CsrMatrix<f64>) -> Self {
        let name = format!("Sparse matrix of shape ({}, {})", value.nrows(), value.ncols());
        Self::from_parts(name, Vec::new(), AuxiliaryDomains::new(), SymbolKind::Matrix(value))
    }

    pub fn time() -> Self {
        Self::from_parts("time", Vec::new(), AuxiliaryDomains::new(), SymbolKind::Time)
    }

    /// Elementwise product of `left` and `right`.
    ///
    /// The product lives on the domain of whichever operand has one. Operands on different
    /// non-empty domains are rejected.
    pub fn multiply(left: Symbol, right: Symbol) -> Result<Self> {
        let domain = match (left.domain.is_empty(), right.domain.is_empty()) {
            (true, _) => right.domain.clone(),
            (false, true) => left.domain.clone(),
            (false, false) if left.domain == right.domain => left.domain.clone(),
            (false, false) => {
                return Err(Error::DomainConflict(format!(
                    "cannot multiply symbols on domains {:?} and {:?}",
                    left.domain, right.domain
                )))
            }
        };
        let auxiliary_domains = merge_auxiliary_domains([&left, &right])?;
        Ok(Self::from_parts(
            "*",
            domain,
            auxiliary_domains,
            SymbolKind::Multiplication(Box::new(left), Box::new(right)),
        ))
    }

    pub fn row_slice(child: Symbol, rows: Range<usize>) -> Self {
        let name = format!("rows[{}:{}]", rows.start, rows.end);
        Self::from_parts(
            name,
            Vec::new(),
            AuxiliaryDomains::new(),
            SymbolKind::RowSlice(Box::new(child), rows),
        )
    }

    pub(crate) fn from_value(value: Value) -> Self {
        match value {
            Value::Scalar(s) => Self::scalar(s),
            Value::Vector(v) => Self::vector(v),
            Value::Matrix(m) => Self::matrix(m),
        }
    }

    /// Returns the same symbol placed on the given domain.
    pub fn with_domain<S: Into<String>>(self, domain: impl IntoIterator<Item = S>) -> Self {
        let domain = domain.into_iter().map(Into::into).collect();
        Self::from_parts(self.name, domain, self.auxiliary_domains, self.kind)
    }

    pub fn with_auxiliary_domains(self, auxiliary_domains: AuxiliaryDomains) -> Self {
        Self {
            auxiliary_domains,
            ..self
        }
    }

    /// Places the symbol on the domain and auxiliary domains of `other`.
    fn with_domains_of(self, other: &Symbol) -> Self {
        self.with_domain(other.domain.iter().cloned())
            .with_auxiliary_domains(other.auxiliary_domains.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    pub fn auxiliary_domains(&self) -> &AuxiliaryDomains {
        &self.auxiliary_domains
    }

    pub fn id(&self) -> SymbolId {
        self.id
    }

    pub fn kind(&self) -> &SymbolKind {
        &self.kind
    }

    pub fn as_state_vector(&self) -> Option<&StateVector> {
        match &self.kind {
            SymbolKind::StateVector(sv) => Some(sv),
            _ => None,
        }
    }

    pub fn as_concatenation(&self) -> Option<&Concatenation> {
        match &self.kind {
            SymbolKind::Concatenation(concatenation) => Some(concatenation),
            _ => None,
        }
    }

    /// Whether the symbol can be evaluated without `t` or `y`.
    pub fn is_constant(&self) -> bool {
        match &self.kind {
            SymbolKind::Scalar(_) | SymbolKind::Vector(_) | SymbolKind::Matrix(_) => true,
            SymbolKind::Time | SymbolKind::StateVector(_) => false,
            SymbolKind::Multiplication(left, right) => left.is_constant() && right.is_constant(),
            SymbolKind::RowSlice(child, _) => child.is_constant(),
            SymbolKind::Concatenation(concatenation) => concatenation.children().iter().all(Symbol::is_constant),
        }
    }

    /// Evaluates the symbol at time `t` for the state `y`.
    pub fn evaluate(&self, t: Option<f64>, y: Option<&DVector<f64>>) -> Result<Value> {
        self.evaluate_inner(t, y, None)
    }

    /// Evaluates the symbol, reusing and recording values in `known_evals`.
    ///
    /// A symbol whose id is already present in `known_evals` is not evaluated again.
    pub fn evaluate_known(
        &self,
        t: Option<f64>,
        y: Option<&DVector<f64>>,
        known_evals: &mut KnownEvals,
    ) -> Result<Value> {
        if let Some(value) = known_evals.values.get(&self.id) {
            trace!("Reusing known evaluation of {}", self.name);
            return Ok(value.clone());
        }
        let value = self.evaluate_inner(t, y, Some(known_evals))?;
        known_evals.values.insert(self.id, value.clone());
        Ok(value)
    }

    fn evaluate_with(
        &self,
        t: Option<f64>,
        y: Option<&DVector<f64>>,
        known_evals: Option<&mut KnownEvals>,
    ) -> Result<Value> {
        match known_evals {
            Some(known_evals) => self.evaluate_known(t, y, known_evals),
            None => self.evaluate(t, y),
        }
    }

    fn evaluate_inner(
        &self,
        t: Option<f64>,
        y: Option<&DVector<f64>>,
        mut known_evals: Option<&mut KnownEvals>,
    ) -> Result<Value> {
        match &self.kind {
            SymbolKind::Scalar(s) => Ok(Value::Scalar(*s)),
            SymbolKind::Vector(v) => Ok(Value::Vector(v.clone())),
            SymbolKind::Matrix(m) => Ok(Value::Matrix(m.clone())),
            SymbolKind::Time => t
                .map(Value::Scalar)
                .ok_or_else(|| Error::InvalidArgument("t must be provided to evaluate time".to_string())),
            SymbolKind::StateVector(sv) => sv.evaluate(y).map(Value::Vector),
            SymbolKind::Multiplication(left, right) => {
                let left = left.evaluate_with(t, y, known_evals.as_deref_mut())?;
                let right = right.evaluate_with(t, y, known_evals)?;
                left.mul(&right)
            }
            SymbolKind::RowSlice(child, rows) => child
                .evaluate_with(t, y, known_evals)?
                .select_rows(rows.clone()),
            SymbolKind::Concatenation(concatenation) => {
                let children_eval = concatenation
                    .children()
                    .iter()
                    .map(|child| child.evaluate_with(t, y, known_evals.as_deref_mut()))
                    .collect::<Result<Vec<_>>>()?;
                concatenation.combine(children_eval)
            }
        }
    }

    /// Evaluates the symbol with placeholder (NaN) state, producing a value of the right shape
    /// but with meaningless entries.
    pub fn evaluate_for_shape(&self) -> Result<Value> {
        match &self.kind {
            SymbolKind::Scalar(s) => Ok(Value::Scalar(*s)),
            SymbolKind::Vector(v) => Ok(Value::Vector(v.clone())),
            SymbolKind::Matrix(m) => Ok(Value::Matrix(m.clone())),
            SymbolKind::Time => Ok(Value::Scalar(f64::NAN)),
            SymbolKind::StateVector(sv) => Ok(Value::Vector(sv.evaluate_for_shape())),
            SymbolKind::Multiplication(left, right) => left.evaluate_for_shape()?.mul(&right.evaluate_for_shape()?),
            SymbolKind::RowSlice(child, rows) => child.evaluate_for_shape()?.select_rows(rows.clone()),
            SymbolKind::Concatenation(concatenation) => {
                let children_shapes = concatenation
                    .children()
                    .iter()
                    .map(Symbol::evaluate_for_shape)
                    .collect::<Result<Vec<_>>>()?;
                concatenation.combine(children_shapes)
            }
        }
    }

    /// Whether the symbol evaluates to a single number rather than a vector or matrix.
    pub fn evaluates_to_number(&self) -> Result<bool> {
        Ok(self.evaluate_for_shape()?.is_scalar())
    }

    /// Number of rows of the evaluated symbol.
    pub fn size(&self) -> Result<usize> {
        if let Some(concatenation) = self.as_concatenation() {
            if let Some(layout) = concatenation.domain_layout() {
                return Ok(layout.size());
            }
        }
        Ok(self.evaluate_for_shape()?.nrows())
    }

    /// Symbolic Jacobian of this symbol with respect to the state vector `variable`.
    ///
    /// The returned symbol evaluates to a sparse matrix with one row per entry of this symbol and
    /// one column per entry of `variable`.
    pub fn jac(&self, variable: &Symbol) -> Result<Symbol> {
        let variable = variable.as_state_vector().ok_or_else(|| {
            Error::InvalidArgument(format!(
                "can only differentiate with respect to a state vector, not `{}`",
                variable.name
            ))
        })?;
        self.jac_state_vector(variable)
    }

    pub(crate) fn jac_state_vector(&self, variable: &StateVector) -> Result<Symbol> {
        match &self.kind {
            SymbolKind::Scalar(_) | SymbolKind::Time => Ok(Symbol::matrix(CsrMatrix::zeros(1, variable.size()))),
            SymbolKind::Vector(v) => Ok(Symbol::matrix(CsrMatrix::zeros(v.len(), variable.size()))),
            SymbolKind::Matrix(_) => Err(Error::UnsupportedOperation(format!(
                "cannot differentiate the matrix `{}`",
                self.name
            ))),
            SymbolKind::StateVector(sv) => sv.jac(variable).map(Symbol::matrix),
            SymbolKind::Multiplication(left, right) => match (left.is_constant(), right.is_constant()) {
                (true, true) => Ok(Symbol::matrix(CsrMatrix::zeros(self.size()?, variable.size()))),
                (true, false) => Symbol::multiply(left.new_copy()?, right.jac_state_vector(variable)?),
                (false, true) => Symbol::multiply(right.new_copy()?, left.jac_state_vector(variable)?),
                (false, false) => Err(Error::UnsupportedOperation(
                    "Jacobian of a product is only implemented when one factor is constant".to_string(),
                )),
            },
            SymbolKind::RowSlice(child, rows) => Ok(Symbol::row_slice(child.jac_state_vector(variable)?, rows.clone())),
            SymbolKind::Concatenation(concatenation) => concatenation.jac(variable),
        }
    }

    /// Structurally equivalent copy of the tree, built through the constructors of each node.
    pub fn new_copy(&self) -> Result<Symbol> {
        match &self.kind {
            SymbolKind::StateVector(sv) => sv.new_copy(self),
            SymbolKind::Multiplication(left, right) => {
                Ok(Symbol::multiply(left.new_copy()?, right.new_copy()?)?.with_domains_of(self))
            }
            SymbolKind::RowSlice(child, rows) => {
                Ok(Symbol::row_slice(child.new_copy()?, rows.clone()).with_domains_of(self))
            }
            SymbolKind::Concatenation(concatenation) => {
                let children = concatenation
                    .children()
                    .iter()
                    .map(Symbol::new_copy)
                    .collect::<Result<Vec<_>>>()?;
                concatenation.new_copy_with(children)
            }
            SymbolKind::Scalar(_) | SymbolKind::Vector(_) | SymbolKind::Matrix(_) | SymbolKind::Time => {
                Ok(self.clone())
            }
        }
    }

    /// Simplified copy of the tree.
    pub fn simplify(&self) -> Result<Symbol> {
        match &self.kind {
            SymbolKind::Multiplication(left, right) => {
                let left = left.simplify()?;
                let right = right.simplify()?;
                if left.is_constant() && right.is_constant() {
                    let value = left.evaluate(None, None)?.mul(&right.evaluate(None, None)?)?;
                    Ok(Symbol::from_value(value).with_domains_of(self))
                } else {
                    Ok(Symbol::multiply(left, right)?.with_domains_of(self))
                }
            }
            SymbolKind::RowSlice(child, rows) => {
                Ok(Symbol::row_slice(child.simplify()?, rows.clone()).with_domains_of(self))
            }
            SymbolKind::Concatenation(concatenation) => {
                let children = concatenation
                    .children()
                    .iter()
                    .map(Symbol::simplify)
                    .collect::<Result<Vec<_>>>()?;
                concatenation.simplify_with(children)
            }
            _ => self.new_copy(),
        }
    }
}

fn compute_id(name: &str, domain: &[String], kind: &SymbolKind) -> SymbolId {
    let mut hasher = FxHasher::default();
    discriminant(kind).hash(&mut hasher);
    name.hash(&mut hasher);
    domain.hash(&mut hasher);
    match kind {
        SymbolKind::Scalar(s) => s.to_bits().hash(&mut hasher),
        SymbolKind::Vector(v) => {
            v.len().hash(&mut hasher);
            v.iter().for_each(|x| x.to_bits().hash(&mut hasher));
        }
        SymbolKind::Matrix(m) => {
            (m.nrows(), m.ncols()).hash(&mut hasher);
            for (i, j, v) in m.triplet_iter() {
                (i, j, v.to_bits()).hash(&mut hasher);
            }
        }
        SymbolKind::Time => {}
        SymbolKind::StateVector(sv) => sv.evaluation_array().hash(&mut hasher),
        SymbolKind::Multiplication(left, right) => (left.id, right.id).hash(&mut hasher),
        SymbolKind::RowSlice(child, rows) => (child.id, rows.start, rows.end).hash(&mut hasher),
        SymbolKind::Concatenation(concatenation) => {
            discriminant(concatenation.kind()).hash(&mut hasher);
            concatenation
                .children()
                .iter()
                .for_each(|child| child.id.hash(&mut hasher));
        }
    }
    SymbolId(hasher.finish())
}
