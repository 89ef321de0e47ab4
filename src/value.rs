use crate::error::{Error, Result};
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;

/// The result of evaluating a symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    /// A column vector.
    Vector(DVector<f64>),
    /// A sparse matrix, typically (a block of) a Jacobian.
    Matrix(CsrMatrix<f64>),
}

impl Value {
    pub fn empty() -> Self {
        Value::Vector(DVector::zeros(0))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Scalar(_))
    }

    /// Number of rows of the value. Scalars have a single row.
    pub fn nrows(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Vector(v) => v.len(),
            Value::Matrix(m) => m.nrows(),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&DVector<f64>> {
        match self {
            Value::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&CsrMatrix<f64>> {
        match self {
            Value::Matrix(m) => Some(m),
            _ => None,
        }
    }

    pub fn into_vector(self) -> Result<DVector<f64>> {
        match self {
            Value::Scalar(s) => Ok(DVector::from_element(1, s)),
            Value::Vector(v) => Ok(v),
            Value::Matrix(m) => Err(Error::InvalidArgument(format!(
                "expected a vector, got a {}x{} matrix",
                m.nrows(),
                m.ncols()
            ))),
        }
    }

    /// Converts the value into a sparse matrix. Vectors become single-column matrices.
    pub fn into_csr(self) -> CsrMatrix<f64> {
        match self {
            Value::Scalar(s) => CsrMatrix::from(&nalgebra::DMatrix::from_element(1, 1, s)),
            Value::Vector(v) => CsrMatrix::from(&v),
            Value::Matrix(m) => m,
        }
    }

    /// Selects the given rows.
    pub fn select_rows(&self, rows: std::ops::Range<usize>) -> Result<Value> {
        if rows.start > rows.end || rows.end > self.nrows() {
            return Err(Error::SizeMismatch(format!(
                "rows {:?} are out of bounds for a value with {} rows",
                rows,
                self.nrows()
            )));
        }
        match self {
            Value::Scalar(s) => Ok(if rows.is_empty() { Value::empty() } else { Value::Scalar(*s) }),
            Value::Vector(v) => Ok(Value::Vector(v.rows(rows.start, rows.len()).clone_owned())),
            Value::Matrix(m) => Ok(Value::Matrix(discretise_sparse::select_rows(m, rows)?)),
        }
    }

    /// Elementwise product, where operands with a single row are broadcast.
    pub fn mul(&self, other: &Value) -> Result<Value> {
        use Value::*;
        match (self, other) {
            (Scalar(a), Scalar(b)) => Ok(Scalar(a * b)),
            (Scalar(a), Vector(v)) | (Vector(v), Scalar(a)) => Ok(Vector(v * *a)),
            (Scalar(a), Matrix(m)) | (Matrix(m), Scalar(a)) => Ok(Matrix(m * *a)),
            (Vector(a), Vector(b)) => {
                if a.len() == b.len() {
                    Ok(Vector(a.component_mul(b)))
                } else if a.len() == 1 {
                    Ok(Vector(b * a[0]))
                } else if b.len() == 1 {
                    Ok(Vector(a * b[0]))
                } else {
                    Err(Error::SizeMismatch(format!(
                        "cannot multiply vectors of length {} and {}",
                        a.len(),
                        b.len()
                    )))
                }
            }
            (Vector(v), Matrix(m)) | (Matrix(m), Vector(v)) => {
                if m.nrows() == v.len() {
                    Ok(Matrix(discretise_sparse::scale_rows(m, v.as_slice())?))
                } else if m.nrows() == 1 {
                    Ok(Matrix(discretise_sparse::broadcast_row(m, v.as_slice())?))
                } else if v.len() == 1 {
                    Ok(Matrix(m * v[0]))
                } else {
                    Err(Error::SizeMismatch(format!(
                        "cannot multiply vector of length {} with a {}x{} matrix",
                        v.len(),
                        m.nrows(),
                        m.ncols()
                    )))
                }
            }
            (Matrix(_), Matrix(_)) => Err(Error::UnsupportedOperation(
                "elementwise product of two sparse matrices".to_string(),
            )),
        }
    }
}

impl From<f64> for Value {
    fn from(s: f64) -> Self {
        Value::Scalar(s)
    }
}

impl From<DVector<f64>> for Value {
    fn from(v: DVector<f64>) -> Self {
        Value::Vector(v)
    }
}

impl From<CsrMatrix<f64>> for Value {
    fn from(m: CsrMatrix<f64>) -> Self {
        Value::Matrix(m)
    }
}
