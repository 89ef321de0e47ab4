//! Domain-aware concatenation and slicing of discretised expression trees.
//!
//! After discretisation every unknown of a model lives in one flat state vector `y`. The
//! [`StateVector`] leaf reads slices of `y`, the concatenation nodes in [`concatenation`] merge
//! per-domain results into vectors ordered according to a [`MeshTopology`], and every node can
//! produce its sparse Jacobian with respect to a state vector.

pub mod concatenation;
pub mod domain;
pub mod error;
pub mod mesh;
pub mod settings;
pub mod state_vector;
pub mod symbol;
pub mod value;

#[cfg(feature = "proptest")]
pub mod proptest;

pub use concatenation::{
    Concatenation, ConcatenationKind, DomainConcatenation, DomainLayout, DomainSlices, FlatConcatenation,
    MatrixStack,
};
pub use domain::AuxiliaryDomains;
pub use error::{Error, Result};
pub use mesh::{MeshTopology, SubmeshPoints};
pub use settings::DiscretisationSettings;
pub use state_vector::{StateVector, StateVectorBuilder};
pub use symbol::{KnownEvals, Symbol, SymbolId, SymbolKind};
pub use value::Value;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
