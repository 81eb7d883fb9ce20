//! Spline modeling of diagonal dielectric-matrix data for slab
//! geometries.
//!
//! The pipeline runs selector -> aggregator -> modeler: a
//! [`modeler::LatticeSelector`] resolves the requested lattice axis
//! against a source's stored gvectors, an [`modeler::Aggregator`]
//! streams diagonal samples out of one or more [`sources::EpsmatSource`]
//! readers, and a [`modeler::SplineModeler`] fits one B-spline per
//! lattice index, optionally through a Coulomb-kernel susceptibility
//! transform.

pub mod domain;
pub mod modeler;
pub mod numerics;
pub mod sources;
