use crate::domain::{EpsmodError, EpsmodResult, GVector, LatticeAxis};
use std::collections::HashMap;

/// Resolution of the requested lattice axis against a source's stored
/// gvector list. Matching is exact: for every requested vector the
/// zero-distance nearest neighbor must exist in the source, otherwise
/// ingestion of that source must not start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatticeSelector {
    global_indices: Vec<usize>,
}

impl LatticeSelector {
    pub fn resolve(axis: &LatticeAxis, stored: &[GVector]) -> EpsmodResult<Self> {
        let mut by_gvector: HashMap<GVector, usize> = HashMap::with_capacity(stored.len());
        for (index, gvector) in stored.iter().enumerate() {
            by_gvector.entry(*gvector).or_insert(index);
        }

        let mut global_indices = Vec::with_capacity(axis.len());
        for wanted in axis.wanted_gvectors() {
            let index = by_gvector.get(&wanted).copied().ok_or_else(|| {
                EpsmodError::precondition(
                    "PRE.LATTICE_VECTOR_MISSING",
                    format!(
                        "requested lattice vector ({}, {}, {}) is not stored by the source",
                        wanted[0], wanted[1], wanted[2]
                    ),
                )
            })?;
            global_indices.push(index);
        }

        Ok(Self { global_indices })
    }

    /// Indices into the source's global gvector ordering, one per axis
    /// entry, in LatticeAxis order.
    pub fn global_indices(&self) -> &[usize] {
        &self.global_indices
    }
}
