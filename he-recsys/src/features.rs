//! Per-class feature tables, plain and encrypted. Every vector in one table
//! shares the table's dimension.

use std::collections::BTreeMap;
use std::collections::btree_map;

use rayon::prelude::*;

use crate::codec::{self, EncryptedVector};
use crate::context::EncryptionContext;
use crate::errors::HeRecError;

/// Plaintext rows as delivered by ingestion, keyed by node id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlainFeatureTable {
    dim: Option<usize>,
    rows: BTreeMap<String, Vec<f64>>,
}

impl PlainFeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(id, row)` pairs; a repeated id keeps the last row.
    pub fn from_rows<I, S>(rows: I) -> Result<Self, HeRecError>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut table = PlainFeatureTable::new();
        for (id, row) in rows {
            table.insert(id, row)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, id: impl Into<String>, row: Vec<f64>) -> Result<(), HeRecError> {
        let id = id.into();
        match self.dim {
            Some(dim) if dim != row.len() => {
                return Err(HeRecError::DimensionMismatch(format!(
                    "row {} has {} values, table dimension is {}",
                    id,
                    row.len(),
                    dim
                )));
            }
            Some(_) => {}
            None => self.dim = Some(row.len()),
        }
        self.rows.insert(id, row);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&[f64]> {
        self.rows.get(id).map(Vec::as_slice)
    }

    /// Common row length, `None` while empty.
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.rows.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<f64>> {
        self.rows.iter()
    }

    /// Applies `f` to every row, e.g. quantization before exact encryption.
    pub fn try_map_rows<F>(&self, f: F) -> Result<PlainFeatureTable, HeRecError>
    where
        F: Fn(&[f64]) -> Result<Vec<f64>, HeRecError>,
    {
        PlainFeatureTable::from_rows(
            self.rows
                .iter()
                .map(|(id, row)| Ok((id.clone(), f(row)?)))
                .collect::<Result<Vec<_>, HeRecError>>()?,
        )
    }
}

/// Encrypted rows keyed by node id.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    dim: Option<usize>,
    vectors: BTreeMap<String, EncryptedVector>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, vector: EncryptedVector) -> Result<(), HeRecError> {
        let id = id.into();
        match self.dim {
            Some(dim) if dim != vector.dim() => {
                return Err(HeRecError::DimensionMismatch(format!(
                    "vector {} has dimension {}, table dimension is {}",
                    id,
                    vector.dim(),
                    dim
                )));
            }
            Some(_) => {}
            None => self.dim = Some(vector.dim()),
        }
        self.vectors.insert(id, vector);
        Ok(())
    }

    /// Collects `(id, vector)` pairs, enforcing a common dimension.
    pub fn from_vectors<I>(vectors: I) -> Result<Self, HeRecError>
    where
        I: IntoIterator<Item = (String, EncryptedVector)>,
    {
        let mut table = FeatureTable::new();
        for (id, vector) in vectors {
            table.insert(id, vector)?;
        }
        Ok(table)
    }

    pub fn get(&self, id: &str) -> Option<&EncryptedVector> {
        self.vectors.get(id)
    }

    /// Like [`FeatureTable::get`], failing with `UnknownNode` for a missing id.
    pub fn require(&self, id: &str) -> Result<&EncryptedVector, HeRecError> {
        self.vectors
            .get(id)
            .ok_or_else(|| HeRecError::UnknownNode(format!("{} has no feature vector", id)))
    }

    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.vectors.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, EncryptedVector> {
        self.vectors.iter()
    }
}

/// Encrypts every row of `plain` in parallel.
pub fn encrypt_features(
    ctx: &EncryptionContext,
    plain: &PlainFeatureTable,
) -> Result<FeatureTable, HeRecError> {
    let rows: Vec<(&String, &Vec<f64>)> = plain.iter().collect();
    let encrypted = rows
        .par_iter()
        .map(|(id, row)| Ok(((*id).clone(), codec::encrypt(ctx, row)?)))
        .collect::<Result<Vec<_>, HeRecError>>()?;

    log::debug!("Encrypted {} feature rows", encrypted.len());
    FeatureTable::from_vectors(encrypted)
}

/// Decrypts every vector of `table` with the owning context.
pub fn decrypt_features(
    ctx: &EncryptionContext,
    table: &FeatureTable,
) -> Result<PlainFeatureTable, HeRecError> {
    PlainFeatureTable::from_rows(
        table
            .iter()
            .map(|(id, v)| Ok((id.clone(), codec::decrypt(ctx, v)?)))
            .collect::<Result<Vec<_>, HeRecError>>()?,
    )
}
