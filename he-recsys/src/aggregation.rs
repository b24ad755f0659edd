//! One encrypted message-passing layer: every node's vector becomes the
//! mean of its neighbours' vectors.
//!
//! Under `EXACT_INTEGER` the "mean" is `sum * n^-1 mod t`, a scaled sum in the
//! plaintext field. It equals the arithmetic mean only when the true integer
//! sum is divisible by `n` and never wrapped past `t`; see
//! [`exact_mean_is_faithful`].

use rayon::prelude::*;

use crate::codec::EncryptedVector;
use crate::context::EncryptionContext;
use crate::errors::HeRecError;
use crate::features::FeatureTable;
use crate::graph::{BipartiteGraph, NodeClass};

/// Updated vector of `id`: the sum of its neighbours' vectors times the
/// reciprocal of its own degree. A node without neighbours gets the zero
/// vector of dimension `dim`, unscaled.
pub fn aggregate_node(
    ctx: &EncryptionContext,
    graph: &BipartiteGraph,
    id: &str,
    neighbor_features: &FeatureTable,
    dim: usize,
) -> Result<EncryptedVector, HeRecError> {
    let neighbors = graph.neighbors(id)?;

    let mut acc = ctx.zero(dim)?;
    for neighbor in neighbors {
        acc = ctx.add(&acc, neighbor_features.require(neighbor)?)?;
    }

    if neighbors.is_empty() {
        return Ok(acc);
    }
    let scalar = ctx.reciprocal(neighbors.len() as u64)?;
    ctx.multiply_scalar(&acc, scalar)
}

/// Aggregates every node of `class` from the opposite class's features.
pub fn aggregate_class(
    ctx: &EncryptionContext,
    graph: &BipartiteGraph,
    class: NodeClass,
    neighbor_features: &FeatureTable,
    dim: usize,
) -> Result<FeatureTable, HeRecError> {
    let updated = graph
        .nodes(class)
        .par_iter()
        .map(|id| {
            let vector = aggregate_node(ctx, graph, id, neighbor_features, dim)?;
            Ok((id.clone(), vector))
        })
        .collect::<Result<Vec<_>, HeRecError>>()?;

    log::debug!("Aggregated {} {} vectors", updated.len(), class);
    FeatureTable::from_vectors(updated)
}

/// Applies the layer to both classes. Both sides read only the input tables,
/// so neither sees the other's updated vectors.
///
/// Returns `(updated_users, updated_songs)`; updated users carry the song
/// dimension and vice versa.
pub fn gnn_layer(
    ctx: &EncryptionContext,
    graph: &BipartiteGraph,
    users: &FeatureTable,
    songs: &FeatureTable,
) -> Result<(FeatureTable, FeatureTable), HeRecError> {
    let user_dim = users.dim().unwrap_or(0);
    let song_dim = songs.dim().unwrap_or(0);

    let (updated_users, updated_songs) = rayon::join(
        || aggregate_class(ctx, graph, NodeClass::User, songs, song_dim),
        || aggregate_class(ctx, graph, NodeClass::Song, users, user_dim),
    );

    Ok((updated_users?, updated_songs?))
}

/// Whether `sum * n^-1 mod t` equals the integer mean `sum / n`, for a true
/// (unreduced) neighbour sum.
///
/// ```
/// # use he_recsys::aggregation::exact_mean_is_faithful;
/// assert!(exact_mean_is_faithful(12, 3, 65537));
/// assert!(!exact_mean_is_faithful(13, 3, 65537));
/// assert!(!exact_mean_is_faithful(70000, 2, 65537));
/// ```
pub fn exact_mean_is_faithful(sum: u64, n: u64, t: u64) -> bool {
    n > 0 && sum < t && sum % n == 0
}
