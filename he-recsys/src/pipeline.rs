//! End-to-end orchestration: context, feature encryption, one aggregation
//! layer, scoring, decryption.

use std::time::Instant;

use crate::aggregation::gnn_layer;
use crate::context::{EncryptionContext, create_context};
use crate::errors::HeRecError;
use crate::features::{PlainFeatureTable, encrypt_features};
use crate::graph::{BipartiteGraph, NodeClass};
use crate::params::SchemeConfig;
use crate::scoring::{ScoreTable, decrypt_scores, score_encrypted};

/// Runs the recommendation flow under one context. Only decryption uses
/// the secret key; every other phase goes through the public view.
#[derive(Debug, Clone)]
pub struct Pipeline {
    context: EncryptionContext,
}

impl Pipeline {
    /// Pipeline with a freshly generated context.
    pub fn new(config: &SchemeConfig) -> Result<Self, HeRecError> {
        Ok(Pipeline {
            context: create_context(config)?,
        })
    }

    /// Reuses an existing context, amortizing key generation across runs.
    ///
    /// # Errors
    ///
    /// `HeRecError::MissingSecretKey` for a public view, which could not
    /// decrypt the scores.
    pub fn with_context(context: EncryptionContext) -> Result<Self, HeRecError> {
        if !context.has_secret_key() {
            return Err(HeRecError::MissingSecretKey);
        }
        Ok(Pipeline { context })
    }

    pub fn context(&self) -> &EncryptionContext {
        &self.context
    }

    /// Scores every user against every song.
    ///
    /// Graph nodes are the edge endpoints plus every feature row, so a row
    /// without edges becomes an isolated node. Every node needs a feature row.
    pub fn run<U, S>(
        &self,
        edges: &[(U, S)],
        user_features: &PlainFeatureTable,
        song_features: &PlainFeatureTable,
    ) -> Result<ScoreTable, HeRecError>
    where
        U: AsRef<str>,
        S: AsRef<str>,
    {
        let graph = build_graph(edges, user_features, song_features)?;
        check_shapes(&graph, user_features, song_features)?;
        log::info!(
            "Graph: {} users, {} songs, {} edges",
            graph.nodes(NodeClass::User).len(),
            graph.nodes(NodeClass::Song).len(),
            graph.edge_count()
        );

        let public = self.context.public_view();

        let start = Instant::now();
        let users = encrypt_features(&public, user_features)?;
        let songs = encrypt_features(&public, song_features)?;
        log::info!(
            "Encrypted {} feature vectors in {:?}",
            users.len() + songs.len(),
            start.elapsed()
        );

        let start = Instant::now();
        let (updated_users, updated_songs) = gnn_layer(&public, &graph, &users, &songs)?;
        log::info!("Aggregation layer done in {:?}", start.elapsed());

        let start = Instant::now();
        let encrypted = score_encrypted(&public, &updated_users, &updated_songs)?;
        log::info!(
            "Scored {} pairs in {:?}",
            encrypted.len(),
            start.elapsed()
        );

        let start = Instant::now();
        let scores = decrypt_scores(&self.context, &encrypted)?;
        log::info!("Decrypted scores in {:?}", start.elapsed());

        Ok(scores)
    }
}

/// Entry point: `recommend(edges, userFeatures, songFeatures, schemeConfig)`
/// with a context created for this call only.
pub fn recommend<U, S>(
    edges: &[(U, S)],
    user_features: &PlainFeatureTable,
    song_features: &PlainFeatureTable,
    config: &SchemeConfig,
) -> Result<ScoreTable, HeRecError>
where
    U: AsRef<str>,
    S: AsRef<str>,
{
    Pipeline::new(config)?.run(edges, user_features, song_features)
}

fn build_graph<U, S>(
    edges: &[(U, S)],
    user_features: &PlainFeatureTable,
    song_features: &PlainFeatureTable,
) -> Result<BipartiteGraph, HeRecError>
where
    U: AsRef<str>,
    S: AsRef<str>,
{
    let mut graph = BipartiteGraph::from_edges(edges)?;
    for id in user_features.ids() {
        graph.add_node(id, NodeClass::User)?;
    }
    for id in song_features.ids() {
        graph.add_node(id, NodeClass::Song)?;
    }
    Ok(graph)
}

/// Rejects bad input before anything is encrypted.
fn check_shapes(
    graph: &BipartiteGraph,
    user_features: &PlainFeatureTable,
    song_features: &PlainFeatureTable,
) -> Result<(), HeRecError> {
    for (class, table) in [
        (NodeClass::User, user_features),
        (NodeClass::Song, song_features),
    ] {
        if let Some(id) = graph.nodes(class).iter().find(|id| table.get(id).is_none()) {
            return Err(HeRecError::UnknownNode(format!(
                "{} {} has no feature row",
                class, id
            )));
        }
    }

    // Updated users carry song features and vice versa; scoring pairs them.
    if let (Some(user_dim), Some(song_dim)) = (user_features.dim(), song_features.dim()) {
        if user_dim != song_dim {
            return Err(HeRecError::DimensionMismatch(format!(
                "user features have {} columns, song features {}",
                user_dim, song_dim
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_context_rejects_public_view() -> Result<(), HeRecError> {
        let ctx = create_context(&SchemeConfig::exact_integer(16, 65537))?;
        assert!(matches!(
            Pipeline::with_context(ctx.public_view()),
            Err(HeRecError::MissingSecretKey)
        ));
        let pipeline = Pipeline::with_context(ctx.clone())?;
        assert_eq!(pipeline.context().id(), ctx.id());
        Ok(())
    }

    #[test]
    fn test_missing_feature_row() -> Result<(), HeRecError> {
        let users = PlainFeatureTable::from_rows([("u1", vec![1.0])])?;
        let songs = PlainFeatureTable::from_rows([("s1", vec![1.0])])?;
        let graph = build_graph(&[("u1", "s1"), ("u1", "s2")], &users, &songs)?;
        assert!(matches!(
            check_shapes(&graph, &users, &songs),
            Err(HeRecError::UnknownNode(_))
        ));
        Ok(())
    }

    #[test]
    fn test_id_in_both_tables() -> Result<(), HeRecError> {
        let users = PlainFeatureTable::from_rows([("x", vec![1.0])])?;
        let songs = PlainFeatureTable::from_rows([("x", vec![1.0])])?;
        let edges: [(&str, &str); 0] = [];
        assert!(matches!(
            build_graph(&edges, &users, &songs),
            Err(HeRecError::CrossClassViolation(_))
        ));
        Ok(())
    }
}
