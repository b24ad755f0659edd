//! Dense user x song scoring over the updated feature tables.
//!
//! Split in two so the evaluating side never needs the secret key:
//! [`score_encrypted`] runs under a public context, [`decrypt_scores`] under
//! the owning one.

use std::collections::BTreeMap;

use itertools::iproduct;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::codec::{self, EncryptedVector};
use crate::context::EncryptionContext;
use crate::errors::HeRecError;
use crate::features::FeatureTable;

/// Decrypted scores keyed by user, then song. Serializes as the nested
/// `{user: {song: score}}` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreTable {
    scores: BTreeMap<String, BTreeMap<String, f64>>,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user: impl Into<String>, song: impl Into<String>, score: f64) {
        self.scores
            .entry(user.into())
            .or_default()
            .insert(song.into(), score);
    }

    pub fn get(&self, user: &str, song: &str) -> Option<f64> {
        self.scores.get(user)?.get(song).copied()
    }

    pub fn users(&self) -> impl Iterator<Item = &String> {
        self.scores.keys()
    }

    /// Number of (user, song) entries.
    pub fn len(&self) -> usize {
        self.scores.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `k` best songs for `user`, highest score first; ties go to the
    /// smaller song id.
    pub fn top_k(&self, user: &str, k: usize) -> Vec<(String, f64)> {
        let Some(row) = self.scores.get(user) else {
            return Vec::new();
        };
        let mut ranked: Vec<(String, f64)> =
            row.iter().map(|(song, &score)| (song.clone(), score)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(k);
        ranked
    }

    /// Song-major view of the same scores.
    pub fn transposed(&self) -> ScoreTable {
        let mut out = ScoreTable::new();
        for (user, row) in &self.scores {
            for (song, &score) in row {
                out.insert(song.clone(), user.clone(), score);
            }
        }
        out
    }

    /// Applies `f` to every score.
    pub fn map_scores<F: Fn(f64) -> f64>(&self, f: F) -> ScoreTable {
        ScoreTable {
            scores: self
                .scores
                .iter()
                .map(|(user, row)| {
                    let row = row.iter().map(|(s, &v)| (s.clone(), f(v))).collect();
                    (user.clone(), row)
                })
                .collect(),
        }
    }
}

/// One encrypted dot product per (user, song) pair.
#[derive(Debug, Clone, Default)]
pub struct EncryptedScores {
    entries: Vec<(String, String, EncryptedVector)>,
}

impl EncryptedScores {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, user: &str, song: &str) -> Option<&EncryptedVector> {
        self.entries
            .iter()
            .find(|(u, s, _)| u == user && s == song)
            .map(|(_, _, v)| v)
    }
}

/// Homomorphic dot product of every updated user vector with every updated
/// song vector. Fails on the first error; no partial table is returned.
pub fn score_encrypted(
    ctx: &EncryptionContext,
    users: &FeatureTable,
    songs: &FeatureTable,
) -> Result<EncryptedScores, HeRecError> {
    if let (Some(user_dim), Some(song_dim)) = (users.dim(), songs.dim()) {
        if user_dim != song_dim {
            return Err(HeRecError::DimensionMismatch(format!(
                "user vectors have dimension {}, song vectors {}",
                user_dim, song_dim
            )));
        }
    }

    let pairs: Vec<_> = iproduct!(users.iter(), songs.iter()).collect();
    let entries = pairs
        .par_iter()
        .map(|((user, u), (song, s))| Ok(((*user).clone(), (*song).clone(), ctx.dot(u, s)?)))
        .collect::<Result<Vec<_>, HeRecError>>()?;

    log::debug!("Computed {} encrypted scores", entries.len());
    Ok(EncryptedScores { entries })
}

/// Decrypts every score; needs the owning context.
pub fn decrypt_scores(
    ctx: &EncryptionContext,
    scores: &EncryptedScores,
) -> Result<ScoreTable, HeRecError> {
    let decrypted = scores
        .entries
        .par_iter()
        .map(|(user, song, v)| {
            let value = codec::decrypt(ctx, v)?.first().copied().ok_or_else(|| {
                HeRecError::InternalError(format!("empty score for {} / {}", user, song))
            })?;
            Ok((user, song, value))
        })
        .collect::<Result<Vec<_>, HeRecError>>()?;

    let mut table = ScoreTable::new();
    for (user, song, value) in decrypted {
        table.insert(user.clone(), song.clone(), value);
    }
    Ok(table)
}

/// [`score_encrypted`] followed by [`decrypt_scores`] under one context.
pub fn score_all(
    ctx: &EncryptionContext,
    users: &FeatureTable,
    songs: &FeatureTable,
) -> Result<ScoreTable, HeRecError> {
    decrypt_scores(ctx, &score_encrypted(ctx, users, songs)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::context::create_context;
    use crate::features::{PlainFeatureTable, encrypt_features};
    use crate::params::SchemeConfig;

    #[test]
    fn test_score_exact() -> Result<(), HeRecError> {
        let ctx = create_context(&SchemeConfig::exact_integer(16, 65537))?;
        let users = encrypt_features(
            &ctx,
            &PlainFeatureTable::from_rows([("u1", vec![1.0, 2.0]), ("u2", vec![0.0, 1.0])])?,
        )?;
        let songs = encrypt_features(
            &ctx,
            &PlainFeatureTable::from_rows([("s1", vec![3.0, 4.0]), ("s2", vec![5.0, 0.0])])?,
        )?;

        let table = score_all(&ctx, &users, &songs)?;
        assert_eq!(table.len(), 4);
        assert_eq!(table.get("u1", "s1"), Some(11.0));
        assert_eq!(table.get("u1", "s2"), Some(5.0));
        assert_eq!(table.get("u2", "s1"), Some(4.0));
        assert_eq!(table.get("u2", "s2"), Some(0.0));
        Ok(())
    }

    #[test]
    fn test_split_scoring_needs_owner() -> Result<(), HeRecError> {
        let ctx = create_context(&SchemeConfig::exact_integer(16, 65537))?;
        let public = ctx.public_view();
        let users = encrypt_features(&public, &PlainFeatureTable::from_rows([("u1", vec![2.0])])?)?;
        let songs = encrypt_features(&public, &PlainFeatureTable::from_rows([("s1", vec![3.0])])?)?;

        let encrypted = score_encrypted(&public, &users, &songs)?;
        assert_eq!(encrypted.len(), 1);
        let entry = encrypted.get("u1", "s1").ok_or_else(|| {
            HeRecError::InternalError("missing (u1, s1) entry".to_string())
        })?;
        assert_eq!(entry.dim(), 1);
        assert_eq!(entry.context_id(), ctx.id());
        assert!(encrypted.get("u1", "s2").is_none());
        assert!(matches!(
            decrypt_scores(&public, &encrypted),
            Err(HeRecError::MissingSecretKey)
        ));
        assert_eq!(decrypt_scores(&ctx, &encrypted)?.get("u1", "s1"), Some(6.0));
        Ok(())
    }

    #[test]
    fn test_dimension_mismatch_is_eager() -> Result<(), HeRecError> {
        let ctx = create_context(&SchemeConfig::exact_integer(16, 65537))?;
        let users = encrypt_features(&ctx, &PlainFeatureTable::from_rows([("u1", vec![2.0])])?)?;
        let songs =
            encrypt_features(&ctx, &PlainFeatureTable::from_rows([("s1", vec![3.0, 1.0])])?)?;
        assert!(matches!(
            score_encrypted(&ctx, &users, &songs),
            Err(HeRecError::DimensionMismatch(_))
        ));
        Ok(())
    }

    #[test]
    fn test_top_k_and_json() -> Result<(), HeRecError> {
        let mut table = ScoreTable::new();
        table.insert("u1", "s1", 0.5);
        table.insert("u1", "s2", 2.0);
        table.insert("u1", "s3", 2.0);
        table.insert("u2", "s1", 1.0);

        assert_eq!(
            table.top_k("u1", 2),
            vec![("s2".to_string(), 2.0), ("s3".to_string(), 2.0)]
        );
        assert!(table.top_k("nobody", 3).is_empty());
        assert_eq!(table.transposed().get("s1", "u2"), Some(1.0));

        let json = serde_json::to_value(&table)?;
        assert_eq!(json["u1"]["s2"], serde_json::json!(2.0));
        Ok(())
    }
}
