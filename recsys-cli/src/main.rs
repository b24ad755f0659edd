//! # he-recommend
//!
//! Scores every user against every song of a bipartite interaction graph with
//! the feature vectors encrypted throughout.
//!
//! ```bash
//! he-recommend --edges edges.csv --user-features users.csv --song-features songs.csv
//! he-recommend --edges edges.csv --user-features users.csv --song-features songs.csv \
//!     --scheme exact-integer --quantize 100 --top-k 5 --output scores.json
//! RUST_LOG=debug he-recommend --config scheme.json ...
//! ```

mod ingest;
mod report;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};

use he_recsys::aggregation::exact_mean_is_faithful;
use he_recsys::codec::{centered_lift, quantize};
use he_recsys::{
    BipartiteGraph, NodeClass, PlainFeatureTable, Scheme, SchemeConfig, ScoreTable, recommend,
};

use report::Report;

#[derive(Parser)]
#[command(name = "he-recommend")]
#[command(about = "Recommendation scores over encrypted user and song features")]
#[command(version)]
struct Cli {
    /// Edge list with `User` and `Song` columns
    #[arg(long)]
    edges: PathBuf,

    /// User feature table, id in the first column
    #[arg(long)]
    user_features: PathBuf,

    /// Song feature table, id in the first column
    #[arg(long)]
    song_features: PathBuf,

    /// JSON scheme configuration; takes precedence over --scheme/--poly-degree
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "approx-real")]
    scheme: SchemeArg,

    /// Ring degree (power of two); defaults to the scheme preset
    #[arg(long)]
    poly_degree: Option<usize>,

    /// Fixed-point factor mapping real features to EXACT_INTEGER residues.
    ///
    /// The encrypted mean is the neighbour sum times the inverse of the degree
    /// modulo the plaintext modulus, a scaled value in the ring that equals the
    /// real mean only when the quantized sum is divisible by the degree. Inputs
    /// where that fails are refused; use APPROX_REAL for them.
    #[arg(long)]
    quantize: Option<f64>,

    /// Also list the best K songs per user
    #[arg(long)]
    top_k: Option<usize>,

    /// Wrap the scores with a timestamp and the scheme used
    #[arg(long)]
    with_metadata: bool,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemeArg {
    ApproxReal,
    ExactInteger,
}

fn scheme_config(cli: &Cli) -> Result<SchemeConfig> {
    if let Some(path) = &cli.config {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        return SchemeConfig::from_json(&json).with_context(|| format!("parsing {}", path.display()));
    }

    let mut config = match cli.scheme {
        SchemeArg::ApproxReal => SchemeConfig::approx_real_default(),
        SchemeArg::ExactInteger => SchemeConfig::exact_integer_default(),
    };
    if let Some(degree) = cli.poly_degree {
        config.poly_modulus_degree = degree;
    }
    Ok(config)
}

/// Quantizes both tables for the exact scheme; returns the factor the scores
/// must be divided by afterwards.
fn prepare_features(
    config: &SchemeConfig,
    factor: Option<f64>,
    edges: &[(String, String)],
    users: PlainFeatureTable,
    songs: PlainFeatureTable,
) -> Result<(PlainFeatureTable, PlainFeatureTable, Option<f64>)> {
    match (config.scheme, factor) {
        (Scheme::ExactInteger, Some(factor)) => {
            let Some(t) = config.plaintext_modulus else {
                bail!("EXACT_INTEGER configuration without plaintextModulus");
            };
            let q = |row: &[f64]| quantize(row, factor, t);
            let (users, songs) = (users.try_map_rows(q)?, songs.try_map_rows(q)?);
            check_exact_means(edges, &users, &songs, t)?;
            Ok((users, songs, Some(factor * factor)))
        }
        (Scheme::ApproxReal, Some(_)) => {
            log::warn!("--quantize only applies to EXACT_INTEGER, ignoring it");
            Ok((users, songs, None))
        }
        (_, None) => Ok((users, songs, None)),
    }
}

/// Refuses quantized inputs the exact scheme cannot average faithfully: every
/// neighbourhood sum must be divisible by the degree, and the scores of the
/// resulting means must lift back from the ring without wrapping.
fn check_exact_means(
    edges: &[(String, String)],
    users: &PlainFeatureTable,
    songs: &PlainFeatureTable,
    t: u64,
) -> Result<()> {
    let graph = BipartiteGraph::from_edges(edges)?;
    let (mut user_peak, mut song_peak) = (0u128, 0u128);

    for (peak, class, neighbours) in [
        (&mut user_peak, NodeClass::User, songs),
        (&mut song_peak, NodeClass::Song, users),
    ] {
        for id in graph.nodes(class) {
            let degree = graph.degree(id)? as u64;
            let rows: Vec<&[f64]> = graph
                .neighbors(id)?
                .iter()
                .filter_map(|n| neighbours.get(n))
                .collect();
            let dim = rows.iter().map(|r| r.len()).max().unwrap_or(0);

            for k in 0..dim {
                let sum: i128 = rows
                    .iter()
                    .filter_map(|r| r.get(k))
                    .map(|&v| centered_lift(v as u64, t) as i128)
                    .sum();
                let magnitude = sum.unsigned_abs();
                if 2 * magnitude >= t as u128 || !exact_mean_is_faithful(magnitude as u64, degree, t)
                {
                    bail!(
                        "{} {}: quantized neighbour sum {} (coordinate {}) has no exact mean over \
                         degree {} modulo {}; use APPROX_REAL or a different --quantize factor",
                        class,
                        id,
                        sum,
                        k,
                        degree,
                        t
                    );
                }
                *peak = (*peak).max(magnitude / degree as u128);
            }
        }
    }

    let dim = users.dim().max(songs.dim()).unwrap_or(0) as u128;
    if 2 * dim * user_peak * song_peak >= t as u128 {
        bail!(
            "quantized scores may exceed half the plaintext modulus {}; use a smaller --quantize factor",
            t
        );
    }
    Ok(())
}

fn rescale_scores(scores: ScoreTable, t: Option<u64>, divisor: Option<f64>) -> ScoreTable {
    match (t, divisor) {
        (Some(t), Some(divisor)) => {
            scores.map_scores(|residue| centered_lift(residue as u64, t) as f64 / divisor)
        }
        _ => scores,
    }
}

fn main() -> Result<()> {
    // Log to stderr (if you run with `RUST_LOG=debug`).
    env_logger::init();

    let cli = Cli::parse();
    let config = scheme_config(&cli)?;
    log::info!("Scheme configuration: {:?}", config);

    let edges = ingest::read_edges(&cli.edges)?;
    let users = ingest::read_features(&cli.user_features)?;
    let songs = ingest::read_features(&cli.song_features)?;
    log::info!(
        "Loaded {} edges, {} user rows, {} song rows",
        edges.len(),
        users.len(),
        songs.len()
    );

    let (users, songs, divisor) = prepare_features(&config, cli.quantize, &edges, users, songs)?;
    let scores = recommend(&edges, &users, &songs, &config).context("computing scores")?;
    let scores = rescale_scores(scores, config.plaintext_modulus, divisor);

    let json = if cli.with_metadata {
        serde_json::to_string_pretty(&Report::new(config.scheme, scores, cli.top_k))?
    } else if let Some(k) = cli.top_k {
        serde_json::to_string_pretty(&report::top_k(&scores, k))?
    } else {
        serde_json::to_string_pretty(&scores)?
    };

    match &cli.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            log::info!("Scores written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_T: u64 = 1032193;

    #[test]
    fn test_quantized_scores_are_lifted_back() -> Result<()> {
        let t = 1032193;
        let mut scores = ScoreTable::new();
        scores.insert("u1", "s1", 250.0);
        scores.insert("u1", "s2", (t - 500) as f64);

        let lifted = rescale_scores(scores, Some(t), Some(100.0));
        assert_eq!(lifted.get("u1", "s1"), Some(2.5));
        assert_eq!(lifted.get("u1", "s2"), Some(-5.0));
        Ok(())
    }

    fn edges(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|&(u, s)| (u.to_string(), s.to_string()))
            .collect()
    }

    #[test]
    fn test_fractional_mean_is_refused() -> Result<()> {
        let config = SchemeConfig::exact_integer_default();
        let edges = edges(&[("u1", "s1"), ("u1", "s2")]);
        let users = PlainFeatureTable::from_rows([("u1", vec![0.01])])?;
        let songs = PlainFeatureTable::from_rows([("s1", vec![0.01]), ("s2", vec![0.02])])?;

        // 1 + 2 over two neighbours has no integer mean.
        let err = prepare_features(&config, Some(100.0), &edges, users, songs)
            .err()
            .map(|e| e.to_string());
        assert!(err.is_some_and(|e| e.contains("no exact mean")));
        Ok(())
    }

    #[test]
    fn test_whole_mean_is_quantized() -> Result<()> {
        let config = SchemeConfig::exact_integer_default();
        let edges = edges(&[("u1", "s1"), ("u1", "s2")]);
        let users = PlainFeatureTable::from_rows([("u1", vec![-0.01])])?;
        let songs = PlainFeatureTable::from_rows([("s1", vec![0.01]), ("s2", vec![0.03])])?;

        let (users, songs, divisor) =
            prepare_features(&config, Some(100.0), &edges, users, songs)?;
        assert_eq!(divisor, Some(10_000.0));
        assert_eq!(songs.get("s2"), Some(&[3.0][..]));
        assert_eq!(users.get("u1"), Some(&[(DEFAULT_T - 1) as f64][..]));
        Ok(())
    }

    #[test]
    fn test_flags_build_config() -> Result<()> {
        let cli = Cli::parse_from([
            "he-recommend",
            "--edges",
            "e.csv",
            "--user-features",
            "u.csv",
            "--song-features",
            "s.csv",
            "--scheme",
            "exact-integer",
            "--poly-degree",
            "4096",
        ]);
        let config = scheme_config(&cli)?;
        assert_eq!(config.scheme, Scheme::ExactInteger);
        assert_eq!(config.poly_modulus_degree, 4096);
        Ok(())
    }
}
