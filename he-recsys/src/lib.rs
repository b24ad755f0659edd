//! Recommendation scores over a bipartite user/song graph whose feature
//! vectors stay encrypted end to end.
//!
//! Two ring-LWE backends are available: `APPROX_REAL` (approximate real
//! arithmetic) and `EXACT_INTEGER` (exact arithmetic modulo a prime).

pub mod aggregation;
pub mod codec;
pub mod context;
pub mod errors;
pub mod evaluator;
pub mod features;
pub mod graph;
pub mod params;
pub mod pipeline;
pub mod preset;
pub mod ring;
pub mod rlwe;
pub mod scheme;
pub mod scoring;

pub use codec::{EncryptedVector, decrypt, encrypt};
pub use context::{EncryptionContext, create_context};
pub use errors::HeRecError;
pub use features::{FeatureTable, PlainFeatureTable};
pub use graph::{BipartiteGraph, NodeClass};
pub use params::{Scheme, SchemeConfig};
pub use pipeline::{Pipeline, recommend};
pub use scheme::Scalar;
pub use scoring::ScoreTable;
