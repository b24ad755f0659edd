use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use he_recsys::{Scheme, ScoreTable};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub song: String,
    pub score: f64,
}

/// Scores with the metadata of the run that produced them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub generated_at: DateTime<Local>,
    pub scheme: Scheme,
    pub scores: ScoreTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<BTreeMap<String, Vec<Recommendation>>>,
}

/// Best `k` songs per user.
pub fn top_k(scores: &ScoreTable, k: usize) -> BTreeMap<String, Vec<Recommendation>> {
    scores
        .users()
        .map(|user| {
            let ranked = scores
                .top_k(user, k)
                .into_iter()
                .map(|(song, score)| Recommendation { song, score })
                .collect();
            (user.clone(), ranked)
        })
        .collect()
}

impl Report {
    pub fn new(scheme: Scheme, scores: ScoreTable, k: Option<usize>) -> Self {
        let top_k = k.map(|k| top_k(&scores, k));
        Report {
            generated_at: Local::now(),
            scheme,
            scores,
            top_k,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json_shape() -> Result<(), serde_json::Error> {
        let mut scores = ScoreTable::new();
        scores.insert("u1", "s1", 1.0);
        scores.insert("u1", "s2", 3.0);

        let report = Report::new(Scheme::ApproxReal, scores, Some(1));
        let json = serde_json::to_value(&report)?;
        assert_eq!(json["scheme"], "APPROX_REAL");
        assert_eq!(json["scores"]["u1"]["s2"], 3.0);
        assert_eq!(json["topK"]["u1"][0]["song"], "s2");
        assert!(json["generatedAt"].is_string());
        Ok(())
    }
}
