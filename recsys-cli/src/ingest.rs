//! CSV inputs: an edge list with `User` and `Song` columns, and one feature
//! table per class with the node id in the first column.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use he_recsys::PlainFeatureTable;

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input)
}

pub fn read_edges(path: &Path) -> Result<Vec<(String, String)>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_edges(file).with_context(|| format!("reading edges from {}", path.display()))
}

pub fn read_features(path: &Path) -> Result<PlainFeatureTable> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_features(file).with_context(|| format!("reading features from {}", path.display()))
}

/// `User` and `Song` columns are found by name; without such headers the
/// first two columns are used.
pub fn parse_edges<R: Read>(input: R) -> Result<Vec<(String, String)>> {
    let mut rdr = reader(input);
    let headers = rdr.headers()?.clone();
    let column = |name: &str, fallback: usize| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .unwrap_or(fallback)
    };
    let (user_col, song_col) = (column("User", 0), column("Song", 1));

    let mut edges = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        match (record.get(user_col), record.get(song_col)) {
            (Some(user), Some(song)) if !user.is_empty() && !song.is_empty() => {
                edges.push((user.to_string(), song.to_string()));
            }
            _ => bail!("edge row {} needs a user and a song", line + 1),
        }
    }
    Ok(edges)
}

pub fn parse_features<R: Read>(input: R) -> Result<PlainFeatureTable> {
    let mut rdr = reader(input);
    let mut table = PlainFeatureTable::new();

    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let Some(id) = record.get(0).filter(|id| !id.is_empty()) else {
            bail!("feature row {} has no id", line + 1);
        };
        let values = record
            .iter()
            .skip(1)
            .enumerate()
            .map(|(col, cell)| {
                cell.parse::<f64>()
                    .with_context(|| format!("row {}, column {}: {:?}", line + 1, col + 2, cell))
            })
            .collect::<Result<Vec<f64>>>()?;
        table.insert(id, values)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_by_header_name() -> Result<()> {
        let csv = "Song,User,Plays\ns1,u1,3\ns2, u1 ,1\n";
        let edges = parse_edges(csv.as_bytes())?;
        assert_eq!(
            edges,
            vec![
                ("u1".to_string(), "s1".to_string()),
                ("u1".to_string(), "s2".to_string())
            ]
        );
        Ok(())
    }

    #[test]
    fn test_features() -> Result<()> {
        let csv = "Song,danceability,energy\ns1,0.5,0.25\ns2,1,0\n";
        let table = parse_features(csv.as_bytes())?;
        assert_eq!(table.dim(), Some(2));
        assert_eq!(table.get("s1"), Some(&[0.5, 0.25][..]));
        Ok(())
    }

    #[test]
    fn test_bad_cell_is_reported() {
        let csv = "User,a\nu1,abc\n";
        let err = parse_features(csv.as_bytes()).err().map(|e| format!("{:#}", e));
        assert!(err.is_some_and(|e| e.contains("row 1, column 2")));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let csv = "User,a,b\nu1,1,2\nu2,1\n";
        assert!(parse_features(csv.as_bytes()).is_err());
    }
}
