//! Bipartite user/song interaction graph.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::HeRecError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeClass {
    /// Class A.
    User,
    /// Class B.
    Song,
}

impl NodeClass {
    pub fn opposite(self) -> NodeClass {
        match self {
            NodeClass::User => NodeClass::Song,
            NodeClass::Song => NodeClass::User,
        }
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeClass::User => write!(f, "user"),
            NodeClass::Song => write!(f, "song"),
        }
    }
}

/// Strictly bipartite simple graph. Node ids are unique across both classes;
/// duplicate edges collapse.
#[derive(Debug, Clone, Default)]
pub struct BipartiteGraph {
    classes: HashMap<String, NodeClass>,
    users: Vec<String>,
    songs: Vec<String>,
    adjacency: HashMap<String, BTreeSet<String>>,
}

impl BipartiteGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from `(user, song)` rows, registering endpoints on
    /// first sight.
    ///
    /// ```
    /// # use he_recsys::graph::{BipartiteGraph, NodeClass};
    /// let graph = BipartiteGraph::from_edges(&[("u1", "s1"), ("u1", "s2"), ("u1", "s1")]).unwrap();
    /// assert_eq!(graph.degree("u1").unwrap(), 2);
    /// assert_eq!(graph.nodes(NodeClass::Song), ["s1", "s2"]);
    /// ```
    pub fn from_edges<U, S>(edges: &[(U, S)]) -> Result<Self, HeRecError>
    where
        U: AsRef<str>,
        S: AsRef<str>,
    {
        let mut graph = BipartiteGraph::new();
        for (user, song) in edges {
            graph.add_node(user.as_ref(), NodeClass::User)?;
            graph.add_node(song.as_ref(), NodeClass::Song)?;
            graph.add_edge(user.as_ref(), song.as_ref())?;
        }
        Ok(graph)
    }

    /// Registers `id` in `class`. Re-adding to the same class is a no-op.
    ///
    /// # Errors
    ///
    /// `HeRecError::CrossClassViolation` if `id` already belongs to the other class.
    pub fn add_node(&mut self, id: &str, class: NodeClass) -> Result<(), HeRecError> {
        match self.classes.get(id) {
            Some(&existing) if existing == class => Ok(()),
            Some(&existing) => Err(HeRecError::CrossClassViolation(format!(
                "{} is already a {}, cannot add it as a {}",
                id, existing, class
            ))),
            None => {
                self.classes.insert(id.to_string(), class);
                self.adjacency.insert(id.to_string(), BTreeSet::new());
                match class {
                    NodeClass::User => self.users.push(id.to_string()),
                    NodeClass::Song => self.songs.push(id.to_string()),
                }
                Ok(())
            }
        }
    }

    /// Connects two registered nodes of opposite classes, in either order.
    pub fn add_edge(&mut self, a: &str, b: &str) -> Result<(), HeRecError> {
        let class_a = self.class_of(a)?;
        let class_b = self.class_of(b)?;
        if class_a == class_b {
            return Err(HeRecError::CrossClassViolation(format!(
                "edge {} - {} joins two {} nodes",
                a, b, class_a
            )));
        }

        for (from, to) in [(a, b), (b, a)] {
            if let Some(set) = self.adjacency.get_mut(from) {
                set.insert(to.to_string());
            }
        }
        Ok(())
    }

    pub fn class_of(&self, id: &str) -> Result<NodeClass, HeRecError> {
        self.classes
            .get(id)
            .copied()
            .ok_or_else(|| HeRecError::UnknownNode(id.to_string()))
    }

    /// Neighbours of `id`, sorted.
    pub fn neighbors(&self, id: &str) -> Result<&BTreeSet<String>, HeRecError> {
        self.adjacency
            .get(id)
            .ok_or_else(|| HeRecError::UnknownNode(id.to_string()))
    }

    pub fn degree(&self, id: &str) -> Result<usize, HeRecError> {
        Ok(self.neighbors(id)?.len())
    }

    /// Nodes of `class` in insertion order.
    pub fn nodes(&self, class: NodeClass) -> &[String] {
        match class {
            NodeClass::User => &self.users,
            NodeClass::Song => &self.songs,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.users
            .iter()
            .filter_map(|u| self.adjacency.get(u))
            .map(|set| set.len())
            .sum()
    }

    /// The same graph with the two classes swapped.
    pub fn transposed(&self) -> BipartiteGraph {
        BipartiteGraph {
            classes: self
                .classes
                .iter()
                .map(|(id, class)| (id.clone(), class.opposite()))
                .collect(),
            users: self.songs.clone(),
            songs: self.users.clone(),
            adjacency: self.adjacency.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Result<BipartiteGraph, HeRecError> {
        BipartiteGraph::from_edges(&[("u1", "s1"), ("u1", "s2"), ("u2", "s1")])
    }

    #[test]
    fn test_neighbors_and_degree() -> Result<(), HeRecError> {
        let graph = sample()?;
        assert_eq!(graph.degree("u1")?, 2);
        assert_eq!(graph.degree("s1")?, 2);
        assert_eq!(graph.degree("s2")?, 1);
        assert!(graph.neighbors("s1")?.contains("u2"));
        assert_eq!(graph.edge_count(), 3);
        Ok(())
    }

    #[test]
    fn test_isolated_node_has_degree_zero() -> Result<(), HeRecError> {
        let mut graph = sample()?;
        graph.add_node("s9", NodeClass::Song)?;
        assert_eq!(graph.degree("s9")?, 0);
        assert_eq!(graph.nodes(NodeClass::Song), ["s1", "s2", "s9"]);
        Ok(())
    }

    #[test]
    fn test_duplicate_edges_collapse() -> Result<(), HeRecError> {
        let mut graph = sample()?;
        graph.add_edge("u1", "s1")?;
        graph.add_edge("s1", "u1")?;
        assert_eq!(graph.degree("u1")?, 2);
        assert_eq!(graph.edge_count(), 3);
        Ok(())
    }

    #[test]
    fn test_same_class_edge_rejected() -> Result<(), HeRecError> {
        let mut graph = sample()?;
        assert!(matches!(
            graph.add_edge("u1", "u2"),
            Err(HeRecError::CrossClassViolation(_))
        ));
        assert!(matches!(
            graph.add_node("u1", NodeClass::Song),
            Err(HeRecError::CrossClassViolation(_))
        ));
        graph.add_node("u1", NodeClass::User)?;
        Ok(())
    }

    #[test]
    fn test_unknown_endpoint() -> Result<(), HeRecError> {
        let mut graph = sample()?;
        assert!(matches!(graph.add_edge("u1", "nope"), Err(HeRecError::UnknownNode(_))));
        assert!(matches!(graph.degree("nope"), Err(HeRecError::UnknownNode(_))));
        Ok(())
    }

    #[test]
    fn test_transposed_swaps_classes() -> Result<(), HeRecError> {
        let graph = sample()?;
        let t = graph.transposed();
        assert_eq!(t.nodes(NodeClass::User), graph.nodes(NodeClass::Song));
        assert_eq!(t.class_of("u1")?, NodeClass::Song);
        assert_eq!(t.degree("s1")?, 2);
        assert_eq!(t.edge_count(), graph.edge_count());
        Ok(())
    }
}
