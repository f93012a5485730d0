//! Dependency resolution: which nodes each node waits on

use super::error::{EdgeEndpoint, GraphError};
use crate::config::WorkflowDefinition;
use std::collections::HashMap;

/// Map from each node to the nodes it depends on
///
/// Every node of the definition has an entry, roots included. Upstream lists
/// keep first-seen edge order with duplicates collapsed; downstream lists are
/// kept in definition order so that traversal is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    upstream: Vec<Vec<usize>>,
    downstream: Vec<Vec<usize>>,
}

/// Build the dependency graph for a definition
///
/// Fails on duplicate node ids and on edges naming nodes that do not exist.
pub fn resolve(definition: &WorkflowDefinition) -> Result<DependencyGraph, GraphError> {
    let mut nodes = Vec::with_capacity(definition.nodes.len());
    let mut index = HashMap::with_capacity(definition.nodes.len());

    for node in &definition.nodes {
        if index.insert(node.id.clone(), nodes.len()).is_some() {
            return Err(GraphError::DuplicateNode {
                node_id: node.id.clone(),
            });
        }
        nodes.push(node.id.clone());
    }

    let mut upstream: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

    for edge in &definition.edges {
        let source = lookup(&index, &edge.id, &edge.source, EdgeEndpoint::Source)?;
        let target = lookup(&index, &edge.id, &edge.target, EdgeEndpoint::Target)?;

        if !upstream[target].contains(&source) {
            upstream[target].push(source);
            downstream[source].push(target);
        }
    }

    for targets in &mut downstream {
        targets.sort_unstable();
    }

    Ok(DependencyGraph {
        nodes,
        index,
        upstream,
        downstream,
    })
}

fn lookup(
    index: &HashMap<String, usize>,
    edge_id: &str,
    node_id: &str,
    endpoint: EdgeEndpoint,
) -> Result<usize, GraphError> {
    index
        .get(node_id)
        .copied()
        .ok_or_else(|| GraphError::InvalidReference {
            edge_id: edge_id.to_string(),
            endpoint,
            node_id: node_id.to_string(),
        })
}

impl DependencyGraph {
    /// Node ids in definition order
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.index.contains_key(node_id)
    }

    /// Direct dependencies of a node (empty for roots and unknown ids)
    pub fn upstream(&self, node_id: &str) -> Vec<&str> {
        self.index
            .get(node_id)
            .map(|&i| self.ids(&self.upstream[i]))
            .unwrap_or_default()
    }

    /// Direct dependents of a node, in definition order
    pub fn downstream(&self, node_id: &str) -> Vec<&str> {
        self.index
            .get(node_id)
            .map(|&i| self.ids(&self.downstream[i]))
            .unwrap_or_default()
    }

    /// Number of distinct dependencies
    pub fn in_degree(&self, node_id: &str) -> usize {
        self.index
            .get(node_id)
            .map(|&i| self.upstream[i].len())
            .unwrap_or(0)
    }

    /// Nodes with no dependencies, in definition order
    pub fn roots(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| self.upstream[*i].is_empty())
            .map(|(_, id)| id.as_str())
            .collect()
    }

    pub(crate) fn position(&self, node_id: &str) -> Option<usize> {
        self.index.get(node_id).copied()
    }

    pub(crate) fn upstream_at(&self, i: usize) -> &[usize] {
        &self.upstream[i]
    }

    pub(crate) fn downstream_at(&self, i: usize) -> &[usize] {
        &self.downstream[i]
    }

    fn ids(&self, positions: &[usize]) -> Vec<&str> {
        positions.iter().map(|&p| self.nodes[p].as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Edge, Node};

    fn definition(ids: &[&str], edges: &[(&str, &str)]) -> WorkflowDefinition {
        WorkflowDefinition::new(
            ids.iter().map(|id| Node::new(*id, "input")).collect(),
            edges.iter().map(|(s, t)| Edge::between(*s, *t)).collect(),
        )
    }

    #[test]
    fn test_every_node_has_an_entry() {
        let graph = resolve(&definition(&["a", "b", "lonely"], &[("a", "b")])).unwrap();

        assert_eq!(graph.len(), 3);
        assert!(graph.contains("lonely"));
        assert!(graph.upstream("lonely").is_empty());
        assert_eq!(graph.roots(), vec!["a", "lonely"]);
    }

    #[test]
    fn test_upstream_follows_edge_order() {
        let graph = resolve(&definition(
            &["a", "b", "c", "d"],
            &[("c", "d"), ("a", "d"), ("b", "d")],
        ))
        .unwrap();

        assert_eq!(graph.upstream("d"), vec!["c", "a", "b"]);
        assert_eq!(graph.in_degree("d"), 3);
    }

    #[test]
    fn test_downstream_in_definition_order() {
        let graph = resolve(&definition(
            &["root", "x", "y", "z"],
            &[("root", "z"), ("root", "x"), ("root", "y")],
        ))
        .unwrap();

        assert_eq!(graph.downstream("root"), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let graph = resolve(&definition(&["a", "b"], &[("a", "b"), ("a", "b")])).unwrap();

        assert_eq!(graph.in_degree("b"), 1);
        assert_eq!(graph.downstream("a"), vec!["b"]);
    }

    #[test]
    fn test_dangling_target() {
        let err = resolve(&definition(&["a"], &[("a", "ghost")])).unwrap_err();
        assert_eq!(
            err,
            GraphError::InvalidReference {
                edge_id: "a->ghost".into(),
                endpoint: EdgeEndpoint::Target,
                node_id: "ghost".into(),
            }
        );
    }

    #[test]
    fn test_dangling_source() {
        let err = resolve(&definition(&["a"], &[("ghost", "a")])).unwrap_err();
        assert!(matches!(
            err,
            GraphError::InvalidReference {
                endpoint: EdgeEndpoint::Source,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_node() {
        let err = resolve(&definition(&["a", "b", "a"], &[])).unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateNode {
                node_id: "a".into()
            }
        );
    }

    #[test]
    fn test_unknown_id_queries_are_empty() {
        let graph = resolve(&definition(&["a"], &[])).unwrap();
        assert!(graph.upstream("nope").is_empty());
        assert!(graph.downstream("nope").is_empty());
        assert_eq!(graph.in_degree("nope"), 0);
    }
}
