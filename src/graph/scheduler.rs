//! Deterministic topological ordering (Kahn's algorithm)

use super::error::GraphError;
use super::resolver::DependencyGraph;
use std::collections::VecDeque;

/// Node ids in an order where every dependency precedes its dependents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOrder(Vec<String>);

impl ExecutionOrder {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    /// Position of a node in the order
    pub fn position(&self, node_id: &str) -> Option<usize> {
        self.0.iter().position(|id| id == node_id)
    }
}

impl<'a> IntoIterator for &'a ExecutionOrder {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Order the graph so that every node comes after all of its dependencies
///
/// Ready nodes are taken first-in first-out, seeded in definition order, so a
/// given definition always yields the same order.
pub fn order(graph: &DependencyGraph) -> Result<ExecutionOrder, GraphError> {
    let count = graph.len();
    let mut in_degree: Vec<usize> = (0..count).map(|i| graph.upstream_at(i).len()).collect();

    let mut queue: VecDeque<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
    let mut sorted = Vec::with_capacity(count);

    while let Some(current) = queue.pop_front() {
        sorted.push(current);
        for &next in graph.downstream_at(current) {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if sorted.len() < count {
        let cycle = find_cycle(graph, &in_degree);
        let node_id = cycle.first().cloned().unwrap_or_default();
        return Err(GraphError::CycleDetected { node_id, cycle });
    }

    let nodes = graph.nodes();
    Ok(ExecutionOrder(
        sorted.into_iter().map(|i| nodes[i].clone()).collect(),
    ))
}

/// Recover one concrete cycle among the nodes Kahn could not release
///
/// Every unreleased node still has an unreleased dependency, so walking
/// dependencies from any of them must revisit a node. The returned ids follow
/// edge direction and start at the cycle member listed first in the definition.
fn find_cycle(graph: &DependencyGraph, in_degree: &[usize]) -> Vec<String> {
    let blocked = |i: usize| in_degree[i] > 0;
    let Some(start) = (0..graph.len()).find(|&i| blocked(i)) else {
        return Vec::new();
    };

    let mut path: Vec<usize> = Vec::new();
    let mut seen_at: Vec<Option<usize>> = vec![None; graph.len()];
    let mut current = start;

    let loop_start = loop {
        if let Some(at) = seen_at[current] {
            break at;
        }
        seen_at[current] = Some(path.len());
        path.push(current);

        match graph.upstream_at(current).iter().copied().find(|&u| blocked(u)) {
            Some(next) => current = next,
            None => return Vec::new(),
        }
    };

    // The walk went against the edges; flip it back to source -> target
    let mut cycle: Vec<usize> = path[loop_start..].iter().rev().copied().collect();
    if let Some(first) = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, node)| **node)
        .map(|(pos, _)| pos)
    {
        cycle.rotate_left(first);
    }

    let nodes = graph.nodes();
    cycle.into_iter().map(|i| nodes[i].clone()).collect()
}
