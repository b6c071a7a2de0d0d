//! Dependency graph management using `petgraph`.
//!
//! Builds a directed graph from service dependencies and resolves a
//! deterministic start order: dependencies first, ties broken by
//! declaration order.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{Graph, NodeIndex};

use berth_common::error::{BerthError, Result};

use crate::model::Manifest;

/// A dependency graph over service names.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Internal petgraph representation.
    graph: Graph<String, ()>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
        }
    }

    /// Builds the graph from a manifest, nodes in declaration order.
    ///
    /// # Errors
    ///
    /// Returns an error if a dependency names an undefined service.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        let mut graph = Self::new();
        let mut nodes = Vec::with_capacity(manifest.services.len());
        for service in &manifest.services {
            nodes.push(graph.add_service(service.name.as_str()));
        }
        let index_of: HashMap<&str, NodeIndex> = manifest
            .services
            .iter()
            .map(|s| s.name.as_str())
            .zip(nodes.iter().copied())
            .collect();
        for (service, &dependent) in manifest.services.iter().zip(&nodes) {
            for dep in &service.depends_on {
                match index_of.get(dep.service.as_str()) {
                    Some(&dependency) => graph.add_dependency(dependent, dependency),
                    None => {
                        return Err(BerthError::UnknownReference {
                            kind: "service",
                            name: dep.service.clone(),
                            referenced_by: format!("services.{}.depends_on", service.name),
                        });
                    }
                }
            }
        }
        Ok(graph)
    }

    /// Adds a service node to the graph.
    pub fn add_service(&mut self, name: impl Into<String>) -> NodeIndex {
        self.graph.add_node(name.into())
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// The graph edge points from `dependency` to `dependent` so that
    /// the resolved order yields dependencies first.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        let _ = self.graph.add_edge(dependency, dependent, ());
    }

    /// Resolves a start order where every dependency precedes its
    /// dependents.
    ///
    /// Kahn's algorithm taking the lowest-numbered ready node each round.
    /// Node numbers follow insertion, so services at the same depth come
    /// out in declaration order and the result is stable across runs.
    ///
    /// # Errors
    ///
    /// Returns [`BerthError::CyclicDependency`] naming a cycle if no
    /// complete ordering exists.
    pub fn resolve_order(&self) -> Result<Vec<String>> {
        let total = self.graph.node_count();
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .count()
            })
            .collect();
        let mut done = vec![false; total];
        let mut order = Vec::with_capacity(total);

        loop {
            let mut ready = None;
            for (i, &degree) in in_degree.iter().enumerate() {
                if degree == 0 && !done[i] {
                    ready = Some(i);
                    break;
                }
            }
            let Some(i) = ready else { break };
            done[i] = true;
            let idx = NodeIndex::new(i);
            if let Some(name) = self.graph.node_weight(idx) {
                order.push(name.clone());
            }
            for dependent in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                in_degree[dependent.index()] -= 1;
            }
        }

        if order.len() == total {
            Ok(order)
        } else {
            Err(BerthError::CyclicDependency {
                cycle: self.extract_cycle(&done),
            })
        }
    }

    /// Recovers one concrete cycle among the nodes the sort could not
    /// place, closed with its first name repeated.
    fn extract_cycle(&self, done: &[bool]) -> Vec<String> {
        let Some(start) = done.iter().position(|&d| !d) else {
            return Vec::new();
        };
        let mut path: Vec<NodeIndex> = Vec::new();
        let mut current = NodeIndex::new(start);
        loop {
            if let Some(pos) = path.iter().position(|&n| n == current) {
                let mut names: Vec<String> = path[pos..]
                    .iter()
                    .filter_map(|&n| self.graph.node_weight(n).cloned())
                    .collect();
                if let Some(first) = names.first().cloned() {
                    names.push(first);
                }
                return names;
            }
            path.push(current);
            // Every unplaced node keeps at least one unplaced dependency,
            // so this walk always reaches a repeat.
            let next = self
                .graph
                .neighbors_directed(current, Direction::Incoming)
                .find(|n| !done[n.index()]);
            match next {
                Some(n) => current = n,
                None => return Vec::new(),
            }
        }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dependency, Service};

    fn manifest_of(entries: &[(&str, &[&str])]) -> Manifest {
        Manifest {
            services: entries
                .iter()
                .map(|(name, deps)| Service {
                    name: (*name).into(),
                    image: Some("img".into()),
                    depends_on: deps.iter().map(|d| Dependency::on(*d)).collect(),
                    ..Service::default()
                })
                .collect(),
            ..Manifest::default()
        }
    }

    #[test]
    fn empty_graph_resolves_to_empty() {
        let graph = DependencyGraph::new();
        let order = graph.resolve_order().expect("should resolve");
        assert!(order.is_empty());
    }

    #[test]
    fn single_node_resolves() {
        let mut graph = DependencyGraph::new();
        let _ = graph.add_service("api");
        let order = graph.resolve_order().expect("should resolve");
        assert_eq!(order, vec!["api"]);
    }

    #[test]
    fn chain_orders_leaf_first() {
        let manifest = manifest_of(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);
        let order = DependencyGraph::from_manifest(&manifest)
            .expect("build")
            .resolve_order()
            .expect("should resolve");
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn independent_services_keep_declaration_order() {
        let manifest = manifest_of(&[("zeta", &[]), ("alpha", &[]), ("mid", &[])]);
        let order = DependencyGraph::from_manifest(&manifest)
            .expect("build")
            .resolve_order()
            .expect("should resolve");
        assert_eq!(order, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn diamond_breaks_ties_by_declaration() {
        let manifest = manifest_of(&[
            ("a", &["b", "c"]),
            ("b", &["d"]),
            ("c", &["d"]),
            ("d", &[]),
        ]);
        let order = DependencyGraph::from_manifest(&manifest)
            .expect("build")
            .resolve_order()
            .expect("should resolve");
        assert_eq!(order, vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn webui_stack_resolves_in_declaration_order() {
        let manifest = manifest_of(&[
            ("ollama", &[]),
            ("pipelines", &[]),
            ("postgres", &[]),
            ("redis", &[]),
            ("open-webui", &["ollama", "pipelines", "postgres", "redis"]),
        ]);
        let order = DependencyGraph::from_manifest(&manifest)
            .expect("build")
            .resolve_order()
            .expect("should resolve");
        assert_eq!(
            order,
            vec!["ollama", "pipelines", "postgres", "redis", "open-webui"]
        );
    }

    #[test]
    fn two_node_cycle_is_reported_closed() {
        let manifest = manifest_of(&[("a", &["b"]), ("b", &["a"])]);
        let err = DependencyGraph::from_manifest(&manifest)
            .expect("build")
            .resolve_order()
            .unwrap_err();
        let BerthError::CyclicDependency { cycle } = err else {
            panic!("expected CyclicDependency, got {err}");
        };
        assert_eq!(cycle.first(), cycle.last());
        assert!(cycle.contains(&"a".to_string()));
        assert!(cycle.contains(&"b".to_string()));
    }

    #[test]
    fn cycle_with_tail_names_only_the_cycle() {
        let manifest = manifest_of(&[
            ("entry", &["a"]),
            ("a", &["b"]),
            ("b", &["c"]),
            ("c", &["a"]),
        ]);
        let err = DependencyGraph::from_manifest(&manifest)
            .expect("build")
            .resolve_order()
            .unwrap_err();
        let BerthError::CyclicDependency { cycle } = err else {
            panic!("expected CyclicDependency, got {err}");
        };
        assert!(!cycle.contains(&"entry".to_string()), "got: {cycle:?}");
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let manifest = manifest_of(&[("a", &["a"])]);
        let err = DependencyGraph::from_manifest(&manifest)
            .expect("build")
            .resolve_order()
            .unwrap_err();
        assert!(matches!(err, BerthError::CyclicDependency { .. }));
    }

    #[test]
    fn unknown_dependency_is_rejected_at_build() {
        let manifest = manifest_of(&[("web", &["ghost"])]);
        let err = DependencyGraph::from_manifest(&manifest).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("ghost"), "got: {msg}");
        assert!(msg.contains("services.web.depends_on"), "got: {msg}");
    }

    #[test]
    fn duplicate_dependency_edges_still_resolve() {
        let manifest = manifest_of(&[("web", &["db", "db"]), ("db", &[])]);
        let order = DependencyGraph::from_manifest(&manifest)
            .expect("build")
            .resolve_order()
            .expect("should resolve");
        assert_eq!(order, vec!["db", "web"]);
    }
}
