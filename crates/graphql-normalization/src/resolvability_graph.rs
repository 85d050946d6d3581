//! Abstract-to-concrete type membership across subgraphs.
//!
//! Normalization only ever inserts into the graph, through the [ResolvabilityGraph] trait. [Graph]
//! is the shared petgraph-backed store, [RecordingGraph] captures the calls of one subgraph so they
//! can be replayed into a [Graph] later.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphNodeId(usize);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeOptions {
    pub is_abstract: bool,
    pub is_leaf: bool,
}

impl NodeOptions {
    pub const ABSTRACT: NodeOptions = NodeOptions {
        is_abstract: true,
        is_leaf: false,
    };

    pub const LEAF: NodeOptions = NodeOptions {
        is_abstract: false,
        is_leaf: true,
    };
}

pub trait ResolvabilityGraph {
    /// Nodes added after this call belong to `subgraph_name`.
    fn set_subgraph_name(&mut self, subgraph_name: &str);

    fn add_or_update_node(&mut self, type_name: &str, options: NodeOptions) -> GraphNodeId;

    fn add_edge(&mut self, source: GraphNodeId, target: GraphNodeId, edge_name: &str, is_abstract: bool);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub subgraph_name: String,
    pub type_name: String,
    pub is_abstract: bool,
    pub is_leaf: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub name: String,
    pub is_abstract: bool,
}

/// The federation-wide resolvability graph. Nodes are keyed by subgraph and type name.
#[derive(Debug, Default)]
pub struct Graph {
    inner: DiGraph<GraphNode, GraphEdge>,
    node_indices: HashMap<(String, String), NodeIndex>,
    subgraph_name: String,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn node(&self, subgraph_name: &str, type_name: &str) -> Option<&GraphNode> {
        let index = self
            .node_indices
            .get(&(subgraph_name.to_owned(), type_name.to_owned()))?;

        self.inner.node_weight(*index)
    }

    /// Names of the types an abstract type points to in one subgraph, in insertion order.
    pub fn concrete_type_names(&self, subgraph_name: &str, abstract_type_name: &str) -> Vec<&str> {
        let Some(index) = self
            .node_indices
            .get(&(subgraph_name.to_owned(), abstract_type_name.to_owned()))
        else {
            return Vec::new();
        };

        let mut names: Vec<_> = self
            .inner
            .neighbors(*index)
            .filter_map(|neighbor| self.inner.node_weight(neighbor))
            .map(|node| node.type_name.as_str())
            .collect();

        // petgraph walks the adjacency list newest first.
        names.reverse();
        names
    }
}

impl ResolvabilityGraph for Graph {
    fn set_subgraph_name(&mut self, subgraph_name: &str) {
        subgraph_name.clone_into(&mut self.subgraph_name);
    }

    fn add_or_update_node(&mut self, type_name: &str, options: NodeOptions) -> GraphNodeId {
        let key = (self.subgraph_name.clone(), type_name.to_owned());

        if let Some(index) = self.node_indices.get(&key) {
            if let Some(node) = self.inner.node_weight_mut(*index) {
                node.is_abstract |= options.is_abstract;
                node.is_leaf |= options.is_leaf;
            }
            return GraphNodeId(index.index());
        }

        let index = self.inner.add_node(GraphNode {
            subgraph_name: key.0.clone(),
            type_name: key.1.clone(),
            is_abstract: options.is_abstract,
            is_leaf: options.is_leaf,
        });
        self.node_indices.insert(key, index);

        GraphNodeId(index.index())
    }

    fn add_edge(&mut self, source: GraphNodeId, target: GraphNodeId, edge_name: &str, is_abstract: bool) {
        self.inner.update_edge(
            NodeIndex::new(source.0),
            NodeIndex::new(target.0),
            GraphEdge {
                name: edge_name.to_owned(),
                is_abstract,
            },
        );
    }
}

#[derive(Debug, Clone, PartialEq)]
enum GraphMutation {
    SetSubgraphName(String),
    AddOrUpdateNode {
        type_name: String,
        options: NodeOptions,
    },
    AddEdge {
        source: GraphNodeId,
        target: GraphNodeId,
        edge_name: String,
        is_abstract: bool,
    },
}

/// Records graph mutations without applying them. Node ids handed out are local to the recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingGraph {
    mutations: Vec<GraphMutation>,
    node_count: usize,
}

impl RecordingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Apply the recorded mutations to `graph`, in the order they were made.
    pub fn replay(self, graph: &mut dyn ResolvabilityGraph) {
        let mut node_ids = Vec::with_capacity(self.node_count);

        for mutation in self.mutations {
            match mutation {
                GraphMutation::SetSubgraphName(subgraph_name) => graph.set_subgraph_name(&subgraph_name),
                GraphMutation::AddOrUpdateNode { type_name, options } => {
                    node_ids.push(graph.add_or_update_node(&type_name, options));
                }
                GraphMutation::AddEdge {
                    source,
                    target,
                    edge_name,
                    is_abstract,
                } => {
                    let (Some(source), Some(target)) = (node_ids.get(source.0), node_ids.get(target.0)) else {
                        continue;
                    };
                    graph.add_edge(*source, *target, &edge_name, is_abstract);
                }
            }
        }
    }
}

impl ResolvabilityGraph for RecordingGraph {
    fn set_subgraph_name(&mut self, subgraph_name: &str) {
        self.mutations
            .push(GraphMutation::SetSubgraphName(subgraph_name.to_owned()));
    }

    fn add_or_update_node(&mut self, type_name: &str, options: NodeOptions) -> GraphNodeId {
        self.mutations.push(GraphMutation::AddOrUpdateNode {
            type_name: type_name.to_owned(),
            options,
        });
        self.node_count += 1;

        GraphNodeId(self.node_count - 1)
    }

    fn add_edge(&mut self, source: GraphNodeId, target: GraphNodeId, edge_name: &str, is_abstract: bool) {
        self.mutations.push(GraphMutation::AddEdge {
            source,
            target,
            edge_name: edge_name.to_owned(),
            is_abstract,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_membership(graph: &mut dyn ResolvabilityGraph, abstract_type_name: &str, concrete_type_name: &str) {
        let source = graph.add_or_update_node(abstract_type_name, NodeOptions::ABSTRACT);
        let target = graph.add_or_update_node(concrete_type_name, NodeOptions::default());
        graph.add_edge(source, target, concrete_type_name, true);
    }

    #[test]
    fn node_flags_are_sticky() {
        let mut graph = Graph::new();
        graph.set_subgraph_name("a");

        let first = graph.add_or_update_node("Node", NodeOptions::ABSTRACT);
        let second = graph.add_or_update_node("Node", NodeOptions::default());

        assert_eq!(first, second);
        assert!(graph.node("a", "Node").is_some_and(|node| node.is_abstract));
    }

    #[test]
    fn nodes_are_scoped_by_subgraph() {
        let mut graph = Graph::new();

        graph.set_subgraph_name("a");
        add_membership(&mut graph, "Node", "User");
        graph.set_subgraph_name("b");
        add_membership(&mut graph, "Node", "Product");
        add_membership(&mut graph, "Node", "Review");
        add_membership(&mut graph, "Node", "Review");

        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.concrete_type_names("a", "Node"), vec!["User"]);
        assert_eq!(graph.concrete_type_names("b", "Node"), vec!["Product", "Review"]);
    }

    #[test]
    fn replayed_recording_matches_direct_mutation() {
        let mut direct = Graph::new();
        direct.set_subgraph_name("a");
        add_membership(&mut direct, "Node", "User");
        direct.add_or_update_node("Color", NodeOptions::LEAF);

        let mut recording = RecordingGraph::new();
        recording.set_subgraph_name("a");
        add_membership(&mut recording, "Node", "User");
        recording.add_or_update_node("Color", NodeOptions::LEAF);

        let mut replayed = Graph::new();
        recording.replay(&mut replayed);

        assert_eq!(replayed.node_count(), direct.node_count());
        assert_eq!(replayed.edge_count(), direct.edge_count());
        assert_eq!(replayed.node("a", "Color"), direct.node("a", "Color"));
        assert_eq!(replayed.concrete_type_names("a", "Node"), vec!["User"]);
    }
}
