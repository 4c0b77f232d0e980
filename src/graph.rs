//! List Relationship Graph
//!
//! Directed graph over lists, one edge per directional reference: a two-sided
//! relationship contributes an edge each way, a one-sided one a single edge.
//! Used for lints and for GraphViz export.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};
use petgraph::Direction;
use std::collections::HashMap;

use crate::registry::{ListId, RelationId, SchemaRegistry, Side};

/// Edge payload: the relationship field that makes the reference
#[derive(Debug, Clone)]
pub struct RefEdge {
    pub relation: RelationId,
    pub side: Side,
    /// Field key on the source list
    pub field: String,
    pub many: bool,
}

pub struct RelationGraph<'a> {
    registry: &'a SchemaRegistry,
    graph: DiGraph<ListId, RefEdge>,
    node_indices: HashMap<ListId, NodeIndex>,
}

impl<'a> RelationGraph<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        let mut graph = DiGraph::with_capacity(registry.list_count(), registry.relations().len() * 2);
        let mut node_indices = HashMap::with_capacity(registry.list_count());
        for (id, _) in registry.lists() {
            node_indices.insert(id, graph.add_node(id));
        }

        for relation in registry.relations() {
            for side in [Side::Left, Side::Right] {
                let from = relation.end(side);
                let to = relation.end(side.opposite());
                let Some(field) = from.field else { continue };
                graph.add_edge(
                    node_indices[&from.list],
                    node_indices[&to.list],
                    RefEdge {
                        relation: relation.id,
                        side,
                        field: registry.field(field).key.clone(),
                        many: from.many,
                    },
                );
            }
        }

        Self {
            registry,
            graph,
            node_indices,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Lists referenced by `list`
    pub fn refs_out(&self, list: ListId) -> Vec<ListId> {
        self.neighbors(list, Direction::Outgoing)
    }

    /// Lists that reference `list`
    pub fn refs_in(&self, list: ListId) -> Vec<ListId> {
        self.neighbors(list, Direction::Incoming)
    }

    fn neighbors(&self, list: ListId, direction: Direction) -> Vec<ListId> {
        let Some(&idx) = self.node_indices.get(&list) else {
            return Vec::new();
        };
        let mut out: Vec<ListId> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| match direction {
                Direction::Outgoing => self.graph[e.target()],
                Direction::Incoming => self.graph[e.source()],
            })
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Lists reachable by following references from any of `roots`
    pub fn reachable_from(&self, roots: &[ListId]) -> Vec<ListId> {
        let mut seen = vec![false; self.graph.node_count()];
        for root in roots {
            let Some(&start) = self.node_indices.get(root) else {
                continue;
            };
            let mut bfs = Bfs::new(&self.graph, start);
            while let Some(node) = bfs.next(&self.graph) {
                seen[node.index()] = true;
            }
        }
        seen.iter()
            .enumerate()
            .filter(|(_, s)| **s)
            .map(|(i, _)| self.graph[NodeIndex::new(i)])
            .collect()
    }

    /// Export the relationship graph to GraphViz DOT format
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph Lists {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10];\n");
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8, fontcolor=\"#606060\"];\n\n");

        for (_, list) in self.registry.lists() {
            let color = if list.ui.is_hidden { "#E0E0E0" } else { "#B3E5FC" };
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\", fillcolor=\"{}\"];\n",
                list.key, list.key, color
            ));
        }

        output.push('\n');

        // One edge per relation, labelled with both field keys
        for relation in self.registry.relations() {
            let left = self.registry.list(relation.left.list);
            let right = self.registry.list(relation.right.list);
            let left_field = relation
                .left
                .field
                .map(|f| self.registry.field(f).key.as_str())
                .unwrap_or("");
            let right_field = relation
                .right
                .field
                .map(|f| self.registry.field(f).key.as_str())
                .unwrap_or("");
            let dir = if relation.is_one_sided() { "forward" } else { "both" };
            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{} / {}\", dir={}, arrowhead={}, arrowtail={}];\n",
                left.key,
                right.key,
                left_field,
                right_field,
                dir,
                arrow(relation.left.many),
                arrow(relation.right.many),
            ));
        }

        output.push_str("}\n");
        output
    }
}

fn arrow(many: bool) -> &'static str {
    if many {
        "crow"
    } else {
        "tee"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_edges_per_relation() {
        let registry = SchemaRegistry::builtin().unwrap();
        let graph = RelationGraph::new(&registry);
        assert_eq!(graph.edge_count(), registry.relations().len() * 2);
    }

    #[test]
    fn test_neighbors() {
        let registry = SchemaRegistry::builtin().unwrap();
        let graph = RelationGraph::new(&registry);
        let user = registry.list_id("User").unwrap();
        let keys: Vec<_> = graph
            .refs_out(user)
            .into_iter()
            .map(|id| registry.list(id).key.as_str())
            .collect();
        assert_eq!(keys, vec!["District", "AccountType", "Poll", "Response"]);

        let tag = registry.list_id("Tag").unwrap();
        let poll = registry.list_id("Poll").unwrap();
        assert_eq!(graph.refs_in(tag), vec![poll]);
    }

    #[test]
    fn test_reachable_from() {
        let registry = SchemaRegistry::builtin().unwrap();
        let graph = RelationGraph::new(&registry);
        let tag = registry.list_id("Tag").unwrap();
        // every list is connected to Tag through Poll
        assert_eq!(graph.reachable_from(&[tag]).len(), registry.list_count());
    }

    #[test]
    fn test_dot_output() {
        let registry = SchemaRegistry::builtin().unwrap();
        let dot = RelationGraph::new(&registry).to_dot();
        assert!(dot.starts_with("digraph Lists {"));
        assert!(dot.contains("\"Poll\" -> \"Tag\" [label=\"tags / polls\", dir=both, arrowhead=crow, arrowtail=crow]"));
        assert!(dot.contains("\"Answer\" [label=\"Answer\", fillcolor=\"#E0E0E0\"]"));
    }
}
