//! 可达图：按标识去重的节点与按 (前驱, 迁移, 后继) 去重的边。
use std::fmt;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::Result;
use crate::net::{Marking, Net, TransitionId};

/// Fires `transition` on `net` and records the step in `graph`.
/// Returns the marking reached.
pub fn fire_and_record(
    net: &mut Net,
    graph: &mut ReachabilityGraph,
    transition: TransitionId,
) -> Result<Marking> {
    let before = net.marking();
    net.fire_id(transition)?;
    let after = net.marking();
    graph.record_transition(&before, &after, &net.transitions[transition].id);
    Ok(after)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateNode {
    pub marking: Marking,
}

impl fmt::Display for StateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.marking)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEdge {
    pub transition: String,
}

impl fmt::Display for StateEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.transition)
    }
}

/// The most recently recorded firing, kept for highlighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEdge {
    pub from: Marking,
    pub transition: String,
    pub to: Marking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateGraphStats {
    pub state_count: usize,
    pub edge_count: usize,
}

#[derive(Debug, Clone)]
pub struct ReachabilityGraph {
    graph: DiGraph<StateNode, StateEdge>,
    markings: IndexMap<Marking, NodeIndex>,
    edges: IndexMap<(NodeIndex, String, NodeIndex), EdgeIndex>,
    initial: NodeIndex,
    last: Option<RecordedEdge>,
}

impl ReachabilityGraph {
    pub fn new(initial: Marking) -> Self {
        let mut graph = DiGraph::new();
        let index = graph.add_node(StateNode {
            marking: initial.clone(),
        });
        let mut markings = IndexMap::new();
        markings.insert(initial, index);
        Self {
            graph,
            markings,
            edges: IndexMap::new(),
            initial: index,
            last: None,
        }
    }

    /// Returns the node of `marking`, creating it on first sight.
    pub fn ensure_node(&mut self, marking: &Marking) -> NodeIndex {
        if let Some(&index) = self.markings.get(marking) {
            return index;
        }
        let index = self.graph.add_node(StateNode {
            marking: marking.clone(),
        });
        self.markings.insert(marking.clone(), index);
        index
    }

    /// Adds the edge `from --transition--> to` unless it already exists.
    /// Returns whether a new edge was created.
    pub fn record_transition(&mut self, from: &Marking, to: &Marking, transition: &str) -> bool {
        let source = self.ensure_node(from);
        let target = self.ensure_node(to);
        let key = (source, transition.to_string(), target);
        let created = if self.edges.contains_key(&key) {
            false
        } else {
            let edge = self.graph.add_edge(
                source,
                target,
                StateEdge {
                    transition: transition.to_string(),
                },
            );
            self.edges.insert(key, edge);
            true
        };
        self.last = Some(RecordedEdge {
            from: from.clone(),
            transition: transition.to_string(),
            to: to.clone(),
        });
        created
    }

    /// Drops every node and edge and reseeds with `initial`.
    pub fn reset(&mut self, initial: Marking) {
        *self = Self::new(initial);
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn stats(&self) -> StateGraphStats {
        StateGraphStats {
            state_count: self.node_count(),
            edge_count: self.edge_count(),
        }
    }

    pub fn initial(&self) -> &Marking {
        &self.graph[self.initial].marking
    }

    pub fn last_recorded(&self) -> Option<&RecordedEdge> {
        self.last.as_ref()
    }

    pub fn contains_marking(&self, marking: &Marking) -> bool {
        self.markings.contains_key(marking)
    }

    /// Markings in discovery order.
    pub fn markings(&self) -> impl Iterator<Item = &Marking> {
        self.markings.keys()
    }

    /// Edges as `(from, transition, to)` in recording order.
    pub fn edges(&self) -> impl Iterator<Item = (&Marking, &str, &Marking)> {
        self.edges.values().map(|&edge| {
            let (source, target) = self.graph.edge_endpoints(edge).unwrap_or_default();
            (
                &self.graph[source].marking,
                self.graph[edge].transition.as_str(),
                &self.graph[target].marking,
            )
        })
    }

    pub fn graph(&self) -> &DiGraph<StateNode, StateEdge> {
        &self.graph
    }

    /// Renders the graph in DOT. Consecutive markings of `path` are drawn
    /// as a highlighted path.
    pub fn to_dot(&self, path: &[Marking]) -> String {
        fn escape(s: &str) -> String {
            s.replace('\\', "\\\\").replace('"', "\\\"")
        }

        let on_path = |source: NodeIndex, target: NodeIndex| {
            path.windows(2).any(|pair| {
                self.markings.get(&pair[0]) == Some(&source)
                    && self.markings.get(&pair[1]) == Some(&target)
            })
        };

        let edge_attr = |_, edge: petgraph::graph::EdgeReference<'_, StateEdge>| -> String {
            let label = escape(&edge.weight().transition);
            if on_path(edge.source(), edge.target()) {
                format!("label=\"{}\", color=red, penwidth=2", label)
            } else {
                format!("label=\"{}\"", label)
            }
        };

        let node_attr = |_, (index, node): (NodeIndex, &StateNode)| -> String {
            let label = escape(&node.marking.to_string());
            let mut attrs = format!("label=\"{}\"", label);
            if index == self.initial {
                attrs.push_str(", shape=doublecircle");
            }
            if path.first() == Some(&node.marking) || path.last() == Some(&node.marking) {
                attrs.push_str(", style=filled, fillcolor=\"#ffcdd2\"");
            }
            attrs
        };

        format!(
            "{}",
            Dot::with_attr_getters(
                &self.graph,
                &[Config::EdgeNoLabel, Config::NodeNoLabel],
                &edge_attr,
                &node_attr
            )
        )
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P, highlight: &[Marking]) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_dot(highlight))
    }
}
