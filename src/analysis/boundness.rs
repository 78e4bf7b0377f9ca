//! Petri 网有界性分析
//!
//! Depth-first coverability search over the concrete reachable markings.
//! Each newly reached marking is compared against the markings on the
//! current path; a marking that covers one of its ancestors proves that the
//! path in between can be repeated forever, and the search stops with that
//! pair as witness. The reachability graph grows as a side effect of every
//! firing the search performs.
//!
//! Markings already expanded anywhere in the search are not expanded again.
//! This keeps the search finite on bounded nets but is not complete: an
//! unbounded pump that is only reachable through a second route to an
//! already expanded marking is never examined. There is no ω-acceleration
//! either, so this is weaker than a Karp–Miller tree.

use std::fmt;

use itertools::Itertools;
use log::{debug, info};
use rustc_hash::FxHashSet;

use crate::analysis::reachability::{ReachabilityGraph, fire_and_record};
use crate::error::{NetError, Result};
use crate::net::{Marking, Net, TransitionId};

/// 有界性检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundnessResult {
    Bounded,
    Unbounded(UnboundedWitness),
}

impl BoundnessResult {
    pub fn is_bounded(&self) -> bool {
        matches!(self, BoundnessResult::Bounded)
    }

    pub fn witness(&self) -> Option<&UnboundedWitness> {
        match self {
            BoundnessResult::Bounded => None,
            BoundnessResult::Unbounded(witness) => Some(witness),
        }
    }
}

impl fmt::Display for BoundnessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundnessResult::Bounded => write!(f, "bounded"),
            BoundnessResult::Unbounded(witness) => write!(f, "unbounded, witness {}", witness),
        }
    }
}

/// Proof of unboundedness: `descendant` covers `ancestor` and is reached
/// from it by firing `transitions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnboundedWitness {
    pub ancestor: Marking,
    pub descendant: Marking,
    /// Markings from `ancestor` to `descendant`, both included.
    pub markings: Vec<Marking>,
    /// Transitions fired between `ancestor` and `descendant`.
    pub transitions: Vec<String>,
    /// Every transition fired from the initial marking to `descendant`.
    pub firing_sequence: Vec<String>,
}

impl fmt::Display for UnboundedWitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:({}); {}, {}",
            self.firing_sequence.len(),
            self.firing_sequence.iter().join(","),
            self.ancestor,
            self.descendant
        )
    }
}

/// Markings on the current depth-first path together with the transition
/// that reached each of them. The root entry has no transition.
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    markings: Vec<Marking>,
    transitions: Vec<Option<TransitionId>>,
}

impl SearchPath {
    pub fn push(&mut self, marking: Marking, via: Option<TransitionId>) {
        self.markings.push(marking);
        self.transitions.push(via);
    }

    pub fn pop(&mut self) -> Option<(Marking, Option<TransitionId>)> {
        let marking = self.markings.pop()?;
        let via = self.transitions.pop().flatten();
        Some((marking, via))
    }

    pub fn truncate(&mut self, len: usize) {
        self.markings.truncate(len);
        self.transitions.truncate(len);
    }

    pub fn len(&self) -> usize {
        self.markings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markings.is_empty()
    }

    pub fn top(&self) -> Option<&Marking> {
        self.markings.last()
    }

    pub fn markings(&self) -> &[Marking] {
        &self.markings
    }

    /// Position of the nearest ancestor covered by `marking`.
    pub fn dominated_ancestor(&self, marking: &Marking) -> Option<usize> {
        self.markings
            .iter()
            .rposition(|ancestor| marking.dominates(ancestor))
    }

    fn transitions_from(&self, start: usize) -> impl Iterator<Item = TransitionId> + '_ {
        self.transitions[start..].iter().flatten().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    /// Expanded before somewhere in the search.
    Known,
    /// Covers the path entry at this position.
    Dominates(usize),
    Fresh,
}

#[derive(Debug)]
struct Frame {
    marking: Marking,
    pending: std::vec::IntoIter<TransitionId>,
    /// Path length with this frame's marking on top.
    depth: usize,
}

/// State of one running search, cleared at the start of every run.
#[derive(Debug, Default)]
pub struct CoverabilitySearch {
    visited: FxHashSet<Marking>,
    path: SearchPath,
    frames: Vec<Frame>,
    firings: usize,
}

impl CoverabilitySearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transitions fired so far.
    pub fn firings(&self) -> usize {
        self.firings
    }

    /// Number of distinct markings expanded so far.
    pub fn expanded(&self) -> usize {
        self.visited.len()
    }

    /// Explores `net` from its initial marking. Both the net and `graph`
    /// are reset first; the graph holds every firing the search made.
    ///
    /// A bounded result leaves the net in its initial marking, an
    /// unbounded one leaves it in the witness descendant.
    pub fn run(&mut self, net: &mut Net, graph: &mut ReachabilityGraph) -> Result<BoundnessResult> {
        if !net.is_connected() {
            return Err(NetError::NotConnected);
        }
        *self = Self::new();
        net.reset_to_initial();
        graph.reset(net.marking());
        let root = net.marking();
        info!("coverability search from {}", root);
        self.expand(root, None, net);

        loop {
            let Some(frame) = self.frames.last_mut() else {
                break;
            };
            let Some(transition) = frame.pending.next() else {
                self.frames.pop();
                continue;
            };
            let depth = frame.depth;
            let marking = frame.marking.clone();

            self.path.truncate(depth);
            net.restore(&marking)?;
            let next = fire_and_record(net, graph, transition)?;
            self.firings += 1;

            match self.classify(&next) {
                Visit::Known => {
                    debug!("{} already explored", next);
                    self.path.push(next, Some(transition));
                }
                Visit::Dominates(position) => {
                    let witness = self.witness(position, next, transition, net);
                    info!(
                        "unbounded after {} firings: {} covers {}",
                        self.firings, witness.descendant, witness.ancestor
                    );
                    return Ok(BoundnessResult::Unbounded(witness));
                }
                Visit::Fresh => self.expand(next, Some(transition), net),
            }
        }

        info!(
            "bounded after {} firings, {} markings",
            self.firings,
            self.visited.len()
        );
        net.reset_to_initial();
        Ok(BoundnessResult::Bounded)
    }

    fn classify(&self, marking: &Marking) -> Visit {
        if self.visited.contains(marking) {
            return Visit::Known;
        }
        match self.path.dominated_ancestor(marking) {
            Some(position) => Visit::Dominates(position),
            None => Visit::Fresh,
        }
    }

    /// `net` must currently be in `marking`.
    fn expand(&mut self, marking: Marking, via: Option<TransitionId>, net: &Net) {
        let pending = net.activated_transitions();
        debug!(
            "expanding {} at depth {} with {} activated transitions",
            marking,
            self.path.len(),
            pending.len()
        );
        self.visited.insert(marking.clone());
        self.path.push(marking.clone(), via);
        self.frames.push(Frame {
            marking,
            pending: pending.into_iter(),
            depth: self.path.len(),
        });
    }

    fn witness(
        &self,
        position: usize,
        descendant: Marking,
        last: TransitionId,
        net: &Net,
    ) -> UnboundedWitness {
        let name = |transition: TransitionId| net.transitions[transition].id.clone();

        let mut markings = self.path.markings()[position..].to_vec();
        markings.push(descendant.clone());

        let transitions = self
            .path
            .transitions_from(position + 1)
            .chain(std::iter::once(last))
            .map(name)
            .collect();
        let firing_sequence = self
            .path
            .transitions_from(0)
            .chain(std::iter::once(last))
            .map(name)
            .collect();

        UnboundedWitness {
            ancestor: self.path.markings()[position].clone(),
            descendant,
            markings,
            transitions,
            firing_sequence,
        }
    }
}

/// Runs a fresh [`CoverabilitySearch`] on `net`.
pub fn check_boundness(net: &mut Net, graph: &mut ReachabilityGraph) -> Result<BoundnessResult> {
    CoverabilitySearch::new().run(net, graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::NetDefinition;

    fn analyze(definition: NetDefinition) -> (BoundnessResult, ReachabilityGraph, Net) {
        let mut net = Net::build(&definition).unwrap();
        let mut graph = ReachabilityGraph::new(net.marking());
        let result = check_boundness(&mut net, &mut graph).unwrap();
        (result, graph, net)
    }

    /// p0 -> t0 -> p1 -> t1 -> p0
    fn build_bounded_net() -> NetDefinition {
        NetDefinition::default()
            .place("p0", 1)
            .place("p1", 0)
            .transition("t0")
            .transition("t1")
            .arc("a0", "p0", "t0")
            .arc("a1", "t0", "p1")
            .arc("a2", "p1", "t1")
            .arc("a3", "t1", "p0")
    }

    /// p0 -> t0 -> p0 + p1
    fn build_unbounded_net() -> NetDefinition {
        NetDefinition::default()
            .place("p0", 1)
            .place("p1", 0)
            .transition("t0")
            .arc("a0", "p0", "t0")
            .arc("a1", "t0", "p0")
            .arc("a2", "t0", "p1")
    }

    #[test]
    fn bounded_cycle() {
        let (result, graph, net) = analyze(build_bounded_net());
        assert!(result.is_bounded());
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(net.marking(), net.initial_marking());
    }

    #[test]
    fn token_generator_is_unbounded() {
        let (result, graph, net) = analyze(build_unbounded_net());
        let witness = result.witness().expect("net should be unbounded");
        assert_eq!(witness.ancestor.to_string(), "(1|0)");
        assert_eq!(witness.descendant.to_string(), "(1|1)");
        assert_eq!(witness.transitions, vec!["t0"]);
        assert_eq!(witness.markings.len(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(net.marking(), witness.descendant);
    }

    #[test]
    fn witness_uses_nearest_dominated_ancestor() {
        // t0 moves the token p0 -> p1, t1 puts it back and adds one to p2.
        let definition = NetDefinition::default()
            .place("p0", 1)
            .place("p1", 0)
            .place("p2", 0)
            .transition("t0")
            .transition("t1")
            .arc("a0", "p0", "t0")
            .arc("a1", "t0", "p1")
            .arc("a2", "p1", "t1")
            .arc("a3", "t1", "p0")
            .arc("a4", "t1", "p2");
        let (result, _, _) = analyze(definition);
        let witness = result.witness().unwrap();

        assert_eq!(witness.ancestor.to_string(), "(1|0|0)");
        assert_eq!(witness.descendant.to_string(), "(1|0|1)");
        assert_eq!(witness.transitions, vec!["t0", "t1"]);
        assert_eq!(witness.firing_sequence, vec!["t0", "t1"]);
        assert_eq!(witness.to_string(), "2:(t0,t1); (1|0|0), (1|0|1)");
    }

    #[test]
    fn dead_net_is_bounded_with_single_node() {
        let definition = NetDefinition::default()
            .place("p", 0)
            .transition("t")
            .arc("a", "p", "t");
        let (result, graph, _) = analyze(definition);
        assert!(result.is_bounded());
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn search_path_moves_in_lock_step() {
        let mut path = SearchPath::default();
        path.push(Marking::new(vec![1, 0]), None);
        path.push(Marking::new(vec![0, 1]), Some(TransitionId::new(0)));
        path.push(Marking::new(vec![1, 1]), Some(TransitionId::new(1)));

        assert_eq!(path.dominated_ancestor(&Marking::new(vec![1, 2])), Some(2));
        assert_eq!(path.dominated_ancestor(&Marking::new(vec![2, 0])), Some(0));
        assert_eq!(path.dominated_ancestor(&Marking::new(vec![0, 0])), None);

        let (marking, via) = path.pop().unwrap();
        assert_eq!(marking, Marking::new(vec![1, 1]));
        assert_eq!(via, Some(TransitionId::new(1)));
        path.truncate(1);
        assert_eq!(path.len(), 1);
        assert_eq!(path.pop(), Some((Marking::new(vec![1, 0]), None)));
        assert!(path.is_empty());
    }

    #[test]
    fn unconnected_net_is_not_analyzed() {
        let mut net = Net::empty();
        net.add_place("p").unwrap();
        net.add_transition("t").unwrap();
        net.add_arc("a", "t", "p").unwrap();
        net.set_initial_marking("p", 1).unwrap();
        let mut graph = ReachabilityGraph::new(net.marking());

        assert_eq!(check_boundness(&mut net, &mut graph), Err(NetError::NotConnected));
        assert_eq!(graph.node_count(), 1);

        net.connect_arcs().unwrap();
        assert!(!check_boundness(&mut net, &mut graph).unwrap().is_bounded());
    }
}
