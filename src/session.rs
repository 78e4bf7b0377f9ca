//! Session facade: one net, its reachability graph and change notification.
//!
//! Every successful mutation marks the session dirty and is announced to
//! the registered subscribers synchronously, before the call returns.
//! Consumers that prefer polling call [`Session::take_snapshot`].
use std::fmt;

use log::info;

use crate::analysis::boundness::{BoundnessResult, UnboundedWitness, check_boundness};
use crate::analysis::reachability::{RecordedEdge, ReachabilityGraph, fire_and_record};
use crate::error::{NetError, Result};
use crate::net::{Marking, Net, NetDefinition, NodeRef, Tokens};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetEvent {
    Fired {
        transition: String,
        from: Marking,
        to: Marking,
    },
    Reset {
        marking: Marking,
    },
    InitialMarkingChanged {
        initial: Marking,
    },
    GraphCleared {
        initial: Marking,
    },
    AnalysisFinished {
        bounded: bool,
    },
}

/// Current marking and activation state, as handed to a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub marking: Marking,
    pub activated: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub bounded: bool,
    pub nodes: usize,
    pub edges: usize,
    pub witness: Option<UnboundedWitness>,
}

impl AnalysisSummary {
    pub fn new(result: BoundnessResult, graph: &ReachabilityGraph) -> Self {
        let witness = match result {
            BoundnessResult::Bounded => None,
            BoundnessResult::Unbounded(witness) => Some(witness),
        };
        Self {
            bounded: witness.is_none(),
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            witness,
        }
    }
}

impl fmt::Display for AnalysisSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.witness {
            None => write!(f, "bounded: yes | {} / {}", self.nodes, self.edges),
            Some(witness) => write!(f, "bounded: no  | {}", witness),
        }
    }
}

type Subscriber = Box<dyn FnMut(&NetEvent)>;

pub struct Session {
    net: Net,
    graph: ReachabilityGraph,
    dirty: bool,
    subscribers: Vec<Subscriber>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("net", &self.net)
            .field("graph", &self.graph.stats())
            .field("dirty", &self.dirty)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Session {
    /// Connects the arcs if needed and seeds the graph with the current
    /// marking.
    pub fn new(mut net: Net) -> Result<Self> {
        if !net.is_connected() {
            net.connect_arcs()?;
        }
        let graph = ReachabilityGraph::new(net.marking());
        Ok(Self {
            net,
            graph,
            dirty: true,
            subscribers: Vec::new(),
        })
    }

    pub fn build(definition: &NetDefinition) -> Result<Self> {
        Self::new(Net::build(definition)?)
    }

    pub fn net(&self) -> &Net {
        &self.net
    }

    pub fn graph(&self) -> &ReachabilityGraph {
        &self.graph
    }

    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&NetEvent) + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    fn changed(&mut self, event: NetEvent) {
        self.dirty = true;
        for subscriber in self.subscribers.iter_mut() {
            subscriber(&event);
        }
    }

    pub fn fire(&mut self, transition: &str) -> Result<()> {
        let id = self
            .net
            .transition_id(transition)
            .ok_or_else(|| NetError::UnknownId(transition.to_string()))?;
        let from = self.net.marking();
        let to = fire_and_record(&mut self.net, &mut self.graph, id)?;
        self.changed(NetEvent::Fired {
            transition: transition.to_string(),
            from,
            to,
        });
        Ok(())
    }

    pub fn reset_to_initial(&mut self) {
        self.net.reset_to_initial();
        let marking = self.net.marking();
        self.changed(NetEvent::Reset { marking });
    }

    pub fn reset_to_marking(&mut self, marking: &str) -> Result<()> {
        self.net.reset_to_marking(marking)?;
        let marking = self.net.marking();
        self.changed(NetEvent::Reset { marking });
        Ok(())
    }

    /// Sets one place's initial (and current) count and reseeds the graph
    /// with the new initial marking.
    pub fn set_initial_marking(&mut self, place: &str, count: Tokens) -> Result<()> {
        self.net.set_initial_marking(place, count)?;
        let initial = self.net.initial_marking();
        self.graph.reset(initial.clone());
        self.changed(NetEvent::InitialMarkingChanged { initial });
        Ok(())
    }

    /// Steps one place's token count by `delta` and adopts the resulting
    /// current marking as the initial marking of the whole net.
    pub fn adjust_initial_marking(&mut self, place: &str, delta: Tokens) -> Result<()> {
        let id = self
            .net
            .place_id(place)
            .ok_or_else(|| NetError::UnknownId(place.to_string()))?;
        let current = self.net.places[id].tokens;
        let tokens = match current.checked_add(delta) {
            Some(tokens) if tokens >= 0 => tokens,
            Some(tokens) => {
                return Err(NetError::NegativeMarking {
                    place: place.to_string(),
                    tokens,
                });
            }
            None => {
                return Err(NetError::malformed(
                    &self.net.marking().to_string(),
                    format!("token count of `{}` overflows", place),
                ));
            }
        };
        self.net.set_initial_marking(place, tokens)?;
        self.net.commit_initial_marking();
        let initial = self.net.initial_marking();
        self.graph.reset(initial.clone());
        self.changed(NetEvent::InitialMarkingChanged { initial });
        Ok(())
    }

    /// Returns to the initial marking and drops everything the graph
    /// recorded so far.
    pub fn clear_graph(&mut self) {
        self.net.reset_to_initial();
        let initial = self.net.marking();
        self.graph.reset(initial.clone());
        self.changed(NetEvent::GraphCleared { initial });
    }

    pub fn analyze_boundedness(&mut self) -> Result<BoundnessResult> {
        let result = check_boundness(&mut self.net, &mut self.graph)?;
        info!(
            "analysis finished: {} ({} nodes, {} edges)",
            if result.is_bounded() { "bounded" } else { "unbounded" },
            self.graph.node_count(),
            self.graph.edge_count()
        );
        self.changed(NetEvent::AnalysisFinished {
            bounded: result.is_bounded(),
        });
        Ok(result)
    }

    pub fn analyze(&mut self) -> Result<AnalysisSummary> {
        let result = self.analyze_boundedness()?;
        Ok(AnalysisSummary::new(result, &self.graph))
    }

    pub fn marking(&self) -> String {
        self.net.marking().to_string()
    }

    pub fn current_marking(&self) -> Marking {
        self.net.marking()
    }

    pub fn activated_transitions(&self) -> Vec<String> {
        self.net
            .activated_transitions()
            .into_iter()
            .map(|transition| self.net.transitions[transition].id.clone())
            .collect()
    }

    pub fn node(&self, id: &str) -> Option<NodeRef<'_>> {
        self.net.node(id)
    }

    pub fn graph_node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn graph_edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn last_recorded(&self) -> Option<&RecordedEdge> {
        self.graph.last_recorded()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            marking: self.net.marking(),
            activated: self.activated_transitions(),
        }
    }

    /// Returns a snapshot if anything changed since the last call.
    pub fn take_snapshot(&mut self) -> Option<Snapshot> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn pipeline() -> Session {
        Session::build(
            &NetDefinition::default()
                .place("p1", 1)
                .place("p2", 0)
                .transition("t1")
                .arc("a1", "p1", "t1")
                .arc("a2", "t1", "p2"),
        )
        .unwrap()
    }

    #[test]
    fn construction_seeds_graph() {
        let mut session = pipeline();
        assert_eq!(session.marking(), "(1|0)");
        assert_eq!(session.graph_node_count(), 1);
        assert_eq!(session.graph_edge_count(), 0);
        assert_eq!(session.activated_transitions(), vec!["t1"]);
        assert!(session.take_snapshot().is_some());
        assert!(session.take_snapshot().is_none());
    }

    #[test]
    fn firing_records_edge_and_notifies() {
        let mut session = pipeline();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        session.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        session.take_snapshot();

        session.fire("t1").unwrap();
        assert_eq!(session.graph_edge_count(), 1);
        let last = session.last_recorded().unwrap();
        assert_eq!(last.from.to_string(), "(1|0)");
        assert_eq!(last.to.to_string(), "(0|1)");

        let snapshot = session.take_snapshot().unwrap();
        assert_eq!(snapshot.marking.to_string(), "(0|1)");
        assert!(snapshot.activated.is_empty());
        assert_eq!(events.borrow().len(), 1);
        assert!(matches!(&events.borrow()[0], NetEvent::Fired { transition, .. } if transition == "t1"));
    }

    #[test]
    fn failed_fire_changes_nothing() {
        let mut session = pipeline();
        session.fire("t1").unwrap();
        session.take_snapshot();
        assert_eq!(session.fire("t1"), Err(NetError::InvalidFire("t1".into())));
        assert!(!session.is_dirty());
        assert_eq!(session.graph_edge_count(), 1);
    }

    #[test]
    fn repeated_firing_keeps_one_edge() {
        let mut session = pipeline();
        session.fire("t1").unwrap();
        session.reset_to_initial();
        session.fire("t1").unwrap();
        assert_eq!(session.graph_edge_count(), 1);
        assert_eq!(session.graph_node_count(), 2);
    }

    #[test]
    fn adjust_initial_marking_commits_current_marking() {
        let mut session = pipeline();
        session.fire("t1").unwrap();
        session.adjust_initial_marking("p2", 1).unwrap();
        assert_eq!(session.net().initial_marking().to_string(), "(0|2)");
        assert_eq!(session.graph_node_count(), 1);
        assert_eq!(session.graph().initial().to_string(), "(0|2)");

        assert!(matches!(
            session.adjust_initial_marking("p1", -1),
            Err(NetError::NegativeMarking { .. })
        ));
        assert_eq!(session.marking(), "(0|2)");

        assert!(matches!(
            session.adjust_initial_marking("p2", Tokens::MAX),
            Err(NetError::MalformedMarking { .. })
        ));
        assert!(matches!(
            session.adjust_initial_marking("p1", Tokens::MIN),
            Err(NetError::NegativeMarking { .. })
        ));
        assert_eq!(session.marking(), "(0|2)");
    }

    #[test]
    fn clear_graph_returns_to_initial() {
        let mut session = pipeline();
        session.fire("t1").unwrap();
        session.clear_graph();
        assert_eq!(session.marking(), "(1|0)");
        assert_eq!(session.graph_edge_count(), 0);
    }

    #[test]
    fn analysis_notifies_once() {
        let mut session = pipeline();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        session.subscribe(move |_| *sink.borrow_mut() += 1);

        let summary = session.analyze().unwrap();
        assert!(summary.bounded);
        assert_eq!((summary.nodes, summary.edges), (2, 1));
        assert_eq!(summary.to_string(), "bounded: yes | 2 / 1");
        assert_eq!(*count.borrow(), 1);
    }
}
