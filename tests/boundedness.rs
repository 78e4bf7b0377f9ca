use std::fs;

use pnbound::analysis::{CoverabilitySearch, ReachabilityGraph};
use pnbound::net::io::read_definition;
use pnbound::{BoundnessResult, Net, NetDefinition, NetError, Session};

fn self_loop() -> NetDefinition {
    NetDefinition::default()
        .place("p", 1)
        .transition("t")
        .arc("in", "p", "t")
        .arc("out", "t", "p")
}

fn generator() -> NetDefinition {
    NetDefinition::default()
        .place("p", 1)
        .transition("t")
        .arc("out", "t", "p")
}

/// Two independent transitions whose interleavings meet in the same marking.
fn diamond() -> NetDefinition {
    NetDefinition::default()
        .place("a", 1)
        .place("b", 1)
        .place("c", 0)
        .place("d", 0)
        .place("e", 0)
        .transition("t1")
        .transition("t2")
        .transition("t3")
        .arc("a1", "a", "t1")
        .arc("a2", "t1", "c")
        .arc("a3", "b", "t2")
        .arc("a4", "t2", "d")
        .arc("a5", "c", "t3")
        .arc("a6", "d", "t3")
        .arc("a7", "t3", "e")
}

#[test]
fn self_loop_is_bounded() {
    let mut session = Session::build(&self_loop()).unwrap();
    let result = session.analyze_boundedness().unwrap();

    assert_eq!(result, BoundnessResult::Bounded);
    assert_eq!(session.graph_node_count(), 1);
    assert_eq!(session.graph_edge_count(), 1);
    assert_eq!(session.marking(), "(1)");
}

#[test]
fn generator_is_unbounded_with_first_dominated_pair() {
    let mut session = Session::build(&generator()).unwrap();
    session.fire("t").unwrap();
    assert_eq!(session.marking(), "(2)");
    session.fire("t").unwrap();
    assert_eq!(session.marking(), "(3)");

    let result = session.analyze_boundedness().unwrap();
    let witness = result.witness().unwrap();
    assert_eq!(witness.ancestor.to_string(), "(1)");
    assert_eq!(witness.descendant.to_string(), "(2)");
    assert_eq!(witness.transitions, vec!["t"]);
    assert_eq!(witness.to_string(), "1:(t); (1), (2)");
    assert_eq!(session.marking(), "(2)");
}

#[test]
fn reset_restores_constructed_marking() {
    let mut session = Session::build(&diamond()).unwrap();
    let constructed = session.marking();
    for transition in ["t2", "t1", "t3"] {
        session.fire(transition).unwrap();
    }
    assert_eq!(session.marking(), "(0|0|0|0|1)");

    session.reset_to_initial();
    assert_eq!(session.marking(), constructed);
    assert_eq!(session.activated_transitions(), vec!["t1", "t2"]);
}

#[test]
fn reset_to_marking_round_trips() {
    let mut session = Session::build(&diamond()).unwrap();
    for text in ["(0|3|-1|0|2)", "(1|1|0|0|0)", "(0|0|0|0|0)"] {
        session.reset_to_marking(text).unwrap();
        assert_eq!(session.marking(), text);
    }

    let before = session.marking();
    for text in ["(1|2)", "(01|0|0|0|0)", "(-0|0|0|0|0)"] {
        assert!(matches!(
            session.reset_to_marking(text),
            Err(NetError::MalformedMarking { .. })
        ));
    }
    assert_eq!(session.marking(), before);
}

#[test]
fn graph_recording_is_idempotent() {
    let mut session = Session::build(&self_loop()).unwrap();
    for _ in 0..3 {
        session.fire("t").unwrap();
    }
    assert_eq!(session.graph_node_count(), 1);
    assert_eq!(session.graph_edge_count(), 1);

    session.analyze_boundedness().unwrap();
    session.analyze_boundedness().unwrap();
    assert_eq!(session.graph_edge_count(), 1);
}

/// Markings are remembered across the whole search, not per path: the
/// marking both interleavings meet in is expanded the first time only, and
/// the second arrival just records its edge.
#[test]
fn marking_reached_twice_is_expanded_once() {
    let mut net = Net::build(&diamond()).unwrap();
    let mut graph = ReachabilityGraph::new(net.marking());
    let mut search = CoverabilitySearch::new();

    let result = search.run(&mut net, &mut graph).unwrap();
    assert!(result.is_bounded());
    assert_eq!(search.expanded(), 5);
    assert_eq!(search.firings(), 5);
    assert_eq!(graph.node_count(), 5);
    assert_eq!(graph.edge_count(), 5);

    let into_meet: Vec<_> = graph
        .edges()
        .filter(|(_, _, to)| to.to_string() == "(0|0|1|1|0)")
        .map(|(from, transition, _)| format!("{} {}", from, transition))
        .collect();
    assert_eq!(into_meet, vec!["(0|1|1|0|0) t2", "(1|0|0|1|0) t1"]);
}

#[test]
fn parallel_arcs_deplete_below_zero() {
    let definition = NetDefinition::default()
        .place("p", 1)
        .place("q", 0)
        .transition("t")
        .arc("a1", "p", "t")
        .arc("a2", "p", "t")
        .arc("a3", "t", "q");
    let mut session = Session::build(&definition).unwrap();
    session.fire("t").unwrap();
    assert_eq!(session.marking(), "(-1|1)");
    assert!(session.activated_transitions().is_empty());
}

#[test]
fn session_from_json_file() {
    let path = std::env::temp_dir().join("pnbound-generator.json");
    fs::write(
        &path,
        r#"{
            "places": [{ "id": "p2" }, { "id": "p1", "tokens": 1 }],
            "transitions": [{ "id": "t" }],
            "arcs": [
                { "id": "a1", "source": "p1", "target": "t" },
                { "id": "a2", "source": "t", "target": "p1" },
                { "id": "a3", "source": "t", "target": "p2" }
            ]
        }"#,
    )
    .unwrap();
    let definition = read_definition(&path).unwrap();
    let _ = fs::remove_file(&path);

    let mut session = Session::build(&definition).unwrap();
    assert_eq!(session.marking(), "(1|0)");

    let summary = session.analyze().unwrap();
    assert!(!summary.bounded);
    assert_eq!(summary.to_string(), "bounded: no  | 1:(t); (1|0), (1|1)");

    let dot = session
        .graph()
        .to_dot(&summary.witness.as_ref().unwrap().markings);
    assert!(dot.contains("color=red"));
}

#[test]
fn polling_sees_each_change_once() {
    let mut session = Session::build(&self_loop()).unwrap();
    assert!(session.take_snapshot().is_some());
    assert!(session.take_snapshot().is_none());

    session.fire("t").unwrap();
    let snapshot = session.take_snapshot().unwrap();
    assert_eq!(snapshot.marking.to_string(), "(1)");
    assert_eq!(snapshot.activated, vec!["t"]);
    assert!(session.take_snapshot().is_none());
}
