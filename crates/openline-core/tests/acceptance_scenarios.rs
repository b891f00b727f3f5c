#![allow(clippy::unwrap_used, clippy::panic)]

//! # Acceptance Scenarios
//!
//! End-to-end scenarios through the public API, organised in tiers:
//! - Tier 1: extraction from text
//! - Tier 2: single-frame guards
//! - Tier 3: multi-frame stream history

use openline_core::guard::{ASSET_CLASS_ATTR, CADENCE_PAIR_ATTR};
use openline_core::{
    Digest, Edge, EdgeRel, Frame, FrameBuilder, FrameService, GuardEngine, MorphOp, Node,
    NodeType, OpenlineError, PriorDigest, ScaleCaps, StaticThresholds, Telemetry, extract,
};
use std::sync::Arc;

const SCENARIO_TEXT: &str = "The result is consistent. Because RCTs show effect, we proceed. \
                             According to doi:10.1000/xyz, findings replicate. Therefore, policy holds.";

fn claims(ids: &[&str]) -> Vec<Node> {
    ids.iter()
        .map(|id| Node::new(*id, NodeType::Claim, format!("claim {id}")))
        .collect()
}

// =============================================================================
// TIER 1: EXTRACTION
// =============================================================================

#[test]
fn tier1_scenario_text_extracts_claim_evidence_and_source() {
    let extraction = extract(SCENARIO_TEXT);
    let count = |t: NodeType| extraction.nodes.iter().filter(|n| n.node_type == t).count();

    assert!(count(NodeType::Claim) >= 1);
    assert!(count(NodeType::Evidence) >= 2);
    assert_eq!(count(NodeType::Source), 1);
    assert!(extraction.confidence >= 0.6);

    let frame = FrameBuilder::new("scenario").build(SCENARIO_TEXT);
    assert_eq!(frame.digest.map(|d| d.x_frontier), Some(0));
}

#[test]
fn tier1_built_frame_is_accepted() {
    let service = FrameService::default();
    let frame = FrameBuilder::new("built").build(SCENARIO_TEXT);
    let expected = frame.digest.clone();
    let acceptance = service.submit(frame).expect("accept");
    assert_eq!(Some(acceptance.digest), expected);
    assert!(acceptance.telemetry.confidence.unwrap_or_default() >= 0.6);
}

#[test]
fn tier1_builder_against_stream_prior() {
    let service = FrameService::default();
    service
        .submit(Frame::new("s", 1).with_graph(claims(&["a"]), Vec::new()))
        .expect("accept");
    let prior = service.latest("s").expect("latest").map(PriorDigest::Trusted);
    let frame = FrameBuilder::new("s")
        .logical_time(2)
        .prior(prior)
        .build(SCENARIO_TEXT);
    // One component before and after; supports and depth differ.
    assert!(frame.telemetry.delta_hol > 0.0);
}

// =============================================================================
// TIER 2: SINGLE-FRAME GUARDS
// =============================================================================

fn pair_drift_frame(pair: &str, delta_scale: f64, with_counter: bool) -> Frame {
    let claim = Node::new("c1", NodeType::Claim, "index intraday vs daily")
        .with_attr(ASSET_CLASS_ATTR, "equity")
        .with_attr(CADENCE_PAIR_ATTR, pair);
    let mut nodes = vec![claim];
    if with_counter {
        nodes.push(Node::new("k1", NodeType::Counter, "index rebalance"));
    }
    Frame::new("drift", 1)
        .with_graph(nodes, Vec::new())
        .with_telemetry(Telemetry {
            delta_scale: Some(delta_scale),
            ..Telemetry::default()
        })
}

fn drift_frame(with_counter: bool) -> Frame {
    pair_drift_frame("hour↔day", 0.15, with_counter)
}

#[test]
fn tier2_unexplained_drift_is_rejected() {
    let service = FrameService::default();
    let err = service.submit(drift_frame(false)).expect_err("rejected");
    let OpenlineError::GuardViolation(violation) = err else {
        panic!("expected guard violation, got {err}");
    };
    assert_eq!(violation.code(), "scale_drift");
    assert!((violation.cap() - 0.036).abs() < 1e-12);
    assert!((violation.observed() - 0.15).abs() < 1e-12);
    assert_eq!(service.stream_count().expect("count"), 0);
}

#[test]
fn tier2_counter_explains_drift() {
    let service = FrameService::default();
    assert!(service.submit(drift_frame(true)).is_ok());
}

#[test]
fn tier2_day_week_pair_widens_cap() {
    let service = FrameService::default();
    // 0.045 fits under 0.03 x 1.6 = 0.048.
    assert!(service.submit(pair_drift_frame("day↔week", 0.045, false)).is_ok());

    let err = service
        .submit(pair_drift_frame("week/day", 0.05, false))
        .expect_err("over 0.048");
    let OpenlineError::GuardViolation(violation) = err else {
        panic!("expected guard violation, got {err}");
    };
    assert!((violation.cap() - 0.048).abs() < 1e-12);
}

#[test]
fn tier2_unlisted_pair_keeps_base_cap() {
    let service = FrameService::default();
    let err = service
        .submit(pair_drift_frame("min↔day", 0.033, false))
        .expect_err("over 0.03");
    let OpenlineError::GuardViolation(violation) = err else {
        panic!("expected guard violation, got {err}");
    };
    assert_eq!(violation.code(), "scale_drift");
    assert!((violation.cap() - 0.03).abs() < 1e-12);
}

#[test]
fn tier2_tuned_cap_replaces_computed_cap() {
    let mut caps = ScaleCaps::default();
    caps.insert("equity", "hour↔day", 0.2);
    let service = FrameService::new(
        Arc::new(openline_core::InMemoryStreamStore::new()),
        Arc::new(StaticThresholds::new(caps)),
        GuardEngine::default(),
    );
    assert!(service.submit(drift_frame(false)).is_ok());
}

#[test]
fn tier2_support_loop_over_cap() {
    // Five disjoint two-node support loops: five back-edges.
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for i in 0..5 {
        let a = format!("a{i}");
        let b = format!("b{i}");
        nodes.push(Node::new(a.clone(), NodeType::Claim, ""));
        nodes.push(Node::new(b.clone(), NodeType::Evidence, ""));
        edges.push(Edge::new(a.clone(), b.clone(), EdgeRel::Supports));
        edges.push(Edge::new(b, a, EdgeRel::Supports));
    }
    let service = FrameService::default();
    let err = service
        .submit(Frame::new("loops", 1).with_graph(nodes, edges))
        .expect_err("rejected");
    assert!(err.to_string().contains("cap=4"));
}

// =============================================================================
// TIER 3: STREAM HISTORY
// =============================================================================

#[test]
fn tier3_holonomy_spike_needs_resolver() {
    let service = FrameService::default();
    let first = Frame::new("hol", 1).with_graph(claims(&["c1"]), Vec::new());
    service.submit(first).expect("accept");

    // Four components instead of one: L1 gap of exactly 3.0.
    let spiking = Frame::new("hol", 2).with_graph(claims(&["c1", "c2", "c3", "c4"]), Vec::new());
    let err = service.submit(spiking.clone()).expect_err("rejected");
    let OpenlineError::GuardViolation(violation) = err else {
        panic!("expected guard violation, got {err}");
    };
    assert_eq!(violation.code(), "holonomy_spike");
    assert!((violation.observed() - 3.0).abs() < 1e-12);

    // The same jump explained by a Counter attached to an existing claim.
    let counter = Node::new("k1", NodeType::Counter, "merger announced");
    let mut explained = spiking.with_morph(MorphOp::AddNode {
        node: counter.clone(),
    });
    explained.nodes.push(counter);
    explained.edges.push(Edge::new("k1", "c1", EdgeRel::Updates));

    let acceptance = service.submit(explained).expect("accept");
    assert!((acceptance.telemetry.delta_hol - 3.0).abs() < f64::EPSILON);
    assert_eq!(acceptance.digest.b0, 4);
}

#[test]
fn tier3_frontier_decrease_with_assumption_and_deletes() {
    let service = FrameService::default();
    let nodes = vec![
        Node::new("c1", NodeType::Claim, "claim"),
        Node::new("x1", NodeType::Evidence, "objection one"),
        Node::new("x2", NodeType::Evidence, "objection two"),
    ];
    let first = Frame::new("front", 1).with_graph(
        nodes.clone(),
        vec![
            Edge::new("x1", "c1", EdgeRel::Contradicts),
            Edge::new("x2", "c1", EdgeRel::Contradicts),
        ],
    );
    service.submit(first).expect("accept");

    let assumption = Node::new("a1", NodeType::Assumption, "x2 measured another cohort");
    let mut second_nodes = nodes;
    second_nodes.push(assumption.clone());
    let second = Frame::new("front", 2)
        .with_graph(
            second_nodes,
            vec![
                Edge::new("x1", "c1", EdgeRel::Contradicts),
                Edge::new("a1", "x2", EdgeRel::Updates),
                Edge::new("x2", "c1", EdgeRel::Derives),
            ],
        )
        .with_morph(MorphOp::DelEdge {
            src: "x2".to_string(),
            dst: "c1".to_string(),
            rel: EdgeRel::Contradicts,
        })
        .with_morph(MorphOp::AddNode { node: assumption });

    let acceptance = service.submit(second).expect("accept");
    assert_eq!(acceptance.digest.x_frontier, 1);
    assert_eq!(acceptance.prior.map(|d| d.x_frontier), Some(2));
}

#[test]
fn tier3_frontier_erasure_by_deletion_is_rejected() {
    let service = FrameService::default();
    let nodes = vec![
        Node::new("c1", NodeType::Claim, "claim"),
        Node::new("x1", NodeType::Evidence, "objection"),
    ];
    service
        .submit(Frame::new("erase", 1).with_graph(
            nodes.clone(),
            vec![Edge::new("x1", "c1", EdgeRel::Contradicts)],
        ))
        .expect("accept");

    let err = service
        .submit(
            Frame::new("erase", 2)
                .with_graph(nodes, vec![Edge::new("x1", "c1", EdgeRel::Updates)])
                .with_morph(MorphOp::DelEdge {
                    src: "x1".to_string(),
                    dst: "c1".to_string(),
                    rel: EdgeRel::Contradicts,
                }),
        )
        .expect_err("rejected");
    assert!(matches!(
        err,
        OpenlineError::GuardViolation(ref v) if v.code() == "frontier_erasure"
    ));
    assert_eq!(
        service.latest("erase").expect("latest").map(|d| d.x_frontier),
        Some(1)
    );
}

#[test]
fn tier3_streams_are_isolated() {
    let service = FrameService::default();
    service
        .submit(Frame::new("one", 1).with_graph(claims(&["a"]), Vec::new()))
        .expect("accept");
    // A big graph on another stream has no prior and no spike.
    let acceptance = service
        .submit(Frame::new("two", 1).with_graph(claims(&["a", "b", "c", "d", "e"]), Vec::new()))
        .expect("accept");
    assert!(acceptance.prior.is_none());
    assert_eq!(service.stream_count().expect("count"), 2);
    assert_eq!(
        service.latest("one").expect("latest"),
        Some(Digest {
            b0: 1,
            ..Digest::default()
        })
    );
}
