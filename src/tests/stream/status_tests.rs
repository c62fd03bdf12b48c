//! Tests for port status reporting and port errors.

use crate::builder::PipeBuilder;
use crate::error::StreamError;
use crate::graph::PipelineGraph;
use crate::stage::{Port, stage_fn};
use crate::stream::{PortStatus, Side, StreamState};

fn two_stage_graph() -> PipelineGraph {
    PipeBuilder::new()
        .add_stage("first", stage_fn(|_| Ok(())))
        .add_stage("second", stage_fn(|_| Ok(())))
        .build()
        .expect("build")
}

#[test]
fn status_reflects_wiring() {
    let graph = two_stage_graph();
    let first = graph.stages()[0].context();
    let second = graph.stages()[1].context();

    assert_eq!(first.stream_state(Side::Input, 0), PortStatus::NotConnected);
    assert_eq!(
        first.stream_state(Side::Output, 0),
        PortStatus::ConnectedNotWaiting
    );
    assert_eq!(
        second.stream_state(Side::Input, 0),
        PortStatus::ConnectedNotWaiting
    );
    assert_eq!(second.stream_state(Side::Output, 0), PortStatus::NotConnected);
    assert_eq!(first.stream_state(Side::Output, 3), PortStatus::NotDefined);
    assert!(first.is_connected(Side::Output, 0));
    assert!(!first.is_connected(Side::Input, 0));
}

#[test]
fn sever_disconnects_both_ends() {
    let graph = two_stage_graph();
    let first = graph.stages()[0].context();
    let second = graph.stages()[1].context();

    first.sever(Side::Output, 0).expect("sever");

    assert_eq!(first.outputs()[0].state(), StreamState::Severed);
    assert_eq!(second.stream_state(Side::Input, 0), PortStatus::NotConnected);
    assert_eq!(second.readto(0), Err(StreamError::EndOfFile));
    assert_eq!(first.output("x"), Err(StreamError::EndOfFile));
}

#[test]
fn unattached_ports_report_end_of_file() {
    let graph = two_stage_graph();
    let first = graph.stages()[0].context();
    let second = graph.stages()[1].context();

    assert_eq!(first.peekto(0), Err(StreamError::EndOfFile));
    assert_eq!(first.readto(Port::Any), Err(StreamError::EndOfFile));
    assert_eq!(second.output("x"), Err(StreamError::EndOfFile));
}

#[test]
fn missing_ports_are_out_of_range() {
    let graph = two_stage_graph();
    let first = graph.stages()[0].context();

    assert_eq!(
        first.output_to(1, "x"),
        Err(StreamError::PortOutOfRange {
            side: Side::Output,
            port: 1,
        })
    );
    assert_eq!(
        first.readto(2),
        Err(StreamError::PortOutOfRange {
            side: Side::Input,
            port: 2,
        })
    );
    assert!(first.sever(Side::Input, 9).is_err());
}
