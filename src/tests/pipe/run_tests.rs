//! Tests for the commit and dispatch phases.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::builder::PipeBuilder;
use crate::error::{Phase, PipeError, StreamError};
use crate::pipe::{Pipe, SeverOnDrop};
use crate::stage::{Stage, StageContext, StageState, stage_fn};

fn pipe_of(builder: PipeBuilder) -> Pipe {
    Pipe::new(builder.build().expect("build"))
}

fn generator(records: &'static [&'static str]) -> impl Stage {
    stage_fn(move |ctx| {
        for r in records {
            ctx.output(*r)?;
        }
        Ok(())
    })
}

fn passthrough() -> impl Stage {
    stage_fn(|ctx| {
        loop {
            let record = ctx.peekto(0)?;
            ctx.output(record)?;
            ctx.readto(0)?;
        }
    })
}

#[test]
fn records_flow_through_a_straight_pipeline() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = {
        let seen = Arc::clone(&seen);
        stage_fn(move |ctx| {
            loop {
                let record = ctx.readto(0)?;
                seen.lock().push(record.to_string());
            }
        })
    };

    let mut pipe = pipe_of(
        PipeBuilder::new()
            .add_stage("gen", generator(&["x", "y", "z"]))
            .add_stage("pass", passthrough())
            .add_stage("sink", sink),
    );
    pipe.run().expect("run");

    assert_eq!(*seen.lock(), vec!["x", "y", "z"]);
    assert!(
        pipe.stage_states()
            .iter()
            .all(|s| *s == StageState::Terminated)
    );
}

#[test]
fn end_of_file_is_not_a_failure() {
    let mut pipe = pipe_of(
        PipeBuilder::new().add_stage("reader", stage_fn(|ctx| {
            ctx.readto(0)?;
            Ok(())
        })),
    );
    assert!(pipe.run().is_ok());
}

#[test]
fn commit_failure_prevents_every_run() {
    let ran = Arc::new(AtomicUsize::new(0));
    let counting = |ran: &Arc<AtomicUsize>| {
        let ran = Arc::clone(ran);
        stage_fn(move |_| {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    };

    let failing = stage_fn(|_| Ok(())).with_commit(|_| Err(PipeError::coded(50, "refused")));

    let mut pipe = pipe_of(
        PipeBuilder::new()
            .add_stage("a", counting(&ran))
            .add_stage("bad", failing)
            .add_stage("c", counting(&ran)),
    );
    let err = pipe.run().expect_err("commit failure");

    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(err.len(), 1);
    let rep = err.representative().expect("representative");
    assert_eq!(rep.phase, Phase::Commit);
    assert_eq!(rep.index, Some(1));
    assert_eq!(rep.code(), Some(50));
    assert_eq!(
        pipe.stage_states(),
        vec![StageState::Committed, StageState::Created, StageState::Committed]
    );
}

#[test]
fn every_commit_failure_is_collected() {
    let refuse = |code| stage_fn(|_| Ok(())).with_commit(move |_| Err(PipeError::coded(code, "no")));

    let mut pipe = pipe_of(
        PipeBuilder::new()
            .add_stage("a", refuse(300))
            .add_stage("b", refuse(12))
            .add_stage("c", refuse(300)),
    );
    let err = pipe.run().expect_err("commit failure");

    assert_eq!(err.len(), 3);
    assert_eq!(err.representative().and_then(|e| e.index), Some(1));
}

#[test]
fn lowest_code_wins_regardless_of_completion_order() {
    for _ in 0..20 {
        let slow_done = Arc::new(AtomicBool::new(false));
        let fast = {
            let slow_done = Arc::clone(&slow_done);
            stage_fn(move |_| {
                while !slow_done.load(Ordering::SeqCst) {
                    std::thread::yield_now();
                }
                Err(PipeError::coded(5, "low"))
            })
        };
        let slow = {
            let slow_done = Arc::clone(&slow_done);
            stage_fn(move |_| {
                slow_done.store(true, Ordering::SeqCst);
                Err(PipeError::coded(9, "high"))
            })
        };

        let mut pipe = pipe_of(
            PipeBuilder::new()
                .add_stage("low", fast)
                .end()
                .add_stage("high", slow)
                .end()
                .add_stage("plain", stage_fn(|_| Err(PipeError::message("no code")))),
        );
        let err = pipe.run().expect_err("failures");

        assert_eq!(err.len(), 3);
        let rep = err.into_representative().expect("representative");
        assert_eq!(rep.code(), Some(5));
        assert_eq!(rep.stage, "low (stage 1)");
    }
}

#[test]
fn port_out_of_range_is_a_real_failure() {
    let mut pipe = pipe_of(PipeBuilder::new().add_stage(
        "stray",
        stage_fn(|ctx| Ok(ctx.output_to(4, "x")?)),
    ));
    let err = pipe.run().expect_err("out of range");
    let rep = err.representative().expect("representative");

    assert!(matches!(
        rep.error,
        PipeError::Stream(StreamError::PortOutOfRange { port: 4, .. })
    ));
    assert_eq!(rep.code(), Some(102));
}

#[test]
fn panicking_stage_is_reported_and_neighbours_finish() {
    let mut pipe = pipe_of(
        PipeBuilder::new()
            .add_stage("gen", generator(&["a", "b", "c"]))
            .add_stage(
                "boom",
                stage_fn(|ctx: &StageContext| {
                    ctx.readto(0)?;
                    panic!("exploded");
                }),
            ),
    );
    let err = pipe.run().expect_err("panic");

    assert_eq!(err.len(), 1);
    let rep = err.representative().expect("representative");
    assert!(matches!(&rep.error, PipeError::Panicked(msg) if msg == "exploded"));
    assert_eq!(rep.index, Some(1));
    assert!(
        pipe.stage_states()
            .iter()
            .all(|s| *s == StageState::Terminated)
    );
}

#[test]
fn failing_consumer_stops_its_producer() {
    let produced = Arc::new(AtomicUsize::new(0));
    let endless = {
        let produced = Arc::clone(&produced);
        stage_fn(move |ctx| {
            loop {
                ctx.output("tick")?;
                produced.fetch_add(1, Ordering::SeqCst);
            }
        })
    };
    let quitter = stage_fn(|ctx| {
        ctx.readto(0)?;
        ctx.readto(0)?;
        Err(PipeError::message("enough"))
    });

    let mut pipe = pipe_of(
        PipeBuilder::new()
            .add_stage("endless", endless)
            .add_stage("quitter", quitter),
    );
    let err = pipe.run().expect_err("quitter fails");

    assert_eq!(err.len(), 1);
    assert_eq!(err.representative().and_then(|e| e.index), Some(1));
    assert_eq!(produced.load(Ordering::SeqCst), 2);
}

#[test]
fn dropping_an_unstarted_worker_releases_its_neighbours() {
    let graph = PipeBuilder::new()
        .add_stage("gen", generator(&["a"]))
        .add_stage("never", passthrough())
        .build()
        .expect("build");
    let producer_ctx = graph.stages()[0].context();
    let idle_ctx = graph.stages()[1].context();

    std::thread::scope(|scope| {
        let producer = scope.spawn(|| producer_ctx.output("a"));
        while producer_ctx.outputs()[0].state() != crate::stream::StreamState::ReadyToOutput {
            std::thread::yield_now();
        }

        // A worker closure that is dropped without ever running.
        let worker = {
            let cleanup = SeverOnDrop::new(idle_ctx);
            move || drop(cleanup)
        };
        drop(worker);

        assert_eq!(
            producer.join().expect("producer"),
            Err(StreamError::EndOfFile)
        );
    });
    assert_eq!(
        idle_ctx.stream_state(crate::stream::Side::Input, 0),
        crate::stream::PortStatus::NotConnected
    );
}
