//! End-to-end scenarios run by `gem selfcheck`.
//!
//! Every scenario runs, even after an earlier one fails, so the report
//! always shows the full picture.

use std::thread;

use anyhow::{anyhow, bail, ensure};
use gem_core::{GemError, GemResult, Generic, Interface, Object, ResultCode};
use serde::Serialize;

use crate::config::SelfCheckConfig;
use crate::demo::{EventLog, Flaky, Gateway, Hooks, Recorder, Sequencer, Ticker};

type Scenario = fn(&SelfCheckConfig) -> anyhow::Result<String>;

const SCENARIOS: &[(&str, Scenario)] = &[
    ("lifetime", lifetime),
    ("query", query),
    ("identity", identity),
    ("aggregation", aggregation),
    ("failed-initialize", failed_initialize),
    ("concurrency", concurrency),
];

/// Outcome of one scenario.
#[derive(Clone, Debug, Serialize)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SelfCheckReport {
    pub config: SelfCheckConfig,
    pub checks: Vec<CheckOutcome>,
}

impl SelfCheckReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }
}

/// Run every scenario against `config`.
pub fn run(config: &SelfCheckConfig) -> SelfCheckReport {
    let checks = SCENARIOS
        .iter()
        .map(|&(name, scenario)| {
            let outcome = match scenario(config) {
                Ok(detail) => CheckOutcome {
                    name,
                    passed: true,
                    detail,
                },
                Err(err) => CheckOutcome {
                    name,
                    passed: false,
                    detail: format!("{err:#}"),
                },
            };
            tracing::debug!(scenario = name, passed = outcome.passed, "scenario finished");
            outcome
        })
        .collect();
    SelfCheckReport {
        config: config.clone(),
        checks,
    }
}

fn lifetime(_config: &SelfCheckConfig) -> anyhow::Result<String> {
    let hooks = Hooks::default();
    let object = Object::create(Ticker::new(&hooks))?;
    ensure!(object.ref_count() == 1, "fresh object has count {}", object.ref_count());
    ensure!(hooks.initialized() == 1, "initialize did not run");

    let copy = object.clone();
    ensure!(object.ref_count() == 2, "clone did not acquire");
    drop(copy);
    ensure!(object.ref_count() == 1, "drop did not release");

    let raw = object.into_raw();
    // SAFETY: `raw` carries the reference detached from `object`.
    let object = unsafe { gem_core::Ptr::from_raw(raw) };
    ensure!(object.ref_count() == 1, "detach and reattach changed the count");

    drop(object);
    ensure!(
        hooks.torn_down() == 1,
        "teardown ran {} times",
        hooks.torn_down()
    );
    Ok("create, clone, detach, release: teardown ran once".into())
}

fn query(_config: &SelfCheckConfig) -> anyhow::Result<String> {
    let hooks = Hooks::default();
    let object = Object::create(Ticker::new(&hooks))?;

    let seq = object.query::<dyn Sequencer>()?;
    ensure!(object.ref_count() == 2, "supported query did not count once");
    ensure!(seq.next() == 1, "sequencer started at {}", seq.current());

    match object.query::<dyn EventLog>() {
        Ok(_) => bail!("unsupported interface was handed out"),
        Err(err) => ensure!(
            err.code() == ResultCode::NO_INTERFACE,
            "unsupported query failed with {}",
            err.code()
        ),
    }
    ensure!(object.ref_count() == 2, "failed query touched the count");

    let code = object.query_interface(<dyn Sequencer>::IID, None);
    ensure!(
        code == ResultCode::BAD_POINTER,
        "null output returned {code}"
    );
    ensure!(object.ref_count() == 2, "null output touched the count");
    Ok("hit counts once, miss is NoInterface, null output is BadPointer".into())
}

fn identity(_config: &SelfCheckConfig) -> anyhow::Result<String> {
    let hooks = Hooks::default();
    let object = Object::create(Recorder::new(&hooks))?;
    let seq = object.query::<dyn Sequencer>()?;
    let log = object.query::<dyn EventLog>()?;

    ensure!(seq.same_object(&log)?, "own and delegated interfaces disagree");
    let base_a = seq.query::<dyn Generic>()?;
    let base_b = log.query::<dyn Generic>()?;
    ensure!(base_a.ptr_eq(&base_b), "base capabilities differ");
    ensure!(base_a.ptr_eq(&object), "base capability is not the object");

    let again = log.query::<dyn Sequencer>()?;
    ensure!(again.ptr_eq(&seq), "second query returned another instance");
    Ok("every pointer leads back to one base capability".into())
}

fn aggregation(_config: &SelfCheckConfig) -> anyhow::Result<String> {
    let hooks = Hooks::default();
    let object = Object::create(Gateway::new(&hooks))?;
    ensure!(hooks.initialized() == 3, "nested initialize ran {} times", hooks.initialized());

    let seq = object.query::<dyn Sequencer>()?;
    let log = object.query::<dyn EventLog>()?;
    seq.next();
    seq.next();
    ensure!(log.events().len() == 2, "inner log saw {} events", log.events().len());
    ensure!(object.ref_count() == 3, "inner pointers did not count against the outer");

    drop(object);
    drop(seq);
    ensure!(
        hooks.torn_down() == 0,
        "outer torn down while an inner interface was held"
    );
    ensure!(log.ref_count() == 1, "inner pointer holds count {}", log.ref_count());
    drop(log);
    ensure!(
        hooks.torn_down() == 3,
        "teardown ran {} times for three components",
        hooks.torn_down()
    );
    Ok("two-level aggregate counted and torn down as one object".into())
}

fn failed_initialize(_config: &SelfCheckConfig) -> anyhow::Result<String> {
    let hooks = Hooks::default();
    match Object::create(Flaky::new(&hooks)) {
        Ok(_) => bail!("initialize failure was not reported"),
        Err(err) => ensure!(
            err.code() == ResultCode::UNAVAILABLE,
            "create failed with {} instead of Unavailable",
            err.code()
        ),
    }
    ensure!(
        hooks.torn_down() == 2,
        "partially built object ran teardown {} times",
        hooks.torn_down()
    );
    Ok("failure reported, partial object and its inner torn down".into())
}

fn concurrency(config: &SelfCheckConfig) -> anyhow::Result<String> {
    let hooks = Hooks::default();
    let object = Object::create(Recorder::new(&hooks))?;

    thread::scope(|s| -> anyhow::Result<()> {
        let workers: Vec<_> = (0..config.threads)
            .map(|_| {
                let handle = object.clone();
                s.spawn(move || -> GemResult<()> {
                    for _ in 0..config.iterations {
                        let seq = handle.query::<dyn Sequencer>()?;
                        seq.next();
                        let log = seq.query::<dyn EventLog>()?;
                        if !log.same_object(&handle)? {
                            return Err(GemError::context(
                                ResultCode::FAIL,
                                "identity diverged under contention",
                            ));
                        }
                    }
                    Ok(())
                })
            })
            .collect();
        for worker in workers {
            worker.join().map_err(|_| anyhow!("worker panicked"))??;
        }
        Ok(())
    })?;

    let expected = (config.threads * config.iterations) as u64;
    ensure!(object.ref_count() == 1, "count settled at {}", object.ref_count());
    let seq = object.query::<dyn Sequencer>()?;
    ensure!(
        seq.current() == expected,
        "{} of {expected} increments observed",
        seq.current()
    );
    drop((object, seq));
    ensure!(hooks.torn_down() == 2, "teardown ran {} times", hooks.torn_down());
    Ok(format!(
        "{} threads x {} rounds, destroyed once",
        config.threads, config.iterations
    ))
}
