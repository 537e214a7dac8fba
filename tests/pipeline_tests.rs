//! End-to-end pipeline tests: producer → workers → results.

mod common;

use anyhow::anyhow;
use common::{Recorder, fast_config};
use datagen::filter::{blank, skip_if};
use datagen::pipeline::context::{FailureLog, ProducerContext};
use datagen::pipeline::run_produce_loop;
use datagen::{
    BoundedChannel, FailureKind, LifecycleEvent, LogObserver, Output, Packet, Pipeline,
    PipelineState, Source, transform,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn sorted<T: Ord>(mut v: Vec<T>) -> Vec<T> {
    v.sort();
    v
}

// --- core scenarios ---

#[test]
fn test_identity_plus_one_three_workers() {
    let data: Vec<u32> = (1..=10).collect();
    let pipeline = Pipeline::new(data, transform::map(|x: u32| x + 1), fast_config(3)).unwrap();

    let mut results = pipeline.iter();
    assert_eq!(results.state(), PipelineState::Idle);
    let out: Vec<u32> = results.by_ref().collect();

    assert_eq!(out.len(), 10);
    assert_eq!(sorted(out), (2..=11).collect::<Vec<_>>());
    assert_eq!(results.state(), PipelineState::Terminated);
    assert!(results.failures().is_empty());
    assert!(results.next().is_none());
}

#[test]
fn test_all_items_arrive_for_any_worker_count() {
    let data: Vec<u64> = (0..200).collect();
    for n in [1, 2, 5, 8] {
        let pipeline =
            Pipeline::new(data.clone(), transform::map(|x: u64| x * 3), fast_config(n)).unwrap();
        let out = sorted(pipeline.iter().collect::<Vec<_>>());
        let expected: Vec<u64> = data.iter().map(|x| x * 3).collect();
        assert_eq!(out, expected, "n_process = {}", n);
    }
}

#[test]
fn test_more_workers_than_items() {
    let pipeline =
        Pipeline::new(vec![1_u8, 2], transform::map(|x: u8| x), fast_config(6)).unwrap();
    assert_eq!(sorted(pipeline.iter().collect()), vec![1, 2]);
}

#[test]
fn test_empty_source_terminates() {
    let pipeline =
        Pipeline::new(Vec::<u32>::new(), transform::map(|x: u32| x), fast_config(3)).unwrap();
    let start = Instant::now();
    assert_eq!(pipeline.iter().count(), 0);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_small_queues_apply_backpressure_without_loss() {
    let config = datagen::PipelineConfig {
        qsize: 1,
        input_scale: Some(1),
        ..fast_config(4)
    };
    let data: Vec<u32> = (0..300).collect();
    let pipeline = Pipeline::new(data.clone(), transform::map(|x: u32| x), config).unwrap();
    assert_eq!(sorted(pipeline.iter().collect()), data);
}

#[test]
fn test_pipeline_restarts_on_each_iteration() {
    let pipeline =
        Pipeline::new((0..20).collect::<Vec<u32>>(), transform::map(|x: u32| x), fast_config(2))
            .unwrap();
    let first = sorted(pipeline.iter().collect::<Vec<_>>());
    let second = sorted((&pipeline).into_iter().collect::<Vec<_>>());
    assert_eq!(first, second);
    assert_eq!(first.len(), 20);
}

// --- expansion ---

#[test]
fn test_expansion_yields_k_items_in_order() {
    // K = 0, 1, 3 depending on the item.
    let k_for = |x: u32| [0_u32, 1, 3][(x % 3) as usize];
    let pipeline = Pipeline::builder(
        (0..30).collect::<Vec<u32>>(),
        move |x: u32| -> anyhow::Result<Output<(u32, u32)>> {
            Ok(Output::many((0..k_for(x)).map(move |j| (x, j))))
        },
    )
    .config(fast_config(3))
    .build()
    .unwrap();

    let mut by_item: HashMap<u32, Vec<u32>> = HashMap::new();
    for (x, j) in pipeline.iter() {
        by_item.entry(x).or_default().push(j);
    }
    for x in 0..30 {
        let k = k_for(x);
        let got = by_item.remove(&x).unwrap_or_default();
        assert_eq!(got, (0..k).collect::<Vec<_>>(), "item {}", x);
    }
    assert!(by_item.is_empty());
}

#[test]
fn test_flat_map_and_option_outputs() {
    let pipeline = Pipeline::new(
        vec![1_u32, 2, 3],
        transform::flat_map(|x: u32| vec![x; x as usize]),
        fast_config(2),
    )
    .unwrap();
    assert_eq!(sorted(pipeline.iter().collect()), vec![1, 2, 2, 3, 3, 3]);

    let evens_only = Pipeline::builder(
        (0..10).collect::<Vec<u32>>(),
        |x: u32| -> anyhow::Result<Output<u32>> { Ok((x % 2 == 0).then_some(x).into()) },
    )
    .config(fast_config(2))
    .build()
    .unwrap();
    assert_eq!(sorted(evens_only.iter().collect()), vec![0, 2, 4, 6, 8]);
}

// --- repeat / shuffle ---

#[test]
fn test_repeat_keeps_producing() {
    let config = datagen::PipelineConfig {
        repeat: true,
        ..fast_config(2)
    };
    let pipeline =
        Pipeline::new((1..=5).collect::<Vec<u32>>(), transform::map(|x: u32| x), config).unwrap();
    let start = Instant::now();
    let taken: Vec<u32> = pipeline.iter().take(50).collect();
    assert_eq!(taken.len(), 50);
    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(taken.iter().all(|x| (1..=5).contains(x)));
}

#[test]
fn test_repeat_with_empty_pass_does_not_spin() {
    let config = datagen::PipelineConfig {
        repeat: true,
        ..fast_config(2)
    };
    let pipeline = Pipeline::builder(vec![0_u32, 0, 0], transform::map(|x: u32| x))
        .config(config)
        .skip_input_if(blank())
        .build()
        .unwrap();
    let start = Instant::now();
    assert_eq!(pipeline.iter().count(), 0);
    assert!(start.elapsed() < Duration::from_secs(5));
}

fn produce_order(seed: u64, shuffle: bool) -> (Vec<u32>, usize) {
    let input = BoundedChannel::new(128).unwrap();
    let ctx = ProducerContext {
        source: Source::from_vec((0..64).collect::<Vec<u32>>()),
        repeat: false,
        shuffle,
        shuffle_seed: seed,
        skip_input: None,
        failures: FailureLog::default(),
        observer: Arc::new(LogObserver::default()),
    };
    let pushed = run_produce_loop(&input, &ctx);
    let mut order = Vec::new();
    let mut ends = 0;
    while let Some(packet) = input.try_get() {
        match packet {
            Packet::Item(x) => order.push(x),
            Packet::End => ends += 1,
            Packet::Timeout => panic!("producer never pushes Timeout"),
        }
    }
    assert_eq!(pushed, order.len());
    (order, ends)
}

#[test]
fn test_producer_pushes_exactly_one_end() {
    let (order, ends) = produce_order(0, false);
    assert_eq!(ends, 1);
    assert_eq!(order, (0..64).collect::<Vec<_>>());
}

#[test]
fn test_shuffle_is_seeded() {
    let (a, _) = produce_order(42, true);
    let (b, _) = produce_order(42, true);
    let (c, _) = produce_order(43, true);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, (0..64).collect::<Vec<_>>());
    assert_eq!(sorted(a), (0..64).collect::<Vec<_>>());
}

#[test]
fn test_shuffled_pipeline_still_delivers_everything() {
    let config = datagen::PipelineConfig {
        shuffle: true,
        seed: Some(7),
        ..fast_config(3)
    };
    let pipeline =
        Pipeline::new((0..100).collect::<Vec<u32>>(), transform::map(|x: u32| x), config).unwrap();
    assert_eq!(sorted(pipeline.iter().collect()), (0..100).collect::<Vec<_>>());
}

// --- skip policies ---

#[test]
fn test_default_policy_keeps_zero() {
    let pipeline =
        Pipeline::new(vec![0_i32, 1, 2], transform::map(|x: i32| x), fast_config(2)).unwrap();
    assert_eq!(sorted(pipeline.iter().collect()), vec![0, 1, 2]);
}

#[test]
fn test_skip_blank_input_and_output() {
    let pipeline = Pipeline::builder(
        vec![
            String::new(),
            "a".to_string(),
            "drop".to_string(),
            "b".to_string(),
        ],
        transform::map(|s: String| if s == "drop" { String::new() } else { s.to_uppercase() }),
    )
    .config(fast_config(2))
    .skip_input_if(blank())
    .skip_output_if(skip_if(|s: &String| s.is_empty()))
    .build()
    .unwrap();
    assert_eq!(
        sorted(pipeline.iter().collect()),
        vec!["A".to_string(), "B".to_string()]
    );
}

// --- failures ---

#[test]
fn test_transform_error_is_recorded_and_iteration_ends() {
    let pipeline = Pipeline::builder(
        (1..=10).collect::<Vec<u32>>(),
        |x: u32| -> anyhow::Result<Output<u32>> {
            if x == 5 {
                Err(anyhow!("bad item {}", x))
            } else {
                Ok(Output::One(x))
            }
        },
    )
    .config(fast_config(1))
    .build()
    .unwrap();

    let mut results = pipeline.iter();
    let out: Vec<u32> = results.by_ref().collect();
    // Single worker, source order: everything before the failing item made it.
    assert_eq!(out, vec![1, 2, 3, 4]);
    let failures = results.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::Transform);
    assert_eq!(failures[0].worker, Some(0));
    assert!(failures[0].message.contains("bad item 5"));
    assert_eq!(results.state(), PipelineState::Terminated);
}

#[test]
fn test_transform_panic_is_contained() {
    let pipeline = Pipeline::builder(
        (0..20).collect::<Vec<u32>>(),
        |x: u32| -> anyhow::Result<Output<u32>> {
            if x == 3 {
                panic!("boom on {}", x);
            }
            Ok(Output::One(x))
        },
    )
    .config(fast_config(3))
    .build()
    .unwrap();

    let mut results = pipeline.iter();
    let out: Vec<u32> = results.by_ref().collect();
    assert!(!out.contains(&3));
    let failures = results.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].message.contains("boom on 3"));
}

#[test]
fn test_source_error_ends_pass() {
    let source = Source::from_fallible(|| {
        let items: Vec<anyhow::Result<u32>> = vec![Ok(1), Ok(2), Err(anyhow!("disk gone")), Ok(4)];
        Ok(Box::new(items.into_iter()) as datagen::source::ItemStream<u32>)
    });
    let config = datagen::PipelineConfig {
        repeat: true,
        ..fast_config(2)
    };
    let pipeline = Pipeline::new(source, transform::map(|x: u32| x + 1), config).unwrap();
    let mut results = pipeline.iter();
    let out = sorted(results.by_ref().collect::<Vec<_>>());
    assert_eq!(out, vec![2, 3]);
    let failures = results.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::Source);
    assert!(failures[0].message.contains("disk gone"));
}

#[test]
fn test_source_panic_ends_run_promptly() {
    let source = Source::from_fn(|| {
        (0..10_u32).map(|x| {
            if x == 2 {
                panic!("reader crashed at {}", x);
            }
            x
        })
    });
    let config = datagen::PipelineConfig {
        worker_timeout: Duration::from_secs(3),
        ..fast_config(2)
    };
    let pipeline = Pipeline::new(source, transform::map(|x: u32| x), config).unwrap();

    let start = Instant::now();
    let mut results = pipeline.iter();
    let out = sorted(results.by_ref().collect::<Vec<_>>());
    assert!(start.elapsed() < Duration::from_secs(2), "run took {:?}", start.elapsed());
    assert_eq!(out, vec![0, 1]);
    let failures = results.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::Source);
    assert!(failures[0].message.contains("reader crashed at 2"));
}

#[test]
fn test_input_filter_panic_is_a_source_failure() {
    let config = datagen::PipelineConfig {
        worker_timeout: Duration::from_secs(3),
        ..fast_config(2)
    };
    let pipeline = Pipeline::builder(vec![1_u32, 2, 3], transform::map(|x: u32| x))
        .config(config)
        .skip_input_if(skip_if(|x: &u32| {
            assert_ne!(*x, 3, "filter rejected item");
            false
        }))
        .build()
        .unwrap();

    let start = Instant::now();
    let mut results = pipeline.iter();
    let out = sorted(results.by_ref().collect::<Vec<_>>());
    assert!(start.elapsed() < Duration::from_secs(2), "run took {:?}", start.elapsed());
    assert_eq!(out, vec![1, 2]);
    let failures = results.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::Source);
}

#[test]
fn test_stream_source_repeats_by_reopening() {
    let config = datagen::PipelineConfig {
        repeat: true,
        ..fast_config(2)
    };
    let pipeline = Pipeline::new(
        Source::from_fn(|| 0..3_u32),
        transform::map(|x: u32| x),
        config,
    )
    .unwrap();
    let taken: Vec<u32> = pipeline.iter().take(12).collect();
    assert_eq!(taken.len(), 12);
}

// --- lifecycle ---

#[test]
fn test_controller_stop_is_bounded_when_workers_blocked_on_put() {
    let config = datagen::PipelineConfig {
        repeat: true,
        qsize: 1,
        input_scale: Some(1),
        ..fast_config(3)
    };
    let pipeline =
        Pipeline::new((0..10).collect::<Vec<u32>>(), transform::map(|x: u32| x), config).unwrap();
    let mut controller = pipeline.controller();
    controller.start().unwrap();
    assert_eq!(controller.state(), PipelineState::Running);
    // Nobody consumes: output fills, workers block on put, producer blocks on input.
    thread::sleep(Duration::from_millis(100));

    let start = Instant::now();
    controller.stop();
    assert!(start.elapsed() < Duration::from_secs(3), "stop took {:?}", start.elapsed());
    assert_eq!(controller.state(), PipelineState::Terminated);
    assert!(!controller.is_running());
    controller.stop();
}

#[test]
fn test_controller_stop_is_bounded_when_workers_idle() {
    let config = datagen::PipelineConfig {
        worker_timeout: Duration::from_secs(60),
        ..fast_config(4)
    };
    let source = Source::from_fn(|| {
        // Slow source keeps workers waiting on an empty input.
        std::iter::from_fn(|| {
            thread::sleep(Duration::from_millis(50));
            Some(1_u32)
        })
        .take(1000)
    });
    let pipeline = Pipeline::new(source, transform::map(|x: u32| x), config).unwrap();
    let mut controller = pipeline.controller();
    controller.start().unwrap();
    thread::sleep(Duration::from_millis(30));
    let start = Instant::now();
    controller.stop();
    assert!(start.elapsed() < Duration::from_secs(4), "stop took {:?}", start.elapsed());
}

#[test]
fn test_wedged_worker_is_detached() {
    let recorder = Arc::new(Recorder::default());
    let config = datagen::PipelineConfig {
        grace_period: Duration::from_millis(50),
        ..fast_config(1)
    };
    let pipeline = Pipeline::builder(vec![1_u32], |x: u32| -> anyhow::Result<Output<u32>> {
        thread::sleep(Duration::from_secs(2));
        Ok(Output::One(x))
    })
    .config(config)
    .observer(recorder.clone())
    .build()
    .unwrap();

    let mut controller = pipeline.controller();
    controller.start().unwrap();
    thread::sleep(Duration::from_millis(50));
    let start = Instant::now();
    controller.stop();
    assert!(start.elapsed() < Duration::from_secs(1), "stop took {:?}", start.elapsed());
    assert!(
        recorder
            .events()
            .iter()
            .any(|e| matches!(e, LifecycleEvent::Detached { thread } if thread.contains("worker")))
    );
}

#[test]
fn test_restart_stops_previous_run() {
    let config = datagen::PipelineConfig {
        repeat: true,
        ..fast_config(2)
    };
    let pipeline =
        Pipeline::new((0..5).collect::<Vec<u32>>(), transform::map(|x: u32| x), config).unwrap();
    let mut controller = pipeline.controller();
    controller.start().unwrap();
    controller.start().unwrap();
    assert_eq!(controller.state(), PipelineState::Running);
    assert!(controller.recv(Duration::from_secs(5)).into_item().is_some());
}

#[test]
fn test_dropping_results_early_stops_threads() {
    let recorder = Arc::new(Recorder::default());
    let config = datagen::PipelineConfig {
        repeat: true,
        ..fast_config(3)
    };
    let pipeline = Pipeline::builder((0..10).collect::<Vec<u32>>(), transform::map(|x: u32| x))
        .config(config)
        .observer(recorder.clone())
        .build()
        .unwrap();

    let mut results = pipeline.iter();
    assert!(results.next().is_some());
    let start = Instant::now();
    drop(results);
    assert!(start.elapsed() < Duration::from_secs(3));

    let events = recorder.events();
    assert!(events.contains(&LifecycleEvent::StateChanged(PipelineState::Terminated)));
    let stopped = events
        .iter()
        .filter(|e| matches!(e, LifecycleEvent::WorkerStopped { .. }))
        .count();
    assert_eq!(stopped, 3);
}

#[test]
fn test_state_transitions_in_order() {
    let recorder = Arc::new(Recorder::default());
    let pipeline = Pipeline::builder(vec![1_u32, 2, 3], transform::map(|x: u32| x))
        .config(fast_config(2))
        .observer(recorder.clone())
        .build()
        .unwrap();
    assert_eq!(pipeline.iter().count(), 3);

    let states: Vec<PipelineState> = recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            LifecycleEvent::StateChanged(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            PipelineState::Running,
            PipelineState::Draining,
            PipelineState::Terminated
        ]
    );
}

#[test]
fn test_dropping_running_controller_drains() {
    let recorder = Arc::new(Recorder::default());
    let config = datagen::PipelineConfig {
        repeat: true,
        ..fast_config(2)
    };
    let pipeline = Pipeline::builder(vec![1_u32, 2], transform::map(|x: u32| x))
        .config(config)
        .observer(recorder.clone())
        .build()
        .unwrap();

    let mut controller = pipeline.controller();
    controller.start().unwrap();
    drop(controller);

    let states: Vec<PipelineState> = recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            LifecycleEvent::StateChanged(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            PipelineState::Running,
            PipelineState::Draining,
            PipelineState::Terminated
        ]
    );
}

// --- worker seeding ---

fn worker_seeds(seed: u64) -> Vec<u64> {
    let recorder = Arc::new(Recorder::default());
    let config = datagen::PipelineConfig {
        seed: Some(seed),
        ..fast_config(4)
    };
    let pipeline = Pipeline::builder(vec![1_u32], transform::map(|x: u32| x))
        .config(config)
        .observer(recorder.clone())
        .build()
        .unwrap();
    assert_eq!(pipeline.iter().count(), 1);
    let mut seeds: Vec<(usize, u64)> = recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            LifecycleEvent::WorkerSpawned { worker, seed } => Some((worker, seed)),
            _ => None,
        })
        .collect();
    seeds.sort();
    seeds.into_iter().map(|(_, s)| s).collect()
}

#[test]
fn test_worker_seeds_are_distinct_and_reproducible() {
    let a = worker_seeds(11);
    let b = worker_seeds(11);
    let c = worker_seeds(12);
    assert_eq!(a.len(), 4);
    assert_eq!(a, b);
    assert_ne!(a, c);
    let mut unique = sorted(a.clone());
    unique.dedup();
    assert_eq!(unique.len(), 4);
}

#[test]
fn test_transform_sees_worker_identity() {
    let pipeline = Pipeline::new(
        (0..40).collect::<Vec<u32>>(),
        transform::map(|_: u32| {
            (
                datagen::utils::current_worker_id(),
                datagen::utils::worker_gen_range(0, 1_000_000),
            )
        }),
        fast_config(3),
    )
    .unwrap();
    for (worker, draw) in pipeline.iter() {
        assert!(worker.is_some_and(|w| w < 3));
        assert!(draw < 1_000_000);
    }
    assert_eq!(datagen::utils::current_worker_id(), None);
}
