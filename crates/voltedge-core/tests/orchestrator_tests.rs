//! ---
//! ve_section: "01-core-functionality"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Primary orchestration and lifecycle management."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
use std::time::Duration;

use voltedge_common::config::EngineConfig;
use voltedge_core::{Orchestrator, OrchestratorError, SimulationStatus};
use voltedge_grid::{
    ComponentId, FaultKind, GridSpec, LoadProfileSpec, PlantKind, PlantSpec,
};

fn test_config() -> EngineConfig {
    EngineConfig {
        tick_rate: Duration::from_millis(100),
        max_simulations: 3,
        simulation_timeout: Duration::from_secs(600),
        // Sweeping is driven manually in tests.
        cleanup_interval: Duration::ZERO,
        retention_window: Duration::ZERO,
        ..EngineConfig::default()
    }
}

fn steady_spec() -> GridSpec {
    GridSpec {
        name: Some("steady".into()),
        description: Some("single coal plant against flat load".into()),
        base_frequency: 50.0,
        base_voltage: 230.0,
        power_plants: vec![PlantSpec {
            id: 1,
            name: None,
            kind: PlantKind::Coal,
            max_capacity_mw: 500.0,
            efficiency: 0.38,
            location: None,
            is_operational: true,
            initial_output_mw: 300.0,
        }],
        transmission_lines: Vec::new(),
        load_profile: LoadProfileSpec {
            base_load_mw: 300.0,
            daily_variation: 0.0,
            random_variation: 0.0,
            peak_multiplier: 1.0,
        },
    }
}

#[test]
fn create_list_describe_and_capacity_limit() {
    let orchestrator = Orchestrator::new(test_config(), None);
    let a = orchestrator.create(steady_spec()).unwrap();
    let b = orchestrator.create(steady_spec()).unwrap();
    let c = orchestrator.create(steady_spec()).unwrap();
    assert!(a < b && b < c);

    let err = orchestrator.create(steady_spec()).unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::MaxSimulationsReached { limit: 3 }
    ));

    let described = orchestrator.describe(a).unwrap();
    assert_eq!(described.status, SimulationStatus::Created);
    assert_eq!(described.plant_count, 1);
    assert_eq!(described.name, "steady");

    let listed = orchestrator.list(Some(SimulationStatus::Created));
    assert_eq!(listed.len(), 3);

    let health = orchestrator.health();
    assert!(!health.healthy);
    assert_eq!(health.simulations, 3);
}

#[test]
fn invalid_spec_never_creates_a_simulation() {
    let orchestrator = Orchestrator::new(test_config(), None);
    let mut spec = steady_spec();
    spec.power_plants[0].efficiency = 0.0;
    let err = orchestrator.create(spec).unwrap_err();
    assert!(matches!(err, OrchestratorError::Grid(_)));
    assert!(orchestrator.list(None).is_empty());
}

#[test]
fn step_mode_advances_exactly_one_tick() {
    let orchestrator = Orchestrator::new(test_config(), None);
    let id = orchestrator.create(steady_spec()).unwrap();

    assert!(matches!(
        orchestrator.snapshot(id),
        Err(OrchestratorError::SnapshotUnavailable)
    ));

    let first = orchestrator.tick(id).unwrap();
    assert_eq!(first.tick_number, 1);
    let second = orchestrator.tick(id).unwrap();
    assert_eq!(second.tick_number, 2);
    assert_eq!(orchestrator.snapshot(id).unwrap().tick_number, 2);

    let last = orchestrator.run_until(id, 10).unwrap();
    assert_eq!(last.tick_number, 10);
    assert!((last.total_generation_mw - 300.0).abs() < 1e-9);
}

#[test]
fn lifecycle_start_pause_resume_stop() {
    let orchestrator = Orchestrator::new(test_config(), None);
    let id = orchestrator.create(steady_spec()).unwrap();

    assert!(matches!(
        orchestrator.pause(id),
        Err(OrchestratorError::NotRunning { .. })
    ));

    orchestrator.start(id).unwrap();
    assert!(matches!(
        orchestrator.start(id),
        Err(OrchestratorError::AlreadyRunning { .. })
    ));

    std::thread::sleep(Duration::from_millis(350));
    orchestrator.pause(id).unwrap();
    let paused = orchestrator.describe(id).unwrap();
    assert_eq!(paused.status, SimulationStatus::Paused);
    assert!(paused.tick_number >= 1);

    orchestrator.start(id).unwrap();
    std::thread::sleep(Duration::from_millis(150));
    orchestrator.stop(id).unwrap();
    let stopped = orchestrator.describe(id).unwrap();
    assert_eq!(stopped.status, SimulationStatus::Completed);
    assert!(stopped.completed_at.is_some());

    // Terminal states reject lifecycle transitions until delete.
    assert!(matches!(
        orchestrator.start(id),
        Err(OrchestratorError::NotRunning { .. })
    ));
    orchestrator.delete(id).unwrap();
    assert!(matches!(
        orchestrator.describe(id),
        Err(OrchestratorError::NotFound(_))
    ));
}

#[test]
fn fault_validation_happens_at_enqueue_time() {
    let orchestrator = Orchestrator::new(test_config(), None);
    let id = orchestrator.create(steady_spec()).unwrap();

    let err = orchestrator
        .inject_fault(id, ComponentId::Plant(99), FaultKind::PlantOutage)
        .unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Grid(voltedge_grid::GridError::UnknownComponent(_))
    ));

    let err = orchestrator
        .inject_fault(id, ComponentId::Plant(1), FaultKind::LineTrip)
        .unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Grid(voltedge_grid::GridError::UnsupportedFault { .. })
    ));

    // A valid injection lands on the next tick.
    orchestrator
        .inject_fault(id, ComponentId::Plant(1), FaultKind::PlantOutage)
        .unwrap();
    let snapshot = orchestrator.tick(id).unwrap();
    assert!(snapshot.active_failure_ids.contains(&ComponentId::Plant(1)));
}

#[test]
fn repeat_injection_leaves_state_unchanged() {
    let orchestrator = Orchestrator::new(test_config(), None);
    let id = orchestrator.create(steady_spec()).unwrap();
    orchestrator
        .inject_fault(id, ComponentId::Plant(1), FaultKind::PlantOutage)
        .unwrap();
    let first = orchestrator.tick(id).unwrap();
    orchestrator
        .inject_fault(id, ComponentId::Plant(1), FaultKind::PlantOutage)
        .unwrap();
    let second = orchestrator.tick(id).unwrap();
    assert_eq!(first.active_failure_ids, second.active_failure_ids);
    assert_eq!(first.fault_count, second.fault_count);
    assert_eq!(second.total_generation_mw, 0.0);
}

#[test]
fn subscriber_streams_snapshots_in_push_order() {
    let orchestrator = Orchestrator::new(test_config(), None);
    let id = orchestrator.create(steady_spec()).unwrap();
    let mut consumer = orchestrator.subscribe(id).unwrap();
    assert!(matches!(
        orchestrator.subscribe(id),
        Err(OrchestratorError::SubscriberTaken)
    ));

    orchestrator.run_until(id, 5).unwrap();
    for expected in 1..=5 {
        let snapshot = consumer.pop().expect("snapshot expected");
        assert_eq!(snapshot.tick_number, expected);
    }
    assert!(consumer.pop().is_none());
}

#[test]
fn identical_orchestrations_are_byte_identical() {
    let run = || {
        let orchestrator = Orchestrator::new(test_config(), None);
        let id = orchestrator.create(steady_spec()).unwrap();
        let mut consumer = orchestrator.subscribe(id).unwrap();
        orchestrator.run_until(id, 5).unwrap();
        orchestrator
            .inject_fault(id, ComponentId::Plant(1), FaultKind::PlantOutage)
            .unwrap();
        orchestrator.run_until(id, 10).unwrap();
        let mut snapshots = Vec::new();
        while let Some(snapshot) = consumer.pop() {
            snapshots.push(snapshot);
        }
        serde_json::to_string(&snapshots).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn wall_clock_budget_moves_simulation_to_error() {
    let config = EngineConfig {
        simulation_timeout: Duration::ZERO,
        ..test_config()
    };
    let orchestrator = Orchestrator::new(config, None);
    let id = orchestrator.create(steady_spec()).unwrap();
    orchestrator.start(id).unwrap();
    std::thread::sleep(Duration::from_millis(200));
    let descriptor = orchestrator.describe(id).unwrap();
    assert_eq!(descriptor.status, SimulationStatus::Error);
    assert!(descriptor
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("wall-clock"));
}

#[test]
fn retention_sweep_removes_expired_terminal_simulations() {
    let orchestrator = Orchestrator::new(test_config(), None);
    let id = orchestrator.create(steady_spec()).unwrap();
    orchestrator.start(id).unwrap();
    std::thread::sleep(Duration::from_millis(150));
    orchestrator.stop(id).unwrap();

    // Zero retention window: terminal simulations expire immediately.
    assert_eq!(orchestrator.sweep_terminal(), 1);
    assert!(matches!(
        orchestrator.describe(id),
        Err(OrchestratorError::NotFound(_))
    ));
}

#[test]
fn queued_events_apply_in_timestamp_order_regardless_of_push_order() {
    use voltedge_grid::GridCommand;
    use voltedge_rt::EventBatch;

    let t1 = chrono::DateTime::from_timestamp(1_735_689_700, 0).unwrap();
    let t2 = chrono::DateTime::from_timestamp(1_735_689_800, 0).unwrap();
    let set_output = GridCommand::SetPlantOutput {
        plant_id: 1,
        mw: 400.0,
    };
    let outage = GridCommand::InjectFault {
        target: ComponentId::Plant(1),
        kind: FaultKind::PlantOutage,
    };

    // Producer pushes out of causal order; the drain restores it.
    let batch: EventBatch<GridCommand> = EventBatch::new();
    batch.push(t2, outage.clone()).unwrap();
    batch.push(t1, set_output.clone()).unwrap();
    let drained: Vec<GridCommand> = batch
        .drain()
        .into_iter()
        .map(|event| event.payload)
        .collect();
    assert_eq!(drained, vec![set_output.clone(), outage.clone()]);

    // Applying the drained order matches the natural order exactly.
    let make_grid = || {
        voltedge_grid::GridModel::new(
            1,
            &steady_spec(),
            Duration::from_millis(100),
            0x5EED,
            voltedge_common::time::SimClock::deterministic(
                chrono::DateTime::from_timestamp(1_735_689_600, 0).unwrap(),
                Duration::from_millis(100),
            ),
        )
        .unwrap()
    };
    let mut reordered = make_grid();
    let mut natural = make_grid();
    let a = reordered.tick(drained);
    let b = natural.tick(vec![set_output, outage]);
    assert_eq!(a, b);
}

#[test]
fn snapshot_stream_feeds_the_persistence_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshots.jsonl");

    let orchestrator = Orchestrator::new(test_config(), None);
    let id = orchestrator.create(steady_spec()).unwrap();
    let mut consumer = orchestrator.subscribe(id).unwrap();
    orchestrator.run_until(id, 4).unwrap();

    let mut writer = voltedge_persist::SnapshotLogWriter::open(&path).unwrap();
    while let Some(snapshot) = consumer.pop() {
        writer.append(&snapshot).unwrap();
    }
    drop(writer);

    let entries = voltedge_persist::SnapshotLogReader::read_all(&path).unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].snapshot.tick_number, 1);
    assert_eq!(entries[3].snapshot.tick_number, 4);
}
