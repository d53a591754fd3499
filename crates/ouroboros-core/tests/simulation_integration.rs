//! End-to-end tests for the `Simulation` context.
//!
//! Every test builds a small world, drives ticks by hand with
//! `Simulation::step`, and uses `Simulation::settle` as the barrier for
//! background fills, sunsets and rebirths. Only the start/stop test runs
//! the real driver.

#![allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::missing_panics_doc
)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use ouroboros_core::names::bot_name;
use ouroboros_core::{EndReason, MemoryScoreSink, Simulation, SimulationConfig, SimulationError};
use ouroboros_types::{Heading, PlayerEvent, PlayerId};

fn config(rows: usize, cols: usize, bots: u16, respawn: bool) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.world.rows = rows;
    config.world.cols = cols;
    config.world.seed = Some(17);
    config.world.tick_interval_ms = 5;
    config.bots.count = bots;
    config.bots.respawn = respawn;
    config.players.spawn_margin = 3;
    config.players.spawn_samples = 50;
    config.workers.sunset_workers = 4;
    config.workers.fill_concurrency = 4;
    config
}

fn build(config: SimulationConfig) -> (Simulation, Arc<MemoryScoreSink>) {
    let sink = Arc::new(MemoryScoreSink::new());
    let sim = Simulation::new(config, Arc::clone(&sink) as _).unwrap();
    (sim, sink)
}

/// Point `id` straight at a wall and tick until someone dies.
async fn drive_into_wall(sim: &Simulation, id: PlayerId) {
    let heading = sim.read_world().await.player(id).unwrap().heading;
    let target = if heading == Heading::Down {
        Heading::Left
    } else {
        Heading::Up
    };
    assert!(sim.submit_heading(id, target));

    for _ in 0..64 {
        if sim.step().await.deaths > 0 {
            return;
        }
    }
    panic!("player {id} never reached the wall");
}

/// Check the structural invariants of the grid against the player table.
async fn assert_consistent(sim: &Simulation) {
    let world = sim.read_world().await;

    for cell in world.grid.cells() {
        if cell.is_trail {
            let owner = cell.owner.unwrap();
            let player = world.player(owner).unwrap();
            assert!(player.trail.contains(&cell.pos), "orphan trail at {}", cell.pos);
        }
    }

    let mut heads = BTreeSet::new();
    for player in world.live_players() {
        assert!(heads.insert(player.location), "two heads on {}", player.location);
        assert_eq!(world.grid.owner(player.location), Some(player.id));
        for pos in &player.trail {
            let cell = world.grid.cell(*pos).unwrap();
            assert_eq!(cell.owner, Some(player.id));
            assert!(cell.is_trail);
        }
    }
}

#[tokio::test]
async fn wall_death_is_announced_once_and_scored() {
    let (sim, sink) = build(config(16, 16, 0, false));
    let id = PlayerId::new(9);
    sim.join("Mamba", id).await.unwrap();
    let mut events = sim.subscribe(id).await.unwrap();

    drive_into_wall(&sim, id).await;
    sim.settle().await;

    assert!(sim.read_world().await.player(id).is_none());
    let world = sim.read_world().await;
    assert!(world.grid.cells().all(|cell| cell.owner != Some(id)));
    drop(world);

    let mut ticks = 0_u64;
    let mut deaths = 0_u32;
    while let Some(event) = events.recv().await {
        match event {
            PlayerEvent::TickCompleted { .. } => ticks += 1,
            PlayerEvent::Died(notice) => {
                assert_eq!(notice.player_id, id);
                assert_eq!(notice.kills, 0);
                deaths += 1;
            }
        }
    }
    assert!(ticks >= 1);
    assert_eq!(deaths, 1);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Mamba");
    assert_eq!(records[0].player_id, id);
}

#[tokio::test]
async fn joining_an_occupied_identifier_replaces_the_occupant() {
    let (sim, sink) = build(config(24, 24, 0, false));
    let id = PlayerId::new(3);
    sim.join("First", id).await.unwrap();
    let mut first = sim.subscribe(id).await.unwrap();

    let second = sim.join("Second", id).await.unwrap();
    assert_eq!(second.name, "Second");

    assert!(matches!(first.recv().await, Some(PlayerEvent::Died(_))));
    assert_eq!(first.recv().await, None);
    assert_eq!(sink.records().len(), 1);
    assert_eq!(sim.read_world().await.player(id).unwrap().name, "Second");
    assert_consistent(&sim).await;
}

#[tokio::test]
async fn dead_slot_comes_back_as_a_bot() {
    let (sim, _sink) = build(config(16, 16, 0, true));
    let id = PlayerId::new(5);
    sim.join("Taipan", id).await.unwrap();

    drive_into_wall(&sim, id).await;
    sim.settle().await;

    let world = sim.read_world().await;
    let reborn = world.player(id).unwrap();
    assert!(reborn.alive);
    assert!(reborn.is_bot());
    assert_eq!(reborn.name, bot_name(id));
    assert!(reborn.trail.is_empty());
}

#[tokio::test]
async fn bot_population_keeps_the_grid_consistent() {
    let (sim, _sink) = build(config(40, 40, 8, true));
    assert_eq!(sim.populate_bots().await.unwrap(), 8);
    assert_consistent(&sim).await;

    let mut total_fills = 0_usize;
    for _ in 0..200 {
        let summary = sim.step().await;
        total_fills += summary.fills;
        sim.settle().await;
        assert_consistent(&sim).await;
    }

    assert_eq!(sim.current_tick(), 200);
    let standings = sim.standings().await;
    assert!(!standings.is_empty());
    assert!(standings.windows(2).all(|w| w[0].claimed_cells >= w[1].claimed_cells));
    // Bots that live long enough close loops.
    assert!(total_fills > 0);
}

#[tokio::test]
async fn snapshot_is_a_detached_copy() {
    let (sim, _sink) = build(config(16, 16, 0, false));
    let id = PlayerId::new(1);
    let player = sim.join("Racer", id).await.unwrap();
    let at = player.location;

    let view = sim
        .snapshot_region(at.row..at.row + 1, at.col..at.col + 1)
        .await;
    assert_eq!(view.len(), 1);
    assert_eq!(view[0][0].owner, Some(id));

    drive_into_wall(&sim, id).await;
    sim.settle().await;
    // The copy still shows the old owner.
    assert_eq!(view[0][0].owner, Some(id));
    let fresh = sim
        .snapshot_region(at.row..at.row + 1, at.col..at.col + 1)
        .await;
    assert_eq!(fresh[0][0].owner, None);
}

#[tokio::test]
async fn driver_runs_to_the_tick_bound_and_stops_cleanly() {
    let mut cfg = config(30, 30, 4, true);
    cfg.world.max_ticks = 20;
    let (sim, _sink) = build(cfg);

    sim.start().await.unwrap();
    assert!(matches!(sim.start().await, Err(SimulationError::AlreadyStarted)));

    tokio::time::timeout(Duration::from_secs(10), sim.finished())
        .await
        .unwrap();
    let result = sim.stop().await.unwrap();

    assert_eq!(result.end_reason, EndReason::MaxTicksReached);
    assert_eq!(result.total_ticks, 20);
    assert_eq!(sim.current_tick(), 20);
    assert_consistent(&sim).await;
}

#[tokio::test]
async fn stop_interrupts_an_unbounded_run() {
    let (sim, _sink) = build(config(30, 30, 2, true));
    sim.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let result = sim.stop().await.unwrap();
    assert_eq!(result.end_reason, EndReason::Stopped);
    assert!(result.total_ticks >= 1);
    assert!(matches!(sim.stop().await, Err(SimulationError::NotStarted)));
}
