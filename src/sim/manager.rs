//! Game manager actor
//!
//! Owns the run-state machine, the stage snapshot and the player's motion.
//! With `LoopDrive::Internal` a started run gets its own update loop task
//! that ticks the manager until the run is over.

use tokio::time::Instant;

use super::Event;
use super::character::Character;
use super::stage::{LevelState, Stage, StageDefinition};
use super::state::{ManagerState, RunCompletion, RunSignal, RunState};
use super::tick::tick;
use crate::actor::{Actor, ActorId, HostContext, Pending};
use crate::settings::{LoopDrive, Settings};

/// Handle to the game manager
#[derive(Debug, Clone)]
pub struct GameManager {
    actor: Actor<ManagerState>,
    settings: Settings,
}

impl GameManager {
    /// Build the manager and the stage's coins. Must be called from within a
    /// tokio runtime.
    pub fn new(definition: &StageDefinition, host: &HostContext, settings: &Settings) -> Self {
        let stage = Stage::build(definition, host);
        Self {
            actor: Actor::spawn(ManagerState::new(stage), host),
            settings: settings.clone(),
        }
    }

    pub fn id(&self) -> ActorId {
        self.actor.id()
    }

    /// Start a new run. While a run is in progress this is a no-op that
    /// hands back the current run's completion handle.
    pub fn start(&self) -> Pending<RunCompletion> {
        let manager = self.clone();
        self.actor.exclusive(move |state, notifier| {
            let (started, completion) = state.begin_run(&notifier.host(), notifier);
            if started && manager.settings.drive == LoopDrive::Internal {
                tokio::spawn(manager.update_loop(state.completion.clone()));
            }
            completion
        })
    }

    /// Pause a running game. Resolves to false in any other state.
    pub fn pause(&self) -> Pending<bool> {
        self.actor.exclusive(|state, notifier| state.pause(notifier))
    }

    /// Resume a paused game. Resolves to false in any other state.
    pub fn resume(&self) -> Pending<bool> {
        self.actor.exclusive(|state, notifier| state.resume(notifier))
    }

    pub fn victory(&self) -> Pending<()> {
        self.actor.exclusive(|state, notifier| state.victory(notifier))
    }

    /// Run one tick of `dt` seconds (clamped to the configured max step).
    /// Resolves to the run state after the tick.
    pub fn update(&self, dt: f64) -> Pending<RunState> {
        let dt = self.settings.clamp_step(dt);
        self.actor
            .exclusive_joined(move |state, notifier| tick(state, dt, notifier))
    }

    pub fn run_state(&self) -> RunState {
        self.actor.read(|state| state.run_state)
    }

    pub fn level(&self) -> LevelState {
        self.actor.read(|state| state.level)
    }

    /// Stage snapshot after the latest tick
    pub fn stage(&self) -> Stage {
        self.actor.read(|state| state.stage.clone())
    }

    /// Current player, once a run has been started
    pub fn player(&self) -> Option<Character> {
        self.actor.read(|state| state.player.clone())
    }

    pub fn velocity(&self) -> glam::DVec2 {
        self.actor.read(|state| state.velocity)
    }

    /// Ask the host to redraw. The internal loop calls this after every
    /// tick; a host driving `update` itself calls it after its own ticks.
    pub fn present(&self) {
        self.actor.notifier().notify(Event::Present);
    }

    async fn update_loop(self, signal: RunSignal) {
        self.drive_loop(signal, |manager, dt| manager.update(dt))
            .await;
    }

    /// Tick with `step` until a tick reports game over or faults
    async fn drive_loop<F>(self, signal: RunSignal, step: F)
    where
        F: Fn(&GameManager, f64) -> Pending<RunState>,
    {
        let clock = Instant::now();
        let frame = self.settings.frame_interval();
        let mut t0 = 0.0;
        log::debug!("Update loop started");

        loop {
            let elapsed = clock.elapsed().as_secs_f64();
            match step(&self, elapsed - t0).await {
                Ok(RunState::GameOver) => break,
                Ok(_) => {}
                Err(fault) => {
                    log::error!("Update loop stopped: {fault}");
                    signal.finish(Err(fault));
                    return;
                }
            }
            t0 = elapsed;

            self.present();
            tokio::time::sleep(frame).await;
        }

        log::debug!("Update loop finished");
    }
}
