//! Manager state and run-state transitions
//!
//! Everything the game manager actor owns lives here. Transitions are plain
//! methods on `ManagerState`; the manager runs them as exclusive operations.

use std::sync::Arc;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::Event;
use super::character::Character;
use super::stage::{LevelState, Stage};
use crate::actor::{ActorFault, HostContext, Notifier};
use crate::consts::{PLAYER_SIZE, X_ACCELERATION};

/// Current phase of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    NotStarted,
    Running,
    Paused,
    GameOver,
    Victory,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::NotStarted => "Not started",
            RunState::Running => "Running",
            RunState::Paused => "Paused",
            RunState::GameOver => "Game over",
            RunState::Victory => "Victory",
        }
    }

    /// Background colour hint (0xRRGGBB)
    pub fn background(&self) -> u32 {
        match self {
            RunState::NotStarted => 0xF0FFFF, // azure
            RunState::Running => 0x6495ED,    // cornflower blue
            RunState::Paused => 0x808080,
            RunState::GameOver => 0x000000,
            RunState::Victory => 0xFFD700, // gold
        }
    }

    /// Whether `start` begins a new run from this state
    pub fn can_start(&self) -> bool {
        matches!(self, RunState::NotStarted | RunState::GameOver)
    }
}

/// How a run ended: cleanly, or with the fault that stopped the update loop
pub type RunOutcome = Result<(), ActorFault>;

/// Completing side of a run completion handle
#[derive(Debug, Clone)]
pub struct RunSignal {
    tx: Arc<watch::Sender<Option<RunOutcome>>>,
}

impl RunSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Record the outcome. Only the first call has any effect.
    pub fn finish(&self, outcome: RunOutcome) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        })
    }

    pub fn subscribe(&self) -> RunCompletion {
        RunCompletion {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for RunSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once the run it was handed out for has ended
#[derive(Debug, Clone)]
pub struct RunCompletion {
    rx: watch::Receiver<Option<RunOutcome>>,
}

impl RunCompletion {
    /// Wait for the run to end
    pub async fn finished(mut self) -> RunOutcome {
        match self.rx.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone().unwrap_or(Err(ActorFault::Stopped)),
            Err(_) => Err(ActorFault::Stopped),
        }
    }

    /// Outcome so far, `None` while the run is still going
    pub fn outcome(&self) -> Option<RunOutcome> {
        self.rx.borrow().clone()
    }
}

/// State owned by the game manager actor
#[derive(Debug, Clone)]
pub struct ManagerState {
    pub run_state: RunState,
    pub level: LevelState,
    pub stage: Stage,
    /// Spawned when the first run starts
    pub player: Option<Character>,
    pub velocity: DVec2,
    pub x_acceleration: f64,
    pub completion: RunSignal,
}

impl ManagerState {
    pub fn new(stage: Stage) -> Self {
        Self {
            run_state: RunState::NotStarted,
            level: LevelState::from(&stage.first_level()),
            stage,
            player: None,
            velocity: DVec2::ZERO,
            x_acceleration: 0.0,
            completion: RunSignal::new(),
        }
    }

    fn set_run_state(&mut self, run_state: RunState, notifier: &Notifier) {
        self.run_state = run_state;
        notifier.notify(Event::RunStateChanged(run_state));
    }

    /// Begin a new run if none is in progress. Returns whether a run began,
    /// with the completion handle of the current run either way.
    pub fn begin_run(&mut self, host: &HostContext, notifier: &Notifier) -> (bool, RunCompletion) {
        if !self.run_state.can_start() {
            log::debug!("Start ignored while {}", self.run_state.as_str());
            return (false, self.completion.subscribe());
        }

        let level = self.stage.first_level();
        self.level = LevelState::from(&level);
        self.player = Some(Character::spawn(self.stage.player_start, PLAYER_SIZE, host));
        self.stage = self.stage.with_reset_coins();
        self.x_acceleration = X_ACCELERATION;
        self.velocity = DVec2::new(level.max_x_speed, 0.0);
        self.completion = RunSignal::new();

        self.set_run_state(RunState::Running, notifier);
        notifier.notify(Event::Started);
        log::info!(
            "Run started at ({:.1}, {:.1}) with {} coins",
            self.stage.player_start.x,
            self.stage.player_start.y,
            self.stage.coins.len()
        );
        (true, self.completion.subscribe())
    }

    pub fn pause(&mut self, notifier: &Notifier) -> bool {
        if self.run_state != RunState::Running {
            log::debug!("Pause ignored while {}", self.run_state.as_str());
            return false;
        }
        self.set_run_state(RunState::Paused, notifier);
        true
    }

    pub fn resume(&mut self, notifier: &Notifier) -> bool {
        if self.run_state != RunState::Paused {
            log::debug!("Resume ignored while {}", self.run_state.as_str());
            return false;
        }
        self.set_run_state(RunState::Running, notifier);
        true
    }

    pub fn game_over(&mut self, notifier: &Notifier) {
        if self.run_state == RunState::GameOver {
            return;
        }
        self.set_run_state(RunState::GameOver, notifier);
        self.completion.finish(Ok(()));
        log::info!("Game over on level {}", self.level.number);
    }

    pub fn victory(&mut self, notifier: &Notifier) {
        if self.run_state == RunState::Victory {
            return;
        }
        self.set_run_state(RunState::Victory, notifier);
        self.completion.finish(Ok(()));
        log::info!("Victory on level {}", self.level.number);
    }
}
