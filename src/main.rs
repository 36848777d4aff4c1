//! Gravity Runner entry point
//!
//! Headless host: loads settings and the stage, reads commands from stdin and
//! reports what the game does through the log.
//!
//! Usage: `gravity-runner [settings.json] [internal|external]`
//!
//! Commands (one per line): `start` (or empty line), `f` flip gravity,
//! `p` pause, `r` resume, `v` victory, `q` quit.

use std::io::BufRead;
use std::process::ExitCode;
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use gravity_runner::consts::SPRITE_FRAMES;
use gravity_runner::sim::CoinAvailability;
use gravity_runner::{
    Event, GameManager, LoopDrive, Notification, Notifications, RunState, Settings,
    StageDefinition, cell_of, host_channel,
};

const DEFAULT_SETTINGS: &str = "settings.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Flip,
    Pause,
    Resume,
    Victory,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "" | "s" | "start" => Some(Command::Start),
            "f" | "flip" => Some(Command::Flip),
            "p" | "pause" => Some(Command::Pause),
            "r" | "resume" => Some(Command::Resume),
            "v" | "victory" => Some(Command::Victory),
            "q" | "quit" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Forward stdin lines as commands. End of input quits.
fn spawn_input_thread() -> Receiver<Command> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match Command::parse(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        return;
                    }
                }
                None => log::warn!("Unknown command '{}'", line.trim()),
            }
        }
        let _ = tx.send(Command::Quit);
    });
    rx
}

/// Host-side view of the game
struct Host {
    runtime: tokio::runtime::Runtime,
    manager: GameManager,
    notifications: Notifications,
    coins: u32,
    last_frame: Instant,
}

impl Host {
    /// Apply a command. Returns false once the host should exit.
    fn handle(&mut self, command: Command) -> bool {
        let result = match command {
            Command::Start => self.start(),
            Command::Flip => match self.manager.player() {
                Some(player) => self.runtime.block_on(player.gravity_flip()).map(|flipped| {
                    if !flipped {
                        log::debug!("Cannot flip while airborne");
                    }
                }),
                None => Ok(()),
            },
            Command::Pause => self.runtime.block_on(self.manager.pause()).map(drop),
            Command::Resume => self.runtime.block_on(self.manager.resume()).map(drop),
            Command::Victory => self.runtime.block_on(self.manager.victory()),
            Command::Quit => return false,
        };

        if let Err(fault) = result {
            log::error!("{command:?} failed: {fault}");
        }
        true
    }

    fn start(&mut self) -> Result<(), gravity_runner::ActorFault> {
        let completion = self.runtime.block_on(self.manager.start())?;
        self.last_frame = Instant::now();
        self.runtime.spawn(async move {
            match completion.finished().await {
                Ok(()) => log::info!("Run finished"),
                Err(fault) => log::error!("Run aborted: {fault}"),
            }
        });
        Ok(())
    }

    /// Tick the game when the host owns the update loop
    fn drive(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;

        if self.manager.run_state() != RunState::Running {
            return;
        }
        match self.runtime.block_on(self.manager.update(dt)) {
            Ok(_) => self.manager.present(),
            Err(fault) => log::error!("Update failed: {fault}"),
        }
    }

    fn observe(&mut self) {
        for Notification { source, event } in self.notifications.drain() {
            match event {
                Event::RunStateChanged(state) => log::info!(
                    "Run state: {} (background #{:06X})",
                    state.as_str(),
                    state.background()
                ),
                Event::LevelChanged(level) => log::info!(
                    "Level {} (max speed {:.2})",
                    level.number,
                    level.max_x_speed
                ),
                Event::Started => {
                    self.coins = 0;
                    log::info!("Go!");
                }
                Event::Present => {
                    if let Some(player) = self.manager.player() {
                        let (column, row) = cell_of(player.position().corner);
                        log::trace!("Player at cell ({column}, {row})");
                    }
                }
                Event::CoinCaptured { coin } => log::debug!("Touched {coin}"),
                Event::AvailabilityChanged(CoinAvailability::Captured) => {
                    self.coins += 1;
                    log::info!("Coins: {}", self.coins);
                }
                Event::AvailabilityChanged(CoinAvailability::Free) => {}
                Event::AnimationChanged(animation) => log::trace!(
                    "{source} sprite {}:{}",
                    animation.sequence.index(),
                    animation.sprite_index(SPRITE_FRAMES)
                ),
            }
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let settings_path = args.next().unwrap_or_else(|| DEFAULT_SETTINGS.to_string());
    let mut settings = Settings::load(&settings_path);
    if let Some(drive) = args.next() {
        match LoopDrive::from_str(&drive) {
            Some(drive) => settings.drive = drive,
            None => log::warn!("Unknown loop drive '{drive}', keeping {}", settings.drive.as_str()),
        }
    }

    let definition = match StageDefinition::load(&settings.stage_path) {
        Ok(definition) => definition,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("Failed to start the async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let (host_context, notifications) = host_channel();
    let manager = {
        let _guard = runtime.enter();
        GameManager::new(&definition, &host_context, &settings)
    };
    log::info!(
        "Gravity Runner ready ({} loop). Press enter to start.",
        settings.drive.as_str()
    );

    let commands = spawn_input_thread();
    let frame = settings.frame_interval();
    let mut host = Host {
        runtime,
        manager,
        notifications,
        coins: 0,
        last_frame: Instant::now(),
    };

    loop {
        match commands.recv_timeout(frame) {
            Ok(command) => {
                if !host.handle(command) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if settings.drive == LoopDrive::External {
            host.drive();
        }
        host.observe();
    }

    log::info!("Bye ({} coins)", host.coins);
    host.runtime.shutdown_background();
    ExitCode::SUCCESS
}
