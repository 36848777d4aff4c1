//! Stage definition loading and the per-run stage snapshot
//!
//! A stage file is UTF-8 text:
//! - Line 1 is a header of tab-separated `key=value` fields. Keys are
//!   case-insensitive: `Width`, `Height`, `View`, `Levels`. Spaces around
//!   keys and numbers are ignored.
//! - Every following line is a grid row, top row first. `=` runs are
//!   platforms, `C` is a coin, `P` is the player start.
//!
//! Loading either yields a complete definition or fails; nothing is
//! recovered from a malformed file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::coin::Coin;
use crate::actor::HostContext;
use crate::consts::{BASE_LEVEL_SPEED, COIN_RADIUS, LEVEL_SPEED_FACTOR};
use crate::geom::{Circle, Rect};

/// Stage file errors
#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to read stage file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("stage file is empty")]
    Empty,
    #[error("header field '{0}' is not a key=value pair")]
    MalformedField(String),
    #[error("unknown header parameter '{0}'")]
    UnknownParameter(String),
    #[error("invalid value '{value}' for header parameter '{key}'")]
    InvalidValue { key: String, value: String },
    #[error("width, height and view must all be set to positive values")]
    MissingDimensions,
    #[error("level threshold {threshold} does not increase on {previous}")]
    NonIncreasingLevel { previous: f64, threshold: f64 },
    #[error("stage declares {height} rows but supplies {rows}")]
    TooManyRows { height: i32, rows: usize },
}

/// Which grid row produced a platform (used for texturing)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformOrientation {
    OuterTop,
    OuterBottom,
    Inner,
}

/// A solid, immutable platform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub orientation: PlatformOrientation,
    pub region: Rect,
}

/// A level starts once the player passes `start_x`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub number: u32,
    pub max_x_speed: f64,
    pub start_x: f64,
}

impl Level {
    /// Level 1 is implicit and starts at the left edge of the stage
    pub fn first() -> Self {
        Self {
            number: 1,
            max_x_speed: BASE_LEVEL_SPEED,
            start_x: 0.0,
        }
    }

    /// Level following this one, starting at `start_x`
    pub fn next(&self, start_x: f64) -> Self {
        Self {
            number: self.number + 1,
            max_x_speed: self.max_x_speed * LEVEL_SPEED_FACTOR,
            start_x,
        }
    }
}

/// Level the player is currently on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelState {
    pub number: u32,
    pub max_x_speed: f64,
}

impl Default for LevelState {
    fn default() -> Self {
        Self::from(&Level::first())
    }
}

impl From<&Level> for LevelState {
    fn from(level: &Level) -> Self {
        Self {
            number: level.number,
            max_x_speed: level.max_x_speed,
        }
    }
}

/// Parsed stage file
#[derive(Debug, Clone, PartialEq)]
pub struct StageDefinition {
    pub width: i32,
    pub height: i32,
    /// Visible stage width
    pub view: i32,
    pub platforms: Vec<Platform>,
    pub coins: Vec<Circle>,
    /// Ordered by strictly increasing `start_x`, level 1 first
    pub levels: Vec<Level>,
    pub player_start: DVec2,
}

impl StageDefinition {
    /// Read and parse a stage file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StageError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| StageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let definition = Self::parse(&text)?;

        log::info!(
            "Loaded stage {} ({}x{}, {} platforms, {} coins, {} levels)",
            path.display(),
            definition.width,
            definition.height,
            definition.platforms.len(),
            definition.coins.len(),
            definition.levels.len()
        );
        Ok(definition)
    }

    pub fn parse(text: &str) -> Result<Self, StageError> {
        let mut lines = text.lines();
        let header = lines.next().ok_or(StageError::Empty)?;

        let mut width = 0;
        let mut height = 0;
        let mut view = 0;
        let mut levels = vec![Level::first()];

        for field in header.split('\t').filter(|field| !field.trim().is_empty()) {
            let (key, value) = field
                .split_once('=')
                .ok_or_else(|| StageError::MalformedField(field.to_string()))?;
            let key = key.trim();

            match key.to_ascii_lowercase().as_str() {
                "width" => width = parse_int(key, value)?,
                "height" => height = parse_int(key, value)?,
                "view" => view = parse_int(key, value)?,
                "levels" => {
                    for threshold in value.split(',') {
                        let start_x = f64::from(parse_int(key, threshold)?);
                        let last = levels.last().copied().unwrap_or_else(Level::first);
                        if last.start_x >= start_x {
                            return Err(StageError::NonIncreasingLevel {
                                previous: last.start_x,
                                threshold: start_x,
                            });
                        }
                        levels.push(last.next(start_x));
                    }
                }
                _ => return Err(StageError::UnknownParameter(key.to_string())),
            }
        }

        if width < 1 || height < 1 || view < 1 {
            return Err(StageError::MissingDimensions);
        }

        let rows: Vec<&str> = lines.collect();
        if rows.len() > height as usize {
            return Err(StageError::TooManyRows {
                height,
                rows: rows.len(),
            });
        }

        let mut platforms = Vec::new();
        let mut coins = Vec::new();
        let mut player_start = None;

        for (index, row) in rows.iter().enumerate() {
            let y = height - 1 - index as i32;
            let cells: Vec<char> = row.chars().take(width as usize).collect();
            let mut run_start = None;

            for (x, cell) in cells.iter().enumerate() {
                if *cell == '=' {
                    if run_start.is_none() {
                        run_start = Some(x);
                    }
                    continue;
                }
                if let Some(start) = run_start.take() {
                    platforms.push(platform(start, x, y, height));
                }
                match cell {
                    'C' => coins.push(Circle::new(
                        DVec2::new(x as f64 + 0.5, f64::from(y) + 0.5),
                        COIN_RADIUS,
                    )),
                    'P' => {
                        if player_start.is_some() {
                            log::warn!("Stage has more than one player start, keeping ({x}, {y})");
                        }
                        player_start = Some(DVec2::new(x as f64, f64::from(y)));
                    }
                    _ => {}
                }
            }
            if let Some(start) = run_start {
                platforms.push(platform(start, cells.len(), y, height));
            }
        }

        let player_start = player_start.unwrap_or_else(|| {
            log::warn!("Stage has no player start, using the origin");
            DVec2::ZERO
        });

        Ok(Self {
            width,
            height,
            view,
            platforms,
            coins,
            levels,
            player_start,
        })
    }

    /// Full stage extent
    pub fn bounds(&self) -> Rect {
        Rect::from_xywh(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// Initial viewport: the left `view` columns, full height
    pub fn viewport(&self) -> Rect {
        Rect::from_xywh(0.0, 0.0, f64::from(self.view), f64::from(self.height))
    }
}

fn parse_int(key: &str, value: &str) -> Result<i32, StageError> {
    value
        .trim()
        .parse()
        .map_err(|_| StageError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn platform(start: usize, stop: usize, y: i32, height: i32) -> Platform {
    let orientation = if y == 0 {
        PlatformOrientation::OuterBottom
    } else if y == height - 1 {
        PlatformOrientation::OuterTop
    } else {
        PlatformOrientation::Inner
    };

    Platform {
        orientation,
        region: Rect::from_xywh(start as f64, f64::from(y), (stop - start) as f64, 1.0),
    }
}

/// Stage as seen by one run.
///
/// Cheap to clone: the platform, coin and level lists are shared. The coin
/// list is fixed for a run and replaced with fresh coins when a run starts.
#[derive(Debug, Clone)]
pub struct Stage {
    pub platforms: Arc<[Platform]>,
    pub coins: Arc<[Coin]>,
    pub levels: Arc<[Level]>,
    pub viewport: Rect,
    pub bounds: Rect,
    pub player_start: DVec2,
}

impl Stage {
    /// Spawn the coin actors of `definition`. Must be called from within a
    /// tokio runtime.
    pub fn build(definition: &StageDefinition, host: &HostContext) -> Self {
        Self {
            platforms: definition.platforms.clone().into(),
            coins: definition
                .coins
                .iter()
                .map(|position| Coin::spawn(*position, host))
                .collect(),
            levels: definition.levels.clone().into(),
            viewport: definition.viewport(),
            bounds: definition.bounds(),
            player_start: definition.player_start,
        }
    }

    /// Same stage with every coin replaced by a free copy
    pub fn with_reset_coins(&self) -> Self {
        Self {
            coins: self.coins.iter().map(Coin::reset).collect(),
            ..self.clone()
        }
    }

    pub fn first_level(&self) -> Level {
        self.levels.first().copied().unwrap_or_else(Level::first)
    }

    /// Level after `current`, if the stage has one
    pub fn next_level(&self, current: &LevelState) -> Option<Level> {
        self.levels.get(current.number as usize).copied()
    }
}
