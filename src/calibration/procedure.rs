//! # Calibration Procedure
//!
//! Walks the operator through the calibration phases and turns the
//! measurements into a [`CalibrationRecord`].
//!
//! ## Phases
//!
//! | Phase | Operator action | Measurement |
//! |---|---|---|
//! | Resting | release the stick | resting band, both axes |
//! | Left | hold full left, wiggle | X minimum |
//! | Right | hold full right, wiggle | X maximum |
//! | Down | hold full down, wiggle | Y minimum |
//! | Up | hold full up, wiggle | Y maximum |
//!
//! The run is all or nothing: an abort or fault in any phase ends it without
//! producing a record.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::abort::AbortSignal;
use super::record::{AxisBands, Band, CalibrationRecord};
use super::sampler::{Direction, RestingMethod, Sampler};
use super::slope::derive_record;
use crate::adc::{Axis, RawSource};
use crate::error::{JoystickError, Result};

/// One operator-gated step of the calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resting,
    Left,
    Right,
    Down,
    Up,
}

impl Phase {
    /// All phases, in the order they run.
    pub const ALL: [Phase; 5] = [Phase::Resting, Phase::Left, Phase::Right, Phase::Down, Phase::Up];

    /// Axis and direction measured in this phase, `None` for [`Phase::Resting`].
    #[must_use]
    pub fn target(&self) -> Option<(Axis, Direction)> {
        match self {
            Phase::Resting => None,
            Phase::Left => Some((Axis::X, Direction::Min)),
            Phase::Right => Some((Axis::X, Direction::Max)),
            Phase::Down => Some((Axis::Y, Direction::Min)),
            Phase::Up => Some((Axis::Y, Direction::Max)),
        }
    }

    /// Instruction shown to the operator before the phase starts.
    #[must_use]
    pub fn prompt(&self) -> &'static str {
        match self {
            Phase::Resting => "Release the joystick, then press Enter to capture the resting state",
            Phase::Left => "Move the joystick fully left and wiggle it, then press Enter to capture the lowest X value",
            Phase::Right => "Move the joystick fully right and wiggle it, then press Enter to capture the highest X value",
            Phase::Down => "Move the joystick fully down and wiggle it, then press Enter to capture the lowest Y value",
            Phase::Up => "Move the joystick fully up and wiggle it, then press Enter to capture the highest Y value",
        }
    }
}

/// What a phase measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseReading {
    /// Resting band per axis
    Resting(AxisBands),
    /// A single extreme of travel
    Extreme {
        axis: Axis,
        direction: Direction,
        value: u16,
    },
}

/// Outcome of a calibration run that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationOutcome {
    /// Every phase completed and the slopes were derived
    Completed(CalibrationRecord),
    /// The operator interrupted the run; nothing was produced
    Aborted,
}

/// The person (or script) driving the calibration.
#[async_trait]
pub trait Operator: Send {
    /// Waits until the operator is ready for `phase`.
    ///
    /// Returning `OperatorAbort` ends the run cleanly.
    async fn ready(&mut self, phase: Phase) -> Result<()>;

    /// Reports the measurement taken in `phase`.
    fn captured(&mut self, phase: Phase, reading: &PhaseReading);

    /// Reports the finished record.
    fn completed(&mut self, _record: &CalibrationRecord) {}
}

/// Runs the phase sequence over a sampler.
#[derive(Debug)]
pub struct Calibrator<S> {
    sampler: Sampler<S>,
    resting_method: RestingMethod,
}

impl<S: RawSource> Calibrator<S> {
    pub fn new(sampler: Sampler<S>, resting_method: RestingMethod) -> Self {
        Self {
            sampler,
            resting_method,
        }
    }

    /// Releases the sampler.
    pub fn into_sampler(self) -> Sampler<S> {
        self.sampler
    }

    /// Runs every phase and derives the calibration record.
    ///
    /// # Returns
    ///
    /// `Completed` with the record, or `Aborted` if the operator interrupted
    /// any phase.
    ///
    /// # Errors
    ///
    /// - `Acquisition`: a reading failed
    /// - `CalibrationDegenerate`: an extreme never left the resting band
    pub async fn run<O>(&mut self, operator: &mut O) -> Result<CalibrationOutcome>
    where
        O: Operator + ?Sized,
    {
        match self.run_phases(operator).await {
            Ok(record) => Ok(CalibrationOutcome::Completed(record)),
            Err(JoystickError::OperatorAbort) => {
                info!("Calibration aborted by operator");
                Ok(CalibrationOutcome::Aborted)
            }
            Err(e) => Err(e),
        }
    }

    async fn run_phases<O>(&mut self, operator: &mut O) -> Result<CalibrationRecord>
    where
        O: Operator + ?Sized,
    {
        operator.ready(Phase::Resting).await?;
        let resting = match self.resting_method {
            RestingMethod::Average => self.sampler.resting_average().await?,
            RestingMethod::Extent => self.sampler.resting_extent().await?.bands,
        };
        info!(
            "Resting band: X {}..={} Y {}..={}",
            resting.x.low, resting.x.high, resting.y.low, resting.y.high
        );
        operator.captured(Phase::Resting, &PhaseReading::Resting(resting));

        let mut travel = AxisBands {
            x: Band::new(0, 0),
            y: Band::new(0, 0),
        };

        for phase in &Phase::ALL[1..] {
            let Some((axis, direction)) = phase.target() else {
                continue;
            };

            operator.ready(*phase).await?;
            let value = self.sampler.capture_extreme(axis, direction).await?;
            debug!("{:?} phase captured {}", phase, value);

            let band = match axis {
                Axis::X => &mut travel.x,
                Axis::Y => &mut travel.y,
            };
            match direction {
                Direction::Min => band.low = value,
                Direction::Max => band.high = value,
            }

            operator.captured(
                *phase,
                &PhaseReading::Extreme {
                    axis,
                    direction,
                    value,
                },
            );
        }

        let record = derive_record(resting, travel)?;
        info!(
            "Calibration complete: X slopes {:.8}/{:.8}, Y slopes {:.8}/{:.8}",
            record.x.slope_low, record.x.slope_high, record.y.slope_low, record.y.slope_high
        );
        operator.completed(&record);
        Ok(record)
    }
}

/// Operator at a terminal: prompts on stdout, waits for Enter on stdin.
///
/// Stdin is read on a dedicated thread so a pending read never holds up
/// shutdown. End of input counts as an abort.
#[derive(Debug)]
pub struct TerminalOperator {
    lines: mpsc::UnboundedReceiver<String>,
    abort: AbortSignal,
}

impl TerminalOperator {
    /// Starts reading stdin.
    pub fn spawn(abort: AbortSignal) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            use std::io::BufRead;
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Self::from_lines(rx, abort)
    }

    /// Builds an operator from an existing line stream.
    pub fn from_lines(lines: mpsc::UnboundedReceiver<String>, abort: AbortSignal) -> Self {
        Self { lines, abort }
    }
}

#[async_trait]
impl Operator for TerminalOperator {
    async fn ready(&mut self, phase: Phase) -> Result<()> {
        if phase == Phase::Left {
            println!();
            println!("Please note:");
            println!("   The next steps ask you to hold the joystick at each extreme.");
            println!("   Wiggle it slightly back and forth while holding it there so");
            println!("   the true highest/lowest point is seen.");
        }
        println!();
        println!("{}", phase.prompt());

        tokio::select! {
            line = self.lines.recv() => match line {
                Some(_) => Ok(()),
                None => Err(JoystickError::OperatorAbort),
            },
            _ = self.abort.aborted() => Err(JoystickError::OperatorAbort),
        }
    }

    fn captured(&mut self, _phase: Phase, reading: &PhaseReading) {
        match reading {
            PhaseReading::Resting(bands) => println!(
                "Resting X low: {}  X high: {}  Y low: {}  Y high: {}",
                bands.x.low, bands.x.high, bands.y.low, bands.y.high
            ),
            PhaseReading::Extreme {
                axis,
                direction,
                value,
            } => {
                let label = match direction {
                    Direction::Min => "low",
                    Direction::Max => "high",
                };
                println!("{} {}: {:>10}", axis, label, value);
            }
        }
    }

    fn completed(&mut self, record: &CalibrationRecord) {
        println!();
        println!("You may release the joystick now");
        println!("Readings:");
        println!("    Lowest X:  {:>6}", record.x.extreme_low);
        println!("    Highest X: {:>6}", record.x.extreme_high);
        println!("    Lowest Y:  {:>6}", record.y.extreme_low);
        println!("    Highest Y: {:>6}", record.y.extreme_high);
        println!("Slopes:");
        println!("    Low X:  {:>12.8}", record.x.slope_low);
        println!("    High X: {:>12.8}", record.x.slope_high);
        println!("    Low Y:  {:>12.8}", record.y.slope_low);
        println!("    High Y: {:>12.8}", record.y.slope_high);
    }
}
