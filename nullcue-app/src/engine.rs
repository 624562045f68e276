use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use nullcue_core::{ColourName, EventRecorder, Palette};
use nullcue_experiment::{assign_palette, ExperimentConfig, Rig, Session, SessionReport};
use nullcue_timing::HighPrecisionClock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{error, info};
use winit::event_loop::EventLoopProxy;

use crate::app::UiCommand;
use crate::devices::{InputMessage, MarkerLog, NullRecorder, WindowDisplay, WindowInput};

/// Who is sitting and where their data goes.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub participant: String,
    pub session: u32,
    pub assigned_colour: ColourName,
    pub seed: u64,
    pub output_dir: PathBuf,
    pub skip_practice: bool,
}

impl SessionInfo {
    fn participant_dir(&self) -> PathBuf {
        self.output_dir.join(&self.participant)
    }

    fn suffix(&self, testing: bool) -> String {
        if testing {
            format!("session_{}_test", self.session)
        } else {
            format!("session_{}", self.session)
        }
    }

    pub fn data_path(&self, testing: bool) -> PathBuf {
        self.participant_dir()
            .join(format!("data_{}.json", self.suffix(testing)))
    }

    pub fn marker_path(&self) -> PathBuf {
        self.participant_dir()
            .join(format!("markers_{}.log", self.suffix(false)))
    }
}

#[derive(Serialize)]
struct SavedSession<'a> {
    participant: &'a str,
    session: u32,
    assigned_colour: ColourName,
    seed: u64,
    palette: Palette,
    config: &'a ExperimentConfig,
    #[serde(flatten)]
    report: &'a SessionReport,
}

type Recorder = Box<dyn EventRecorder + Send>;

/// Runs one session on its own thread, talking to the window through channels.
pub struct Engine {
    config: ExperimentConfig,
    info: SessionInfo,
    proxy: EventLoopProxy<UiCommand>,
    clock: HighPrecisionClock,
}

impl Engine {
    pub fn new(config: ExperimentConfig, info: SessionInfo, proxy: EventLoopProxy<UiCommand>) -> Self {
        Self {
            config,
            info,
            proxy,
            clock: HighPrecisionClock::new(),
        }
    }

    /// Shared time base for flips, key presses and markers.
    pub fn clock(&self) -> &HighPrecisionClock {
        &self.clock
    }

    pub fn spawn(self, input: Receiver<InputMessage>) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("nullcue-engine".into())
            .spawn(move || {
                if let Err(e) = self.run(input) {
                    error!("engine stopped: {e:#}");
                }
                // the loop may already be closing
                let _ = self.proxy.send_event(UiCommand::Exit);
            })
    }

    fn recorder(&self) -> Result<Recorder> {
        if self.config.testing {
            return Ok(Box::new(NullRecorder));
        }
        let path = self.info.marker_path();
        let file = create(&path)?;
        info!(path = %path.display(), "writing event markers");
        Ok(Box::new(MarkerLog::new(BufWriter::new(file), self.clock.clone())))
    }

    fn run(&self, input: Receiver<InputMessage>) -> Result<()> {
        let mut rng = StdRng::seed_from_u64(self.info.seed);
        let palette = assign_palette(self.info.assigned_colour, &mut rng)?;
        info!(?palette, "palette assigned");

        let rig = Rig::new(
            WindowDisplay::new(self.proxy.clone()),
            WindowInput::new(input),
            self.recorder()?,
            self.clock.clone(),
        );
        let mut session = Session::new(self.config.clone(), palette, rig, rng)?;
        let report = session.run(self.info.skip_practice);
        info!(
            trials = report.trials.len(),
            blocks = report.blocks.len(),
            completed = report.completed,
            cancelled = report.cancelled,
            "session over"
        );

        let saved = self.save(palette, &report);
        if let Err(e) = &saved {
            error!("could not save results: {e:#}");
        }
        session.finish(&report)?;
        saved
    }

    fn save(&self, palette: Palette, report: &SessionReport) -> Result<()> {
        let path = self.info.data_path(self.config.testing);
        let saved = SavedSession {
            participant: &self.info.participant,
            session: self.info.session,
            assigned_colour: self.info.assigned_colour,
            seed: self.info.seed,
            palette,
            config: &self.config,
            report,
        };
        let file = create(&path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &saved)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "results saved");
        Ok(())
    }
}

fn create(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    File::create(path).with_context(|| format!("creating {}", path.display()))
}
