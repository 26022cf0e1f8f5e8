use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};

use quickclip::audio::{AudioEngine, AudioSource, CpalOutput, Transport};
use quickclip::cli::{CliApp, Command, ParseError, StatusDisplay, TransportStatus};
use quickclip::config::ConfigManager;
use quickclip::error::PlayerError;
use quickclip::logging::AudioLogger;
use quickclip::models::PlaybackState;

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);
const WAVEFORM_ROWS: usize = 9;
const WAVEFORM_HEIGHT: f32 = 90.0;

/// Headless shell driving the engine from line commands
pub struct AppController {
    engine: AudioEngine<CpalOutput>,
    config_manager: ConfigManager,
    width: usize,
    watch: bool,
    redraw: Arc<AtomicBool>,
    last_state: PlaybackState,
}

impl AppController {
    pub fn new(cli: &CliApp) -> Result<Self, PlayerError> {
        let mut config_manager = match &cli.config {
            Some(path) => ConfigManager::with_path(path.clone())?,
            None => ConfigManager::new()?,
        };

        if let Some(device) = &cli.device {
            config_manager.set_preferred_device(Some(device.clone()))?;
        }

        let mut config = config_manager.get_config().clone();
        if let Some(loop_count) = cli.loop_count {
            config.loop_count = loop_count;
        }
        if cli.lq {
            config.waveform.hq = false;
        }

        let mut engine = AudioEngine::with_default_device(config);
        if let Some(volume) = cli.volume {
            engine.set_volume(volume as f32 / 100.0);
        }

        let redraw = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&redraw);
        engine.set_invalidator(move || flag.store(true, Ordering::Relaxed));

        info!("Application controller initialized");

        Ok(Self {
            engine,
            config_manager,
            width: cli.width.max(1),
            watch: false,
            redraw,
            last_state: PlaybackState::NotInitialized,
        })
    }

    /// Load a file and start playing it
    pub fn open(&mut self, path: &Path) -> Result<(), PlayerError> {
        let source = AudioSource::from_path(path)?;
        let codec = self.engine.load(source)?;
        println!("Loaded {} ({})", path.display(), codec);
        self.engine.play()
    }

    pub fn execute_command(&mut self, command: Command) -> Result<bool, PlayerError> {
        match command {
            Command::Open { path } => self.open(&path)?,
            Command::Play => self.engine.play()?,
            Command::Stop => self.engine.stop(),
            Command::Eject => self.engine.eject(),
            Command::Forward => self.engine.forward(),
            Command::Back => self.engine.back(),
            Command::Seek { delta_secs } => self.engine.seek(delta_secs),
            Command::Goto { ratio } => self.engine.seek_float(ratio),
            Command::Volume { level } => {
                self.engine.set_volume(level as f32 / 100.0);
                println!("Volume: {}%", level);
            }
            Command::Hq { enabled } => self.engine.set_hq(enabled),
            Command::Wave => {
                let points = self.engine.render_waveform(self.width, WAVEFORM_HEIGHT);
                StatusDisplay::display_waveform(&points, WAVEFORM_ROWS, WAVEFORM_HEIGHT);
            }
            Command::Watch => {
                self.watch = !self.watch;
                if !self.watch {
                    println!();
                }
            }
            Command::Status => {
                StatusDisplay::display_full_status(&TransportStatus::from_engine(&self.engine));
            }
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    /// Redraw tick: observe completion and refresh the live line
    fn on_tick(&mut self) {
        let state = self.engine.tick();
        if state != self.last_state && state == PlaybackState::Finished {
            println!("\nFinished. Type 'play' to start again.");
        }
        self.last_state = state;

        if self.redraw.swap(false, Ordering::Relaxed) && self.watch {
            // Keep the smoothing running at the redraw rate
            self.engine.render_waveform(self.width, WAVEFORM_HEIGHT);
            StatusDisplay::display_position_update(&TransportStatus::from_engine(&self.engine));
        }
    }

    pub async fn run_interactive_mode(&mut self) -> Result<(), PlayerError> {
        println!("quickclip {}", env!("CARGO_PKG_VERSION"));
        println!("Type 'help' for available commands, 'quit' to exit.");

        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let shutdown_flag_clone = Arc::clone(&shutdown_flag);
        if let Err(e) = ctrlc::set_handler(move || {
            shutdown_flag_clone.store(true, Ordering::Relaxed);
        }) {
            warn!("Could not install Ctrl-C handler: {}", e);
        }

        let mut interval = tokio::time::interval(REDRAW_INTERVAL);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.send(line.trim().to_string()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        loop {
            if shutdown_flag.load(Ordering::Relaxed) {
                println!("\nReceived interrupt signal. Shutting down...");
                break;
            }

            tokio::select! {
                biased;

                line = rx.recv() => {
                    let Some(line) = line else {
                        break;
                    };
                    if line.is_empty() {
                        continue;
                    }
                    match CliApp::parse_command(&line) {
                        Ok(command) => match self.execute_command(command) {
                            Ok(true) => {}
                            Ok(false) => break,
                            Err(e) => self.handle_error(&e),
                        },
                        Err(ParseError::HelpRequested) => CliApp::display_help(),
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            println!("Type 'help' for available commands.");
                        }
                    }
                }

                _ = interval.tick() => self.on_tick(),
            }
        }

        self.shutdown();
        Ok(())
    }

    fn handle_error(&self, error: &PlayerError) {
        let level = error.severity().log_level();
        log::log!(level, "{}", error);
        StatusDisplay::display_simple_error(error);
    }

    /// Tear down playback and persist the volume
    pub fn shutdown(&mut self) {
        self.engine.eject();

        let volume = self.engine.volume();
        if let Err(e) = self.config_manager.set_volume(volume) {
            warn!("Could not save configuration: {}", e);
        }
        info!("Shutdown complete");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = AudioLogger::init() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let cli = CliApp::parse();

    if cli.list_devices {
        match CpalOutput::new(None).list_devices() {
            Ok(devices) => devices.iter().for_each(|name| println!("{}", name)),
            Err(e) => {
                StatusDisplay::display_simple_error(&PlayerError::from(e));
                std::process::exit(1);
            }
        }
        return;
    }

    let mut app = match AppController::new(&cli) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize: {}", e);
            StatusDisplay::display_simple_error(&e);
            std::process::exit(1);
        }
    };

    if let Some(path) = &cli.file {
        if let Err(e) = app.open(path) {
            app.handle_error(&e);
        }
    }

    if let Err(e) = app.run_interactive_mode().await {
        StatusDisplay::display_simple_error(&e);
        std::process::exit(1);
    }
}
