use crate::audio::graph::LoopCount;
use clap::Parser;
use std::path::PathBuf;

pub mod status;
pub use status::{StatusDisplay, TransportStatus};

/// Command line arguments of the terminal shell
#[derive(Debug, Parser)]
#[command(name = "quickclip")]
#[command(about = "Play a short audio clip and watch its waveform")]
#[command(version)]
pub struct CliApp {
    /// WAV, MP3 or FLAC file to open
    pub file: Option<PathBuf>,

    /// Start volume (0-100), overrides the saved level
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub volume: Option<u8>,

    /// Extra passes after the first one, or "forever"
    #[arg(long = "loop", value_parser = parse_loop_count)]
    pub loop_count: Option<LoopCount>,

    /// Render the waveform at reduced resolution
    #[arg(long)]
    pub lq: bool,

    /// Output device name
    #[arg(long)]
    pub device: Option<String>,

    /// List output devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Alternate configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Waveform width in columns
    #[arg(long, default_value_t = 64)]
    pub width: usize,
}

/// Line commands accepted while the shell is running
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open { path: PathBuf },
    Play,
    Stop,
    Eject,
    Forward,
    Back,
    /// Relative seek in seconds
    Seek { delta_secs: f64 },
    /// Absolute seek as a fraction of the length
    Goto { ratio: f64 },
    /// Volume in percent
    Volume { level: u8 },
    Hq { enabled: bool },
    Wave,
    Watch,
    Status,
    Quit,
}

impl CliApp {
    /// Parse command line arguments
    pub fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Expand tilde (~) in path to home directory
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home_dir) = dirs::home_dir() {
                return home_dir.join(rest);
            }
        } else if path == "~" {
            return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
        }
        PathBuf::from(path)
    }

    /// Parse one interactive line
    pub fn parse_command(input: &str) -> Result<Command, ParseError> {
        let args: Vec<&str> = input.split_whitespace().collect();
        let Some(&name) = args.first() else {
            return Err(ParseError::EmptyCommand);
        };

        let required = |argument: &str| {
            args.get(1).copied().ok_or_else(|| ParseError::MissingArgument {
                command: name.to_string(),
                argument: argument.to_string(),
            })
        };

        match name {
            "open" | "o" => {
                if args.len() < 2 {
                    return Err(ParseError::MissingArgument {
                        command: name.to_string(),
                        argument: "path".to_string(),
                    });
                }
                Ok(Command::Open {
                    path: Self::expand_path(&args[1..].join(" ")),
                })
            }
            "play" | "p" => Ok(Command::Play),
            "stop" | "s" => Ok(Command::Stop),
            "eject" | "e" => Ok(Command::Eject),
            "forward" | "f" => Ok(Command::Forward),
            "back" | "b" => Ok(Command::Back),
            "seek" => {
                let value = required("seconds")?;
                let delta_secs = Self::parse_offset(value)?;
                Ok(Command::Seek { delta_secs })
            }
            "goto" | "g" => {
                let value = required("percent")?;
                let percent: f64 = value
                    .trim_end_matches('%')
                    .parse()
                    .map_err(|_| ParseError::InvalidArgument {
                        argument: "position".to_string(),
                        value: value.to_string(),
                        expected: "percentage 0-100".to_string(),
                    })?;
                Ok(Command::Goto { ratio: percent / 100.0 })
            }
            "volume" | "v" => {
                let value = required("level")?;
                match value.parse::<u8>() {
                    Ok(level) if level <= 100 => Ok(Command::Volume { level }),
                    _ => Err(ParseError::InvalidArgument {
                        argument: "volume level".to_string(),
                        value: value.to_string(),
                        expected: "0-100".to_string(),
                    }),
                }
            }
            "hq" => match required("on|off")? {
                "on" => Ok(Command::Hq { enabled: true }),
                "off" => Ok(Command::Hq { enabled: false }),
                other => Err(ParseError::InvalidArgument {
                    argument: "hq".to_string(),
                    value: other.to_string(),
                    expected: "on or off".to_string(),
                }),
            },
            "wave" | "w" => Ok(Command::Wave),
            "watch" => Ok(Command::Watch),
            "status" => Ok(Command::Status),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            "help" | "h" | "?" => Err(ParseError::HelpRequested),
            _ => Err(ParseError::UnknownCommand {
                command: name.to_string(),
            }),
        }
    }

    /// Parse a signed offset: "5", "-2.5", "+10s", "-1:30"
    pub fn parse_offset(input: &str) -> Result<f64, ParseError> {
        let invalid = || ParseError::InvalidTimeFormat {
            input: input.to_string(),
        };
        let trimmed = input.trim();
        let (sign, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (-1.0, &trimmed[1..]),
            Some(b'+') => (1.0, &trimmed[1..]),
            _ => (1.0, trimmed),
        };
        if body.is_empty() {
            return Err(invalid());
        }

        let secs = if let Some((minutes, seconds)) = body.split_once(':') {
            let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
            let seconds: f64 = seconds.parse().map_err(|_| invalid())?;
            if !(0.0..60.0).contains(&seconds) {
                return Err(invalid());
            }
            minutes as f64 * 60.0 + seconds
        } else {
            let seconds: f64 = body.trim_end_matches('s').parse().map_err(|_| invalid())?;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(invalid());
            }
            seconds
        };

        Ok(sign * secs)
    }

    /// Display help information
    pub fn display_help() {
        println!("quickclip - Available Commands:");
        println!();
        println!("Transport:");
        println!("  open <path>      (o) - Load a file, ejecting the current one");
        println!("  play             (p) - Start, resume or restart playback");
        println!("  stop             (s) - Suspend playback, keeping the position");
        println!("  eject            (e) - Tear down playback");
        println!("  forward          (f) - Skip ahead one step");
        println!("  back             (b) - Skip back one step");
        println!("  seek <+/-secs>       - Move relative to the current position");
        println!("  goto <percent>   (g) - Jump to a position in the clip");
        println!("  volume <0-100>   (v) - Set the output level");
        println!();
        println!("Display:");
        println!("  wave             (w) - Print the current waveform");
        println!("  watch                - Toggle the live status line");
        println!("  hq on|off            - Waveform resolution");
        println!("  status               - Show transport status");
        println!();
        println!("  help, quit");
    }
}

/// Parse `--loop` values: a pass count or "forever"
pub fn parse_loop_count(value: &str) -> Result<LoopCount, String> {
    match value {
        "forever" | "inf" => Ok(LoopCount::Forever),
        n => n
            .parse::<u32>()
            .map(LoopCount::Times)
            .map_err(|_| format!("expected a number or \"forever\", got '{}'", n)),
    }
}

/// Command parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    #[error("Missing argument for {command}: {argument}")]
    MissingArgument { command: String, argument: String },

    #[error("Invalid argument {argument}: got '{value}', expected {expected}")]
    InvalidArgument {
        argument: String,
        value: String,
        expected: String,
    },

    #[error("Invalid time format: {input}")]
    InvalidTimeFormat { input: String },

    #[error("Help requested")]
    HelpRequested,
}

#[cfg(test)]
mod tests;
