//! Playback runner - builds the controller from config and drives the tick loop
//!
//! Commands arrive on stdin, one per line, and are handed to the tick loop
//! through a channel. Only the tick loop touches the controller.
//!
//! # Input lines
//!
//! ```text
//! start_preload                      command
//! start_playback                     command
//! trigger_overlay                    control (anything containing trigger_overlay)
//! control <token>                    control
//! set <name> <json value>            configuration update
//! stop                               abort to standby
//! quit                               send feedback_quit and exit
//! ```

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, TryRecvError, unbounded};
use log::{debug, error, info, trace, warn};
use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::cli::RunArgs;
use crate::config::{self, CONFIG_FILE, FeedbackConfig, PathConfig};
use crate::core::{
    Controller, HeadlessRenderer, LogSink, MarkerSink, START_PLAYBACK, START_PRELOAD, Sources,
    TRIGGER_OVERLAY, UdpSink,
};
use crate::entities::{BlockInfo, Loader, MarkerTable, SeqFileSource};

/// One parsed line of driver input
#[derive(Debug, Clone, PartialEq)]
pub enum DriverInput {
    Command(String),
    Control(String),
    Set { name: String, value: serde_json::Value },
    Stop,
    Quit,
}

/// Parse a driver input line; blank lines and `#` comments yield `None`
pub fn parse_input(line: &str) -> Option<DriverInput> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    let input = match word {
        "stop" => DriverInput::Stop,
        "quit" | "exit" => DriverInput::Quit,
        "control" if !rest.is_empty() => DriverInput::Control(rest.to_string()),
        "set" => {
            let (name, raw) = rest.split_once(char::is_whitespace)?;
            let raw = raw.trim();
            // Bare words are taken as strings
            let value = serde_json::from_str(raw)
                .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
            DriverInput::Set {
                name: name.to_string(),
                value,
            }
        }
        _ if line.contains(TRIGGER_OVERLAY) => DriverInput::Control(line.to_string()),
        _ => DriverInput::Command(line.to_string()),
    };
    Some(input)
}

/// When the tick loop ends
#[derive(Debug, Clone, Default)]
pub struct RunLimits {
    /// Stop after this many ticks
    pub max_ticks: Option<u64>,
    /// Stop once a block has played to the end
    pub once: bool,
    /// Sleep to the controller's frame duration between ticks
    pub paced: bool,
    /// Stop when the input channel closes
    pub quit_on_eof: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub blocks_completed: u64,
}

/// Apply one input to the controller; false means quit
pub fn apply_input(ctl: &mut Controller, input: DriverInput) -> bool {
    debug!("Input: {:?}", input);
    match input {
        DriverInput::Command(token) => ctl.push_command(token),
        DriverInput::Control(token) => ctl.push_control(token),
        DriverInput::Set { name, value } => {
            if let Err(e) = ctl.set_param(&name, value) {
                error!("Rejected config update {}: {}", name, e);
            }
        }
        DriverInput::Stop => ctl.stop(),
        DriverInput::Quit => return false,
    }
    true
}

/// Tick the controller until quit or a limit is reached
pub fn drive(ctl: &mut Controller, input: &Receiver<DriverInput>, limits: &RunLimits) -> Result<RunSummary> {
    let start_ticks = ctl.tick_count();
    let mut input_open = true;
    let mut deadline = Instant::now();

    'ticks: loop {
        while input_open {
            match input.try_recv() {
                Ok(msg) => {
                    if !apply_input(ctl, msg) {
                        break 'ticks;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    input_open = false;
                    debug!("Input closed");
                    if limits.quit_on_eof {
                        break 'ticks;
                    }
                }
            }
        }

        if let Some(max) = limits.max_ticks {
            if ctl.tick_count() - start_ticks >= max {
                info!("Tick limit {} reached", max);
                break;
            }
        }

        if let Err(e) = ctl.tick() {
            if limits.once {
                return Err(e).context("Block aborted");
            }
            warn!("Tick failed, continuing in {}: {}", ctl.state_name(), e);
        }

        if limits.once && ctl.blocks_completed() > 0 {
            info!("Block finished, exiting");
            break;
        }

        if limits.paced {
            deadline += ctl.frame_duration();
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            } else if now - deadline > ctl.frame_duration() {
                trace!("Behind schedule by {:?}, resyncing", now - deadline);
                deadline = now;
            }
        }
    }

    Ok(RunSummary {
        ticks: ctl.tick_count() - start_ticks,
        blocks_completed: ctl.blocks_completed(),
    })
}

/// Build a controller from the resolved configuration
pub fn build_controller(config: FeedbackConfig, udp: Option<&str>) -> Result<Controller> {
    let markers = match &config.marker_table {
        Some(path) => MarkerTable::load(path)
            .with_context(|| format!("Failed to load marker table {}", path.display()))?,
        None => MarkerTable::new(),
    };
    info!("Marker table: {} stimulus markers", markers.len());

    let sources = Sources::new(Arc::new(SeqFileSource::new(markers)), Arc::new(Loader));

    let mut sinks: Vec<Box<dyn MarkerSink>> = vec![Box::new(LogSink)];
    if let Some(target) = udp {
        let sink = UdpSink::connect(target)
            .with_context(|| format!("Failed to open marker socket for {}", target))?;
        sinks.push(Box::new(sink));
    }

    Ok(Controller::new(
        config,
        sources,
        Box::new(sinks),
        Box::new(HeadlessRenderer::new()),
    ))
}

/// Load the config file and apply command line overrides
pub fn load_config(args: &RunArgs, path_config: &PathConfig) -> Result<FeedbackConfig> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| config::config_file(CONFIG_FILE, path_config));
    let mut config = FeedbackConfig::load_or_default(&path)?;

    if let Some(block) = &args.block {
        config.next_block_info =
            BlockInfo::parse(block).with_context(|| format!("Invalid --block {}", block))?;
    }
    if args.debug {
        config.display_debug_information = true;
    }
    Ok(config)
}

/// Run the playback loop with stdin as command source
pub fn run_feedback(args: &RunArgs, path_config: &PathConfig) -> Result<RunSummary> {
    let config = load_config(args, path_config)?;
    info!(
        "Screen {}x{} @ {} fps, block: {:?}",
        config.screen_width, config.screen_height, config.screen_fps, config.next_block_info
    );

    let mut ctl = build_controller(config, args.udp.as_deref())?;
    if args.autoplay {
        ctl.push_command(START_PRELOAD);
        ctl.push_command(START_PLAYBACK);
    }

    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if let Some(input) = parse_input(&line) {
                    if tx.send(input).is_err() {
                        break;
                    }
                }
            }
        })
        .context("Failed to spawn stdin reader")?;

    let limits = RunLimits {
        max_ticks: args.ticks,
        once: args.once,
        paced: true,
        quit_on_eof: args.ticks.is_none() && !args.once,
    };
    let summary = drive(&mut ctl, &rx, &limits);
    ctl.quit();
    summary
}
