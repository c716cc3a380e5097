//! LoopAvatar entrypoint: a looping video avatar that reacts to the microphone,
//! clip endings and commands sent over TCP.
//!
//! # Architecture
//!
//! - Audio thread: cpal callback storing the latest loudness
//! - Listener threads: accept loop plus one handler per connection
//! - Main thread: rules, state machine, decode, filters and presentation

mod cli_utils;
mod presenter;

use anyhow::{Context, Result};
use clap::Parser;
use loopavatar::config::AppConfig;
use loopavatar::driver::{run_loop, Avatar, Presenter};
use loopavatar::filters::FilterPipeline;
use loopavatar::rules::{ClipEndSignal, CommandQueue, RuleRegistry, RuleSettings};
use loopavatar::state::{load_assets, StateMachine, StateTable};
use loopavatar::video::{FfmpegSource, VideoPlayer};
use loopavatar::{audio::LoudnessMeter, init_logging, init_tracing, log_debug, log_file_path, log_panic};
use std::panic;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::cli_utils::{describe_table, list_input_devices};
use crate::presenter::{spawn_quit_watcher, HeadlessPresenter};

fn main() -> Result<()> {
    let mut config = AppConfig::parse();
    if config.list_input_devices {
        list_input_devices()?;
        return Ok(());
    }

    config.validate()?;
    init_logging(&config);
    init_tracing(&config);
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        log_panic(info);
        previous(info);
    }));
    log_debug("=== LoopAvatar Started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));

    let mut table = match &config.states_file {
        Some(path) => StateTable::load(path)?,
        None => StateTable::builtin(&config.loudness_presets()),
    };
    load_assets(&mut table, &config.assets_dir);
    log_debug(&describe_table(&table));

    let meter = LoudnessMeter::new();
    let clip_end = ClipEndSignal::new();
    let mut rules = RuleRegistry::new(meter, clip_end.clone(), CommandQueue::new());
    let settings = RuleSettings {
        input_device: config.input_device.clone(),
        listen_addr: config.listener_addr(),
    };
    rules.initialize(&table.rule_kinds(), &settings);
    if let Some(listener) = rules.command_listener() {
        log_debug(&format!("Listening for commands on {}", listener.local_addr()));
    }

    let machine = StateMachine::new(table, &config.initial_state, &config.fallback_state)
        .context("invalid state configuration")?;
    let source = FfmpegSource::new(config.ffmpeg_cmd.clone(), config.ffprobe_cmd.clone());
    let player = VideoPlayer::new(source, config.player_config(), clip_end);
    let filters = FilterPipeline::new(config.filter_config());
    let mut avatar = Avatar::new(machine, player, filters, rules);
    avatar.start();

    let cancel = Arc::new(AtomicBool::new(false));
    spawn_quit_watcher(Arc::clone(&cancel));
    let mut presenter = open_presenter(&config)?;
    let presented = run_loop(&mut avatar, presenter.as_mut(), config.tick_interval(), &cancel);
    log_debug(&format!("=== LoopAvatar Exiting ({presented} frames) ==="));
    Ok(())
}

fn open_presenter(config: &AppConfig) -> Result<Box<dyn Presenter>> {
    if config.headless {
        return Ok(Box::new(HeadlessPresenter::default()));
    }
    #[cfg(feature = "window")]
    {
        let window = presenter::WindowPresenter::open(config.width, config.height)?;
        Ok(Box::new(window))
    }
    #[cfg(not(feature = "window"))]
    {
        eprintln!("Built without the window feature; running headless.");
        Ok(Box::new(HeadlessPresenter::default()))
    }
}
