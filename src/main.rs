//! `zvm` command-line entry point.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info};
use zmachine::config::Config;
use zmachine::cpu::{HaltReason, Machine, StepOutcome};
use zmachine::display_manager::create_display;
use zmachine::memory::Memory;
use zmachine::zrand::ZRand;

struct Args {
    story_path: PathBuf,
    config_path: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut story_path = None;
    let mut config_path = None;
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                config_path = Some(PathBuf::from(iter.next().ok_or("--config requires a path")?));
            }
            other if story_path.is_none() => story_path = Some(PathBuf::from(other)),
            other => return Err(format!("unexpected argument: {other}")),
        }
    }
    Ok(Args { story_path: story_path.ok_or("usage: zvm [--config <file>] <story-file>")?, config_path })
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let config = match Config::resolve(args.config_path.as_deref(), &args.story_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let bytes = match std::fs::read(&args.story_path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("failed to read {:?}: {e}", args.story_path);
            return ExitCode::FAILURE;
        }
    };

    let memory = match Memory::load(bytes) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("failed to load story file: {e}");
            return ExitCode::FAILURE;
        }
    };

    let version = memory.version();
    let mut display = match create_display(version, config.display.into()) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("failed to start display: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut machine = Machine::new(memory);
    machine.rand = match config.random_seed {
        Some(seed) => ZRand::new_predictable(seed),
        None => ZRand::new_uniform(),
    };

    info!("running {:?}, version {}", args.story_path, version);

    loop {
        match machine.step(display.as_mut()) {
            Ok(StepOutcome::Running) => continue,
            Ok(StepOutcome::Halted(HaltReason::Quit)) => {
                info!("game issued quit");
                break;
            }
            Ok(StepOutcome::Halted(HaltReason::GameOver)) => {
                info!("game over");
                break;
            }
            Ok(StepOutcome::NeedsLineInput { text_buffer, parse_buffer, max_len }) => {
                let _ = display.force_refresh();
                let mut line = String::new();
                if io::stdin().read_line(&mut line).is_err() {
                    break;
                }
                let line = line.trim_end_matches(['\n', '\r']);
                let truncated: String = line.chars().take(max_len).collect();
                if let Err(e) = machine.complete_line_input(text_buffer, parse_buffer, &truncated) {
                    error!("input handling failed: {e}");
                    break;
                }
            }
            Ok(StepOutcome::NeedsCharInput { store_var }) => {
                let _ = io::stdout().flush();
                let mut line = String::new();
                if io::stdin().read_line(&mut line).is_err() {
                    break;
                }
                let ch = line.chars().next().unwrap_or('\n');
                if let Err(e) = machine.complete_char_input(store_var, ch) {
                    error!("input handling failed: {e}");
                    break;
                }
            }
            Err(e) => {
                error!("execution fault: {e}");
                break;
            }
        }
    }

    ExitCode::SUCCESS
}
