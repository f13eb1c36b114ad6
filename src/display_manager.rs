//! Display manager: picks a display backend for the running environment
//! and wraps it with logging when requested.

use crate::display_headless::HeadlessDisplay;
use crate::display_logging::LoggingDisplay;
use crate::display_trait::{DisplayError, ZMachineDisplay};
use crate::display_v3::V3Display;
use log::debug;

#[derive(Debug, Clone, Default)]
pub enum DisplayMode {
    /// Terminal if stdout is a tty, headless otherwise.
    #[default]
    Auto,
    Terminal,
    Headless,
}

#[derive(Debug)]
pub struct DisplayCapabilities {
    pub has_terminal: bool,
    pub is_interactive: bool,
}

impl DisplayCapabilities {
    pub fn detect() -> Self {
        Self {
            has_terminal: atty::is(atty::Stream::Stdout),
            is_interactive: atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout),
        }
    }
}

pub fn create_display(version: u8, mode: DisplayMode) -> Result<Box<dyn ZMachineDisplay>, DisplayError> {
    let caps = DisplayCapabilities::detect();
    debug!("display capabilities: {:?}, mode {:?} for version {}", caps, mode, version);

    let mut display: Box<dyn ZMachineDisplay> = match mode {
        DisplayMode::Auto => {
            if caps.has_terminal {
                Box::new(V3Display::new()?)
            } else {
                Box::new(HeadlessDisplay::new()?)
            }
        }
        DisplayMode::Terminal => Box::new(V3Display::new()?),
        DisplayMode::Headless => Box::new(HeadlessDisplay::new()?),
    };

    if std::env::var("DISPLAY_LOG").is_ok() {
        debug!("wrapping display with logging");
        display = Box::new(LoggingDisplay::new(display));
    }

    Ok(display)
}
