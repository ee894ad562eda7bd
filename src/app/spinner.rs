//! Waiting indicator for terminal feedback while the scan is blocked or paused

use crate::core::styles::StyleRole;
use crate::scanner::ScanState;
use std::io::Write;
use tokio::sync::watch;
use tokio::time::{interval, Duration};

const BRAILLE_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Check if the indicator should be displayed
pub fn should_show_spinner() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Message shown for states that wait on something external
pub fn waiting_message(state: ScanState) -> Option<&'static str> {
    match state {
        ScanState::Blocked => Some("Waiting for the network to recover"),
        ScanState::Paused => Some("Paused; remove the pause marker to continue"),
        _ => None,
    }
}

/// Simple spinner struct
pub struct ProgressSpinner {
    frame_index: usize,
    color: bool,
}

impl ProgressSpinner {
    pub fn new(color: bool) -> Self {
        Self {
            frame_index: 0,
            color,
        }
    }

    fn next_frame(&mut self) -> char {
        let frame = BRAILLE_FRAMES[self.frame_index];
        self.frame_index = (self.frame_index + 1) % BRAILLE_FRAMES.len();
        frame
    }

    pub fn tick(&mut self, message: &str) {
        let frame = self.next_frame();
        eprint!(
            "\r{} {}",
            frame,
            StyleRole::Waiting.paint(message, self.color)
        );
        let _ = std::io::stderr().flush();
    }

    pub fn finish(&self) {
        eprint!("\r\x1b[2K");
        let _ = std::io::stderr().flush();
    }
}

/// Animate while the scheduler sits in a waiting state; ends with the channel
pub async fn run_spinner(mut state_rx: watch::Receiver<ScanState>, color: bool) {
    if !should_show_spinner() {
        return;
    }

    let mut spinner = ProgressSpinner::new(color);
    let mut update_interval = interval(Duration::from_millis(100)); // 10Hz
    let mut showing = false;

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    if showing {
                        spinner.finish();
                    }
                    return;
                }
                if showing && waiting_message(*state_rx.borrow()).is_none() {
                    spinner.finish();
                    showing = false;
                }
            }

            _ = update_interval.tick() => {
                let message = waiting_message(*state_rx.borrow());
                if let Some(message) = message {
                    spinner.tick(message);
                    showing = true;
                }
            }
        }
    }
}
