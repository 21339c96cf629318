use std::io::{self, BufRead, Write};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::render::{OutputStyle, TerminalRenderer};

/// The operator at the other end of an update: answers confirmations and sits
/// through advisory pauses.
pub(crate) trait Operator {
    fn confirm(&self, prompt: &str) -> Result<bool>;

    /// Waits `seconds` so the operator can abort with Ctrl-C. Never reads
    /// stdin, which child processes started afterwards may need.
    fn pause(&self, seconds: u64, reason: &str) -> Result<()>;

    fn notify(&self, status: &str, message: &str);
}

pub(crate) struct TerminalOperator {
    renderer: TerminalRenderer,
}

impl TerminalOperator {
    pub(crate) fn new(renderer: TerminalRenderer) -> Self {
        Self { renderer }
    }
}

impl Operator for TerminalOperator {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        print!("{prompt} [y/N]: ");
        io::stdout().flush().context("failed flushing prompt")?;
        let mut answer = String::new();
        io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("failed reading confirmation")?;
        Ok(parse_confirmation(&answer))
    }

    fn pause(&self, seconds: u64, reason: &str) -> Result<()> {
        self.renderer.print_status("warn", reason);
        println!("Press Ctrl-C to abort, or rerun with --no-pause to skip this wait.");

        let progress = (self.renderer.style() == OutputStyle::Rich).then(|| {
            let bar = ProgressBar::new(seconds);
            if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:20.yellow/blue}] {pos}/{len}s") {
                bar.set_style(style.progress_chars("=>-"));
            }
            bar.set_message("continuing in");
            bar
        });
        countdown(Duration::from_secs(seconds), |elapsed| {
            if let Some(bar) = &progress {
                bar.set_position(elapsed.as_secs());
            }
        });
        if let Some(bar) = progress {
            bar.finish_and_clear();
        }
        tracing::debug!("pause of {seconds}s elapsed");
        Ok(())
    }

    fn notify(&self, status: &str, message: &str) {
        self.renderer.print_status(status, message);
    }
}

pub(crate) fn parse_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Ticks every 100ms until `total` elapses. The last tick reports `total`.
pub(crate) fn countdown(total: Duration, mut on_tick: impl FnMut(Duration)) {
    let started = Instant::now();
    loop {
        let elapsed = started.elapsed();
        on_tick(elapsed.min(total));
        if elapsed >= total {
            return;
        }
        thread::sleep(Duration::from_millis(100).min(total - elapsed));
    }
}
