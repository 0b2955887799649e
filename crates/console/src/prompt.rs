use std::io::{BufRead, Write};

use thesis_client::dispatcher::Confirm;

/// Asks on the terminal; anything but `y`/`yes` declines.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        tokio::task::block_in_place(|| {
            let mut stderr = std::io::stderr();
            if write!(stderr, "{prompt} [y/N] ").and_then(|_| stderr.flush()).is_err() {
                return false;
            }
            let mut answer = String::new();
            match std::io::stdin().lock().read_line(&mut answer) {
                Ok(_) => is_yes(&answer),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not read confirmation");
                    false
                }
            }
        })
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
