//! Interactive insertion session on the console

pub mod device;
pub mod prompt;
pub mod search;

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use log::{info, warn};
use thiserror::Error;

use crate::helpers::duration::format_duration;
use crate::helpers::retry::RetryPolicy;
use crate::queue::{MaterializeReport, ProviderError, QueueProvider, Resolution, Session, TrackSearch, WalkError};

pub use device::select_device;
pub use prompt::Console;
pub use search::find_song;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Console I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error("No playback device matches '{0}'")]
    DeviceNotFound(String),
}

/// Collect songs and offsets from the user and commit them.
///
/// Returns `None` when the session was aborted before the commit; in that
/// case nothing was enqueued.
pub fn run_session<R: BufRead, W: Write>(
    provider: &dyn QueueProvider,
    search: &dyn TrackSearch,
    console: &mut Console<R, W>,
    device_id: &str,
    retry: RetryPolicy,
    running: Arc<AtomicBool>,
) -> Result<Option<MaterializeReport>, CliError> {
    let mut session = Session::new(provider, device_id)
        .with_retry_policy(retry)
        .with_running_flag(Arc::clone(&running));

    loop {
        let title = match console.ask("Song title (empty to finish): ")? {
            Some(title) if !title.trim().is_empty() => title.trim().to_string(),
            _ => break,
        };
        let artist = match console.ask("Artist: ")? {
            Some(artist) => artist.trim().to_string(),
            None => break,
        };
        if !running.load(Ordering::SeqCst) {
            return interrupted(console);
        }

        let song = match find_song(search, provider, console, &title, &artist)? {
            Some(song) => song,
            None => continue,
        };
        let offset_ms = match console.offset()? {
            Some(ms) => ms,
            None => break,
        };
        if !running.load(Ordering::SeqCst) {
            return interrupted(console);
        }

        match session.request(song.clone(), offset_ms, &mut *console) {
            Ok(Resolution::Leading { position }) => {
                console.say(&format!("Insert {} at the start of the queue (position {})", song, position + 1))?;
            }
            Ok(Resolution::Anchored { anchor, anchor_end_ms, .. }) => {
                console.say(&format!("Insert {} after {} ({})", song, anchor, format_duration(anchor_end_ms)))?;
            }
            Ok(Resolution::Rejected(reason)) => {
                console.say(&format!("Cannot insert {}: {}", song, reason))?;
            }
            Ok(Resolution::Aborted) => {
                console.say("Session aborted, the queue was not changed.")?;
                return Ok(None);
            }
            Err(WalkError::QueueUnavailable { attempts }) => {
                warn!("Giving up after {} attempts without a current track", attempts);
                console.say("Nothing is playing, the queue was not changed.")?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }
    }

    if session.plan().is_empty() {
        console.say("Nothing to insert.")?;
    } else {
        info!("Committing {} songs", session.plan().len());
    }
    Ok(Some(session.commit()))
}

fn interrupted<R: BufRead, W: Write>(console: &mut Console<R, W>) -> Result<Option<MaterializeReport>, CliError> {
    console.say("Interrupted, the queue was not changed.")?;
    Ok(None)
}

/// Print what a commit did
pub fn print_report<R: BufRead, W: Write>(console: &mut Console<R, W>, report: &MaterializeReport) -> io::Result<()> {
    for step in &report.applied {
        console.say(&format!("  done: {}", step))?;
    }
    for failure in &report.failures {
        console.say(&format!("  FAILED: {} ({})", failure.step, failure.error))?;
    }
    if !report.applied.is_empty() || !report.failures.is_empty() {
        console.say(&format!(
            "{} of {} queue changes applied.",
            report.applied.len(),
            report.applied.len() + report.failures.len()
        ))?;
    }
    Ok(())
}
