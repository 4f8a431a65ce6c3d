// Song lookup by title and artist

use std::io::{BufRead, Write};
use log::{debug, warn};

use crate::data::Track;
use crate::helpers::duration::format_duration;
use crate::queue::{Confirmation, ProviderError, QueueProvider, TrackSearch};
use super::prompt::Console;
use super::CliError;

/// Find the song the user means. `None` means skip this song.
///
/// Results are limited to tracks credited to exactly `artist`. Without a
/// match the user may paste a track URI or link instead.
pub fn find_song<R: BufRead, W: Write>(
    search: &dyn TrackSearch,
    provider: &dyn QueueProvider,
    console: &mut Console<R, W>,
    title: &str,
    artist: &str,
) -> Result<Option<Track>, CliError> {
    let mut results = search.search_tracks(title, artist)?;
    debug!("{} results for '{}' by {}", results.len(), title, artist);

    match results.len() {
        0 => {
            console.say(&format!("No songs called '{}' by {} were found.", title, artist))?;
            ask_for_reference(provider, console)
        }
        1 => {
            let track = results.remove(0);
            let question = format!("Found {}. Press Enter to use it or 'e' to skip: ", track);
            match console.confirm(&question)? {
                Confirmation::Proceed => Ok(Some(track)),
                Confirmation::Abort => Ok(None),
            }
        }
        count => {
            console.say("Several songs match:")?;
            for (i, track) in results.iter().enumerate() {
                let album = track.album.as_deref().unwrap_or("unknown album");
                console.say(&format!("{}. {} from {} ({})", i + 1, track, album, format_duration(track.duration_ms)))?;
            }
            console.say("0. None of these")?;
            match console.choose("Select a song: ", 0, count)? {
                Some(0) | None => Ok(None),
                Some(choice) => Ok(Some(results.swap_remove(choice - 1))),
            }
        }
    }
}

fn ask_for_reference<R: BufRead, W: Write>(
    provider: &dyn QueueProvider,
    console: &mut Console<R, W>,
) -> Result<Option<Track>, CliError> {
    loop {
        let reference = match console.ask("Paste a Spotify track URI or link (empty to skip): ")? {
            Some(line) if !line.trim().is_empty() => line,
            _ => return Ok(None),
        };

        match provider.track(reference.trim()) {
            Ok(track) => {
                console.say(&format!("Using {}", track))?;
                return Ok(Some(track));
            }
            Err(ProviderError::TrackNotFound(reference)) => {
                warn!("Track not found: {}", reference);
                console.say(&format!("No track found for '{}'.", reference))?;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
