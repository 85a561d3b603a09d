//! Screen layouts, rendered through the [`Surface`] seam.
//!
//! Each `draw_*` function paints one full screen; `draw_volume` only
//! repaints the bottom row so the bar can overlay whichever screen is
//! up.

use heapless::String;

use crate::display::{Surface, ROWS};
use crate::pipeline::NowPlaying;
use crate::state::VolumeLevel;
use playlist::Playlist;

/// Characters per display row.
pub const COLUMNS: usize = 16;

type Line = String<COLUMNS>;

/// The playlist page containing the cursor, one song per row, with a
/// `>` marker on the cursor row.
pub async fn draw_playlist<S, const MAX_SONGS: usize, const NAME_LEN: usize>(
    surface: &mut S,
    playlist: &Playlist<MAX_SONGS, NAME_LEN>,
) -> Result<(), S::Error>
where
    S: Surface,
{
    surface.erase_all().await?;

    for (row, (index, name)) in playlist.window(ROWS as usize).enumerate() {
        let mut line = Line::new();
        let marker = if index == playlist.cursor() { '>' } else { ' ' };
        let _ = line.push(marker);
        push_clipped(&mut line, name);
        surface.print(&line, row as u8).await?;
    }

    Ok(())
}

pub async fn draw_playing<S: Surface>(surface: &mut S, name: &str) -> Result<(), S::Error> {
    surface.erase_all().await?;
    surface.print("Playing", 0).await?;
    surface.print(&clipped(name), 2).await
}

pub async fn draw_paused<S: Surface>(surface: &mut S, name: &str) -> Result<(), S::Error> {
    surface.erase_all().await?;
    surface.print("|| paused", 0).await?;
    surface.print(&clipped(name), 2).await
}

/// The tag screen for the current song. Songs without a trailer tag
/// get the file name and a placeholder instead.
pub async fn draw_metadata<S: Surface>(
    surface: &mut S,
    now_playing: &NowPlaying,
) -> Result<(), S::Error> {
    surface.erase_all().await?;

    match &now_playing.tag {
        Some(tag) => {
            surface.print("TITLE:", 0).await?;
            surface.print(&clipped(&tag.title), 1).await?;
            surface.print("Artist:", 2).await?;
            surface.print(&clipped(&tag.artist), 3).await?;
            surface.print("Year:", 4).await?;
            surface.print(&clipped(&tag.year), 5).await?;
            surface.print("Album", 6).await?;
            surface.print(&clipped(&tag.album), 7).await?;
        }
        None => {
            surface.print(&clipped(&now_playing.name), 0).await?;
            surface.print("(no tag)", 1).await?;
        }
    }

    Ok(())
}

/// A bar of filled cells on the bottom row, one cell per volume step.
pub async fn draw_volume<S: Surface>(
    surface: &mut S,
    level: VolumeLevel,
) -> Result<(), S::Error> {
    let mut line = Line::new();
    let _ = line.push_str("Vol [");
    for step in 0..VolumeLevel::STEPS as u8 {
        let _ = line.push(if step <= level.step() { '#' } else { ' ' });
    }
    let _ = line.push(']');

    surface.erase_row(ROWS - 1).await?;
    surface.print(&line, ROWS - 1).await
}

fn clipped(text: &str) -> Line {
    let mut line = Line::new();
    push_clipped(&mut line, text);
    line
}

// Stops at the right edge instead of failing on long names.
fn push_clipped(line: &mut Line, text: &str) {
    for ch in text.chars() {
        if line.push(ch).is_err() {
            break;
        }
    }
}
