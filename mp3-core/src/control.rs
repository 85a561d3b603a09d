//! The control layer: button events in, pipeline/display actions out.
//!
//! Button interrupts are translated into [`ControlEvent`]s by the
//! firmware's input tasks; the [`Controller`] here is the pure state
//! machine behind them. It owns the playlist cursor, the pause phase
//! and the volume level, and answers every event with the list of
//! side effects the firmware task should apply.

use heapless::Vec;
use playlist::Playlist;

use crate::state::VolumeLevel;
use crate::{SongName, MAX_SONG_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Toggle between playing and paused.
    PauseToggle,
    /// Move the playlist cursor one entry down.
    NavigateDown,
    /// Play the song under the cursor.
    SelectSong,
    /// The current song drained; move on to the next one.
    Advance,
    VolumeUp,
    VolumeDown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlAction {
    /// Put a song request into the request slot.
    Request(SongName),
    /// Suspend the player.
    Pause,
    /// Resume the player.
    Resume,
    /// Push a new attenuation to the decoder.
    SetVolume(VolumeLevel),
    ShowPlaylist,
    ShowPlaying,
    ShowPaused,
    ShowVolume(VolumeLevel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Playing,
    Paused,
}

pub type Actions = Vec<ControlAction, 4>;

pub struct Controller<const MAX_SONGS: usize> {
    phase: PlaybackPhase,
    playlist: Playlist<MAX_SONGS, MAX_SONG_NAME>,
    volume: VolumeLevel,
}

impl<const MAX_SONGS: usize> Controller<MAX_SONGS> {
    pub fn new(playlist: Playlist<MAX_SONGS, MAX_SONG_NAME>) -> Self {
        Controller {
            phase: PlaybackPhase::Idle,
            playlist,
            volume: VolumeLevel::default(),
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn volume(&self) -> VolumeLevel {
        self.volume
    }

    pub fn playlist(&self) -> &Playlist<MAX_SONGS, MAX_SONG_NAME> {
        &self.playlist
    }

    pub fn handle(&mut self, event: ControlEvent) -> Actions {
        let mut actions = Actions::new();

        match event {
            ControlEvent::PauseToggle => match self.phase {
                PlaybackPhase::Idle => {}
                PlaybackPhase::Playing => {
                    self.phase = PlaybackPhase::Paused;
                    push(&mut actions, ControlAction::Pause);
                    push(&mut actions, ControlAction::ShowPaused);
                }
                PlaybackPhase::Paused => {
                    self.phase = PlaybackPhase::Playing;
                    push(&mut actions, ControlAction::Resume);
                    push(&mut actions, ControlAction::ShowPlaying);
                }
            },

            ControlEvent::NavigateDown => {
                self.playlist.scroll_down();
                push(&mut actions, ControlAction::ShowPlaylist);
            }

            ControlEvent::SelectSong => {
                if let Some(name) = self.current_song() {
                    // Selecting while paused implies play.
                    if self.phase == PlaybackPhase::Paused {
                        push(&mut actions, ControlAction::Resume);
                    }
                    self.phase = PlaybackPhase::Playing;
                    push(&mut actions, ControlAction::Request(name));
                    push(&mut actions, ControlAction::ShowPlaying);
                }
            }

            ControlEvent::Advance => {
                // Only a playing system advances; a song that ends
                // right as the user pauses or stops stays put.
                if self.phase == PlaybackPhase::Playing {
                    self.playlist.scroll_down();
                    if let Some(name) = self.current_song() {
                        push(&mut actions, ControlAction::Request(name));
                        push(&mut actions, ControlAction::ShowPlaying);
                    }
                }
            }

            ControlEvent::VolumeUp => {
                self.volume = self.volume.up();
                push(&mut actions, ControlAction::SetVolume(self.volume));
                push(&mut actions, ControlAction::ShowVolume(self.volume));
            }

            ControlEvent::VolumeDown => {
                self.volume = self.volume.down();
                push(&mut actions, ControlAction::SetVolume(self.volume));
                push(&mut actions, ControlAction::ShowVolume(self.volume));
            }
        }

        actions
    }

    fn current_song(&self) -> Option<SongName> {
        self.playlist
            .current()
            .and_then(|name| SongName::try_from(name).ok())
    }
}

// Actions has room for the longest action list any event produces.
fn push(actions: &mut Actions, action: ControlAction) {
    let _ = actions.push(action);
}
