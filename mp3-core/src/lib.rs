#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

//! Core of the SD-card MP3 player: the reader/player streaming
//! pipeline, the control state machine and the screen rendering.
//!
//! Everything in this crate is hardware-free. The firmware injects the
//! storage backend, the decoder sink and the display surface through
//! the traits in [`storage`], [`pipeline`] and [`display`], and all
//! synchronisation goes through embassy-sync primitives handed to the
//! tasks at construction.

pub mod control;
pub mod display;
pub mod pipeline;
pub mod state;
pub mod storage;
pub mod ui;

/// Longest accepted song file name.
pub const MAX_SONG_NAME: usize = 32;

pub type SongName = heapless::String<MAX_SONG_NAME>;
