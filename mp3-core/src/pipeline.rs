//! The producer/consumer streaming pipeline.
//!
//! The reader pulls 512-byte blocks from storage into a capacity-2
//! queue; the player drains the queue byte-by-byte into the decoder.
//! Song requests arrive through a single-slot overwrite signal and are
//! honoured by the reader between block reads. Both tasks are generic
//! over the `RawMutex`, so the firmware runs them on
//! `CriticalSectionRawMutex` while host tests use `NoopRawMutex`.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_sync::watch;

use song_meta::{TrailerTag, TRAILER_LEN};

use crate::storage::{File, Storage, StorageError};
use crate::SongName;

/// Size of one streamable audio unit.
pub const BLOCK_SIZE: usize = 512;

/// How many blocks may be in flight between reader and player.
pub const QUEUE_DEPTH: usize = 2;

/// Receiver slots on the now-playing and pause watches.
pub const WATCH_CONSUMERS: usize = 2;

/// One unit of audio payload. Owned by the reader until enqueued, by
/// the player after dequeue; never shared. `len < BLOCK_SIZE` only for
/// the final partial block of a file.
#[derive(Debug)]
pub struct AudioBlock {
    pub bytes: [u8; BLOCK_SIZE],
    pub len: usize,
}

impl AudioBlock {
    fn empty() -> Self {
        AudioBlock {
            bytes: [0; BLOCK_SIZE],
            len: 0,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// The bounded block queue: strict FIFO, one producer, one consumer,
/// await-on-full and await-on-empty.
pub type BlockQueue<M> = Channel<M, AudioBlock, QUEUE_DEPTH>;

/// Single-slot song request: a new request overwrites an unserviced
/// one, and the reader picks it up at its next poll point.
pub type SongRequests<M> = Signal<M, SongName>;

/// Raised by the reader when a song drained to a clean end-of-file.
pub type SongEnded<M> = Signal<M, ()>;

/// What the UI knows about the song being streamed.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub name: SongName,
    /// Trailer tag, when the file is long enough to carry one.
    pub tag: Option<TrailerTag>,
}

pub type NowPlayingWatch<M> = watch::Watch<M, NowPlaying, WATCH_CONSUMERS>;
pub type PauseWatch<M> = watch::Watch<M, bool, WATCH_CONSUMERS>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The file drained to end-of-file; `blocks` were enqueued.
    Finished { blocks: usize },
    /// A new song request arrived mid-stream and the rest of the file
    /// was abandoned.
    Superseded,
}

/// The producer half: services song requests by streaming the named
/// file into the block queue.
pub struct Reader<'a, M: RawMutex, S: Storage> {
    storage: S,
    requests: &'a SongRequests<M>,
    blocks: &'a BlockQueue<M>,
    now_playing: watch::Sender<'a, M, NowPlaying, WATCH_CONSUMERS>,
    song_ended: &'a SongEnded<M>,
}

impl<'a, M: RawMutex, S: Storage> Reader<'a, M, S> {
    pub fn new(
        storage: S,
        requests: &'a SongRequests<M>,
        blocks: &'a BlockQueue<M>,
        now_playing: watch::Sender<'a, M, NowPlaying, WATCH_CONSUMERS>,
        song_ended: &'a SongEnded<M>,
    ) -> Self {
        Reader {
            storage,
            requests,
            blocks,
            now_playing,
            song_ended,
        }
    }

    /// Wait for song requests and stream each one. A song that fails
    /// to open is logged and skipped; the reader goes back to idle and
    /// waits for the next request.
    pub async fn run(mut self) -> ! {
        loop {
            let name = self.requests.wait().await;
            log::info!("request to play {}", name.as_str());

            match self.stream_song(&name).await {
                Ok(StreamOutcome::Finished { blocks }) => {
                    log::info!("finished {} ({} blocks)", name.as_str(), blocks);
                }
                Ok(StreamOutcome::Superseded) => {
                    log::info!("abandoned {} for a new request", name.as_str());
                }
                Err(err) => {
                    log::warn!("cannot stream {}: {:?}", name.as_str(), err);
                }
            }
        }
    }

    /// Stream one song: read its trailer tag, publish it for the UI,
    /// then enqueue 512-byte blocks until end-of-file or until a new
    /// request supersedes this one.
    pub async fn stream_song(&mut self, name: &SongName) -> Result<StreamOutcome, StorageError> {
        let mut file = self.storage.open(name.as_str()).await?;

        let tag = match read_trailer(&mut file).await {
            Ok(tag) => tag,
            Err(err) => {
                let _ = file.close().await;
                return Err(err);
            }
        };
        self.now_playing.send(NowPlaying {
            name: name.clone(),
            tag,
        });

        let mut blocks_sent = 0;
        loop {
            // A pending request wins over the current file. Checked
            // before each read so no byte past this point is ever
            // enqueued.
            if self.requests.signaled() {
                file.close().await?;
                return Ok(StreamOutcome::Superseded);
            }

            let mut block = AudioBlock::empty();
            match file.read(&mut block.bytes).await {
                Ok(0) => break,
                Ok(n) => {
                    block.len = n;
                    self.blocks.send(block).await;
                    blocks_sent += 1;
                }
                Err(err) => {
                    let _ = file.close().await;
                    return Err(err);
                }
            }
        }

        file.close().await?;

        // Clean end-of-file with nothing newer pending: move on to the
        // next song.
        if !self.requests.signaled() {
            self.song_ended.signal(());
        }

        Ok(StreamOutcome::Finished {
            blocks: blocks_sent,
        })
    }
}

/// Read the 128-byte trailer from `size - 128` and leave the file
/// positioned back at the start. Files too short for a trailer yield
/// `None`.
async fn read_trailer<F: File>(file: &mut F) -> Result<Option<TrailerTag>, StorageError> {
    let size = file.size();
    if (size as usize) < TRAILER_LEN {
        return Ok(None);
    }

    file.seek(size - TRAILER_LEN as u32).await?;

    let mut raw = [0u8; TRAILER_LEN];
    let mut filled = 0;
    while filled < TRAILER_LEN {
        match file.read(&mut raw[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }

    file.seek(0).await?;

    Ok(TrailerTag::parse(&raw[..filled]).ok())
}

/// Byte-oriented seam to the decoder. The firmware implements this
/// over the shared codec driver; tests use recording doubles.
pub trait AudioSink {
    type Error: core::fmt::Debug;

    async fn send_byte(&mut self, byte: u8) -> Result<(), Self::Error>;
}

/// The consumer half: drains the block queue into the decoder one
/// byte at a time, suspending while playback is paused.
pub struct Player<'a, M: RawMutex, D: AudioSink> {
    blocks: &'a BlockQueue<M>,
    paused: watch::Receiver<'a, M, bool, WATCH_CONSUMERS>,
    sink: D,
}

impl<'a, M: RawMutex, D: AudioSink> Player<'a, M, D> {
    /// The pause watch must have been sent its initial value before
    /// the player first polls it.
    pub fn new(
        blocks: &'a BlockQueue<M>,
        paused: watch::Receiver<'a, M, bool, WATCH_CONSUMERS>,
        sink: D,
    ) -> Self {
        Player {
            blocks,
            paused,
            sink,
        }
    }

    pub async fn run(mut self) -> ! {
        loop {
            let block = self.blocks.receive().await;
            if let Err(err) = self.play_block(&block).await {
                // No global error channel: log and resume with the
                // next block.
                log::error!("decoder refused data: {:?}, dropping rest of block", err);
            }
        }
    }

    /// Send every byte of one block, pausing between bytes when asked
    /// to. An interrupted block resumes at the exact byte where it
    /// stopped, so nothing is replayed or skipped.
    pub async fn play_block(&mut self, block: &AudioBlock) -> Result<(), D::Error> {
        for &byte in block.data() {
            self.suspend_while_paused().await;
            self.sink.send_byte(byte).await?;
        }
        Ok(())
    }

    async fn suspend_while_paused(&mut self) {
        while self.paused.get().await {
            self.paused.changed().await;
        }
    }
}
