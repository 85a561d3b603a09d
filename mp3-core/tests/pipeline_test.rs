//! End-to-end tests of the reader/player pipeline over an in-memory
//! storage backend, driven by joined futures on a single-threaded
//! executor.

use std::cell::RefCell;
use std::rc::Rc;

use embassy_futures::join::join;
use embassy_futures::select::select;
use embassy_futures::yield_now;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;

use mp3_core::pipeline::{
    AudioBlock, AudioSink, BlockQueue, NowPlayingWatch, PauseWatch, Player, Reader, SongEnded,
    SongRequests, StreamOutcome, BLOCK_SIZE, QUEUE_DEPTH,
};
use mp3_core::storage::{File, Storage, StorageError};
use mp3_core::SongName;

const TRAILER_LEN: usize = 128;

struct MemFile {
    data: Vec<u8>,
    pos: usize,
}

impl File for MemFile {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        let remaining = &self.data[self.pos.min(self.data.len())..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }

    async fn seek(&mut self, offset: u32) -> Result<(), StorageError> {
        if offset as usize > self.data.len() {
            return Err(StorageError::Io);
        }
        self.pos = offset as usize;
        Ok(())
    }

    fn size(&self) -> u32 {
        self.data.len() as u32
    }

    async fn close(self) -> Result<(), StorageError> {
        Ok(())
    }
}

struct MemStorage {
    files: Vec<(String, Vec<u8>)>,
}

impl Storage for MemStorage {
    type File<'a> = MemFile;

    async fn open(&mut self, name: &str) -> Result<MemFile, StorageError> {
        self.files
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| MemFile {
                data: data.clone(),
                pos: 0,
            })
            .ok_or(StorageError::NotFound)
    }
}

/// A file of `len` counting bytes whose last 128 bytes carry a trailer
/// tag with the given title.
fn tagged_file(len: usize, title: &str) -> Vec<u8> {
    assert!(len >= TRAILER_LEN);
    let mut data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    let trailer = len - TRAILER_LEN;
    for byte in &mut data[trailer..] {
        *byte = 0;
    }
    data[trailer..trailer + 3].copy_from_slice(b"xyz");
    data[trailer + 3..trailer + 3 + title.len()].copy_from_slice(title.as_bytes());
    data
}

struct Fixture {
    requests: SongRequests<NoopRawMutex>,
    blocks: BlockQueue<NoopRawMutex>,
    now_playing: NowPlayingWatch<NoopRawMutex>,
    song_ended: SongEnded<NoopRawMutex>,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            requests: SongRequests::new(),
            blocks: BlockQueue::new(),
            now_playing: NowPlayingWatch::new(),
            song_ended: SongEnded::new(),
        }
    }

    fn reader(&self, storage: MemStorage) -> Reader<'_, NoopRawMutex, MemStorage> {
        Reader::new(
            storage,
            &self.requests,
            &self.blocks,
            self.now_playing.sender(),
            &self.song_ended,
        )
    }
}

fn song(name: &str) -> SongName {
    SongName::try_from(name).unwrap()
}

#[async_std::test]
async fn streams_a_file_as_ordered_blocks() {
    let storage = MemStorage {
        files: vec![("a.mp3".into(), tagged_file(3 * BLOCK_SIZE, "ALPHA"))],
    };
    let fx = Fixture::new();
    let mut reader = fx.reader(storage);
    let mut now_playing = fx.now_playing.receiver().unwrap();

    let consumer = async {
        let mut received: Vec<AudioBlock> = Vec::new();
        for _ in 0..3 {
            let block = fx.blocks.receive().await;
            assert!(fx.blocks.len() <= QUEUE_DEPTH);
            received.push(block);
        }
        received
    };

    let (outcome, received) = join(reader.stream_song(&song("a.mp3")), consumer).await;

    assert_eq!(outcome.unwrap(), StreamOutcome::Finished { blocks: 3 });
    assert!(fx.song_ended.signaled());

    // Blocks arrive full-sized, in file order, trailer included
    let streamed: Vec<u8> = received.iter().flat_map(|b| b.data().to_vec()).collect();
    assert_eq!(streamed, tagged_file(3 * BLOCK_SIZE, "ALPHA"));
    for block in &received {
        assert_eq!(block.len, BLOCK_SIZE);
    }

    let tag = now_playing.get().await.tag.unwrap();
    assert_eq!(tag.title.as_str(), "ALPHA");
}

#[async_std::test]
async fn a_short_tail_arrives_as_a_partial_block() {
    let storage = MemStorage {
        files: vec![("a.mp3".into(), tagged_file(BLOCK_SIZE + 100, "ALPHA"))],
    };
    let fx = Fixture::new();
    let mut reader = fx.reader(storage);

    let consumer = async {
        let first = fx.blocks.receive().await;
        let second = fx.blocks.receive().await;
        (first.len, second.len)
    };

    let (outcome, (first, second)) = join(reader.stream_song(&song("a.mp3")), consumer).await;

    assert_eq!(outcome.unwrap(), StreamOutcome::Finished { blocks: 2 });
    assert_eq!((first, second), (BLOCK_SIZE, 100));
}

#[async_std::test]
async fn a_new_request_supersedes_the_current_song() {
    let storage = MemStorage {
        files: vec![
            ("a.mp3".into(), tagged_file(10 * BLOCK_SIZE, "ALPHA")),
            ("b.mp3".into(), tagged_file(BLOCK_SIZE, "BRAVO")),
        ],
    };
    let fx = Fixture::new();
    let mut reader = fx.reader(storage);
    let mut now_playing = fx.now_playing.receiver().unwrap();

    let interrupter = async {
        let mut drained = 1;
        let _ = fx.blocks.receive().await;
        fx.requests.signal(song("b.mp3"));
        // Keep draining so the reader is never parked on a full queue;
        // a long run of empty polls means it has stopped producing
        let mut idle_polls = 0;
        while idle_polls < 50 {
            match fx.blocks.try_receive() {
                Ok(_) => {
                    drained += 1;
                    idle_polls = 0;
                }
                Err(_) => {
                    idle_polls += 1;
                    yield_now().await;
                }
            }
        }
        drained
    };

    let (outcome, drained) = join(reader.stream_song(&song("a.mp3")), interrupter).await;

    assert_eq!(outcome.unwrap(), StreamOutcome::Superseded);
    assert!(drained < 10, "the abandoned song must not drain fully");
    assert!(!fx.song_ended.signaled());

    // Servicing the pending request streams the new song and publishes
    // its tag
    let name = fx.requests.wait().await;
    let consumer = async {
        let _ = fx.blocks.receive().await;
    };
    let (outcome, ()) = join(reader.stream_song(&name), consumer).await;
    assert_eq!(outcome.unwrap(), StreamOutcome::Finished { blocks: 1 });

    let playing = now_playing.get().await;
    assert_eq!(playing.name, song("b.mp3"));
    assert_eq!(playing.tag.unwrap().title.as_str(), "BRAVO");
}

#[async_std::test]
async fn a_missing_file_is_an_error_and_no_advance() {
    let storage = MemStorage { files: vec![] };
    let fx = Fixture::new();
    let mut reader = fx.reader(storage);

    let result = reader.stream_song(&song("ghost.mp3")).await;

    assert_eq!(result.unwrap_err(), StorageError::NotFound);
    assert!(!fx.song_ended.signaled());
    assert!(fx.blocks.is_empty());
}

#[async_std::test]
async fn an_empty_file_finishes_immediately() {
    let storage = MemStorage {
        files: vec![("empty.mp3".into(), vec![])],
    };
    let fx = Fixture::new();
    let mut reader = fx.reader(storage);

    let outcome = reader.stream_song(&song("empty.mp3")).await.unwrap();

    assert_eq!(outcome, StreamOutcome::Finished { blocks: 0 });
    assert!(fx.song_ended.signaled());
    assert!(fx.blocks.is_empty());
}

#[derive(Debug)]
struct SinkFault;

/// Records every byte it is given, refusing one at a preset count.
struct FlakySink {
    received: Rc<RefCell<Vec<u8>>>,
    fail_at: Option<usize>,
    sent: usize,
}

impl AudioSink for FlakySink {
    type Error = SinkFault;

    async fn send_byte(&mut self, byte: u8) -> Result<(), SinkFault> {
        self.sent += 1;
        if Some(self.sent) == self.fail_at {
            self.fail_at = None;
            return Err(SinkFault);
        }
        self.received.borrow_mut().push(byte);
        Ok(())
    }
}

#[async_std::test]
async fn a_sink_error_skips_to_the_next_block() {
    let blocks: BlockQueue<NoopRawMutex> = BlockQueue::new();
    let pause: PauseWatch<NoopRawMutex> = PauseWatch::new();
    pause.sender().send(false);

    let mut first = AudioBlock {
        bytes: [0; BLOCK_SIZE],
        len: BLOCK_SIZE,
    };
    for (i, byte) in first.bytes.iter_mut().enumerate() {
        *byte = (i % 251) as u8;
    }
    let second = AudioBlock {
        bytes: [0xAB; BLOCK_SIZE],
        len: BLOCK_SIZE,
    };

    // The 200th byte is refused: 199 bytes of the first block get
    // through, the rest of that block is dropped, and the second
    // block plays in full
    let mut expected = first.data()[..199].to_vec();
    expected.extend_from_slice(second.data());

    blocks.try_send(first).unwrap();
    blocks.try_send(second).unwrap();

    let received = Rc::new(RefCell::new(Vec::new()));
    let sink = FlakySink {
        received: received.clone(),
        fail_at: Some(200),
        sent: 0,
    };
    let player = Player::new(&blocks, pause.receiver().unwrap(), sink);

    let watcher = async {
        while received.borrow().len() < expected.len() {
            yield_now().await;
        }
    };
    select(player.run(), watcher).await;

    assert_eq!(*received.borrow(), expected);
    assert!(blocks.is_empty());
}

/// Records every byte it is given and raises the pause flag once a
/// preset count has gone through.
struct PausingSink<'a> {
    received: Rc<RefCell<Vec<u8>>>,
    pause_at: Option<usize>,
    pause: embassy_sync::watch::Sender<'a, NoopRawMutex, bool, 2>,
}

impl AudioSink for PausingSink<'_> {
    type Error = core::convert::Infallible;

    async fn send_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.received.borrow_mut().push(byte);
        if Some(self.received.borrow().len()) == self.pause_at {
            self.pause.send(true);
        }
        Ok(())
    }
}

#[async_std::test]
async fn pause_stops_between_bytes_and_resumes_exactly_there() {
    let blocks: BlockQueue<NoopRawMutex> = BlockQueue::new();
    let pause: PauseWatch<NoopRawMutex> = PauseWatch::new();
    pause.sender().send(false);

    let received = Rc::new(RefCell::new(Vec::new()));
    let sink = PausingSink {
        received: received.clone(),
        pause_at: Some(200),
        pause: pause.sender(),
    };
    let mut player = Player::new(&blocks, pause.receiver().unwrap(), sink);

    let mut block = AudioBlock {
        bytes: [0; BLOCK_SIZE],
        len: BLOCK_SIZE,
    };
    for (i, byte) in block.bytes.iter_mut().enumerate() {
        *byte = (i % 251) as u8;
    }

    let resumer = async {
        for _ in 0..20 {
            yield_now().await;
        }
        // The player is parked on the pause flag, not mid-byte
        assert_eq!(received.borrow().len(), 200);
        pause.sender().send(false);
    };

    let (played, ()) = join(player.play_block(&block), resumer).await;
    played.unwrap();

    // Every byte exactly once, in order, nothing replayed around the
    // pause point
    assert_eq!(received.borrow().as_slice(), block.data());
}
