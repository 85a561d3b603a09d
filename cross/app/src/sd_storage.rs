//! SD card storage over `embedded-sdmmc`, exposed through the
//! `mp3_core::storage` traits.
//!
//! Uses the raw handle API so the open file can carry a borrow of the
//! volume manager without the RAII wrappers' nested lifetimes. FAT
//! short names come out uppercase, so the playlist filter matches
//! `.MP3`.

use core::fmt::Write as _;

use embedded_sdmmc::{
    BlockDevice, Error, Mode, RawDirectory, RawFile, TimeSource, Timestamp, VolumeIdx,
    VolumeManager,
};

use mp3_core::storage::{File, Storage, StorageError};
use playlist::Playlist;

/// FAT wants timestamps for file accesses; the player has no clock so
/// everything is stamped with a fixed date.
pub struct NullTimeSource;

impl TimeSource for NullTimeSource {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 54,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

pub struct SdStorage<D: BlockDevice, T: TimeSource> {
    volume_mgr: VolumeManager<D, T>,
    root: RawDirectory,
}

impl<D: BlockDevice, T: TimeSource> SdStorage<D, T> {
    /// Mount the first volume and open its root directory, where the
    /// songs live.
    pub fn new(block_device: D, time_source: T) -> Result<Self, StorageError> {
        let mut volume_mgr = VolumeManager::new(block_device, time_source);
        let volume = volume_mgr
            .open_raw_volume(VolumeIdx(0))
            .map_err(|_| StorageError::OpenFailed)?;
        let root = volume_mgr
            .open_root_dir(volume)
            .map_err(|_| StorageError::OpenFailed)?;

        Ok(SdStorage { volume_mgr, root })
    }

    /// Scan the root directory and add every `.MP3` file to the
    /// playlist. Names that do not fit and songs past the playlist
    /// capacity are skipped with a warning.
    pub fn populate_playlist<const MAX_SONGS: usize, const NAME_LEN: usize>(
        &mut self,
        playlist: &mut Playlist<MAX_SONGS, NAME_LEN>,
    ) -> Result<(), StorageError> {
        self.volume_mgr
            .iterate_dir(self.root, |entry| {
                if entry.attributes.is_directory() {
                    return;
                }

                let mut name: heapless::String<NAME_LEN> = heapless::String::new();
                if write!(name, "{}", entry.name).is_err() {
                    log::warn!("skipping a file with an over-long name");
                    return;
                }
                if !name.ends_with(".MP3") {
                    return;
                }

                if playlist.push(&name).is_err() {
                    log::warn!("playlist full, skipping {}", name);
                }
            })
            .map_err(|_| StorageError::Io)
    }
}

impl<D: BlockDevice, T: TimeSource> Storage for SdStorage<D, T> {
    type File<'a>
        = SdFile<'a, D, T>
    where
        Self: 'a;

    async fn open(&mut self, name: &str) -> Result<SdFile<'_, D, T>, StorageError> {
        let root = self.root;
        let file = self
            .volume_mgr
            .open_file_in_dir(root, name, Mode::ReadOnly)
            .map_err(|err| match err {
                Error::NotFound => StorageError::NotFound,
                _ => StorageError::OpenFailed,
            })?;
        let length = self
            .volume_mgr
            .file_length(file)
            .map_err(|_| StorageError::OpenFailed)?;

        Ok(SdFile {
            volume_mgr: &mut self.volume_mgr,
            file,
            length,
        })
    }
}

pub struct SdFile<'a, D: BlockDevice, T: TimeSource> {
    volume_mgr: &'a mut VolumeManager<D, T>,
    file: RawFile,
    length: u32,
}

impl<D: BlockDevice, T: TimeSource> File for SdFile<'_, D, T> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.volume_mgr.read(self.file, buf) {
            Ok(n) => Ok(n),
            Err(Error::EndOfFile) => Ok(0),
            Err(_) => Err(StorageError::Io),
        }
    }

    async fn seek(&mut self, offset: u32) -> Result<(), StorageError> {
        self.volume_mgr
            .file_seek_from_start(self.file, offset)
            .map_err(|_| StorageError::Io)
    }

    fn size(&self) -> u32 {
        self.length
    }

    async fn close(self) -> Result<(), StorageError> {
        self.volume_mgr
            .close_file(self.file)
            .map_err(|_| StorageError::Io)
    }
}
