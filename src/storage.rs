use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use tracing::warn;

use crate::model::{Bike, Review};

/// One durable change to the showroom.
#[derive(Archive, RkyvDeserialize, RkyvSerialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub enum LogEntry {
    BikeCreated(Bike),
    /// Full post-update image of the bike.
    BikeUpdated(Bike),
    ReviewCreated(Review),
}

/// Whole-showroom image used for snapshots and compaction.
#[derive(Archive, RkyvDeserialize, RkyvSerialize, Debug, Clone, Default, PartialEq)]
#[archive(check_bytes)]
pub struct CatalogImage {
    pub bikes: Vec<Bike>,
    pub reviews: Vec<Review>,
}

impl CatalogImage {
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        Ok(encode(self)?.into_vec())
    }

    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        let mut aligned = rkyv::AlignedVec::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);

        let archived = rkyv::check_archived_root::<CatalogImage>(&aligned)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        Ok(archived
            .deserialize(&mut rkyv::Infallible)
            .unwrap_or_else(|never| match never {}))
    }

    /// The entries a freshly compacted segment holds for this image.
    pub fn entries(&self) -> impl Iterator<Item = LogEntry> + '_ {
        self.bikes
            .iter()
            .cloned()
            .map(LogEntry::BikeCreated)
            .chain(self.reviews.iter().cloned().map(LogEntry::ReviewCreated))
    }
}

// [Length u32 LE][rkyv bytes]
const LEN_PREFIX: usize = 4;

/// Append-only log file of [`LogEntry`] records.
#[derive(Debug)]
pub struct Segment {
    pub file_path: PathBuf,
    file: File,
    current_offset: u64,
    strict: bool,
}

impl Segment {
    /// Opens or creates the segment. With `strict` every append is fsynced.
    pub fn new(path: &Path, strict: bool) -> io::Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let current_offset = file.seek(SeekFrom::End(0))?;

        Ok(Self {
            file_path: path.to_path_buf(),
            file,
            current_offset,
            strict,
        })
    }

    pub fn len(&self) -> u64 {
        self.current_offset
    }

    pub fn is_empty(&self) -> bool {
        self.current_offset == 0
    }

    /// Writes one entry at the end of the file and returns its offset.
    pub fn append(&mut self, entry: &LogEntry) -> io::Result<u64> {
        let bytes = encode(entry)?;
        let start = self.current_offset;

        let len = bytes.len() as u32;
        self.file.write_all(&len.to_le_bytes())?;
        self.file.write_all(&bytes)?;
        if self.strict {
            self.file.sync_data()?;
        }

        self.current_offset += (LEN_PREFIX + bytes.len()) as u64;
        Ok(start)
    }

    /// Reads every entry back in write order.
    ///
    /// A record cut short by a crash mid-append is dropped and the file is
    /// truncated to the last whole record, so later appends stay readable.
    pub fn replay(&mut self) -> io::Result<Vec<LogEntry>> {
        let data = fs::read(&self.file_path)?;
        let mut entries = Vec::new();
        let mut pos = 0usize;

        while pos < data.len() {
            if data.len() - pos < LEN_PREFIX {
                break;
            }
            let mut len_buf = [0u8; LEN_PREFIX];
            len_buf.copy_from_slice(&data[pos..pos + LEN_PREFIX]);
            let len = u32::from_le_bytes(len_buf) as usize;

            let body_start = pos + LEN_PREFIX;
            if data.len() - body_start < len {
                break;
            }
            entries.push(decode(&data[body_start..body_start + len])?);
            pos = body_start + len;
        }

        if pos < data.len() {
            warn!(
                "segment {} has {} trailing bytes from an interrupted write; truncating",
                self.file_path.display(),
                data.len() - pos
            );
            self.file.set_len(pos as u64)?;
            self.current_offset = self.file.seek(SeekFrom::Start(pos as u64))?;
        }

        Ok(entries)
    }
}

fn encode<T>(value: &T) -> io::Result<rkyv::AlignedVec>
where
    T: RkyvSerialize<rkyv::ser::serializers::AllocSerializer<4096>>,
{
    rkyv::to_bytes::<_, 4096>(value).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
}

fn decode(bytes: &[u8]) -> io::Result<LogEntry> {
    let mut aligned = rkyv::AlignedVec::with_capacity(bytes.len());
    aligned.extend_from_slice(bytes);

    let archived = rkyv::check_archived_root::<LogEntry>(&aligned)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    Ok(archived
        .deserialize(&mut rkyv::Infallible)
        .unwrap_or_else(|never| match never {}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewBike;
    use tempfile::TempDir;

    fn created(id: u64) -> LogEntry {
        LogEntry::BikeCreated(NewBike::new("Pulsar", "Bajaj", "Popular", 150000, 2024, 150, "p.png").into_bike(id))
    }

    #[test]
    fn append_then_replay() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seg.dat");

        let mut seg = Segment::new(&path, false).unwrap();
        assert_eq!(seg.append(&created(1)).unwrap(), 0);
        let second = seg.append(&created(2)).unwrap();
        assert!(second > 0);
        drop(seg);

        let mut seg = Segment::new(&path, false).unwrap();
        assert_eq!(seg.replay().unwrap(), vec![created(1), created(2)]);
    }

    #[test]
    fn reopened_segment_appends_at_the_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seg.dat");

        Segment::new(&path, true).unwrap().append(&created(1)).unwrap();
        let mut seg = Segment::new(&path, true).unwrap();
        seg.append(&created(2)).unwrap();

        assert_eq!(seg.replay().unwrap().len(), 2);
    }

    #[test]
    fn torn_tail_is_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seg.dat");

        let mut seg = Segment::new(&path, false).unwrap();
        seg.append(&created(1)).unwrap();
        let good_len = seg.len();
        drop(seg);

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[200, 0, 0, 0, 1, 2, 3]).unwrap();
        drop(file);

        let mut seg = Segment::new(&path, false).unwrap();
        assert_eq!(seg.replay().unwrap(), vec![created(1)]);
        assert_eq!(seg.len(), good_len);

        seg.append(&created(2)).unwrap();
        assert_eq!(seg.replay().unwrap(), vec![created(1), created(2)]);
    }

    #[test]
    fn image_survives_encoding() {
        let LogEntry::BikeCreated(bike) = created(3) else { unreachable!() };
        let image = CatalogImage { bikes: vec![bike], reviews: Vec::new() };
        let bytes = image.to_bytes().unwrap();
        assert_eq!(CatalogImage::from_bytes(&bytes).unwrap(), image);
        assert!(CatalogImage::from_bytes(&bytes[..bytes.len() / 2]).is_err());
    }
}
