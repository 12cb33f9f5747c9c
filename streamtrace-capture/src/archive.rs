// Zip container holding a HAR document and the response bodies it references

use crate::error::{CaptureError, Result};
use crate::har::{CapturedExchange, parse_har};
use flate2::read::DeflateDecoder;
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Name of the HAR document inside a recording archive
pub const HAR_DOCUMENT: &str = "har.har";

const LOCAL_FILE_HEADER: u32 = 0x04034b50;
const LOCAL_FILE_HEADER_LEN: usize = 30;
const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;
const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

/// Lookup from an opaque body identifier to raw response bytes
pub trait BodySource {
    fn body(&self, id: &str) -> Option<&[u8]>;
}

impl BodySource for HashMap<String, Vec<u8>> {
    fn body(&self, id: &str) -> Option<&[u8]> {
        self.get(id).map(Vec::as_slice)
    }
}

#[derive(Debug, Default)]
pub struct Archive {
    files: HashMap<String, Vec<u8>>,
}

impl Archive {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let archive = Self::from_bytes(&bytes)?;
        info!(
            "Opened archive {} ({} entries)",
            path.display(),
            archive.files.len()
        );
        Ok(archive)
    }

    /// Walk the local file entries until the first non-entry signature
    /// (the central directory, usually).
    pub fn from_bytes(zip: &[u8]) -> Result<Self> {
        let mut files = HashMap::new();
        let mut offset = 0;

        while offset + 4 <= zip.len() && read_u32(zip, offset)? == LOCAL_FILE_HEADER {
            let header = zip
                .get(offset..offset + LOCAL_FILE_HEADER_LEN)
                .ok_or_else(|| truncated(offset))?;

            let flags = read_u16(header, 6)?;
            let method = read_u16(header, 8)?;
            let compressed_size = read_u32(header, 18)? as usize;
            let uncompressed_size = read_u32(header, 22)? as usize;
            let name_len = read_u16(header, 26)? as usize;
            let extra_len = read_u16(header, 28)? as usize;

            if flags & FLAG_DATA_DESCRIPTOR != 0 && compressed_size == 0 {
                return Err(CaptureError::CorruptArchive(format!(
                    "entry at offset {} defers its sizes to a data descriptor",
                    offset
                )));
            }

            let name_start = offset + LOCAL_FILE_HEADER_LEN;
            let name = zip
                .get(name_start..name_start + name_len)
                .ok_or_else(|| truncated(offset))?;
            let name = String::from_utf8_lossy(name).into_owned();

            let data_start = name_start + name_len + extra_len;
            let data = zip
                .get(data_start..data_start + compressed_size)
                .ok_or_else(|| truncated(offset))?;

            let data = match method {
                METHOD_STORED => data.to_vec(),
                METHOD_DEFLATE => {
                    // one byte past the declared size is enough to detect an overrun
                    let mut inflated = Vec::new();
                    DeflateDecoder::new(data)
                        .take(uncompressed_size as u64 + 1)
                        .read_to_end(&mut inflated)?;
                    inflated
                }
                other => return Err(CaptureError::UnsupportedCompression(other)),
            };

            if data.len() != uncompressed_size {
                return Err(CaptureError::CorruptArchive(format!(
                    "'{}' inflated to {} bytes, header says {}",
                    name,
                    data.len(),
                    uncompressed_size
                )));
            }

            debug!("Archive entry {} ({} bytes)", name, data.len());
            files.insert(name, data);
            offset = data_start + compressed_size;
        }

        Ok(Self { files })
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Parse the embedded HAR document
    pub fn har(&self) -> Result<Vec<CapturedExchange>> {
        let document = self
            .get(HAR_DOCUMENT)
            .ok_or_else(|| CaptureError::MissingDocument(HAR_DOCUMENT.to_string()))?;
        parse_har(document)
    }
}

impl BodySource for Archive {
    fn body(&self, id: &str) -> Option<&[u8]> {
        self.get(id)
    }
}

fn truncated(offset: usize) -> CaptureError {
    CaptureError::CorruptArchive(format!("entry at offset {} is truncated", offset))
}

fn read_u16(bytes: &[u8], at: usize) -> Result<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| truncated(at))
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| truncated(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    fn local_entry(name: &str, payload: &[u8], deflate: bool) -> Vec<u8> {
        let data = if deflate {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(payload).unwrap();
            encoder.finish().unwrap()
        } else {
            payload.to_vec()
        };

        let mut entry = Vec::new();
        entry.extend_from_slice(&LOCAL_FILE_HEADER.to_le_bytes());
        entry.extend_from_slice(&20u16.to_le_bytes()); // version needed
        entry.extend_from_slice(&0u16.to_le_bytes()); // flags
        entry.extend_from_slice(&(if deflate { 8u16 } else { 0u16 }).to_le_bytes());
        entry.extend_from_slice(&0u16.to_le_bytes()); // mod time
        entry.extend_from_slice(&0u16.to_le_bytes()); // mod date
        entry.extend_from_slice(&0u32.to_le_bytes()); // crc32, unchecked
        entry.extend_from_slice(&(data.len() as u32).to_le_bytes());
        entry.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        entry.extend_from_slice(&(name.len() as u16).to_le_bytes());
        entry.extend_from_slice(&0u16.to_le_bytes()); // extra len
        entry.extend_from_slice(name.as_bytes());
        entry.extend_from_slice(&data);
        entry
    }

    #[test]
    fn test_reads_stored_and_deflated_entries() {
        let mut zip = local_entry("a.txt", b"hello stored", false);
        zip.extend(local_entry("b.json", b"{\"token\":\"abc123abc123\"}", true));
        // central directory signature terminates the walk
        zip.extend_from_slice(&0x02014b50u32.to_le_bytes());

        let archive = Archive::from_bytes(&zip).unwrap();

        assert_eq!(archive.len(), 2);
        assert_eq!(archive.get("a.txt"), Some(&b"hello stored"[..]));
        assert_eq!(archive.body("b.json"), Some(&b"{\"token\":\"abc123abc123\"}"[..]));
        assert_eq!(archive.get("missing"), None);
    }

    #[test]
    fn test_empty_input_is_empty_archive() {
        let archive = Archive::from_bytes(&[]).unwrap();
        assert!(archive.is_empty());
    }

    #[test]
    fn test_size_mismatch_is_corrupt() {
        let mut zip = local_entry("a.txt", b"hello", false);
        // declared uncompressed size lives at offset 22
        zip[22..26].copy_from_slice(&99u32.to_le_bytes());

        let err = Archive::from_bytes(&zip).unwrap_err();
        assert!(matches!(err, CaptureError::CorruptArchive(_)));
    }

    #[test]
    fn test_inflate_stops_past_declared_size() {
        let payload = vec![0u8; 1 << 20];
        let mut zip = local_entry("big.bin", &payload, true);
        zip[22..26].copy_from_slice(&10u32.to_le_bytes());

        match Archive::from_bytes(&zip) {
            Err(CaptureError::CorruptArchive(message)) => {
                assert!(message.contains("inflated to 11 bytes"), "{}", message);
            }
            other => panic!("expected a corrupt archive, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_compression() {
        let mut zip = local_entry("a.txt", b"hello", false);
        zip[8..10].copy_from_slice(&12u16.to_le_bytes()); // bzip2

        let err = Archive::from_bytes(&zip).unwrap_err();
        assert!(matches!(err, CaptureError::UnsupportedCompression(12)));
    }

    #[test]
    fn test_truncated_entry() {
        let zip = local_entry("a.txt", b"hello world", false);
        let err = Archive::from_bytes(&zip[..zip.len() - 3]).unwrap_err();
        assert!(matches!(err, CaptureError::CorruptArchive(_)));
    }

    #[test]
    fn test_har_document_missing() {
        let zip = local_entry("a.txt", b"hello", false);
        let archive = Archive::from_bytes(&zip).unwrap();

        assert!(matches!(
            archive.har(),
            Err(CaptureError::MissingDocument(_))
        ));
    }

    #[test]
    fn test_hash_map_body_source() {
        let mut bodies = HashMap::new();
        bodies.insert("x".to_string(), b"data".to_vec());

        assert_eq!(bodies.body("x"), Some(&b"data"[..]));
        assert_eq!(bodies.body("y"), None);
    }
}
