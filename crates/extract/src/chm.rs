//! Minimal reader for the title stored in a Compiled HTML Help (ITSF) file.
//!
//! Only enough of the container is understood to locate the `/#SYSTEM` file:
//! the ITSF header, the ITSP directory header and its PMGL listing chunks.
//! `/#SYSTEM` always lives in the uncompressed content section, so no LZX
//! decompression is needed.
//!
//! All integers in the container are little-endian, except the variable
//! length "encints" inside directory entries which are big-endian 7-bit groups.

use crate::error::{ErrorKind, Result};
use crate::models::Metadata;
use exn::{OptionExt, ResultExt};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::instrument;

const ITSF_SIGNATURE: &[u8] = b"ITSF";
const ITSP_SIGNATURE: &[u8] = b"ITSP";
const PMGL_SIGNATURE: &[u8] = b"PMGL";
/// Fixed part of the ITSF header shared by versions 2 and 3.
const ITSF_HEADER_LEN: usize = 0x58;
const ITSP_HEADER_LEN: usize = 0x54;
const PMGL_HEADER_LEN: usize = 0x14;
const SYSTEM_FILE: &[u8] = b"/#SYSTEM";
const SYSTEM_TITLE_CODE: u16 = 3;
// Anything bigger than this is not a CHM we want to be allocating for.
const MAX_CHUNK_SIZE: u64 = 1 << 20;
const MAX_SYSTEM_SIZE: u64 = 1 << 20;

/// Read the title from a CHM file.
///
/// CHM files carry no author field, so the author is always empty. Returns
/// `Ok(None)` when the container is valid but the title is absent or blank.
#[instrument(level = "trace", skip_all, fields(path = %path.display()))]
pub fn read_metadata(path: &Path) -> Result<Option<Metadata>> {
    let file = File::open(path).or_raise(|| ErrorKind::Io)?;
    let title = read_title(&mut BufReader::new(file))?;
    Ok(title.map(|title| Metadata { title, author: String::new() }))
}

pub(crate) fn read_title<R: Read + Seek>(reader: &mut R) -> Result<Option<String>> {
    let header = ItsfHeader::read(reader)?;
    let entry = find_entry(reader, &header, SYSTEM_FILE)?.ok_or_raise(|| ErrorKind::MissingStructure("#SYSTEM"))?;
    if entry.section != 0 {
        // The format puts #SYSTEM in the uncompressed section; anything else
        // is a file we don't understand.
        exn::bail!(ErrorKind::Malformed("CHM"));
    }
    if entry.length > MAX_SYSTEM_SIZE {
        exn::bail!(ErrorKind::Malformed("CHM"));
    }
    let offset = header.content_offset.checked_add(entry.offset).ok_or_raise(|| ErrorKind::Malformed("CHM"))?;
    let system = read_at(reader, offset, entry.length as usize)?;
    Ok(system_title(&system))
}

struct ItsfHeader {
    directory_offset: u64,
    directory_length: u64,
    content_offset: u64,
}
impl ItsfHeader {
    fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let head = read_at(reader, 0, ITSF_HEADER_LEN)?;
        if &head[0..4] != ITSF_SIGNATURE {
            exn::bail!(ErrorKind::Malformed("CHM"));
        }
        let directory_offset = le_u64(&head, 0x48);
        let directory_length = le_u64(&head, 0x50);
        let content_offset = match le_u32(&head, 0x04) {
            // Version 2 headers omit the content offset; section 0 content
            // follows the directory immediately.
            2 => directory_offset.checked_add(directory_length).ok_or_raise(|| ErrorKind::Malformed("CHM"))?,
            3 => le_u64(&read_at(reader, ITSF_HEADER_LEN as u64, 8)?, 0),
            _ => exn::bail!(ErrorKind::Malformed("CHM")),
        };
        Ok(Self { directory_offset, directory_length, content_offset })
    }
}

#[derive(Debug, PartialEq, Eq)]
struct DirectoryEntry {
    section: u64,
    offset: u64,
    length: u64,
}

fn find_entry<R: Read + Seek>(reader: &mut R, header: &ItsfHeader, name: &[u8]) -> Result<Option<DirectoryEntry>> {
    let itsp = read_at(reader, header.directory_offset, ITSP_HEADER_LEN)?;
    if &itsp[0..4] != ITSP_SIGNATURE {
        exn::bail!(ErrorKind::Malformed("CHM"));
    }
    let itsp_length = u64::from(le_u32(&itsp, 0x08));
    let chunk_size = u64::from(le_u32(&itsp, 0x10));
    let first_listing = u64::from(le_u32(&itsp, 0x20));
    let last_listing = u64::from(le_u32(&itsp, 0x24));
    let chunk_count = u64::from(le_u32(&itsp, 0x2C));
    if chunk_size < PMGL_HEADER_LEN as u64
        || chunk_size > MAX_CHUNK_SIZE
        || last_listing >= chunk_count
        || itsp_length.saturating_add(chunk_count.saturating_mul(chunk_size)) > header.directory_length
    {
        exn::bail!(ErrorKind::Malformed("CHM"));
    }
    let chunks_start = header.directory_offset + itsp_length;
    for index in first_listing..=last_listing {
        let chunk = read_at(reader, chunks_start + index * chunk_size, chunk_size as usize)?;
        if &chunk[0..4] != PMGL_SIGNATURE {
            continue;
        }
        if let Some(entry) = scan_listing(&chunk, name)? {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

/// Walk the entries of one PMGL chunk looking for `name`.
fn scan_listing(chunk: &[u8], name: &[u8]) -> Result<Option<DirectoryEntry>> {
    let free_space = le_u32(chunk, 0x04) as usize;
    let end = chunk.len().checked_sub(free_space).ok_or_raise(|| ErrorKind::Malformed("CHM"))?;
    let mut pos = PMGL_HEADER_LEN;
    while pos < end {
        let name_length = encint(chunk, &mut pos).ok_or_raise(|| ErrorKind::Malformed("CHM"))? as usize;
        let entry_name = chunk.get(pos..pos.saturating_add(name_length)).ok_or_raise(|| ErrorKind::Malformed("CHM"))?;
        pos += name_length;
        let mut field = || encint(chunk, &mut pos).ok_or_raise(|| ErrorKind::Malformed("CHM"));
        let entry = DirectoryEntry { section: field()?, offset: field()?, length: field()? };
        if entry_name == name {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

/// Pull the title record out of the `#SYSTEM` file contents.
///
/// Layout: a 4-byte version, then records of `code: u16, length: u16, data`.
/// The title record's data is a NUL-terminated string in the help file's
/// ANSI code page; it is decoded lossily as UTF-8.
fn system_title(system: &[u8]) -> Option<String> {
    let mut pos = 4;
    while pos + 4 <= system.len() {
        let code = le_u16(system, pos);
        let length = le_u16(system, pos + 2) as usize;
        let data = system.get(pos + 4..pos + 4 + length)?;
        if code == SYSTEM_TITLE_CODE {
            let raw = data.split(|&b| b == 0).next().unwrap_or_default();
            let title = String::from_utf8_lossy(raw).trim().to_string();
            return (!title.is_empty()).then_some(title);
        }
        pos += 4 + length;
    }
    None
}

fn read_at<R: Read + Seek>(reader: &mut R, offset: u64, length: usize) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset)).or_raise(|| ErrorKind::Io)?;
    let mut buffer = vec![0; length];
    // A short read means the header lied about where things are.
    reader.read_exact(&mut buffer).or_raise(|| ErrorKind::Malformed("CHM"))?;
    Ok(buffer)
}

fn encint(data: &[u8], pos: &mut usize) -> Option<u64> {
    let mut value: u64 = 0;
    // Nine groups of 7 bits is already more than a u64 holds.
    for _ in 0..9 {
        let byte = *data.get(*pos)?;
        *pos += 1;
        value = (value << 7) | u64::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Some(value);
        }
    }
    None
}

fn le_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn le_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

fn le_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    const CHUNK_SIZE: usize = 0x200;

    fn push_encint(out: &mut Vec<u8>, mut value: u64) {
        let mut groups = vec![(value & 0x7F) as u8];
        value >>= 7;
        while value > 0 {
            groups.push((value & 0x7F) as u8 | 0x80);
            value >>= 7;
        }
        out.extend(groups.into_iter().rev());
    }

    fn system_file(records: &[(u16, &[u8])]) -> Vec<u8> {
        let mut system = 3u32.to_le_bytes().to_vec();
        for (code, data) in records {
            system.extend(code.to_le_bytes());
            system.extend((data.len() as u16).to_le_bytes());
            system.extend(*data);
        }
        system
    }

    /// Build a minimal single-chunk CHM image. `padding` is placed at the
    /// start of content section 0 so that `#SYSTEM` has a non-zero offset.
    fn build_chm(version: u32, system: &[u8]) -> Vec<u8> {
        let padding = b"::DataSpace/NameList padding".to_vec();
        let header_len = if version == 3 { 0x60 } else { ITSF_HEADER_LEN };
        let section0_len = 0x18;
        let directory_offset = header_len + section0_len;
        let directory_length = ITSP_HEADER_LEN + CHUNK_SIZE;
        let content_offset = directory_offset + directory_length;

        let mut image = Vec::new();
        image.extend(ITSF_SIGNATURE);
        image.extend(version.to_le_bytes());
        image.extend((header_len as u32).to_le_bytes());
        image.extend(1u32.to_le_bytes());
        image.extend(0u32.to_be_bytes()); // timestamp
        image.extend(0x0409u32.to_le_bytes()); // language
        image.extend([0u8; 32]); // two GUIDs
        image.extend((header_len as u64).to_le_bytes());
        image.extend((section0_len as u64).to_le_bytes());
        image.extend((directory_offset as u64).to_le_bytes());
        image.extend((directory_length as u64).to_le_bytes());
        if version == 3 {
            image.extend((content_offset as u64).to_le_bytes());
        }
        image.resize(directory_offset, 0);

        image.extend(ITSP_SIGNATURE);
        image.extend(1u32.to_le_bytes());
        image.extend((ITSP_HEADER_LEN as u32).to_le_bytes());
        image.extend(0x0Au32.to_le_bytes());
        image.extend((CHUNK_SIZE as u32).to_le_bytes());
        image.extend(2u32.to_le_bytes()); // quickref density
        image.extend(1u32.to_le_bytes()); // index depth
        image.extend((-1i32).to_le_bytes()); // no index root
        image.extend(0u32.to_le_bytes()); // first PMGL
        image.extend(0u32.to_le_bytes()); // last PMGL
        image.extend((-1i32).to_le_bytes());
        image.extend(1u32.to_le_bytes()); // chunk count
        image.resize(directory_offset + ITSP_HEADER_LEN, 0);

        let mut entries = Vec::new();
        for (name, offset, length) in [(&b"/"[..], 0, 0), (SYSTEM_FILE, padding.len(), system.len())] {
            push_encint(&mut entries, name.len() as u64);
            entries.extend(name);
            push_encint(&mut entries, 0);
            push_encint(&mut entries, offset as u64);
            push_encint(&mut entries, length as u64);
        }
        let free_space = CHUNK_SIZE - PMGL_HEADER_LEN - entries.len();
        image.extend(PMGL_SIGNATURE);
        image.extend((free_space as u32).to_le_bytes());
        image.extend(0u32.to_le_bytes());
        image.extend((-1i32).to_le_bytes());
        image.extend((-1i32).to_le_bytes());
        image.extend(entries);
        image.resize(content_offset, 0);

        image.extend(padding);
        image.extend(system);
        image
    }

    #[rstest]
    #[case(2)]
    #[case(3)]
    fn test_reads_title(#[case] version: u32) {
        let system = system_file(&[(0, b"contents.hhc\0"), (SYSTEM_TITLE_CODE, b"Programming Ruby\0")]);
        let image = build_chm(version, &system);
        let title = read_title(&mut Cursor::new(image)).unwrap();
        assert_eq!(title.as_deref(), Some("Programming Ruby"));
    }

    #[test]
    fn test_embedded_title_beats_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ruby.book.chm");
        let system = system_file(&[(SYSTEM_TITLE_CODE, b"Programming Ruby\0")]);
        std::fs::write(&path, build_chm(3, &system)).unwrap();
        assert_eq!(crate::extract(&path), Metadata::new("Programming Ruby", ""));
        // Same file without a title record: named after the file instead.
        std::fs::write(&path, build_chm(2, &system_file(&[(2, b"index.html\0")]))).unwrap();
        assert_eq!(crate::extract(&path), Metadata::new("ruby book", ""));
    }

    #[test]
    fn test_blank_title_is_none() {
        let system = system_file(&[(SYSTEM_TITLE_CODE, b"  \0")]);
        let image = build_chm(3, &system);
        assert_eq!(read_title(&mut Cursor::new(image)).unwrap(), None);
    }

    #[test]
    fn test_missing_title_record_is_none() {
        let system = system_file(&[(0, b"contents.hhc\0"), (2, b"index.html\0")]);
        let image = build_chm(3, &system);
        assert_eq!(read_title(&mut Cursor::new(image)).unwrap(), None);
    }

    #[test]
    fn test_not_a_chm() {
        let err = read_title(&mut Cursor::new(vec![0u8; 256])).unwrap_err();
        assert_eq!(*err, ErrorKind::Malformed("CHM"));
    }

    #[test]
    fn test_truncated_chm() {
        let system = system_file(&[(SYSTEM_TITLE_CODE, b"Cut Short\0")]);
        let mut image = build_chm(3, &system);
        image.truncate(image.len() - 4);
        assert!(read_title(&mut Cursor::new(image)).is_err());
    }

    #[rstest]
    #[case(&[0x00], 0)]
    #[case(&[0x7F], 127)]
    #[case(&[0x81, 0x00], 128)]
    #[case(&[0x82, 0xAC, 0x03], 38403)]
    fn test_encint(#[case] bytes: &[u8], #[case] expected: u64) {
        let mut pos = 0;
        assert_eq!(encint(bytes, &mut pos), Some(expected));
        assert_eq!(pos, bytes.len());
    }

    #[test]
    fn test_unterminated_encint() {
        let mut pos = 0;
        assert_eq!(encint(&[0x80, 0x80], &mut pos), None);
    }
}
