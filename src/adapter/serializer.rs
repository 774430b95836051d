//! Hot/cold blob serializer
//!
//! ## Hot blob (little-endian)
//! ```text
//! magic u32 (0xDEADBEEF) | version u32 | count u32
//! count × [score f32 | ts i64 | type u8 | title_hash u64 | url_hash u64 | cold_idx u32]
//! crc32 u32
//! ```
//!
//! ## Cold blob (little-endian)
//! ```text
//! magic u32 (0xBEEFCAFE) | version u32 | count u32
//! count × [title | summary | url | source (StringRef: off u32, len u32) | 5 × meta_idx u32]
//! string_len u32 | string bytes
//! 5 × [meta_count u32 | meta_count × (slot u32 | fields)]
//! crc32 u32
//! ```
//!
//! Absent metadata indices are `u32::MAX`. The CRC covers every preceding
//! byte.

use std::collections::HashMap;

use bytes::{Buf, BufMut};

use crate::error::{CacheError, Result};
use crate::memory::{StringPool, StringRef};
use crate::storage::{
    ArticleMeta, CommunityPostMeta, MemoryPools, NewsItemCold, NewsItemHot, PaperMeta,
    RepositoryMeta, SourceType, VideoMeta, NO_INDEX,
};

pub const HOT_MAGIC: u32 = 0xDEAD_BEEF;
pub const COLD_MAGIC: u32 = 0xBEEF_CAFE;
pub const FORMAT_VERSION: u32 = 1;

/// magic + version + count
pub const BLOB_HEADER_SIZE: usize = 12;
pub const HOT_RECORD_SIZE: usize = 33;
pub const COLD_RECORD_SIZE: usize = 52;
const CRC_SIZE: usize = 4;

// =============================================================================
// Hot
// =============================================================================

pub fn serialize_hot(hot: &[NewsItemHot]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(BLOB_HEADER_SIZE + hot.len() * HOT_RECORD_SIZE + CRC_SIZE);
    put_header(&mut buf, HOT_MAGIC, hot.len());

    for item in hot {
        buf.put_f32_le(item.relevance_score);
        buf.put_i64_le(item.timestamp);
        buf.put_u8(item.source_type as u8);
        buf.put_u64_le(item.title_hash);
        buf.put_u64_le(item.url_hash);
        buf.put_u32_le(item.cold_data_index);
    }

    seal(buf)
}

pub fn deserialize_hot(bytes: &[u8]) -> Result<Vec<NewsItemHot>> {
    let mut buf = unseal(bytes)?;
    let count = read_header(&mut buf, HOT_MAGIC)?;

    if buf.remaining() != count * HOT_RECORD_SIZE {
        return Err(corrupt(format!(
            "hot blob declares {} records but carries {} bytes",
            count,
            buf.remaining()
        )));
    }

    let mut hot = Vec::with_capacity(count);
    for _ in 0..count {
        let relevance_score = buf.get_f32_le();
        let timestamp = buf.get_i64_le();
        let tag = buf.get_u8();
        let source_type = SourceType::from_u8(tag)
            .ok_or_else(|| corrupt(format!("unknown source type {}", tag)))?;
        hot.push(NewsItemHot {
            relevance_score,
            timestamp,
            source_type,
            title_hash: buf.get_u64_le(),
            url_hash: buf.get_u64_le(),
            cold_data_index: buf.get_u32_le(),
        });
    }

    Ok(hot)
}

// =============================================================================
// Cold
// =============================================================================

/// Serialize cold records together with the strings and metadata they use
pub fn serialize_cold(cold: &[NewsItemCold], pools: &MemoryPools) -> Vec<u8> {
    let strings = pools.strings.as_bytes();
    let mut buf = Vec::with_capacity(
        BLOB_HEADER_SIZE + cold.len() * COLD_RECORD_SIZE + 4 + strings.len() + CRC_SIZE,
    );
    put_header(&mut buf, COLD_MAGIC, cold.len());

    for item in cold {
        put_ref(&mut buf, item.title);
        put_ref(&mut buf, item.summary);
        put_ref(&mut buf, item.url);
        put_ref(&mut buf, item.source);
        for index in item.metadata_indices() {
            buf.put_u32_le(index);
        }
    }

    buf.put_u32_le(strings.len() as u32);
    buf.put_slice(strings);

    put_section(&mut buf, pools.community_posts.iter_allocated(), |buf, m: &CommunityPostMeta| {
        put_ref(buf, m.community);
        buf.put_i32_le(m.score);
        buf.put_u32_le(m.comment_count);
    });
    put_section(&mut buf, pools.videos.iter_allocated(), |buf, m: &VideoMeta| {
        put_ref(buf, m.channel);
        buf.put_u64_le(m.view_count);
        buf.put_u32_le(m.duration_secs);
    });
    put_section(&mut buf, pools.papers.iter_allocated(), |buf, m: &PaperMeta| {
        put_ref(buf, m.authors);
        put_ref(buf, m.paper_id);
        buf.put_u32_le(m.citation_count);
    });
    put_section(&mut buf, pools.articles.iter_allocated(), |buf, m: &ArticleMeta| {
        put_ref(buf, m.author);
        buf.put_u32_le(m.word_count);
    });
    put_section(&mut buf, pools.repositories.iter_allocated(), |buf, m: &RepositoryMeta| {
        put_ref(buf, m.language);
        buf.put_u32_le(m.stars);
        buf.put_u32_le(m.forks);
    });

    seal(buf)
}

/// Rebuild cold records and a fresh set of pools from a cold blob
///
/// Metadata records are re-acquired from empty pools and the cold records'
/// slot indices rewritten to match. Every `StringRef` is checked against
/// the restored string bytes.
pub fn deserialize_cold(bytes: &[u8], string_pool_bytes: usize) -> Result<(Vec<NewsItemCold>, MemoryPools)> {
    let mut buf = unseal(bytes)?;
    let count = read_header(&mut buf, COLD_MAGIC)?;

    // Records plus at least the string length and five section counts
    let needed = count
        .checked_mul(COLD_RECORD_SIZE)
        .and_then(|n| n.checked_add(4 + 5 * 4))
        .ok_or_else(|| corrupt("cold record count overflows".to_string()))?;
    if buf.remaining() < needed {
        return Err(corrupt(format!(
            "cold blob declares {} records but carries {} bytes",
            count,
            buf.remaining()
        )));
    }

    let mut cold = Vec::with_capacity(count);
    for _ in 0..count {
        cold.push(NewsItemCold {
            title: get_ref(&mut buf),
            summary: get_ref(&mut buf),
            url: get_ref(&mut buf),
            source: get_ref(&mut buf),
            community_index: buf.get_u32_le(),
            video_index: buf.get_u32_le(),
            paper_index: buf.get_u32_le(),
            article_index: buf.get_u32_le(),
            repository_index: buf.get_u32_le(),
        });
    }

    let string_len = buf.get_u32_le() as usize;
    ensure(&buf, string_len, "string bytes")?;
    let strings = StringPool::from_bytes(string_pool_bytes, &buf[..string_len])?;
    buf.advance(string_len);

    let mut pools = MemoryPools::with_string_pool(strings);

    let community = read_section(&mut buf, 16, "community_post", |buf| CommunityPostMeta {
        community: get_ref(buf),
        score: buf.get_i32_le(),
        comment_count: buf.get_u32_le(),
    })?;
    let videos = read_section(&mut buf, 20, "video", |buf| VideoMeta {
        channel: get_ref(buf),
        view_count: buf.get_u64_le(),
        duration_secs: buf.get_u32_le(),
    })?;
    let papers = read_section(&mut buf, 20, "paper", |buf| PaperMeta {
        authors: get_ref(buf),
        paper_id: get_ref(buf),
        citation_count: buf.get_u32_le(),
    })?;
    let articles = read_section(&mut buf, 12, "article", |buf| ArticleMeta {
        author: get_ref(buf),
        word_count: buf.get_u32_le(),
    })?;
    let repositories = read_section(&mut buf, 16, "repository", |buf| RepositoryMeta {
        language: get_ref(buf),
        stars: buf.get_u32_le(),
        forks: buf.get_u32_le(),
    })?;

    if buf.has_remaining() {
        return Err(corrupt(format!("{} trailing bytes in cold blob", buf.remaining())));
    }

    for (_, m) in &community {
        check_ref(&pools.strings, m.community)?;
    }
    for (_, m) in &videos {
        check_ref(&pools.strings, m.channel)?;
    }
    for (_, m) in &papers {
        check_ref(&pools.strings, m.authors)?;
        check_ref(&pools.strings, m.paper_id)?;
    }
    for (_, m) in &articles {
        check_ref(&pools.strings, m.author)?;
    }
    for (_, m) in &repositories {
        check_ref(&pools.strings, m.language)?;
    }

    let community_map = restore(&mut pools.community_posts, community, "community_post")?;
    let video_map = restore(&mut pools.videos, videos, "video")?;
    let paper_map = restore(&mut pools.papers, papers, "paper")?;
    let article_map = restore(&mut pools.articles, articles, "article")?;
    let repository_map = restore(&mut pools.repositories, repositories, "repository")?;

    for item in cold.iter_mut() {
        for string_ref in [item.title, item.summary, item.url, item.source] {
            check_ref(&pools.strings, string_ref)?;
        }
        item.community_index = remap(&community_map, item.community_index, "community_post")?;
        item.video_index = remap(&video_map, item.video_index, "video")?;
        item.paper_index = remap(&paper_map, item.paper_index, "paper")?;
        item.article_index = remap(&article_map, item.article_index, "article")?;
        item.repository_index = remap(&repository_map, item.repository_index, "repository")?;
    }

    Ok((cold, pools))
}

// =============================================================================
// Helpers
// =============================================================================

fn corrupt(message: String) -> CacheError {
    CacheError::Serialization(message)
}

fn put_header(buf: &mut Vec<u8>, magic: u32, count: usize) {
    buf.put_u32_le(magic);
    buf.put_u32_le(FORMAT_VERSION);
    buf.put_u32_le(count as u32);
}

fn read_header(buf: &mut &[u8], magic: u32) -> Result<usize> {
    ensure(buf, BLOB_HEADER_SIZE, "header")?;

    let found = buf.get_u32_le();
    if found != magic {
        return Err(corrupt(format!("bad magic 0x{:08X}, expected 0x{:08X}", found, magic)));
    }
    let version = buf.get_u32_le();
    if version != FORMAT_VERSION {
        return Err(corrupt(format!("unsupported blob version {}", version)));
    }
    Ok(buf.get_u32_le() as usize)
}

/// Append the CRC32 of everything written so far
fn seal(mut buf: Vec<u8>) -> Vec<u8> {
    let crc = crc32fast::hash(&buf);
    buf.put_u32_le(crc);
    buf
}

/// Verify and strip the trailing CRC32
fn unseal(bytes: &[u8]) -> Result<&[u8]> {
    if bytes.len() < BLOB_HEADER_SIZE + CRC_SIZE {
        return Err(corrupt(format!("blob too short: {} bytes", bytes.len())));
    }

    let (body, mut trailer) = bytes.split_at(bytes.len() - CRC_SIZE);
    let expected = trailer.get_u32_le();
    let actual = crc32fast::hash(body);
    if expected != actual {
        return Err(corrupt(format!(
            "checksum mismatch: stored {:08x}, computed {:08x}",
            expected, actual
        )));
    }
    Ok(body)
}

fn ensure(buf: &&[u8], needed: usize, what: &str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(corrupt(format!(
            "truncated {}: need {} bytes, have {}",
            what,
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}

fn put_ref(buf: &mut Vec<u8>, string_ref: StringRef) {
    buf.put_u32_le(string_ref.offset);
    buf.put_u32_le(string_ref.length);
}

fn get_ref(buf: &mut &[u8]) -> StringRef {
    let offset = buf.get_u32_le();
    let length = buf.get_u32_le();
    StringRef::new(offset, length)
}

fn check_ref(strings: &StringPool, string_ref: StringRef) -> Result<()> {
    match strings.get_string(string_ref) {
        Some(_) => Ok(()),
        None => Err(corrupt(format!(
            "string ref {}+{} outside restored strings ({} bytes)",
            string_ref.offset,
            string_ref.length,
            strings.used()
        ))),
    }
}

fn put_section<'a, T: 'a>(
    buf: &mut Vec<u8>,
    records: impl Iterator<Item = (u32, &'a T)>,
    mut write: impl FnMut(&mut Vec<u8>, &T),
) {
    let records: Vec<(u32, &T)> = records.collect();
    buf.put_u32_le(records.len() as u32);
    for (slot, record) in records {
        buf.put_u32_le(slot);
        write(buf, record);
    }
}

fn read_section<T>(
    buf: &mut &[u8],
    record_size: usize,
    kind: &'static str,
    mut read: impl FnMut(&mut &[u8]) -> T,
) -> Result<Vec<(u32, T)>> {
    ensure(buf, 4, kind)?;
    let count = buf.get_u32_le() as usize;

    let needed = count
        .checked_mul(4 + record_size)
        .ok_or_else(|| corrupt(format!("{} count overflows", kind)))?;
    ensure(buf, needed, kind)?;

    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let slot = buf.get_u32_le();
        records.push((slot, read(buf)));
    }
    Ok(records)
}

/// Place restored records in a fresh pool, returning old slot -> new slot
fn restore<T, const N: usize>(
    pool: &mut crate::memory::FixedSizePool<T, N>,
    records: Vec<(u32, T)>,
    kind: &'static str,
) -> Result<HashMap<u32, u32>> {
    let mut slots = HashMap::with_capacity(records.len());
    for (old, record) in records {
        let handle = pool
            .acquire_with(record)
            .ok_or(CacheError::MetadataPoolExhausted { kind })?;
        if slots.insert(old, handle.index()).is_some() {
            return Err(corrupt(format!("duplicate {} slot {}", kind, old)));
        }
    }
    Ok(slots)
}

fn remap(slots: &HashMap<u32, u32>, index: u32, kind: &str) -> Result<u32> {
    if index == NO_INDEX {
        return Ok(NO_INDEX);
    }
    slots
        .get(&index)
        .copied()
        .ok_or_else(|| corrupt(format!("cold record references missing {} slot {}", kind, index)))
}
