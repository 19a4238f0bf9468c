//! Decoding of the packed `nsState` replica attribute.
//!
//! `nsState` records a replica's CSN generator state: replica id, the last
//! sampled clock value, local and remote clock offsets, and a sequence
//! number. Two on-disk layouts exist, distinguished by blob length:
//!
//! ```text
//! 20 bytes: rid:u16  pad:2  sampled:u32 local:u32 remote:u32  seq:u16 pad:2
//! 40 bytes: rid:u16  pad:6  sampled:u64 local:u64 remote:u64  seq:u16 pad:6
//! ```
//!
//! The byte order is that of the server which wrote the blob, not of the
//! host reading it, so decoding starts from the host order and flips when
//! the sampled timestamp lands implausibly far from the current time.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::error::DseError;

/// Window around "now" within which a decoded sampled_time is believed.
const PLAUSIBLE_SECS: i128 = 315_360_000; // ten years

/// Decoded replication state for one replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReplicaState {
    /// The replicated suffix this state belongs to.
    pub suffix: String,
    /// Replica id.
    pub rid: u16,
    /// Last sampled local clock, seconds since the epoch.
    pub sampled_time: u64,
    /// CSN generator time: sampled time plus both offsets.
    pub gen_time: u64,
    pub local_offset: u64,
    pub remote_offset: u64,
    pub seq_num: u16,
    /// Combined clock skew in seconds.
    pub time_skew: i64,
}

struct RawState {
    rid: u16,
    sampled_time: u64,
    local_offset: u64,
    remote_offset: u64,
    seq_num: u16,
}

fn read_u16(bytes: &[u8], at: usize, little: bool) -> u16 {
    let arr = [bytes[at], bytes[at + 1]];
    if little {
        u16::from_le_bytes(arr)
    } else {
        u16::from_be_bytes(arr)
    }
}

fn read_u32(bytes: &[u8], at: usize, little: bool) -> u32 {
    let arr: [u8; 4] = bytes
        .get(at..at + 4)
        .expect("blob length checked in unpack")
        .try_into()
        .expect("blob length checked in unpack");
    if little {
        u32::from_le_bytes(arr)
    } else {
        u32::from_be_bytes(arr)
    }
}

fn read_u64(bytes: &[u8], at: usize, little: bool) -> u64 {
    let arr: [u8; 8] = bytes
        .get(at..at + 8)
        .expect("blob length checked in unpack")
        .try_into()
        .expect("blob length checked in unpack");
    if little {
        u64::from_le_bytes(arr)
    } else {
        u64::from_be_bytes(arr)
    }
}

fn unpack(blob: &[u8], little: bool) -> Result<RawState, DseError> {
    match blob.len() {
        // 32-bit timevals, 2-byte padding after the u16 fields.
        20 => Ok(RawState {
            rid: read_u16(blob, 0, little),
            sampled_time: read_u32(blob, 4, little) as u64,
            local_offset: read_u32(blob, 8, little) as u64,
            remote_offset: read_u32(blob, 12, little) as u64,
            seq_num: read_u16(blob, 16, little),
        }),
        // 64-bit timevals, 6-byte padding after the u16 fields.
        40 => Ok(RawState {
            rid: read_u16(blob, 0, little),
            sampled_time: read_u64(blob, 8, little),
            local_offset: read_u64(blob, 16, little),
            remote_offset: read_u64(blob, 24, little),
            seq_num: read_u16(blob, 32, little),
        }),
        len => Err(DseError::InvalidNsState { len }),
    }
}

fn now_secs() -> i128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i128)
        .unwrap_or(0)
}

fn plausible(sampled_time: u64) -> bool {
    (now_secs() - sampled_time as i128).abs() <= PLAUSIBLE_SECS
}

/// Decode an `nsState` blob into a [`ReplicaState`].
///
/// `flip` inverts the initial byte-order guess (normally the host order);
/// either way the guess is re-checked against the sampled timestamp and
/// flipped again when it lands outside the plausible window.
pub fn decode_ns_state(
    suffix: &str,
    blob: &[u8],
    flip: bool,
) -> Result<ReplicaState, DseError> {
    let mut little = cfg!(target_endian = "little") ^ flip;
    let mut raw = unpack(blob, little)?;

    if !plausible(raw.sampled_time) {
        warn!(
            event = "NsState",
            phase = "EndianFlip",
            suffix = suffix,
            sampled_time = raw.sampled_time
        );
        little = !little;
        raw = unpack(blob, little)?;
    }

    let skew = raw.local_offset as i128 + raw.remote_offset as i128;
    let state = ReplicaState {
        suffix: suffix.to_string(),
        rid: raw.rid,
        sampled_time: raw.sampled_time,
        gen_time: raw
            .sampled_time
            .saturating_add(raw.local_offset)
            .saturating_add(raw.remote_offset),
        local_offset: raw.local_offset,
        remote_offset: raw.remote_offset,
        seq_num: raw.seq_num,
        time_skew: skew.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
    };
    debug!(
        event = "NsState",
        phase = "Decoded",
        suffix = suffix,
        rid = state.rid,
        gen_time = state.gen_time,
        seq_num = state.seq_num
    );
    Ok(state)
}
