// Path: crates/corenet-types/src/packet.rs

use crate::error::CoreError;
use crate::store::{DriverHash, OpType, StoreFlags, StoreObject};

/// A single store object as it travels in a global-DB sync packet.
///
/// This is deliberately narrower than [`StoreObject`]: the wire envelope
/// carries exactly the fields spelled out by the protocol (type, group,
/// id, timestamp, key, value). `crc` is not trusted off the wire — the
/// receiver recomputes it from `(group, key, value, timestamp)` as an
/// integrity check. `signature`-based pin enforcement and the `NEW` flag
/// are driver-local concerns the business layer applies above the wire
/// format, not replicated bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct WireObject {
    pub op_type: OpType,
    pub pinned: bool,
    pub group: String,
    /// Driver-assigned row id; zeroed while computing a content hash over
    /// the packet and restored afterward (see the sync log-list).
    pub id: u64,
    pub timestamp: u64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl WireObject {
    /// Recomputes the CRC-64 over `(group, key, value, timestamp)`.
    pub fn compute_crc(&self) -> u64 {
        crc64(self.group.as_bytes(), &self.key, &self.value, self.timestamp)
    }

    /// Builds a wire object from a driver-local [`StoreObject`] plus its
    /// assigned row id.
    pub fn from_store_object(obj: &StoreObject, id: u64) -> WireObject {
        WireObject {
            op_type: obj.op_type,
            pinned: obj.is_pinned(),
            group: obj.group.clone(),
            id,
            timestamp: obj.timestamp,
            key: obj.key.clone(),
            value: obj.value.clone(),
        }
    }

    /// Reconstructs a [`StoreObject`] from this wire object, recomputing
    /// its driver hash from the recomputed crc. `signature` is left empty;
    /// callers that need author verification attach it out of band.
    pub fn to_store_object(&self) -> StoreObject {
        let mut flags = StoreFlags::empty();
        if self.pinned {
            flags |= StoreFlags::PINNED;
        }
        if matches!(self.op_type, OpType::Del) {
            flags |= StoreFlags::ERASE;
        }
        StoreObject {
            group: self.group.clone(),
            key: self.key.clone(),
            value: self.value.clone(),
            flags,
            signature: Vec::new(),
            timestamp: self.timestamp,
            crc: self.compute_crc(),
            op_type: self.op_type,
        }
    }

    pub fn driver_hash(&self) -> DriverHash {
        DriverHash {
            timestamp: self.timestamp,
            crc: self.compute_crc(),
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        let mut type_field: u32 = self.op_type as u8 as u32;
        if self.pinned {
            type_field |= 0x100;
        }
        out.extend_from_slice(&type_field.to_le_bytes());
        let group_bytes = self.group.as_bytes();
        out.extend_from_slice(&(group_bytes.len() as u16).to_le_bytes());
        out.extend_from_slice(group_bytes);
        out.extend_from_slice(&self.id.to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&(self.key.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.key);
        out.extend_from_slice(&(self.value.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.value);
    }

    fn decode(buf: &[u8]) -> Result<(WireObject, usize), CoreError> {
        let mut cursor = 0usize;

        let type_field = read_u32(buf, &mut cursor, "type")?;
        let op_byte = (type_field & 0xff) as u8;
        let op_type =
            OpType::from_byte(op_byte).ok_or(CoreError::TruncatedPacket("type"))?;
        let pinned = type_field & 0x100 != 0;

        let group_len = read_u16(buf, &mut cursor, "group_len")? as usize;
        let group_bytes = read_bytes(buf, &mut cursor, group_len, "group")?;
        let group =
            String::from_utf8(group_bytes.to_vec()).map_err(|_| CoreError::TruncatedPacket("group"))?;

        let id = read_u64(buf, &mut cursor, "id")?;
        let timestamp = read_u64(buf, &mut cursor, "timestamp")?;

        let key_len = read_u16(buf, &mut cursor, "key_len")? as usize;
        let key = read_bytes(buf, &mut cursor, key_len, "key")?.to_vec();

        let value_len = read_u64(buf, &mut cursor, "value_len")? as usize;
        let value = read_bytes(buf, &mut cursor, value_len, "value")?.to_vec();

        Ok((
            WireObject {
                op_type,
                pinned,
                group,
                id,
                timestamp,
                key,
                value,
            },
            cursor,
        ))
    }
}

fn read_u16(buf: &[u8], cursor: &mut usize, field: &'static str) -> Result<u16, CoreError> {
    let slice = buf
        .get(*cursor..*cursor + 2)
        .ok_or(CoreError::TruncatedPacket(field))?;
    *cursor += 2;
    Ok(u16::from_le_bytes([slice[0], slice[1]]))
}

fn read_u32(buf: &[u8], cursor: &mut usize, field: &'static str) -> Result<u32, CoreError> {
    let slice = buf
        .get(*cursor..*cursor + 4)
        .ok_or(CoreError::TruncatedPacket(field))?;
    *cursor += 4;
    let mut arr = [0u8; 4];
    arr.copy_from_slice(slice);
    Ok(u32::from_le_bytes(arr))
}

fn read_u64(buf: &[u8], cursor: &mut usize, field: &'static str) -> Result<u64, CoreError> {
    let slice = buf
        .get(*cursor..*cursor + 8)
        .ok_or(CoreError::TruncatedPacket(field))?;
    *cursor += 8;
    let mut arr = [0u8; 8];
    arr.copy_from_slice(slice);
    Ok(u64::from_le_bytes(arr))
}

fn read_bytes<'a>(
    buf: &'a [u8],
    cursor: &mut usize,
    len: usize,
    field: &'static str,
) -> Result<&'a [u8], CoreError> {
    let slice = buf
        .get(*cursor..*cursor + len)
        .ok_or(CoreError::TruncatedPacket(field))?;
    *cursor += len;
    Ok(slice)
}

/// A trivial, dependency-free CRC-64 (Jones polynomial, reflected) used for
/// the core's own integrity check. Not cryptographic; the replicated
/// signature carries authenticity, this only catches bit-rot/truncation.
fn crc64(group: &[u8], key: &[u8], value: &[u8], timestamp: u64) -> u64 {
    const POLY: u64 = 0xad93d23594c935a9;
    let mut crc: u64 = !0;
    for byte in group
        .iter()
        .chain(key.iter())
        .chain(value.iter())
        .chain(timestamp.to_le_bytes().iter())
    {
        crc ^= u64::from(*byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (POLY & mask);
        }
    }
    !crc
}

/// The wire envelope carrying one or more serialized store objects between
/// peers: a nanosecond timestamp, `data_size`, `obj_count`, then
/// `data_size` bytes of concatenated objects.
#[derive(Debug, Clone, PartialEq)]
pub struct GdbPacket {
    pub timestamp: u64,
    pub objects: Vec<WireObject>,
}

impl GdbPacket {
    pub fn new(timestamp: u64, objects: Vec<WireObject>) -> GdbPacket {
        GdbPacket { timestamp, objects }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for obj in &self.objects {
            obj.encode(&mut body);
        }
        let mut out = Vec::with_capacity(8 + 8 + 4 + body.len());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&(body.len() as u64).to_le_bytes());
        out.extend_from_slice(&(self.objects.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    /// Parses a packet, bounds-checking every length before dereferencing
    /// it. Any truncation returns a specific "can't read field X" error and
    /// never reads past `buf`'s end.
    pub fn deserialize(buf: &[u8]) -> Result<GdbPacket, CoreError> {
        let mut cursor = 0usize;
        let timestamp = read_u64(buf, &mut cursor, "timestamp")?;
        let data_size = read_u64(buf, &mut cursor, "data_size")? as usize;
        let obj_count = read_u32(buf, &mut cursor, "obj_count")? as usize;

        let body = buf
            .get(cursor..cursor + data_size)
            .ok_or(CoreError::TruncatedPacket("data"))?;

        let mut objects = Vec::with_capacity(obj_count.min(4096));
        let mut body_cursor = 0usize;
        for _ in 0..obj_count {
            let remaining = body
                .get(body_cursor..)
                .ok_or(CoreError::TruncatedPacket("object"))?;
            let (obj, consumed) = WireObject::decode(remaining)?;
            objects.push(obj);
            body_cursor += consumed;
        }

        Ok(GdbPacket { timestamp, objects })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WireObject {
        WireObject {
            op_type: OpType::Add,
            pinned: true,
            group: "local.node.last_id".into(),
            id: 7,
            timestamp: 123_456_789,
            key: b"some-key".to_vec(),
            value: b"some-value".to_vec(),
        }
    }

    #[test]
    fn packet_round_trip() {
        let pkt = GdbPacket::new(42, vec![sample(), sample()]);
        let bytes = pkt.serialize();
        let back = GdbPacket::deserialize(&bytes).expect("deserialize");
        assert_eq!(pkt, back);
    }

    #[test]
    fn truncated_packet_is_rejected_without_overread() {
        // obj_count = 1, data_size = 1_000_000, but only 40 trailing bytes.
        let mut buf = Vec::new();
        buf.extend_from_slice(&0u64.to_le_bytes()); // timestamp
        buf.extend_from_slice(&1_000_000u64.to_le_bytes()); // data_size
        buf.extend_from_slice(&1u32.to_le_bytes()); // obj_count
        buf.extend_from_slice(&[0u8; 40]);

        let result = GdbPacket::deserialize(&buf);
        assert_eq!(result, Err(CoreError::TruncatedPacket("data")));
    }

    #[test]
    fn header_alone_is_the_minimum_valid_size() {
        let pkt = GdbPacket::new(1, vec![]);
        let bytes = pkt.serialize();
        assert_eq!(bytes.len(), 20);
        assert_eq!(GdbPacket::deserialize(&bytes).expect("deserialize"), pkt);
    }

    #[test]
    fn id_is_the_only_field_not_covered_by_the_hash() {
        let mut a = sample();
        let mut b = sample();
        a.id = 1;
        b.id = 2;
        assert_eq!(a.driver_hash(), b.driver_hash());
    }
}
