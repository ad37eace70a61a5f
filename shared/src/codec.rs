//! Decoding of fixed-point positions and packed system masks from state-sync buffers

use crate::{MapId, Pose};
use thiserror::Error;

/// Lower bound of the fixed-point coordinate range.
pub const POSITION_MIN: f32 = -40.0;
/// Upper bound of the fixed-point coordinate range.
pub const POSITION_MAX: f32 = 40.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer too short: needed {needed} bytes, {remaining} remaining")]
    ShortBuffer { needed: usize, remaining: usize },
    #[error("packed integer does not fit in 32 bits")]
    PackedOverflow,
}

/// Forward-only cursor over a byte buffer.
#[derive(Debug)]
pub struct Reader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < count {
            return Err(DecodeError::ShortBuffer {
                needed: count,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buffer[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    pub fn skip(&mut self, count: usize) -> Result<(), DecodeError> {
        self.take(count).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16_le(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a 7-bit-group little-endian packed integer.
    pub fn read_packed(&mut self) -> Result<u32, DecodeError> {
        let mut value: u32 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            if shift >= 32 || (shift == 28 && byte & 0x70 != 0) {
                return Err(DecodeError::PackedOverflow);
            }
            value |= u32::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }
}

/// Appends `value` in the packed integer encoding read by [`Reader::read_packed`].
pub fn write_packed(mut value: u32, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

pub fn lerp(min: f32, max: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    min + (max - min) * t
}

fn unpack_coordinate(raw: u16) -> f32 {
    lerp(POSITION_MIN, POSITION_MAX, f32::from(raw) / f32::from(u16::MAX))
}

/// Reads two fixed-point coordinates (x then y).
pub fn read_position(reader: &mut Reader<'_>) -> Result<Pose, DecodeError> {
    let x = unpack_coordinate(reader.read_u16_le()?);
    let y = unpack_coordinate(reader.read_u16_le()?);
    Ok(Pose::new(x, y))
}

/// Decodes a bare position, as carried by a teleport.
pub fn decode_position(buffer: &[u8]) -> Result<Pose, DecodeError> {
    read_position(&mut Reader::new(buffer))
}

/// Decodes a movement update: a discarded sequence number followed by a position.
pub fn decode_pose(buffer: &[u8]) -> Result<Pose, DecodeError> {
    let mut reader = Reader::new(buffer);
    let _sequence = reader.read_u16_le()?;
    read_position(&mut reader)
}

/// Reads the dirty-systems mask, returning it with the offset where system data begins.
pub fn decode_systems_mask(buffer: &[u8]) -> Result<(u32, usize), DecodeError> {
    let mut reader = Reader::new(buffer);
    let mask = reader.read_packed()?;
    Ok((mask, reader.position()))
}

/// How a map's communications system serializes its sabotage state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsLayout {
    /// A single "sabotaged" flag.
    Flag,
    /// A list of active consoles followed by a count of fixed consoles.
    ConsoleList,
}

/// Comms layout per map.
pub const COMMS_LAYOUTS: [(MapId, CommsLayout); 3] = [
    (MapId::Skeld, CommsLayout::Flag),
    (MapId::MiraHq, CommsLayout::ConsoleList),
    (MapId::Polus, CommsLayout::Flag),
];

pub fn comms_layout(map: MapId) -> CommsLayout {
    COMMS_LAYOUTS
        .iter()
        .find(|(id, _)| *id == map)
        .map(|(_, layout)| *layout)
        .unwrap_or(CommsLayout::Flag)
}

/// Console-list maps are sabotaged while fewer than this many consoles are fixed.
pub const FIXED_CONSOLES_REQUIRED: u32 = 2;

/// Decodes the communications system's sabotage state for `map`.
///
/// `buffer` must start at the communications system's data.
pub fn decode_comms_sabotage(buffer: &[u8], map: MapId) -> Result<bool, DecodeError> {
    let mut reader = Reader::new(buffer);
    match comms_layout(map) {
        CommsLayout::Flag => reader.read_bool(),
        CommsLayout::ConsoleList => {
            let active = reader.read_packed()?;
            let console_bytes = usize::try_from(active)
                .ok()
                .and_then(|count| count.checked_mul(2))
                .ok_or(DecodeError::ShortBuffer {
                    needed: usize::MAX,
                    remaining: reader.remaining(),
                })?;
            reader.skip(console_bytes)?;
            let fixed = reader.read_packed()?;
            Ok(fixed < FIXED_CONSOLES_REQUIRED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn pose_bytes(sequence: u16, x: u16, y: u16) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&sequence.to_le_bytes());
        bytes.extend_from_slice(&x.to_le_bytes());
        bytes.extend_from_slice(&y.to_le_bytes());
        bytes
    }

    #[test]
    fn test_decode_pose_bounds() {
        let low = decode_pose(&pose_bytes(7, 0, 0)).unwrap();
        assert_approx_eq!(low.x, -40.0, 1e-4);
        assert_approx_eq!(low.y, -40.0, 1e-4);

        let high = decode_pose(&pose_bytes(8, 65535, 65535)).unwrap();
        assert_approx_eq!(high.x, 40.0, 1e-4);
        assert_approx_eq!(high.y, 40.0, 1e-4);
    }

    #[test]
    fn test_decode_pose_midpoint() {
        let mid = decode_pose(&pose_bytes(0, 32767, 32768)).unwrap();
        assert_approx_eq!(mid.x, 0.0, 0.01);
        assert_approx_eq!(mid.y, 0.0, 0.01);
    }

    #[test]
    fn test_decode_pose_ignores_trailing_velocity() {
        let mut bytes = pose_bytes(1, 65535, 0);
        bytes.extend_from_slice(&[0xFF, 0x7F, 0xFF, 0x7F]);
        let pose = decode_pose(&bytes).unwrap();
        assert_approx_eq!(pose.x, 40.0, 1e-4);
        assert_approx_eq!(pose.y, -40.0, 1e-4);
    }

    #[test]
    fn test_decode_pose_short_buffer() {
        let err = decode_pose(&[0, 0, 1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::ShortBuffer {
                needed: 2,
                remaining: 1
            }
        );
    }

    #[test]
    fn test_decode_position_without_sequence() {
        let pose = decode_position(&[0xFF, 0xFF, 0x00, 0x00]).unwrap();
        assert_approx_eq!(pose.x, 40.0, 1e-4);
        assert_approx_eq!(pose.y, -40.0, 1e-4);
    }

    #[test]
    fn test_read_packed() {
        assert_eq!(Reader::new(&[0x00]).read_packed().unwrap(), 0);
        assert_eq!(Reader::new(&[0x7F]).read_packed().unwrap(), 127);
        assert_eq!(Reader::new(&[0x80, 0x01]).read_packed().unwrap(), 128);
        assert_eq!(Reader::new(&[0x80, 0x80, 0x01]).read_packed().unwrap(), 1 << 14);
        assert_eq!(
            Reader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]).read_packed().unwrap(),
            u32::MAX
        );
    }

    #[test]
    fn test_read_packed_overflow() {
        let err = Reader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x1F])
            .read_packed()
            .unwrap_err();
        assert_eq!(err, DecodeError::PackedOverflow);
    }

    #[test]
    fn test_read_packed_truncated() {
        assert!(matches!(
            Reader::new(&[0x80]).read_packed(),
            Err(DecodeError::ShortBuffer { .. })
        ));
    }

    #[test]
    fn test_write_packed_matches_reader() {
        for value in [0, 1, 127, 128, 300, 1 << 14, 1 << 21, u32::MAX] {
            let mut bytes = Vec::new();
            write_packed(value, &mut bytes);
            let mut reader = Reader::new(&bytes);
            assert_eq!(reader.read_packed().unwrap(), value);
            assert_eq!(reader.remaining(), 0);
        }
    }

    #[test]
    fn test_decode_systems_mask_offset() {
        let mut bytes = Vec::new();
        write_packed(1 << crate::COMMS_SYSTEM_BIT, &mut bytes);
        bytes.push(1);

        let (mask, offset) = decode_systems_mask(&bytes).unwrap();
        assert_eq!(mask, 1 << 14);
        assert_eq!(offset, 3);
        assert_eq!(bytes[offset], 1);
    }

    #[test]
    fn test_comms_flag_maps() {
        for map in [MapId::Skeld, MapId::Polus] {
            assert!(decode_comms_sabotage(&[1], map).unwrap());
            assert!(!decode_comms_sabotage(&[0], map).unwrap());
        }
    }

    fn console_list(active: &[(u8, u8)], fixed: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_packed(active.len() as u32, &mut bytes);
        for (player, console) in active {
            bytes.push(*player);
            bytes.push(*console);
        }
        write_packed(fixed, &mut bytes);
        bytes
    }

    #[test]
    fn test_comms_console_list_threshold() {
        assert!(decode_comms_sabotage(&console_list(&[(1, 0)], 1), MapId::MiraHq).unwrap());
        assert!(decode_comms_sabotage(&console_list(&[], 0), MapId::MiraHq).unwrap());
        let two_fixed = console_list(&[(1, 0), (2, 1)], 2);
        assert!(!decode_comms_sabotage(&two_fixed, MapId::MiraHq).unwrap());
        assert!(!decode_comms_sabotage(&console_list(&[], 3), MapId::MiraHq).unwrap());
    }

    #[test]
    fn test_comms_console_list_short_buffer() {
        // claims two active consoles but carries only one
        let bytes = [2, 1, 0];
        assert!(decode_comms_sabotage(&bytes, MapId::MiraHq).is_err());
    }

    #[test]
    fn test_comms_console_list_huge_count() {
        let mut bytes = Vec::new();
        write_packed(u32::MAX, &mut bytes);
        bytes.push(0);

        assert!(matches!(
            decode_comms_sabotage(&bytes, MapId::MiraHq),
            Err(DecodeError::ShortBuffer { .. })
        ));
    }

    #[test]
    fn test_comms_layout_table() {
        assert_eq!(comms_layout(MapId::Skeld), CommsLayout::Flag);
        assert_eq!(comms_layout(MapId::MiraHq), CommsLayout::ConsoleList);
        assert_eq!(comms_layout(MapId::Polus), CommsLayout::Flag);
    }
}
