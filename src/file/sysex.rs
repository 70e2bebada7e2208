use crate::byte_iter::ByteIter;
use crate::error::LoadResult;
use snafu::ResultExt;
use std::io::Read;

/// `F0`/`F7` sysex events: a leading tag byte, a VLQ length, and that many bytes of payload. The
/// payload is not interpreted — this engine has no notion of what any given sysex message means,
/// only that it must be skipped over without disturbing the byte cursor's position.
#[derive(Clone, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct SysexEvent {
    tag: SysexTag,
    payload: Vec<u8>,
}

impl SysexEvent {
    pub fn tag(&self) -> SysexTag {
        self.tag
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub(crate) fn parse<R: Read>(iter: &mut ByteIter<R>) -> LoadResult<Self> {
        let tag_byte = iter.read_or_die().context(io!())?;
        let tag = SysexTag::from_u8(tag_byte)?;
        let len = iter.read_vlq_u32().context(io!())? as usize;
        let payload = iter.read_n(len).context(io!())?;
        Ok(Self { tag, payload })
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Hash, Default)]
pub enum SysexTag {
    /// A single complete sysex message, or the first packet of a multi-packet one.
    #[default]
    F0 = 0xf0,
    /// A continuation packet of a multi-packet sysex message.
    F7 = 0xf7,
}

impl SysexTag {
    fn from_u8(value: u8) -> LoadResult<Self> {
        match value {
            0xf0 => Ok(SysexTag::F0),
            0xf7 => Ok(SysexTag::F7),
            other => invalid_file!("expected a sysex tag (0xf0 or 0xf7), found {:#04x}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_opaque_payload() {
        let bytes = [0xf0u8, 0x03, 0x43, 0x12, 0x00];
        let mut iter = ByteIter::new(Cursor::new(bytes.to_vec()).bytes()).unwrap();
        let ev = SysexEvent::parse(&mut iter).unwrap();
        assert_eq!(ev.tag(), SysexTag::F0);
        assert_eq!(ev.payload(), &[0x43, 0x12, 0x00]);
    }
}
