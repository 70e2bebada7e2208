use crate::byte_iter::ByteIter;
use crate::error::LoadResult;
use crate::text::Text;
use snafu::ResultExt;
use std::io::Read;

const META_TEXT: u8 = 0x01;
const META_COPYRIGHT: u8 = 0x02;
const META_TRACK_NAME: u8 = 0x03;
const META_INSTR_NAME: u8 = 0x04;
const META_LYRIC: u8 = 0x05;
const META_MARKER: u8 = 0x06;
const META_CUE_POINT: u8 = 0x07;
const META_PROG_NAME: u8 = 0x08;
const META_DEVICE_NAME: u8 = 0x09;
const META_CHAN_PREFIX: u8 = 0x20;
const META_END_OF_TRACK: u8 = 0x2f;
const META_SET_TEMPO: u8 = 0x51;
const META_TIME_SIG: u8 = 0x58;

const LEN_META_CHAN_PREFIX: u8 = 1;
const LEN_META_END_OF_TRACK: u8 = 0;
const LEN_META_SET_TEMPO: u8 = 3;
const LEN_META_TIME_SIG: u8 = 4;

const MAX_24BIT_UINT_VALUE: u32 = 16_777_215;
const DEFAULT_MICROSECONDS_PER_QUARTER: u32 = 500_000;

clamp!(
    /// Tempo expressed as microseconds per quarter note, the MIDI set-tempo unit. Stored on the
    /// wire as a 24-bit big-endian integer, hence the odd upper bound. The default, `500_000`,
    /// is 120 beats per minute.
    MicrosecondsPerQuarter,
    u32,
    1,
    MAX_24BIT_UINT_VALUE,
    DEFAULT_MICROSECONDS_PER_QUARTER,
    pub
);

impl MicrosecondsPerQuarter {
    fn parse<R: Read>(iter: &mut ByteIter<R>) -> LoadResult<Self> {
        iter.read_expect(LEN_META_SET_TEMPO).context(io!())?;
        let bytes = iter.read_n(LEN_META_SET_TEMPO as usize).context(io!())?;
        let value = u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]);
        Ok(MicrosecondsPerQuarter::new(value))
    }
}

/// A meter numerator/denominator pair. The denominator is stored in the file as a power-of-two
/// exponent (`2` means quarter-note, `3` means eighth-note) and converted here to the actual
/// denominator value.
#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct TimeSignatureValue {
    numerator: u8,
    denominator: u8,
}

impl TimeSignatureValue {
    pub fn numerator(&self) -> u8 {
        self.numerator
    }

    pub fn denominator(&self) -> u8 {
        self.denominator
    }

    fn parse<R: Read>(iter: &mut ByteIter<R>) -> LoadResult<Self> {
        iter.read_expect(LEN_META_TIME_SIG).context(io!())?;
        let numerator = iter.read_or_die().context(io!())?;
        let denominator_exponent = iter.read_or_die().context(io!())?;
        // the remaining two bytes (metronome click, 32nds-per-quarter) are not used anywhere in
        // this engine's timing model and are read only to advance the cursor correctly.
        let _click = iter.read_or_die().context(io!())?;
        let _thirty_second_notes_per_quarter = iter.read_or_die().context(io!())?;
        if numerator == 0 {
            invalid_file!("time signature numerator must be nonzero");
        }
        Ok(Self {
            numerator,
            denominator: 1u8.checked_shl(denominator_exponent as u32).unwrap_or(1),
        })
    }
}

/// The non-MIDI metadata and control events that may appear interleaved with channel messages in
/// a track chunk. Trimmed to the meta types this engine's components actually read: the text
/// variants feed private-metadata extraction, `SetTempo`/`TimeSignature` feed the tempo/meter
/// normalizer, `EndOfTrack` terminates track parsing, and `MidiChannelPrefix` is preserved
/// structurally so the cursor advances past it correctly even though nothing consumes its value.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub enum MetaEvent {
    OtherText(Text),
    Copyright(Text),
    TrackName(Text),
    InstrumentName(Text),
    Lyric(Text),
    Marker(Text),
    CuePoint(Text),
    ProgramName(Text),
    DeviceName(Text),
    MidiChannelPrefix(u8),
    EndOfTrack,
    SetTempo(MicrosecondsPerQuarter),
    TimeSignature(TimeSignatureValue),
    /// A meta-event type this engine does not model. Its payload has already been skipped; the
    /// variant exists only so `is_end` and other matchers never confuse it for `EndOfTrack`.
    Unrecognized(u8),
}

impl Default for MetaEvent {
    fn default() -> Self {
        MetaEvent::EndOfTrack
    }
}

impl MetaEvent {
    pub(crate) fn parse<R: Read>(iter: &mut ByteIter<R>) -> LoadResult<Self> {
        iter.read_expect(0xff).context(io!())?;
        let meta_type_byte = iter.read_or_die().context(io!())?;
        match meta_type_byte {
            META_TEXT..=META_DEVICE_NAME => Self::parse_text(iter, meta_type_byte),
            META_CHAN_PREFIX => {
                iter.read_expect(LEN_META_CHAN_PREFIX).context(io!())?;
                Ok(MetaEvent::MidiChannelPrefix(
                    iter.read_or_die().context(io!())?,
                ))
            }
            META_END_OF_TRACK => {
                iter.read_expect(LEN_META_END_OF_TRACK).context(io!())?;
                Ok(MetaEvent::EndOfTrack)
            }
            META_SET_TEMPO => Ok(MetaEvent::SetTempo(MicrosecondsPerQuarter::parse(iter)?)),
            META_TIME_SIG => Ok(MetaEvent::TimeSignature(TimeSignatureValue::parse(iter)?)),
            other => {
                // an unrecognized meta type is not a structural error: skip its payload using
                // the length-prefixed framing every meta-event shares.
                let length = iter.read_vlq_u32().context(io!())?;
                let _ = iter.read_n(length as usize).context(io!())?;
                log::warn!("skipping unrecognized meta-event type {:#04x}", other);
                Ok(MetaEvent::Unrecognized(other))
            }
        }
    }

    fn parse_text<R: Read>(iter: &mut ByteIter<R>, text_type: u8) -> LoadResult<Self> {
        let length = iter.read_vlq_u32().context(io!())?;
        let bytes = iter.read_n(length as usize).context(io!())?;
        let text: Text = bytes.into();
        match text_type {
            META_TEXT => Ok(MetaEvent::OtherText(text)),
            META_COPYRIGHT => Ok(MetaEvent::Copyright(text)),
            META_TRACK_NAME => Ok(MetaEvent::TrackName(text)),
            META_INSTR_NAME => Ok(MetaEvent::InstrumentName(text)),
            META_LYRIC => Ok(MetaEvent::Lyric(text)),
            META_MARKER => Ok(MetaEvent::Marker(text)),
            META_CUE_POINT => Ok(MetaEvent::CuePoint(text)),
            META_PROG_NAME => Ok(MetaEvent::ProgramName(text)),
            META_DEVICE_NAME => Ok(MetaEvent::DeviceName(text)),
            _ => invalid_file!("unrecognized text meta-event type {:#04x}", text_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn iter_for(bytes: &[u8]) -> ByteIter<Cursor<Vec<u8>>> {
        ByteIter::new(Cursor::new(bytes.to_vec()).bytes()).unwrap()
    }

    #[test]
    fn parses_track_name() {
        let mut iter = iter_for(&[0xff, 0x03, 0x04, b'b', b'a', b's', b's']);
        let event = MetaEvent::parse(&mut iter).unwrap();
        match event {
            MetaEvent::TrackName(t) => assert_eq!(t.as_str(), "bass"),
            other => panic!("expected TrackName, got {:?}", other),
        }
    }

    #[test]
    fn parses_set_tempo() {
        let mut iter = iter_for(&[0xff, 0x51, 0x03, 0x07, 0xa1, 0x20]);
        let event = MetaEvent::parse(&mut iter).unwrap();
        match event {
            MetaEvent::SetTempo(t) => assert_eq!(t.get(), 500_000),
            other => panic!("expected SetTempo, got {:?}", other),
        }
    }

    #[test]
    fn parses_time_signature_six_eight() {
        let mut iter = iter_for(&[0xff, 0x58, 0x04, 0x06, 0x03, 0x24, 0x08]);
        let event = MetaEvent::parse(&mut iter).unwrap();
        match event {
            MetaEvent::TimeSignature(t) => {
                assert_eq!(t.numerator(), 6);
                assert_eq!(t.denominator(), 8);
            }
            other => panic!("expected TimeSignature, got {:?}", other),
        }
    }

    #[test]
    fn skips_unrecognized_meta_event() {
        let mut iter = iter_for(&[0xff, 0x7f, 0x02, 0xaa, 0xbb]);
        let event = MetaEvent::parse(&mut iter).unwrap();
        assert_eq!(event, MetaEvent::Unrecognized(0x7f));
    }
}
