use crate::byte_iter::ByteIter;
use crate::core::Channel;
use crate::error::LoadResult;
use log::trace;
use snafu::ResultExt;
use std::io::Read;

/// A note-on or note-off message. A note-on with `velocity == 0` is semantically a note-off; the
/// note pairer (see [`crate::song::note`]) is responsible for treating it that way, not this type.
#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct NoteMessage {
    pub channel: Channel,
    pub note_number: u8,
    pub velocity: u8,
}

#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct PolyPressureMessage {
    pub channel: Channel,
    pub note_number: u8,
    pub pressure: u8,
}

/// A controller number and raw value. Nothing in this engine inspects a controller's *meaning* —
/// note-pairing, instrument discovery, and control-state replay only need "is this a
/// control-change and what are its raw bytes" — so the controller number is kept as a plain
/// `u8` rather than a per-controller enum.
#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct ControlChangeMessage {
    pub channel: Channel,
    pub controller: u8,
    pub value: u8,
}

#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct ProgramChangeMessage {
    pub channel: Channel,
    pub program: u8,
}

#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct ChannelPressureMessage {
    pub channel: Channel,
    pub pressure: u8,
}

#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct PitchBendMessage {
    pub channel: Channel,
    pub lsb: u8,
    pub msb: u8,
}

impl PitchBendMessage {
    /// The 14-bit pitch bend value, centered at 8192.
    pub fn value(&self) -> u16 {
        ((self.msb as u16) << 7) | self.lsb as u16
    }
}

/// A single MIDI channel voice message: the subset of the MIDI 1.0 vocabulary relevant to file
/// playback. Channel-mode messages, system-common, and system-realtime messages are out of
/// scope: this is a file playback engine, not a realtime MIDI receiver, and nothing here ever
/// needs to represent them.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub enum ChannelMessage {
    NoteOff(NoteMessage),
    NoteOn(NoteMessage),
    PolyPressure(PolyPressureMessage),
    Control(ControlChangeMessage),
    ProgramChange(ProgramChangeMessage),
    ChannelPressure(ChannelPressureMessage),
    PitchBend(PitchBendMessage),
}

impl Default for ChannelMessage {
    fn default() -> Self {
        ChannelMessage::NoteOff(NoteMessage::default())
    }
}

impl ChannelMessage {
    pub fn channel(&self) -> Channel {
        match self {
            ChannelMessage::NoteOff(m) => m.channel,
            ChannelMessage::NoteOn(m) => m.channel,
            ChannelMessage::PolyPressure(m) => m.channel,
            ChannelMessage::Control(m) => m.channel,
            ChannelMessage::ProgramChange(m) => m.channel,
            ChannelMessage::ChannelPressure(m) => m.channel,
            ChannelMessage::PitchBend(m) => m.channel,
        }
    }

    /// True for note-on with `velocity > 0`, the only message that opens a note. Note-on with
    /// `velocity == 0` and note-off both close a note.
    pub fn is_note_start(&self) -> bool {
        matches!(self, ChannelMessage::NoteOn(m) if m.velocity > 0)
    }

    /// True for note-off, or note-on with `velocity == 0`.
    pub fn is_note_end(&self) -> bool {
        matches!(self, ChannelMessage::NoteOff(_))
            || matches!(self, ChannelMessage::NoteOn(m) if m.velocity == 0)
    }

    /// Parses one channel message, consuming the running-status byte only if the next byte in
    /// the stream actually carries one (high bit set). `running_status` is threaded through by
    /// the caller, one instance per track, and reused across events that omit their status byte.
    pub(crate) fn parse<R: Read>(
        iter: &mut ByteIter<R>,
        running_status: &mut Option<u8>,
    ) -> LoadResult<Self> {
        let peeked = iter.peek_or_die().context(io!())?;
        let status = if peeked & 0x80 != 0 {
            iter.read_or_die().context(io!())?
        } else {
            match *running_status {
                Some(s) => s,
                None => invalid_file!("data byte encountered with no preceding status byte"),
            }
        };
        trace!("channel message status {:#04x}", status);
        *running_status = Some(status);
        let channel = Channel::new(status & 0x0f);
        match status & 0xf0 {
            0x80 => {
                let note_number = iter.read_or_die().context(io!())?;
                let velocity = iter.read_or_die().context(io!())?;
                Ok(ChannelMessage::NoteOff(NoteMessage {
                    channel,
                    note_number,
                    velocity,
                }))
            }
            0x90 => {
                let note_number = iter.read_or_die().context(io!())?;
                let velocity = iter.read_or_die().context(io!())?;
                Ok(ChannelMessage::NoteOn(NoteMessage {
                    channel,
                    note_number,
                    velocity,
                }))
            }
            0xa0 => {
                let note_number = iter.read_or_die().context(io!())?;
                let pressure = iter.read_or_die().context(io!())?;
                Ok(ChannelMessage::PolyPressure(PolyPressureMessage {
                    channel,
                    note_number,
                    pressure,
                }))
            }
            0xb0 => {
                let controller = iter.read_or_die().context(io!())?;
                let value = iter.read_or_die().context(io!())?;
                Ok(ChannelMessage::Control(ControlChangeMessage {
                    channel,
                    controller,
                    value,
                }))
            }
            0xc0 => {
                let program = iter.read_or_die().context(io!())?;
                Ok(ChannelMessage::ProgramChange(ProgramChangeMessage {
                    channel,
                    program,
                }))
            }
            0xd0 => {
                let pressure = iter.read_or_die().context(io!())?;
                Ok(ChannelMessage::ChannelPressure(ChannelPressureMessage {
                    channel,
                    pressure,
                }))
            }
            0xe0 => {
                let lsb = iter.read_or_die().context(io!())?;
                let msb = iter.read_or_die().context(io!())?;
                Ok(ChannelMessage::PitchBend(PitchBendMessage {
                    channel,
                    lsb,
                    msb,
                }))
            }
            _ => invalid_file!("unrecognized channel status byte {:#04x}", status),
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
    fn parses_note_on_with_explicit_status() {
        let mut iter = iter_for(&[0x90, 60, 100]);
        let mut running = None;
        let msg = ChannelMessage::parse(&mut iter, &mut running).unwrap();
        assert_eq!(
            msg,
            ChannelMessage::NoteOn(NoteMessage {
                channel: Channel::new(0),
                note_number: 60,
                velocity: 100
            })
        );
        assert_eq!(running, Some(0x90));
    }

    #[test]
    fn reuses_running_status() {
        let mut iter = iter_for(&[61, 80]);
        let mut running = Some(0x90u8);
        let msg = ChannelMessage::parse(&mut iter, &mut running).unwrap();
        assert_eq!(
            msg,
            ChannelMessage::NoteOn(NoteMessage {
                channel: Channel::new(0),
                note_number: 61,
                velocity: 80
            })
        );
    }

    #[test]
    fn velocity_zero_note_on_is_not_a_note_start() {
        let m = ChannelMessage::NoteOn(NoteMessage {
            channel: Channel::new(0),
            note_number: 60,
            velocity: 0,
        });
        assert!(!m.is_note_start());
        assert!(m.is_note_end());
    }
}
