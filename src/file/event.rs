use crate::byte_iter::ByteIter;
use crate::core::ChannelMessage;
use crate::error::LoadResult;
use crate::file::{MetaEvent, SysexEvent};
use log::trace;
use snafu::ResultExt;
use std::io::Read;

const FILE_META_EVENT: u8 = 0xff;
const FILE_SYSEX_F0: u8 = 0xf0;
const FILE_SYSEX_F7: u8 = 0xf7;

/// A MIDI channel message, a sysex message, or a meta-event — one of the three things that can
/// follow a delta-time in a track chunk.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub enum Event {
    Midi(ChannelMessage),
    Sysex(SysexEvent),
    Meta(MetaEvent),
}

impl Default for Event {
    fn default() -> Self {
        Event::Midi(ChannelMessage::default())
    }
}

impl Event {
    fn parse<R: Read>(iter: &mut ByteIter<R>, running_status: &mut Option<u8>) -> LoadResult<Self> {
        let status_byte = iter.peek_or_die().context(io!())?;
        match status_byte {
            FILE_SYSEX_F0 | FILE_SYSEX_F7 => {
                trace!("sysex event, tag {:#04x}", status_byte);
                Ok(Event::Sysex(SysexEvent::parse(iter)?))
            }
            FILE_META_EVENT => {
                trace!("meta event");
                Ok(Event::Meta(MetaEvent::parse(iter)?))
            }
            _ => Ok(Event::Midi(ChannelMessage::parse(iter, running_status)?)),
        }
    }
}

/// A delta-time paired with the event it precedes. Delta-time is a variable-length quantity
/// counted in ticks (as defined by the header's division field); a value of zero means the event
/// is simultaneous with the previous one.
#[derive(Clone, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct TrackEvent {
    delta_time: u32,
    event: Event,
}

impl TrackEvent {
    pub(crate) fn new(delta_time: u32, event: Event) -> Self {
        Self { delta_time, event }
    }

    /// Rebuilds this event with a different delta-time, leaving the event payload untouched.
    /// Used when splicing an event out of a track shifts the timing of its neighbor, or when
    /// concatenating two songs re-bases a spliced track's first event.
    pub(crate) fn with_delta_time(&self, delta_time: u32) -> Self {
        Self {
            delta_time,
            event: self.event.clone(),
        }
    }

    pub fn delta_time(&self) -> u32 {
        self.delta_time
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub(crate) fn is_end(&self) -> bool {
        matches!(&self.event, Event::Meta(MetaEvent::EndOfTrack))
    }

    pub(crate) fn parse<R: Read>(
        iter: &mut ByteIter<R>,
        running_status: &mut Option<u8>,
    ) -> LoadResult<Self> {
        let delta_time = iter.read_vlq_u32().context(io!())?;
        trace!("delta_time {}", delta_time);
        let event = Event::parse(iter, running_status)?;
        Ok(Self { delta_time, event })
    }
}
