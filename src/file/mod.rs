/*!
File-specific framing: the chunk structure (`MThd`/`MTrk`), the meta-event and sysex vocabularies,
and the header fields that only mean something in the context of a Standard MIDI File. Channel
message parsing itself lives in [`crate::core`], since it would apply equally to MIDI arriving
over a wire.
!*/

mod division;
mod event;
mod header;
mod meta_event;
mod sysex;
mod track;

pub use division::{Division, PulsesPerQuarterNote};
pub use event::{Event, TrackEvent};
pub use header::{Format, Header};
pub use meta_event::{MetaEvent, MicrosecondsPerQuarter, TimeSignatureValue};
pub use sysex::{SysexEvent, SysexTag};
pub use track::Track;
