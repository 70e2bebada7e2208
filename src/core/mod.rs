/*!
The `core` module holds types and concepts that are not specific to MIDI *files* — they would
also apply to realtime MIDI messages arriving over a wire, as distinct from `file`, which holds
file-specific framing: chunks and meta-events.
!*/

pub mod channel;
pub mod message;

pub use channel::Channel;
pub use message::{ChannelMessage, NoteMessage};
