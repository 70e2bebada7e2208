/*!
A beat-synchronized click generator, independent of [`crate::song::Song`] but able to lock onto
one: four beat oscillators (free-running visual, free-running audio, song-synced visual,
song-synced audio) producing the strong/weak click events and light states a transport UI needs.
!*/

mod beat;
mod controller;

pub use beat::BeatStatus;
pub use controller::{Metronome, MetronomeLight};
