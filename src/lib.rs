/*!
A destructive Standard MIDI File loader and playback engine.

Loading a file with [`song::Song::load`] (or [`song::Song::read`] for an in-memory source) parses
every track, then destructively normalizes it: all tempo and time-signature meta-events are
relocated out of their original tracks into two synthetic trailing tracks, a bar/beat timeline is
built from them, and a pulse-to-microsecond oracle is attached to every remaining event. The result
is a [`song::Song`] ready to drive a [`song::TaggedEvent`]-emitting playback cursor, optionally
concatenated with other songs, and optionally paired with a [`metronome::Metronome`] for a
beat-synchronized click track.

This is a loading and timing engine, not a sequencer: there is no write path, and no audio
synthesis. See `examples/` in the repository root for end-to-end usage.
!*/

#![allow(dead_code)]

#[macro_use]
mod error;
#[macro_use]
mod clamp;

mod byte_iter;
mod text;
mod vlq;

pub mod core;
pub mod file;
pub mod metronome;
pub mod song;

pub use error::{Error, Result};
