/*!
`Song` is the top-level result of loading a Standard MIDI File: a destructively normalized set of
tracks (tempo and meter events relocated into two synthetic trailing tracks), a bar/beat timeline,
every paired note, and the playback cursor that drives realtime event emission.
!*/

mod concat;
mod cursor;
mod normalize;
mod note;
mod private_info;
mod timeline;

pub use cursor::TaggedEvent;
pub use note::{Instrument, Note};
pub use private_info::PrivateInfo;
pub use timeline::{BeatWindow, Timeline};

use crate::byte_iter::ByteIter;
use crate::error::LoadResult;
use crate::file::{Division, Format, Header, PulsesPerQuarterNote, Track};
use cursor::PlaybackCursor;
use log::{debug, trace};
use snafu::ResultExt;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// A destructively-loaded MIDI file, ready for timed playback. Loading is all-or-nothing: a
/// malformed file never yields a partially-usable `Song`.
#[derive(Clone, Debug)]
pub struct Song {
    header: Header,
    tracks: Vec<Track>,
    notes: Vec<Note>,
    instruments: Vec<Instrument>,
    timeline: Timeline,
    private_info: Option<PrivateInfo>,
    base_song_length_micros: u64,
    reserved_bars: usize,
    initial_tempo_micros: u32,
    cursor: PlaybackCursor,
    mute_track_names: HashSet<String>,
    play_track_names: HashSet<String>,
    muted_tracks: Vec<Track>,
    play_tracks: Vec<Track>,
}

const PERCUSSION_CHANNEL: u8 = 9;

impl Song {
    /// Loads a file from a path. See [`Song::read`] for the in-memory equivalent.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        if path.as_ref().file_name().is_none() {
            return Err(crate::error::BadFilename { site: site!() }.build().into());
        }
        Ok(Self::load_inner(
            ByteIter::new_file(path).context(io!())?,
        )?)
    }

    /// Loads a file already held in memory, or any other byte source.
    pub fn read<R: Read>(r: R) -> crate::error::Result<Self> {
        let iter = ByteIter::new(r.bytes()).context(io!())?;
        Ok(Self::load_inner(iter)?)
    }

    fn load_inner<R: Read>(mut iter: ByteIter<R>) -> LoadResult<Self> {
        use crate::byte_iter::ByteError;

        trace!("parsing header chunk");
        let tag_result = iter.expect_tag("MThd");
        if let Err(e) = &tag_result {
            match e {
                ByteError::Tag { found, .. } => {
                    return crate::error::UnknownHeaderType {
                        site: site!(),
                        found: found.clone(),
                    }
                    .fail();
                }
                ByteError::End { .. } => {
                    return crate::error::NoHeader { site: site!() }.fail();
                }
                _ => {}
            }
        }
        tag_result.context(io!())?;
        let chunk_length = iter.read_u32().context(io!())?;
        if chunk_length != 6 {
            return crate::error::BadHeaderSize {
                site: site!(),
                found: chunk_length,
            }
            .fail();
        }
        let format_word = iter.read_u16().context(io!())?;
        let track_count = iter.read_u16().context(io!())?;
        let division_word = iter.read_u16().context(io!())?;

        let format = Format::from_u16(format_word)?;
        if matches!(format, Format::Sequential) {
            return crate::error::Type2MidiNotSupported { site: site!() }.fail();
        }
        if matches!(format, Format::Single) && track_count != 1 {
            return crate::error::BadType0Midi {
                site: site!(),
                found: track_count,
            }
            .fail();
        }
        let division = Division::from_u16(division_word)?;
        let header = Header::new(format, division);
        let ppqn = division.pulses_per_quarter_note();

        let mut tracks = Vec::with_capacity(track_count as usize);
        for i in 0..track_count {
            trace!("parsing track chunk {} of {}", i, track_count);
            tracks.push(Track::parse(&mut iter)?);
        }
        debug!("parsed {} tracks, ppqn {}", tracks.len(), ppqn);

        Ok(Self::build(header, tracks, ppqn))
    }

    fn build(header: Header, mut tracks: Vec<Track>, ppqn: u16) -> Self {
        let private_info = private_info::translate_private_info(&tracks);

        normalize::normalize(&mut tracks);
        let tempo_track_index = tracks.len() - 1;
        let meter_track_index = tracks.len() - 2;

        let instruments: Vec<Instrument> = tracks.iter().map(note::discover_instrument).collect();

        let last_note_off_pulse = tracks
            .iter()
            .flat_map(|t| t.events().iter().zip(t.pulses()))
            .filter(|(e, _)| {
                matches!(
                    e.event(),
                    crate::file::Event::Midi(crate::core::ChannelMessage::NoteOff(_))
                ) || matches!(e.event(), crate::file::Event::Midi(crate::core::ChannelMessage::NoteOn(m)) if m.velocity == 0)
            })
            .map(|(_, &p)| p)
            .max()
            .unwrap_or(0);

        timeline::assign_microseconds(&mut tracks, tempo_track_index, ppqn);
        let timeline = timeline::build_timeline(
            &tracks[meter_track_index],
            &tracks[tempo_track_index],
            ppqn,
            last_note_off_pulse,
        );

        let mut notes = Vec::new();
        for (track_id, track) in tracks.iter().enumerate() {
            notes.extend(note::pair_notes(track, track_id));
        }
        notes.sort();

        let first_note_on_pulse = tracks
            .iter()
            .flat_map(|t| t.events().iter().zip(t.pulses()))
            .filter(|(e, _)| {
                matches!(e.event(), crate::file::Event::Midi(crate::core::ChannelMessage::NoteOn(m)) if m.velocity > 0)
            })
            .map(|(_, &p)| p)
            .min()
            .unwrap_or(0);

        let reserved_bars = timeline.reserved_bars(first_note_on_pulse);
        let base_song_length_micros = notes
            .iter()
            .map(|n| tracks[n.track_id].microseconds()[
                tracks[n.track_id].pulses().iter().position(|&p| p == n.end_pulse).unwrap_or(0)
            ])
            .max()
            .unwrap_or(0);

        let initial_tempo_micros = timeline::pulse_to_microseconds(&tracks[tempo_track_index], 0, ppqn) as u32;
        let initial_tempo_micros = if initial_tempo_micros == 0 { 500_000 } else {
            match tracks[tempo_track_index].events().first().map(|e| e.event()) {
                Some(crate::file::Event::Meta(crate::file::MetaEvent::SetTempo(t))) => t.get(),
                _ => 500_000,
            }
        };

        let song_end_micros = timeline.song_end_micros() as i64;
        let mut cursor = PlaybackCursor::new(tracks.len(), song_end_micros);
        cursor.reset(0, 0);

        Self {
            header,
            tracks,
            notes,
            instruments,
            timeline,
            private_info,
            base_song_length_micros,
            reserved_bars,
            initial_tempo_micros,
            cursor,
            mute_track_names: HashSet::new(),
            play_track_names: HashSet::new(),
            muted_tracks: Vec::new(),
            play_tracks: Vec::new(),
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn ppqn(&self) -> PulsesPerQuarterNote {
        PulsesPerQuarterNote::new(self.header.division().pulses_per_quarter_note())
    }

    /// All tracks, including the two synthetic trailing tracks (meter, then tempo).
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn instrument(&self, track_id: usize) -> Option<Instrument> {
        self.instruments.get(track_id).copied()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn private_info(&self) -> Option<&PrivateInfo> {
        self.private_info.as_ref()
    }

    pub fn reserved_bars(&self) -> usize {
        self.reserved_bars
    }

    pub fn base_song_length_micros(&self) -> u64 {
        self.base_song_length_micros
    }

    pub fn initial_tempo_micros(&self) -> u32 {
        self.initial_tempo_micros
    }

    /// A narrower percussion check than [`crate::core::Channel::is_percussion_channel`]: only
    /// channel 9 counts, matching the convention this method is named after rather than the looser
    /// channel-9-or-15 rule the note pairer and instrument discovery use.
    pub fn is_percussion(&self, channel: crate::core::Channel) -> bool {
        channel.get() == PERCUSSION_CHANNEL
    }

    pub fn reset(&mut self, lead_in_micros: i64, lead_out_micros: i64) {
        self.cursor.reset(lead_in_micros, lead_out_micros);
    }

    pub fn reset_deferred(&mut self, lead_in_micros: i64, lead_out_micros: i64, defer_micros: i64, hide: bool) {
        self.cursor
            .reset_deferred(lead_in_micros, lead_out_micros, defer_micros, hide);
    }

    pub fn set_loop(&mut self, start_micros: i64, end_micros: i64) {
        self.cursor.set_loop(start_micros, end_micros);
    }

    pub fn set_play_start(&mut self, start_micros: i64) -> Vec<TaggedEvent> {
        self.cursor.set_play_start(&self.tracks, start_micros)
    }

    /// Mutes the track named `name`: moves it out of the main track list into a parallel muted
    /// list, so the cursor no longer advances or emits events for it. Leaves the synthetic
    /// trailing meter/tempo tracks untouched even if one happens to carry that name. No-op if the
    /// track is already muted or no track by that name exists.
    pub fn mute_track(&mut self, name: &str) -> bool {
        if self.mute_track_names.contains(name) {
            return false;
        }
        let playable_len = self.tracks.len().saturating_sub(2);
        let index = match self.tracks[..playable_len]
            .iter()
            .position(|t| t.name().map(|n| n.as_str().as_ref() == name).unwrap_or(false))
        {
            Some(i) => i,
            None => return false,
        };
        self.mute_track_names.insert(name.to_string());
        let track = self.tracks.remove(index);
        self.cursor.remove_track(index);
        self.muted_tracks.push(track);
        true
    }

    /// Adds the track named `name` to the solo/play set: copies it into a parallel play list,
    /// leaving the original track (and its cursor) in the main list untouched. No-op if the track
    /// is already in the play set or no track by that name exists.
    pub fn add_play_track(&mut self, name: &str) -> bool {
        if self.play_track_names.contains(name) {
            return false;
        }
        let track = match self.tracks.iter().find(|t| t.name().map(|n| n.as_str().as_ref() == name).unwrap_or(false)) {
            Some(t) => t.clone(),
            None => return false,
        };
        self.play_track_names.insert(name.to_string());
        self.play_tracks.push(track);
        true
    }

    /// Tracks moved aside by [`Self::mute_track`], in the order they were muted.
    pub fn muted_tracks(&self) -> &[Track] {
        &self.muted_tracks
    }

    /// Tracks copied aside by [`Self::add_play_track`], in the order they were added.
    pub fn play_tracks(&self) -> &[Track] {
        &self.play_tracks
    }

    pub fn is_song_over(&self) -> bool {
        self.cursor.is_song_over()
    }

    pub fn position_micros(&self) -> i64 {
        self.cursor.position_micros()
    }

    pub fn song_end_micros(&self) -> i64 {
        self.cursor.song_end_micros()
    }

    fn tempo_track(&self) -> &Track {
        self.tracks.last().expect("song always carries a synthetic tempo track")
    }

    fn meter_track(&self) -> &Track {
        &self.tracks[self.tracks.len() - 2]
    }

    /// The tempo in effect at `position_micros`, walking the tempo track the same way the
    /// microsecond oracle does but indexed by time instead of by pulse.
    pub fn running_tempo_micros(&self, position_micros: i64) -> u32 {
        use crate::file::{Event, MetaEvent};
        let tempo_track = self.tempo_track();
        let mut running = 500_000u32;
        for (i, event) in tempo_track.events().iter().enumerate() {
            if let Event::Meta(MetaEvent::SetTempo(t)) = event.event() {
                if tempo_track.microseconds()[i] as i64 > position_micros {
                    break;
                }
                running = t.get();
            }
        }
        running
    }

    /// The (numerator, denominator) meter in effect at `position_micros`. `(0, 0)` if the song has
    /// no declared meter at all.
    pub fn real_time_meter(&self, position_micros: i64) -> (u8, u8) {
        use crate::file::{Event, MetaEvent};
        if self.tracks.len() <= 2 {
            return (0, 0);
        }
        let meter_track = self.meter_track();
        let mut amount = 0u8;
        let mut unit = 0u8;
        if let Some(crate::file::Event::Meta(MetaEvent::TimeSignature(t))) =
            meter_track.events().first().map(|e| e.event())
        {
            amount = t.numerator();
            unit = t.denominator();
        }
        for (i, event) in meter_track.events().iter().enumerate() {
            if let Event::Meta(MetaEvent::TimeSignature(t)) = event.event() {
                if meter_track.microseconds()[i] as i64 > position_micros {
                    break;
                }
                amount = t.numerator();
                unit = t.denominator();
            }
        }
        (amount, unit)
    }

    /// The bar index and the within-bar beat index active at `time_micros`. At or past the song
    /// end this pins to the last real bar's final beat rather than running off the end of the
    /// timeline.
    pub fn bar_and_beat_id(&self, time_micros: i64) -> (i64, usize) {
        let bar_micros = self.timeline.bar_micros();
        if bar_micros.len() < 2 {
            return (-1, 0);
        }
        if time_micros >= self.cursor.song_end_micros() {
            let bar_id = bar_micros.len() as i64 - 2;
            let beat_id = self
                .timeline
                .beats_in_bar(bar_id.max(0) as usize)
                .map(|b| b.len().saturating_sub(1))
                .unwrap_or(0);
            return (bar_id, beat_id);
        }

        let mut bar_id: i64 = -1;
        for &m in bar_micros {
            if m as i64 > time_micros {
                break;
            }
            bar_id += 1;
        }
        let bar_id = bar_id.max(0);

        let mut beat_id = 0usize;
        if let Some(beats) = self.timeline.beats_in_bar(bar_id as usize) {
            for (i, b) in beats.iter().enumerate() {
                if b.start_micros as i64 > time_micros {
                    break;
                }
                beat_id = i;
            }
        }
        (bar_id, beat_id)
    }

    /// The start-of-beat microsecond position for a given bar/beat pair, clamped to the song's
    /// last beat when the bar is past the end of the timeline.
    pub fn bar_beat_start_micros(&self, bar_id: i64, beat_id: usize) -> i64 {
        if bar_id < 0 {
            return self.cursor.song_end_micros();
        }
        match self.timeline.beats_in_bar(bar_id as usize).and_then(|b| b.get(beat_id)) {
            Some(window) => window.start_micros as i64,
            None => self
                .timeline
                .beats_in_bar(self.timeline.bar_count().saturating_sub(2))
                .and_then(|b| b.last())
                .map(|b| b.end_micros as i64)
                .unwrap_or(self.cursor.song_end_micros()),
        }
    }

    pub fn update(&mut self, delta_micros: i64) -> Vec<TaggedEvent> {
        self.cursor.update(&self.tracks, delta_micros)
    }

    pub fn update_looped(&mut self, delta_micros: i64) -> Vec<TaggedEvent> {
        self.cursor.update_looped(&self.tracks, delta_micros)
    }

    /// Concatenates `others`, in order, onto this song's "drum" track and bar/beat timeline. See
    /// [`concat`] for the splicing rules.
    pub fn concat(&mut self, others: Vec<Song>) {
        concat::concat(self, others);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mthd_bytes(format: u16, track_count: u16, division: u16) -> Vec<u8> {
        let mut bytes = b"MThd".to_vec();
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&format.to_be_bytes());
        bytes.extend_from_slice(&track_count.to_be_bytes());
        bytes.extend_from_slice(&division.to_be_bytes());
        bytes
    }

    fn mtrk_bytes(events: &[u8]) -> Vec<u8> {
        let mut bytes = b"MTrk".to_vec();
        bytes.extend_from_slice(&(events.len() as u32).to_be_bytes());
        bytes.extend_from_slice(events);
        bytes
    }

    #[test]
    fn loads_minimal_type0_file() {
        let mut bytes = mthd_bytes(0, 1, 480);
        bytes.extend(mtrk_bytes(&[0x00, 0xff, 0x2f, 0x00]));
        let song = Song::read(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(song.track_count(), 3); // 1 real + meter + tempo
        assert!(song.notes().is_empty());
    }

    #[test]
    fn wrong_chunk_tag_reports_unknown_header_type() {
        let mut bytes = b"XXXX".to_vec();
        bytes.extend_from_slice(&6u32.to_be_bytes());
        let iter = ByteIter::new(std::io::Cursor::new(bytes).bytes()).unwrap();
        let err = Song::load_inner(iter).unwrap_err();
        assert!(matches!(err, crate::error::LoadError::UnknownHeaderType { .. }));
    }

    #[test]
    fn header_tag_cut_off_mid_read_reports_no_header() {
        let bytes = b"MT".to_vec();
        let iter = ByteIter::new(std::io::Cursor::new(bytes).bytes()).unwrap();
        let err = Song::load_inner(iter).unwrap_err();
        assert!(matches!(err, crate::error::LoadError::NoHeader { .. }));
    }

    #[test]
    fn rejects_type2_midi() {
        let mut bytes = mthd_bytes(2, 1, 480);
        bytes.extend(mtrk_bytes(&[0x00, 0xff, 0x2f, 0x00]));
        let result = Song::read(std::io::Cursor::new(bytes));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_type0_with_multiple_tracks() {
        let mut bytes = mthd_bytes(0, 2, 480);
        bytes.extend(mtrk_bytes(&[0x00, 0xff, 0x2f, 0x00]));
        bytes.extend(mtrk_bytes(&[0x00, 0xff, 0x2f, 0x00]));
        let result = Song::read(std::io::Cursor::new(bytes));
        assert!(result.is_err());
    }

    fn two_track_song_with_names() -> Song {
        let mut bytes = mthd_bytes(1, 2, 480);
        let bass_track = [
            0x00, 0xff, 0x03, 0x04, b'b', b'a', b's', b's', // track name "bass"
            0x00, 0xff, 0x2f, 0x00, // end of track
        ];
        let lead_track = [
            0x00, 0xff, 0x03, 0x04, b'l', b'e', b'a', b'd', // track name "lead"
            0x00, 0xff, 0x2f, 0x00, // end of track
        ];
        bytes.extend(mtrk_bytes(&bass_track));
        bytes.extend(mtrk_bytes(&lead_track));
        Song::read(std::io::Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn muting_a_track_moves_it_out_of_the_main_list() {
        let mut song = two_track_song_with_names();
        assert_eq!(song.track_count(), 4); // bass + lead + meter + tempo
        assert!(song.mute_track("bass"));
        assert_eq!(song.track_count(), 3);
        assert_eq!(song.muted_tracks().len(), 1);
        assert_eq!(song.muted_tracks()[0].name().unwrap().as_str(), "bass");
        assert!(song.tracks().iter().all(|t| t.name().map(|n| n.as_str().as_ref() != "bass").unwrap_or(true)));
        // muting the same track twice is a no-op
        assert!(!song.mute_track("bass"));
        assert_eq!(song.track_count(), 3);
    }

    #[test]
    fn muting_an_unknown_track_name_is_a_no_op() {
        let mut song = two_track_song_with_names();
        assert!(!song.mute_track("drums"));
        assert_eq!(song.track_count(), 4);
    }

    #[test]
    fn adding_a_play_track_copies_without_removing_the_original() {
        let mut song = two_track_song_with_names();
        assert!(song.add_play_track("lead"));
        assert_eq!(song.track_count(), 4);
        assert_eq!(song.play_tracks().len(), 1);
        assert_eq!(song.play_tracks()[0].name().unwrap().as_str(), "lead");
        assert!(song.tracks().iter().any(|t| t.name().map(|n| n.as_str().as_ref() == "lead").unwrap_or(false)));
        assert!(!song.add_play_track("lead"));
        assert_eq!(song.play_tracks().len(), 1);
    }

    #[test]
    fn pairs_notes_across_the_whole_song() {
        let mut bytes = mthd_bytes(1, 1, 480);
        let events = [
            0x00, 0x90, 0x3c, 0x64, // note on, channel 0, note 60, velocity 100
            0x0a, 0x80, 0x3c, 0x00, // note off after 10 ticks
            0x00, 0xff, 0x2f, 0x00, // end of track
        ];
        bytes.extend(mtrk_bytes(&events));
        let song = Song::read(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(song.notes().len(), 1);
        assert_eq!(song.notes()[0].start_pulse, 0);
        assert_eq!(song.notes()[0].end_pulse, 10);
    }
}
