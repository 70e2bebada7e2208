use rhythm_engine::metronome::{BeatStatus, Metronome, MetronomeLight};
use rhythm_engine::song::Song;
use std::io::Cursor;

#[test]
fn fixed_metronome_cycles_strong_then_weak_beats() {
    let mut m = Metronome::init_fixed(3, 4, 120, 0);
    let first = m.update_free(1, true);
    assert!(!first.is_empty());

    // one bar at 120 bpm in 3/4: each quarter-note beat is 500_000 micros.
    let second = m.update_free(500_000, true);
    let third = m.update_free(500_000, true);
    let fourth = m.update_free(500_000, true);

    assert!(!second.is_empty());
    assert!(!third.is_empty());
    assert!(!fourth.is_empty());
}

#[test]
fn pausing_and_resuming_resets_the_beat_cycle() {
    let mut m = Metronome::init_fixed(4, 4, 120, 0);
    m.update_free(1, true);
    let paused = m.update_free(1, false);
    assert!(!paused.is_empty()); // the close events

    let resumed = m.update_free(1, true);
    assert!(!resumed.is_empty()); // first beat after resume is always strong
}

#[test]
fn metronome_tracks_a_loaded_songs_meter() {
    let mut bytes = b"MThd".to_vec();
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&480u16.to_be_bytes());

    let events: Vec<u8> = vec![
        0x00, 0xff, 0x58, 0x04, 0x04, 0x02, 0x18, 0x08, // 4/4
        0x00, 0xff, 0x51, 0x03, 0x07, 0xa1, 0x20, // tempo 500_000
        0x00, 0xff, 0x2f, 0x00,
    ];
    let mut track = b"MTrk".to_vec();
    track.extend_from_slice(&(events.len() as u32).to_be_bytes());
    track.extend_from_slice(&events);
    bytes.extend(track);

    let song = Song::read(Cursor::new(bytes)).unwrap();
    assert_eq!(song.real_time_meter(0), (4, 4));

    let mut metronome = Metronome::init_with_song(&song, 0);
    let events = metronome.update(1, &song, true, false, false);
    assert_eq!(metronome.light(), MetronomeLight::Red); // first tick is always the downbeat
    assert!(!events.is_empty());
}

#[test]
fn beat_status_distinguishes_strong_from_weak() {
    assert_ne!(BeatStatus::Strong, BeatStatus::Weak);
}
