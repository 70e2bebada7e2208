use rhythm_engine::song::Song;
use std::io::Cursor;

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

fn text_meta(text: &str) -> Vec<u8> {
    let mut out = vec![0xff, 0x01, text.len() as u8];
    out.extend_from_slice(text.as_bytes());
    out
}

#[test]
fn loads_from_a_real_file_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minimal.mid");
    let mut bytes = mthd_bytes(0, 1, 480);
    bytes.extend(mtrk_bytes(&[0x00, 0xff, 0x2f, 0x00]));
    std::fs::write(&path, &bytes).unwrap();

    let song = Song::load(&path).unwrap();
    assert_eq!(song.track_count(), 3);
}

#[test]
fn normalizes_tempo_and_meter_into_trailing_tracks() {
    let mut bytes = mthd_bytes(1, 1, 480);
    let mut events = vec![0x00, 0xff, 0x58, 0x04, 0x03, 0x02, 0x18, 0x08]; // 3/4 at t=0
    events.extend(&[0x00, 0xff, 0x51, 0x03, 0x07, 0xa1, 0x20]); // tempo 500_000 at t=0
    events.extend(&[0x0a, 0x90, 0x3c, 0x64]); // note on after 10 ticks
    events.extend(&[0x0a, 0x80, 0x3c, 0x00]); // note off
    events.extend(&[0x00, 0xff, 0x2f, 0x00]);
    bytes.extend(mtrk_bytes(&events));

    let song = Song::read(Cursor::new(bytes)).unwrap();
    assert_eq!(song.track_count(), 3);
    assert_eq!(song.notes().len(), 1);
    assert_eq!(song.real_time_meter(0), (3, 4));
    assert_eq!(song.running_tempo_micros(0), 500_000);
}

#[test]
fn extracts_packed_private_metadata() {
    let mut bytes = mthd_bytes(1, 1, 480);
    let mut events = text_meta("Speed*120_Level*Rock_Style*5");
    events.extend(&[0x00, 0xff, 0x2f, 0x00]);
    bytes.extend(mtrk_bytes(&events));

    let song = Song::read(Cursor::new(bytes)).unwrap();
    let info = song.private_info().expect("private metadata should be found");
    assert_eq!(info.tempo, "120");
    assert_eq!(info.style, "Rock");
    assert_eq!(info.difficulty, "5");
}

#[test]
fn rejects_truncated_track_chunk() {
    let mut bytes = mthd_bytes(0, 1, 480);
    let mut track = b"MTrk".to_vec();
    track.extend_from_slice(&100u32.to_be_bytes()); // claims 100 bytes, provides far fewer
    track.extend_from_slice(&[0x00, 0xff, 0x2f, 0x00]);
    bytes.extend(track);

    assert!(Song::read(Cursor::new(bytes)).is_err());
}

#[test]
fn playback_emits_notes_in_order_and_replays_control_state_on_seek() {
    let mut bytes = mthd_bytes(1, 1, 480);
    let events = [
        0x00, 0xb0, 0x07, 0x64, // control change: volume 100, channel 0
        0x00, 0x90, 0x3c, 0x64, // note on at t=0
        0x3c, 0x80, 0x3c, 0x00, // note off at t=60
        0x00, 0xff, 0x2f, 0x00,
    ];
    bytes.extend(mtrk_bytes(&events));
    let mut song = Song::read(Cursor::new(bytes)).unwrap();
    song.reset(0, 0);

    let tempo = song.initial_tempo_micros() as i64;
    let ticks_per_quarter = 480i64;
    let note_on_micros = 10 * tempo / ticks_per_quarter;

    let emitted = song.update(note_on_micros);
    assert!(emitted.iter().any(|e| matches!(
        e.event.event(),
        rhythm_engine::file::Event::Midi(rhythm_engine::core::ChannelMessage::Control(_))
    )));
    assert!(emitted.iter().any(|e| matches!(
        e.event.event(),
        rhythm_engine::file::Event::Midi(rhythm_engine::core::ChannelMessage::NoteOn(_))
    )));

    // seeking back to the start should replay the control-change but not re-fire the note-on
    let replayed = song.set_play_start(0);
    assert!(replayed.iter().any(|e| matches!(
        e.event.event(),
        rhythm_engine::file::Event::Midi(rhythm_engine::core::ChannelMessage::Control(_))
    )));
    assert!(!replayed.iter().any(|e| matches!(
        e.event.event(),
        rhythm_engine::file::Event::Midi(rhythm_engine::core::ChannelMessage::NoteOn(_))
    )));
}
