use crate::file::{Event, MetaEvent, Track};

const FIELD_TAG_LEN: usize = 6; // "Speed*", "Level*", "Style*" are all this long

/// Free-text difficulty/style/tempo metadata that some files pack into a single text meta-event on
/// the first track, ahead of any notes. Not a standard MIDI concept — this is a convention observed
/// in the files this engine targets, not something the format itself defines.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PrivateInfo {
    pub tempo: String,
    pub difficulty: String,
    pub style: String,
}

/// Scans the first track's text meta-events for one whose first line carries all three of
/// `Speed*`, `Level*`, and `Style*`. The three values are packed back-to-front, each preceded by
/// its own 6-byte tag and separated by underscores: `Speed*<tempo>_Level*<style>_Style*<difficulty>`
/// — note that the last tag in the string maps to `difficulty`, not `style`, and the middle tag
/// maps to `style`, not the value it visually follows. This mapping looks backwards but is
/// preserved exactly as found in the files that use this convention.
pub(crate) fn translate_private_info(tracks: &[Track]) -> Option<PrivateInfo> {
    let track = tracks.first()?;
    for track_event in track.events() {
        let text = match track_event.event() {
            Event::Meta(MetaEvent::OtherText(text)) => text,
            _ => continue,
        };
        let line = text.first_line();
        if !(line.contains("Speed*") && line.contains("Level*") && line.contains("Style*")) {
            continue;
        }

        let mut remaining = line.into_owned();

        let difficulty = match remaining.rfind('_') {
            Some(pos) => {
                let value = remaining[pos + 1 + FIELD_TAG_LEN..].to_string();
                remaining.truncate(pos);
                value
            }
            None => String::new(),
        };

        let style = match remaining.rfind('_') {
            Some(pos) => {
                let value = remaining[pos + 1 + FIELD_TAG_LEN..].to_string();
                remaining.truncate(pos);
                value
            }
            None => String::new(),
        };

        let tempo = remaining.get(FIELD_TAG_LEN..).unwrap_or("").to_string();

        return Some(PrivateInfo { tempo, difficulty, style });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::TrackEvent;
    use crate::text::Text;

    #[test]
    fn extracts_packed_fields() {
        let track = Track::from_parts(
            vec![TrackEvent::new(
                0,
                Event::Meta(MetaEvent::OtherText(Text::new(
                    "Speed*140_Level*rock_Style*3",
                ))),
            )],
            vec![0],
        );
        let info = translate_private_info(&[track]).unwrap();
        assert_eq!(info.tempo, "140");
        assert_eq!(info.style, "rock");
        assert_eq!(info.difficulty, "3");
    }

    #[test]
    fn returns_none_without_all_three_tags() {
        let track = Track::from_parts(
            vec![TrackEvent::new(
                0,
                Event::Meta(MetaEvent::OtherText(Text::new("Speed*140"))),
            )],
            vec![0],
        );
        assert!(translate_private_info(&[track]).is_none());
    }

    #[test]
    fn no_tracks_yields_none() {
        assert!(translate_private_info(&[]).is_none());
    }
}
