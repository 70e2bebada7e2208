use crate::byte_iter::ByteIter;
use crate::error::LoadResult;
use crate::file::TrackEvent;
use log::{debug, trace};
use snafu::ResultExt;
use std::io::Read;

/// A parsed `MTrk` chunk: an ordered sequence of events paired element-for-element with their
/// cumulative pulse offset. The cumulative-microsecond parallel sequence does not exist yet at
/// parse time — it is filled in once the whole song's tempo track is known — so it starts out
/// empty and is populated by the timeline builder.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Track {
    events: Vec<TrackEvent>,
    pulses: Vec<u64>,
    microseconds: Vec<u64>,
}

impl Track {
    pub(crate) fn from_parts(events: Vec<TrackEvent>, pulses: Vec<u64>) -> Self {
        debug_assert_eq!(events.len(), pulses.len());
        Self {
            events,
            pulses,
            microseconds: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> &[TrackEvent] {
        &self.events
    }

    /// The cumulative pulse offset of event `i`, counted from the start of the track.
    pub fn pulses(&self) -> &[u64] {
        &self.pulses
    }

    /// The cumulative microsecond offset of event `i`. Empty until
    /// [`crate::song::timeline::assign_microseconds`] has run.
    pub fn microseconds(&self) -> &[u64] {
        &self.microseconds
    }

    pub(crate) fn set_microseconds(&mut self, microseconds: Vec<u64>) {
        debug_assert_eq!(microseconds.len(), self.events.len());
        self.microseconds = microseconds;
    }

    /// The name carried by this track's `TrackName` meta-event, if any.
    pub fn name(&self) -> Option<&crate::text::Text> {
        use crate::file::{Event, MetaEvent};
        self.events.iter().find_map(|e| match e.event() {
            Event::Meta(MetaEvent::TrackName(text)) => Some(text),
            _ => None,
        })
    }

    pub(crate) fn parse<R: Read>(iter: &mut ByteIter<R>) -> LoadResult<Self> {
        use crate::byte_iter::ByteError;
        use crate::error::{BadTrackHeaderType, TrackHeaderTooShort, TrackTooShort};

        let tag_result = iter.expect_tag("MTrk");
        if let Err(e) = &tag_result {
            match e {
                ByteError::Tag { found, .. } => {
                    return BadTrackHeaderType { site: site!(), found: found.clone() }.fail();
                }
                ByteError::End { .. } => {
                    return TrackHeaderTooShort { site: site!() }.fail();
                }
                _ => {}
            }
        }
        tag_result.context(io!())?;

        let length_result = iter.read_u32();
        if let Err(ByteError::End { .. }) = &length_result {
            return TrackHeaderTooShort { site: site!() }.fail();
        }
        let chunk_length = length_result.context(io!())?;
        iter.set_size_limit(chunk_length as u64);
        let mut events = Vec::new();
        let mut pulses = Vec::new();
        let mut running_pulses: u64 = 0;
        let mut running_status: Option<u8> = None;
        loop {
            if iter.is_end() {
                invalid_file!("end of track bytes reached before EndOfTrack event");
            }
            let event = match TrackEvent::parse(iter, &mut running_status) {
                Ok(event) => event,
                Err(e) => {
                    if iter.current().is_none() {
                        return TrackTooShort { site: site!() }.fail();
                    }
                    return Err(e);
                }
            };
            trace!("parsed {:?}", event);
            running_pulses += event.delta_time() as u64;
            let is_track_end = event.is_end();
            pulses.push(running_pulses);
            events.push(event);
            if is_track_end {
                debug!("end of track event, {} events, {} pulses", events.len(), running_pulses);
                if !iter.is_end() {
                    invalid_file!("EndOfTrack event before end of track bytes");
                }
                break;
            }
        }
        iter.clear_size_limit();
        Ok(Self::from_parts(events, pulses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn mtrk_bytes(body: &[u8]) -> Vec<u8> {
        let mut out = b"MTrk".to_vec();
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn parses_cumulative_pulses() {
        let body = [
            0x00, 0x90, 60, 100, // delta 0, note on
            0x10, 60, 0, // delta 16, note off (running status)
            0x00, 0xff, 0x2f, 0x00, // delta 0, end of track
        ];
        let bytes = mtrk_bytes(&body);
        let mut iter = ByteIter::new(Cursor::new(bytes).bytes()).unwrap();
        let track = Track::parse(&mut iter).unwrap();
        assert_eq!(track.len(), 3);
        assert_eq!(track.pulses(), &[0, 16, 16]);
    }

    #[test]
    fn rejects_truncated_track() {
        let body = [0x00, 0x90, 60, 100];
        let bytes = mtrk_bytes(&body);
        let mut iter = ByteIter::new(Cursor::new(bytes).bytes()).unwrap();
        assert!(Track::parse(&mut iter).is_err());
    }

    #[test]
    fn wrong_chunk_tag_reports_bad_track_header_type() {
        let mut bytes = b"XXXX".to_vec();
        bytes.extend_from_slice(&0u32.to_be_bytes());
        let mut iter = ByteIter::new(Cursor::new(bytes).bytes()).unwrap();
        let err = Track::parse(&mut iter).unwrap_err();
        assert!(matches!(err, crate::error::LoadError::BadTrackHeaderType { .. }));
    }

    #[test]
    fn chunk_tag_cut_off_mid_read_reports_track_header_too_short() {
        let bytes = b"MT".to_vec();
        let mut iter = ByteIter::new(Cursor::new(bytes).bytes()).unwrap();
        let err = Track::parse(&mut iter).unwrap_err();
        assert!(matches!(err, crate::error::LoadError::TrackHeaderTooShort { .. }));
    }

    #[test]
    fn declared_length_exceeding_available_bytes_reports_track_too_short() {
        // declares a 100-byte body but the stream runs out mid-event (note-on missing its
        // velocity byte).
        let mut bytes = b"MTrk".to_vec();
        bytes.extend_from_slice(&100u32.to_be_bytes());
        bytes.extend_from_slice(&[0x00, 0x90, 60]);
        let mut iter = ByteIter::new(Cursor::new(bytes).bytes()).unwrap();
        let err = Track::parse(&mut iter).unwrap_err();
        assert!(matches!(err, crate::error::LoadError::TrackTooShort { .. }));
    }
}
