use crate::file::{Event, MetaEvent, Track, TrackEvent};
use std::collections::BTreeMap;

/// Strips every event matching `matches` out of every track and replays them, in pulse order, as
/// a brand-new synthetic track. Duplicate events at the same absolute pulse collapse to whichever
/// was inserted last, matching the behavior of a `BTreeMap` keyed by pulse. A removed event
/// donates its own delta-time to the event that follows it so every other event's absolute pulse
/// position is unaffected.
fn extract<F>(tracks: &mut [Track], matches: F) -> Track
where
    F: Fn(&Event) -> bool,
{
    let mut by_pulse: BTreeMap<u64, TrackEvent> = BTreeMap::new();

    for track in tracks.iter_mut() {
        let events = track.events().to_vec();
        let pulses = track.pulses().to_vec();
        let mut kept_events = Vec::with_capacity(events.len());
        let mut kept_pulses = Vec::with_capacity(pulses.len());
        let mut carry_delta: u32 = 0;

        for (i, event) in events.into_iter().enumerate() {
            if matches(event.event()) {
                carry_delta += event.delta_time();
                by_pulse.insert(pulses[i], event);
                continue;
            }
            let delta_time = event.delta_time() + carry_delta;
            carry_delta = 0;
            kept_events.push(event.with_delta_time(delta_time));
            kept_pulses.push(pulses[i]);
        }

        *track = Track::from_parts(kept_events, kept_pulses);
    }

    let mut synthetic_events = Vec::with_capacity(by_pulse.len());
    let mut synthetic_pulses = Vec::with_capacity(by_pulse.len());
    let mut previous_pulse = 0u64;
    for (pulse, event) in by_pulse {
        let delta = (pulse - previous_pulse) as u32;
        synthetic_events.push(event.with_delta_time(delta));
        synthetic_pulses.push(pulse);
        previous_pulse = pulse;
    }
    Track::from_parts(synthetic_events, synthetic_pulses)
}

/// Runs the two normalization passes (time-signature then tempo) and appends the resulting
/// synthetic tracks. After this call no original track contains a time-signature or tempo event.
pub(crate) fn normalize(tracks: &mut Vec<Track>) {
    let meter_track = extract(tracks, |e| matches!(e, Event::Meta(MetaEvent::TimeSignature(_))));
    let tempo_track = extract(tracks, |e| matches!(e, Event::Meta(MetaEvent::SetTempo(_))));
    tracks.push(meter_track);
    tracks.push(tempo_track);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MicrosecondsPerQuarter;

    #[test]
    fn extracts_tempo_events_into_trailing_track() {
        let track = Track::from_parts(
            vec![
                TrackEvent::new(
                    0,
                    Event::Meta(MetaEvent::SetTempo(MicrosecondsPerQuarter::new(500_000))),
                ),
                TrackEvent::new(10, Event::Meta(MetaEvent::TrackName(Default::default()))),
            ],
            vec![0, 10],
        );
        let mut tracks = vec![track];
        normalize(&mut tracks);
        assert_eq!(tracks.len(), 3);
        let tempo_track = tracks.last().unwrap();
        assert_eq!(tempo_track.len(), 1);
        let original = &tracks[0];
        assert_eq!(original.len(), 1);
        assert_eq!(original.pulses(), &[10]);
        assert!(matches!(
            original.events()[0].event(),
            Event::Meta(MetaEvent::TrackName(_))
        ));
    }

    #[test]
    fn duplicate_tempo_at_same_pulse_keeps_last() {
        let track_a = Track::from_parts(
            vec![TrackEvent::new(
                5,
                Event::Meta(MetaEvent::SetTempo(MicrosecondsPerQuarter::new(400_000))),
            )],
            vec![5],
        );
        let track_b = Track::from_parts(
            vec![TrackEvent::new(
                5,
                Event::Meta(MetaEvent::SetTempo(MicrosecondsPerQuarter::new(600_000))),
            )],
            vec![5],
        );
        let mut tracks = vec![track_a, track_b];
        normalize(&mut tracks);
        let tempo_track = tracks.last().unwrap();
        assert_eq!(tempo_track.len(), 1);
        match tempo_track.events()[0].event() {
            Event::Meta(MetaEvent::SetTempo(t)) => assert_eq!(t.get(), 600_000),
            other => panic!("expected SetTempo, got {:?}", other),
        }
    }
}
