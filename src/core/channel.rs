clamp!(
    /// A MIDI channel number. Valid range is 0 to 15 (displayed by most sequencers as 1 to 16).
    Channel,
    u8,
    0,
    15,
    0,
    pub
);

impl Channel {
    /// The instrument-discovery pass (see [`crate::song::note`]) treats both channel 9 and
    /// channel 15 as percussion. This is non-standard (only channel 9 is percussion by the
    /// General MIDI convention) but matches observed behavior in real-world sequencer output and
    /// is preserved deliberately. [`crate::song::Song::is_percussion`] is a *separate*, narrower
    /// check used elsewhere that only recognizes channel 9 — the two are intentionally
    /// inconsistent, not a bug to unify.
    pub(crate) fn is_percussion_channel(self) -> bool {
        let c = self.get();
        c == 9 || c == 15
    }
}
