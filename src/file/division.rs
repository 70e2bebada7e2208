use crate::error::LoadResult;

clamp!(
    /// Pulses-per-quarter-note: the song-wide tick resolution derived from the file header's
    /// division field when it uses the metrical-time format. A positive 15-bit value, so the
    /// range is 1 to 16383.
    PulsesPerQuarterNote,
    u16,
    1,
    16383,
    1024,
    pub
);

const DIVISION_TYPE_BIT: u16 = 0b1000_0000_0000_0000;

/// The header's division field: either a tick count per quarter note, or an SMPTE-based frame
/// resolution. SMPTE division is a recognized bit pattern but is not implemented: loading a file
/// that uses it fails with `SmtpeTimingNotImplemented` rather than silently misinterpreting the
/// timing.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub enum Division {
    QuarterNote(PulsesPerQuarterNote),
}

impl Default for Division {
    fn default() -> Self {
        Division::QuarterNote(PulsesPerQuarterNote::default())
    }
}

impl Division {
    pub(crate) fn from_u16(value: u16) -> LoadResult<Self> {
        if value & DIVISION_TYPE_BIT == DIVISION_TYPE_BIT {
            return Err(crate::error::SmtpeTimingNotImplemented { site: site!() }.build());
        }
        Ok(Division::QuarterNote(PulsesPerQuarterNote::new(value)))
    }

    pub fn pulses_per_quarter_note(&self) -> u16 {
        match self {
            Division::QuarterNote(p) => p.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_smpte_division() {
        let value = DIVISION_TYPE_BIT | 0x1928;
        assert!(Division::from_u16(value).is_err());
    }

    #[test]
    fn parses_quarter_note_division() {
        let div = Division::from_u16(480).unwrap();
        assert_eq!(div.pulses_per_quarter_note(), 480);
    }
}
