use crate::error::LoadResult;
use crate::file::Division;

#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct Header {
    format: Format,
    division: Division,
}

impl Header {
    pub(crate) fn new(format: Format, division: Division) -> Self {
        Self { format, division }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn division(&self) -> &Division {
        &self.division
    }
}

/// The MThd format field. Type 2 (`Sequential`) files parse the header successfully but are
/// rejected immediately after, at the point where the caller asks for more than one track.
#[repr(u16)]
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Hash, Default)]
pub enum Format {
    /// The file contains a single multi-channel track.
    Single = 0,
    /// The file contains one or more simultaneous tracks of a sequence.
    #[default]
    Multi = 1,
    /// The file contains one or more sequentially independent single-track patterns.
    Sequential = 2,
}

impl Format {
    pub(crate) fn from_u16(value: u16) -> LoadResult<Self> {
        match value {
            0 => Ok(Format::Single),
            1 => Ok(Format::Multi),
            2 => Ok(Format::Sequential),
            other => invalid_file!("unrecognized header format {}", other),
        }
    }
}
