use snafu::Snafu;

/// The public Error type for this library.
#[derive(Debug, Snafu)]
pub struct Error(LoadError);

/// The public Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// The internal Result type for this library.
pub(crate) type LoadResult<T> = std::result::Result<T, LoadError>;

/// The internal error type for this library. Loader failures are fatal: a partial `Song` is
/// never returned to the caller.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))]
pub(crate) enum LoadError {
    #[snafu(display("error while reading bytes: {}", source))]
    Io {
        site: String,
        source: crate::byte_iter::ByteError,
    },

    #[snafu(display("{} no filename given", site))]
    BadFilename { site: String },

    #[snafu(display("{} missing MThd header chunk", site))]
    NoHeader { site: String },

    #[snafu(display("{} unknown header chunk type {}", site, found))]
    UnknownHeaderType { site: String, found: String },

    #[snafu(display("{} header chunk length must be 6, found {}", site, found))]
    BadHeaderSize { site: String, found: u32 },

    #[snafu(display("{} type 2 (sequential) MIDI files are not supported", site))]
    Type2MidiNotSupported { site: String },

    #[snafu(display("{} type 0 MIDI file must declare exactly one track, found {}", site, found))]
    BadType0Midi { site: String, found: u16 },

    #[snafu(display("{} SMPTE timing division is not implemented", site))]
    SmtpeTimingNotImplemented { site: String },

    #[snafu(display("{} track header too short", site))]
    TrackHeaderTooShort { site: String },

    #[snafu(display("{} expected 'MTrk', found '{}'", site, found))]
    BadTrackHeaderType { site: String, found: String },

    #[snafu(display("{} declared track length exceeds available bytes", site))]
    TrackTooShort { site: String },

    /// Unresolved note-on events at end of track are tolerated, not fatal, so this variant is
    /// never constructed; it is kept for documentation of the failure space this loader chose
    /// not to raise.
    #[snafu(display("{} unresolved note-on events at end of track", site))]
    #[allow(dead_code)]
    UnresolvedNoteEvents { site: String },

    #[snafu(display("{}: {}", site, description))]
    InvalidFile { site: String, description: String },
}

macro_rules! site {
    () => {
        format!("{}:{}", file!(), line!())
    };
}

macro_rules! io {
    () => {
        crate::error::Io { site: site!() }
    };
}

macro_rules! invalid_file_s {
    () => {
        crate::error::InvalidFile {
            site: site!(),
            description: "[no description]",
        }
    };
    ($msg:expr) => {
        crate::error::InvalidFile {
            site: site!(),
            description: $msg,
        }
    };
    ($fmt:expr, $($arg:expr),+) => {
        crate::error::InvalidFile {
            site: site!(),
            description: format!($fmt, $($arg),+),
        }
    };
}

macro_rules! invalid_file_e {
    () => {
        invalid_file_s!().build()
    };
    ($msg:expr) => {
        invalid_file_s!($msg).build()
    };
    ($fmt:expr, $($arg:expr),+) => {
        invalid_file_s!($fmt, $($arg),+).build()
    };
}

macro_rules! invalid_file_r {
    () => {
        Err(invalid_file_e!())
    };
    ($msg:expr) => {
        Err(invalid_file_e!($msg))
    };
    ($fmt:expr, $($arg:expr),+) => {
        Err(invalid_file_e!($fmt, $($arg),+))
    };
}

macro_rules! invalid_file {
    () => {
        return invalid_file_r!();
    };
    ($msg:expr) => {
        return invalid_file_r!($msg)
    };
    ($fmt:expr, $($arg:expr),+) => {
        return invalid_file_r!($fmt, $($arg),+)
    };
}

#[test]
fn site_test() {
    let line = line!() + 1;
    let site = site!();
    assert!(site.contains("error.rs"));
    assert!(site.contains(format!("{}", line).as_str()));
}

#[test]
fn invalid_file_macros_test_message() {
    fn foo() -> LoadResult<u64> {
        let flerbin = String::from("flerbin");
        invalid_file!(flerbin);
    }
    let result = foo();
    assert!(result.is_err());
    let message = format!("{}", result.err().unwrap());
    assert!(message.as_str().contains("flerbin"));
}

#[test]
fn invalid_file_macros_test_fmt() {
    fn foo() -> LoadResult<u64> {
        invalid_file!("hello {}, {}", "world", String::from("foo"));
    }
    let result = foo();
    assert!(result.is_err());
    let message = format!("{}", result.err().unwrap());
    assert!(message.as_str().contains("hello world, foo"));
}
