//! Error types.

use std::fmt::{self, Formatter, Display, Debug};


pub type Result<I> = std::result::Result<I, Error>;

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    error: Box<dyn std::error::Error + Send + Sync>,
    writer_state: Option<String>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ErrorKind {
    /// Underlying IO error.
    ///
    /// This corresponds with the writer being left in a **"broken"** state
    /// that rejects further tag API calls. Teardown still runs.
    Io,

    /// A tag was opened with an attribute list that isn't made of complete
    /// name/value pairs.
    ///
    /// This corresponds with the writer being left in an **unchanged** state.
    InvalidAttributes,

    /// The user of this library performed a sequence of API calls that would
    /// produce malformed markup, such as writing a second value into an
    /// element.
    ///
    /// This corresponds with the writer being left in an **unchanged** state.
    ApiUsage,

    /// Some "other" error type. The writer will not itself produce this.
    Other,
}

impl Error {
    pub fn new<E>(
        kind: ErrorKind,
        error: E,
        writer_state: Option<&dyn Debug>,
    ) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error {
            kind,
            error: error.into(),
            writer_state: writer_state.map(|state| format!("{:?}", state)),
        }
    }

    pub fn other<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Other, error, None)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.error
    }

    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self.error
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, error, None)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match *self {
            ErrorKind::Io => "IO error",
            ErrorKind::InvalidAttributes => "invalid attributes",
            ErrorKind::ApiUsage => "API usage error",
            ErrorKind::Other => "unknown error",
        })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(&self.kind, f)?;
        f.write_str(", ")?;
        Display::fmt(&self.error, f)?;
        if let Some(ref writer_state) = self.writer_state {
            f.write_str("\nstate: ")?;
            f.write_str(writer_state)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner())
    }
}


macro_rules! error {
    ($k:ident, $writer_state:expr, $($e:tt)*)=>{
        $crate::error::Error::new(
            $crate::error::ErrorKind::$k,
            format!($($e)*),
            $writer_state,
        )
    };
}

macro_rules! bail {
    ($($e:tt)*)=>{ return Err(error!($($e)*)) };
}

macro_rules! ensure {
    ($c:expr, $($e:tt)*)=>{
        if !$c {
            bail!($($e)*);
        }
    };
}

pub(crate) use error;
pub(crate) use bail;
pub(crate) use ensure;
