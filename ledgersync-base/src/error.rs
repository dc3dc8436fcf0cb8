// We want a few things here:
// 1. A way to create a new error with a backtrace
// 2. A way to centralize setting a breakpoint to trap any error in the system fairly soon
//    after it's created (or at least when it's propagated from a library we use back to us)
// 3. Same but for logging / emitting error messages into the tracing/logging system
// 4. A kind tag naming which protocol failure mode this is, since the acquisition
//    state machine itself reports these as plain bools and only logs the detail here

use std::borrow::Cow;
use std::fmt;
use backtrace_error::DynBacktraceError;
use tracing::error;

#[cfg(test)]
use test_log::test;

/// One of the named failure modes the acquisition protocol distinguishes,
/// carried only for the log record. The public acquisition/registry API
/// still reports these as `bool`, never as this type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    BadPayload,
    HashMismatch,
    InvalidSubtree,
    InsertionRejected,
    NoPeers,
    TimerAborted,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::BadPayload => "bad payload",
            ErrorKind::HashMismatch => "hash mismatch",
            ErrorKind::InvalidSubtree => "invalid subtree",
            ErrorKind::InsertionRejected => "insertion rejected",
            ErrorKind::NoPeers => "no peers",
            ErrorKind::TimerAborted => "timer aborted",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
#[allow(dead_code)]
pub struct Error {
    kind: ErrorKind,
    source: DynBacktraceError,
}
pub type Result<T> = std::result::Result<T, Error>;

struct SimpleErr(Cow<'static, str>);
impl fmt::Debug for SimpleErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl fmt::Display for SimpleErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SimpleErr {
    fn description(&self) -> &str {
        &self.0
    }
}

impl Error {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(kind: ErrorKind, source: E) -> Error {
        error!(target: "ledgersync", kind = %kind, "{:?}", source);
        Error {
            kind,
            source: DynBacktraceError::from(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub fn err(kind: ErrorKind, msg: impl Into<Cow<'static, str>>) -> Error {
    Error::new(kind, SimpleErr(msg.into()))
}

#[test]
fn test_error() {
    let err = err(ErrorKind::BadPayload, "test error");
    assert_eq!(err.kind(), ErrorKind::BadPayload);
}
