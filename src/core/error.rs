//! Purpose: Structured error type shared by the transfer, tree, and extraction layers.
//! Exports: `Error`, `ErrorKind`, `TransferCode`, `to_exit_code`.
//! Role: Single error currency; callers branch on `kind()` instead of message text.
//! Invariants: `ErrorKind` variants map to stable, distinct process exit codes.
//! Invariants: `TransferCode` numbers match the classic curl easy-interface codes.
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    Transfer,
    Parse,
    Schema,
    Io,
}

/// Failure class of a blocking transfer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransferCode {
    UnsupportedProtocol,
    UrlMalformat,
    CouldNotResolveHost,
    CouldNotConnect,
    HttpReturnedError,
    WriteError,
    OperationTimedOut,
    TooManyRedirects,
    RecvError,
}

impl TransferCode {
    pub fn code(self) -> u32 {
        match self {
            TransferCode::UnsupportedProtocol => 1,
            TransferCode::UrlMalformat => 3,
            TransferCode::CouldNotResolveHost => 6,
            TransferCode::CouldNotConnect => 7,
            TransferCode::HttpReturnedError => 22,
            TransferCode::WriteError => 23,
            TransferCode::OperationTimedOut => 28,
            TransferCode::TooManyRedirects => 47,
            TransferCode::RecvError => 56,
        }
    }

    /// Fixed one-line description, independent of the failing request.
    pub fn describe(self) -> &'static str {
        match self {
            TransferCode::UnsupportedProtocol => "unsupported protocol",
            TransferCode::UrlMalformat => "URL using bad/illegal format or missing URL",
            TransferCode::CouldNotResolveHost => "couldn't resolve host name",
            TransferCode::CouldNotConnect => "couldn't connect to server",
            TransferCode::HttpReturnedError => "HTTP response code said error",
            TransferCode::WriteError => "failed writing received data to disk/application",
            TransferCode::OperationTimedOut => "timeout was reached",
            TransferCode::TooManyRedirects => "number of redirects hit maximum amount",
            TransferCode::RecvError => "failure when receiving data from the peer",
        }
    }
}

impl fmt::Display for TransferCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.describe())
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    url: Option<String>,
    code: Option<TransferCode>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            url: None,
            code: None,
            source: None,
        }
    }

    /// Transfer failure carrying its code; the message defaults to the code's description.
    pub fn transfer(code: TransferCode) -> Self {
        Self::new(ErrorKind::Transfer).with_code(code)
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Schema).with_message(message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn code(&self) -> Option<TransferCode> {
        self.code
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_code(mut self, code: TransferCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        match (&self.message, self.code) {
            (Some(message), _) => write!(f, ": {message}")?,
            (None, Some(code)) => write!(f, ": {}", code.describe())?,
            (None, None) => {}
        }
        if let Some(code) = self.code {
            write!(f, " (code: {})", code.code())?;
        }
        if let Some(url) = &self.url {
            write!(f, " (url: {url})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::Transfer => 3,
        ErrorKind::Parse => 4,
        ErrorKind::Schema => 5,
        ErrorKind::Io => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, TransferCode, to_exit_code};

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::Usage, 2),
            (ErrorKind::Transfer, 3),
            (ErrorKind::Parse, 4),
            (ErrorKind::Schema, 5),
            (ErrorKind::Io, 6),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn transfer_codes_match_classic_numbers() {
        assert_eq!(TransferCode::CouldNotResolveHost.code(), 6);
        assert_eq!(TransferCode::CouldNotConnect.code(), 7);
        assert_eq!(TransferCode::WriteError.code(), 23);
        assert_eq!(TransferCode::OperationTimedOut.code(), 28);
    }

    #[test]
    fn display_falls_back_to_code_description() {
        let err = Error::transfer(TransferCode::CouldNotConnect).with_url("http://127.0.0.1:9/");
        assert_eq!(
            err.to_string(),
            "Transfer: couldn't connect to server (code: 7) (url: http://127.0.0.1:9/)"
        );
    }

    #[test]
    fn schema_constructor_sets_kind_and_message() {
        let err = Error::schema("coordinates node does not contain 2 items");
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert_eq!(
            err.message(),
            Some("coordinates node does not contain 2 items")
        );
        assert!(err.code().is_none());
    }
}
