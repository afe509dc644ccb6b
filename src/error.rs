/// Failure classes surfaced to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Config,
    CredentialNotFound,
    NetworkFailure,
    ResponseParseFailure,
    TypeCoercionFailure,
    FileLoadFailure,
    FileWriteFailure,
    EmptyResultSet,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::InvalidInput
            | ErrorKind::Config
            | ErrorKind::CredentialNotFound
            | ErrorKind::FileWriteFailure => 2,
            ErrorKind::TypeCoercionFailure | ErrorKind::FileLoadFailure | ErrorKind::EmptyResultSet => 3,
            ErrorKind::NetworkFailure | ErrorKind::ResponseParseFailure => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
