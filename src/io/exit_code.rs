//! Process exit codes shared by the CLI and the status-line widgets.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    BlockingError = 2,
    NotFound = 3,
    ParseError = 4,
    IoError = 5,
    ConfigError = 6,
    IndexCorrupted = 7,
    UnsupportedOperation = 8,
}

impl ExitCode {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::GeneralError => "general error",
            Self::BlockingError => "blocking error",
            Self::NotFound => "not found",
            Self::ParseError => "parse error",
            Self::IoError => "I/O error",
            Self::ConfigError => "configuration error",
            Self::IndexCorrupted => "index corrupted",
            Self::UnsupportedOperation => "unsupported operation",
        }
    }
}
