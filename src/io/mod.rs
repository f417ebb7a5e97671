//! Output formatting shared by the CLI and HTTP surface.
//!
//! Every command renders its result through [`envelope::Envelope`] so JSON
//! output stays consistent across `index`, `search`, and future commands.

pub mod envelope;
pub mod exit_code;
pub mod status_line;

pub use envelope::{
    EntityType as EnvelopeEntityType, Envelope, ErrorDetails as EnvelopeErrorDetails, MessageType,
    Meta, ResultCode, SCHEMA_VERSION, Status,
};
pub use exit_code::ExitCode;
pub use status_line::{
    DualProgressBar, ProgressBar, ProgressBarOptions, ProgressBarStyle, Spinner, SpinnerOptions,
};
