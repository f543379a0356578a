//! Fundamental types for the applicant verification flow.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! contact identifiers, passcode tokens, timestamps, application records,
//! location fixes, video artifacts, and flow parameters.

pub mod application;
pub mod document;
pub mod error;
pub mod identifier;
pub mod location;
pub mod params;
pub mod time;
pub mod video;

pub use application::{
    ApplicantCoreFields, ApplicationDraft, ApplicationReference, ConsentSet, DraftId, DraftStatus,
    SubmissionPayload,
};
pub use document::DocumentVerification;
pub use error::ValidationError;
pub use identifier::{EmailAddress, Identifier, IdentifierKind, OtpCode, PhoneNumber, SessionToken};
pub use location::GeolocationFix;
pub use params::FlowParams;
pub use time::{Clock, SystemClock, Timestamp};
pub use video::{UploadStatus, VideoArtifact, VIDEO_MIME_TYPE};
