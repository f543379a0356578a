//! The applicant self-service wizard.
//!
//! Ties the passcode sessions, device capture and DigiLocker handoff
//! together behind a [`StepController`], with a [`DraftApplicationService`]
//! providing the provisional record the video attaches to and a
//! [`SubmissionFinalizer`] performing the single atomic submit.

pub mod controller;
pub mod draft;
pub mod error;
pub mod finalizer;
pub mod session;

pub use controller::{FlowDeps, Step, StepController};
pub use draft::DraftApplicationService;
pub use error::{Requirement, WizardError};
pub use finalizer::{Preconditions, SubmissionFinalizer};
pub use session::{SessionStore, WizardSession, WIZARD_SESSION_KEY};
