//! DigiLocker redirect handoff.
//!
//! The applicant leaves for the provider and comes back through a single
//! completion endpoint that may be on a different origin from where the
//! flow started. Everything needed to finish is carried in the completion
//! URL itself, with a persisted same-origin context as fallback. Stored state
//! is keyed by a per-handoff [`HandoffId`], never globally.

pub mod cache;
pub mod completion;
pub mod context;
pub mod countdown;
pub mod error;
pub mod id;
pub mod resolve;
pub mod storage;

pub use cache::{MemoryViewCache, ViewCache};
pub use completion::{
    application_detail_path, take_verified_data, CompletionOutcome, HandoffCompletion,
    InternalCompletion, PublicRedirect,
};
pub use context::{
    CompletionParams, FlowMarker, HandoffContext, HandoffStart, ProviderStatus, PARAM_HANDOFF_ID,
};
pub use countdown::AutoAdvance;
pub use error::HandoffError;
pub use id::HandoffId;
pub use resolve::{
    landing_handoff_id, outbound_url, resolve, CompletionPlan, ReturnSource, FAILURE_FLAG,
    LANDING_HANDOFF_PARAM, SUCCESS_FLAG,
};
pub use storage::{
    context_key, load_json, store_json, verified_data_key, FileStorage, RecoverableStorage,
    HANDOFF_CONTEXT_KEY, VERIFIED_DATA_KEY,
};
