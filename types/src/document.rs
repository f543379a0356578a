//! Identity document data returned by the DigiLocker provider.

use serde::{Deserialize, Serialize};

/// Verified Aadhaar details.
///
/// `placeholder` is set when the provider lookup failed after a successful
/// redirect and the flow continued with "verified, details pending". Consumers
/// must not treat placeholder fields as identity data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVerification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masked_aadhaar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub placeholder: bool,
}

impl DocumentVerification {
    /// Stand-in payload used when the provider confirmed the redirect but the
    /// detail lookup failed.
    pub fn pending_details(reference_id: Option<String>) -> Self {
        Self {
            reference_id,
            name: "Verified via DigiLocker".into(),
            masked_aadhaar: None,
            date_of_birth: None,
            gender: None,
            address: Some("Details pending".into()),
            placeholder: true,
        }
    }
}
