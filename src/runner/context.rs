use serde_json::Value;

use crate::utils::config::HarnessConfig;

/// Run context for one suite: the seed fixtures plus everything captured
/// from earlier responses. Dependent steps read these fields and fail fast
/// when a prerequisite step did not deliver.
pub struct RunContext {
    /// Fixtures and target server for this run
    pub config: HarnessConfig,

    /// Bearer token from the priest login or registration
    pub priest_token: Option<String>,

    /// Bearer token from the faithful login or registration
    pub faithful_token: Option<String>,

    /// Bearer token from the bishop login
    pub bishop_token: Option<String>,

    /// User record returned with the priest token
    pub priest_user: Option<Value>,

    /// User record returned with the faithful token
    pub faithful_user: Option<Value>,

    /// Priest application awaiting bishop approval
    pub pending_priest: Option<Value>,

    /// Credentials issued during the run, for login-after-register steps
    pub registered_priest: Option<(String, String)>,
    pub registered_faithful: Option<(String, String)>,

    /// Ids of resources created during the run
    pub slot_id: Option<String>,
    pub band_id: Option<String>,
    pub confession_id: Option<String>,
    pub booking_id: Option<String>,
    pub booking_ids: Vec<String>,

    /// Collections captured from list endpoints
    pub existing_bands: Vec<Value>,
    pub existing_confessions: Vec<Value>,
}

impl RunContext {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            priest_token: None,
            faithful_token: None,
            bishop_token: None,
            priest_user: None,
            faithful_user: None,
            pending_priest: None,
            registered_priest: None,
            registered_faithful: None,
            slot_id: None,
            band_id: None,
            confession_id: None,
            booking_id: None,
            booking_ids: Vec::new(),
            existing_bands: Vec::new(),
            existing_confessions: Vec::new(),
        }
    }
}
