//! Setup and reconfiguration flows.
//!
//! Both flows are step functions the host calls with `None` to get the first
//! form and with the submitted values afterwards. Every call returns a
//! [`FlowResult`] telling the host what to do next.

pub mod details;
pub mod form;
pub mod options;
pub mod setup;

pub use details::{DetailsInput, DetailsStep};
pub use form::{FormErrors, FormField, FormSchema, Selector};
pub use options::OptionsFlow;
pub use setup::SetupFlow;

use crate::entry::StoreError;
use crate::fingerprint::EndpointError;
use crate::options::FormData;
use thiserror::Error;

pub const STEP_USER: &str = "user";
pub const STEP_DETAILS: &str = "details";
pub const STEP_INIT: &str = "init";

pub const ABORT_ALREADY_CONFIGURED: &str = "already_configured";
pub const ABORT_UNKNOWN_ERROR: &str = "unknown_error";

pub const ERROR_PERSONA_REQUIRED: &str = "persona_required";

#[derive(Debug, Clone, PartialEq)]
pub enum FlowResult {
    ShowForm {
        step_id: &'static str,
        schema: FormSchema,
        errors: FormErrors,
    },
    CreateEntry {
        title: String,
        data: FormData,
    },
    Abort {
        reason: String,
    },
}

impl FlowResult {
    pub fn show_form(step_id: &'static str, schema: FormSchema) -> Self {
        Self::ShowForm {
            step_id,
            schema,
            errors: FormErrors::new(),
        }
    }

    pub fn abort(reason: impl Into<String>) -> Self {
        Self::Abort {
            reason: reason.into(),
        }
    }

    pub fn step_id(&self) -> Option<&'static str> {
        match self {
            Self::ShowForm { step_id, .. } => Some(*step_id),
            _ => None,
        }
    }
}

/// Failures inside a step. These never reach the host; the step logs them
/// and aborts with `unknown_error`.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("details step reached before the endpoint step")]
    MissingEndpoint,
    #[error("stored endpoint is unusable: {0}")]
    Endpoint(#[from] EndpointError),
    #[error("entry registry failed: {0}")]
    Store(#[from] StoreError),
}
