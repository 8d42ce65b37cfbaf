use super::details::{DetailsOutcome, DetailsStep};
use super::form::FormErrors;
use super::{FlowError, FlowResult, ABORT_UNKNOWN_ERROR, STEP_INIT};
use crate::discovery::Discoverer;
use crate::entry::ConfigEntry;
use crate::options::{FormData, CONF_API_KEY, CONF_BASE_URL};
use tracing::{debug, error};

/// Reconfiguration of an existing entry. The endpoint cannot be changed
/// here; the result carries only the edited settings.
pub struct OptionsFlow {
    entry: ConfigEntry,
    details: Option<DetailsStep>,
}

impl OptionsFlow {
    pub fn new(entry: ConfigEntry) -> Self {
        Self {
            entry,
            details: None,
        }
    }

    pub fn entry(&self) -> &ConfigEntry {
        &self.entry
    }

    pub async fn step_init(&mut self, input: Option<FormData>) -> FlowResult {
        match self.init(input).await {
            Ok(result) => result,
            Err(e) => {
                error!(unique_id = %self.entry.unique_id, error = %e, "Options step failed");
                FlowResult::abort(ABORT_UNKNOWN_ERROR)
            }
        }
    }

    async fn init(&mut self, input: Option<FormData>) -> Result<FlowResult, FlowError> {
        if self.details.is_none() {
            let endpoint = self.entry.endpoint()?;
            let discovery = Discoverer::new(endpoint).discover().await.with_fallbacks();
            let mut state = self.entry.merged();
            state.remove(CONF_BASE_URL);
            state.remove(CONF_API_KEY);
            self.details = Some(DetailsStep::new(STEP_INIT, discovery, state));
        }
        let step = self.details.as_mut().ok_or(FlowError::MissingEndpoint)?;

        let Some(mut input) = input else {
            return Ok(step.render(FormErrors::new()));
        };
        input.remove(CONF_BASE_URL);
        input.remove(CONF_API_KEY);

        Ok(match step.handle(input) {
            DetailsOutcome::Show(result) => result,
            DetailsOutcome::Submit(options) => {
                debug!(unique_id = %self.entry.unique_id, "Saving options");
                FlowResult::CreateEntry {
                    title: String::new(),
                    data: options,
                }
            }
        })
    }
}
