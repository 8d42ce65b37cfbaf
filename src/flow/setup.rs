use super::details::{DetailsOutcome, DetailsStep};
use super::form::{base_schema, FormErrors};
use super::{
    FlowError, FlowResult, ABORT_ALREADY_CONFIGURED, ABORT_UNKNOWN_ERROR, STEP_DETAILS, STEP_USER,
};
use crate::catalog::{self, LanguageFilter, SexFilter};
use crate::discovery::Discoverer;
use crate::entry::EntryRegistry;
use crate::fingerprint::Endpoint;
use crate::options::{
    coerce_sample_rate, str_field, FormData, CONF_API_KEY, CONF_BASE_URL, CONF_LANGUAGE,
    CONF_MODEL, CONF_PERSONA, CONF_SEX, DEFAULT_MODEL,
};
use serde_json::Value;
use tracing::{debug, error, info};

/// First-time configuration of a Kokoro server.
///
/// Steps: `user` collects the endpoint, `details` collects the persona and
/// audio settings. Discovery runs once, when the details step is first
/// reached, and is reused for every re-render.
pub struct SetupFlow<'a, R: EntryRegistry + ?Sized> {
    registry: &'a R,
    endpoint: Option<Endpoint>,
    details: Option<DetailsStep>,
    unique_id: Option<String>,
}

impl<'a, R: EntryRegistry + ?Sized> SetupFlow<'a, R> {
    pub fn new(registry: &'a R) -> Self {
        Self {
            registry,
            endpoint: None,
            details: None,
            unique_id: None,
        }
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    /// Identity of the endpoint, set once the flow has produced an entry.
    pub fn unique_id(&self) -> Option<&str> {
        self.unique_id.as_deref()
    }

    pub async fn step_user(&mut self, input: Option<FormData>) -> FlowResult {
        let Some(input) = input else {
            return FlowResult::show_form(STEP_USER, base_schema(&FormData::new()));
        };

        let raw_url = str_field(&input, CONF_BASE_URL).unwrap_or_default();
        match Endpoint::parse(raw_url, str_field(&input, CONF_API_KEY)) {
            Ok(endpoint) => {
                debug!(base_url = %endpoint.base_url, "Endpoint accepted");
                self.endpoint = Some(endpoint);
                // A new endpoint invalidates anything discovered for an older one.
                self.details = None;
                self.step_details(None).await
            }
            Err(e) => {
                debug!(base_url = %raw_url, error = %e, "Endpoint rejected");
                let mut errors = FormErrors::new();
                errors.insert(CONF_BASE_URL.to_string(), e.reason().to_string());
                FlowResult::ShowForm {
                    step_id: STEP_USER,
                    schema: base_schema(&input),
                    errors,
                }
            }
        }
    }

    pub async fn step_details(&mut self, input: Option<FormData>) -> FlowResult {
        match self.details(input).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Setup details step failed");
                FlowResult::abort(ABORT_UNKNOWN_ERROR)
            }
        }
    }

    /// Non-interactive creation from a complete record.
    pub async fn step_import(&mut self, input: FormData) -> FlowResult {
        let raw_url = str_field(&input, CONF_BASE_URL).unwrap_or_default();
        let endpoint = match Endpoint::parse(raw_url, str_field(&input, CONF_API_KEY)) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                info!(error = %e, "Import rejected");
                return FlowResult::abort(e.reason());
            }
        };

        let mut data = input;
        coerce_sample_rate(&mut data);
        if let Some(persona) = imported_persona(&data) {
            data.insert(CONF_PERSONA.to_string(), Value::from(persona));
        }
        data.insert(CONF_BASE_URL.to_string(), Value::from(endpoint.base_url.clone()));
        data.insert(CONF_API_KEY.to_string(), Value::from(endpoint.api_key.clone()));

        match self.create_entry(&endpoint, data) {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Import failed");
                FlowResult::abort(ABORT_UNKNOWN_ERROR)
            }
        }
    }

    async fn details(&mut self, input: Option<FormData>) -> Result<FlowResult, FlowError> {
        let endpoint = self.endpoint.clone().ok_or(FlowError::MissingEndpoint)?;

        if self.details.is_none() {
            let discovery = Discoverer::new(endpoint.clone())
                .discover()
                .await
                .with_fallbacks();
            self.details = Some(DetailsStep::new(STEP_DETAILS, discovery, FormData::new()));
        }
        let step = self.details.as_mut().ok_or(FlowError::MissingEndpoint)?;

        let Some(mut input) = input else {
            return Ok(step.render(FormErrors::new()));
        };
        // The endpoint was fixed by the previous step.
        input.remove(CONF_BASE_URL);
        input.remove(CONF_API_KEY);

        match step.handle(input) {
            DetailsOutcome::Show(result) => Ok(result),
            DetailsOutcome::Submit(details) => {
                let mut data = FormData::new();
                data.insert(CONF_BASE_URL.to_string(), Value::from(endpoint.base_url.clone()));
                data.insert(CONF_API_KEY.to_string(), Value::from(endpoint.api_key.clone()));
                data.extend(details);
                self.create_entry(&endpoint, data)
            }
        }
    }

    fn create_entry(&mut self, endpoint: &Endpoint, data: FormData) -> Result<FlowResult, FlowError> {
        let unique_id = endpoint.fingerprint();
        if self.registry.is_configured(&unique_id)? {
            info!(unique_id = %unique_id, base_url = %endpoint.base_url, "Endpoint already configured");
            return Ok(FlowResult::abort(ABORT_ALREADY_CONFIGURED));
        }

        let model = str_field(&data, CONF_MODEL).unwrap_or(DEFAULT_MODEL);
        let title = format!("Kokoro TTS ({}, {})", endpoint.hostname(), model);
        info!(unique_id = %unique_id, title = %title, "Creating entry");
        self.unique_id = Some(unique_id);
        Ok(FlowResult::CreateEntry { title, data })
    }
}

/// Technical id of an imported persona, which may be in display form.
fn imported_persona(data: &FormData) -> Option<String> {
    let persona = str_field(data, CONF_PERSONA)
        .map(str::trim)
        .filter(|p| !p.is_empty() && !catalog::is_placeholder(p))?;
    let language = LanguageFilter::parse_opt(str_field(data, CONF_LANGUAGE));
    let sex = SexFilter::parse_opt(str_field(data, CONF_SEX));
    Some(catalog::technical_name_in(persona, language, sex))
}
