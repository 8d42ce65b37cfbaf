//! The persona-details step shared by the setup and options flows.

use super::form::{details_schema, FormErrors};
use super::{FlowResult, ERROR_PERSONA_REQUIRED};
use crate::catalog::{self, LanguageFilter, SexFilter};
use crate::discovery::Discovery;
use crate::options::{
    coerce_sample_rate, str_field, FormData, CONF_LANGUAGE, CONF_PERSONA, CONF_SEX,
};
use serde_json::Value;
use tracing::debug;

/// What a submission of the details form means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailsInput {
    /// A filter changed and no real persona was picked: re-render.
    FilterAdjust,
    /// Anything else: validate and finish.
    FinalSubmit,
}

impl DetailsInput {
    pub fn classify(input: &FormData) -> Self {
        let has_filter = input.contains_key(CONF_LANGUAGE) || input.contains_key(CONF_SEX);
        let has_persona = str_field(input, CONF_PERSONA)
            .map(|p| !catalog::is_placeholder(p))
            .unwrap_or(false);
        if has_filter && !has_persona {
            Self::FilterAdjust
        } else {
            Self::FinalSubmit
        }
    }
}

/// Result of handling one submission.
#[derive(Debug)]
pub enum DetailsOutcome {
    Show(FlowResult),
    /// Validated settings, persona in technical form.
    Submit(FormData),
}

/// Details form state for one flow instance.
///
/// The state keeps the last rendered values with the persona in technical
/// form, so a later filter change can tell whether the earlier pick is still
/// on offer.
#[derive(Debug, Clone)]
pub struct DetailsStep {
    step_id: &'static str,
    discovery: Discovery,
    state: FormData,
}

fn filters(data: &FormData) -> (LanguageFilter, SexFilter) {
    (
        LanguageFilter::parse_opt(str_field(data, CONF_LANGUAGE)),
        SexFilter::parse_opt(str_field(data, CONF_SEX)),
    )
}

impl DetailsStep {
    pub fn new(step_id: &'static str, discovery: Discovery, state: FormData) -> Self {
        Self {
            step_id,
            discovery,
            state,
        }
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub fn state(&self) -> &FormData {
        &self.state
    }

    pub fn render(&self, errors: FormErrors) -> FlowResult {
        FlowResult::ShowForm {
            step_id: self.step_id,
            schema: details_schema(&self.discovery, &self.state),
            errors,
        }
    }

    pub fn handle(&mut self, input: FormData) -> DetailsOutcome {
        match DetailsInput::classify(&input) {
            DetailsInput::FilterAdjust => {
                self.adjust_filters(input);
                DetailsOutcome::Show(self.render(FormErrors::new()))
            }
            DetailsInput::FinalSubmit => self.submit(input),
        }
    }

    fn adjust_filters(&mut self, input: FormData) {
        self.absorb(input);
        let (language, sex) = filters(&self.state);
        let visible = catalog::filter_personas(&self.discovery.personas, language, sex);

        let keep = str_field(&self.state, CONF_PERSONA)
            .map(|id| visible.iter().any(|v| v == id))
            .unwrap_or(false);
        if !keep {
            if let Some(previous) = self.state.remove(CONF_PERSONA) {
                debug!(persona = %previous, "Selection not offered under new filters, clearing");
            }
        }
        debug!(
            language = language.label(),
            sex = sex.label(),
            offered = visible.len(),
            "Re-rendering details form"
        );
    }

    fn submit(&mut self, mut input: FormData) -> DetailsOutcome {
        coerce_sample_rate(&mut input);

        let shown = str_field(&input, CONF_PERSONA)
            .filter(|p| !catalog::is_placeholder(p))
            .map(str::to_string);
        let Some(shown) = shown else {
            self.absorb(input);
            self.state.remove(CONF_PERSONA);
            let mut errors = FormErrors::new();
            errors.insert(CONF_PERSONA.to_string(), ERROR_PERSONA_REQUIRED.to_string());
            return DetailsOutcome::Show(self.render(errors));
        };

        let technical = self.resolve_persona(&shown, &input);
        debug!(shown = %shown, persona = %technical, "Persona selected");
        input.insert(CONF_PERSONA.to_string(), Value::from(technical));
        self.state.extend(input.clone());
        DetailsOutcome::Submit(input)
    }

    /// Display string to technical id. Tries the filters submitted with the
    /// form, then the ones the form was rendered with.
    fn resolve_persona(&self, display: &str, input: &FormData) -> String {
        let mut submitted = self.state.clone();
        submitted.extend(input.clone());
        for (language, sex) in [filters(&submitted), filters(&self.state)] {
            let id = catalog::technical_name_in(display, language, sex);
            let visible = catalog::lookup(&id)
                .map(|p| p.display(language, sex) == display)
                .unwrap_or(false);
            if visible {
                return id;
            }
        }
        catalog::technical_name(display)
    }

    /// Fold submitted values into the state. A submitted persona is in
    /// display form and is converted before it is kept.
    fn absorb(&mut self, input: FormData) {
        let (language, sex) = filters(&self.state);
        for (key, value) in input {
            if key == CONF_PERSONA {
                match value.as_str().map(str::trim) {
                    Some(p) if !p.is_empty() && !catalog::is_placeholder(p) => {
                        let id = catalog::technical_name_in(p, language, sex);
                        self.state.insert(key, Value::from(id));
                    }
                    _ => {}
                }
            } else {
                self.state.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(v: Value) -> FormData {
        v.as_object().cloned().unwrap()
    }

    fn step(state: Value) -> DetailsStep {
        DetailsStep::new("details", Discovery::default().with_fallbacks(), form(state))
    }

    fn shown_persona(outcome: &DetailsOutcome) -> Value {
        match outcome {
            DetailsOutcome::Show(FlowResult::ShowForm { schema, .. }) => {
                schema.field("persona").unwrap().default.clone()
            }
            other => panic!("expected a form, got {:?}", other),
        }
    }

    #[test]
    fn test_classify() {
        let adjust = [
            json!({ "language": "Japanese" }),
            json!({ "sex": "Male", "persona": "" }),
            json!({ "language": "French", "persona": "Select a persona..." }),
            json!({ "language": "French", "persona": "No personas available for French" }),
            json!({ "sex": "Male", "persona": null }),
        ];
        for v in adjust {
            assert_eq!(DetailsInput::classify(&form(v.clone())), DetailsInput::FilterAdjust, "{}", v);
        }
        let submit = [
            json!({ "language": "Japanese", "persona": "Kumo (Male)" }),
            json!({ "model": "kokoro" }),
            json!({}),
        ];
        for v in submit {
            assert_eq!(DetailsInput::classify(&form(v.clone())), DetailsInput::FinalSubmit, "{}", v);
        }
    }

    #[test]
    fn test_filter_change_keeps_visible_selection() {
        let mut s = step(json!({ "persona": "bm_george" }));
        assert!(s.discovery().personas.iter().any(|p| p == "bm_george"));
        let out = s.handle(form(json!({ "language": "British English" })));
        assert_eq!(shown_persona(&out), json!("George (Male)"));
        assert_eq!(s.state()["persona"], "bm_george");
    }

    #[test]
    fn test_filter_change_clears_hidden_selection() {
        let mut s = step(json!({ "persona": "bm_george" }));
        let out = s.handle(form(json!({ "language": "Japanese" })));
        assert_eq!(shown_persona(&out), json!(""));
        assert!(s.state().get("persona").is_none());
    }

    #[test]
    fn test_missing_persona_reports_error() {
        let mut s = step(json!({}));
        match s.handle(form(json!({ "model": "kokoro", "persona": "  " }))) {
            DetailsOutcome::Show(FlowResult::ShowForm { errors, .. }) => {
                assert_eq!(errors["persona"], "persona_required");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_submit_converts_persona_and_rate() {
        let mut s = step(json!({}));
        let out = s.handle(form(json!({
            "language": "Hindi",
            "sex": "Female",
            "persona": "Alpha",
            "sample_rate": "22050"
        })));
        match out {
            DetailsOutcome::Submit(data) => {
                assert_eq!(data["persona"], "hf_alpha");
                assert_eq!(data["sample_rate"], 22050);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_custom_persona_passes_through() {
        let mut s = step(json!({}));
        match s.handle(form(json!({ "persona": "my_blend" }))) {
            DetailsOutcome::Submit(data) => assert_eq!(data["persona"], "my_blend"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
