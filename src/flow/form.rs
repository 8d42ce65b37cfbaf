use crate::catalog::{self, LanguageFilter, SexFilter};
use crate::discovery::Discovery;
use crate::options::{
    str_field, wire_f32, AudioFormat, FormData, CONF_API_KEY, CONF_BASE_URL, CONF_FORMAT,
    CONF_LANGUAGE, CONF_MODEL, CONF_PAD_MS, CONF_PERSONA, CONF_PREVIEW_TEXT, CONF_SAMPLE_RATE,
    CONF_SEX, CONF_SPEED, DEFAULT_API_KEY, DEFAULT_MODEL, DEFAULT_PREVIEW_TEXT,
    DEFAULT_SAMPLE_RATE, DEFAULT_SPEED, MAX_PAD_MS, MAX_SPEED, MIN_SPEED, SPEED_STEP,
    SUPPORTED_SAMPLE_RATES,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Field key to error key.
pub type FormErrors = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Selector {
    Text,
    Select {
        options: Vec<String>,
        custom_value: bool,
    },
    Number {
        min: f64,
        max: f64,
        step: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    pub key: &'static str,
    pub required: bool,
    pub default: Value,
    pub selector: Selector,
}

/// Ordered field list of one form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormSchema {
    pub fields: Vec<FormField>,
}

impl FormSchema {
    pub fn field(&self, key: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.key).collect()
    }

    /// Options of a select field, empty for any other kind.
    pub fn options(&self, key: &str) -> &[String] {
        match self.field(key).map(|f| &f.selector) {
            Some(Selector::Select { options, .. }) => options,
            _ => &[],
        }
    }

    fn push(&mut self, key: &'static str, default: Value, selector: Selector) {
        self.fields.push(FormField {
            key,
            required: false,
            default,
            selector,
        });
    }
}

fn text_default(state: &FormData, key: &str, fallback: &str) -> Value {
    Value::from(str_field(state, key).unwrap_or(fallback))
}

fn select(options: Vec<String>, custom_value: bool) -> Selector {
    Selector::Select {
        options,
        custom_value,
    }
}

/// Endpoint form: base address and optional credential.
pub fn base_schema(state: &FormData) -> FormSchema {
    let mut schema = FormSchema::default();
    schema.fields.push(FormField {
        key: CONF_BASE_URL,
        required: true,
        default: text_default(state, CONF_BASE_URL, ""),
        selector: Selector::Text,
    });
    schema.push(
        CONF_API_KEY,
        text_default(state, CONF_API_KEY, DEFAULT_API_KEY),
        Selector::Text,
    );
    schema
}

/// Details form rendered from discovery results and the current form state.
///
/// `state` holds the persona in technical form; it is shown here in the
/// display form the active filters produce.
pub fn details_schema(discovery: &Discovery, state: &FormData) -> FormSchema {
    let mut schema = FormSchema::default();

    let model = text_default(state, CONF_MODEL, DEFAULT_MODEL);
    if discovery.models.is_empty() {
        schema.push(CONF_MODEL, model, Selector::Text);
    } else {
        let mut models = discovery.models.clone();
        models.sort();
        schema.push(CONF_MODEL, model, select(models, true));
    }

    let language = LanguageFilter::parse_opt(str_field(state, CONF_LANGUAGE));
    let sex = SexFilter::parse_opt(str_field(state, CONF_SEX));
    schema.push(
        CONF_LANGUAGE,
        Value::from(language.label()),
        select(labels(LanguageFilter::options()), false),
    );
    schema.push(
        CONF_SEX,
        Value::from(sex.label()),
        select(labels(SexFilter::options()), false),
    );

    let current = str_field(state, CONF_PERSONA)
        .map(|id| catalog::display_name(id, language, sex))
        .unwrap_or_default();
    if discovery.personas.is_empty() {
        schema.push(CONF_PERSONA, Value::from(current), Selector::Text);
    } else {
        let mut options = catalog::persona_options(&discovery.personas, language, sex);
        if !current.is_empty() && !options.contains(&current) {
            options.push(current.clone());
            options.sort();
        }
        if options.is_empty() {
            options.push(catalog::NO_PERSONAS.to_string());
        }
        schema.push(CONF_PERSONA, Value::from(current), select(options, true));
    }

    schema.push(
        CONF_SPEED,
        state
            .get(CONF_SPEED)
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::from(wire_f32(DEFAULT_SPEED))),
        Selector::Number {
            min: wire_f32(MIN_SPEED),
            max: wire_f32(MAX_SPEED),
            step: wire_f32(SPEED_STEP),
        },
    );

    schema.push(
        CONF_FORMAT,
        text_default(state, CONF_FORMAT, AudioFormat::default().as_str()),
        select(
            AudioFormat::ALL.iter().map(|f| f.as_str().to_string()).collect(),
            false,
        ),
    );

    schema.push(
        CONF_SAMPLE_RATE,
        Value::from(sample_rate_label(state)),
        select(
            SUPPORTED_SAMPLE_RATES.iter().map(u32::to_string).collect(),
            false,
        ),
    );

    schema.push(
        CONF_PAD_MS,
        state
            .get(CONF_PAD_MS)
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::from(0)),
        Selector::Number {
            min: 0.0,
            max: MAX_PAD_MS as f64,
            step: 10.0,
        },
    );

    schema.push(
        CONF_PREVIEW_TEXT,
        text_default(state, CONF_PREVIEW_TEXT, DEFAULT_PREVIEW_TEXT),
        Selector::Text,
    );

    schema
}

fn labels(options: Vec<&'static str>) -> Vec<String> {
    options.into_iter().map(str::to_string).collect()
}

// Select fields only carry strings, so integer rates are shown as text.
fn sample_rate_label(state: &FormData) -> String {
    match state.get(CONF_SAMPLE_RATE) {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => DEFAULT_SAMPLE_RATE.to_string(),
    }
}
