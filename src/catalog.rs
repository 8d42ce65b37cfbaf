//! Static persona catalog.
//!
//! Maps the server's technical persona ids (`af_heart`, `bm_george`, ...) to
//! a language, a sex and a human name, and derives the operator-facing
//! display strings from the active language/sex filters.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

pub const ALL_LANGUAGES: &str = "All Languages";
pub const ALL_SEXES: &str = "All";
pub const SELECT_PROMPT: &str = "Select a persona...";
pub const NO_PERSONAS: &str = "No personas available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    AmericanEnglish,
    BritishEnglish,
    Japanese,
    MandarinChinese,
    Spanish,
    French,
    Hindi,
    Italian,
    BrazilianPortuguese,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sex {
    Female,
    Male,
}

/// A value that can be narrowed to by a persona filter.
pub trait FilterValue: Copy + PartialEq + Sized + 'static {
    /// Label of the "no filtering" option.
    const ALL_LABEL: &'static str;
    const VALUES: &'static [Self];

    fn label(&self) -> &'static str;

    fn parse(s: &str) -> Option<Self> {
        Self::VALUES.iter().copied().find(|v| v.label() == s)
    }
}

impl FilterValue for Language {
    const ALL_LABEL: &'static str = ALL_LANGUAGES;
    const VALUES: &'static [Self] = &[
        Language::AmericanEnglish,
        Language::BritishEnglish,
        Language::Japanese,
        Language::MandarinChinese,
        Language::Spanish,
        Language::French,
        Language::Hindi,
        Language::Italian,
        Language::BrazilianPortuguese,
    ];

    fn label(&self) -> &'static str {
        match self {
            Self::AmericanEnglish => "American English",
            Self::BritishEnglish => "British English",
            Self::Japanese => "Japanese",
            Self::MandarinChinese => "Mandarin Chinese",
            Self::Spanish => "Spanish",
            Self::French => "French",
            Self::Hindi => "Hindi",
            Self::Italian => "Italian",
            Self::BrazilianPortuguese => "Brazilian Portuguese",
        }
    }
}

impl FilterValue for Sex {
    const ALL_LABEL: &'static str = ALL_SEXES;
    const VALUES: &'static [Self] = &[Sex::Female, Sex::Male];

    fn label(&self) -> &'static str {
        match self {
            Self::Female => "Female",
            Self::Male => "Male",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Either "everything" or one concrete value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter<T> {
    All,
    Only(T),
}

pub type LanguageFilter = Filter<Language>;
pub type SexFilter = Filter<Sex>;

impl<T: FilterValue> Filter<T> {
    /// Parse a dropdown value. Blank and unrecognised values mean `All`.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s == T::ALL_LABEL {
            return Filter::All;
        }
        match T::parse(s) {
            Some(v) => Filter::Only(v),
            None => {
                debug!(value = %s, "Unrecognised filter value, treating as all");
                Filter::All
            }
        }
    }

    pub fn parse_opt(s: Option<&str>) -> Self {
        s.map(Self::parse).unwrap_or(Filter::All)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Filter::All => T::ALL_LABEL,
            Filter::Only(v) => v.label(),
        }
    }

    pub fn admits(&self, value: T) -> bool {
        match self {
            Filter::All => true,
            Filter::Only(v) => *v == value,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Filter::All)
    }

    /// Dropdown options: every concrete value followed by the "all" label.
    pub fn options() -> Vec<&'static str> {
        T::VALUES
            .iter()
            .map(FilterValue::label)
            .chain(std::iter::once(T::ALL_LABEL))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    pub id: &'static str,
    pub language: Language,
    pub sex: Sex,
    pub name: &'static str,
}

const fn persona(id: &'static str, language: Language, sex: Sex, name: &'static str) -> Persona {
    Persona {
        id,
        language,
        sex,
        name,
    }
}

use Language::*;
use Sex::*;

pub const PERSONAS: &[Persona] = &[
    persona("af_heart", AmericanEnglish, Female, "Heart"),
    persona("af_alloy", AmericanEnglish, Female, "Alloy"),
    persona("af_aoede", AmericanEnglish, Female, "Aoede"),
    persona("af_bella", AmericanEnglish, Female, "Bella"),
    persona("af_jessica", AmericanEnglish, Female, "Jessica"),
    persona("af_kore", AmericanEnglish, Female, "Kore"),
    persona("af_nicole", AmericanEnglish, Female, "Nicole"),
    persona("af_nova", AmericanEnglish, Female, "Nova"),
    persona("af_river", AmericanEnglish, Female, "River"),
    persona("af_sarah", AmericanEnglish, Female, "Sarah"),
    persona("af_sky", AmericanEnglish, Female, "Sky"),
    persona("am_adam", AmericanEnglish, Male, "Adam"),
    persona("am_echo", AmericanEnglish, Male, "Echo"),
    persona("am_eric", AmericanEnglish, Male, "Eric"),
    persona("am_fenrir", AmericanEnglish, Male, "Fenrir"),
    persona("am_liam", AmericanEnglish, Male, "Liam"),
    persona("am_michael", AmericanEnglish, Male, "Michael"),
    persona("am_onyx", AmericanEnglish, Male, "Onyx"),
    persona("am_puck", AmericanEnglish, Male, "Puck"),
    persona("am_santa", AmericanEnglish, Male, "Santa"),
    persona("bf_alice", BritishEnglish, Female, "Alice"),
    persona("bf_emma", BritishEnglish, Female, "Emma"),
    persona("bf_isabella", BritishEnglish, Female, "Isabella"),
    persona("bf_lily", BritishEnglish, Female, "Lily"),
    persona("bm_daniel", BritishEnglish, Male, "Daniel"),
    persona("bm_fable", BritishEnglish, Male, "Fable"),
    persona("bm_george", BritishEnglish, Male, "George"),
    persona("bm_lewis", BritishEnglish, Male, "Lewis"),
    persona("jf_alpha", Japanese, Female, "Alpha"),
    persona("jf_gongitsune", Japanese, Female, "Gongitsune"),
    persona("jf_nezumi", Japanese, Female, "Nezumi"),
    persona("jf_tebukuro", Japanese, Female, "Tebukuro"),
    persona("jm_kumo", Japanese, Male, "Kumo"),
    persona("zf_xiaobei", MandarinChinese, Female, "Xiaobei"),
    persona("zf_xiaoni", MandarinChinese, Female, "Xiaoni"),
    persona("zf_xiaoxiao", MandarinChinese, Female, "Xiaoxiao"),
    persona("zf_xiaoyi", MandarinChinese, Female, "Xiaoyi"),
    persona("zm_yunjian", MandarinChinese, Male, "Yunjian"),
    persona("zm_yunxi", MandarinChinese, Male, "Yunxi"),
    persona("zm_yunxia", MandarinChinese, Male, "Yunxia"),
    persona("zm_yunyang", MandarinChinese, Male, "Yunyang"),
    persona("ef_dora", Spanish, Female, "Dora"),
    persona("em_alex", Spanish, Male, "Alex"),
    persona("em_santa", Spanish, Male, "Santa"),
    persona("ff_siwis", French, Female, "Siwis"),
    persona("hf_alpha", Hindi, Female, "Alpha"),
    persona("hf_beta", Hindi, Female, "Beta"),
    persona("hm_omega", Hindi, Male, "Omega"),
    persona("hm_psi", Hindi, Male, "Psi"),
    persona("if_sara", Italian, Female, "Sara"),
    persona("im_nicola", Italian, Male, "Nicola"),
    persona("pf_dora", BrazilianPortuguese, Female, "Dora"),
    persona("pm_alex", BrazilianPortuguese, Male, "Alex"),
    persona("pm_santa", BrazilianPortuguese, Male, "Santa"),
];

lazy_static! {
    static ref BY_ID: HashMap<&'static str, &'static Persona> =
        PERSONAS.iter().map(|p| (p.id, p)).collect();
}

pub fn lookup(id: &str) -> Option<&'static Persona> {
    BY_ID.get(id).copied()
}

/// Every technical id in table order.
pub fn all_ids() -> Vec<String> {
    PERSONAS.iter().map(|p| p.id.to_string()).collect()
}

impl Persona {
    /// Display string under the given filters. Whatever a filter already
    /// pins down is left out of the parenthesised suffix.
    pub fn display(&self, language: LanguageFilter, sex: SexFilter) -> String {
        match (language.is_all(), sex.is_all()) {
            (false, false) => self.name.to_string(),
            (false, true) => format!("{} ({})", self.name, self.sex),
            (true, false) => format!("{} ({})", self.name, self.language),
            (true, true) => format!("{} ({}, {})", self.name, self.language, self.sex),
        }
    }

    fn display_forms(&self) -> [String; 3] {
        [
            format!("{} ({})", self.name, self.sex),
            format!("{} ({})", self.name, self.language),
            format!("{} ({}, {})", self.name, self.language, self.sex),
        ]
    }

    fn visible_under(&self, language: LanguageFilter, sex: SexFilter) -> bool {
        language.admits(self.language) && sex.admits(self.sex)
    }
}

/// Technical id → display string. Unknown ids come back unchanged.
pub fn display_name(id: &str, language: LanguageFilter, sex: SexFilter) -> String {
    match lookup(id) {
        Some(p) => p.display(language, sex),
        None => id.to_string(),
    }
}

/// Display string → technical id, without filter context.
///
/// Tries the bare name first, then each parenthesised form. Anything that
/// matches nothing is returned as-is and treated as a custom persona.
pub fn technical_name(display: &str) -> String {
    if let Some(p) = PERSONAS.iter().find(|p| p.name == display) {
        return p.id.to_string();
    }
    PERSONAS
        .iter()
        .find(|p| p.display_forms().iter().any(|form| form == display))
        .map(|p| p.id.to_string())
        .unwrap_or_else(|| display.to_string())
}

/// Display string → technical id, preferring personas visible under the
/// filters the string was rendered with. Needed because bare names such as
/// "Alpha" or "Santa" are shared across languages.
pub fn technical_name_in(display: &str, language: LanguageFilter, sex: SexFilter) -> String {
    PERSONAS
        .iter()
        .filter(|p| p.visible_under(language, sex))
        .find(|p| p.display(language, sex) == display)
        .map(|p| p.id.to_string())
        .unwrap_or_else(|| technical_name(display))
}

/// Keep the ids visible under the filters, in their original order.
///
/// Ids missing from the catalog have no known language or sex, so they only
/// survive while both filters are `All`.
pub fn filter_personas(ids: &[String], language: LanguageFilter, sex: SexFilter) -> Vec<String> {
    let filtered: Vec<String> = ids
        .iter()
        .filter(|id| match lookup(id) {
            Some(p) => p.visible_under(language, sex),
            None => language.is_all() && sex.is_all(),
        })
        .cloned()
        .collect();
    debug!(
        total = ids.len(),
        kept = filtered.len(),
        language = language.label(),
        sex = sex.label(),
        "Filtered personas"
    );
    filtered
}

/// Message shown in place of an empty persona list.
pub fn no_personas_message(language: LanguageFilter, sex: SexFilter) -> String {
    match (language, sex) {
        (Filter::Only(l), Filter::Only(s)) => {
            format!("No {} personas available for {}", s.label().to_lowercase(), l)
        }
        (Filter::Only(l), Filter::All) => format!("No personas available for {}", l),
        (Filter::All, Filter::Only(s)) => {
            format!("No {} personas available", s.label().to_lowercase())
        }
        (Filter::All, Filter::All) => NO_PERSONAS.to_string(),
    }
}

/// Sorted display options for a persona dropdown, or a single placeholder
/// when nothing matches.
pub fn persona_options(ids: &[String], language: LanguageFilter, sex: SexFilter) -> Vec<String> {
    let mut options: Vec<String> = filter_personas(ids, language, sex)
        .iter()
        .map(|id| display_name(id, language, sex))
        .collect();
    options.sort();
    options.dedup();
    if options.is_empty() {
        options.push(no_personas_message(language, sex));
    }
    options
}

/// True for strings that only stand in for a missing persona choice.
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value == SELECT_PROMPT
        || value == NO_PERSONAS
        || (value.starts_with("No ")
            && (value.ends_with(" personas available")
                || value.contains(" personas available for ")))
}
