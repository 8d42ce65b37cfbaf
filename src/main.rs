//! kokoro-bridge - command-line host for Kokoro TTS entries
//!
//! Drives the setup and options flows on the terminal, keeps configured
//! entries in a local store and synthesizes speech through them.

use clap::{Parser, Subcommand};
use kokoro_bridge::catalog::{self, LanguageFilter, SexFilter};
use kokoro_bridge::config_loader;
use kokoro_bridge::discovery::Discoverer;
use kokoro_bridge::entry::{ConfigEntry, EntryStore};
use kokoro_bridge::fingerprint::Endpoint;
use kokoro_bridge::flow::{FlowResult, FormErrors, FormSchema, OptionsFlow, Selector, SetupFlow};
use kokoro_bridge::options::FormData;
use kokoro_bridge::preview;
use kokoro_bridge::speech::{KokoroProvider, SpeechProvider};
use serde_json::Value;
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Command-line host for Kokoro TTS servers
#[derive(Parser)]
#[command(name = "kokoro-bridge")]
#[command(version)]
#[command(about = "Configure Kokoro TTS servers and synthesize speech through them", long_about = None)]
struct Cli {
    /// Entry store to use instead of the configured one
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure a new server interactively
    Setup,

    /// Create an entry from a JSON record
    Import {
        /// File holding a JSON object with base_url, model, persona, ...
        file: PathBuf,
    },

    /// Change the settings of an existing entry
    Configure {
        /// Entry id, id prefix or title
        entry: String,
    },

    /// List configured entries
    List,

    /// Remove an entry
    Remove {
        /// Entry id, id prefix or title
        entry: String,
    },

    /// Show the models and personas a server offers
    Discover {
        /// Server base URL
        url: String,
        #[arg(short, long)]
        api_key: Option<String>,
    },

    /// List catalog personas
    Personas {
        /// Language filter, e.g. "British English"
        #[arg(short, long)]
        language: Option<String>,
        /// Sex filter: Female or Male
        #[arg(short, long)]
        sex: Option<String>,
    },

    /// Synthesize text to a file
    Speak {
        /// Entry id, id prefix or title
        entry: String,
        /// Text to speak
        text: String,
        /// Persona id to use instead of the configured one
        #[arg(short, long)]
        voice: Option<String>,
        #[arg(long)]
        speed: Option<f32>,
        /// wav, mp3, opus, flac or pcm
        #[arg(short, long)]
        format: Option<String>,
        #[arg(long)]
        sample_rate: Option<u32>,
        /// Leading silence in milliseconds (wav only)
        #[arg(long)]
        pad_ms: Option<u32>,
        #[arg(long)]
        volume: Option<f32>,
        /// Output file (default: speech.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render a short preview of an entry's persona
    Preview {
        /// Entry id, id prefix or title
        entry: String,
        /// Text to preview
        #[arg(short, long)]
        text: Option<String>,
        /// Write the decoded audio here instead of printing the event
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Ask for every field of `schema`. Blank answers keep the default; select
/// fields also accept the option number.
fn fill_form(schema: &FormSchema, errors: &FormErrors) -> io::Result<FormData> {
    for (field, error) in errors {
        println!("! {}: {}", field, error);
    }

    let mut input = FormData::new();
    for field in &schema.fields {
        let default = match &field.default {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        if let Selector::Select { options, .. } = &field.selector {
            for (i, option) in options.iter().enumerate() {
                println!("  {:>2}) {}", i + 1, option);
            }
        }
        let answer = prompt(&format!("{} [{}]: ", field.key, default))?;
        let chosen = match (&field.selector, answer.parse::<usize>()) {
            (Selector::Select { options, .. }, Ok(n)) if n >= 1 && n <= options.len() => {
                options[n - 1].clone()
            }
            _ if answer.is_empty() => default,
            _ => answer,
        };
        let value = match field.selector {
            Selector::Number { .. } => chosen
                .parse::<f64>()
                .map(Value::from)
                .unwrap_or(Value::String(chosen)),
            _ => Value::String(chosen),
        };
        input.insert(field.key.to_string(), value);
    }
    Ok(input)
}

fn open_store(cli_path: Option<PathBuf>) -> Result<EntryStore, Box<dyn Error>> {
    let path = cli_path.unwrap_or_else(|| PathBuf::from(config_loader::current().entry_store_path));
    Ok(EntryStore::open(path)?)
}

async fn run_setup(store: &mut EntryStore) -> Result<(), Box<dyn Error>> {
    let (unique_id, title, data) = {
        let mut flow = SetupFlow::new(&*store);
        let mut result = flow.step_user(None).await;
        loop {
            match result {
                FlowResult::ShowForm {
                    step_id,
                    schema,
                    errors,
                } => {
                    println!("\n== {} ==", step_id);
                    let input = fill_form(&schema, &errors)?;
                    result = if step_id == kokoro_bridge::flow::STEP_USER {
                        flow.step_user(Some(input)).await
                    } else {
                        flow.step_details(Some(input)).await
                    };
                }
                FlowResult::CreateEntry { title, data } => {
                    let unique_id = flow
                        .unique_id()
                        .ok_or("setup finished without an endpoint identity")?
                        .to_string();
                    break (unique_id, title, data);
                }
                FlowResult::Abort { reason } => {
                    return Err(format!("setup aborted: {}", reason).into());
                }
            }
        }
    };

    let entry = store.add(ConfigEntry::new(unique_id, title, data))?;
    println!("Created {} ({})", entry.title, entry.unique_id);
    Ok(())
}

async fn run_import(store: &mut EntryStore, file: PathBuf) -> Result<(), Box<dyn Error>> {
    let raw = std::fs::read_to_string(&file)?;
    let record: FormData = serde_json::from_str(&raw)?;

    let (unique_id, title, data) = {
        let mut flow = SetupFlow::new(&*store);
        match flow.step_import(record).await {
            FlowResult::CreateEntry { title, data } => {
                let unique_id = flow
                    .unique_id()
                    .ok_or("import finished without an endpoint identity")?
                    .to_string();
                (unique_id, title, data)
            }
            FlowResult::Abort { reason } => return Err(format!("import aborted: {}", reason).into()),
            FlowResult::ShowForm { .. } => return Err("import needs no form input".into()),
        }
    };

    let entry = store.add(ConfigEntry::new(unique_id, title, data))?;
    println!("Imported {} ({})", entry.title, entry.unique_id);
    Ok(())
}

async fn run_configure(store: &mut EntryStore, key: &str) -> Result<(), Box<dyn Error>> {
    let entry = store.get(key)?.clone();
    let unique_id = entry.unique_id.clone();
    let mut flow = OptionsFlow::new(entry);

    let mut result = flow.step_init(None).await;
    loop {
        match result {
            FlowResult::ShowForm { schema, errors, .. } => {
                let input = fill_form(&schema, &errors)?;
                result = flow.step_init(Some(input)).await;
            }
            FlowResult::CreateEntry { data, .. } => {
                store.update_options(&unique_id, data)?;
                println!("Updated {}", unique_id);
                return Ok(());
            }
            FlowResult::Abort { reason } => {
                return Err(format!("configuration aborted: {}", reason).into());
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let settings = config_loader::current();
    init_logging(&settings.log_filter);

    match cli.command {
        Commands::Setup => {
            let mut store = open_store(cli.store)?;
            run_setup(&mut store).await?;
        }
        Commands::Import { file } => {
            let mut store = open_store(cli.store)?;
            run_import(&mut store, file).await?;
        }
        Commands::Configure { entry } => {
            let mut store = open_store(cli.store)?;
            run_configure(&mut store, &entry).await?;
        }
        Commands::List => {
            let store = open_store(cli.store)?;
            if store.entries().is_empty() {
                println!("No entries in {}", store.path().display());
            }
            for entry in store.entries() {
                println!(
                    "{}  {}  (added {})",
                    entry.unique_id,
                    entry.title,
                    entry.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Commands::Remove { entry } => {
            let mut store = open_store(cli.store)?;
            let removed = store.remove(&entry)?;
            println!("Removed {}", removed.title);
        }
        Commands::Discover { url, api_key } => {
            let endpoint = Endpoint::parse(&url, api_key.as_deref())?;
            let found = Discoverer::new(endpoint).discover().await;
            println!("Models ({}):", found.models.len());
            for model in &found.models {
                println!("  {}", model);
            }
            println!("Personas ({}):", found.personas.len());
            for persona in &found.personas {
                println!("  {}", persona);
            }
        }
        Commands::Personas { language, sex } => {
            let language = LanguageFilter::parse_opt(language.as_deref());
            let sex = SexFilter::parse_opt(sex.as_deref());
            let ids = catalog::filter_personas(&catalog::all_ids(), language, sex);
            if ids.is_empty() {
                println!("{}", catalog::no_personas_message(language, sex));
            }
            for id in ids {
                println!("{:<16} {}", id, catalog::display_name(&id, language, sex));
            }
        }
        Commands::Speak {
            entry,
            text,
            voice,
            speed,
            format,
            sample_rate,
            pad_ms,
            volume,
            output,
        } => {
            let store = open_store(cli.store)?;
            let provider = KokoroProvider::from_entry(store.get(&entry)?)?;

            let mut overrides = FormData::new();
            if let Some(v) = voice {
                overrides.insert("voice".into(), Value::from(v));
            }
            if let Some(v) = speed {
                overrides.insert("speed".into(), Value::from(v));
            }
            if let Some(v) = format {
                overrides.insert("format".into(), Value::from(v));
            }
            if let Some(v) = sample_rate {
                overrides.insert("sample_rate".into(), Value::from(v));
            }
            if let Some(v) = pad_ms {
                overrides.insert("pad_ms".into(), Value::from(v));
            }
            if let Some(v) = volume {
                overrides.insert("volume_multiplier".into(), Value::from(v));
            }

            let audio = provider
                .get_tts_audio(&text, provider.default_language(), &overrides)
                .await?;
            let path =
                output.unwrap_or_else(|| PathBuf::from(format!("speech.{}", audio.extension())));
            std::fs::write(&path, &audio.data)?;
            println!("Wrote {} bytes to {}", audio.data.len(), path.display());
        }
        Commands::Preview {
            entry,
            text,
            output,
        } => {
            let store = open_store(cli.store)?;
            let entry = store.get(&entry)?;
            let mut form = entry.merged();
            if let Some(t) = text {
                form.insert(kokoro_bridge::options::CONF_PREVIEW_TEXT.into(), Value::from(t));
            }
            let clip = preview::preview_audio(&entry.endpoint()?, &form).await?;
            match output {
                Some(path) => {
                    use base64::Engine;
                    let audio = base64::engine::general_purpose::STANDARD.decode(&clip.audio_base64)?;
                    std::fs::write(&path, audio)?;
                    println!("Preview of {} written to {}", clip.persona, path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&clip)?),
            }
        }
    }

    Ok(())
}
