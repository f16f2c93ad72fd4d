use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use inquire::{InquireError, Password, PasswordDisplayMode, Text};
use std::sync::Arc;

use skye_core::{
    ChatSession, Config, ConversationLoop, ForecastResult, GeminiModel, ToolRegistry,
    WeatherFetcher, fetcher::DATE_FORMAT, invoke_data_processor, prompt, weather_tool,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skye", version, about = "Weather-aware event planning assistant")]
pub struct Cli {
    /// Show debug logs (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the Gemini API key and model.
    Configure,

    /// Print the hourly forecast for a location.
    Forecast {
        /// City name.
        location: String,

        /// Date as YYYY-MM-DD, within the next 7 days; defaults to today.
        #[arg(long)]
        date: Option<String>,
    },

    /// Generate a written weather report with the model.
    Report {
        /// City name.
        location: String,

        /// Date as YYYY-MM-DD, within the next 7 days; defaults to today.
        #[arg(long)]
        date: Option<String>,
    },

    /// Chat with the event planner.
    Chat,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Forecast { location, date } => forecast(&location, date).await,
            Command::Report { location, date } => report(&location, date).await,
            Command::Chat => chat().await,
        }
    }
}

fn configure() -> Result<()> {
    let mut cfg = Config::load()?;

    let api_key = Password::new("Gemini API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    let model = Text::new("Model:").with_default(&cfg.gemini.model).prompt()?;

    cfg.set_api_key(api_key.trim().to_string());
    cfg.gemini.model = model;
    cfg.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn gemini(cfg: &Config) -> Result<GeminiModel> {
    let api_key = cfg.gemini_api_key()?;
    GeminiModel::from_settings(&cfg.gemini, api_key).context("Failed to create Gemini client")
}

fn resolve_date(fetcher: &WeatherFetcher, date: Option<String>) -> String {
    date.unwrap_or_else(|| fetcher.today().format(DATE_FORMAT).to_string())
}

async fn forecast(location: &str, date: Option<String>) -> Result<()> {
    let cfg = Config::load()?;
    let fetcher = WeatherFetcher::from_settings(&cfg.weather)?;
    let date = resolve_date(&fetcher, date);

    let result = fetcher.fetch(location, &date).await;
    if let Some(err) = &result.error {
        bail!("{err}");
    }

    print!("{}", format_day(&result, &date));
    Ok(())
}

async fn report(location: &str, date: Option<String>) -> Result<()> {
    let cfg = Config::load()?;
    let model = gemini(&cfg)?;
    let fetcher = WeatherFetcher::from_settings(&cfg.weather)?;
    let date = resolve_date(&fetcher, date);

    let weather = fetcher.fetch(location, &date).await;
    let user_prompt = prompt::data_processor_user_prompt(&weather, location, &date);
    let system_prompt = prompt::data_processor_system_prompt();

    let text = invoke_data_processor(&model, Some(&system_prompt), &user_prompt).await?;
    println!("{text}");
    Ok(())
}

async fn chat() -> Result<()> {
    let cfg = Config::load()?;
    let model = Arc::new(gemini(&cfg)?);
    let fetcher = WeatherFetcher::from_settings(&cfg.weather)?;
    let today = fetcher.today();

    let tools = ToolRegistry::new().with_tool(weather_tool(fetcher))?;
    let system_prompt = prompt::tooled_system_prompt(&cfg.chat.assistant_name, &tools, today);
    let conversation =
        ConversationLoop::new(cfg.chat.max_tool_round_trips).with_system_instruction(system_prompt);
    let mut session = ChatSession::new(model, tools, conversation);

    let name = &cfg.chat.assistant_name;
    println!("Hi, I'm {name}, your event planning assistant. Ask me things like:");
    println!("  - Can I plan an outdoor birthday party this Saturday in San Diego?");
    println!("  - What day next week is best for a wedding in Atlanta?");
    println!("Type `exit` or press Ctrl+C to leave.\n");

    loop {
        let input = match Text::new("You:").prompt() {
            Ok(input) => input,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };

        let input = input.trim();
        if input.is_empty() || matches!(input, "exit" | "quit") {
            break;
        }

        match session.send(input).await {
            Ok(answer) => println!("\n{name}: {answer}\n"),
            Err(e) => eprintln!("\n{name} could not answer: {e}\n"),
        }
    }

    Ok(())
}

/// Hourly table for one day of a successful fetch.
fn format_day(result: &ForecastResult, date: &str) -> String {
    let mut out = format!("Hourly forecast for {} on {date}", result.location);
    if result.from_cache {
        out.push_str(" (cached)");
    }
    out.push('\n');

    let Some(hours) = result.day(date) else {
        out.push_str("No hourly data for this date.\n");
        return out;
    };

    out.push_str(&format!(
        "{:<9} {:>8} {:>6} {:>6} {:>9} {:>8} {:>7} {:>6}\n",
        "hour", "temp °C", "hum %", "cloud%", "wind km/h", "prec mm", "snow cm", "prob%"
    ));
    for h in hours {
        out.push_str(&format!(
            "{:<9} {:>8.1} {:>6.0} {:>6.0} {:>9.1} {:>8.1} {:>7.1} {:>6.0}\n",
            h.hour,
            h.temperature,
            h.humidity,
            h.cloud_cover,
            h.wind_speed,
            h.precipitation,
            h.snowfall,
            h.precipitation_probability,
        ));
    }
    out
}
