use anyhow::{Context, Result, bail};
use clap::Parser;
use plant_advisor::{
    AnalysisPhase, ChatRejection, Client, Config, Controller, PlantAnalysis, Role,
    StaleResponsePolicy, config, image_from_file,
};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Gemini API key (falls back to API_KEY when unset).
    #[arg(long, global = true, env = config::API_KEY_VAR, hide_env_values = true)]
    api_key: Option<String>,
    /// Model name (gemini-2.5-flash when unset).
    #[arg(long, global = true, env = config::MODEL_VAR)]
    model: Option<String>,
    /// API host, e.g. a proxy.
    #[arg(long, global = true, env = config::BASE_URL_VAR)]
    base_url: Option<String>,
    /// Whole-request timeout in seconds.
    #[arg(long, global = true, env = config::TIMEOUT_VAR)]
    timeout: Option<u64>,
    /// Connect timeout in seconds.
    #[arg(long, global = true, env = config::CONNECT_TIMEOUT_VAR)]
    connect_timeout: Option<u64>,
    /// Which analysis response to keep when a newer image was selected
    /// (last-resolved-wins or latest-request-wins).
    #[arg(long, global = true, env = config::STALE_POLICY_VAR)]
    stale_policy: Option<StaleResponsePolicy>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Identify the plant in a photo and print care advice.
    Analyze {
        image: PathBuf,
        /// Print the analysis as JSON instead of text.
        #[arg(long)]
        json: bool,
        /// Continue into a chat session after the analysis.
        #[arg(long)]
        chat: bool,
    },
    /// Chat with the gardening assistant. An empty line or Ctrl-D exits.
    Chat,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::from_env();
        if let Some(api_key) = &self.api_key {
            config.api_key = api_key.trim().to_string();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(secs) = self.timeout {
            config.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = self.connect_timeout {
            config.connect_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(policy) = self.stale_policy {
            config.stale_response_policy = policy;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // RUST_LOG=plant_advisor=debug for request-level logs
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    if !config.has_credential() {
        tracing::warn!("No API key configured; requests will be rejected");
    }
    info!("Using model {}", config.model);

    let client = config.client().context("Failed to build API client")?;
    let controller = Controller::with_state(client, config.session());

    match cli.command {
        Commands::Analyze { image, json, chat } => {
            analyze(&controller, image, json).await?;
            if chat {
                chat_loop(&controller).await?;
            }
        }
        Commands::Chat => chat_loop(&controller).await?,
    }

    Ok(())
}

async fn analyze(controller: &Controller<Client>, path: PathBuf, json: bool) -> Result<()> {
    let image = image_from_file(&path)
        .await
        .with_context(|| format!("Could not load {}", path.display()))?;

    eprintln!("Analyzing {}...", path.display());
    controller.select_image(image).await;

    let state = controller.snapshot().await;
    match (state.analysis_phase(), state.analysis(), state.error()) {
        (AnalysisPhase::Success, Some(analysis), _) => {
            if json {
                println!("{}", serde_json::to_string_pretty(analysis)?);
            } else {
                print!("{}", render_analysis(analysis));
            }
            Ok(())
        }
        (_, _, Some(error)) => bail!("{error}"),
        (phase, _, _) => bail!("analysis did not settle (phase: {phase:?})"),
    }
}

fn render_analysis(analysis: &PlantAnalysis) -> String {
    let care = &analysis.care_instructions;
    let mut out = format!("{}\n\n", analysis.plant_name);
    out.push_str("Care Instructions\n");
    out.push_str(&format!("  Watering: {}\n", care.watering));
    out.push_str(&format!("  Sunlight: {}\n", care.sunlight));
    out.push_str(&format!("  Soil:     {}\n\n", care.soil));
    out.push_str(&format!("Current Condition\n  {}\n\n", analysis.current_condition));
    out.push_str("Recommended Next Steps\n");
    for (i, step) in analysis.next_steps.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, step));
    }
    out.push_str(&format!(
        "\nEstimated Price in Dubai\n  {}\n",
        analysis.estimated_price_aed
    ));
    out
}

async fn chat_loop(controller: &Controller<Client>) -> Result<()> {
    if let Some(greeting) = controller.snapshot().await.chat_history().last() {
        println!("{}: {}", greeting.role, greeting.text);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match controller.send_message(&line).await {
            Ok(()) => {}
            Err(ChatRejection::Empty) => break,
            Err(ChatRejection::Busy) => continue,
        }

        let state = controller.snapshot().await;
        if let Some(reply) = state.chat_history().last().filter(|m| m.role == Role::Model) {
            println!("{}: {}", reply.role, reply.text);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plant_advisor::CareInstructions;

    #[test]
    fn test_cli_parses_analyze() {
        let cli = Cli::try_parse_from(["plant-advisor", "analyze", "fern.jpg", "--json"]).unwrap();
        match cli.command {
            Commands::Analyze { image, json, chat } => {
                assert_eq!(image, PathBuf::from("fern.jpg"));
                assert!(json);
                assert!(!chat);
            }
            Commands::Chat => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::try_parse_from([
            "plant-advisor",
            "chat",
            "--api-key",
            " abc ",
            "--model",
            "gemini-2.5-pro",
            "--timeout",
            "30",
            "--connect-timeout",
            "5",
            "--stale-policy",
            "latest-request-wins",
        ])
        .unwrap();
        let config = cli.config();
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(5)));
        assert_eq!(
            config.stale_response_policy,
            StaleResponsePolicy::LatestRequestWins
        );
        assert_eq!(
            config.session().policy(),
            StaleResponsePolicy::LatestRequestWins
        );
    }

    #[test]
    fn test_cli_rejects_unknown_stale_policy() {
        let result = Cli::try_parse_from(["plant-advisor", "chat", "--stale-policy", "newest"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_args_declare_env_fallbacks() {
        use clap::CommandFactory;
        let command = Cli::command();
        let env_of = |id: &str| {
            command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .and_then(|arg| arg.get_env())
                .map(|env| env.to_string_lossy().into_owned())
        };
        assert_eq!(env_of("api_key").as_deref(), Some(config::API_KEY_VAR));
        assert_eq!(env_of("stale_policy").as_deref(), Some(config::STALE_POLICY_VAR));
        assert_eq!(
            env_of("connect_timeout").as_deref(),
            Some(config::CONNECT_TIMEOUT_VAR)
        );
    }

    #[test]
    fn test_render_analysis_numbers_steps() {
        let analysis = PlantAnalysis {
            plant_name: "Snake Plant".to_string(),
            care_instructions: CareInstructions {
                watering: "Every 2-3 weeks".to_string(),
                sunlight: "Low to bright indirect".to_string(),
                soil: "Cactus mix".to_string(),
            },
            current_condition: "Healthy".to_string(),
            next_steps: vec!["Dust leaves".to_string(), "Repot in spring".to_string()],
            estimated_price_aed: "AED 40 - 90".to_string(),
        };
        let text = render_analysis(&analysis);
        assert!(text.starts_with("Snake Plant\n"));
        assert!(text.contains("  1. Dust leaves\n  2. Repot in spring\n"));
        assert!(text.contains("AED 40 - 90"));
    }
}
