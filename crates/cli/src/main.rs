mod config;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use solo_core::{ActionState, Caller, EditView};
use solo_storage::{RecordStore, VersionSnapshot};
use tracing_subscriber::EnvFilter;

use crate::config::SoloConfig;
use crate::serve::state::AppState;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Single-record content administration.
#[derive(Parser)]
#[command(name = "solo", version, about = "Single-record content administration")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = "solo.toml")]
    config: PathBuf,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP admin API
    Serve {
        /// Port to listen on (overrides config and SOLO_PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show the publication state and available actions of a section
    Status {
        /// Section name
        section: String,
        /// Caller whose capabilities decide the action set
        #[arg(long)]
        caller: String,
    },

    /// Show the version history of a section's record
    History {
        /// Section name
        section: String,
    },

    /// List the permission codes provided by configured sections
    Permissions,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SOLO_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    if !cli.quiet {
        init_tracing();
    }

    let config = match SoloConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(
                &format!("failed to create tokio runtime: {}", e),
                cli.output,
                cli.quiet,
            );
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Serve { port } => {
            if let Err(e) = rt.block_on(serve::start_server(config, port)) {
                report_error(&format!("Server error: {}", e), cli.output, cli.quiet);
                process::exit(1);
            }
        }
        Commands::Status { section, caller } => {
            rt.block_on(cmd_status(&config, &section, &caller, cli.output, cli.quiet));
        }
        Commands::History { section } => {
            rt.block_on(cmd_history(&config, &section, cli.output, cli.quiet));
        }
        Commands::Permissions => {
            cmd_permissions(&config, cli.output);
        }
    }
}

async fn load_state(config: &SoloConfig, output: OutputFormat, quiet: bool) -> AppState {
    match AppState::from_config(config).await {
        Ok(state) => state,
        Err(e) => {
            report_error(&format!("error opening storage: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn require_section(config: &SoloConfig, section: &str, output: OutputFormat, quiet: bool) {
    if config.section(section).is_none() {
        report_error(
            &format!("unknown section '{}'", section),
            output,
            quiet,
        );
        process::exit(1);
    }
}

async fn cmd_status(
    config: &SoloConfig,
    section: &str,
    caller: &str,
    output: OutputFormat,
    quiet: bool,
) {
    require_section(config, section, output, quiet);
    let state = load_state(config, output, quiet).await;
    let Some(controller) = state.controller(section) else {
        process::exit(1);
    };

    let view = match controller.edit_view(&Caller::new(caller)).await {
        Ok(view) => view,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => print_json(&view),
        OutputFormat::Text => print!("{}", format_status(&view)),
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

fn format_status(view: &EditView) -> String {
    let mut out = format!("section: {}\n", view.section);
    match &view.record {
        Some(record) => {
            out.push_str(&format!(
                "record: {} #{} '{}'\n",
                record.record_type, record.id, record.content.title
            ));
            out.push_str(&format!("version: {}\n", record.version));
            out.push_str(&format!(
                "on draft: {}, on live: {}, stages differ: {}\n",
                yes_no(record.state.on_draft),
                yes_no(record.state.on_live),
                yes_no(record.state.stages_differ)
            ));
        }
        None => out.push_str("record: unavailable (read-only)\n"),
    }
    let actions: Vec<String> = view
        .actions
        .iter()
        .map(|a| match a.state {
            ActionState::Satisfied => format!("{} (satisfied)", a.kind),
            ActionState::Actionable => a.kind.to_string(),
        })
        .collect();
    if actions.is_empty() {
        out.push_str("actions: none\n");
    } else {
        out.push_str(&format!("actions: {}\n", actions.join(", ")));
    }
    out
}

async fn cmd_history(config: &SoloConfig, section: &str, output: OutputFormat, quiet: bool) {
    require_section(config, section, output, quiet);
    let state = load_state(config, output, quiet).await;
    let Some(controller) = state.controller(section) else {
        process::exit(1);
    };

    let versions = match controller.find_or_create().await {
        Ok(record) => controller
            .store()
            .list_versions(record.record_type(), record.id())
            .await
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    let versions = match versions {
        Ok(v) => v,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => print_json(&versions),
        OutputFormat::Text => print!("{}", format_history(&versions)),
    }
}

fn format_history(versions: &[VersionSnapshot]) -> String {
    let mut out = String::new();
    for v in versions {
        let when = v
            .saved_at
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| v.saved_at.to_string());
        out.push_str(&format!(
            "#{:<4} {:<6} {}  '{}'\n",
            v.version,
            v.stage.as_str(),
            when,
            v.content.title
        ));
    }
    out
}

fn cmd_permissions(config: &SoloConfig, output: OutputFormat) {
    let permissions = solo_core::provide_permissions(&config.sections);
    match output {
        OutputFormat::Json => print_json(&permissions),
        OutputFormat::Text => {
            for p in &permissions {
                println!("{}\t{}\t{}", p.code, p.category, p.name);
            }
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("error serializing output: {}", e);
            process::exit(1);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
