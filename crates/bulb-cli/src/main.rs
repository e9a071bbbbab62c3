mod render;
mod repl;
mod session;

use std::io;
use std::path::{Path, PathBuf};

use bulb_app::Config;
use bulb_core::{FileStore, GreedyDiff, LineDiff, MyersDiff};
use bulb_db::Store;
use bulb_llm_openai::ChatConfig;
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use tracing_subscriber::EnvFilter;

use session::{CliResult, ProjectStore};

const DEFAULT_PROJECT: &str = "default";

#[derive(Parser)]
#[command(name = "bulb", about = "Chat with an AI model to build a project's files.")]
struct Cli {
    /// Project to work on.
    #[arg(long, global = true, default_value = DEFAULT_PROJECT)]
    project: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Chat about the project (default).
    Chat {
        /// File that bare code blocks in replies replace.
        #[arg(long)]
        active: Option<String>,
    },
    /// List all projects.
    Projects,
    /// List the project's files.
    Files,
    /// Print the stored conversation.
    History,
    /// Print a project file.
    Show { path: String },
    /// Diff two local files.
    Diff {
        old: PathBuf,
        new: PathBuf,
        /// Minimal edit script instead of the greedy line walk.
        #[arg(long)]
        myers: bool,
        /// Print the diff lines as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env()?;
    let command = cli.command.unwrap_or(Command::Chat { active: None });

    match command {
        Command::Diff {
            old,
            new,
            myers,
            json,
        } => diff_files(&old, &new, myers, json),
        Command::Chat { active } => {
            let endpoint = config.chat_url()?.to_string();
            let model = bulb_llm_openai::client(ChatConfig {
                endpoint,
                auth_token: config.auth_token.clone(),
            });
            let mut project = open_project(&config, &cli.project)?;
            repl::run(&mut project, model, &config, active).await
        }
        Command::Projects => {
            let mut store = Store::open(config.db_path()?)?;
            for project in store.projects().list()? {
                let marker = if project.name == cli.project { "*" } else { " " };
                println!("{marker} {}", project.name);
            }
            Ok(())
        }
        Command::Files => {
            let project = existing_project(&config, &cli.project)?;
            for file in project.files().list()? {
                println!(
                    "{}  {} ({} bytes)",
                    file.path,
                    file.file_type.dim(),
                    file.content.len()
                );
            }
            Ok(())
        }
        Command::History => {
            let mut project = existing_project(&config, &cli.project)?;
            for message in project.history()? {
                if message.notice {
                    println!("{}\n", message.content.yellow());
                    continue;
                }
                println!("{}", message.role.as_str().bold());
                for image in &message.images {
                    println!("{}", format!("[image] {image}").dim());
                }
                println!("{}\n", message.content);
            }
            Ok(())
        }
        Command::Show { path } => {
            let project = existing_project(&config, &cli.project)?;
            let file = project
                .files()
                .get(&path)?
                .ok_or_else(|| format!("file not found: {path}"))?;
            print!("{}", file.content);
            Ok(())
        }
    }
}

fn open_project(config: &Config, name: &str) -> CliResult<ProjectStore> {
    let path = config.db_path()?;
    tracing::debug!(path = %path.display(), project = name, "opening database");
    ProjectStore::open(Store::open(&path)?, name)
}

fn existing_project(config: &Config, name: &str) -> CliResult<ProjectStore> {
    ProjectStore::open_existing(Store::open(config.db_path()?)?, name)
}

fn diff_files(old: &Path, new: &Path, myers: bool, json: bool) -> CliResult<()> {
    let old = std::fs::read_to_string(old)?;
    let new = std::fs::read_to_string(new)?;
    let differ: &dyn LineDiff = if myers { &MyersDiff } else { &GreedyDiff };
    let lines = differ.diff(&old, &new);

    if json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
    } else {
        render::print_diff(&mut io::stdout(), &lines)?;
    }
    Ok(())
}
