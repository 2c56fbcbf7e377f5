// CLI Interface
//
// This module provides the command-line interface for LePlan.

use crate::config::PlannerConfig;
use crate::errors::{format_error, OrchestrationError};
use crate::format::{format_impact, format_plan, DEFAULT_MAX_CHARS};
use crate::orchestrator::{project_id, Orchestrator};
use anyhow::{anyhow, Result as AnyhowResult};
use clap::{Parser, Subcommand};
use ledecouverte::{Intent, OrchestrationRequest};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// LePlan - Change Request Planner
#[derive(Parser, Debug)]
#[command(name = "leplan")]
#[command(author = "LePlan Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turn a change request into a dependency-ordered task plan", long_about = None)]
pub struct Cli {
    /// Path to the project directory
    #[arg(global = true, long = "project", short = 'p')]
    pub project_path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(global = true, long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan a change request
    Plan {
        /// Change request text
        #[arg(value_name = "QUERY")]
        query: String,

        /// Request intent: search, refactor, debug, optimize, security, test
        #[arg(long = "intent", default_value = "search", value_parser = parse_intent)]
        intent: Intent,

        /// Token budget per task (defaults to planning.default_token_budget)
        #[arg(long = "tokens")]
        token_budget: Option<usize>,

        /// Print the full result as JSON
        #[arg(long = "json")]
        json: bool,

        /// Character budget of the text report
        #[arg(long = "max-chars", default_value_t = DEFAULT_MAX_CHARS)]
        max_chars: usize,
    },

    /// Analyze the cascading impact of changing specific files
    Impact {
        /// Change request text
        #[arg(value_name = "REQUEST")]
        request: String,

        /// Changed files, relative to the project
        #[arg(long = "changed", value_name = "FILE", num_args = 1.., required = true)]
        changed: Vec<String>,

        /// Print the full result as JSON
        #[arg(long = "json")]
        json: bool,

        /// Character budget of the text report
        #[arg(long = "max-chars", default_value_t = DEFAULT_MAX_CHARS)]
        max_chars: usize,
    },

    /// Show the effective configuration
    Config {
        /// Write it to .leplan/config.toml
        #[arg(long = "write")]
        write: bool,
    },
}

fn parse_intent(value: &str) -> Result<Intent, String> {
    Intent::parse(value).ok_or_else(|| {
        let known: Vec<&str> = Intent::ALL.iter().map(|i| i.as_str()).collect();
        format!("unknown intent '{}' (expected one of: {})", value, known.join(", "))
    })
}

impl Cli {
    /// Run the CLI
    pub async fn run(self) -> AnyhowResult<()> {
        let project = get_project_path(self.project_path)?;

        let mut config = PlannerConfig::load(&project)?;
        config.apply_env().map_err(OrchestrationError::from)?;
        config.validate().map_err(OrchestrationError::from)?;

        init_logging_impl(self.verbose, &config.logging.level);

        match self.command {
            Commands::Plan {
                query,
                intent,
                token_budget,
                json,
                max_chars,
            } => cmd_plan_impl(&project, config, query, intent, token_budget, json, max_chars).await,
            Commands::Impact {
                request,
                changed,
                json,
                max_chars,
            } => cmd_impact_impl(&project, config, request, changed, json, max_chars).await,
            Commands::Config { write } => cmd_config_impl(&project, &config, write),
        }
    }
}

/// Initialize logging
fn init_logging_impl(verbose: bool, level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Get project path from explicit path or current directory
fn get_project_path(explicit: Option<PathBuf>) -> Result<PathBuf, OrchestrationError> {
    let path = match explicit {
        Some(path) => path,
        None => std::env::current_dir().map_err(|err| {
            OrchestrationError::io_error("Failed to read current directory", None, err)
        })?,
    };
    path.canonicalize().map_err(|err| {
        OrchestrationError::io_error("Failed to resolve project path", Some(path.clone()), err)
    })
}

/// Plan command implementation
async fn cmd_plan_impl(
    project: &Path,
    config: PlannerConfig,
    query: String,
    intent: Intent,
    token_budget: Option<usize>,
    json: bool,
    max_chars: usize,
) -> AnyhowResult<()> {
    info!("Planning in {}", project.display());

    let mut request = OrchestrationRequest::new(query, intent, project, project_id(project));
    if let Some(tokens) = token_budget {
        request = request.with_token_budget(tokens);
    }

    let orchestrator = Orchestrator::for_project(project, config);
    let result = orchestrator.orchestrate(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", format_plan(&result, max_chars));
    }
    Ok(())
}

/// Impact command implementation
async fn cmd_impact_impl(
    project: &Path,
    config: PlannerConfig,
    request: String,
    changed: Vec<String>,
    json: bool,
    max_chars: usize,
) -> AnyhowResult<()> {
    info!("Analyzing impact of {} file(s) in {}", changed.len(), project.display());

    let orchestrator = Orchestrator::for_project(project, config);
    let result = orchestrator
        .analyze_complete_impact(project, &request, &changed)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", format_impact(&result, max_chars));
    }
    Ok(())
}

/// Config command implementation
fn cmd_config_impl(project: &Path, config: &PlannerConfig, write: bool) -> AnyhowResult<()> {
    if write {
        let path = config.save(project)?;
        println!("Wrote {}", path.display());
    } else {
        print!("{}", config.to_toml()?);
    }
    Ok(())
}

/// Main entry point for the CLI
pub async fn main() -> AnyhowResult<()> {
    let cli = Cli::parse();
    cli.run().await.map_err(render_error)
}

/// Rewrite planner errors as their terminal message with a suggestion
fn render_error(err: anyhow::Error) -> anyhow::Error {
    match err.downcast::<OrchestrationError>() {
        Ok(err) => anyhow!(format_error(&err)),
        Err(err) => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_parsing() {
        let cli = Cli::try_parse_from([
            "leplan",
            "plan",
            "add caching to the API",
            "--intent",
            "optimize",
            "--tokens",
            "4000",
        ])
        .unwrap();
        match cli.command {
            Commands::Plan {
                query,
                intent,
                token_budget,
                json,
                max_chars,
            } => {
                assert_eq!(query, "add caching to the API");
                assert_eq!(intent, Intent::Optimize);
                assert_eq!(token_budget, Some(4000));
                assert!(!json);
                assert_eq!(max_chars, DEFAULT_MAX_CHARS);
            }
            _ => panic!("Expected Plan command"),
        }
    }

    #[test]
    fn test_plan_defaults_to_search() {
        let cli = Cli::try_parse_from(["leplan", "plan", "x"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Plan {
                intent: Intent::Search,
                token_budget: None,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_intent_is_rejected() {
        assert!(Cli::try_parse_from(["leplan", "plan", "x", "--intent", "deploy"]).is_err());
    }

    #[test]
    fn test_impact_parsing() {
        let cli = Cli::try_parse_from([
            "leplan",
            "-p",
            "/tmp/project",
            "impact",
            "deploy the auth fix",
            "--changed",
            "src/server/auth.ts",
            "src/server/session.ts",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.project_path, Some(PathBuf::from("/tmp/project")));
        match cli.command {
            Commands::Impact { changed, json, .. } => {
                assert_eq!(changed, vec!["src/server/auth.ts", "src/server/session.ts"]);
                assert!(json);
            }
            _ => panic!("Expected Impact command"),
        }
    }

    #[test]
    fn test_impact_requires_changed_files() {
        assert!(Cli::try_parse_from(["leplan", "impact", "deploy"]).is_err());
    }

    #[test]
    fn test_missing_project_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");

        let err = get_project_path(Some(missing.clone())).unwrap_err();
        match &err {
            OrchestrationError::Io { path, .. } => assert_eq!(path.as_ref(), Some(&missing)),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.suggestion().unwrap().contains("gone"));
    }

    #[test]
    fn test_render_error_appends_suggestion() {
        let err = OrchestrationError::ProjectMismatch {
            bound: PathBuf::from("/work/a"),
            requested: PathBuf::from("/work/b"),
        };
        let rendered = render_error(anyhow::Error::new(err)).to_string();
        assert!(rendered.starts_with("Project mismatch"));
        assert!(rendered.contains("Suggestion: Create a separate orchestrator for /work/b"));

        let plain = render_error(anyhow!("boom"));
        assert_eq!(plain.to_string(), "boom");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["leplan", "config", "--write", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Config { write: true }));
    }
}
