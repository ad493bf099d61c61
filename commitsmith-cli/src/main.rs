mod commands;
mod logging;
mod output;
mod providers;

use clap::{Parser, Subcommand};
use color_eyre::Result;

use commitsmith_service::{LogLevel, Settings};

use commands::{check, compile, eval, fields};

/// Compile structured commit messages from form definitions
#[derive(Parser, Debug)]
#[command(name = "commitsmith", version, about)]
struct Cli {
    /// Log level: trace, debug, info, warn, error (overrides COMMITSMITH_LOG_LEVEL)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a commit message to stdout
    Compile(compile::CompileArgs),

    /// Evaluate a when-clause and print true or false
    Eval(eval::EvalArgs),

    /// List the fields a form shows for the given values
    Fields(fields::FieldsArgs),

    /// Validate a form definition
    Check(check::CheckArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let settings = Settings::from_env()?.apply_overrides(cli.log_level, None);
    logging::init_logging(&settings);

    tracing::debug!(?settings, "loaded settings");

    match cli.command {
        Command::Compile(args) => compile::execute(args, &settings),
        Command::Eval(args) => eval::execute(args),
        Command::Fields(args) => fields::execute(args, &settings).await,
        Command::Check(args) => check::execute(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_log_level_after_subcommand() {
        let cli = Cli::try_parse_from([
            "commitsmith",
            "eval",
            "type == 'fix'",
            "--set",
            "type=fix",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        match cli.command {
            Command::Eval(args) => {
                assert_eq!(args.expression, "type == 'fix'");
                assert_eq!(args.set, vec!["type=fix".to_string()]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn compile_flags_conflict() {
        let result = Cli::try_parse_from([
            "commitsmith",
            "compile",
            "form.yaml",
            "--keep-empty-lines",
            "--reduce-empty-lines",
        ]);
        assert!(result.is_err());
    }
}
