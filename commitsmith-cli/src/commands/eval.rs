use crate::commands::parse_assignments;
use crate::output;

use clap::Args;
use color_eyre::Result;

use commitsmith_service::{try_evaluate_when_clause, ExpressionContext, WhenClause};

/// Evaluate a when-clause against name=value pairs
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Expression, e.g. "type == 'fix' && scope =~ /^ui/"
    pub expression: String,

    /// Bind a name (repeat a name to bind a list)
    #[arg(long = "set", short = 's', value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// Report why an expression failed instead of printing `false`
    #[arg(long)]
    pub explain: bool,
}

pub fn execute(args: EvalArgs) -> Result<()> {
    let context: ExpressionContext = parse_assignments(&args.set)?.into_iter().collect();

    match try_evaluate_when_clause(&args.expression, &context) {
        Ok(result) => {
            tracing::info!(expression = %args.expression, result, "evaluated");
            println!("{}", result);
        }
        Err(err) => {
            tracing::info!(expression = %args.expression, error = %err, "evaluation failed closed");
            if args.explain {
                output::error(&err.to_string());
                if let Ok(clause) = WhenClause::parse(&args.expression) {
                    output::dim(&format!("  parsed as: {:?}", clause.ast()));
                }
            }
            println!("false");
        }
    }

    Ok(())
}
