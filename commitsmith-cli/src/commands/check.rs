use crate::output;

use std::path::PathBuf;

use clap::Args;
use color_eyre::Result;

use commitsmith_service::{FieldKind, FormParser, FormValidator, WhenClause};

/// Validate a form definition file
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the form definition (YAML or JSON)
    pub form: PathBuf,
}

pub fn execute(args: CheckArgs) -> Result<()> {
    let form_path = &args.form;

    if !form_path.exists() {
        color_eyre::eyre::bail!("Form file not found: {}", form_path.display());
    }

    // Step 1: Parse YAML/JSON syntax
    output::status("Checking", &format!("{}", form_path.display()));

    let form = match FormParser::parse_file(form_path) {
        Ok(form) => form,
        Err(e) => {
            output::error(&format!("Parse error: {}", e.message));
            if !e.context.is_empty() {
                eprint!("{}", e.context);
            }
            if let Some(suggestion) = &e.suggestion {
                output::info(&format!("  Suggestion: {}", suggestion));
            }
            std::process::exit(1);
        }
    };

    output::check("Syntax valid");

    // Step 2: Structure summary
    let conditional = form.tokens.iter().filter(|f| f.is_conditional()).count();
    let dynamic = form
        .tokens
        .iter()
        .filter(|f| f.kind == FieldKind::DynamicEnum)
        .count();

    output::check(&format!(
        "Structure: {} template line(s), {} token(s), {} conditional, {} dynamic",
        form.template.lines().len(),
        form.tokens.len(),
        conditional,
        dynamic
    ));

    // Step 3: Semantic validation
    match FormValidator::validate(&form) {
        Ok(()) => {
            output::check("Semantic validation passed");
        }
        Err(errors) => {
            output::error(&format!("{} validation error(s):", errors.len()));
            for error in &errors {
                output::error(&format!("  - [{}] {}", error.path, error.message));
                if let Some(suggestion) = &error.suggestion {
                    output::info(&format!("    {}", suggestion));
                }
            }
            std::process::exit(1);
        }
    }

    // Step 4: Show what each condition reads
    for field in form.tokens.iter().filter(|f| f.is_conditional()) {
        if let Some(clause) = field
            .match_expression
            .as_deref()
            .and_then(|expr| WhenClause::parse(expr).ok())
        {
            output::dim(&format!(
                "    {} shown when {}",
                field.name,
                clause.source()
            ));
        }
    }

    println!();
    output::success("Form is valid");

    Ok(())
}
