use crate::commands::{load_form, ValueArgs};
use crate::output;
use crate::providers::builtin_registry;

use std::path::PathBuf;

use clap::Args;
use color_eyre::Result;

use commitsmith_service::utils::options_context;
use commitsmith_service::{resolve, FieldKind, OptionsLoader, Settings};

/// List the fields a form shows for the given values
#[derive(Args, Debug)]
pub struct FieldsArgs {
    /// Path to the form definition (YAML or JSON)
    pub form: PathBuf,

    #[command(flatten)]
    pub values: ValueArgs,

    /// Include hidden conditional fields
    #[arg(long)]
    pub all: bool,

    /// Load options for dynamic-enum fields from the built-in providers
    #[arg(long)]
    pub options: bool,
}

pub async fn execute(args: FieldsArgs, settings: &Settings) -> Result<()> {
    let form = load_form(&args.form)?;
    let values = args.values.load()?;

    output::status("Fields", &format!("{}", args.form.display()));

    let mut shown = 0;
    for field in &form.tokens {
        let resolution = resolve(field, &values);
        if !resolution.visible && !args.all {
            continue;
        }
        shown += 1;

        let marker = if resolution.visible { " " } else { "-" };
        let label = if field.label.is_empty() {
            &field.name
        } else {
            &field.label
        };
        println!(
            "{} {:<20} {:<12} {}",
            marker,
            field.name,
            kind_name(field.kind),
            label
        );
        if !resolution.value.is_empty() {
            output::dim(&format!("      = {:?}", resolution.value));
        }
    }

    output::dim(&format!(
        "  {} of {} field(s) shown",
        shown,
        form.tokens.len()
    ));

    if args.options {
        let cwd = std::env::current_dir()?;
        let context = options_context(&cwd, values.clone());
        let registry = builtin_registry();

        output::status("Loading", "dynamic options");
        let responses =
            OptionsLoader::load_all(&registry, &form.tokens, &context, settings.options_timeout)
                .await;

        for response in responses {
            match (&response.options, &response.error) {
                (Some(options), _) => {
                    output::check(&format!(
                        "{}: {} option(s)",
                        response.token_name,
                        options.len()
                    ));
                    for option in options {
                        println!("    {}", option.effective_value());
                    }
                }
                (None, Some(error)) => {
                    output::warning(&format!("{}: {}", response.token_name, error));
                }
                (None, None) => {}
            }
        }
    }

    Ok(())
}

fn kind_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text => "text",
        FieldKind::Enum => "enum",
        FieldKind::Boolean => "boolean",
        FieldKind::DynamicEnum => "dynamic-enum",
    }
}
