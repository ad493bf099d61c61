use crate::commands::{load_form, ValueArgs};
use crate::output;

use std::path::PathBuf;

use clap::Args;
use color_eyre::Result;

use commitsmith_service::{Settings, TemplateCompiler};

/// Compile a commit message from a form and field values
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Path to the form definition (YAML or JSON)
    pub form: PathBuf,

    #[command(flatten)]
    pub values: ValueArgs,

    /// Keep blank-line runs and trailing newlines verbatim
    #[arg(long, conflicts_with = "reduce_empty_lines")]
    pub keep_empty_lines: bool,

    /// Collapse blank-line runs even if the form disables it
    #[arg(long)]
    pub reduce_empty_lines: bool,
}

impl CompileArgs {
    fn reduce_override(&self) -> Option<bool> {
        if self.keep_empty_lines {
            Some(false)
        } else if self.reduce_empty_lines {
            Some(true)
        } else {
            None
        }
    }
}

pub fn execute(args: CompileArgs, settings: &Settings) -> Result<()> {
    output::status("Compiling", &format!("{}", args.form.display()));

    let message = render(&args, settings)?;

    if message.trim().is_empty() {
        output::warning("compiled message is empty");
    }

    print!("{}", message);
    if !message.ends_with('\n') {
        println!();
    }

    Ok(())
}

fn render(args: &CompileArgs, settings: &Settings) -> Result<String> {
    let form = load_form(&args.form)?;
    let values = args.values.load()?;
    let reduce = args
        .reduce_override()
        .or(settings.reduce_empty_lines)
        .unwrap_or(form.reduce_empty_lines);

    tracing::info!(
        form = %args.form.display(),
        tokens = form.tokens.len(),
        values = values.len(),
        reduce,
        "compiling commit message"
    );

    Ok(TemplateCompiler::for_form(&form, &values)
        .with_reduce_empty_lines(reduce)
        .compile())
}
