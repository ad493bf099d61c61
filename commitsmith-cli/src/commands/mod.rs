pub mod check;
pub mod compile;
pub mod eval;
pub mod fields;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use color_eyre::eyre::{bail, eyre, WrapErr};
use color_eyre::Result;

use crate::output;

use commitsmith_service::{FieldValue, FieldValues, FormDefinition, FormParser};

/// Field values supplied on the command line
#[derive(Args, Debug, Default, Clone)]
pub struct ValueArgs {
    /// JSON file mapping field names to a string or an array of strings
    #[arg(long, value_name = "FILE")]
    pub values: Option<PathBuf>,

    /// Set a field value (repeat a name to build a multi-valued field)
    #[arg(long = "set", short = 's', value_name = "NAME=VALUE")]
    pub set: Vec<String>,
}

impl ValueArgs {
    /// Values from the file, then `--set` pairs layered on top
    pub fn load(&self) -> Result<FieldValues> {
        let mut values = match &self.values {
            Some(path) => read_values_file(path)?,
            None => FieldValues::new(),
        };

        for (name, value) in parse_assignments(&self.set)? {
            values.set(name, value);
        }

        Ok(values)
    }
}

/// Parse a form, reporting validation problems as warnings.
///
/// Fields with a missing or malformed match expression stay hidden instead of
/// failing the command; `check` is where they become errors.
pub fn load_form(path: &Path) -> Result<FormDefinition> {
    let (form, problems) = FormParser::load_lenient(path)?;
    for problem in &problems {
        output::warning(&format!("[{}] {}", problem.path, problem.message));
    }
    Ok(form)
}

fn read_values_file(path: &Path) -> Result<FieldValues> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read values file {}", path.display()))?;
    serde_json::from_str(&content)
        .wrap_err_with(|| format!("values file {} is not a JSON object of strings", path.display()))
}

/// Parse `NAME=VALUE` pairs. A name given more than once becomes a list.
pub fn parse_assignments(pairs: &[String]) -> Result<Vec<(String, FieldValue)>> {
    let mut parsed: Vec<(String, FieldValue)> = Vec::new();

    for pair in pairs {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| eyre!("expected NAME=VALUE, got '{}'", pair))?;
        let name = name.trim();
        if name.is_empty() {
            bail!("missing field name in '{}'", pair);
        }

        match parsed.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, FieldValue::Multiple(items))) => items.push(value.to_string()),
            Some((_, slot)) => {
                let first = slot.raw("");
                *slot = FieldValue::Multiple(vec![first, value.to_string()]);
            }
            None => parsed.push((name.to_string(), FieldValue::from(value))),
        }
    }

    Ok(parsed)
}
