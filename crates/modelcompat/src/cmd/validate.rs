use modelcompat_core::{CompatError, DumpOptions, ProbeOptions, ValidationError};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cmd::{init_capability, resolve_model, ValidateArgs};
use crate::exit::{compat_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{cell, print_json, print_pretty_json, print_table, OutputFormat};

#[derive(Debug, Serialize)]
struct FailureOutput {
    path: String,
    reason: String,
}

#[derive(Debug, Serialize)]
struct ValidateOutput {
    model: String,
    generation: &'static str,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    errors: Vec<FailureOutput>,
}

pub fn run(args: ValidateArgs, format: OutputFormat, options: ProbeOptions) -> CliResult<i32> {
    let text = match (&args.json, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("read {}", path.display()), err))?,
        (None, None) => return Err(CliError::new(USAGE, "provide a document with --json or --file")),
    };

    let capability = init_capability(options)?;
    let class = resolve_model(&args.model, capability)?;
    let generation = capability.generation().as_str();

    let (output, code) = match class.validate_json(&text) {
        Ok(model) => {
            let dump_options = DumpOptions {
                exclude_none: args.exclude_none,
                ..DumpOptions::default()
            };
            let output = ValidateOutput {
                model: class.name().to_string(),
                generation,
                valid: true,
                data: Some(Value::Object(model.dump_with(&dump_options))),
                errors: Vec::new(),
            };
            (output, SUCCESS)
        }
        Err(CompatError::Validation(err)) => {
            debug!(model = %class.name(), failures = err.failures().len(), "document rejected");
            let output = ValidateOutput {
                model: class.name().to_string(),
                generation,
                valid: false,
                data: None,
                errors: failures(&err),
            };
            (output, DATA_INVALID)
        }
        Err(other) => return Err(compat_error("validate", other)),
    };

    print_validation(&output, format);
    Ok(code)
}

fn failures(err: &ValidationError) -> Vec<FailureOutput> {
    err.failures()
        .iter()
        .map(|failure| FailureOutput {
            path: failure.path.to_string(),
            reason: failure.reason.clone(),
        })
        .collect()
}

fn print_validation(output: &ValidateOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Pretty => print_pretty_json(output),
        OutputFormat::Table => match &output.data {
            Some(Value::Object(data)) => print_table(
                &["FIELD", "VALUE"],
                data.iter()
                    .map(|(key, value)| vec![key.clone(), cell(value)])
                    .collect(),
            ),
            _ => print_table(
                &["PATH", "REASON"],
                output
                    .errors
                    .iter()
                    .map(|failure| vec![failure.path.clone(), failure.reason.clone()])
                    .collect(),
            ),
        },
        OutputFormat::Raw => match &output.data {
            Some(data) => println!("{data}"),
            None => {
                for failure in &output.errors {
                    println!("{}: {}", failure.path, failure.reason);
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_documents_omit_data() {
        let output = ValidateOutput {
            model: "Image".to_string(),
            generation: "modern",
            valid: false,
            data: None,
            errors: vec![FailureOutput {
                path: "url".to_string(),
                reason: "field required".to_string(),
            }],
        };
        let json = serde_json::to_string(&output).expect("validate output should serialize");
        assert!(!json.contains("\"data\""));
        assert!(json.contains("\"path\":\"url\""));
    }
}
