use modelcompat_core::{capability, ProbeOptions};
use serde::Serialize;

use crate::cmd::{init_capability, ProbeArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, print_pretty_json, print_table, OutputFormat};

#[derive(Debug, Serialize)]
struct GapOutput {
    option: &'static str,
    handling: &'static str,
    note: &'static str,
}

#[derive(Debug, Serialize)]
struct ProbeOutput {
    generation: &'static str,
    source: &'static str,
    linked: Vec<&'static str>,
    gaps: Vec<GapOutput>,
}

pub fn run(_args: ProbeArgs, format: OutputFormat, options: ProbeOptions) -> CliResult<i32> {
    let capability = init_capability(options)?;

    let output = ProbeOutput {
        generation: capability.generation().as_str(),
        source: capability.source().as_str(),
        linked: capability::linked_generations()
            .into_iter()
            .map(|generation| generation.as_str())
            .collect(),
        gaps: capability
            .gaps()
            .iter()
            .map(|gap| GapOutput {
                option: gap.option,
                handling: gap.handling.as_str(),
                note: gap.note,
            })
            .collect(),
    };

    print_probe(&output, format);
    Ok(SUCCESS)
}

fn print_probe(output: &ProbeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Pretty => print_pretty_json(output),
        OutputFormat::Table => {
            println!(
                "generation: {} ({}), linked: {}\n",
                output.generation,
                output.source,
                output.linked.join(", ")
            );
            print_table(
                &["OPTION", "HANDLING", "NOTE"],
                output
                    .gaps
                    .iter()
                    .map(|gap| {
                        vec![
                            gap.option.to_string(),
                            gap.handling.to_string(),
                            gap.note.to_string(),
                        ]
                    })
                    .collect(),
            );
        }
        OutputFormat::Raw => println!("{}", output.generation),
    }
}
