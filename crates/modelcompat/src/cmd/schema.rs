use modelcompat_core::ProbeOptions;

use crate::cmd::{init_capability, resolve_model, SchemaArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{cell, print_json, print_pretty_json, print_table, OutputFormat};

pub fn run(args: SchemaArgs, format: OutputFormat, options: ProbeOptions) -> CliResult<i32> {
    let capability = init_capability(options)?;
    let class = resolve_model(&args.model, capability)?;
    let schema = class.to_json_schema();

    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(&schema),
        OutputFormat::Pretty => print_pretty_json(&schema),
        OutputFormat::Table => {
            println!("{} ({})\n", class.title(), capability.generation());
            let rows = class
                .fields()
                .iter()
                .map(|spec| {
                    vec![
                        spec.name().to_string(),
                        spec.ty().to_string(),
                        spec.is_required().to_string(),
                        spec.default_value()
                            .filter(|_| !spec.is_required())
                            .map(cell)
                            .unwrap_or_else(|| "-".to_string()),
                    ]
                })
                .collect();
            print_table(&["FIELD", "TYPE", "REQUIRED", "DEFAULT"], rows);
        }
    }
    Ok(SUCCESS)
}
