use std::collections::BTreeMap;

use modelcompat_core::capability::linked_generations;
use modelcompat_core::OVERRIDE_ENV;
use serde::Serialize;

use crate::cmd::EnvinfoArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct PlatformInfo {
    os: String,
    arch: String,
}

#[derive(Serialize)]
struct EnvInfoOutput {
    version: String,
    target: String,
    rust_version: String,
    git_hash: String,
    platform: PlatformInfo,
    features: Vec<String>,
    linked_generations: Vec<String>,
    dependencies: BTreeMap<String, String>,
    environment: BTreeMap<String, Option<String>>,
}

pub fn run(_args: EnvinfoArgs, format: OutputFormat) -> CliResult<i32> {
    let mut deps = BTreeMap::new();
    deps.insert("clap".to_string(), "4.5".to_string());
    deps.insert("jsonschema (legacy)".to_string(), "0.17".to_string());
    deps.insert("jsonschema (modern)".to_string(), "0.41".to_string());

    let mut env = BTreeMap::new();
    env.insert(OVERRIDE_ENV.to_string(), std::env::var(OVERRIDE_ENV).ok());
    env.insert("RUST_LOG".to_string(), std::env::var("RUST_LOG").ok());

    let output = EnvInfoOutput {
        version: env!("CARGO_PKG_VERSION").to_string(),
        target: target_triple(),
        rust_version: option_env!("RUSTC_VERSION")
            .unwrap_or("unknown")
            .to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        platform: PlatformInfo {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        },
        features: active_features(),
        linked_generations: linked_generations()
            .into_iter()
            .map(|generation| generation.as_str().to_string())
            .collect(),
        dependencies: deps,
        environment: env,
    };

    print_envinfo(&output, format);
    Ok(SUCCESS)
}

fn target_triple() -> String {
    if let Some(target) = option_env!("MODELCOMPAT_BUILD_TARGET") {
        return target.to_string();
    }

    match (std::env::consts::ARCH, std::env::consts::OS) {
        ("aarch64", "macos") => "aarch64-apple-darwin".to_string(),
        ("x86_64", "macos") => "x86_64-apple-darwin".to_string(),
        ("aarch64", "linux") => "aarch64-unknown-linux-gnu".to_string(),
        ("x86_64", "linux") => "x86_64-unknown-linux-gnu".to_string(),
        ("x86_64", "windows") => "x86_64-pc-windows-msvc".to_string(),
        (arch, os) => format!("{arch}-unknown-{os}"),
    }
}

fn print_envinfo(output: &EnvInfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("modelcompat environment\n");
            println!("  Version:    {}", output.version);
            println!("  Target:     {}", output.target);
            println!("  Rust:       {}", output.rust_version);
            println!("  Git hash:   {}", output.git_hash);
            println!(
                "  Platform:   {} ({})",
                output.platform.os, output.platform.arch
            );
            println!("  Features:   {}", output.features.join(", "));
            println!("  Linked:     {}", output.linked_generations.join(", "));
            println!("\n  Dependencies:");
            for (k, v) in &output.dependencies {
                println!("    {:<20} {}", k, v);
            }
            println!("\n  Environment:");
            for (k, v) in &output.environment {
                println!("    {:<24} {}", k, v.as_deref().unwrap_or("(not set)"));
            }
        }
        OutputFormat::Raw => println!("{}", output.version),
    }
}

fn active_features() -> Vec<String> {
    let mut features = Vec::new();
    if cfg!(feature = "types") {
        features.push("types".to_string());
    }
    if cfg!(feature = "cli") {
        features.push("cli".to_string());
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envinfo_json_lists_linked_generations() {
        let out = EnvInfoOutput {
            version: "0.2.1".to_string(),
            target: "a-b".to_string(),
            rust_version: "1.85.0".to_string(),
            git_hash: "abc".to_string(),
            platform: PlatformInfo {
                os: "linux".to_string(),
                arch: "x86_64".to_string(),
            },
            features: vec!["cli".to_string()],
            linked_generations: vec!["legacy".to_string(), "modern".to_string()],
            dependencies: BTreeMap::new(),
            environment: BTreeMap::new(),
        };

        let json = serde_json::to_string(&out).expect("envinfo output should serialize");
        assert!(json.contains("\"linked_generations\":[\"legacy\",\"modern\"]"));
    }

    #[test]
    fn target_looks_like_triple() {
        let target = target_triple();
        assert!(target.split('-').count() >= 3);
    }
}
