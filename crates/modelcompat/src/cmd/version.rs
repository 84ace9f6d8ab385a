use modelcompat_core::capability::linked_generations;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("modelcompat {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let linked: Vec<&str> = linked_generations()
        .into_iter()
        .map(|generation| generation.as_str())
        .collect();

    println!("name: modelcompat");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "rustc: {}",
        option_env!("RUSTC_VERSION").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("features: types=true, cli=true");
    println!("linked_generations: {}", linked.join(", "));

    Ok(SUCCESS)
}
