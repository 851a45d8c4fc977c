//! Garden CLI
//!
//! Incremental evaluation of Garden programs.

use gardenc::commands::{deps, replay, run};
use gardenc::Options;

fn main() {
    gardenc::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];
    let (options, positional) = match Options::parse(&args[2..]) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(1);
        }
    };

    let status = match command.as_str() {
        "run" => {
            let [path] = positional.as_slice() else {
                eprintln!("Usage: garden run <file> [options]");
                std::process::exit(1);
            };
            run(path, &options)
        }
        "replay" => {
            if positional.is_empty() {
                eprintln!("Usage: garden replay <file>... [options]");
                std::process::exit(1);
            }
            replay(&positional, &options)
        }
        "deps" => {
            let [path, name] = positional.as_slice() else {
                eprintln!("Usage: garden deps <file> <name> [options]");
                std::process::exit(1);
            };
            deps(path, name, &options)
        }
        "help" | "--help" | "-h" => {
            print_usage();
            0
        }
        "version" | "--version" | "-V" => {
            println!("garden {}", env!("CARGO_PKG_VERSION"));
            0
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            1
        }
    };
    std::process::exit(status);
}

fn print_usage() {
    println!("Garden (incremental evaluation)");
    println!();
    println!("Usage: garden <command> [options]");
    println!();
    println!("Commands:");
    println!("  run <file>            Evaluate a program and print every top-level result");
    println!("  replay <file>...      Evaluate successive versions of a program in one session");
    println!("  deps <file> <name>    List the top-level forms depending on a declaration");
    println!("  help                  Show this help message");
    println!("  version               Show version information");
    println!();
    println!("Options:");
    println!("  --retention=<n>       Passes an unreached cache entry survives (default: 2)");
    println!("  --cache=<path>        Persist the evaluation cache to a file");
    println!("  --stats               Print reuse statistics after each pass");
    println!();
    println!("Environment:");
    println!("  GARDEN_LOG            Log filter, e.g. garden_eval=trace");
    println!();
    println!("Examples:");
    println!("  garden run demo.gdn");
    println!("  garden replay v1.gdn v2.gdn --stats");
    println!("  garden deps demo.gdn x");
    println!("  garden run demo.gdn --cache=.garden-cache");
}
