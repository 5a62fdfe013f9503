use clap::Parser;
use resdecl::cli::Cli;

fn main() {
    let args = Cli::parse();
    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = resdecl::run(args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
