use std::path::PathBuf;

use clap::Parser;
use enma::driver::{Driver, Options};
use miette::Result;
use tracing::Level;

/// enma to x86-64 compiler
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Source files to compile, each ending in `.em`
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Name of the linked executable
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Only write the `.asm` files, skip assembling and linking
    #[arg(short = 'S', long)]
    emit_asm: bool,

    /// Print the token stream of each file
    #[arg(long)]
    dump_tokens: bool,

    /// Print the syntax tree of each file
    #[arg(long)]
    dump_ast: bool,

    /// Log every step
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let driver = Driver::new(Options {
        output: args.output,
        emit_asm_only: args.emit_asm,
        dump_tokens: args.dump_tokens,
        dump_ast: args.dump_ast,
    });
    driver.run(&args.inputs)
}
