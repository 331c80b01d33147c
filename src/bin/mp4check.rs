use anyhow::Context;
use clap::{ArgAction, CommandFactory, Parser};
use mp4check::{
    BoxNode, BoxReader, FourCC, ParseOptions, default_registry,
    report::write_box,
    util::{find_all, hex_dump, select_by_path},
};
use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Inspect the atom tree of an MP4/QuickTime file",
    disable_help_flag = true
)]
struct Args {
    /// MP4/QuickTime file path
    path: Option<String>,

    /// Print this help
    #[arg(short = 'h', action = ArgAction::SetTrue)]
    help: bool,

    /// Only print subtree(s) matching a dotted path (e.g. moov.trak[0].tkhd)
    #[arg(long = "filter")]
    filter: Option<String>,

    /// Hex dump the raw payload of every box of this type (e.g. --raw hdlr)
    #[arg(long = "raw")]
    raw: Option<String>,

    /// Limit box nesting depth
    #[arg(long, default_value_t = 64)]
    max_depth: usize,

    /// Emit JSON instead of the text report
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Log skipped and ignored boxes to stderr
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let path = match (&args.path, args.help) {
        (Some(path), false) => path.clone(),
        _ => {
            let _ = Args::command().print_help();
            return Ok(ExitCode::FAILURE);
        }
    };

    init_logging(args.verbose);

    let Ok(file) = File::open(&path) else {
        return Ok(ExitCode::FAILURE);
    };

    let options = ParseOptions { max_depth: args.max_depth, keep_payload: args.raw.is_some() };
    let outcome = BoxReader::new(default_registry())
        .with_options(options)
        .parse(BufReader::new(file));

    let targets: Vec<&BoxNode> = match &args.filter {
        Some(p) => select_by_path(&outcome.boxes, p),
        None => outcome.boxes.iter().collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&targets)?);
    } else {
        let mut out = String::new();
        for b in &targets {
            write_box(&mut out, b)?;
        }
        print!("{}", out);
    }

    if let Some(sel) = &args.raw {
        let typ = FourCC::from_str(sel)
            .with_context(|| format!("--raw expects a 4-character type, got {:?}", sel))?;
        dump_raw(&outcome.boxes, typ);
    }

    match outcome.error {
        Some(e) => Err(e).with_context(|| format!("parsing {} stopped early", path)),
        None => Ok(ExitCode::SUCCESS),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dump_raw(roots: &[BoxNode], typ: FourCC) {
    for (i, b) in find_all(roots, typ).into_iter().enumerate() {
        let off = b.offset + 8;
        match &b.payload {
            Some(data) => {
                println!(
                    "\n== Dump {} ({}) payload: offset={:#x}, len={} ==",
                    i,
                    b.typ,
                    off,
                    data.len()
                );
                print!("{}", hex_dump(data, off));
            }
            None => println!(
                "\n== Dump {} ({}) container, {} children ==",
                i,
                b.typ,
                b.children.len()
            ),
        }
    }
}
