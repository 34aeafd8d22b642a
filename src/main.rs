use std::path::PathBuf;

#[derive(Debug, Default)]
struct CliArgs {
    cli: bool,
    seq: bool,
    dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;
    init_logging();

    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));

    if args.cli {
        return cadence::repl::run(&dir);
    }
    if args.seq {
        return cadence::seq::run(&dir);
    }
    cadence::app::run(&dir)
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    for arg in args {
        match arg.as_str() {
            "--cli" => out.cli = true,
            "--seq" => out.seq = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other if other.starts_with('-') => anyhow::bail!("unknown argument {other}"),
            other => {
                if out.dir.is_some() {
                    anyhow::bail!("only one directory may be given");
                }
                out.dir = Some(PathBuf::from(other));
            }
        }
    }
    if out.cli && out.seq {
        anyhow::bail!("--cli and --seq are mutually exclusive");
    }
    Ok(out)
}

fn init_logging() {
    let Ok(_) = cadence::config::ensure_config_dir() else {
        return;
    };
    let Ok(path) = cadence::config::log_path() else {
        return;
    };
    let Ok(file) = std::fs::File::create(path) else {
        return;
    };
    let _ = simplelog::WriteLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        file,
    );
}

fn print_help() {
    println!("cadence - a terminal music player");
    println!("  cadence [dir]         Interactive TUI player (default: current dir)");
    println!("  cadence --cli [dir]   Line-oriented command player");
    println!("  cadence --seq [dir]   Play every file in order, then exit");
    println!("  cadence -h | --help   This help");
}
