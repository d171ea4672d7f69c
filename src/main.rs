use clap::Parser;
use llfront::config::{Config, Dialect};
use llfront::parse::ParseContext;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "llfront", about = "LLVM assembly front end: parse .ll text into tagged IR nodes")]
struct Cli {
    /// Input .ll file (default: stdin)
    input: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input dialect: old, new (default: detect)
    #[arg(long)]
    dialect: Option<String>,

    /// Replace x86_fp80 with double before parsing
    #[arg(long)]
    fake_x86_fp80: bool,

    /// Parse function bodies instead of deferring them
    #[arg(long)]
    eager: bool,

    /// Also parse every deferred function body
    #[arg(long)]
    expand: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

const DEFAULT_CONFIGS: &[&str] = &["llfront.config.json", "config/llfront.config.json"];

fn die(msg: &str) -> ! {
    eprintln!("error: {}", msg);
    process::exit(1);
}

fn load_config(path: &PathBuf) -> Config {
    let text = fs::read_to_string(path).unwrap_or_else(|e| die(&format!("cannot read config: {}", e)));
    serde_json::from_str(&text).unwrap_or_else(|e| die(&format!("invalid config JSON: {}", e)))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match cli.config {
        Some(ref config_path) => load_config(config_path),
        None => DEFAULT_CONFIGS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.is_file())
            .map(|path| load_config(&path))
            .unwrap_or_default(),
    };

    // flags win over the file
    if let Some(ref dialect) = cli.dialect {
        config.dialect = Some(match dialect.as_str() {
            "old" => Dialect::Old,
            "new" => Dialect::New,
            _ => die(&format!("invalid dialect: {}", dialect)),
        });
    }
    if cli.fake_x86_fp80 {
        config.fake_x86_fp80 = true;
    }
    if cli.eager {
        config.parse_function_bodies = true;
    }

    let text = match cli.input {
        Some(ref path) => fs::read_to_string(path)
            .unwrap_or_else(|e| die(&format!("cannot read {}: {}", path.display(), e))),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .unwrap_or_else(|e| die(&format!("cannot read stdin: {}", e)));
            buf
        }
    };

    let mut output = llfront::intertype(&text, &config).unwrap_or_else(|e| die(&e.to_string()));

    if cli.expand {
        let mut ctx = ParseContext::new();
        for stub in &output.stubs {
            let body = llfront::parse_function(stub, &mut ctx).unwrap_or_else(|e| die(&e.to_string()));
            output.nodes.extend(body);
        }
        for ty in ctx.types.iter() {
            output.types.insert(ty);
        }
    }

    let mut result =
        serde_json::to_string_pretty(&output).unwrap_or_else(|e| die(&format!("cannot serialize output: {}", e)));
    result.push('\n');

    if let Some(ref output_path) = cli.output {
        fs::write(output_path, &result)
            .unwrap_or_else(|e| die(&format!("cannot write {}: {}", output_path.display(), e)));
        eprintln!(
            "parsed {} node(s), {} deferred function(s) -> {}",
            output.nodes.len(),
            output.stubs.len(),
            output_path.display()
        );
    } else {
        print!("{}", result);
    }
}
