use clap::Parser;
use cutlist::engine::PackEngine;
use cutlist::render;
use cutlist::score::ScoreStrategy;
use cutlist::types::{BinSpec, Demand, PackConfig, expand_demands};
use tracing::Level;

#[derive(Parser)]
#[command(name = "cutlist", about = "1D cutting stock optimizer for linear stock")]
struct Cli {
    /// Base stock length, used when no --bins are given (e.g. 2400)
    #[arg(long, default_value_t = 2400.0)]
    stock: f64,

    /// Available stock as LEN[@ORIGIN] (e.g. 2400 1800@50)
    #[arg(long = "bins", num_args = 1..)]
    bins: Vec<String>,

    /// Pieces as LEN:QTY[:LABEL] (e.g. 720:4:shelf 1800:2:side)
    #[arg(long = "cuts", num_args = 1.., required = true)]
    cuts: Vec<String>,

    /// Saw kerf width (default: 0)
    #[arg(long, default_value_t = 0.0)]
    kerf: f64,

    /// Material trimmed from each end of every bin (default: 0)
    #[arg(long, default_value_t = 0.0)]
    trim: f64,

    /// Placement strategy: best-fit or first-fit
    #[arg(long, default_value = "best-fit", value_parser = parse_strategy)]
    strategy: ScoreStrategy,

    /// Show ASCII layout of each bin
    #[arg(long)]
    layout: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log packing decisions to stderr
    #[arg(long, short)]
    verbose: bool,
}

fn parse_strategy(s: &str) -> Result<ScoreStrategy, String> {
    match s {
        "best-fit" => Ok(ScoreStrategy::BestFit),
        "first-fit" => Ok(ScoreStrategy::FirstFit),
        _ => Err(format!(
            "invalid strategy '{}', expected: best-fit or first-fit",
            s
        )),
    }
}

fn parse_length(s: &str, what: &str) -> Result<f64, String> {
    let value = s
        .parse::<f64>()
        .map_err(|_| format!("invalid {} '{}'", what, s))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("{} must be positive in '{}'", what, s));
    }
    Ok(value)
}

fn parse_bin(s: &str, index: usize) -> Result<BinSpec, String> {
    let (length, origin) = match s.split_once('@') {
        Some((length, origin)) => {
            let origin = origin
                .parse::<f64>()
                .map_err(|_| format!("invalid origin in '{}'", s))?;
            (length, origin)
        }
        None => (s, 0.0),
    };
    Ok(BinSpec::new(parse_length(length, "bin length")?, origin, index))
}

fn parse_cut(s: &str) -> Result<Demand, String> {
    let parts: Vec<&str> = s.splitn(3, ':').collect();
    if parts.len() < 2 {
        return Err(format!("invalid cut '{}', expected LEN:QTY[:LABEL]", s));
    }
    let length = parse_length(parts[0], "piece length")?;
    let qty = parts[1]
        .parse::<u32>()
        .map_err(|_| format!("invalid quantity in '{}'", s))?;
    if qty == 0 {
        return Err(format!("quantity must be non-zero in '{}'", s));
    }
    let label = parts.get(2).map_or_else(|| parts[0].to_string(), |l| l.to_string());
    Ok(Demand { length, qty, label })
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", e);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_max_level(Level::DEBUG)
            .init();
    }

    let bins: Vec<BinSpec> = cli
        .bins
        .iter()
        .enumerate()
        .map(|(i, b)| parse_bin(b, i))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| fail(e));

    let demands: Vec<Demand> = cli
        .cuts
        .iter()
        .map(|c| parse_cut(c))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| fail(e));
    let boxes = expand_demands(&demands).unwrap_or_else(|e| fail(e));

    let engine = PackEngine::new(PackConfig {
        base_stock_length: cli.stock,
        saw_kerf: cli.kerf,
        trim: cli.trim,
        strategy: cli.strategy,
    });
    let report = engine.run(bins, boxes).unwrap_or_else(|e| fail(e));

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => fail(e),
        }
        return;
    }

    for bin in &report.bins {
        println!("Bin {}:", bin);
        for p in &bin.boxes {
            println!("  {} @ {}", p, p.x.unwrap_or_default());
        }
        for l in &bin.leftovers {
            if l.length > 0.0 {
                println!("  leftover {} @ {}", l.length, l.x);
            }
        }
        if cli.layout {
            print!("{}", render::render_bin(bin));
        }
        println!();
    }

    if !report.unplaced.is_empty() {
        println!("Unplaced:");
        for p in &report.unplaced {
            println!("  {}", p);
        }
        println!();
    }

    println!(
        "Summary: {} bin{} used, {} cut{}, {:.1}% waste",
        report.used_bin_count(),
        if report.used_bin_count() == 1 { "" } else { "s" },
        report.placed_count(),
        if report.placed_count() == 1 { "" } else { "s" },
        report.total_waste_percent(),
    );
}
