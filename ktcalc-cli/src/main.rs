use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ktcalc::prelude::*;
use serde::{Deserialize, Serialize};

mod render;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Situation 1 attacker, e.g. "4:3:3:4:0:0:0:None:0:0:rend"
    #[arg(long, value_name = "NOTATION")]
    a1: Option<AttackProfile>,

    /// Situation 1 defender, e.g. "3:12:0:"
    #[arg(long, value_name = "NOTATION")]
    d1: Option<DefenseProfile>,

    /// Situation 2 attacker
    #[arg(long, value_name = "NOTATION")]
    a2: Option<AttackProfile>,

    /// Situation 2 defender
    #[arg(long, value_name = "NOTATION")]
    d2: Option<DefenseProfile>,

    /// JSON file holding both situations
    #[arg(short, long, value_name = "FILE", conflicts_with_all = ["a1", "d1", "a2", "d2"])]
    scenarios: Option<PathBuf>,

    /// Use built-in demo situations instead of the command line
    #[arg(long, default_value_t = false, conflicts_with = "scenarios")]
    demo: bool,

    /// Largest wound total charted in the kill chance tables
    #[arg(short = 'w', long, default_value_t = DEFAULT_MAX_WOUNDS)]
    max_wounds: u32,

    /// Write the full comparison as JSON to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Log every resolution
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ScenarioFile {
    s1: Scenario,
    s2: Scenario,
}

#[derive(Serialize)]
struct Report<'a> {
    generated_at: String,
    s1: &'a Scenario,
    s2: &'a Scenario,
    comparison: &'a ScenarioComparison,
}

fn demo_scenarios() -> ScenarioFile {
    let bolt_rifle = AttackProfileBuilder::new()
        .num_dice(4)
        .success_threshold(3)
        .damage(3, 4)
        .piercing_crits(1)
        .build();

    let plasma_gun = AttackProfileBuilder::new()
        .num_dice(4)
        .success_threshold(3)
        .damage(5, 6)
        .piercing(1)
        .lethal(5)
        .reroll(RerollStrategy::Balanced)
        .build();

    let trooper = DefenseProfileBuilder::new().save(3).wounds(12).build();

    ScenarioFile {
        s1: Scenario::new(bolt_rifle, trooper),
        s2: Scenario::new(plasma_gun, trooper),
    }
}

fn load_scenarios(args: &Args) -> anyhow::Result<ScenarioFile> {
    if args.demo {
        log::info!("Using demo situations");
        return Ok(demo_scenarios());
    }
    if let Some(path) = &args.scenarios {
        log::info!("Loading situations from {}", path.display());
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let reader = std::io::BufReader::new(file);
        let scenarios = serde_json::from_reader(reader)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        return Ok(scenarios);
    }
    Ok(ScenarioFile {
        s1: Scenario::new(args.a1.unwrap_or_default(), args.d1.unwrap_or_default()),
        s2: Scenario::new(args.a2.unwrap_or_default(), args.d2.unwrap_or_default()),
    })
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::builder()
        .format_timestamp_secs()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();
    log::info!("Starting calculator with args: {:?}", args);

    let ScenarioFile { s1, s2 } = load_scenarios(&args)?;
    log::info!("Situation 1: attacker {} vs defender {}", s1.attack, s1.defense);
    log::info!("Situation 2: attacker {} vs defender {}", s2.attack, s2.defense);

    let start = chrono::Utc::now();
    let mut cache = ResolutionCache::new();
    let comparison = ScenarioComparison::compute(&s1, &s2, args.max_wounds, &mut cache)
        .context("failed to compare situations")?;
    let elapsed = chrono::Utc::now() - start;
    log::info!(
        "Resolved {} distributions ({} cache hits) in {} ms",
        cache.misses(),
        cache.hits(),
        elapsed.num_milliseconds()
    );

    print!("{}", render::comparison(&comparison));

    if let Some(output) = &args.output {
        let report = Report {
            generated_at: chrono::Utc::now().to_rfc3339(),
            s1: &s1,
            s2: &s2,
            comparison: &comparison,
        };
        let file = std::fs::File::create(output)
            .with_context(|| format!("failed to create {}", output.display()))?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &report)?;
        log::info!("Results written to {}", output.display());
    }

    Ok(())
}
