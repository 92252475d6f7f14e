//! NPC Simulation Runner
//!
//! Seeds a town, runs it for a number of hours and prints what came of it.

use clap::Parser;
use std::path::PathBuf;

use npc_core::events::EventLogger;
use npc_core::output::count_events_by_type;
use npc_core::{Simulation, Tuning};

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "npc_sim")]
#[command(about = "Personality-driven NPC town simulation")]
struct Args {
    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Hours to simulate (defaults to the tuning file's value)
    #[arg(long)]
    hours: Option<u64>,

    /// Number of agents to generate
    #[arg(long, default_value_t = 40)]
    population: usize,

    /// Tuning file; built-in defaults when absent
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Append every event to this JSONL file
    #[arg(long)]
    events_out: Option<PathBuf>,

    /// Print a progress line every N days (0 disables)
    #[arg(long, default_value_t = 1)]
    report_every: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let tuning = match &args.tuning {
        Some(path) => Tuning::load(path)?,
        None => Tuning::load_or_default(),
    };
    let hours = args.hours.unwrap_or(tuning.simulation.default_hours);

    println!("NPC Simulation");
    println!("==============");
    println!("Seed: {}", args.seed);
    println!("Hours: {}", hours);
    println!("Population: {}", args.population);
    println!();

    let mut sim = Simulation::new(tuning, args.seed)?;
    if let Some(path) = &args.events_out {
        sim = sim.with_event_logger(EventLogger::new(path)?);
        println!("Writing events to {}", path.display());
    }
    sim.initialize_generated(args.population)?;

    for hour in 1..=hours {
        sim.simulate_hour();

        let day = hour / 24;
        if args.report_every > 0 && hour % 24 == 0 && day % args.report_every == 0 {
            let population = sim.population_stats();
            let wealth = sim.wealth_stats();
            println!(
                "[Day {:>3}] alive: {:>3}  dead: {:>3}  gangs: {:>2}  mean gold: {:>6.1}  gini: {:.2}",
                day, population.alive, population.dead, population.gangs, wealth.mean, wealth.gini
            );
        }
    }

    print_summary(&sim);
    Ok(())
}

fn print_summary(sim: &Simulation) {
    let population = sim.population_stats();
    let wealth = sim.wealth_stats();

    println!();
    println!("Simulation complete at tick {}.", sim.current_tick());
    println!();
    println!("Population");
    println!("  Alive: {} (started with {})", population.alive, sim.initial_population());
    println!("  Dead: {}", population.dead);
    println!("  In gangs: {}", population.in_gangs);

    println!();
    println!("Wealth");
    println!("  Total: {}", wealth.total);
    println!("  Mean: {:.1}  Std dev: {:.1}", wealth.mean, wealth.std_dev);
    println!("  Min: {}  Max: {}  Gini: {:.3}", wealth.min, wealth.max, wealth.gini);

    println!();
    println!("Gangs ({})", population.gangs);
    for gang in sim.gangs() {
        println!(
            "  {} [{}] led by {}: {} members, {}",
            gang.name,
            gang.gang_id,
            gang.leader,
            gang.size(),
            gang.phase
        );
    }

    let events = sim.get_recent_events(sim.tuning().simulation.event_log_days);
    println!();
    println!("Events in the log ({})", events.len());
    for (event_type, count) in count_events_by_type(&events) {
        println!("  {}: {}", event_type, count);
    }
}
