use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use launch_window::compute::ThreadPoolFacility;
use launch_window::config::load_scenario;
use launch_window::export::epoch::BaseEpoch;
use launch_window::export::grid::{write_grid, writer_for_path};
use launch_window::export::image::write_png;
use launch_window::export::sidecar::{DatedSolution, write_json};
use launch_window::transfer::ephemeris::request_from_scenario;
use launch_window::transfer::{
    ColumnResult, GridAxes, GridScan, InteractionMapper, ScanState, vessel,
};

/// Scan a porkchop grid for a scenario and export the results.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Porkchop scan over departure delay and time of flight"
)]
struct Cli {
    /// Scenario manifest (YAML or TOML)
    #[arg(long)]
    scenario: PathBuf,

    /// Rendered porkchop frame (PNG)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pixels per grid cell in the PNG
    #[arg(long, default_value_t = 4)]
    scale: u32,

    /// Grid CSV export (use '-' for stdout)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Commit a pointer query at normalised X,Y and print the transfer as JSON
    #[arg(long, value_parser = parse_point)]
    pick: Option<(f64, f64)>,

    /// Worker threads (defaults to the scenario, then to the CPU count)
    #[arg(long)]
    threads: Option<usize>,

    /// Stall timeout per column in milliseconds; 0 waits forever
    #[arg(long)]
    column_timeout_ms: Option<u64>,
}

fn parse_point(text: &str) -> Result<(f64, f64), String> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{text}'"))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|err| format!("invalid coordinate '{value}': {err}"))
    };
    Ok((parse(x)?, parse(y)?))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let scenario = load_scenario(&cli.scenario)
        .with_context(|| format!("loading scenario {}", cli.scenario.display()))?;
    let epoch = BaseEpoch::parse(&scenario.base_epoch)?;
    let vessel = vessel::from_config(&scenario.vessel);
    let max_delta_v = vessel.max_delta_v_km_s();
    let request = request_from_scenario(&scenario, max_delta_v)?;

    let threads = cli.threads.or(scenario.scheduler.worker_threads);
    let timeout_ms = match cli.column_timeout_ms {
        Some(0) => None,
        Some(ms) => Some(ms),
        None => scenario.scheduler.column_timeout_ms,
    };
    let facility = Arc::new(ThreadPoolFacility::<ColumnResult>::new(threads)?);
    info!(
        scenario = %scenario.name,
        vessel = %vessel.name,
        max_delta_v,
        threads = facility.threads(),
        "scenario loaded"
    );

    let mut scan =
        GridScan::new(facility).with_column_timeout(timeout_ms.map(Duration::from_millis));
    scan.set_request(request.clone())?;
    let state = scan.run_to_completion();
    if state != ScanState::Completed {
        bail!("scan ended in state {state:?}");
    }
    let progress = scan.progress();

    if let Some(path) = &cli.output {
        write_png(path, &scan.frame(), cli.scale)?;
        info!(path = %path.display(), "wrote porkchop frame");
    }
    if let Some(path) = &cli.csv {
        let writer = writer_for_path(path)?;
        let rows = write_grid(writer, &epoch, request.min_tof, scan.columns())?;
        info!(path = %path.display(), rows, "wrote porkchop grid");
    }

    if let Some((x, y)) = cli.pick {
        let mut mapper =
            InteractionMapper::new(GridAxes::from(&request), scenario.scheduler.hover_rate_hz);
        let selection = scan.selection();
        let Some(solution) = mapper.commit(x, y, &request, &vessel, &selection) else {
            bail!("selection was cleared before the transfer was published");
        };
        let dated = DatedSolution::new(
            &epoch,
            solution.departure_day,
            solution.arrival_day,
            &*solution,
        );
        let mut stdout = io::stdout().lock();
        write_json(&mut stdout, &dated)?;
        writeln!(stdout)?;
        return Ok(());
    }

    println!("Scenario: {} ({})", scenario.name, vessel.name);
    println!(
        "Grid: {} delays x {} flight times, {} columns scanned",
        request.width(),
        request.height(),
        progress.completed
    );
    println!("Feasible: {}", if progress.feasible { "yes" } else { "no" });
    match progress.best {
        Some(best) => println!(
            "Best: depart {} (day {}), {} days in flight, dv {:.3} km/s",
            epoch.format_day(best.delay),
            best.delay,
            best.tof,
            best.delta_v
        ),
        None => println!("Best: none within {max_delta_v:.3} km/s"),
    }
    Ok(())
}
