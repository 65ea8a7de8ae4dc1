use clap::Parser;
use colored::Colorize;
use runway_sched::config::{Config, EngineSettings};
use runway_sched::flight::{Emergency, Flight, FlightId, FlightKind, FlightStatus};
use runway_sched::scenario::Scenario;
use runway_sched::separation::WakeCategory;
use runway_sched::store::{JsonStore, MemoryStore, Store};
use runway_sched::time::{Clock, ManualClock, SystemClock, Time};
use runway_sched::weather::{Condition, Weather};
use runway_sched::{PassReport, Tower};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::{Context, Editor, Helper, Highlighter, Hinter, Validator};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tabled::settings::Style;
use tabled::Tabled;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
struct Args {
    /// JSON scenario to import on start-up
    #[arg(short, long, value_name = "FILE")]
    scenario: Option<PathBuf>,
    /// JSON store; in-memory when omitted
    #[arg(long, value_name = "FILE")]
    store: Option<PathBuf>,
    /// Log filter, e.g. "runway_sched=debug"
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,
    /// Simulated clock starting at DAY1 00:00:00, moved with `tick`
    #[arg(long)]
    sim: bool,
}

#[derive(Helper, Hinter, Highlighter, Validator)]
pub struct CompleteHelper {
    pub commands: Vec<String>,
}

impl Completer for CompleteHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, _pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let candidates = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: format!("{} ", cmd),
            })
            .collect();
        Ok((0, candidates))
    }
}

#[derive(Tabled)]
struct FlightRow {
    id: String,
    flight: String,
    airline: String,
    aircraft: String,
    wake: WakeCategory,
    #[tabled(rename = "type")]
    kind: FlightKind,
    emergency: String,
    #[tabled(rename = "fuel %")]
    fuel: u8,
    scheduled: Time,
    status: String,
    requeues: u32,
}

impl From<&Flight> for FlightRow {
    fn from(f: &Flight) -> Self {
        let emergency = if f.is_emergency() {
            f.emergency.to_string().red().bold().to_string()
        } else {
            f.emergency.to_string()
        };
        let status = match &f.status {
            FlightStatus::Scheduled { .. } => f.status.to_string().green().to_string(),
            FlightStatus::Pending(_) => f.status.to_string().yellow().to_string(),
        };
        FlightRow {
            id: f.id.chars().take(8).collect(),
            flight: f.number.clone(),
            airline: f.airline.clone(),
            aircraft: f.aircraft.clone(),
            wake: f.category,
            kind: f.kind,
            emergency,
            fuel: f.fuel,
            scheduled: f.scheduled_time,
            status,
            requeues: f.escalation,
        }
    }
}

fn paginate(content: &str) -> std::io::Result<()> {
    let mut pager = Command::new("less")
        .arg("-R")
        .stdin(Stdio::piped())
        .spawn()
        .or_else(|_| Command::new("more").stdin(Stdio::piped()).spawn())?;

    if let Some(mut stdin) = pager.stdin.take() {
        if let Err(e) = stdin.write_all(content.as_bytes()) {
            // the user quit the pager early
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(e);
            }
        }
    }
    pager.wait()?;
    Ok(())
}

fn print_table(table: tabled::Table, rows: usize) {
    let text = table.to_string();
    if rows > 20 && paginate(&text).is_ok() {
        return;
    }
    println!("{}", text);
}

/// Exact id, unique id prefix, or flight number.
fn resolve_flight(tower: &Tower, token: &str) -> Option<FlightId> {
    tower.read(|engine| {
        let flights = engine.flights();
        if let Some(f) = flights.iter().find(|f| &*f.id == token) {
            return Some(f.id.clone());
        }
        let by_prefix: Vec<&&Flight> = flights.iter().filter(|f| f.id.starts_with(token)).collect();
        if let [only] = by_prefix.as_slice() {
            return Some(only.id.clone());
        }
        flights
            .iter()
            .find(|f| f.number.eq_ignore_ascii_case(token))
            .map(|f| f.id.clone())
    })
}

fn print_report(report: &PassReport) {
    println!(
        "Pass complete: {} scheduled, {} displaced, {} requeued, {} pending.",
        report.scheduled.len().to_string().green(),
        report.displaced.len().to_string().yellow(),
        report.requeued.len().to_string().yellow(),
        report.pending.to_string().red(),
    );
    for (flight_id, reason) in &report.requeued {
        println!("  {} -> {}", flight_id, reason);
    }
}

fn open_store(config: &Config) -> runway_sched::Result<Box<dyn Store>> {
    Ok(match &config.store_path {
        Some(path) => Box::new(JsonStore::open(path)?),
        None => Box::new(MemoryStore::new()),
    })
}

fn help() {
    println!("\nAvailable Commands:");
    println!("  ls [p|s|a]                     - List flights: p - pending, s - scheduled, a - all");
    println!("  runways                        - List runways");
    println!("  weather                        - Show the current weather and separation factor");
    println!("  wind <kt> <deg>                - Set wind speed and direction");
    println!("  vis <km>                       - Set visibility");
    println!("  cond <condition>               - Set condition: {}", Condition::ALL.map(|c| c.to_string()).join(", "));
    println!("  add <number> <L|M|H|S> <arr|dep> <in-minutes> - Enqueue a new flight");
    println!("  emergency <flight> <level>     - Set emergency level: {}", Emergency::ALL.map(|e| e.to_string()).join(", "));
    println!("  fuel <flight> <pct>            - Set remaining fuel");
    println!("  toggle <runway>                - Open or close a runway");
    println!("  rm <flight>                    - Remove a flight");
    println!("  run                            - Run a scheduling pass");
    println!("  tick <minutes>                 - Advance the simulated clock and run a pass");
    println!("  reset                          - Drop all flights and free all runways");
    println!("  matrix                         - Show the separation matrix");
    println!("  help / ?                       - Show this help menu");
    println!("  exit / quit                    - Exit the tower\n");
}

fn set_weather(tower: &Tower, change: impl FnOnce(Weather) -> runway_sched::Result<Weather>) {
    match change(tower.weather()).and_then(|w| tower.set_weather(w)) {
        Ok(()) => println!("{}", tower.weather()),
        Err(e) => println!("{}", e.to_string().red()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(store) = args.store {
        config.store_path = Some(store);
    }
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::new(config.log_directive(args.log.as_deref(), rust_log.as_deref()));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let sim_clock = Arc::new(ManualClock::new(Time(0)));
    let clock: Arc<dyn Clock> = if args.sim {
        sim_clock.clone()
    } else {
        Arc::new(SystemClock)
    };

    let tower = Tower::restore(EngineSettings::default(), open_store(&config)?, clock)?;
    if let Some(path) = &args.scenario {
        tower.import(Scenario::load_from_file(path, tower.now())?)?;
        println!("Tower online. Loaded scenario from {}", path.display());
    } else {
        println!("Tower online.");
    }
    print_report(&tower.run_pass());

    let rl_config = rustyline::Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();

    let helper = CompleteHelper {
        commands: [
            "ls", "runways", "weather", "wind", "vis", "cond", "add", "emergency", "fuel", "toggle",
            "rm", "run", "tick", "reset", "matrix", "help", "exit",
        ]
        .map(String::from)
        .to_vec(),
    };

    let mut rl = Editor::with_config(rl_config)?;
    rl.set_helper(Some(helper));

    loop {
        let readline = rl.readline(">> ");
        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                rl.add_history_entry(trimmed)?;

                let parts: Vec<&str> = trimmed.split_whitespace().collect();
                match parts[0] {
                    "ls" => {
                        let flights = match parts.get(1).copied().unwrap_or("a") {
                            "p" | "pending" => tower.pending(),
                            "s" | "scheduled" => tower.scheduled(),
                            _ => tower.flights(),
                        };
                        if flights.is_empty() {
                            println!("No matching flights found.");
                        } else {
                            let rows: Vec<FlightRow> = flights.iter().map(FlightRow::from).collect();
                            let mut table = tabled::Table::new(&rows);
                            table.with(Style::rounded());
                            table.with(tabled::settings::Alignment::left());
                            print_table(table, rows.len());
                        }
                    }
                    "runways" => {
                        let runways = tower.runways();
                        let mut table = tabled::Table::new(&runways);
                        table.with(Style::rounded());
                        print_table(table, runways.len());
                    }
                    "weather" => {
                        let weather = tower.weather();
                        println!("{}", weather);
                        println!("Separation factor: {:.3}", weather.weather_factor());
                    }
                    "wind" => match (parts.get(1).map(|s| s.parse::<f64>()), parts.get(2).map(|s| s.parse::<f64>())) {
                        (Some(Ok(speed)), Some(Ok(direction))) => set_weather(&tower, |w| {
                            Weather::new(speed, direction, w.visibility, w.condition)
                        }),
                        _ => println!("Usage: wind <kt> <deg>"),
                    },
                    "vis" => match parts.get(1).map(|s| s.parse::<f64>()) {
                        Some(Ok(visibility)) => set_weather(&tower, |w| {
                            Weather::new(w.wind_speed, w.wind_direction, visibility, w.condition)
                        }),
                        _ => println!("Usage: vis <km>"),
                    },
                    "cond" => match parts.get(1) {
                        Some(name) => set_weather(&tower, |w| {
                            Weather::new(w.wind_speed, w.wind_direction, w.visibility, name.parse()?)
                        }),
                        None => println!("Usage: cond <condition>"),
                    },
                    "add" => {
                        if let [_, number, category, kind, minutes] = parts.as_slice() {
                            let parsed = category
                                .parse::<WakeCategory>()
                                .and_then(|c| Ok((c, kind.parse::<FlightKind>()?)));
                            match (parsed, minutes.parse::<u64>()) {
                                (Ok((category, kind)), Ok(minutes)) => {
                                    let at = tower.now() + minutes.saturating_mul(60);
                                    match tower.enqueue(Flight::new(*number, category, kind, at)) {
                                        Ok(id) => println!("Enqueued {} as {}.", number, id),
                                        Err(e) => println!("{}", e.to_string().red()),
                                    }
                                }
                                (Err(e), _) => println!("{}", e.to_string().red()),
                                (_, Err(_)) => println!("Minutes must be a whole number."),
                            }
                        } else {
                            println!("Usage: add <number> <L|M|H|S> <arr|dep> <in-minutes>");
                        }
                    }
                    "emergency" => match (parts.get(1), parts.get(2)) {
                        (Some(token), Some(level)) => {
                            let result = resolve_flight(&tower, token)
                                .ok_or_else(|| runway_sched::Error::UnknownFlight(Arc::from(*token)))
                                .and_then(|id| tower.set_emergency(&id, level.parse()?));
                            match result {
                                Ok(()) => println!("Emergency level of {} set to {}.", token, level.to_uppercase()),
                                Err(e) => println!("{}", e.to_string().red()),
                            }
                        }
                        _ => println!("Usage: emergency <flight> <level>"),
                    },
                    "fuel" => match (parts.get(1), parts.get(2).map(|s| s.parse::<u8>())) {
                        (Some(token), Some(Ok(fuel))) => {
                            let result = resolve_flight(&tower, token)
                                .ok_or_else(|| runway_sched::Error::UnknownFlight(Arc::from(*token)))
                                .and_then(|id| tower.set_fuel(&id, fuel));
                            if let Err(e) = result {
                                println!("{}", e.to_string().red());
                            }
                        }
                        _ => println!("Usage: fuel <flight> <pct>"),
                    },
                    "toggle" => match parts.get(1) {
                        Some(runway) => match tower.toggle_runway(&Arc::from(*runway)) {
                            Ok(true) => println!("Runway {} is now {}.", runway, "OPEN".green()),
                            Ok(false) => println!("Runway {} is now {}.", runway, "CLOSED".red()),
                            Err(e) => println!("{}", e.to_string().red()),
                        },
                        None => println!("Usage: toggle <runway>"),
                    },
                    "rm" => match parts.get(1) {
                        Some(token) => {
                            let result = resolve_flight(&tower, token)
                                .ok_or_else(|| runway_sched::Error::UnknownFlight(Arc::from(*token)))
                                .and_then(|id| tower.remove_flight(&id));
                            match result {
                                Ok(flight) => println!("Removed {}.", flight.number),
                                Err(e) => println!("{}", e.to_string().red()),
                            }
                        }
                        None => println!("Usage: rm <flight>"),
                    },
                    "run" => print_report(&tower.run_pass()),
                    "tick" => match parts.get(1).map(|s| s.parse::<u64>()) {
                        Some(Ok(minutes)) if args.sim => {
                            sim_clock.advance(minutes.saturating_mul(60));
                            println!("Clock now {}.", tower.now());
                            print_report(&tower.run_pass());
                        }
                        Some(Ok(_)) => println!("The clock only moves by hand with --sim."),
                        _ => println!("Usage: tick <minutes>"),
                    },
                    "reset" => {
                        let removed = tower.reset();
                        println!("Reset complete. {} flights removed.", removed);
                    }
                    "matrix" => {
                        tower.read(|engine| {
                            println!("{}", engine.matrix());
                            println!("Weather factor: {:.3}", engine.weather().weather_factor());
                        });
                    }
                    "help" | "?" => help(),
                    "exit" | "quit" => break,
                    _ => println!("Unknown command: {}", parts[0]),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}
