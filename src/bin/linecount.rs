use anyhow::{Context, Result};
use clap::Parser;
use serde_derive::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

use linecount::crossing::{Crossing, Direction, Heading};
use linecount::error::Error;
use linecount::stream::{replay, DumpReader};
use linecount::{CounterConfig, CounterSession, Totals};

#[derive(Parser, Debug)]
#[command(
    name = "linecount",
    about = "Counts directional line crossings from tracker dumps"
)]
struct Args {
    /// Scenario config (YAML); defaults are used when omitted
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Tracker dump(s), one frame per line
    #[arg(long, value_name = "PATH", required = true, num_args = 1..)]
    input: Vec<PathBuf>,
    /// Frame width in pixels
    #[arg(long)]
    width: u32,
    /// Frame height in pixels
    #[arg(long)]
    height: u32,
    /// Override line position (0.0 - 1.0)
    #[arg(long)]
    line: Option<f32>,
    /// Override count direction
    #[arg(long, value_parser = ["left_to_right", "right_to_left", "both"])]
    direction: Option<String>,
    /// Override cooldown frames
    #[arg(long)]
    cooldown: Option<i64>,
    /// Fail on malformed dump lines instead of skipping them
    #[arg(long)]
    strict: bool,
    /// Write every counted crossing as a JSON line
    #[arg(long, value_name = "PATH")]
    events: Option<PathBuf>,
    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct EventRecord<'a> {
    source: &'a str,
    frame: u64,
    track_id: u32,
    heading: Heading,
    from_x: f32,
    to_x: f32,
}

impl<'a> EventRecord<'a> {
    fn new(source: &'a str, frame: u64, c: &Crossing) -> Self {
        Self {
            source,
            frame,
            track_id: c.track_id,
            heading: c.heading,
            from_x: c.from_x,
            to_x: c.to_x,
        }
    }
}

#[derive(Serialize)]
struct SourceSummary {
    source: String,
    #[serde(flatten)]
    totals: Totals,
    total: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linecount=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CounterConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CounterConfig::default(),
    };

    if let Some(line) = args.line {
        config.line_position = line;
    }
    if let Some(direction) = &args.direction {
        let direction: Direction = direction.parse()?;
        config.count_direction = direction.to_string();
    }
    if let Some(cooldown) = args.cooldown {
        config.cooldown_frames = cooldown;
    }

    let mut session = CounterSession::from_config(&config, (args.width, args.height))
        .context("invalid counting configuration")?;

    let mut events = match &args.events {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => None,
    };

    let mut summaries = Vec::with_capacity(args.input.len());

    for input in &args.input {
        let source = input.display().to_string();
        let file = File::open(input).with_context(|| format!("opening dump {}", source))?;
        let mut reader =
            DumpReader::new(BufReader::new(file), (args.width, args.height)).strict(args.strict);

        info!("counting {}", source);
        session.reset();

        let totals = replay(&mut reader, &mut session, |frame, outcome| {
            if let Some(out) = events.as_mut() {
                for crossing in &outcome.delta.crossings {
                    serde_json::to_writer(&mut *out, &EventRecord::new(&source, frame.index, crossing))?;
                    writeln!(out).map_err(Error::Io)?;
                }
            }
            Ok(())
        })
        .with_context(|| format!("counting {}", source))?;

        info!(count_in = totals.count_in, count_out = totals.count_out, "finished {}", source);
        summaries.push(SourceSummary {
            source,
            totals,
            total: totals.total(),
        });
    }

    if let Some(mut out) = events {
        out.flush().context("writing events")?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    for s in &summaries {
        println!("{}", "-".repeat(30));
        println!("Final Count for {}:", s.source);
        println!("IN:    {}", s.totals.count_in);
        println!("OUT:   {}", s.totals.count_out);
        println!("TOTAL: {}", s.total);
    }
    println!("{}", "-".repeat(30));

    if summaries.len() > 1 {
        let overall = summaries
            .iter()
            .fold(Totals::default(), |acc, s| acc + s.totals);

        println!(
            "{:<40} | {:<5} | {:<5} | {:<5}",
            "Source", "IN", "OUT", "Total"
        );
        for s in &summaries {
            println!(
                "{:<40} | {:<5} | {:<5} | {:<5}",
                s.source, s.totals.count_in, s.totals.count_out, s.total
            );
        }
        println!(
            "{:<40} | {:<5} | {:<5} | {:<5}",
            "ALL",
            overall.count_in,
            overall.count_out,
            overall.total()
        );
    }

    Ok(())
}
