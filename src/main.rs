// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stepseq::app::Request;
use stepseq::control::TerminalSurface;
use stepseq::display::{status_line, DisplayEvent};
use stepseq::midi::{
    messages, print_destinations, print_sources, MidiClockInput, MidiNoteSink, MidiOutput,
    MidirPort,
};
use stepseq::sequencer::FanOutSink;
use stepseq::storage::YamlStore;
use stepseq::timing::{ClockOutput, SystemTime, TimeSource};
use stepseq::{Config, Sequencer};

/// How long a save/load banner replaces the slot number
const BANNER_MS: u64 = 1_000;

fn print_usage() {
    println!("stepseq - eight-step MIDI step sequencer");
    println!();
    println!("Usage: stepseq [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --list-midi             List available MIDI destinations (outputs)");
    println!("  --list-sources          List available MIDI sources (inputs)");
    println!("  --test-note <N>         Send a test note to MIDI destination N");
    println!("  --test-clock <N> [BPM]  Send MIDI clock to destination N at BPM (default 120)");
    println!("  --monitor <N>           Monitor MIDI input from source N");
    println!("  --run <OUT>[,<OUT>..]   Run the sequencer on one or more destinations (index or name)");
    println!("      --clock-in <SRC>    Follow MIDI clock from a source (index or name)");
    println!("      --config <PATH>     Load settings from a TOML file");
    println!("  --help                  Show this help message");
    println!();
    println!("Controls while running:");
    println!("  1-8 step keys, Space encoder push, Up/Down encoder turn, q quit");
    println!("  Tab and Shift+1-8 latch the push and keys on terminals without key release events");
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stepseq=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn send_test_note(destination: usize) -> Result<()> {
    println!("Connecting to MIDI destination {}...", destination);
    let mut output = MidirPort::new(destination)?;

    let channel = 0; // MIDI channel 1
    let note = 60; // Middle C
    let velocity = 100;

    println!("Sending test note (Middle C, velocity {}) to {}...", velocity, output.name());
    output.note_on(channel, note, velocity)?;
    println!("Note On sent");

    thread::sleep(Duration::from_millis(500));

    output.note_off(channel, note)?;
    println!("Note Off sent");

    println!("Test complete!");
    Ok(())
}

fn send_test_clock(destination: usize, bpm: u32) -> Result<()> {
    println!("Connecting to MIDI destination {}...", destination);
    let mut output = MidirPort::new(destination)?;
    let time = SystemTime::new();
    let mut clock = ClockOutput::new(bpm);

    println!("Sending MIDI clock at {} BPM for 4 beats...", clock.bpm());
    println!("PPQN: 24, Pulse interval: {:.2}ms", clock.pulse_interval_ms());

    output.send(&clock.start(time.now_ms()))?;
    println!("START sent");

    let mut last_beat = 0u64;
    while clock.beat() < 4 {
        for _ in 0..clock.tick(time.now_ms()) {
            output.send(&[messages::TIMING_CLOCK])?;
        }
        if clock.beat() != last_beat {
            last_beat = clock.beat();
            println!("Beat {}", last_beat);
        }
        thread::sleep(Duration::from_millis(1));
    }

    output.send(&clock.stop())?;
    println!("STOP sent");

    println!("Clock test complete! Sent {} beats at {} BPM", last_beat, bpm);
    Ok(())
}

fn monitor_input(source: usize) -> Result<()> {
    println!("Connecting to MIDI source {}...", source);
    let input = MidiClockInput::new(source)?;

    println!("Monitoring {} for 30 seconds...", input.port_name());
    println!();

    let time = SystemTime::new();
    while time.now_ms() < 30_000 {
        for msg in input.recv_all() {
            // Clock pulses arrive 24 times a beat; only show transport
            if msg != stepseq::midi::MidiMessage::TimingClock {
                println!("{:?}", msg);
            }
        }
        thread::sleep(Duration::from_millis(1));
    }

    println!();
    println!("Monitor complete!");
    Ok(())
}

struct RunOptions {
    outputs: Vec<String>,
    clock_in: Option<String>,
    config: Option<String>,
}

fn parse_run_options(args: &[String]) -> Result<RunOptions> {
    let outputs = args
        .get(2)
        .ok_or_else(|| anyhow!("--run requires at least one destination"))?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let mut options = RunOptions {
        outputs,
        clock_in: None,
        config: None,
    };

    let mut rest = args[3..].iter();
    while let Some(flag) = rest.next() {
        let value = rest
            .next()
            .ok_or_else(|| anyhow!("{} requires a value", flag))?
            .clone();
        match flag.as_str() {
            "--clock-in" => options.clock_in = Some(value),
            "--config" => options.config = Some(value),
            other => return Err(anyhow!("Unknown option: {}", other)),
        }
    }
    Ok(options)
}

fn run(options: RunOptions) -> Result<()> {
    let config = match &options.config {
        Some(path) => {
            Config::load(path).with_context(|| format!("Failed to load config {}", path))?
        }
        None => Config::default(),
    };

    let mut sink = FanOutSink::new();
    for spec in &options.outputs {
        let port = MidirPort::open(spec)
            .with_context(|| format!("Failed to open MIDI destination '{}'", spec))?;
        sink.push(MidiNoteSink::new(port, config.midi_channel));
    }

    let clock_in = match &options.clock_in {
        Some(spec) => Some(
            MidiClockInput::open(spec)
                .with_context(|| format!("Failed to open MIDI source '{}'", spec))?,
        ),
        None => None,
    };

    let store = YamlStore::new(&config.sequences_path);
    let mut seq = Sequencer::new(config, Box::new(store));
    let mut surface = TerminalSurface::open().context("Failed to set up terminal")?;
    info!(outputs = sink.len(), clock_in = clock_in.is_some(), "running");

    let result = seq.run_until_done(&mut sink, |seq, sink| {
        run_loop(seq, &mut surface, clock_in.as_ref(), sink)
    });
    drop(surface);
    match &result {
        Ok(()) => info!("stopped"),
        Err(e) => error!(error = %e, "stopped on error"),
    }
    result
}

fn run_loop(
    seq: &mut Sequencer,
    surface: &mut TerminalSurface,
    clock_in: Option<&MidiClockInput>,
    sink: &mut FanOutSink,
) -> Result<()> {
    let time = SystemTime::new();
    let mut banner: Option<(String, u64)> = None;
    let mut redraw = true;

    loop {
        let now = time.now_ms();

        if let Some(input) = clock_in {
            for msg in input.recv_all().iter().filter(|m| m.is_clock_message()) {
                seq.handle_midi(msg, now, sink);
            }
        }

        let frame = surface.poll().context("Failed to read terminal input")?;
        if surface.quit_requested() {
            return Ok(());
        }

        if let Some(Request::Persist) = seq.step(frame, now, sink) {
            seq.persist(now);
        }

        for event in seq.drain_display() {
            redraw = true;
            match event {
                DisplayEvent::PendingSave(slot) => banner = Some((format!("SAVE:{}", slot + 1), now)),
                DisplayEvent::Saved(slot) => banner = Some((format!("saved:{}", slot + 1), now)),
                DisplayEvent::SlotChanged(slot) => banner = Some((format!("load:{}", slot + 1), now)),
                _ => {}
            }
        }

        // The save hint stays up until the key is released
        let holding_save = seq.interpreter().pending_save(now).is_some();
        if let Some((_, shown)) = &banner {
            if !holding_save && now.saturating_sub(*shown) > BANNER_MS {
                banner = None;
                redraw = true;
            }
        }

        if redraw {
            let text = banner.as_ref().map(|(text, _)| text.as_str());
            surface
                .show(&status_line(seq.engine(), text))
                .context("Failed to draw status line")?;
            redraw = false;
        }

        thread::sleep(Duration::from_millis(1));
    }
}

fn parse_index(args: &[String], what: &str, hint: &str) -> Result<usize> {
    let Some(arg) = args.get(2) else {
        eprintln!("Error: {} requires a {} number", args[1], what);
        eprintln!("{}", hint);
        std::process::exit(1);
    };
    arg.parse()
        .map_err(|_| anyhow!("Invalid {} number: {}", what, arg))
}

fn main() -> Result<()> {
    init_logging();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("stepseq - eight-step MIDI step sequencer");
        println!("Run with --help for usage information");
        return Ok(());
    }

    match args[1].as_str() {
        "--list-midi" => {
            print_destinations();
        }
        "--list-sources" => {
            print_sources();
        }
        "--test-note" => {
            let destination =
                parse_index(&args, "destination", "Use --list-midi to see available destinations")?;
            send_test_note(destination)?;
        }
        "--test-clock" => {
            let destination =
                parse_index(&args, "destination", "Use --list-midi to see available destinations")?;
            let bpm = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(120);
            send_test_clock(destination, bpm)?;
        }
        "--monitor" => {
            let source = parse_index(&args, "source", "Use --list-sources to see available sources")?;
            monitor_input(source)?;
        }
        "--run" => {
            run(parse_run_options(&args)?)?;
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Unknown option: {}", args[1]);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
