mod console;

use std::{
    io::Write,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use kensho_core::{
    audio::{parse_selection, SilentSink},
    chime::MemoryToneOutput,
    reveal::FixedMotion,
    AppConfig, CoreEvent, FocusTimer, Host, ManualClock, PatternConfig, SessionState,
    SoundLibrary, SoundId, SystemClock,
};
use tracing_subscriber::EnvFilter;

use console::{ConsoleSink, TerminalBell};

/// Longest the real-time loop sleeps between pumps.
const MAX_SLEEP_MS: u64 = 250;

fn main() -> kensho_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config_path = cli.config.clone();
    let config = AppConfig::load_or_default(&config_path);

    match cli.command {
        Commands::Run { session, svg } => run_live(session.apply(config)?, svg.as_deref()),
        Commands::Simulate { session, hidden, frames } => {
            run_simulated(session.apply(config)?, hidden, frames)
        }
        Commands::Pattern {
            lines,
            multiplier,
            progress,
            output,
        } => run_pattern(&config.pattern, lines, multiplier, progress, output.as_deref()),
        Commands::Config { session, write } => {
            let config = session.apply(config)?;
            if write {
                config.save(&config_path)?;
                tracing::info!(path = %config_path.display(), "settings saved");
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn run_live(config: AppConfig, svg: Option<&Path>) -> kensho_core::Result<()> {
    let mut timer = FocusTimer::new(
        &config,
        Host {
            clock: Box::new(SystemClock::new()),
            audio: Box::new(ConsoleSink::default()),
            tone: Box::new(TerminalBell::new()),
            motion: Box::new(FixedMotion(config.timer.reduced_motion)),
        },
    )?;
    let selection = disable_missing_sounds(&mut timer, &config);
    timer.start(selection)?;

    loop {
        timer.pump();
        for event in timer.take_events() {
            print_live(&event);
        }
        if timer.state() == SessionState::Complete && timer.timeline().is_empty() {
            break;
        }
        let now = timer.now_ms();
        let wait = timer
            .next_deadline()
            .map(|due| due.saturating_sub(now))
            .unwrap_or(MAX_SLEEP_MS)
            .clamp(1, MAX_SLEEP_MS);
        thread::sleep(Duration::from_millis(wait));
    }
    println!();

    if let (Some(path), Some(pattern)) = (svg, timer.pattern()) {
        std::fs::write(path, kensho_core::render::render_revealed(pattern))?;
        tracing::info!(path = %path.display(), "pattern written");
    }
    Ok(())
}

fn run_simulated(config: AppConfig, hidden: bool, frames: bool) -> kensho_core::Result<()> {
    tracing::info!(
        minutes = config.timer.duration_minutes,
        hidden,
        "simulating session in virtual time"
    );
    let clock = ManualClock::new();
    let mut timer = FocusTimer::new(
        &config,
        Host {
            clock: Box::new(clock.clone()),
            audio: Box::new(SilentSink),
            tone: Box::new(MemoryToneOutput::default()),
            motion: Box::new(FixedMotion(config.timer.reduced_motion)),
        },
    )?;
    let selection = disable_missing_sounds(&mut timer, &config);
    timer.start(selection)?;
    timer.set_visible(!hidden);

    loop {
        for event in timer.take_events() {
            if frames || !matches!(event, CoreEvent::Reveal { .. }) {
                println!("{:>9} {}", clock_label(timer.now_ms()), serde_json::to_string(&event)?);
            }
        }
        match timer.next_deadline() {
            Some(due) => {
                clock.set(due);
                timer.pump();
            }
            None => break,
        }
    }
    Ok(())
}

fn run_pattern(
    base: &PatternConfig,
    lines: Option<usize>,
    multiplier: Option<usize>,
    progress: f64,
    output: Option<&Path>,
) -> kensho_core::Result<()> {
    if !(0.0..=1.0).contains(&progress) {
        return Err("progress must lie within [0, 1]".into());
    }
    let config = PatternConfig {
        line_count: lines.unwrap_or(base.line_count),
        multiplier: multiplier.unwrap_or(base.multiplier),
        ..base.clone()
    };
    let pattern = config.generate()?;
    let svg = kensho_core::render_svg(&pattern, kensho_core::reveal::reveal_fraction(progress, false));
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
            tracing::info!(
                path = %path.display(),
                segments = pattern.segments.len(),
                total_length = pattern.total_length(),
                "pattern written"
            );
        }
        None => println!("{svg}"),
    }
    Ok(())
}

/// Disables channels whose source is missing and returns the selection that
/// survives.
fn disable_missing_sounds(timer: &mut FocusTimer, config: &AppConfig) -> Option<SoundId> {
    let library = SoundLibrary::from_sources(&config.sounds);
    library
        .missing()
        .into_iter()
        .fold(config.timer.sound, |selection, sound| {
            timer.channel_unavailable(sound, selection)
        })
}

fn print_live(event: &CoreEvent) {
    match event {
        CoreEvent::Remaining { display, .. } => {
            print!("\r  {display}  ");
            let _ = std::io::stdout().flush();
        }
        CoreEvent::Status { notice } => tracing::info!(?notice, "status"),
        CoreEvent::ChannelDisabled { sound, reverted } => {
            tracing::warn!(%sound, reverted, "sound disabled")
        }
        _ => {}
    }
}

fn clock_label(ms: u64) -> String {
    format!("{}.{:03}s", ms / 1_000, ms % 1_000)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Focus timer with a generative pattern and ambient sound", long_about = None)]
struct Cli {
    /// Settings file; missing or corrupt files fall back to defaults.
    #[arg(short, long, global = true, default_value = "kensho.json")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a focus session in real time.
    Run {
        #[command(flatten)]
        session: SessionArgs,
        /// Write the finished pattern as SVG to this path.
        #[arg(long)]
        svg: Option<PathBuf>,
    },
    /// Replay a whole session in virtual time and print every event.
    Simulate {
        #[command(flatten)]
        session: SessionArgs,
        /// Suspend the visual loop, as a hidden view would.
        #[arg(long)]
        hidden: bool,
        /// Include per-frame reveal events.
        #[arg(long)]
        frames: bool,
    },
    /// Print the generated pattern as SVG.
    Pattern {
        #[arg(long)]
        lines: Option<usize>,
        #[arg(long)]
        multiplier: Option<usize>,
        /// Reveal progress in [0, 1].
        #[arg(long, default_value_t = 1.0)]
        progress: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the effective settings, optionally saving them.
    Config {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long)]
        write: bool,
    },
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// Session length in minutes.
    #[arg(short, long)]
    minutes: Option<f64>,
    /// Ambient sound: rain, forest, waves or none.
    #[arg(short, long)]
    sound: Option<String>,
    /// Show the finished pattern instead of animating it.
    #[arg(long)]
    reduced_motion: bool,
}

impl SessionArgs {
    fn apply(self, mut config: AppConfig) -> kensho_core::Result<AppConfig> {
        if let Some(minutes) = self.minutes {
            config.timer.duration_minutes = minutes;
        }
        if let Some(sound) = self.sound {
            config.timer.sound = parse_selection(&sound)?;
        }
        if self.reduced_motion {
            config.timer.reduced_motion = true;
        }
        config.validate()?;
        Ok(config)
    }
}
