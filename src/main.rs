use std::{error::Error, path::PathBuf, process, time::Duration};

use clap::{command, Parser, ValueHint};
use log::{debug, error, info, LevelFilter};
use url::Url;

use sharelink::{
    config::Config,
    events::{self, Event},
    selection::SelectionState,
    session::Session,
    signal,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Shared text containing the link
    ///
    /// Only the first link is used. It must point to one of the accepted
    /// domains.
    text: String,

    /// Configuration file
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, env = "SHARELINK_CONFIG")]
    config: Option<PathBuf>,

    /// Server base URL
    ///
    /// Overrides the server from the configuration file.
    ///
    /// [default: http://localhost:8085/]
    #[arg(short, long, value_hint = ValueHint::Url, env = "SHARELINK_SERVER")]
    server: Option<Url>,

    /// Exclude a track from the submission
    ///
    /// Tracks are numbered from zero, as listed. May be repeated.
    #[arg(short = 'x', long, value_name = "TRACK")]
    exclude: Vec<usize>,

    /// Select the variant to download for a track
    ///
    /// Both are numbered from zero, as listed. May be repeated.
    #[arg(long, value_name = "TRACK:VARIANT", value_parser = parse_variant)]
    variant: Vec<(usize, usize)>,

    /// List the tracks and variants without submitting
    #[arg(short, long, default_value_t = false)]
    list_only: bool,

    /// Seconds to keep following progress after the job finished
    ///
    /// [default: 5]
    #[arg(long, value_name = "SECONDS")]
    grace_period: Option<u64>,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Parses a `TRACK:VARIANT` pair.
fn parse_variant(value: &str) -> Result<(usize, usize), String> {
    let (track, variant) = value
        .split_once(':')
        .ok_or_else(|| format!("expected TRACK:VARIANT, got {value}"))?;

    let track = track
        .trim()
        .parse()
        .map_err(|e| format!("invalid track {track}: {e}"))?;
    let variant = variant
        .trim()
        .parse()
        .map_err(|e| format!("invalid variant {variant}: {e}"))?;

    Ok((track, variant))
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        // Note: if you change the default logging level here, then you should
        // probably also change the verbosity levels below.
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            0 => {
                // Quiet and verbose are mutually exclusive, and `verbose` is 0
                // by default. So this arm means: quiet mode.
                LevelFilter::Warn
            }
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module(module_path!(), level);
    }

    logger.init();
}

/// Builds the configuration from the file and command line overrides.
fn load_config(args: &Args) -> sharelink::error::Result<Config> {
    let mut config = match args.config {
        Some(ref path) => {
            debug!("loading configuration from {}", path.display());
            Config::from_file(path)?
        }
        None => Config::default(),
    };

    if let Some(ref server) = args.server {
        config.set_server(server)?;
    }

    if let Some(seconds) = args.grace_period {
        config.grace_period = Duration::from_secs(seconds);
    }

    Ok(config)
}

/// Prints the tracks and their variants, marking the selected ones.
fn print_selection(selection: &SelectionState) {
    for (i, track) in selection.tracks().iter().enumerate() {
        let included = if track.is_included() { 'x' } else { ' ' };
        println!("[{included}] {i}: {track}");

        for (j, variant) in track.variants().iter().enumerate() {
            let selected = if j == track.selected_variant_index() {
                '*'
            } else {
                ' '
            };
            println!("     {selected} {j}: {variant}");
        }
    }
}

/// Runs the session stages on behalf of the user.
async fn drive(session: &mut Session, args: &Args) -> sharelink::error::Result<()> {
    session.open(&args.text).await?;

    for &track in &args.exclude {
        session.set_included(track, false)?;
    }
    for &(track, variant) in &args.variant {
        session.set_variant(track, variant)?;
    }
    if let Some(selection) = session.selection() {
        print_selection(selection);
    }

    if args.list_only {
        session.abort().await;
        return Ok(());
    }

    session.submit().await?;
    session.finish().await
}

/// Main application loop.
///
/// # Errors
///
/// This function returns an error when the configuration is invalid, or when
/// any stage of the session fails before the job was submitted.
async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args)?;
    let mut signals = signal::Handler::new()?;

    let (event_tx, mut event_rx) = events::channel();
    let mut session = Session::new(config, event_tx)?;

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                Event::Closed => debug!("progress subscription closed"),
                // The session follows up with a notice.
                Event::Failed { detail } => debug!("progress subscription failed: {detail}"),
                event => println!("{event}"),
            }
        }
    });

    let result = tokio::select! {
        // Prioritize shutdown signals.
        biased;

        signal = signals.recv() => {
            info!("{signal} received, shutting down gracefully");
            session.abort().await;
            Ok(())
        }

        result = drive(&mut session, &args) => result,
    };

    // Closes the event channel once the last event is out.
    drop(session);
    printer.await?;

    Ok(result?)
}

/// Main entry point of the application.
///
/// This function initializes the logger facade, parses the command line
/// arguments, and starts the main application loop.
#[tokio::main]
async fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {:#?}", args);

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    info!("starting {name}/{version}; {BUILD_PROFILE}");

    if let Err(e) = run(args).await {
        error!("{e}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_pairs() {
        assert_eq!(parse_variant("0:1"), Ok((0, 1)));
        assert_eq!(parse_variant(" 2 : 3 "), Ok((2, 3)));
        assert!(parse_variant("1").is_err());
        assert!(parse_variant("a:1").is_err());
        assert!(parse_variant("1:-1").is_err());
    }

    #[test]
    fn command_line_overrides() {
        let args = Args::parse_from([
            "sharelink",
            "--server",
            "https://media.example.com/",
            "--grace-period",
            "1",
            "--variant",
            "0:2",
            "-x",
            "1",
            "https://youtu.be/abc123",
        ]);
        assert_eq!(args.variant, [(0, 2)]);
        assert_eq!(args.exclude, [1]);

        let config = load_config(&args).unwrap();
        assert_eq!(config.grace_period, Duration::from_secs(1));
        assert_eq!(
            config.progress_url.as_str(),
            "wss://media.example.com/ws/progress"
        );
    }
}
