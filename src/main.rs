use clap::{Arg, ArgAction, ArgMatches, Command};
use color_eyre::{eyre::eyre, Result};
use combowatch::controller::device_session::{DeviceSession, InputBackend, SessionGuard};
use combowatch::controller::gilrs_backend::GilrsBackend;
use combowatch::controller::probe::{ProbeReport, Prober};
use combowatch::controller::{ActionEvent, ControllerHandle, LoopExit};
use combowatch::persistence::config_file::{default_config_path, load_config, write_config};
use combowatch::persistence::RawControllerConfig;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let matches = cli().get_matches();
    let config_path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(default_config_path);

    match matches.subcommand() {
        Some(("probe", sub)) => run_probe(&config_path, sub).await,
        Some(("init-config", sub)) => {
            write_config(
                &config_path,
                &RawControllerConfig::default(),
                sub.get_flag("force"),
            )
            .await?;
            Ok(())
        }
        _ => run_listener(&config_path).await,
    }
}

fn cli() -> Command {
    Command::new("combowatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Turns gamepad button combos into named actions")
        .arg(
            Arg::new("config")
                .long("config")
                .help("Path to controller_config.toml")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(Command::new("run").about("Listen for combos and report actions (default)"))
        .subcommand(
            Command::new("probe")
                .about("Print the index of every button pressed and trigger movement")
                .arg(
                    Arg::new("buttons")
                        .long("buttons")
                        .help("Number of button indices to watch")
                        .value_parser(clap::value_parser!(u16))
                        .default_value("15"),
                ),
        )
        .subcommand(
            Command::new("init-config")
                .about("Write the default configuration file")
                .arg(
                    Arg::new("force")
                        .long("force")
                        .help("Overwrite an existing file")
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

fn gilrs_backend() -> Result<Box<dyn InputBackend>, combowatch::controller::SessionError> {
    Ok(Box::new(GilrsBackend::new()?))
}

fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, stopping"),
            Err(e) => error!("Unable to listen for Ctrl-C: {}", e),
        }
        token.cancel();
    });
}

async fn run_listener(config_path: &Path) -> Result<()> {
    let config = load_config(config_path).await?;

    let (action_tx, mut action_rx) = mpsc::channel::<ActionEvent>(100);
    let handle = ControllerHandle::spawn(&config, gilrs_backend, action_tx)
        .await
        .map_err(|e| eyre!("Failed to spawn controller: {}", e))?;
    cancel_on_ctrl_c(handle.cancel_token());

    // The overlay and playback glue subscribe here; without them every action is logged
    let consumer = tokio::spawn(async move {
        while let Some(action) = action_rx.recv().await {
            info!(
                "Action {} (cycle {}) at {}",
                action.name,
                action.tick,
                action.timestamp.format("%H:%M:%S.%3f")
            );
        }
        debug!("Action channel closed");
    });

    let exit = handle.join().await?;
    if let Err(e) = consumer.await {
        warn!("Action consumer ended abnormally: {}", e);
    }

    match exit {
        LoopExit::Stopped => info!("Stopped"),
        LoopExit::Disconnected => warn!("Gamepad disconnected"),
    }
    Ok(())
}

async fn run_probe(config_path: &Path, args: &ArgMatches) -> Result<()> {
    let config = load_config(config_path).await?;
    let button_count = args.get_one::<u16>("buttons").copied().unwrap_or(15);
    let mut prober = Prober::new(button_count)?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    info!("Press buttons to see their index, Ctrl-C to finish");
    tokio::task::spawn_blocking(move || -> Result<LoopExit> {
        let session = DeviceSession::create(gilrs_backend()?, &config.trigger_axes).open()?;
        let mut guard = SessionGuard::new(session);

        let exit = loop {
            if cancel.is_cancelled() {
                break LoopExit::Stopped;
            }
            let Some(session) = guard.active() else {
                break LoopExit::Disconnected;
            };
            if !session.poll() {
                break LoopExit::Disconnected;
            }
            for report in prober.observe(session.input()) {
                match report {
                    ProbeReport::ButtonPressed(button) => info!("Button pressed: ID {}", button),
                    ProbeReport::Trigger { axis, percent } => {
                        info!("Trigger axis {}: {}%", axis, percent)
                    }
                }
            }
            std::thread::sleep(config.poll_interval);
        };

        guard.close();
        Ok(exit)
    })
    .await??;

    info!("Button test finished");
    Ok(())
}
