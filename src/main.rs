//! trackbus - client for the Märklin CS2 CAN track bus
//!
//! Usage:
//!   trackbus                        Interactive shell on stdin
//!   trackbus serve                  Shell over TCP (localhost)
//!   trackbus monitor [--json]       Print every frame on the bus
//!   trackbus send "<message>"       Send one raw message
//!   trackbus run <command...>       Run one shell command
//!   trackbus init [--force]         Write the config file
//!
//! Transport selection: `--host` (CS2 UDP), `--port` (SLCAN serial),
//! `--loopback`, or the `[transport]` section of the config file.

use anyhow::{bail, Result};
use clap::Parser;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use trackbus::cli::{Cli, Command};
use trackbus::constants::CHANNEL_CAPACITY;
use trackbus::logging::{self, TrafficEntry};
use trackbus::shell::{self, server, ShellSession};
use trackbus::transport::{self, Transport};
use trackbus::{config, Config, Message, TrackController, TrackError};

type Controller = TrackController<Box<dyn Transport>>;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // `init` may name a file that does not exist yet
    let initializing = matches!(cli.command, Some(Command::Init { .. }));
    let config_file = cli
        .config
        .clone()
        .or_else(config::default_config_file)
        .filter(|path| !initializing || path.exists());
    let mut config = match config_file {
        Some(path) => config::load_from(&path)?,
        None => Config::default(),
    };
    cli.apply(&mut config);

    logging::init_tracing(cli.verbose || config.controller.debug);
    config.validate()?;

    if let Some(Command::Init { force }) = cli.command {
        let path = match cli.config.clone() {
            Some(path) => path,
            None => config::config_path()?,
        };
        config::save_new(&config, &path, force)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let transport = transport::open(&config.transport)?;
    let mut controller = TrackController::new(transport, &config.controller);
    controller.begin();

    match cli.command.clone().unwrap_or(Command::Shell) {
        Command::Shell => {
            let stdin = std::io::stdin();
            shell::run_interactive(&mut controller, stdin.lock(), std::io::stdout().lock())?;
        }
        Command::Serve { .. } => run_serve(controller, config.shell.listen_port)?,
        Command::Monitor { json } => run_monitor(&mut controller, json)?,
        Command::Send { text, wait, json } => {
            let mut message: Message = text.parse()?;
            if wait {
                let reply = controller.request(&message)?;
                message.hash = controller.hash();
                println!("{}", TrafficEntry::outgoing(&message).render(json));
                println!("{}", TrafficEntry::incoming(&reply).render(json));
            } else {
                controller.send(&mut message)?;
                println!("{}", TrafficEntry::outgoing(&message).render(json));
            }
        }
        // Written before the transport was opened
        Command::Init { .. } => {}
        Command::Run { words } => {
            let line = words.join(" ");
            match ShellSession::new().handle_line(&mut controller, &line)? {
                Some(reply) => println!("{}", reply),
                None => bail!("unrecognized command: {}", line),
            }
        }
    }

    Ok(())
}

fn new_runtime() -> Result<Runtime> {
    Ok(Runtime::new().map_err(|e| TrackError::Runtime { source: e })?)
}

/// Set the returned flag on SIGINT/SIGTERM (Ctrl-C elsewhere)
fn spawn_shutdown_handler(rt: &Runtime) -> Arc<AtomicBool> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    #[cfg(unix)]
    rt.spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        let (Ok(mut sigterm), Ok(mut sigint)) =
            (signal(SignalKind::terminate()), signal(SignalKind::interrupt()))
        else {
            return;
        };

        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
        shutdown_clone.store(true, Ordering::SeqCst);
    });

    #[cfg(not(unix))]
    rt.spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown_clone.store(true, Ordering::SeqCst);
    });

    shutdown
}

/// Serve the shell over TCP; the controller moves to its own thread
fn run_serve(mut controller: Controller, port: u16) -> Result<()> {
    let rt = new_runtime()?;
    let shutdown = spawn_shutdown_handler(&rt);

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let controller_thread = std::thread::Builder::new()
        .name("controller".into())
        .spawn(move || server::run_controller(&mut controller, rx))?;

    rt.block_on(async {
        let listener = server::bind_listener(port).await?;
        eprintln!("Shell listening on 127.0.0.1:{}", port);
        server::run_server_with_listener(listener, tx, shutdown).await
    })?;

    // Open connections keep the channel alive; don't wait for them
    rt.shutdown_timeout(Duration::from_millis(500));
    if controller_thread.join().is_err() {
        bail!("controller thread panicked");
    }
    Ok(())
}

/// Dump every received frame until interrupted
fn run_monitor(controller: &mut Controller, json: bool) -> Result<()> {
    let rt = new_runtime()?;
    let shutdown = spawn_shutdown_handler(&rt);
    let mut out = std::io::stdout().lock();

    while !shutdown.load(Ordering::Relaxed) {
        match controller.receive() {
            Some(message) => {
                writeln!(out, "{}", TrafficEntry::incoming(&message).render(json))?;
                out.flush()?;
            }
            None => std::thread::sleep(Duration::from_millis(1)),
        }
    }

    let stats = controller.stats();
    eprintln!(
        "{} frames received, {} sent",
        stats.frames_received, stats.frames_sent
    );
    Ok(())
}
