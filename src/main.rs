use std::io::{self, stdout, Stdout};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::{Receiver, TryRecvError};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};

use depscope::app::LogicThread;
use depscope::config::Config;
use depscope::render::RenderState;
use depscope::source::{bundle::BundleSource, Sources};
use depscope::{ui, Error, Result};

const FRAME_DURATION: Duration = Duration::from_micros(16_666); // 60fps

/// depscope - live dependency graph and rollout progress for a deployment plan
#[derive(Parser, Debug)]
#[command(name = "depscope")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    DEPSCOPE_DEBUG=1     Enable debug logging (alternative to --debug)\n    DEPSCOPE_LOG         Log filter, e.g. depscope=trace")]
pub struct Cli {
    /// Debug bundle (JSON) to read resources, progress and logs from
    #[arg(short = 'b', long)]
    pub bundle: Option<PathBuf>,

    /// Seconds between progress refreshes
    #[arg(short = 'r', long)]
    pub refresh: Option<u64>,

    /// Enable debug logging (writes to ~/.depscope/depscope.log)
    #[arg(short = 'd', long)]
    pub debug: bool,
}

impl Cli {
    /// Layer command-line overrides on top of the file config.
    fn apply(&self, config: &mut Config) {
        if let Some(bundle) = &self.bundle {
            config.bundle = Some(bundle.display().to_string());
        }
        if let Some(secs) = self.refresh.filter(|s| *s > 0) {
            config.refresh_interval_secs = secs;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let debug_enabled = cli.debug || depscope::log::debug_from_env();
    let _log_guard = depscope::log::init(debug_enabled)?;

    let mut config = Config::load()?;
    cli.apply(&mut config);

    let Some(bundle) = config.bundle_path() else {
        return Err(Error::NotFound(
            "no bundle configured; pass --bundle <file> or set `bundle` in ~/.depscope/config.toml"
                .to_string(),
        ));
    };
    if !bundle.is_file() {
        return Err(Error::NotFound(format!("bundle {}", bundle.display())));
    }
    info!(bundle = %bundle.display(), debug = debug_enabled, "depscope starting");
    let sources = Sources::uniform(Arc::new(BundleSource::from_path(bundle)));

    let shutdown = Arc::new(AtomicBool::new(false));
    let (state_tx, state_rx) = crossbeam_channel::bounded::<RenderState>(1);

    let shutdown_clone = shutdown.clone();
    let logic_handle =
        thread::spawn(move || LogicThread::run(config, sources, state_tx, shutdown_clone));

    let mut terminal = setup_terminal()?;
    let result = render_loop(&mut terminal, state_rx, &shutdown);

    shutdown.store(true, Ordering::SeqCst);
    let logic_result = logic_handle
        .join()
        .map_err(|_| Error::TaskJoin("logic thread panicked".to_string()))
        .and_then(|r| r);
    restore_terminal(&mut terminal)?;

    if let Err(e) = &logic_result {
        error!(error = %e, "logic thread failed");
    }
    result.and(logic_result)
}

fn render_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state_rx: Receiver<RenderState>,
    shutdown: &AtomicBool,
) -> Result<()> {
    let mut state = RenderState::default();
    let mut last_version: u64 = 0;
    let mut last_frame = Instant::now();
    let mut dirty = true;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        match state_rx.try_recv() {
            Ok(s) => {
                dirty = dirty || s.version != last_version;
                state = s;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => break,
        }

        if last_frame.elapsed() < FRAME_DURATION {
            thread::sleep(Duration::from_micros(500));
            continue;
        }
        last_frame = Instant::now();

        if dirty {
            terminal.draw(|f| ui::draw(f, &state))?;
            last_version = state.version;
            dirty = false;
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.hide_cursor()?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(disable_raw_mode()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["depscope"]).unwrap();
        assert!(cli.bundle.is_none());
        assert!(cli.refresh.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli =
            Cli::try_parse_from(["depscope", "--bundle", "/tmp/plan.json", "--refresh", "9"]).unwrap();
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.bundle.as_deref(), Some("/tmp/plan.json"));
        assert_eq!(config.refresh_interval_secs, 9);
    }

    #[test]
    fn test_zero_refresh_ignored() {
        let cli = Cli::try_parse_from(["depscope", "-r", "0"]).unwrap();
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.refresh_interval_secs, 5);
    }

    #[test]
    fn test_debug_flag() {
        let cli = Cli::try_parse_from(["depscope", "-d"]).unwrap();
        assert!(cli.debug);
    }
}
