use crossterm::{
    cursor::{Hide, Show as ShowCursor},
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{BufWriter, Write, stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod app;
mod burst;
mod canvas;
mod config;
mod generator;
mod launch;
mod logging;
mod sky;
mod theme;

use app::Show;
use canvas::Canvas;
use config::{Command, Config};
use generator::CommandGenerator;
use sky::Sky;

/// Puts the terminal back however the loop ends, including on panic.
struct TerminalGuard;

impl TerminalGuard {
    fn enter<W: Write>(out: &mut W) -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(out, EnterAlternateScreen, Hide, Clear(ClearType::All), EnableMouseCapture)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), ShowCursor, LeaveAlternateScreen, DisableMouseCapture);
        let _ = terminal::disable_raw_mode();
    }
}

fn is_quit(event: &Event, typing: bool) -> bool {
    let Event::Key(key) = event else {
        return false;
    };
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }
    !typing && (key.code == KeyCode::Char('q') || key.code == KeyCode::Esc)
}

fn run_show(config: Config) -> std::io::Result<()> {
    let stdout = stdout();
    let mut stdout = BufWriter::with_capacity(1024 * 64, stdout);
    let guard = TerminalGuard::enter(&mut stdout)?;

    let (cols, rows) = terminal::size()?;
    let rng = match config.seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };
    let mut sky = Sky::new(config.theme, rng);
    sky.set_paused(config.start_paused);

    let mut show = Show::new(
        sky,
        Canvas::new(cols as usize, rows as usize, config.scale),
        config.bg_color,
    );
    if let Some(command) = config.generator {
        show = show.with_generator(Arc::new(CommandGenerator::new(command)));
    }

    let mut last_frame = Instant::now();
    let mut accumulator = 0.0f32;
    const FIXED_DT: f32 = 1.0 / 60.0;

    loop {
        if event::poll(Duration::from_millis(1))? {
            let event = event::read()?;
            if is_quit(&event, show.is_typing()) {
                break;
            }
            match event {
                Event::Resize(cols, rows) => {
                    show.resize(cols as usize, rows as usize);
                    execute!(stdout, Clear(ClearType::All))?;
                }
                other => show.handle_event(&other),
            }
        }

        let now = Instant::now();
        let frame_time = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        accumulator += frame_time;
        if accumulator > FIXED_DT * 3.0 {
            accumulator = FIXED_DT * 3.0;
        }

        while accumulator >= FIXED_DT {
            show.update(FIXED_DT);
            accumulator -= FIXED_DT;
        }

        show.render(&mut stdout)?;
    }

    log::info!("show ended after {} bursts", show.sky().bursts());
    drop(guard);
    Ok(())
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match config::parse(&args) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            eprintln!("{}", config::usage());
            return Ok(());
        }
        Err(e) => {
            eprintln!("{}", e);
            eprintln!();
            eprintln!("{}", config::usage());
            std::process::exit(1);
        }
    };

    logging::init(config.log_file.as_deref(), config.log_level)?;
    log::info!(
        "starting: theme='{}' scale={} seed={:?} generator={:?}",
        config.theme.name,
        config.scale,
        config.seed,
        config.generator
    );

    run_show(config)
}
