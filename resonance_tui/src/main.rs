use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};
use ratatui::{
    crossterm::{
        self,
        event::{self, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use resonance_core::{AbilityKind, CrystalType, GameConfig, GameState, Rgb};
use std::{
    fs::File,
    io::{self, Stdout},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON game configuration; missing fields keep their defaults
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Seed for level generation and the crystal puzzle
    #[arg(short, long)]
    seed: Option<u64>,

    /// Map width in tiles
    #[arg(long)]
    width: Option<i32>,

    /// Map height in tiles
    #[arg(long)]
    height: Option<i32>,

    /// Write logs (filtered by RUST_LOG) to this file. Without it logging is
    /// muted while the game screen is up.
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

struct App {
    game: GameState,
    /// Set by `d`; the next direction key dashes instead of stepping.
    dash_pending: bool,
    /// Last notable event, shown in the help bar.
    message: String,
    should_quit: bool,
}

impl App {
    fn new(config: GameConfig) -> Result<Self> {
        let game = GameState::with_system_clock(config).context("Invalid game configuration")?;
        info!("Started level with seed {}", game.seed());
        let message = format!("Seed {}", game.seed());
        Ok(App {
            game,
            dash_pending: false,
            message,
            should_quit: false,
        })
    }

    fn tick(&mut self) {
        let solved_before = self.game.sequence().is_complete();
        self.game.update();
        if !solved_before && self.game.sequence().is_complete() {
            self.message = "Every crystal resonates. You win!".to_string();
        }
    }

    fn on_key(&mut self, code: KeyCode) {
        if let Some((dx, dy)) = direction(code) {
            self.act(dx, dy);
            return;
        }
        match code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Esc if self.dash_pending => {
                self.dash_pending = false;
                self.message = "Dash cancelled".to_string();
            }
            KeyCode::Esc => self.quit(),
            KeyCode::Char('d') => {
                self.dash_pending = true;
                self.message = "Dash: pick a direction".to_string();
            }
            _ => {}
        }
    }

    fn act(&mut self, dx: i32, dy: i32) {
        let completed = self.game.sequence().completed_types().len();
        if self.dash_pending {
            self.dash_pending = false;
            if !self.game.use_ability(CrystalType::Red, dx, dy) {
                self.message = match self.game.ability_status(CrystalType::Red) {
                    Some(status) if !status.unlocked => "Dash is locked".to_string(),
                    _ => "Dash is not ready".to_string(),
                };
                return;
            }
        } else {
            self.game.move_player(dx, dy);
        }
        if self.game.sequence().completed_types().len() > completed {
            self.message = "A crystal type resonates!".to_string();
        }
    }

    fn quit(&mut self) {
        self.should_quit = true;
    }
}

/// Maps arrow keys, `hjkl` and the `yubn` diagonals to a step.
fn direction(code: KeyCode) -> Option<(i32, i32)> {
    match code {
        KeyCode::Left | KeyCode::Char('h') => Some((-1, 0)),
        KeyCode::Right | KeyCode::Char('l') => Some((1, 0)),
        KeyCode::Up | KeyCode::Char('k') => Some((0, -1)),
        KeyCode::Down | KeyCode::Char('j') => Some((0, 1)),
        KeyCode::Char('y') => Some((-1, -1)),
        KeyCode::Char('u') => Some((1, -1)),
        KeyCode::Char('b') => Some((-1, 1)),
        KeyCode::Char('n') => Some((1, 1)),
        _ => None,
    }
}

fn load_config(args: &Args) -> Result<GameConfig> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => GameConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(width) = args.width {
        config.dungeon.map_width = width;
    }
    if let Some(height) = args.height {
        config.dungeon.map_height = height;
    }
    Ok(config)
}

fn read_config(path: &Path) -> Result<GameConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Installs the logger. Returns `true` when output goes to a file.
fn init_logging(log_file: Option<&Path>) -> Result<bool> {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(log_file.is_some())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let logs_to_file = init_logging(args.log_file.as_deref())?;
    let config = load_config(&args)?;

    // Build the game before touching the terminal so errors print normally
    let mut app = App::new(config)?;

    // stderr shares the terminal with the alternate screen
    let level = log::max_level();
    if !logs_to_file {
        log::set_max_level(LevelFilter::Off);
    }
    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app);
    restore_terminal(&mut terminal)?;
    log::set_max_level(level);
    result
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key.code);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn to_color(Rgb(r, g, b): Rgb) -> Color {
    Color::Rgb(r, g, b)
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(frame.area());
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(32)])
        .split(main_layout[0]);

    render_map(frame, top[0], &app.game);
    render_status(frame, top[1], &app.game);

    let help = format!(
        "{} | move: arrows/hjkl/yubn  dash: d+dir  quit: q/Esc",
        app.message
    );
    let help_text = Paragraph::new(help)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[1]);
}

/// Renders the puzzle state and abilities.
fn render_status(frame: &mut Frame, area: Rect, game: &GameState) {
    let sequence = game.sequence();
    let matched = sequence.current_sequence().len();

    let mut lines = vec![Line::from("Target:")];
    let mut target: Vec<Span> = Vec::new();
    for (i, crystal_type) in sequence.target_sequence().iter().enumerate() {
        let mut style = Style::default().fg(to_color(crystal_type.color()));
        if i < matched {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        } else if i == matched {
            style = style.bold();
        }
        target.push(Span::styled(format!("{} ", crystal_type.glyph()), style));
    }
    if target.is_empty() {
        target.push(Span::styled("solved", Style::default().fg(Color::Green)));
    }
    lines.push(Line::from(target));
    lines.push(Line::from(format!(
        "Progress: {:.0}%",
        game.progress() * 100.0
    )));
    lines.push(Line::from(""));

    lines.push(Line::from("Completed:"));
    for crystal_type in sequence.completed_types() {
        lines.push(Line::from(Span::styled(
            format!(" {} {}", crystal_type.glyph(), crystal_type.name()),
            Style::default().fg(to_color(crystal_type.color())),
        )));
    }
    lines.push(Line::from(""));

    lines.push(Line::from("Abilities:"));
    let now = game.now();
    for (crystal_type, ability) in game.player().abilities.iter() {
        let name = match ability.kind {
            AbilityKind::Dash { distance } => format!("Dash ({})", distance),
        };
        let cooldown = ability.cooldown_remaining(now);
        let state = if !ability.is_unlocked {
            "locked".to_string()
        } else if cooldown.is_zero() {
            "ready".to_string()
        } else {
            format!("{} ms", cooldown.as_millis())
        };
        lines.push(Line::from(Span::styled(
            format!(" {}: {}", name, state),
            Style::default().fg(to_color(crystal_type.color())),
        )));
    }

    let active: Vec<Line> = game
        .crystals()
        .values()
        .filter(|c| c.is_active())
        .map(|c| {
            Line::from(Span::styled(
                format!(
                    " {} {:.1}s",
                    c.crystal_type.name(),
                    c.time_remaining(now).unwrap_or_default().as_secs_f32()
                ),
                Style::default().fg(to_color(c.color())),
            ))
        })
        .collect();
    if !active.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from("Active:"));
        lines.extend(active);
    }

    let status = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Resonance"));
    frame.render_widget(status, area);
}

/// Renders the dungeon map onto the frame.
fn render_map(frame: &mut Frame, area: Rect, game: &GameState) {
    let map = game.map();
    let player = game.player_position();

    let mut lines: Vec<Line> = Vec::with_capacity(map.height());
    for y in 0..map.height() as i32 {
        let mut spans: Vec<Span> = Vec::with_capacity(map.width());
        for x in 0..map.width() as i32 {
            if player.x == x && player.y == y {
                spans.push(Span::styled("@", Style::default().fg(Color::White).bold()));
                continue;
            }
            if let Some(crystal) = game.crystal_at((x, y).into()) {
                let mut style = Style::default().fg(to_color(crystal.color()));
                if crystal.is_active() {
                    style = style.bold().add_modifier(Modifier::REVERSED);
                }
                spans.push(Span::styled(crystal.glyph().to_string(), style));
                continue;
            }
            match map.get(x, y) {
                Some(tile) => spans.push(Span::styled(
                    tile.glyph.to_string(),
                    Style::default().fg(to_color(tile.color)),
                )),
                None => spans.push(Span::raw(" ")),
            }
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Dungeon").borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(map_paragraph, area);
}
