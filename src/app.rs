use crate::canvas::Canvas;
use crate::generator::{GenerationError, ThemeGenerator};
use crate::sky::Sky;
use crate::theme::{Pattern, Rgb, Theme, parse_hex_color};
use crossterm::{
    cursor::MoveTo,
    event::{Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind},
    queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
};
use std::io::Write;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

const CURATED_SECONDS: f32 = 3.0;
const NOTICE_SECONDS: f32 = 4.0;
const FREQUENCY_STEP: f32 = 0.005;
const SIZE_STEP: f32 = 0.1;
const COUNT_STEP: isize = 10;

const HUD_TEXT: (u8, u8, u8) = (203, 213, 225);
const HUD_ACCENT: (u8, u8, u8) = (192, 132, 252);

const HELP_LINES: [&str; 8] = [
    "click   launch a shell at the pointer",
    "space   pause / resume",
    "1-4 p   choose / cycle pattern",
    "+ -     launch frequency",
    "[ ]     particle size      , .  density",
    "c e     pick / edit color  a x  add / remove",
    "r       reset theme        g    mood prompt",
    "i       close this help    q    quit",
];

#[derive(Debug, Clone, PartialEq)]
enum Status {
    Idle,
    Generating,
    Curated { remaining: f32 },
}

type Pending = Receiver<Result<Theme, GenerationError>>;

/// What the bottom input line is collecting.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Entry {
    Mood,
    Color(usize),
}

#[derive(Debug, Clone, PartialEq)]
struct Prompt {
    entry: Entry,
    text: String,
}

pub struct Show {
    sky: Sky,
    canvas: Canvas,
    bg_color: Rgb,
    generator: Option<Arc<dyn ThemeGenerator>>,
    pending: Option<Pending>,
    status: Status,
    prompt: Option<Prompt>,
    notice: Option<(String, f32)>,
    show_help: bool,
    selected_color: usize,
}

impl Show {
    pub fn new(sky: Sky, canvas: Canvas, bg_color: Rgb) -> Self {
        Self {
            sky,
            canvas,
            bg_color,
            generator: None,
            pending: None,
            status: Status::Idle,
            prompt: None,
            notice: None,
            show_help: false,
            selected_color: 0,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn ThemeGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn sky(&self) -> &Sky {
        &self.sky
    }

    /// True while the input line is open and every key belongs to it.
    pub fn is_typing(&self) -> bool {
        self.prompt.is_some()
    }

    pub fn resize(&mut self, cols: usize, rows: usize) {
        log::info!(
            "resize to {}x{}, keeping {} rockets and {} particles",
            cols,
            rows,
            self.sky.rockets().len(),
            self.sky.particles().len()
        );
        self.canvas.resize(cols, rows);
    }

    /// One fixed step: collect generator results, age the HUD, run one sky frame.
    pub fn update(&mut self, dt: f32) {
        self.poll_generation();

        if let Status::Curated { remaining } = &mut self.status {
            *remaining -= dt;
            if *remaining <= 0.0 {
                self.status = Status::Idle;
            }
        }
        if let Some((_, remaining)) = &mut self.notice {
            *remaining -= dt;
            if *remaining <= 0.0 {
                self.notice = None;
            }
        }

        self.sky.frame(&mut self.canvas);
    }

    fn poll_generation(&mut self) {
        let Some(rx) = &self.pending else {
            return;
        };

        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                // The worker panicked before sending anything
                log::error!("theme generator stopped without a result");
                self.pending = None;
                self.status = Status::Idle;
                return;
            }
        };
        self.pending = None;

        match result {
            Ok(theme) => {
                log::info!("curated theme '{}': {}", theme.name, theme.description);
                self.sky.set_theme(theme);
                self.status = Status::Curated { remaining: CURATED_SECONDS };
            }
            Err(e) => {
                log::error!("Error creating show: {}", e);
                self.notice = Some((e.to_string(), NOTICE_SECONDS));
                self.status = Status::Idle;
            }
        }
    }

    fn start_generation(&mut self, prompt: String) {
        let Some(generator) = self.generator.clone() else {
            self.notice = Some(("no theme generator configured (--generator CMD)".to_string(), NOTICE_SECONDS));
            return;
        };

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(generator.generate(&prompt));
        });
        self.pending = Some(rx);
        self.status = Status::Generating;
    }

    fn edit_theme(&mut self, edit: impl FnOnce(Theme) -> Theme) {
        let theme = edit(self.sky.theme().clone());
        self.sky.set_theme(theme);
    }

    /// Palette entry the color keys act on, kept inside the current theme's colors.
    fn selected_color(&self) -> Option<usize> {
        let len = self.sky.theme().colors.len();
        (len > 0).then(|| self.selected_color.min(len - 1))
    }

    fn open_prompt(&mut self, entry: Entry, text: String) {
        self.prompt = Some(Prompt { entry, text });
    }

    pub fn handle_event(&mut self, event: &Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if self.prompt.is_some() {
                    self.handle_prompt_key(key);
                } else {
                    self.handle_lab_key(key);
                }
            }
            Event::Mouse(MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column,
                row,
                ..
            }) => {
                if self.sky.is_paused() {
                    return;
                }
                let target = self.canvas.cell_to_world(*column, *row);
                self.sky.launch_toward(target, &self.canvas);
            }
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, key: &KeyEvent) {
        let Some(prompt) = &mut self.prompt else {
            return;
        };

        match key.code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Backspace => {
                prompt.text.pop();
            }
            KeyCode::Enter => {
                let entry = prompt.entry;
                let text = prompt.text.trim().to_string();
                match entry {
                    Entry::Mood => {
                        if text.is_empty() || self.status == Status::Generating {
                            return;
                        }
                        self.prompt = None;
                        self.start_generation(text);
                    }
                    Entry::Color(index) => {
                        // A bad color leaves the line open for another try
                        let Some((r, g, b)) = parse_hex_color(&text) else {
                            self.notice = Some((format!("not a hex color: {:?}", text), NOTICE_SECONDS));
                            return;
                        };
                        self.prompt = None;
                        let hex = format!("#{:02x}{:02x}{:02x}", r, g, b);
                        self.edit_theme(|t| t.with_color_set(index, &hex));
                    }
                }
            }
            KeyCode::Char(c) => prompt.text.push(c),
            _ => {}
        }
    }

    fn handle_lab_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Char(' ') => self.sky.toggle_paused(),
            KeyCode::Char(c @ '1'..='4') => {
                let pattern = Pattern::ALL[c as usize - '1' as usize];
                self.edit_theme(|t| t.with_pattern(pattern));
            }
            KeyCode::Char('p') => self.edit_theme(|t| {
                let next = t.pattern.next();
                t.with_pattern(next)
            }),
            KeyCode::Char('+') | KeyCode::Char('=') => self.edit_theme(|t| t.with_frequency_step(FREQUENCY_STEP)),
            KeyCode::Char('-') | KeyCode::Char('_') => self.edit_theme(|t| t.with_frequency_step(-FREQUENCY_STEP)),
            KeyCode::Char(']') => self.edit_theme(|t| t.with_size_step(SIZE_STEP)),
            KeyCode::Char('[') => self.edit_theme(|t| t.with_size_step(-SIZE_STEP)),
            KeyCode::Char('.') => self.edit_theme(|t| t.with_count_step(COUNT_STEP)),
            KeyCode::Char(',') => self.edit_theme(|t| t.with_count_step(-COUNT_STEP)),
            KeyCode::Char('a') => {
                self.edit_theme(|t| t.with_color_added("#ffffff"));
                self.selected_color = self.sky.theme().colors.len() - 1;
            }
            KeyCode::Char('c') => {
                if let Some(i) = self.selected_color() {
                    self.selected_color = (i + 1) % self.sky.theme().colors.len();
                }
            }
            KeyCode::Char('e') => {
                if let Some(i) = self.selected_color() {
                    let current = self.sky.theme().colors[i].clone();
                    self.open_prompt(Entry::Color(i), current);
                }
            }
            KeyCode::Char('x') => {
                if let Some(i) = self.selected_color() {
                    self.edit_theme(|t| t.with_color_removed(i));
                }
            }
            KeyCode::Char('r') => self.sky.set_theme(Theme::default()),
            KeyCode::Char('i') => self.show_help = !self.show_help,
            KeyCode::Char('g') => self.open_prompt(Entry::Mood, String::new()),
            _ => {}
        }
    }

    pub fn render<W: Write>(&mut self, out: &mut W) -> std::io::Result<()> {
        self.canvas.present(out, self.bg_color)?;
        self.render_hud(out)?;
        out.flush()
    }

    fn render_hud<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let (cols, rows) = self.canvas.cells();
        if cols == 0 || rows == 0 {
            return Ok(());
        }
        let bg = rgb(self.bg_color);
        let theme = self.sky.theme();

        let dot = if self.sky.is_paused() {
            Color::Rgb { r: 239, g: 68, b: 68 }
        } else {
            Color::Rgb { r: 34, g: 197, b: 94 }
        };
        let color = match self.selected_color() {
            Some(i) => format!("color {}/{} {}", i + 1, theme.colors.len(), theme.colors[i]),
            None => "no colors".to_string(),
        };
        let title = format!(
            " THEME: {}  [{} · {:.0}% · {} · {:.1} · {}]",
            theme.name.to_uppercase(),
            theme.pattern.name(),
            theme.launch_frequency * 100.0,
            theme.particle_count,
            theme.particle_size,
            color
        );
        queue!(
            out,
            MoveTo(1, 0),
            SetBackgroundColor(bg),
            SetForegroundColor(dot),
            Print("●"),
            SetForegroundColor(rgb(HUD_TEXT)),
            Print(clip(&title, cols.saturating_sub(3))),
        )?;

        let banner = match &self.status {
            Status::Idle => None,
            Status::Generating => Some("DREAMING...".to_string()),
            Status::Curated { .. } => Some(format!("NEW THEME CURATED: {}", theme.name.to_uppercase())),
        };
        if let Some(banner) = banner.or_else(|| self.notice.as_ref().map(|(text, _)| text.clone())) {
            let banner = clip(&banner, cols);
            let x = cols.saturating_sub(banner.chars().count()) / 2;
            queue!(
                out,
                MoveTo(x as u16, 2u16.min(rows as u16 - 1)),
                SetForegroundColor(rgb(HUD_ACCENT)),
                Print(banner),
            )?;
        }

        if self.show_help {
            let top = rows.saturating_sub(HELP_LINES.len()) / 2;
            let width = HELP_LINES.iter().map(|l| l.chars().count()).max().unwrap_or(0);
            let left = cols.saturating_sub(width) / 2;
            for (i, line) in HELP_LINES.iter().enumerate() {
                if top + i >= rows {
                    break;
                }
                queue!(
                    out,
                    MoveTo(left as u16, (top + i) as u16),
                    SetForegroundColor(rgb(HUD_TEXT)),
                    Print(clip(line, cols)),
                )?;
            }
        }

        let bottom = (rows - 1) as u16;
        match &self.prompt {
            Some(prompt) => {
                let label = match prompt.entry {
                    Entry::Mood => "mood".to_string(),
                    Entry::Color(i) => format!("color {}", i + 1),
                };
                let line = format!(" {}> {}_", label, prompt.text);
                // Keep the tail in view while typing long moods
                let skip = line.chars().count().saturating_sub(cols);
                let visible: String = line.chars().skip(skip).collect();
                queue!(
                    out,
                    MoveTo(0, bottom),
                    SetForegroundColor(rgb(HUD_ACCENT)),
                    Print(visible),
                )?;
            }
            None if rows > 1 => {
                queue!(
                    out,
                    MoveTo(1, bottom),
                    SetForegroundColor(rgb((100, 116, 139))),
                    Print(clip("click: launch · g: mood · i: help · q: quit", cols.saturating_sub(1))),
                )?;
            }
            None => {}
        }

        queue!(out, ResetColor)
    }
}

fn rgb(c: Rgb) -> Color {
    Color::Rgb { r: c.0, g: c.1, b: c.2 }
}

fn clip(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use std::time::{Duration, Instant};

    fn show() -> Show {
        let theme = Theme {
            launch_frequency: 0.0,
            ..Theme::default()
        };
        Show::new(Sky::new(theme, fastrand::Rng::with_seed(1)), Canvas::new(80, 24, 6.0), (0, 0, 0))
    }

    fn key(c: KeyCode) -> Event {
        Event::Key(KeyEvent::new(c, KeyModifiers::NONE))
    }

    fn click(column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    struct Fixed(Theme);

    impl ThemeGenerator for Fixed {
        fn generate(&self, _prompt: &str) -> Result<Theme, GenerationError> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl ThemeGenerator for Broken {
        fn generate(&self, _prompt: &str) -> Result<Theme, GenerationError> {
            Err(GenerationError::Status { code: Some(1), stderr: "quota".to_string() })
        }
    }

    fn wait_for<F: Fn(&Show) -> bool>(show: &mut Show, done: F) {
        let start = Instant::now();
        while !done(show) {
            assert!(start.elapsed() < Duration::from_secs(5), "timed out");
            thread::sleep(Duration::from_millis(5));
            show.update(1.0 / 60.0);
        }
    }

    #[test]
    fn click_launches_at_pointer() {
        let mut show = show();
        show.handle_event(&click(10, 5));
        let rockets = show.sky().rockets();
        assert_eq!(rockets.len(), 1);
        assert_eq!((rockets[0].target_x, rockets[0].target_y), (63.0, 63.0));
        assert_eq!((rockets[0].x, rockets[0].y), (240.0, 288.0));
    }

    #[test]
    fn space_toggles_pause() {
        let mut show = show();
        show.handle_event(&key(KeyCode::Char(' ')));
        assert!(show.sky().is_paused());
        show.handle_event(&key(KeyCode::Char(' ')));
        assert!(!show.sky().is_paused());
    }

    #[test]
    fn lab_keys_edit_the_theme() {
        let mut show = show();
        show.handle_event(&key(KeyCode::Char('3')));
        assert_eq!(show.sky().theme().pattern, Pattern::Heart);
        show.handle_event(&key(KeyCode::Char('p')));
        assert_eq!(show.sky().theme().pattern, Pattern::Star);

        show.handle_event(&key(KeyCode::Char('+')));
        assert!((show.sky().theme().launch_frequency - 0.005).abs() < 1e-6);
        show.handle_event(&key(KeyCode::Char('.')));
        assert_eq!(show.sky().theme().particle_count, 130);
        show.handle_event(&key(KeyCode::Char(']')));
        assert!((show.sky().theme().particle_size - 2.1).abs() < 1e-5);
        show.handle_event(&key(KeyCode::Char('a')));
        assert_eq!(show.sky().theme().colors.len(), 5);

        show.handle_event(&key(KeyCode::Char('r')));
        assert_eq!(show.sky().theme(), &Theme::default());
    }

    fn type_text(show: &mut Show, text: &str) {
        for c in text.chars() {
            show.handle_event(&key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn selected_color_can_be_edited_and_removed() {
        let mut show = show();
        show.handle_event(&key(KeyCode::Char('c')));
        show.handle_event(&key(KeyCode::Char('e')));
        assert!(show.is_typing());
        assert_eq!(show.prompt.as_ref().map(|p| p.text.as_str()), Some("#8b5cf6"));

        for _ in 0..7 {
            show.handle_event(&key(KeyCode::Backspace));
        }
        type_text(&mut show, "#F0A");
        show.handle_event(&key(KeyCode::Enter));
        assert!(!show.is_typing());
        assert_eq!(show.sky().theme().colors, vec!["#10b981", "#ff00aa", "#f43f5e", "#fbbf24"]);

        show.handle_event(&key(KeyCode::Char('x')));
        assert_eq!(show.sky().theme().colors, vec!["#10b981", "#f43f5e", "#fbbf24"]);
    }

    #[test]
    fn bad_color_keeps_the_line_open() {
        let mut show = show();
        show.handle_event(&key(KeyCode::Char('e')));
        show.handle_event(&key(KeyCode::Char('z')));
        show.handle_event(&key(KeyCode::Enter));
        assert!(show.is_typing());
        assert!(show.notice.is_some());
        assert_eq!(show.sky().theme(), &Theme { launch_frequency: 0.0, ..Theme::default() });
    }

    #[test]
    fn added_color_is_selected_and_selection_follows_removals() {
        let mut show = show();
        show.handle_event(&key(KeyCode::Char('a')));
        assert_eq!(show.selected_color(), Some(4));

        show.handle_event(&key(KeyCode::Char('c')));
        assert_eq!(show.selected_color(), Some(0));
        for _ in 0..3 {
            show.handle_event(&key(KeyCode::Char('c')));
        }
        assert_eq!(show.selected_color(), Some(3));

        // Removing entries past the selection pulls it back inside the palette
        show.handle_event(&key(KeyCode::Char('x')));
        show.handle_event(&key(KeyCode::Char('x')));
        assert_eq!(show.sky().theme().colors.len(), 3);
        assert_eq!(show.selected_color(), Some(2));

        for _ in 0..5 {
            show.handle_event(&key(KeyCode::Char('x')));
        }
        assert_eq!(show.sky().theme().colors, vec!["#10b981"]);
    }

    #[test]
    fn prompt_captures_every_key() {
        let mut show = show();
        show.handle_event(&key(KeyCode::Char('g')));
        assert!(show.is_typing());
        for c in "quiet ".chars() {
            show.handle_event(&key(KeyCode::Char(c)));
        }
        show.handle_event(&key(KeyCode::Backspace));
        assert_eq!(show.prompt.as_ref().map(|p| p.text.as_str()), Some("quiet"));
        assert!(!show.sky().is_paused());

        show.handle_event(&key(KeyCode::Esc));
        assert!(!show.is_typing());
    }

    #[test]
    fn generated_theme_replaces_current_one() {
        let generated = Theme {
            name: "Retro Arcade".to_string(),
            ..Theme::stellar_default()
        };
        let mut show = show().with_generator(Arc::new(Fixed(generated.clone())));
        show.handle_event(&key(KeyCode::Char('g')));
        for c in "arcade".chars() {
            show.handle_event(&key(KeyCode::Char(c)));
        }
        show.handle_event(&key(KeyCode::Enter));
        assert!(!show.is_typing());
        assert_eq!(show.status, Status::Generating);

        wait_for(&mut show, |s| s.pending.is_none());
        assert_eq!(show.sky().theme(), &generated);
        assert!(matches!(show.status, Status::Curated { .. }));

        for _ in 0..(CURATED_SECONDS * 60.0) as usize + 2 {
            show.update(1.0 / 60.0);
        }
        assert_eq!(show.status, Status::Idle);
    }

    #[test]
    fn failed_generation_keeps_theme() {
        let mut show = show().with_generator(Arc::new(Broken));
        let before = show.sky().theme().clone();
        show.start_generation("storm".to_string());
        wait_for(&mut show, |s| s.pending.is_none());
        assert_eq!(show.sky().theme(), &before);
        assert_eq!(show.status, Status::Idle);
        assert!(show.notice.is_some());
    }

    #[test]
    fn blank_prompt_is_ignored() {
        let mut show = show().with_generator(Arc::new(Broken));
        show.handle_event(&key(KeyCode::Char('g')));
        show.handle_event(&key(KeyCode::Char(' ')));
        show.handle_event(&key(KeyCode::Enter));
        assert!(show.is_typing());
        assert_eq!(show.status, Status::Idle);
    }

    #[test]
    fn generation_without_generator_leaves_a_notice() {
        let mut show = show();
        show.start_generation("anything".to_string());
        assert!(show.pending.is_none());
        assert!(show.notice.is_some());
    }

    #[test]
    fn render_draws_canvas_and_hud() {
        let mut show = show();
        let mut out = Vec::new();
        show.render(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("THEME: AURORA CLASSIC"));
        assert!(text.contains('▄'));
    }
}
