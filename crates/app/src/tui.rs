//! Terminal front end.
//!
//! One `select!` loop owns every piece of state. Catalog and DJ calls run as
//! spawned tasks and come back as tagged [`AppMessage`]s; mpv reports through
//! its own channel; the search controller is ticked at its next deadline.

use crate::mpv::MpvPort;
use crate::ui::{self, progress_offset};
use crate::view::{dj_rows, home_rows, search_rows, Row, View};
use anyhow::{Context, Result};
use lumina_catalog::{Catalog, CatalogResult, SpotifyCatalog};
use lumina_core::{AppConfig, EnrichedRecommendation, Session};
use lumina_engine::{
    PlaybackController, PlaybackEvent, RequestId, SearchCommand, SearchConfig, SearchController,
};
use lumina_recommend::{ask_dj, GeminiRecommender, Recommender};
use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tui_input::{backend::crossterm::EventHandler, Input};

pub enum AppMessage {
    Input(Event),
    Search(RequestId, CatalogResult),
    Releases(RequestId, CatalogResult),
    Dj {
        request: u64,
        items: Vec<EnrichedRecommendation>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Search,
    Mood,
    Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Quit,
    NextView,
    Up,
    Down,
    Select,
    TogglePlay,
    VolumeUp,
    VolumeDown,
    EditSearch,
    EditMood,
    OpenTokenModal,
    Disconnect,
    None,
}

fn normal_action(key: KeyEvent) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }
    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Tab => Action::NextView,
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::Enter => Action::Select,
        KeyCode::Char(' ') => Action::TogglePlay,
        KeyCode::Char('+') | KeyCode::Char('=') => Action::VolumeUp,
        KeyCode::Char('-') => Action::VolumeDown,
        KeyCode::Char('/') => Action::EditSearch,
        KeyCode::Char('m') => Action::EditMood,
        KeyCode::Char('t') => Action::OpenTokenModal,
        KeyCode::Char('x') => Action::Disconnect,
        _ => Action::None,
    }
}

const VOLUME_STEP: i16 = 5;

#[derive(Debug, Default)]
pub struct DjState {
    pub mood: String,
    pub loading: bool,
    pub items: Vec<EnrichedRecommendation>,
    request: u64,
}

pub struct App {
    pub view: View,
    pub mode: Mode,
    pub search: SearchController,
    pub player: PlaybackController<MpvPort>,
    pub search_input: Input,
    pub mood_input: Input,
    pub token_input: Input,
    pub dj: DjState,
    pub cursor: usize,
    /// Where the progress bar was last drawn, for click-to-seek.
    pub progress_area: Option<Rect>,
    session: Arc<Session>,
    catalog: Arc<dyn Catalog>,
    recommender: Arc<dyn Recommender>,
    tx: mpsc::Sender<AppMessage>,
    should_quit: bool,
}

impl App {
    fn new(
        cfg: &AppConfig,
        session: Arc<Session>,
        tx: mpsc::Sender<AppMessage>,
        playback_tx: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> Result<Self> {
        let catalog = SpotifyCatalog::new(session.clone(), cfg.catalog.clone())
            .context("failed to build catalog client")?;
        let recommender =
            GeminiRecommender::new(&cfg.recommend).context("failed to build DJ client")?;
        let port = MpvPort::new(&cfg.player.mpv_binary, cfg.player.initial_volume, playback_tx);

        Ok(Self {
            view: View::Home,
            mode: Mode::Normal,
            search: SearchController::new(
                SearchConfig::from_intervals(&cfg.intervals),
                session.clone(),
                Instant::now(),
            ),
            player: PlaybackController::with_volume(port, cfg.player.initial_volume),
            search_input: Input::default(),
            mood_input: Input::default(),
            token_input: Input::default(),
            dj: DjState::default(),
            cursor: 0,
            progress_area: None,
            session,
            catalog: Arc::new(catalog),
            recommender: Arc::new(recommender),
            tx,
            should_quit: false,
        })
    }

    pub fn rows(&self) -> Vec<Row> {
        match self.view {
            View::Home => home_rows(self.search.releases()),
            View::Search => search_rows(self.search.results()),
            View::Dj => dj_rows(&self.dj.items),
        }
    }

    fn dispatch(&self, commands: Vec<SearchCommand>) {
        for command in commands {
            let catalog = Arc::clone(&self.catalog);
            let tx = self.tx.clone();
            tokio::spawn(async move {
                let msg = match command {
                    SearchCommand::Search { request, query } => {
                        AppMessage::Search(request, catalog.search_tracks(&query).await)
                    }
                    SearchCommand::LoadReleases { request } => {
                        AppMessage::Releases(request, catalog.new_releases().await)
                    }
                };
                let _ = tx.send(msg).await;
            });
        }
    }

    fn handle_message(&mut self, msg: AppMessage) {
        let now = Instant::now();
        match msg {
            AppMessage::Input(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                self.handle_key(key)
            }
            AppMessage::Input(Event::Mouse(mouse)) => self.handle_mouse(mouse),
            AppMessage::Input(_) => {}
            AppMessage::Search(request, result) => {
                let commands = self.search.apply_search(request, result, now);
                self.dispatch(commands);
                if self.view == View::Search {
                    self.clamp_cursor();
                }
            }
            AppMessage::Releases(request, result) => {
                let commands = self.search.apply_releases(request, result, now);
                self.dispatch(commands);
                if self.view == View::Home {
                    self.clamp_cursor();
                }
            }
            AppMessage::Dj { request, items } => {
                if request != self.dj.request {
                    debug!(request, "discarding stale dj reply");
                    return;
                }
                self.dj.loading = false;
                self.dj.items = items;
                if self.view == View::Dj {
                    self.cursor = 0;
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let now = Instant::now();
        match self.mode {
            Mode::Normal => self.apply(normal_action(key)),
            Mode::Search => match key.code {
                KeyCode::Esc | KeyCode::Enter => self.mode = Mode::Normal,
                _ => {
                    self.search_input.handle_event(&Event::Key(key));
                    let commands = self.search.set_query(self.search_input.value(), now);
                    self.dispatch(commands);
                    self.cursor = 0;
                }
            },
            Mode::Mood => match key.code {
                KeyCode::Esc => self.mode = Mode::Normal,
                KeyCode::Enter => {
                    self.mode = Mode::Normal;
                    self.ask_dj();
                }
                _ => {
                    self.mood_input.handle_event(&Event::Key(key));
                }
            },
            Mode::Token => match key.code {
                KeyCode::Esc => {
                    self.token_input = Input::default();
                    self.mode = Mode::Normal;
                }
                KeyCode::Enter => {
                    let commands = self.search.connect(self.token_input.value(), now);
                    self.dispatch(commands);
                    self.token_input = Input::default();
                    self.mode = Mode::Normal;
                }
                _ => {
                    self.token_input.handle_event(&Event::Key(key));
                }
            },
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::NextView => {
                self.view = self.view.next();
                self.cursor = 0;
            }
            Action::Up => self.cursor = self.cursor.saturating_sub(1),
            Action::Down => {
                self.cursor += 1;
                self.clamp_cursor();
            }
            Action::Select => {
                if let Some(track) = self.rows().into_iter().nth(self.cursor).and_then(|r| r.track) {
                    self.player.select(track);
                }
            }
            Action::TogglePlay => self.player.toggle(),
            Action::VolumeUp => self.player.adjust_volume(VOLUME_STEP),
            Action::VolumeDown => self.player.adjust_volume(-VOLUME_STEP),
            Action::EditSearch => {
                self.view = View::Search;
                self.mode = Mode::Search;
            }
            Action::EditMood => {
                self.view = View::Dj;
                self.mode = Mode::Mood;
            }
            Action::OpenTokenModal => self.mode = Mode::Token,
            Action::Disconnect => {
                self.search.disconnect();
                self.clamp_cursor();
            }
            Action::None => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let Some(area) = self.progress_area else {
            return;
        };
        if let Some((x, width)) = progress_offset(area, mouse.column, mouse.row) {
            self.player.seek_to_offset(x, width);
        }
    }

    fn ask_dj(&mut self) {
        let mood = self.mood_input.value().trim().to_string();
        if mood.is_empty() {
            return;
        }
        self.dj.request += 1;
        self.dj.loading = true;
        self.dj.mood = mood.clone();

        let request = self.dj.request;
        let catalog = Arc::clone(&self.catalog);
        let recommender = Arc::clone(&self.recommender);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let items = ask_dj(recommender.as_ref(), catalog.as_ref(), &mood).await;
            let _ = tx.send(AppMessage::Dj { request, items }).await;
        });
    }

    fn reload(&mut self, cfg_path: &Path) {
        let cfg = match crate::load_or_default(cfg_path) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!(error = %err, "failed to reload config");
                return;
            }
        };
        self.search
            .update_config(SearchConfig::from_intervals(&cfg.intervals));
        match SpotifyCatalog::new(self.session.clone(), cfg.catalog.clone()) {
            Ok(catalog) => self.catalog = Arc::new(catalog),
            Err(err) => error!(error = %err, "failed to rebuild catalog client"),
        }
        match GeminiRecommender::new(&cfg.recommend) {
            Ok(recommender) => self.recommender = Arc::new(recommender),
            Err(err) => error!(error = %err, "failed to rebuild DJ client"),
        }
        info!("configuration reloaded");
    }

    fn clamp_cursor(&mut self) {
        let len = self.rows().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }
}

const INPUT_POLL: Duration = Duration::from_millis(100);

/// Forwards terminal events until `stop` is set or the receiver goes away.
/// Waits at most [`INPUT_POLL`] between checks of `stop`.
fn forward_input<P, R>(stop: &AtomicBool, mut poll: P, mut read: R, tx: &mpsc::Sender<AppMessage>)
where
    P: FnMut(Duration) -> io::Result<bool>,
    R: FnMut() -> io::Result<Event>,
{
    while !stop.load(Ordering::Relaxed) {
        match poll(INPUT_POLL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(err) => {
                debug!(error = %err, "terminal poll failed");
                break;
            }
        }
        match read() {
            Ok(ev) => {
                if tx.blocking_send(AppMessage::Input(ev)).is_err() {
                    break;
                }
            }
            Err(err) => {
                debug!(error = %err, "terminal read failed");
                break;
            }
        }
    }
}

pub async fn run(cfg: AppConfig, cfg_path: PathBuf) -> Result<()> {
    let session = crate::open_session(&cfg);
    let (tx, mut rx) = mpsc::channel::<AppMessage>(256);
    let (playback_tx, mut playback_rx) = mpsc::unbounded_channel::<PlaybackEvent>();
    let (reload_tx, mut reload_rx) = mpsc::channel::<()>(4);
    crate::spawn_reload_watchers(cfg_path.clone(), cfg.intervals.file_watch_poll_ms, reload_tx)
        .await?;

    let mut app = App::new(&cfg, session, tx.clone(), playback_tx)?;
    info!(live = app.search.is_connected(), "lumina started");
    let commands = app.search.start(Instant::now());
    app.dispatch(commands);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let input_tx = tx.clone();
    let input_stop = Arc::new(AtomicBool::new(false));
    let reader_stop = input_stop.clone();
    let reader = tokio::task::spawn_blocking(move || {
        forward_input(&reader_stop, event::poll, event::read, &input_tx)
    });

    let result: Result<()> = async {
        loop {
            terminal.draw(|f| ui::draw(f, &mut app))?;
            if app.should_quit {
                break;
            }

            let deadline = tokio::time::Instant::from_std(app.search.next_deadline());
            tokio::select! {
                Some(msg) = rx.recv() => app.handle_message(msg),
                Some(event) = playback_rx.recv() => app.player.handle_event(event),
                Some(()) = reload_rx.recv() => app.reload(&cfg_path),
                _ = tokio::time::sleep_until(deadline) => {
                    let commands = app.search.tick(Instant::now());
                    app.dispatch(commands);
                }
            }
        }
        Ok(())
    }
    .await;

    input_stop.store(true, Ordering::Relaxed);
    if let Err(err) = reader.await {
        debug!(error = %err, "input reader ended abnormally");
    }
    app.player.shutdown();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    info!("lumina stopped");
    result
}

#[cfg(test)]
mod tests {
    use super::{forward_input, normal_action, Action, AppMessage};
    use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn transport_and_session_keys() {
        assert_eq!(normal_action(key(KeyCode::Char(' '))), Action::TogglePlay);
        assert_eq!(normal_action(key(KeyCode::Char('+'))), Action::VolumeUp);
        assert_eq!(normal_action(key(KeyCode::Char('='))), Action::VolumeUp);
        assert_eq!(normal_action(key(KeyCode::Char('-'))), Action::VolumeDown);
        assert_eq!(normal_action(key(KeyCode::Char('x'))), Action::Disconnect);
        assert_eq!(normal_action(key(KeyCode::Char('t'))), Action::OpenTokenModal);
        assert_eq!(normal_action(key(KeyCode::Tab)), Action::NextView);
        assert_eq!(normal_action(key(KeyCode::Char('z'))), Action::None);
    }

    #[test]
    fn ctrl_c_and_q_quit() {
        assert_eq!(normal_action(key(KeyCode::Char('q'))), Action::Quit);
        assert_eq!(
            normal_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
        assert_eq!(normal_action(key(KeyCode::Char('c'))), Action::None);
    }

    #[test]
    fn input_reader_returns_once_stopped() {
        let (tx, _rx) = mpsc::channel::<AppMessage>(4);
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let reader = std::thread::spawn(move || {
            forward_input(
                &flag,
                |timeout| {
                    std::thread::sleep(timeout.min(Duration::from_millis(5)));
                    Ok(false)
                },
                || Ok(Event::FocusGained),
                &tx,
            )
        });
        std::thread::sleep(Duration::from_millis(20));
        stop.store(true, Ordering::Relaxed);
        reader.join().expect("reader thread");
    }

    #[test]
    fn input_reader_forwards_ready_events() {
        let (tx, mut rx) = mpsc::channel::<AppMessage>(4);
        let stop = AtomicBool::new(false);
        let mut reads = 0;
        forward_input(
            &stop,
            |_| Ok(true),
            || {
                reads += 1;
                if reads > 2 {
                    stop.store(true, Ordering::Relaxed);
                }
                Ok(Event::FocusGained)
            },
            &tx,
        );
        let mut forwarded = 0;
        while let Ok(msg) = rx.try_recv() {
            assert!(matches!(msg, AppMessage::Input(Event::FocusGained)));
            forwarded += 1;
        }
        assert_eq!(forwarded, 3);
    }

    #[test]
    fn input_reader_stops_when_the_loop_is_gone() {
        let (tx, rx) = mpsc::channel::<AppMessage>(4);
        drop(rx);
        let stop = AtomicBool::new(false);
        forward_input(&stop, |_| Ok(true), || Ok(Event::FocusLost), &tx);
    }
}
