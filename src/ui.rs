use anyhow::Result;
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use receipt_scanner::render::{ReceiptView, NO_ITEMS_MESSAGE};
use receipt_scanner::upload::SUPPORTED_TYPES_LABEL;
use receipt_scanner::{Receipt, ReceiptClient, UploadController, ViewState};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use tokio::runtime::Handle;

const SPINNER: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];
const TICK: Duration = Duration::from_millis(100);

pub struct App {
    pub controller: UploadController,
    pub path_input: String,
    pub tick: usize,
    pub should_quit: bool,
    client: ReceiptClient,
    runtime: Handle,
    outcome_tx: Sender<Result<Receipt, String>>,
    outcome_rx: Receiver<Result<Receipt, String>>,
}

impl App {
    pub fn new(client: ReceiptClient, runtime: Handle) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel();

        Self {
            controller: UploadController::new(),
            path_input: String::new(),
            tick: 0,
            should_quit: false,
            client,
            runtime,
            outcome_tx,
            outcome_rx,
        }
    }

    /// Typed path, dropped file, or a path given on the command line
    pub fn submit_selection(&mut self, raw: &str) {
        let job = match self.controller.select(raw) {
            Some(job) => job,
            None => return,
        };

        self.path_input.clear();

        let client = self.client.clone();
        let tx = self.outcome_tx.clone();
        self.runtime.spawn(async move {
            let outcome = job.run(&client).await;
            let _ = tx.send(outcome);
        });
    }

    /// Pick up the in-flight job's outcome, if it has arrived
    pub fn poll_outcome(&mut self) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.controller.finish(outcome);
        }
    }

    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        self.poll_outcome();
    }

    pub fn handle_paste(&mut self, text: &str) {
        if self.controller.can_upload() {
            self.submit_selection(text);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        {
            self.should_quit = true;
            return;
        }

        match self.controller.state() {
            ViewState::Idle => match key.code {
                KeyCode::Enter => {
                    let raw = self.path_input.clone();
                    self.submit_selection(&raw);
                }
                KeyCode::Backspace => {
                    self.path_input.pop();
                }
                KeyCode::Char(c) => self.path_input.push(c),
                _ => {}
            },
            ViewState::Loading { .. } => {}
            ViewState::Result { .. } => match key.code {
                KeyCode::Enter | KeyCode::Char('n') => self.controller.reset(),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            },
            ViewState::Error { .. } => match key.code {
                KeyCode::Enter | KeyCode::Char('t') => self.controller.reset(),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            },
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableBracketedPaste, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(TICK)? {
            match event::read()? {
                Event::Key(key) => app.handle_key(key),
                // Dropping a file onto the terminal pastes its path
                Event::Paste(text) => app.handle_paste(&text),
                _ => {}
            }
        }

        app.on_tick();

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Title
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0]);

    match app.controller.state() {
        ViewState::Idle => render_upload(f, chunks[1], app),
        ViewState::Loading { preview } => render_loading(f, chunks[1], app, &preview.file_name()),
        ViewState::Error { message } => render_error(f, chunks[1], message),
        ViewState::Result { receipt, preview } => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(35), // Preview
                    Constraint::Percentage(65), // Receipt
                ])
                .split(chunks[1]);

            render_preview(f, content_chunks[0], preview);
            render_receipt(f, content_chunks[1], &ReceiptView::from(receipt));
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            "AI Receipt Scanner",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Upload an image of your receipt and let our AI instantly extract the details for you.",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::BOTTOM));

    f.render_widget(header, area);
}

fn render_upload(f: &mut Frame, area: Rect, app: &App) {
    let content = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("Type a path", Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)),
            Span::raw(" or drag and drop a file here"),
        ]),
        Line::from(Span::styled(SUPPORTED_TYPES_LABEL, Style::default().fg(Color::DarkGray))),
        Line::from(""),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Yellow)),
            Span::raw(app.path_input.as_str()),
            Span::styled("█", Style::default().fg(Color::Yellow)),
        ]),
    ];

    let paragraph = Paragraph::new(content).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Upload Receipt "),
    );

    f.render_widget(paragraph, area);
}

fn render_loading(f: &mut Frame, area: Rect, app: &App, file_name: &str) {
    let frame = SPINNER[app.tick % SPINNER.len()];

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(frame, Style::default().fg(Color::Magenta))),
        Line::from(""),
        Line::from(Span::styled(
            "Analyzing your receipt...",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "This might take a few moments.",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
        Line::from(Span::styled(file_name.to_string(), Style::default().fg(Color::Cyan))),
    ];

    let paragraph = Paragraph::new(content)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(paragraph, area);
}

fn render_error(f: &mut Frame, area: Rect, message: &str) {
    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Oops! Something went wrong.",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(vec![
            Span::styled("[Enter]", Style::default().fg(Color::Yellow)),
            Span::raw(" Try Again"),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );

    f.render_widget(paragraph, area);
}

fn render_preview(f: &mut Frame, area: Rect, preview: &receipt_scanner::PreviewRef) {
    let content = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  File: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(preview.file_name()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Path: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(preview.path.display().to_string(), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Ref:  ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(preview.to_string(), Style::default().fg(Color::DarkGray)),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Receipt Preview "));

    f.render_widget(paragraph, area);
}

fn render_receipt(f: &mut Frame, area: Rect, view: &ReceiptView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Store name
            Constraint::Length(4), // Date / Total
            Constraint::Min(0),    // Items
        ])
        .split(area);

    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            view.store_name.as_str(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled("[Enter] Scan New", Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);
    render_info_card(f, cards[0], "Date", &view.date, Color::White);
    render_info_card(f, cards[1], "Total", &view.total, Color::Magenta);

    let block = Block::default().borders(Borders::ALL).title(" Purchased Items ");

    if view.items.is_empty() {
        let empty = Paragraph::new(NO_ITEMS_MESSAGE)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(empty, chunks[2]);
        return;
    }

    let rows: Vec<Row> = view
        .items
        .iter()
        .map(|item| {
            Row::new(vec![
                Cell::from(item.name.as_str()),
                Cell::from(item.quantity.as_str()).style(Style::default().fg(Color::DarkGray)),
                Cell::from(item.price.as_str()).style(Style::default().add_modifier(Modifier::BOLD)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Percentage(55),
        Constraint::Percentage(25),
        Constraint::Percentage(20),
    ];
    let table = Table::new(rows, widths).block(block);

    f.render_widget(table, chunks[2]);
}

fn render_info_card(f: &mut Frame, area: Rect, label: &str, value: &str, color: Color) {
    let card = Paragraph::new(vec![
        Line::from(Span::styled(label.to_string(), Style::default().fg(Color::DarkGray))),
        Line::from(Span::styled(
            value.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
    ])
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(card, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let hints = match app.controller.state() {
        ViewState::Idle => "Enter: upload | Esc: quit",
        ViewState::Loading { .. } => "Waiting for the server... | Esc: quit",
        ViewState::Result { .. } => "Enter/n: scan new | q: quit",
        ViewState::Error { .. } => "Enter/t: try again | q: quit",
    };

    let status = Paragraph::new(Line::from(vec![
        Span::styled(hints, Style::default().fg(Color::Yellow)),
        Span::raw("   "),
        Span::styled("Powered by Google Gemini", Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;
    use ratatui::backend::TestBackend;
    use receipt_scanner::ReceiptItem;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[tokio::test]
    async fn test_typing_builds_path() {
        let mut app = App::new(ReceiptClient::default(), Handle::current());
        for c in "/tmp/x.pngg".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Backspace));

        assert_eq!(app.path_input, "/tmp/x.png");
        assert!(screen(&app).contains("/tmp/x.png"));
    }

    #[tokio::test]
    async fn test_enter_on_empty_path_stays_idle() {
        let mut app = App::new(ReceiptClient::default(), Handle::current());
        app.handle_key(key(KeyCode::Enter));

        assert!(app.controller.can_upload());
    }

    #[tokio::test]
    async fn test_missing_file_ends_in_error() {
        let mut app = App::new(ReceiptClient::default(), Handle::current());
        app.handle_paste("/definitely/not/here.png");
        assert!(app.controller.is_loading());
        assert!(screen(&app).contains("Analyzing your receipt..."));

        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            app.poll_outcome();
            if !app.controller.is_loading() {
                break;
            }
        }

        assert!(app.controller.error_message().unwrap().starts_with("Could not read"));
        assert!(screen(&app).contains("Oops! Something went wrong."));

        app.handle_key(key(KeyCode::Enter));
        assert!(app.controller.can_upload());
    }

    #[tokio::test]
    async fn test_result_screen() {
        let mut app = App::new(ReceiptClient::default(), Handle::current());
        app.controller.select("/tmp/acme.png").unwrap();
        app.controller.finish(Ok(Receipt::new(
            "Acme Mart",
            "2024-03-02",
            12.5,
            vec![ReceiptItem::new("Milk", 2, 3.25), ReceiptItem::new("Bread", 1, 4.0)],
        )));

        let text = screen(&app);
        assert!(text.contains("Acme Mart"));
        assert!(text.contains("March 2, 2024"));
        assert!(text.contains("$12.50"));
        assert!(text.contains("Qty: 2"));
        assert!(text.contains("Single Item"));
        assert!(text.contains("$3.25"));
        assert!(text.contains("acme.png"));

        app.handle_key(key(KeyCode::Char('n')));
        assert!(app.controller.can_upload());
    }

    #[tokio::test]
    async fn test_esc_quits() {
        let mut app = App::new(ReceiptClient::default(), Handle::current());
        app.handle_key(key(KeyCode::Esc));
        assert!(app.should_quit);
    }
}
