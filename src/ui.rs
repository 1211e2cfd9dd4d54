use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use power_play::reference::{CHEX_DISPUTE_TYPES, CONSUMER_LAWS, DISPUTE_LIBRARY};
use power_play::{
    AppState, EntryKind, Finding, LetterOutcome, Plan, ScanError, ScanStage, Scanner, StubCheckout,
    SCAN_FAILED_NOTICE,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot::{self, error::TryRecvError};

type ScanOutcome = Result<Vec<Finding>, ScanError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Scanner,
    Budget,
    Legal,
    Profile,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Scanner => Page::Budget,
            Page::Budget => Page::Legal,
            Page::Legal => Page::Profile,
            Page::Profile => Page::Scanner,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Scanner => Page::Profile,
            Page::Budget => Page::Scanner,
            Page::Legal => Page::Budget,
            Page::Profile => Page::Legal,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Scanner => "Scanner",
            Page::Budget => "Budget",
            Page::Legal => "Legal",
            Page::Profile => "Profile",
        }
    }
}

/// Amount being typed on the Budget page
#[derive(Debug, Clone)]
pub struct EntryForm {
    pub amount: String,
    pub kind: EntryKind,
}

pub struct App {
    pub state: AppState,
    pub findings: Vec<Finding>,
    pub findings_state: TableState,
    pub ledger_state: TableState,
    pub current_page: Page,
    pub form: Option<EntryForm>,
    /// Image path being typed on the Scanner page
    pub path_input: Option<String>,
    pub status: Option<String>,
    scanner: Arc<Scanner>,
    pending_scan: Option<oneshot::Receiver<ScanOutcome>>,
    checkout: StubCheckout,
}

impl App {
    pub fn new(state: AppState, scanner: Arc<Scanner>, checkout: StubCheckout) -> Self {
        let mut ledger_state = TableState::default();
        if !state.ledger().is_empty() {
            ledger_state.select(Some(0));
        }

        Self {
            state,
            findings: Vec::new(),
            findings_state: TableState::default(),
            ledger_state,
            current_page: Page::Scanner,
            form: None,
            path_input: None,
            status: None,
            scanner,
            pending_scan: None,
            checkout,
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    fn active_table(&mut self) -> Option<(&mut TableState, usize)> {
        match self.current_page {
            Page::Scanner => Some((&mut self.findings_state, self.findings.len())),
            Page::Budget => Some((&mut self.ledger_state, self.state.ledger().len())),
            _ => None,
        }
    }

    pub fn next(&mut self) {
        if let Some((table, len)) = self.active_table() {
            if len == 0 {
                return;
            }
            let i = match table.selected() {
                Some(i) if i + 1 < len => i + 1,
                _ => 0,
            };
            table.select(Some(i));
        }
    }

    pub fn previous(&mut self) {
        if let Some((table, len)) = self.active_table() {
            if len == 0 {
                return;
            }
            let i = match table.selected() {
                Some(0) | None => len - 1,
                Some(i) => i - 1,
            };
            table.select(Some(i));
        }
    }

    pub fn start_path_prompt(&mut self) {
        self.path_input = Some(String::new());
    }

    pub fn submit_path(&mut self) {
        if let Some(path) = self.path_input.take() {
            let path = path.trim();
            if !path.is_empty() {
                self.start_scan_file(Path::new(path));
            }
        }
    }

    pub fn start_scan_file(&mut self, path: &Path) {
        match std::fs::read(path) {
            Ok(image) => self.start_scan(image),
            Err(e) => self.status = Some(format!("Could not read {}: {}", path.display(), e)),
        }
    }

    /// Run the scan on the runtime; the draw loop picks up the result
    pub fn start_scan(&mut self, image: Vec<u8>) {
        if self.pending_scan.is_some() || self.scanner.is_scanning() {
            self.status = Some(ScanError::Busy.user_notice().to_string());
            return;
        }

        let (tx, rx) = oneshot::channel();
        let scanner = self.scanner.clone();
        tokio::spawn(async move {
            let _ = tx.send(scanner.scan(&image).await);
        });

        self.pending_scan = Some(rx);
        self.status = None;
    }

    /// Collect a finished scan, if any
    pub fn poll_scan(&mut self) {
        let outcome = match self.pending_scan.as_mut().map(|rx| rx.try_recv()) {
            None | Some(Err(TryRecvError::Empty)) => return,
            Some(Ok(outcome)) => outcome,
            Some(Err(TryRecvError::Closed)) => {
                // Scan task died without reporting back
                self.pending_scan = None;
                self.status = Some(SCAN_FAILED_NOTICE.to_string());
                return;
            }
        };
        self.pending_scan = None;

        match outcome {
            Ok(findings) => {
                self.status = Some(format!("{} finding(s)", findings.len()));
                self.findings = findings;
                self.findings_state
                    .select(if self.findings.is_empty() { None } else { Some(0) });
            }
            Err(e) => self.status = Some(e.user_notice().to_string()),
        }
    }

    /// Progress text while a scan is in flight
    pub fn scan_progress(&self) -> Option<&'static str> {
        match self.scanner.stage() {
            ScanStage::Idle if self.pending_scan.is_some() => {
                Some(ScanStage::RunningOcr.status_message())
            }
            ScanStage::Idle => None,
            stage => Some(stage.status_message()),
        }
    }

    /// Write the selected finding's dispute letter to the working directory,
    /// or route to the Profile page when not entitled.
    pub fn generate_letter(&mut self) {
        let finding = match self.findings_state.selected().and_then(|i| self.findings.get(i)) {
            Some(f) => f.clone(),
            None => return,
        };

        match self.state.draft_letter_today(&finding) {
            LetterOutcome::Ready(letter) => {
                let written = letter
                    .to_pdf()
                    .and_then(|bytes| std::fs::write(&letter.file_name, bytes).map_err(Into::into));
                self.status = Some(match written {
                    Ok(()) => format!("Saved {}", letter.file_name),
                    Err(e) => format!("Could not save letter: {}", e),
                });
            }
            LetterOutcome::UpgradeRequired => {
                self.status = Some("UNLOCK PDF DRAFTING - upgrade to PRO".to_string());
                self.current_page = Page::Profile;
            }
        }
    }

    pub fn start_entry(&mut self) {
        self.form = Some(EntryForm {
            amount: String::new(),
            kind: EntryKind::Income,
        });
    }

    pub fn submit_entry(&mut self) {
        if let Some(form) = self.form.take() {
            if self.state.add_entry_str(&form.amount, form.kind).is_some() {
                self.ledger_state.select(Some(self.state.ledger().len() - 1));
            }
            self.report_persist_error();
        }
    }

    pub fn delete_selected_entry(&mut self) {
        let id = match self
            .ledger_state
            .selected()
            .and_then(|i| self.state.ledger().entries().get(i))
        {
            Some(entry) => entry.id,
            None => return,
        };

        self.state.remove_entry(id);
        let len = self.state.ledger().len();
        let selected = self.ledger_state.selected().unwrap_or(0);
        self.ledger_state
            .select(if len == 0 { None } else { Some(selected.min(len - 1)) });
        self.report_persist_error();
    }

    pub fn toggle_premium(&mut self) {
        self.state.toggle_premium();
        self.report_persist_error();
    }

    pub fn checkout(&mut self, plan: Plan) {
        self.status = Some(match self.checkout.checkout(plan) {
            Ok(purchase) => {
                self.state.set_premium(true);
                format!("Purchase complete ({})", purchase.reference)
            }
            Err(e) => e.to_string(),
        });
    }

    fn report_persist_error(&mut self) {
        if let Some(err) = self.state.last_persist_error() {
            self.status = Some(format!("Not saved: {}", err));
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
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
        app.poll_scan();
        terminal.draw(|f| ui(f, app))?;

        // Short poll keeps the scan progress line moving
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if let Some(input) = app.path_input.as_mut() {
                match key.code {
                    KeyCode::Esc => app.path_input = None,
                    KeyCode::Enter => app.submit_path(),
                    KeyCode::Backspace => {
                        input.pop();
                    }
                    KeyCode::Char(c) => input.push(c),
                    _ => {}
                }
                continue;
            }

            // Entry form swallows keys until submitted or cancelled
            if let Some(form) = app.form.as_mut() {
                match key.code {
                    KeyCode::Esc => app.form = None,
                    KeyCode::Enter => app.submit_entry(),
                    KeyCode::Backspace => {
                        form.amount.pop();
                    }
                    KeyCode::Char('i') => form.kind = EntryKind::Income,
                    KeyCode::Char('e') => form.kind = EntryKind::Expense,
                    KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => form.amount.push(c),
                    _ => {}
                }
                continue;
            }

            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => app.next_page(),
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Char('s') if app.current_page == Page::Scanner => app.start_path_prompt(),
                KeyCode::Char('g') if app.current_page == Page::Scanner => app.generate_letter(),
                KeyCode::Char('a') if app.current_page == Page::Budget => app.start_entry(),
                KeyCode::Char('d') if app.current_page == Page::Budget => app.delete_selected_entry(),
                KeyCode::Char('p') if app.current_page == Page::Profile => app.toggle_premium(),
                KeyCode::Char('m') if app.current_page == Page::Profile => app.checkout(Plan::Monthly),
                KeyCode::Char('o') if app.current_page == Page::Profile => app.checkout(Plan::OneTime),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Scanner => render_scanner(f, chunks[1], app),
        Page::Budget => render_budget(f, chunks[1], app),
        Page::Legal => render_legal(f, chunks[1]),
        Page::Profile => render_profile(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Scanner, Page::Budget, Page::Legal, Page::Profile];

    let mut tab_spans = vec![Span::styled(
        "POWER PLAY  ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title(), style));
    }

    if app.state.is_premium() {
        tab_spans.push(Span::raw("  |  "));
        tab_spans.push(Span::styled(
            "PRO ACTIVE",
            Style::default().fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn render_scanner(f: &mut Frame, outer: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(outer);

    let scan_line = if let Some(input) = &app.path_input {
        Line::from(vec![
            Span::styled("  Image path: ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{}_  Enter Esc", input)),
        ])
    } else if let Some(progress) = app.scan_progress() {
        Line::from(Span::styled(
            format!("  ⏳ {}", progress),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(Span::styled(
            "  s: scan a credit report or eviction notice",
            Style::default().fg(Color::DarkGray),
        ))
    };
    let scan_box = Paragraph::new(vec![scan_line])
        .block(Block::default().borders(Borders::ALL).title(" Dispute Hunter "));
    f.render_widget(scan_box, chunks[0]);

    let area = chunks[1];
    if app.findings.is_empty() {
        let hint = Paragraph::new(vec![Line::from(""), Line::from("  No scan results yet.")])
            .block(Block::default().borders(Borders::ALL).title(" Findings "));
        f.render_widget(hint, area);
        return;
    }

    let rows = app.findings.iter().map(|finding| {
        Row::new(vec![
            Cell::from(finding.title.clone()),
            Cell::from(finding.code.clone()).style(Style::default().fg(Color::Cyan)),
            Cell::from(finding.text.clone()).style(Style::default().fg(Color::DarkGray)),
        ])
    });

    let title = if app.state.is_premium() {
        " Findings - g: generate dispute PDF "
    } else {
        " Findings - g: unlock PDF drafting "
    };

    let table = Table::new(
        rows,
        [Constraint::Length(28), Constraint::Length(16), Constraint::Min(20)],
    )
    .header(header_row(&["Violation", "Code", "Detail"]))
    .block(Block::default().borders(Borders::ALL).title(title))
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.findings_state);
}

fn render_budget(f: &mut Frame, area: Rect, app: &mut App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let rows = app.state.ledger().entries().iter().map(|entry| {
        let color = match entry.kind {
            EntryKind::Income => Color::Green,
            EntryKind::Expense => Color::Red,
        };
        Row::new(vec![
            Cell::from(entry.category.clone()),
            Cell::from(entry.kind.as_str()).style(Style::default().fg(color)),
            Cell::from(format!("{}${:.2}", entry.kind.sign(), entry.amount))
                .style(Style::default().fg(color)),
        ])
    });

    let table = Table::new(
        rows,
        [Constraint::Length(12), Constraint::Length(10), Constraint::Length(14)],
    )
    .header(header_row(&["Category", "Type", "Amount"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Recent Activity - a: add  d: delete "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, columns[0], &mut app.ledger_state);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)])
        .split(columns[1]);

    let totals = app.state.aggregates();
    let mut summary = vec![
        Line::from(vec![
            Span::styled("  Income:   ", Style::default().fg(Color::Cyan)),
            Span::styled(format!("{:.2}", totals.income), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::styled("  Expenses: ", Style::default().fg(Color::Cyan)),
            Span::styled(format!("{:.2}", totals.expenses), Style::default().fg(Color::Red)),
        ]),
        Line::from(vec![
            Span::styled("  Surplus:  ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(format!("{:.2}", totals.surplus)),
        ]),
    ];

    if let Some(form) = &app.form {
        summary.push(Line::from(""));
        summary.push(Line::from(vec![
            Span::styled("  New: ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{}_ ({})  i/e Enter Esc", form.amount, form.kind.as_str())),
        ]));
    }

    let summary = Paragraph::new(summary)
        .block(Block::default().borders(Borders::ALL).title(" Monthly Surplus "));
    f.render_widget(summary, side[0]);

    // Bar heights are whole cents
    let slices = app.state.ledger().chart_slices();
    let bars: Vec<(&str, u64)> = slices
        .iter()
        .map(|s| (s.label, (s.value * 100.0).round().max(0.0) as u64))
        .collect();

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(" Income vs Bills "))
        .data(bars.as_slice())
        .bar_width(9)
        .bar_style(Style::default().fg(Color::Blue))
        .value_style(Style::default().fg(Color::Black).bg(Color::Blue));
    f.render_widget(chart, side[1]);
}

fn render_legal(f: &mut Frame, area: Rect) {
    let mut lines = vec![Line::from(Span::styled(
        "  Dispute Library",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))];
    for item in DISPUTE_LIBRARY {
        lines.push(Line::from(format!("    • {}  (Target: {})", item.title, item.target)));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Consumer Rights Reference",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )));
    for law in CONSUMER_LAWS {
        lines.push(Line::from(vec![
            Span::styled(format!("    {}", law.title), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(format!("  {}", law.code), Style::default().fg(Color::Blue)),
        ]));
        for right in law.rights {
            lines.push(Line::from(vec![
                Span::styled("      • ", Style::default().fg(Color::Green)),
                Span::raw(*right),
            ]));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  ChexSystems Dispute Forms",
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    )));
    for dispute in CHEX_DISPUTE_TYPES {
        lines.push(Line::from(format!("    • {} - {}", dispute.title, dispute.description)));
    }

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Legal "));
    f.render_widget(paragraph, area);
}

fn render_profile(f: &mut Frame, area: Rect, app: &App) {
    let (badge, sub, color) = if app.state.is_premium() {
        ("PRO UNLOCKED", "Active Subscription", Color::Green)
    } else {
        ("UPGRADE TO PRO", "Full AI Legal Access", Color::Yellow)
    };

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("  {}", badge), Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(format!("  {}  (p: toggle)", sub), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
    ];

    for (plan, key) in [(Plan::Monthly, 'm'), (Plan::OneTime, 'o')] {
        lines.push(Line::from(vec![
            Span::styled(format!("  {}: ", key), Style::default().fg(Color::Yellow)),
            Span::styled(
                format!("{} - {}", plan.name(), plan.price_label()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]));
        for feature in plan.features() {
            lines.push(Line::from(format!("      ✓ {}", feature)));
        }
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        "  Power Play is an educational tool. Generated disputes should be reviewed by a qualified professional.",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Profile "));
    f.render_widget(paragraph, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = Vec::new();

    if let Some(status) = &app.status {
        status_spans.push(Span::styled(format!(" {} ", status), Style::default().fg(Color::Green)));
        status_spans.push(Span::raw(" | "));
    }

    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}
