/// Módulo de la interfaz de terminal.
///
/// Proyección pura del estado de `App` sobre la pantalla: cabecera,
/// tabla de puertos con la fila seleccionada resaltada, barra de
/// estado y línea de atajos. El overlay de confirmación se dibuja
/// centrado cuando el despachador está esperando respuesta.
///
/// El loop es síncrono y monohilo: dibujar, esperar una tecla,
/// despachar, repetir. Los escaneos bloquean la entrada, así que dos
/// refrescos nunca se solapan.
use std::io::{self, stdout, Stdout};
use std::time::Duration;

use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, Clear, Paragraph, Row, Table, TableState,
};
use ratatui::Terminal;

use crate::app::{App, Mode, StatusKind};
use crate::port_scanner::Protocol;

/// Intervalo de espera de eventos de teclado
const TICK_RATE: Duration = Duration::from_millis(100);

/// Ejecuta el loop interactivo hasta que el usuario salga.
///
/// Activa el modo raw y la pantalla alternativa, y los restaura SIEMPRE
/// al salir, incluso si el loop devuelve error, para no dejar la
/// terminal corrupta.
pub fn run(app: &mut App) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app);

    // Restaurar la terminal pase lo que pase
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Loop principal: dibuja, espera una tecla y la despacha al modelo.
fn run_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, app))?;

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }

        if app.should_quit() {
            return Ok(());
        }
    }
}

/// Dibuja un frame completo a partir del estado del modelo.
fn draw(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::vertical([
        Constraint::Length(3), // Cabecera
        Constraint::Min(3),    // Tabla de puertos
        Constraint::Length(1), // Barra de estado
        Constraint::Length(1), // Atajos de teclado
    ])
    .split(area);

    draw_header(frame, chunks[0], app);
    draw_table(frame, chunks[1], app);
    draw_status_bar(frame, chunks[2], app);
    draw_key_hints(frame, chunks[3]);

    if app.mode() == Mode::ConfirmingKill {
        draw_confirm_overlay(frame, area, app);
    }
}

/// Cabecera con el nombre de la aplicación y el conteo de puertos.
fn draw_header(frame: &mut ratatui::Frame, area: Rect, app: &App) {
    let title = Line::from(vec![
        Span::styled(
            " PortUI ⚔️ ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {} puertos en escucha", app.items().len()),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(header, area);
}

/// Tabla de puertos con la fila seleccionada resaltada.
fn draw_table(frame: &mut ratatui::Frame, area: Rect, app: &App) {
    let header = Row::new(["Puerto", "Proto", "PID", "Proceso", "Dirección"])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .height(1);

    let rows: Vec<Row> = app
        .items()
        .iter()
        .map(|info| {
            let proto_color = match info.protocol {
                Protocol::Tcp => Color::LightBlue,
                Protocol::Udp => Color::LightMagenta,
            };
            // PID 0: dueño no visible, mostrado apagado
            let pid_cell = if info.pid == 0 {
                Cell::from("-").style(Style::default().fg(Color::DarkGray))
            } else {
                Cell::from(info.pid.to_string())
            };

            Row::new(vec![
                Cell::from(info.port.to_string())
                    .style(Style::default().fg(Color::Yellow)),
                Cell::from(info.protocol.label()).style(Style::default().fg(proto_color)),
                pid_cell,
                Cell::from(info.process_name.clone())
                    .style(Style::default().add_modifier(Modifier::BOLD)),
                Cell::from(info.local_address.clone())
                    .style(Style::default().fg(Color::Gray)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(8),
        Constraint::Length(6),
        Constraint::Length(9),
        Constraint::Min(16),
        Constraint::Min(12),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .row_highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    // La selección vive en el modelo; TableState solo es proyección
    let mut state = TableState::default();
    state.select(app.selected());
    frame.render_stateful_widget(table, area, &mut state);
}

/// Barra de estado de una línea con el último mensaje.
fn draw_status_bar(frame: &mut ratatui::Frame, area: Rect, app: &App) {
    let content = match app.status() {
        Some((msg, kind)) => {
            let (icon, color) = match kind {
                StatusKind::Success => ("✓", Color::Green),
                StatusKind::Error => ("✗", Color::Red),
                StatusKind::Info => ("●", Color::Blue),
            };
            Line::from(vec![
                Span::styled(format!(" {} ", icon), Style::default().fg(color)),
                Span::styled(msg.to_string(), Style::default().fg(color)),
            ])
        }
        None => Line::from(""),
    };

    frame.render_widget(Paragraph::new(content), area);
}

/// Línea inferior con los atajos fijos de teclado.
fn draw_key_hints(frame: &mut ratatui::Frame, area: Rect) {
    let hints = [
        ("j/k", "navegar"),
        ("x", "cerrar"),
        ("r", "actualizar"),
        ("q", "salir"),
    ];

    let spans: Vec<Span> = hints
        .iter()
        .enumerate()
        .flat_map(|(i, (key, desc))| {
            let mut s = vec![
                Span::styled(
                    format!(" {} ", key),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
                Span::styled(*desc, Style::default().fg(Color::Gray)),
            ];
            if i < hints.len() - 1 {
                s.push(Span::styled(" │", Style::default().fg(Color::DarkGray)));
            }
            s
        })
        .collect();

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Overlay centrado de confirmación de cierre.
fn draw_confirm_overlay(frame: &mut ratatui::Frame, area: Rect, app: &App) {
    let Some(info) = app.current_selection() else {
        return;
    };

    let width = 56u16.min(area.width.saturating_sub(4));
    let height = 7u16.min(area.height.saturating_sub(4));
    let x = (area.width.saturating_sub(width)) / 2;
    let y = (area.height.saturating_sub(height)) / 2;
    let popup_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, popup_area);

    let text = vec![
        Line::from(Span::styled(
            "Confirmar cierre de proceso",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!(
            "¿Terminar '{}' (PID {}) en el puerto {}?",
            info.process_name, info.pid, info.port
        )),
        Line::from(""),
        Line::from(Span::styled(
            "[s] Sí    [n] No",
            Style::default().fg(Color::Gray),
        )),
    ];

    let dialog = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Red)),
    );

    frame.render_widget(dialog, popup_area);
}
