// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based color/depth viewer
//!
//! Renders the masked color view and the depth view side by side using
//! Unicode half-block characters for improved vertical resolution. A left
//! click on either view picks that pixel; picked points are drawn as
//! markers until cleared.

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Widget},
};
use std::io::{self, stdout};
use tracing::{info, warn};

use crate::backends::sensor::open_first_connected;
use crate::config::Config;
use crate::constants::{BYTES_PER_PIXEL, MARKER_COLOR, MARKER_GLYPH, TERMINAL_POLL_INTERVAL};
use crate::errors::AppResult;
use crate::pipeline::{Bitmap, MaskMode, Marker, TickOutcome, View};
use crate::session::{Session, SessionState, ViewportAdapter};

/// Run the terminal viewer until the user quits
pub fn run(config: Config) -> AppResult<()> {
    let sensor = open_first_connected(&config.simulator);
    let mut session = Session::new(sensor, config);
    let state = session.start()?;
    info!(state = %state, "Session started");

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut session);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    session.shutdown();
    result
}

/// Owned copy of the last presented image
#[derive(Debug, Clone, Default)]
struct FrameImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl FrameImage {
    fn update(&mut self, bitmap: Bitmap<'_>) {
        self.width = bitmap.width;
        self.height = bitmap.height;
        self.data.clear();
        self.data.extend_from_slice(bitmap.data);
    }

    fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn sample(&self, x: u32, y: u32) -> Color {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        match self.data.get(idx..idx + 3) {
            // BGRA
            Some(p) => Color::Rgb(p[2], p[1], p[0]),
            None => Color::Black,
        }
    }
}

/// Viewport that keeps the latest images for the next redraw
#[derive(Debug, Default)]
struct TerminalViewport {
    color: FrameImage,
    depth: FrameImage,
}

impl ViewportAdapter for TerminalViewport {
    fn present(&mut self, color: Bitmap<'_>, depth: Bitmap<'_>, outcome: &TickOutcome) {
        if outcome.color_updated || self.color.is_empty() {
            self.color.update(color);
        }
        if outcome.depth_updated || self.depth.is_empty() {
            self.depth.update(depth);
        }
    }
}

/// Where an image of a given size lands inside a terminal area
#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    x_offset: u16,
    y_offset: u16,
    display_width: u16,
    /// In terminal rows; each row shows two pixel rows
    display_height: u16,
    frame_width: u32,
    frame_height: u32,
}

impl Placement {
    /// Fit a frame into `area` keeping its aspect ratio, centered
    fn fit(frame_width: u32, frame_height: u32, area: Rect) -> Option<Self> {
        if frame_width == 0 || frame_height == 0 || area.width == 0 || area.height == 0 {
            return None;
        }

        // Each terminal cell displays 2 vertical pixels using half-blocks
        let frame_aspect = frame_width as f64 / frame_height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height as f64) * 2.0;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            // Terminal is wider - fit to height
            let w = term_height * frame_aspect;
            (w as u16, (term_height / 2.0) as u16)
        } else {
            // Terminal is taller - fit to width
            let h = term_width / frame_aspect;
            (term_width as u16, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return None;
        }

        Some(Self {
            x_offset: area.x + area.width.saturating_sub(display_width) / 2,
            y_offset: area.y + area.height.saturating_sub(display_height) / 2,
            display_width,
            display_height,
            frame_width,
            frame_height,
        })
    }

    fn x_scale(&self) -> f64 {
        self.frame_width as f64 / self.display_width as f64
    }

    fn y_scale(&self) -> f64 {
        self.frame_height as f64 / (self.display_height as f64 * 2.0)
    }

    /// Frame pixel under a terminal cell, clamped to the frame
    fn cell_to_pixel(&self, column: u16, row: u16) -> Option<(u32, u32)> {
        if column < self.x_offset
            || row < self.y_offset
            || column >= self.x_offset + self.display_width
            || row >= self.y_offset + self.display_height
        {
            return None;
        }
        let tx = (column - self.x_offset) as f64;
        let ty = (row - self.y_offset) as f64;
        let x = ((tx * self.x_scale()) as u32).min(self.frame_width - 1);
        let y = ((ty * 2.0 * self.y_scale()) as u32).min(self.frame_height - 1);
        Some((x, y))
    }

    /// Terminal cell showing a frame pixel
    fn pixel_to_cell(&self, x: u32, y: u32) -> (u16, u16) {
        let tx = ((x as f64 / self.x_scale()) as u16).min(self.display_width - 1);
        let ty = ((y as f64 / (2.0 * self.y_scale())) as u16).min(self.display_height - 1);
        (self.x_offset + tx, self.y_offset + ty)
    }
}

/// Widget that renders a frame using half-block characters
struct FrameWidget<'a> {
    image: &'a FrameImage,
    placement: Option<Placement>,
    markers: &'a [Marker],
    placeholder: &'a str,
}

impl Widget for FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(placement) = self.placement.filter(|_| !self.image.is_empty()) else {
            let msg = self.placeholder;
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        let x_scale = placement.x_scale();
        let y_scale = placement.y_scale();

        // Upper half (▀) colored with fg, lower half with bg
        for ty in 0..placement.display_height {
            for tx in 0..placement.display_width {
                let term_x = placement.x_offset + tx;
                let term_y = placement.y_offset + ty;

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(self.image.sample(src_x, src_y_top));
                    cell.set_bg(self.image.sample(src_x, src_y_bottom));
                }
            }
        }

        let (r, g, b) = MARKER_COLOR;
        for marker in self.markers {
            if marker.x >= self.image.width || marker.y >= self.image.height {
                continue;
            }
            let (cx, cy) = placement.pixel_to_cell(marker.x, marker.y);
            if let Some(cell) = buf.cell_mut((cx, cy)) {
                cell.set_char(MARKER_GLYPH);
                cell.set_fg(Color::Rgb(r, g, b));
            }
        }
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default().fg(Color::White).bg(Color::DarkGray);
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }
        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(area.x, area.y, text, style);
    }
}

/// Split the screen into the two view panes and the status line
fn split(area: Rect) -> (Rect, Rect, Rect) {
    let [views, status] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(area);
    let [color, depth] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(views);
    (color, depth, status)
}

fn build_status_message(session: &Session, pick: &str) -> String {
    let sensor = session.sensor_name().unwrap_or("no sensor");
    let mask = match session.mask_mode() {
        MaskMode::MaskInvalid => "on",
        MaskMode::ShowAll => "off",
    };
    let mut msg = format!(
        "{} [{}] | tick {} | mask {} | depth {}",
        sensor,
        session.state(),
        session.tick_count(),
        mask,
        session.render_mode()
    );
    if !pick.is_empty() {
        msg.push_str(" | ");
        msg.push_str(pick);
    }
    msg.push_str(" | 'm' mask 'c' clear 'd' depth 'q' quit");
    msg
}

fn placeholder(state: SessionState) -> &'static str {
    match state {
        SessionState::NoSensor => "No sensor available",
        SessionState::Stopped => "Sensor stopped",
        _ => "Waiting for frames...",
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &mut Session,
) -> AppResult<()> {
    let mut viewport = TerminalViewport::default();
    let mut pick_message = String::new();
    let mut placements: [Option<Placement>; 2] = [None, None];
    let markers = session.markers();

    loop {
        // Drain all available frame pairs
        session.pump(&mut viewport);

        let snapshot = match markers.lock() {
            Ok(board) => board.snapshot(),
            Err(_) => Default::default(),
        };
        let status_message = build_status_message(session, &pick_message);
        let waiting = placeholder(session.state());

        terminal.draw(|f| {
            let (color_area, depth_area, status_area) = split(f.area());

            for (view, area, image, slot) in [
                (View::Color, color_area, &viewport.color, 0),
                (View::Depth, depth_area, &viewport.depth, 1),
            ] {
                let title = match view {
                    View::Color => " Color ".to_string(),
                    View::Depth => format!(" Depth ({}) ", session.render_mode()),
                };
                let block = Block::bordered().title(title);
                let inner = block.inner(area);
                f.render_widget(block, area);

                let placement = Placement::fit(image.width, image.height, inner);
                placements[slot] = placement;
                f.render_widget(
                    FrameWidget {
                        image,
                        placement,
                        markers: snapshot.for_view(view),
                        placeholder: waiting,
                    },
                    inner,
                );
            }

            f.render_widget(
                StatusBar {
                    message: &status_message,
                },
                status_area,
            );
        })?;

        // Handle input with timeout for frame updates
        if !event::poll(TERMINAL_POLL_INTERVAL)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if handle_key(session, key, &mut pick_message) {
                    break;
                }
            }
            Event::Mouse(mouse) => handle_mouse(session, mouse, &placements, &mut pick_message),
            _ => {}
        }
    }

    Ok(())
}

/// Returns true when the viewer should quit
fn handle_key(session: &mut Session, key: KeyEvent, pick_message: &mut String) -> bool {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char('q') => return true,
        KeyCode::Char('m') => {
            session.on_toggle_mask_requested();
        }
        KeyCode::Char('c') => {
            session.on_clear_markers_requested();
            pick_message.clear();
        }
        KeyCode::Char('d') => {
            session.cycle_depth_render_mode();
        }
        _ => {}
    }
    false
}

fn handle_mouse(
    session: &mut Session,
    mouse: MouseEvent,
    placements: &[Option<Placement>; 2],
    pick_message: &mut String,
) {
    if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
        return;
    }

    let hit = [View::Color, View::Depth]
        .into_iter()
        .zip(placements.iter().copied())
        .find_map(|(view, placement)| {
            placement
                .and_then(|p| p.cell_to_pixel(mouse.column, mouse.row))
                .map(|(x, y)| (view, x, y))
        });
    let Some((view, x, y)) = hit else {
        return;
    };

    match session.on_view_clicked(view, x, y) {
        Ok(result) => *pick_message = format!("{} ({}, {}): {}", view, x, y, result),
        Err(e) => {
            warn!(view = %view, x, y, error = %e, "Pick failed");
            *pick_message = e.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(width: u16, height: u16) -> Rect {
        Rect {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    #[test]
    fn test_fit_keeps_aspect_and_centers() {
        // 640x480 into 80x30 cells (80x60 half-block pixels): fit to height
        let p = Placement::fit(640, 480, area(80, 30)).unwrap();
        assert_eq!(p.display_height, 30);
        assert_eq!(p.display_width, 80);
        assert_eq!((p.x_offset, p.y_offset), (0, 0));

        let p = Placement::fit(640, 480, area(120, 30)).unwrap();
        assert!((79..=80).contains(&p.display_width));
        assert_eq!(p.x_offset, 20);
    }

    #[test]
    fn test_cell_to_pixel_round_trip_corners() {
        let p = Placement::fit(320, 240, area(80, 30)).unwrap();
        assert_eq!(p.cell_to_pixel(0, 0), Some((0, 0)));
        let (x, y) = p.cell_to_pixel(79, 29).unwrap();
        assert!(x < 320 && y < 240);
        assert_eq!(p.cell_to_pixel(80, 0), None);
        assert_eq!(p.pixel_to_cell(319, 239), (79, 29));
    }

    #[test]
    fn test_empty_frame_has_no_placement() {
        assert!(Placement::fit(0, 0, area(80, 30)).is_none());
        assert!(Placement::fit(640, 480, area(0, 0)).is_none());
    }

    fn bitmap(data: &[u8]) -> Bitmap<'_> {
        Bitmap {
            width: 2,
            height: 2,
            data,
        }
    }

    #[test]
    fn test_viewport_keeps_color_when_dropped() {
        let mut viewport = TerminalViewport::default();
        let first = [1u8; 16];
        let second = [2u8; 16];
        let outcome = TickOutcome {
            tick: 1,
            color_updated: true,
            depth_updated: true,
            masked_pixels: 0,
        };
        viewport.present(bitmap(&first), bitmap(&first), &outcome);
        let dropped = TickOutcome {
            tick: 2,
            color_updated: false,
            ..outcome
        };
        viewport.present(bitmap(&second), bitmap(&second), &dropped);

        assert_eq!(viewport.color.data, first);
        assert_eq!(viewport.depth.data, second);
        assert_eq!(viewport.color.sample(0, 0), Color::Rgb(1, 1, 1));
    }
}
