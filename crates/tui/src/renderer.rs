use std::cell::RefCell;
use std::io::stdout;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
};
use viewport_sense_core::clipboard::{COPIED_LABEL, COPY_LABEL};
use viewport_sense_core::engine::{
    DARK_SCHEME_QUERY, HIGH_CONTRAST_QUERY, REDUCED_DATA_QUERY, REDUCED_MOTION_QUERY,
};
use viewport_sense_core::protocol::{
    AccessibilityState, Breakpoint, ColorScheme, DeviceClass, DeviceState, Rect as PageRect,
    SafeAreaInsets, ScrollState, ViewportState,
};
use viewport_sense_core::{
    ElementId, ElementRef, HeadlessPlatform, Platform, Subscription, ViewportEngine,
    VisibilityOptions,
};

/// CSS pixels per terminal cell.
pub const CELL_WIDTH_PX: u32 = 8;
pub const CELL_HEIGHT_PX: u32 = 16;

const SCROLL_STEP_PX: f64 = 48.0;
const BREAKPOINT_HISTORY: usize = 6;

/// The simulated page is this many viewports tall, with a marker element
/// starting halfway down.
const PAGE_SCREENS: f64 = 6.0;
const MARKER_SCREEN: f64 = 3.0;
const MARKER_ROWS: u32 = 6;
const MARKER: ElementId = ElementId(1);

pub fn cells_to_pixels(cols: u16, rows: u16) -> (u32, u32) {
    (
        u32::from(cols) * CELL_WIDTH_PX,
        u32::from(rows) * CELL_HEIGHT_PX,
    )
}

/// Latest value of every projection, as delivered by the engine.
#[derive(Debug, Default)]
struct Dashboard {
    viewport: Option<ViewportState>,
    breakpoints: Vec<Breakpoint>,
    scroll: Option<ScrollState>,
    accessibility: AccessibilityState,
    dark: bool,
    reduced_motion: bool,
    marker_visible: bool,
    safe_area: SafeAreaInsets,
}

impl Dashboard {
    fn record_breakpoint(&mut self, tier: Breakpoint) {
        self.breakpoints.push(tier);
        if self.breakpoints.len() > BREAKPOINT_HISTORY {
            self.breakpoints.remove(0);
        }
    }
}

/// Size the simulated document and marker to a `width`×`height` viewport.
fn layout_page(platform: &HeadlessPlatform, width: u32, height: u32) {
    let height = f64::from(height);
    platform.set_document_height(height * PAGE_SCREENS);
    platform.place_element(
        MARKER,
        PageRect::new(
            0.0,
            height * MARKER_SCREEN,
            f64::from(width),
            f64::from(MARKER_ROWS * CELL_HEIGHT_PX),
        ),
    );
}

fn toggle_media(platform: &HeadlessPlatform, query: &str) {
    platform.set_media(query, !platform.matches_media(query));
}

/// Wire every projection into `dashboard`. The returned handles keep the
/// subscriptions alive.
fn subscribe(
    engine: &ViewportEngine<HeadlessPlatform>,
    dashboard: &Rc<RefCell<Dashboard>>,
    marker: &ElementRef,
) -> Vec<Subscription> {
    let d = Rc::clone(dashboard);
    let viewport = engine.observe_viewport(move |state| d.borrow_mut().viewport = Some(state.clone()));
    let d = Rc::clone(dashboard);
    let breakpoint = engine.observe_breakpoint(move |tier| d.borrow_mut().record_breakpoint(tier));
    let d = Rc::clone(dashboard);
    let scroll = engine.observe_scroll(move |state| d.borrow_mut().scroll = Some(*state));
    let d = Rc::clone(dashboard);
    let accessibility =
        engine.observe_accessibility(move |state| d.borrow_mut().accessibility = *state);
    let d = Rc::clone(dashboard);
    let scheme = engine
        .observe_color_scheme(move |scheme| d.borrow_mut().dark = scheme == ColorScheme::Dark);
    let d = Rc::clone(dashboard);
    let motion = engine.observe_reduced_motion(move |reduce| d.borrow_mut().reduced_motion = reduce);
    let d = Rc::clone(dashboard);
    let visibility = engine.observe_visibility(marker, VisibilityOptions::default(), move |visible| {
        d.borrow_mut().marker_visible = visible;
    });
    let d = Rc::clone(dashboard);
    let safe_area = engine.observe_safe_area(move |insets| d.borrow_mut().safe_area = *insets);

    vec![
        viewport,
        breakpoint,
        scroll,
        accessibility,
        scheme,
        motion,
        visibility,
        safe_area,
    ]
}

pub fn run_tui(engine: &ViewportEngine<HeadlessPlatform>) -> Result<()> {
    let platform = Rc::clone(engine.platform());

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let size = terminal.size()?;
    let (width, height) = cells_to_pixels(size.width, size.height);
    layout_page(&platform, width, height);
    platform.resize(width, height);

    let dashboard = Rc::new(RefCell::new(Dashboard::default()));
    let marker = ElementRef::with_target(MARKER);
    let subscriptions = subscribe(engine, &dashboard, &marker);
    let copy = engine.copy_feedback();

    let started = Instant::now();
    let mut clock_ms = 0.0;

    loop {
        let now_ms = started.elapsed().as_secs_f64() * 1000.0;
        platform.advance(now_ms - clock_ms);
        clock_ms = now_ms;

        let copy_label = if copy.copied_text().is_some() {
            COPIED_LABEL
        } else {
            COPY_LABEL
        };
        terminal.draw(|frame| draw(frame, &dashboard.borrow(), engine.device(), copy_label))?;

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Up => platform.scroll_by(-SCROLL_STEP_PX),
                KeyCode::Down => platform.scroll_by(SCROLL_STEP_PX),
                KeyCode::PageUp => platform.scroll_by(-f64::from(platform.inner_size().1)),
                KeyCode::PageDown => platform.scroll_by(f64::from(platform.inner_size().1)),
                KeyCode::Home => platform.scroll_to(0.0),
                KeyCode::End => platform.scroll_to(platform.document_height()),
                KeyCode::Char('c') => toggle_media(&platform, DARK_SCHEME_QUERY),
                KeyCode::Char('m') => toggle_media(&platform, REDUCED_MOTION_QUERY),
                KeyCode::Char('h') => toggle_media(&platform, HIGH_CONTRAST_QUERY),
                KeyCode::Char('d') => toggle_media(&platform, REDUCED_DATA_QUERY),
                KeyCode::Char('y') => {
                    let json = serde_json::to_string(&engine.viewport())?;
                    copy.copy(&json, |_| {});
                }
                _ => {}
            },
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollDown => platform.scroll_by(SCROLL_STEP_PX),
                MouseEventKind::ScrollUp => platform.scroll_by(-SCROLL_STEP_PX),
                _ => {}
            },
            Event::Resize(cols, rows) => {
                let (width, height) = cells_to_pixels(cols, rows);
                layout_page(&platform, width, height);
                platform.resize(width, height);
            }
            _ => {}
        }
    }

    drop(subscriptions);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}

fn flag(on: bool) -> &'static str {
    if on { "yes" } else { "no" }
}

fn panel<'a>(title: &'a str, lines: Vec<Line<'a>>, style: Style) -> Paragraph<'a> {
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(style)
}

fn draw(frame: &mut Frame, dashboard: &Dashboard, device: &DeviceState, copy_label: &str) {
    let area = frame.area();
    let style = if dashboard.dark {
        Style::default().fg(Color::White).bg(Color::Black)
    } else {
        Style::default().fg(Color::Black).bg(Color::White)
    };

    let [header, body, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let title = dashboard.viewport.as_ref().map_or_else(
        || " viewport-sense ".to_string(),
        |v| format!(" viewport-sense | {}×{} px | {} ", v.width, v.height, v.breakpoint),
    );
    frame.render_widget(
        Block::default()
            .title(title)
            .style(Style::default().fg(Color::White).bg(Color::DarkGray)),
        header,
    );

    let [left, right] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(body);
    let [viewport_area, device_area] =
        Layout::vertical([Constraint::Min(9), Constraint::Length(8)]).areas(left);
    let [prefs_area, scroll_area, page_area] = Layout::vertical([
        Constraint::Length(6),
        Constraint::Length(7),
        Constraint::Min(4),
    ])
    .areas(right);

    frame.render_widget(panel(" Viewport ", viewport_lines(dashboard), style), viewport_area);
    frame.render_widget(panel(" Device ", device_lines(device), style), device_area);
    frame.render_widget(panel(" Preferences ", preference_lines(dashboard), style), prefs_area);
    frame.render_widget(panel(" Scroll ", scroll_lines(dashboard), style), scroll_area);
    frame.render_widget(panel(" Page ", page_lines(dashboard), style), page_area);

    let help = format!(
        " ↑↓/PgUp/PgDn scroll | c scheme | m motion | h contrast | d data | y {copy_label} | q quit "
    );
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::White).bg(Color::DarkGray)),
        footer,
    );

    render_marker_hint(frame, dashboard, body);
}

fn viewport_lines(dashboard: &Dashboard) -> Vec<Line<'static>> {
    let Some(v) = dashboard.viewport.as_ref() else {
        return vec![Line::from("waiting for first sample")];
    };
    let class = match v.device_class() {
        DeviceClass::Mobile => "mobile",
        DeviceClass::Tablet => "tablet",
        DeviceClass::Desktop => "desktop",
    };
    let history = dashboard
        .breakpoints
        .iter()
        .copied()
        .map(Breakpoint::as_str)
        .collect::<Vec<_>>()
        .join(" → ");
    vec![
        Line::from(format!("size:        {} × {} px", v.width, v.height)),
        Line::from(format!("breakpoint:  {}", v.breakpoint)),
        Line::from(format!("class:       {class}")),
        Line::from(format!("orientation: {:?}", v.orientation).to_lowercase()),
        Line::from(format!("pixel ratio: {}", v.pixel_ratio)),
        Line::from(format!("history:     {history}")),
    ]
}

fn device_lines(device: &DeviceState) -> Vec<Line<'static>> {
    let version = if device.browser_version.is_empty() {
        String::new()
    } else {
        format!(" {}", device.browser_version)
    };
    vec![
        Line::from(format!("browser:  {}{version}", device.browser)),
        Line::from(format!("os:       {}", device.os)),
        Line::from(format!("touch:    {} points", device.touch_points)),
        Line::from(format!("pwa:      {}", flag(device.is_pwa))),
        Line::from(format!("density:  {:?}", device.screen_density).to_lowercase()),
    ]
}

fn preference_lines(dashboard: &Dashboard) -> Vec<Line<'static>> {
    vec![
        Line::from(format!(
            "color scheme:   {}",
            if dashboard.dark { "dark" } else { "light" }
        )),
        Line::from(format!("reduced motion: {}", flag(dashboard.reduced_motion))),
        Line::from(format!(
            "high contrast:  {}",
            flag(dashboard.accessibility.prefers_high_contrast)
        )),
        Line::from(format!(
            "reduced data:   {}",
            flag(dashboard.accessibility.prefers_reduced_data)
        )),
    ]
}

fn scroll_lines(dashboard: &Dashboard) -> Vec<Line<'static>> {
    let Some(s) = dashboard.scroll.as_ref() else {
        return vec![Line::from("no scroll sample yet")];
    };
    vec![
        Line::from(format!("y:          {:.0} px", s.y)),
        Line::from(format!("direction:  {:?}", s.direction_y).to_lowercase()),
        Line::from(format!("velocity:   {:.0} px/s", s.velocity)),
        Line::from(format!("near top:   {}", flag(s.is_near_top))),
        Line::from(format!("near bottom:{}", flag(s.is_near_bottom))),
    ]
}

fn page_lines(dashboard: &Dashboard) -> Vec<Line<'static>> {
    let insets = dashboard.safe_area;
    vec![
        Line::from(format!("marker visible: {}", flag(dashboard.marker_visible))),
        Line::from(format!(
            "safe area:      {} {} {} {}",
            insets.top, insets.right, insets.bottom, insets.left
        )),
    ]
}

/// Highlight the bottom row while the marker element is on screen.
fn render_marker_hint(frame: &mut Frame, dashboard: &Dashboard, body: Rect) {
    if !dashboard.marker_visible || body.height == 0 {
        return;
    }
    let row = Rect::new(body.x, body.y + body.height - 1, body.width, 1);
    frame.render_widget(
        Paragraph::new(" ▶ marker in view ").style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        row,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_map_to_css_pixels() {
        assert_eq!(cells_to_pixels(80, 24), (640, 384));
        assert_eq!(cells_to_pixels(0, 0), (0, 0));
    }

    #[test]
    fn breakpoint_history_is_bounded() {
        let mut dashboard = Dashboard::default();
        for tier in Breakpoint::ALL.into_iter().chain(Breakpoint::ALL) {
            dashboard.record_breakpoint(tier);
        }
        assert_eq!(dashboard.breakpoints, Breakpoint::ALL.to_vec());
    }

    #[test]
    fn viewport_panel_shows_class_and_history() {
        let mut dashboard = Dashboard {
            viewport: Some(ViewportState::new(900, 700, Breakpoint::Md, 2.0)),
            ..Dashboard::default()
        };
        dashboard.record_breakpoint(Breakpoint::Sm);
        dashboard.record_breakpoint(Breakpoint::Md);

        let lines: Vec<String> = viewport_lines(&dashboard)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert!(lines.contains(&"class:       tablet".to_string()));
        assert!(lines.contains(&"history:     sm → md".to_string()));
    }

    #[test]
    fn dashboard_tracks_headless_host() {
        let platform = Rc::new(HeadlessPlatform::new());
        let (width, height) = cells_to_pixels(80, 24);
        layout_page(&platform, width, height);
        platform.resize(width, height);

        let engine = ViewportEngine::new(Rc::clone(&platform));
        let dashboard = Rc::new(RefCell::new(Dashboard::default()));
        let marker = ElementRef::with_target(MARKER);
        let subscriptions = subscribe(&engine, &dashboard, &marker);

        let (width, height) = cells_to_pixels(170, 50);
        layout_page(&platform, width, height);
        platform.resize(width, height);
        platform.scroll_to(f64::from(height) * MARKER_SCREEN);
        toggle_media(&platform, DARK_SCHEME_QUERY);

        {
            let dashboard = dashboard.borrow();
            let viewport = dashboard.viewport.as_ref().unwrap();
            assert_eq!(viewport.width, 1360);
            assert_eq!(viewport.breakpoint, Breakpoint::Xl);
            assert_eq!(dashboard.breakpoints, vec![Breakpoint::Sm, Breakpoint::Xl]);
            assert!(dashboard.marker_visible);
            assert!(dashboard.dark);
        }

        drop(subscriptions);
        toggle_media(&platform, DARK_SCHEME_QUERY);
        assert!(dashboard.borrow().dark);
    }
}
