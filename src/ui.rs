//! TUI rendering for the pet tracker viewer.
//!
//! Draws a pet list, a details panel and a world-map canvas with every
//! loaded position, colored the same way as the exported HTML map.

use crate::app::App;
use crate::map::{Bounds, PetMap};
use ratatui::{
    prelude::*,
    widgets::{canvas::*, *}, // Imports Points, Map, etc.
};

use ratatui::text::Line;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Renders one frame of the TUI based on current application state.
///
/// While the first load is still running, draws the loading screen.
/// Otherwise the pet sidebar (30%) sits next to the details and map panels.
pub fn render(f: &mut Frame, app: &App) {
    if app.is_loading && app.pets.is_empty() {
        render_loading_screen(f, app);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.size());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[0]);

    draw_pet_sidebar(f, app, chunks[0]);

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)])
        .split(chunks[1]);
    draw_details(f, app, main_chunks[0]);
    draw_map(f, app, main_chunks[1]);
    draw_status_line(f, app, rows[1]);
}

fn draw_pet_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .pets
        .iter()
        .enumerate()
        .map(|(i, pet)| {
            let style = if i == app.selected_index {
                Style::default()
                    .fg(Color::Cyan)
                    .bg(Color::Rgb(30, 30, 60))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let swatch = series_color(app.map.as_ref(), i);

            ListItem::new(Line::from(vec![
                Span::styled(" ● ", Style::default().fg(swatch)),
                Span::styled(format!("{:<12}", pet.track.label), style),
                Span::styled(
                    format!(" │ {} pts", pet.track.table.len()),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Pets ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(list, area);
}

fn draw_details(f: &mut Frame, app: &App, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let lines = match app.selected() {
        Some(pet) => {
            let last = pet.track.table.rows.last();
            let when = last
                .and_then(|r| r.datetime)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "---".to_string());
            let position = last
                .map(|r| format!("{:.5}, {:.5}", r.latitude, r.longitude))
                .unwrap_or_else(|| "---".to_string());
            let sensor = last
                .and_then(|r| r.sensor_used.as_deref())
                .unwrap_or("---");
            vec![
                Line::from(vec![
                    Span::styled("Pet:      ", bold),
                    Span::styled(pet.track.label.as_str(), Style::default().fg(Color::Yellow)),
                    Span::raw("  │  "),
                    Span::styled("Tracker: ", bold),
                    Span::raw(pet.tracker_id.as_str()),
                ]),
                Line::from(vec![
                    Span::styled("Last fix: ", bold),
                    Span::raw(when),
                    Span::raw("  │  "),
                    Span::styled("Sensor: ", bold),
                    Span::raw(sensor),
                ]),
                Line::from(vec![
                    Span::styled("Position: ", bold),
                    Span::raw(position),
                    Span::raw("  │  "),
                    Span::styled("Points: ", bold),
                    Span::raw(pet.track.table.len().to_string()),
                ]),
                Line::from(vec![
                    Span::styled("Updated:  ", bold),
                    Span::raw(
                        app.last_update
                            .map(|t| format!("{}s ago", t.elapsed().as_secs()))
                            .unwrap_or_else(|| "never".to_string()),
                    ),
                ]),
            ]
        }
        None => vec![Line::from("No pets loaded.")],
    };

    let p = Paragraph::new(lines).block(
        Block::default()
            .title(" Details ")
            .borders(Borders::ALL)
            .padding(Padding::horizontal(1)),
    );
    f.render_widget(p, area);
}

fn draw_map(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().title(" Tracks ").borders(Borders::ALL);
    let Some(map) = app.map.as_ref() else {
        f.render_widget(Paragraph::new(" No positions to show.").block(block), area);
        return;
    };
    let [x_bounds, y_bounds] = padded_bounds(&map.bounds);

    let canvas = Canvas::default()
        .block(block)
        .marker(symbols::Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| {
            // Landmass Outlines
            ctx.draw(&Map {
                color: Color::Rgb(50, 50, 50),
                resolution: MapResolution::High,
            });
            ctx.layer();

            for (i, series) in map.series.iter().enumerate() {
                let coords: Vec<(f64, f64)> = map
                    .markers
                    .iter()
                    .filter(|m| m.series == i)
                    .map(|m| (m.longitude, m.latitude))
                    .collect();
                ctx.draw(&Points {
                    coords: &coords,
                    color: palette_color(&series.color),
                });

                if i == app.selected_index {
                    if let Some(&(lon, lat)) = coords.last() {
                        ctx.print(
                            lon,
                            lat,
                            Line::from(Span::styled(
                                format!(" {} ", series.label),
                                Style::default().fg(Color::Black).bg(Color::Yellow),
                            )),
                        );
                    }
                }
            }
        });

    f.render_widget(canvas, area);
}

fn draw_status_line(f: &mut Frame, app: &App, area: Rect) {
    let spinner = if app.is_loading {
        SPINNER[app.tick_count % SPINNER.len()]
    } else {
        " "
    };
    let line = Line::from(vec![
        Span::styled(format!(" {} {} ", spinner, app.status), Style::default().fg(Color::Yellow)),
        Span::styled(
            " ↑/↓ select  m map  c csv  s save json  r reload  q quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

/// First-run screen shown until the loader reports back.
fn render_loading_screen(f: &mut Frame, app: &App) {
    let area = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height / 2).saturating_sub(1)),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    let msg = Paragraph::new(format!(
        "{} {}",
        SPINNER[app.tick_count % SPINNER.len()],
        app.status
    ))
    .alignment(Alignment::Center)
    .style(Style::default().fg(Color::DarkGray));
    f.render_widget(msg, chunks[1]);
}

/// Canvas `[x, y]` bounds around the markers, with a margin so edge points
/// are not drawn on the border.
fn padded_bounds(bounds: &Bounds) -> [[f64; 2]; 2] {
    let pad_lon = ((bounds.east - bounds.west) * 0.1).max(0.01);
    let pad_lat = ((bounds.north - bounds.south) * 0.1).max(0.01);
    [
        [bounds.west - pad_lon, bounds.east + pad_lon],
        [bounds.south - pad_lat, bounds.north + pad_lat],
    ]
}

fn series_color(map: Option<&PetMap>, index: usize) -> Color {
    map.and_then(|m| m.series.get(index))
        .map(|s| palette_color(&s.color))
        .unwrap_or(Color::White)
}

/// Terminal approximation of the awesome-markers color names.
fn palette_color(name: &str) -> Color {
    match name {
        "red" => Color::Red,
        "blue" => Color::Blue,
        "green" => Color::Green,
        "purple" => Color::Magenta,
        "orange" => Color::Rgb(255, 165, 0),
        "darkred" => Color::Rgb(139, 0, 0),
        "lightred" => Color::LightRed,
        "beige" => Color::Rgb(245, 245, 220),
        "darkblue" => Color::Rgb(0, 0, 139),
        "darkgreen" => Color::Rgb(0, 100, 0),
        "cadetblue" => Color::Rgb(95, 158, 160),
        "darkpurple" => Color::Rgb(85, 26, 139),
        "white" => Color::White,
        "pink" => Color::Rgb(255, 192, 203),
        "lightblue" => Color::LightBlue,
        "lightgreen" => Color::LightGreen,
        "gray" => Color::Gray,
        "black" => Color::Black,
        "lightgray" => Color::Rgb(211, 211, 211),
        _ => Color::White,
    }
}
