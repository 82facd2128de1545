/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The map is styled entirely from the session's `RenderConfig`; the
/// renderer never decides what help the player gets.

use std::io::{self, BufWriter, Write};
use std::time::Instant;

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use super::map::MapRaster;
use crate::domain::difficulty::{Paint, RenderConfig, TileStyle};
use crate::sim::catalog::Catalog;
use crate::sim::session::Session;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 16],  // up to 16 bytes (flag emoji are two code points)
    ch_len: u8,
    fg: Color,
    bg: Color,
    wide: bool,    // true = this char occupies 2 terminal columns
    cont: bool,    // true = continuation of previous wide char (skip render)
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells; doubles as sea.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0,0,0, 0,0,0,0, 0,0,0,0, 0,0,0,0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: false,
    };

    const WIDE_CONT: Cell = Cell {
        ch: [0; 16],
        ch_len: 0,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: true,
    };

    /// Sentinel cell used to invalidate the back buffer.
    const INVALID: Cell = Cell {
        ch: [b'?', 0,0,0, 0,0,0,0, 0,0,0,0, 0,0,0,0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
        wide: false,
        cont: false,
    };

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        let len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.ch_len = len;
        cell.fg = fg;
        cell.bg = bg;
        cell
    }

    /// Wide cell from a multi-codepoint string (flag emoji).
    fn from_str_wide(s: &str, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        let bytes = s.as_bytes();
        let len = bytes.len().min(16);
        cell.ch[..len].copy_from_slice(&bytes[..len]);
        cell.ch_len = len as u8;
        cell.fg = fg;
        cell.bg = bg;
        cell.wide = true;
        cell
    }

    fn as_str(&self) -> &str {
        if self.ch_len == 0 { return ""; }
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or("?")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) -> usize {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.width { break; }
            self.set(cx, y, Cell::from_char(ch, fg, bg));
            cx += 1;
        }
        cx
    }

    fn put_wide(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) -> usize {
        if x + 1 >= self.width { return x; }
        self.set(x, y, Cell::from_str_wide(s, fg, bg));
        self.set(x + 1, y, Cell::WIDE_CONT);
        x + 2
    }
}

// ── View state owned by the main loop ──

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tone {
    #[default]
    Neutral,
    Good,
    Bad,
}

/// Short-lived overlay, e.g. the out-of-lives summary.
#[derive(Clone, Debug)]
pub struct Banner {
    pub text: String,
    pub until: Instant,
}

#[derive(Clone, Debug, Default)]
pub struct ViewState {
    /// Keyboard / gamepad cursor, in map cells.
    pub cursor: (usize, usize),
    /// Map cell under the mouse, if any.
    pub hover: Option<(usize, usize)>,
    pub tone: Tone,
    pub banner: Option<Banner>,
    pub gamepad_connected: bool,
}

impl ViewState {
    pub fn banner_active(&self) -> bool {
        self.banner.as_ref().map_or(false, |b| Instant::now() < b.until)
    }
}

// ── Palette ──

const SEA: Color = Cell::BASE_BG;
const LAND: Color = Color::Rgb { r: 58, g: 66, b: 52 };
const NEUTRAL_FILL: Color = Color::Rgb { r: 176, g: 176, b: 166 };
const LIGHT_BORDER: Color = Color::Rgb { r: 205, g: 205, b: 215 };
const GREY: Color = Color::Rgb { r: 110, g: 110, b: 110 };
const GRATICULE: Color = Color::Rgb { r: 52, g: 52, b: 80 };
const HUD_BG: Color = Color::Rgb { r: 34, g: 34, b: 54 };

fn paint_color(paint: Paint) -> Color {
    match paint {
        Paint::Transparent | Paint::Background => LAND,
        Paint::Neutral => NEUTRAL_FILL,
        Paint::Grey => GREY,
    }
}

fn border_color(paint: Paint) -> Color {
    match paint {
        Paint::Neutral => LIGHT_BORDER,
        other => paint_color(other),
    }
}

const OCEAN_LABELS: &[(&str, f64, f64)] = &[
    ("PACIFIC OCEAN", -150.0, 5.0),
    ("ATLANTIC OCEAN", -42.0, 28.0),
    ("INDIAN OCEAN", 68.0, -22.0),
    ("ARCTIC OCEAN", -10.0, 80.0),
];

/// A pair of regional-indicator symbols renders as one two-column flag.
fn is_flag_emoji(s: &str) -> bool {
    let mut n = 0;
    for c in s.chars() {
        if !('\u{1F1E6}'..='\u{1F1FF}').contains(&c) { return false; }
        n += 1;
    }
    n == 2
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum FlagGlyph<'a> {
    Emoji(&'a str),
    /// Non-emoji reference from a custom flag table, shown as is.
    Text(&'a str),
    Missing,
}

/// When the reference starts with a flag emoji only the emoji is drawn,
/// so trailing country codes never give the answer away.
fn flag_glyph(flag: &str) -> FlagGlyph<'_> {
    let flag = flag.trim();
    if flag.is_empty() {
        return FlagGlyph::Missing;
    }
    match flag.split_whitespace().next() {
        Some(first) if is_flag_emoji(first) => FlagGlyph::Emoji(first),
        _ => FlagGlyph::Text(flag),
    }
}

// ── Layout ──

const HUD_ROW: usize = 0;
const FLAG_ROW: usize = 1;
const MAP_ROW: usize = 3;
/// Feedback, tooltip, help.
const FOOTER_ROWS: usize = 3;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    raster: MapRaster,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            raster: MapRaster::empty(),
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Map area size `(cols, rows)` for the current terminal.
    fn map_size(&self) -> (usize, usize) {
        let rows = self.term_h.saturating_sub(MAP_ROW + FOOTER_ROWS).max(1);
        (self.term_w.max(1), rows)
    }

    pub fn raster(&self) -> &MapRaster {
        &self.raster
    }

    /// Terminal position → map cell, `None` outside the map area.
    pub fn screen_to_map(&self, x: u16, y: u16) -> Option<(usize, usize)> {
        let (x, y) = (x as usize, y as usize);
        if y < MAP_ROW { return None; }
        let (col, row) = (x, y - MAP_ROW);
        if col < self.raster.width && row < self.raster.height {
            Some((col, row))
        } else {
            None
        }
    }

    /// Rebuild the map raster if the terminal size changed.
    fn sync_raster(&mut self, catalog: &Catalog) {
        let (w, h) = self.map_size();
        if self.raster.width != w || self.raster.height != h {
            self.raster = MapRaster::build(catalog, w, h);
        }
    }

    pub fn render(&mut self, session: &Session, view: &mut ViewState) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }
        self.sync_raster(session.catalog());

        // Keep the cursor inside the map after a resize.
        view.cursor.0 = view.cursor.0.min(self.raster.width.saturating_sub(1));
        view.cursor.1 = view.cursor.1.min(self.raster.height.saturating_sub(1));

        self.front.clear();
        let cfg = session.render_config();
        self.compose_hud(session, view);
        self.compose_map(session.catalog(), &cfg, view);
        self.compose_footer(session, &cfg, view);
        if view.banner_active() {
            self.compose_banner(view);
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let cell = self.front.get(x, y);
                let prev = self.back.get(x, y);

                // Skip continuation cells (right half of wide glyph)
                if cell.cont {
                    if cell != prev { need_move = true; }
                    x += 1;
                    continue;
                }

                let cont_changed = cell.wide
                    && x + 1 < self.front.width
                    && self.front.get(x + 1, y) != self.back.get(x + 1, y);

                if cell == prev && !cont_changed {
                    need_move = true;
                    x += 1;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;

                if cell.wide {
                    last_x = x + 1;
                    x += 2;
                } else {
                    last_x = x;
                    x += 1;
                }
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, session: &Session, view: &ViewState) {
        let w = self.front.width;
        for x in 0..w {
            self.front.set(x, HUD_ROW, Cell::from_char(' ', Color::White, HUD_BG));
        }
        let stats = session.stats;
        let mut x = self.front.put_str(1, HUD_ROW, "FLAG HUNT", Color::Yellow, HUD_BG);
        x = self.front.put_str(x, HUD_ROW, &format!("   Score: {:<4}", stats.score), Color::White, HUD_BG);
        x = self.front.put_str(x, HUD_ROW, "  Lives: ", Color::White, HUD_BG);
        let hearts: String = "♥".repeat(stats.lives as usize);
        x = self.front.put_str(x, HUD_ROW, &hearts, Color::Red, HUD_BG);
        x = self.front.put_str(x, HUD_ROW, &format!("   Best: {}", stats.max_score), Color::Cyan, HUD_BG);
        let diff = format!("   [{}]", session.difficulty);
        self.front.put_str(x, HUD_ROW, &diff, Color::Green, HUD_BG);
        if view.gamepad_connected && w > 4 {
            self.front.put_str(w - 4, HUD_ROW, "pad", Color::DarkGrey, HUD_BG);
        }

        // Flag row
        let x = self.front.put_str(1, FLAG_ROW, "Find this flag: ", Color::White, Cell::BASE_BG);
        match flag_glyph(session.target_flag()) {
            FlagGlyph::Emoji(e) => {
                self.front.put_wide(x, FLAG_ROW, e, Color::White, Cell::BASE_BG);
            }
            FlagGlyph::Text(t) => {
                self.front.put_str(x, FLAG_ROW, t, Color::Yellow, Cell::BASE_BG);
            }
            FlagGlyph::Missing => {
                self.front.put_str(x, FLAG_ROW, "(no flag)", Color::DarkGrey, Cell::BASE_BG);
            }
        }
    }

    fn compose_map(&mut self, catalog: &Catalog, cfg: &RenderConfig, view: &ViewState) {
        let style = cfg.country_style;
        let show_graticule = cfg.tile_style != TileStyle::Blank;

        for row in 0..self.raster.height {
            for col in 0..self.raster.width {
                let cell = if self.raster.is_land(col, row) {
                    let fill = paint_color(style.fill);
                    if style.border_weight > 0 && self.raster.is_border(col, row) {
                        Cell::from_char(' ', Color::White, border_color(style.border))
                    } else {
                        Cell::from_char(' ', Color::White, fill)
                    }
                } else if show_graticule && self.raster.on_graticule(col, row) {
                    Cell::from_char('·', GRATICULE, SEA)
                } else {
                    Cell::from_char(' ', Color::White, SEA)
                };
                self.front.set(col, MAP_ROW + row, cell);
            }
        }

        if cfg.tile_style == TileStyle::Full {
            self.compose_ocean_labels();
        }
        if cfg.show_labels {
            self.compose_country_labels(catalog, cfg);
        }

        // Cursor
        let (cx, cy) = view.cursor;
        if cx < self.raster.width && cy < self.raster.height {
            self.front.set(cx, MAP_ROW + cy, Cell::from_char('+', Color::Black, Color::Yellow));
        }
    }

    fn compose_ocean_labels(&mut self) {
        for &(name, lon, lat) in OCEAN_LABELS {
            let Some((col, row)) = self.raster.lonlat_to_cell(lon, lat) else { continue };
            let start = col.saturating_sub(name.len() / 2);
            let fits = (start..start + name.len())
                .all(|c| c < self.raster.width && !self.raster.is_land(c, row));
            if fits {
                self.front.put_str(start, MAP_ROW + row, name, GRATICULE, SEA);
            }
        }
    }

    /// Name each country inside its own cells, clipped to the run of cells
    /// it occupies on the label row.
    fn compose_country_labels(&mut self, catalog: &Catalog, cfg: &RenderConfig) {
        let bg = paint_color(cfg.country_style.fill);
        for (idx, rec) in catalog.records().iter().enumerate() {
            if !rec.is_selectable() { continue; }
            let Some((lon, lat)) = rec.geometry.label_point() else { continue };
            let Some((col, row)) = self.raster.lonlat_to_cell(lon, lat) else { continue };
            if self.raster.feature_at(col, row) != Some(idx) { continue; }

            let mut left = col;
            while left > 0 && self.raster.feature_at(left - 1, row) == Some(idx) { left -= 1; }
            let mut right = col;
            while self.raster.feature_at(right + 1, row) == Some(idx) { right += 1; }
            let span = right - left + 1;
            if span < 3 { continue; }

            let name: String = rec.display_name.chars().take(span).collect();
            let len = name.chars().count();
            let start = (col.saturating_sub(len / 2)).clamp(left, right + 1 - len);
            self.front.put_str(start, MAP_ROW + row, &name, Color::White, bg);
        }
    }

    fn compose_footer(&mut self, session: &Session, cfg: &RenderConfig, view: &ViewState) {
        let h = self.front.height;
        if h < MAP_ROW + FOOTER_ROWS { return; }
        let feedback_row = h - 3;
        let tooltip_row = h - 2;
        let help_row = h - 1;

        let fg = match view.tone {
            Tone::Good => Color::Green,
            Tone::Bad => Color::Red,
            Tone::Neutral => Color::White,
        };
        self.front.put_str(1, feedback_row, session.feedback(), fg, Cell::BASE_BG);

        if cfg.show_labels {
            let (col, row) = view.hover.unwrap_or(view.cursor);
            if let Some(name) = self.raster.resolve(session.catalog(), col, row).display_name {
                self.front.put_str(1, tooltip_row, &format!("▸ {name}"), Color::Cyan, Cell::BASE_BG);
            }
        }

        self.front.put_str(
            1,
            help_row,
            "Click / Enter: guess   Arrows: move   Tab: difficulty   Q / Esc: quit",
            Color::DarkGrey,
            Cell::BASE_BG,
        );
    }

    fn compose_banner(&mut self, view: &ViewState) {
        let Some(banner) = &view.banner else { return };
        let text = format!("  {}  ", banner.text);
        let len = text.chars().count();
        let w = self.front.width;
        let y = MAP_ROW + self.raster.height / 2;
        let x = w.saturating_sub(len) / 2;
        self.front.put_str(x, y, &text, Color::White, Color::DarkRed);
    }
}
