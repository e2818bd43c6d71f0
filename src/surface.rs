use std::collections::VecDeque;
use tracing::debug;

pub const NO_WRAP_COLUMNS: u16 = 1000;
pub const DEFAULT_SCROLLBACK: usize = 1_000;

const MIN_ROWS: u16 = 1;
const MIN_COLS: u16 = 2;
const FALLBACK_ROWS: u16 = 24;
const FALLBACK_COLS: u16 = 80;
const MAX_HISTORY_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ContainerSize {
    pub width: u32,
    pub height: u32,
}

impl ContainerSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CellMetrics {
    pub cell_width: u32,
    pub cell_height: u32,
    pub padding: u32,
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self {
            cell_width: 1,
            cell_height: 1,
            padding: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Dimensions {
    pub rows: u16,
    pub cols: u16,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FitMode {
    Wrap,
    NoWrap { columns: u16 },
}

#[derive(Debug, Clone, Copy)]
pub enum Chunk<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
}

impl Chunk<'_> {
    fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SurfaceOptions {
    pub metrics: CellMetrics,
    pub scrollback: usize,
    pub convert_eol: bool,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            metrics: CellMetrics::default(),
            scrollback: DEFAULT_SCROLLBACK,
            convert_eol: false,
        }
    }
}

/// Rows and columns that exactly fill `container`, or `None` when the
/// container has no usable area.
pub fn propose_dimensions(container: ContainerSize, metrics: CellMetrics) -> Option<Dimensions> {
    if metrics.cell_width == 0 || metrics.cell_height == 0 {
        return None;
    }

    let inner_width = container.width.checked_sub(metrics.padding * 2)?;
    let inner_height = container.height.checked_sub(metrics.padding * 2)?;
    if inner_width == 0 || inner_height == 0 {
        return None;
    }

    let cols = (inner_width / metrics.cell_width).min(u32::from(u16::MAX)) as u16;
    let rows = (inner_height / metrics.cell_height).min(u32::from(u16::MAX)) as u16;
    Some(Dimensions {
        rows: rows.max(MIN_ROWS),
        cols: cols.max(MIN_COLS),
    })
}

/// Emulated terminal bound to one view container.
pub struct TerminalSurface {
    options: SurfaceOptions,
    parser: Option<vt100::Parser>,
    container: Option<ContainerSize>,
    input_enabled: bool,
    disposed: bool,
    writes: u64,
    last_byte: Option<u8>,
    scroll_x: u16,
    history: VecDeque<u8>,
    history_lines: usize,
}

impl TerminalSurface {
    pub fn new(options: SurfaceOptions) -> Self {
        Self {
            options,
            parser: None,
            container: None,
            input_enabled: false,
            disposed: false,
            writes: 0,
            last_byte: None,
            scroll_x: 0,
            history: VecDeque::new(),
            history_lines: 0,
        }
    }

    pub fn initialize(&mut self, container: Option<ContainerSize>) -> bool {
        if self.disposed || self.parser.is_some() {
            return false;
        }
        let Some(container) = container else {
            return false;
        };

        let dims = propose_dimensions(container, self.options.metrics).unwrap_or(Dimensions {
            rows: FALLBACK_ROWS,
            cols: FALLBACK_COLS,
        });
        self.parser = Some(vt100::Parser::new(
            dims.rows,
            dims.cols,
            self.options.scrollback,
        ));
        self.container = Some(container);
        debug!(rows = dims.rows, cols = dims.cols, "terminal surface attached");
        true
    }

    pub fn is_attached(&self) -> bool {
        self.parser.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn write(&mut self, chunk: Chunk<'_>) {
        let Some(parser) = self.parser.as_mut() else {
            return;
        };

        let bytes = chunk.as_bytes();
        let converted;
        let processed = if self.options.convert_eol {
            let mut out = Vec::with_capacity(bytes.len() + 8);
            let mut previous = self.last_byte;
            for &byte in bytes {
                if byte == b'\n' && previous != Some(b'\r') {
                    out.push(b'\r');
                }
                out.push(byte);
                previous = Some(byte);
            }
            converted = out;
            converted.as_slice()
        } else {
            bytes
        };
        parser.process(processed);
        let rows = parser.screen().size().0;
        self.record(processed, rows);

        if let Some(&last) = bytes.last() {
            self.last_byte = Some(last);
        }
        self.writes += 1;
    }

    /// Keeps the processed stream so a column change can be replayed at the
    /// new width. Bounded by the scrollback plus one screen of lines.
    fn record(&mut self, bytes: &[u8], rows: u16) {
        self.history.extend(bytes);
        self.history_lines += bytes.iter().filter(|&&byte| byte == b'\n').count();

        let line_limit = self.options.scrollback.saturating_add(usize::from(rows));
        while self.history_lines > line_limit {
            let Some(end) = self.history.iter().position(|&byte| byte == b'\n') else {
                break;
            };
            self.history.drain(..=end);
            self.history_lines -= 1;
        }

        if self.history.len() > MAX_HISTORY_BYTES {
            let excess = self.history.len() - MAX_HISTORY_BYTES;
            let cut = self
                .history
                .iter()
                .skip(excess)
                .position(|&byte| byte == b'\n')
                .map_or(excess, |pos| excess + pos + 1);
            let dropped = self
                .history
                .drain(..cut)
                .filter(|&byte| byte == b'\n')
                .count();
            self.history_lines = self.history_lines.saturating_sub(dropped);
        }
    }

    /// Rebuilds the emulator at `dims` from the recorded stream, so lines cut
    /// by a narrower grid come back at full length.
    fn replay(&mut self, dims: Dimensions) {
        let mut parser = vt100::Parser::new(dims.rows, dims.cols, self.options.scrollback);
        let (front, back) = self.history.as_slices();
        parser.process(front);
        parser.process(back);
        self.parser = Some(parser);
    }

    pub fn write_text(&mut self, text: &str) {
        self.write(Chunk::Text(text));
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write(Chunk::Bytes(bytes));
    }

    pub fn write_count(&self) -> u64 {
        self.writes
    }

    pub fn set_container(&mut self, container: ContainerSize) {
        self.container = Some(container);
    }

    pub fn fit(&mut self, mode: FitMode) -> Option<Dimensions> {
        let container = self.container?;
        let current = self.dimensions()?;
        let proposed = propose_dimensions(container, self.options.metrics)?;

        let dims = match mode {
            FitMode::Wrap => proposed,
            FitMode::NoWrap { columns } => Dimensions {
                rows: proposed.rows,
                cols: columns.max(MIN_COLS),
            },
        };

        if current.cols != dims.cols {
            self.replay(dims);
            debug!(
                rows = dims.rows,
                cols = dims.cols,
                replayed = self.history.len(),
                ?mode,
                "terminal surface reflowed"
            );
        } else if current.rows != dims.rows
            && let Some(parser) = self.parser.as_mut()
        {
            parser.screen_mut().set_size(dims.rows, dims.cols);
            debug!(rows = dims.rows, cols = dims.cols, ?mode, "terminal surface resized");
        }
        if mode == FitMode::Wrap {
            self.scroll_x = 0;
        }
        Some(dims)
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        self.parser.as_ref().map(|parser| {
            let (rows, cols) = parser.screen().size();
            Dimensions { rows, cols }
        })
    }

    pub fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled && !self.disposed;
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// One unit of user input. Passed through unchanged while input is
    /// enabled, swallowed otherwise.
    pub fn input<'a>(&self, data: &'a str) -> Option<&'a str> {
        if self.input_enabled && self.parser.is_some() && !data.is_empty() {
            Some(data)
        } else {
            None
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        if let Some(parser) = self.parser.as_mut() {
            let current = parser.screen().scrollback();
            parser.screen_mut().set_scrollback(current.saturating_add(lines));
        }
    }

    pub fn scroll_down(&mut self, lines: usize) {
        if let Some(parser) = self.parser.as_mut() {
            let current = parser.screen().scrollback();
            parser.screen_mut().set_scrollback(current.saturating_sub(lines));
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        if let Some(parser) = self.parser.as_mut() {
            parser.screen_mut().set_scrollback(0);
        }
    }

    pub fn scroll_left(&mut self, columns: u16) {
        self.scroll_x = self.scroll_x.saturating_sub(columns);
    }

    pub fn scroll_right(&mut self, columns: u16, viewport_width: u16) {
        let Some(dims) = self.dimensions() else {
            return;
        };
        let max = dims.cols.saturating_sub(viewport_width);
        self.scroll_x = self.scroll_x.saturating_add(columns).min(max);
    }

    pub fn scroll_x(&self) -> u16 {
        self.scroll_x
    }

    pub fn screen(&self) -> Option<&vt100::Screen> {
        self.parser.as_ref().map(vt100::Parser::screen)
    }

    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        self.input_enabled = false;
        self.parser = None;
        self.container = None;
        self.history.clear();
        self.history_lines = 0;
        debug!(writes = self.writes, "terminal surface disposed");
        true
    }
}
