//! Per-patch progress bookkeeping fed by the tiling loop.

use iced::widget::image::Handle;
use image::{DynamicImage, GenericImageView};

/// Long side of a patch thumbnail, in pixels.
pub const THUMBNAIL_SIZE: u32 = 48;

/// A patch preview. The pixels live only inside the render handle, so the
/// table and the view share one copy.
#[derive(Clone)]
pub struct PatchThumbnail {
    pub row: u32,
    pub col: u32,
    pub width: u32,
    pub height: u32,
    pub handle: Handle,
}

impl PatchThumbnail {
    pub fn from_patch(row: u32, col: u32, patch: &DynamicImage) -> Self {
        let (w, h) = patch.dimensions();
        let small = if w.max(h) > THUMBNAIL_SIZE {
            patch.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE)
        } else {
            patch.clone()
        };
        let rgba = small.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            row,
            col,
            width,
            height,
            handle: Handle::from_pixels(width, height, rgba.into_raw()),
        }
    }

    pub fn label(&self) -> String {
        format!("Patch {}-{}", self.row, self.col)
    }
}

impl std::fmt::Debug for PatchThumbnail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchThumbnail")
            .field("row", &self.row)
            .field("col", &self.col)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Emitted once per processed patch.
#[derive(Debug, Clone)]
pub struct PatchEvent {
    pub row: u32,
    pub col: u32,
    pub rows: u32,
    pub columns: u32,
    /// Zero-based position in row-major order.
    pub index: u32,
    pub total: u32,
    pub thumbnail: PatchThumbnail,
}

#[derive(Debug, Clone, Default)]
pub struct PatchTable {
    rows: Vec<Vec<PatchThumbnail>>,
}

impl PatchTable {
    pub fn rows(&self) -> &[Vec<PatchThumbnail>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn start_row(&mut self) {
        self.rows.push(Vec::new());
    }

    fn push(&mut self, thumb: PatchThumbnail) {
        if self.rows.is_empty() {
            self.start_row();
        }
        if let Some(current) = self.rows.last_mut() {
            current.push(thumb);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Progress {
    row: u32,
    col: u32,
    processed: u32,
    rows: u32,
    columns: u32,
    table: PatchTable,
}

impl Progress {
    pub fn begin(&mut self, rows: u32, columns: u32) {
        *self = Self {
            rows,
            columns,
            ..Self::default()
        };
    }

    pub fn record(&mut self, event: PatchEvent) {
        if self.columns > 0 && self.col >= self.columns {
            self.row += 1;
            self.col = 0;
            self.table.start_row();
        }
        self.table.push(event.thumbnail);
        self.col += 1;
        self.processed += 1;
    }

    pub fn total(&self) -> u32 {
        self.rows * self.columns
    }

    pub fn processed(&self) -> u32 {
        self.processed
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    pub fn grid(&self) -> (u32, u32) {
        (self.rows, self.columns)
    }

    pub fn table(&self) -> &PatchTable {
        &self.table
    }

    pub fn percentage(&self) -> u8 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        ((self.processed as u64 * 100) / total as u64).min(100) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.total() > 0 && self.processed >= self.total()
    }
}
