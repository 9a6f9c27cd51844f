use super::site::{SiteId, StorageSite};

/// Compressed-row sparse connectivity between two storage sites, mapping each
/// row entity to its column entities (cell -> faces, face -> cells, ...).
#[derive(Debug, Clone)]
pub struct Connectivity {
    from: SiteId,
    to: SiteId,
    row_offsets: Vec<usize>,
    columns: Vec<usize>,
}

impl Connectivity {
    pub fn from_site(&self) -> SiteId {
        self.from
    }

    pub fn to_site(&self) -> SiteId {
        self.to
    }

    pub fn row_count(&self) -> usize {
        self.row_offsets.len() - 1
    }

    pub fn entry_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of column entities connected to `row`.
    pub fn count(&self, row: usize) -> usize {
        self.row_offsets[row + 1] - self.row_offsets[row]
    }

    /// Column entities connected to `row`.
    pub fn neighbors(&self, row: usize) -> &[usize] {
        &self.columns[self.row_offsets[row]..self.row_offsets[row + 1]]
    }
}

/// Two-pass builder for [`Connectivity`]: declare per-row counts, then fill
/// entries.
///
/// Protocol: `add_count` for every row, `finish_count`, `add` exactly as many
/// entries per row as declared, `finish`.
pub struct ConnectivityBuilder {
    from: SiteId,
    to: SiteId,
    to_count: usize,
    row_offsets: Vec<usize>,
    cursor: Vec<usize>,
    columns: Vec<usize>,
    counting: bool,
}

impl ConnectivityBuilder {
    pub fn new(from: &StorageSite, to: &StorageSite) -> Self {
        Self {
            from: from.id(),
            to: to.id(),
            to_count: to.count(),
            row_offsets: vec![0; from.count() + 1],
            cursor: Vec::new(),
            columns: Vec::new(),
            counting: true,
        }
    }

    /// Declares `count` additional entries for `row`.
    pub fn add_count(&mut self, row: usize, count: usize) {
        assert!(self.counting, "add_count after finish_count");
        self.row_offsets[row + 1] += count;
    }

    /// Freezes the counts and switches the builder to the fill stage.
    pub fn finish_count(&mut self) {
        assert!(self.counting, "finish_count called twice");
        for i in 1..self.row_offsets.len() {
            self.row_offsets[i] += self.row_offsets[i - 1];
        }
        self.cursor = self.row_offsets[..self.row_offsets.len() - 1].to_vec();
        self.columns = vec![usize::MAX; *self.row_offsets.last().unwrap_or(&0)];
        self.counting = false;
    }

    /// Records that `row` connects to `col`.
    pub fn add(&mut self, row: usize, col: usize) {
        assert!(!self.counting, "add before finish_count");
        debug_assert!(col < self.to_count, "column {col} out of range");
        let slot = self.cursor[row];
        assert!(
            slot < self.row_offsets[row + 1],
            "row {row} received more entries than declared"
        );
        self.columns[slot] = col;
        self.cursor[row] += 1;
    }

    pub fn finish(self) -> Connectivity {
        assert!(!self.counting, "finish before finish_count");
        debug_assert!(
            self.cursor
                .iter()
                .enumerate()
                .all(|(row, &c)| c == self.row_offsets[row + 1]),
            "some rows received fewer entries than declared"
        );
        Connectivity {
            from: self.from,
            to: self.to,
            row_offsets: self.row_offsets,
            columns: self.columns,
        }
    }
}
