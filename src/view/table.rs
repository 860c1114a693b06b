use crate::delta::{DeltaMarker, classify};
use crate::identity::workload_base_name;
use crate::model::TableData;
use crate::view::actions::{Hint, KeyActions};
use chrono::{DateTime, Local};
use std::collections::HashMap;

// Ages grow on every refresh; marking them would highlight every row.
const AGE_HEADER: &str = "AGE";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCell {
    pub text: String,
    pub delta: DeltaMarker,
}

#[derive(Debug, Clone, Default)]
pub struct TableRow {
    pub id: String,
    pub namespace: Option<String>,
    pub name: String,
    pub cells: Vec<TableCell>,
    pub detail: String,
}

impl TableRow {
    pub fn cell_text(&self, column: usize) -> Option<&str> {
        self.cells.get(column).map(|cell| cell.text.as_str())
    }
}

/// Master table page. Row 0 addresses the header; data rows are 1..=N over
/// the rows that pass the current filter and workload.
#[derive(Debug, Clone, Default)]
pub struct TableView {
    title: String,
    headers: Vec<String>,
    rows: Vec<TableRow>,
    filter: String,
    workload: Option<String>,
    selected: usize,
    error: Option<String>,
    last_refreshed: Option<DateTime<Local>>,
    actions: KeyActions,
}

impl TableView {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn workload(&self) -> Option<&str> {
        self.workload.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Local>> {
        self.last_refreshed
    }

    pub fn visible_rows(&self) -> Vec<&TableRow> {
        let needle = self.filter.to_lowercase();
        self.rows
            .iter()
            .filter(|row| match &self.workload {
                Some(workload) => workload_base_name(&row.name) == workload.as_str(),
                None => true,
            })
            .filter(|row| {
                needle.is_empty()
                    || row
                        .cells
                        .iter()
                        .any(|cell| cell.text.to_lowercase().contains(&needle))
            })
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.visible_rows().len()
    }

    pub fn row(&self, row: usize) -> Option<&TableRow> {
        if row == 0 {
            return None;
        }
        self.visible_rows().get(row - 1).copied()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&TableCell> {
        self.row(row)?.cells.get(column)
    }

    /// Cell text with surrounding whitespace removed.
    pub fn trim_cell(&self, row: usize, column: usize) -> Option<&str> {
        self.cell(row, column).map(|cell| cell.text.trim())
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|candidate| candidate.eq_ignore_ascii_case(header))
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_row(&self) -> Option<&TableRow> {
        self.row(self.selected)
    }

    pub fn select(&mut self, row: usize) -> usize {
        self.selected = row.min(self.row_count());
        self.selected
    }

    pub fn move_selection(&mut self, delta: isize) -> usize {
        let count = self.row_count();
        if count == 0 {
            self.selected = 0;
            return 0;
        }

        let next = (self.selected as isize).saturating_add(delta);
        self.selected = next.clamp(1, count as isize) as usize;
        self.selected
    }

    pub fn select_first(&mut self) -> usize {
        let first = usize::from(self.row_count() > 0);
        self.select(first)
    }

    pub fn select_last(&mut self) -> usize {
        let last = self.row_count();
        self.select(last)
    }

    /// Replaces the rows with a fresh snapshot, marks every cell that changed
    /// since the previous snapshot of the same row, and keeps the selection on
    /// the row identified by `keep`. Returns the selected row.
    pub fn update(&mut self, snapshot: TableData, keep: &str) -> usize {
        let previous_headers = std::mem::take(&mut self.headers);
        let previous_rows = std::mem::take(&mut self.rows);
        let previous_by_id = previous_rows
            .iter()
            .map(|row| (row.id.as_str(), row))
            .collect::<HashMap<_, _>>();
        let previous_columns = snapshot
            .headers
            .iter()
            .map(|header| {
                previous_headers
                    .iter()
                    .position(|previous| previous == header)
            })
            .collect::<Vec<_>>();

        let rows = snapshot
            .rows
            .into_iter()
            .map(|data| {
                let id = data.id();
                let previous = previous_by_id.get(id.as_str()).copied();
                let cells = data
                    .columns
                    .into_iter()
                    .enumerate()
                    .map(|(column, text)| {
                        let delta = match (previous, previous_columns.get(column).copied().flatten())
                        {
                            _ if snapshot.headers.get(column).map(String::as_str)
                                == Some(AGE_HEADER) =>
                            {
                                DeltaMarker::None
                            }
                            (Some(previous), Some(previous_column)) => previous
                                .cell_text(previous_column)
                                .map(|before| classify(before, &text))
                                .unwrap_or_default(),
                            _ => DeltaMarker::None,
                        };
                        TableCell { text, delta }
                    })
                    .collect();

                TableRow {
                    id,
                    namespace: data.namespace,
                    name: data.name,
                    cells,
                    detail: data.detail,
                }
            })
            .collect::<Vec<_>>();

        self.headers = snapshot.headers;
        self.rows = rows;
        self.last_refreshed = snapshot.last_refreshed;
        self.error = None;
        self.reattach_selection(keep)
    }

    /// Records a failed refresh. Rows and markers of the last good snapshot
    /// stay in place.
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) -> usize {
        let keep = self.selected_id();
        self.filter = filter.into();
        self.reattach_selection(&keep)
    }

    /// Restricts the rows to pods owned by the named workload. The pod name
    /// must reduce to exactly `workload` once its generated suffix is dropped.
    pub fn set_workload(&mut self, workload: Option<String>) -> usize {
        let keep = self.selected_id();
        self.workload = workload;
        self.reattach_selection(&keep)
    }

    fn selected_id(&self) -> String {
        self.selected_row()
            .map(|row| row.id.clone())
            .unwrap_or_default()
    }

    pub fn actions(&self) -> &KeyActions {
        &self.actions
    }

    pub fn set_actions(&mut self, actions: KeyActions) {
        self.actions = actions;
    }

    pub fn hints(&self) -> Vec<Hint> {
        self.actions.hints()
    }

    fn reattach_selection(&mut self, keep: &str) -> usize {
        if !keep.is_empty()
            && let Some(index) = self
                .visible_rows()
                .iter()
                .position(|row| row.id == keep)
        {
            self.selected = index + 1;
            return self.selected;
        }

        let count = self.row_count();
        self.selected = match (self.selected, count) {
            (_, 0) => 0,
            (0, _) => 1,
            (selected, count) => selected.min(count),
        };
        self.selected
    }
}
