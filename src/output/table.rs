//! Table output formatting

use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Rows},
};

/// Render rows as a rounded table, or a placeholder line when empty
pub fn format_table<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return "Nothing to show.".to_string();
    }

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Tabled)]
    struct DeviceRow {
        #[tabled(rename = "DEVICE")]
        device: &'static str,
        #[tabled(rename = "IP")]
        ip: &'static str,
    }

    #[test]
    fn test_empty_rows() {
        let rows: Vec<DeviceRow> = Vec::new();
        assert_eq!(format_table(&rows), "Nothing to show.");
    }

    #[test]
    fn test_rows_render_with_headers() {
        let rows = vec![
            DeviceRow {
                device: "Firefox on Linux",
                ip: "10.0.0.1",
            },
            DeviceRow {
                device: "boinchub CLI",
                ip: "10.0.0.2",
            },
        ];

        let result = format_table(&rows);

        assert!(result.contains("DEVICE"));
        assert!(result.contains("Firefox on Linux"));
        assert!(result.contains("10.0.0.2"));
        assert!(result.starts_with('╭'));
    }
}
