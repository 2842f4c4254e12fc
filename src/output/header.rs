//! Header labels describing each column's name and declared type.

use crate::db::ColumnDescriptor;

/// Driver length markers for `(max)` columns (varchar(max)/varbinary(max) and nvarchar(max)).
const MAX_LENGTH_MARKERS: [i64; 2] = [2147483645, 1073741822];

/// Renders one header label per column, e.g. `[name] NVARCHAR(50) NOT NULL`.
pub fn render_header(columns: &[ColumnDescriptor]) -> Vec<String> {
    columns.iter().map(render_label).collect()
}

fn render_label(col: &ColumnDescriptor) -> String {
    let mut label = String::with_capacity(col.name.len() + col.type_name.len() + 16);

    label.push('[');
    label.push_str(&col.name.replace(']', "]]"));
    label.push_str("] ");
    label.push_str(&col.type_name);

    if let Some(length) = col.length {
        if MAX_LENGTH_MARKERS.contains(&length) {
            label.push_str("(max)");
        } else {
            label.push_str(&format!("({length})"));
        }
    } else if let Some((precision, scale)) = col.decimal_size {
        label.push_str(&format!("({precision},{scale})"));
    }

    match col.nullable {
        Some(true) => label.push_str(" NULL"),
        Some(false) => label.push_str(" NOT NULL"),
        None => {}
    }

    label
}
