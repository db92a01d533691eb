pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    annotation_line, error, file_written, header, info, muted, section, skipped_binding,
    success, summary_row, warn, wrapped_binding,
};
pub use progress::{link_summary, Spinner};
pub use table::{annotations_table, stats_table, TableBuilder};
pub use theme::{theme, Theme};
