pub mod chart;
pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use chart::bar_chart;
pub use icons::Icons;
pub use output::{dim, error, header, info, section, status, success, summary_row, warn};
pub use progress::ImportProgress;
pub use table::{report_table, stats_table, TableBuilder};
pub use theme::{theme, Theme};
