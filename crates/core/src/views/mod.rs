pub mod row;
pub mod time_axis;

pub use row::{hierarchy_links, page_size_for_width, row_view, row_views, visible_range};
