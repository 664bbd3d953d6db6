pub mod cleaner;
pub mod detail;
pub mod pagination;
pub mod row;

pub use self::detail::DetailExtractor;
pub use self::pagination::{Advance, PaginationController};
pub use self::row::RowExtractor;
