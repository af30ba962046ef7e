/// View helpers
///
/// Each module renders one part of the window from borrowed state:
/// - board.rs: search results bucketed into category columns
/// - collage.rs: the "Recent Creations" photo grid
/// - modal.rs: the add/edit project form
/// - thumbnails.rs: decoded image handles shared by all views

pub mod board;
pub mod collage;
pub mod modal;
pub mod thumbnails;

pub use thumbnails::ThumbnailCache;
