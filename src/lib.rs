//! # bookpress
//!
//! CLI utilities for assembling a book from a directory of markdown chapter
//! files.
//!
//! ## Current Features
//!
//! - Combine chapters into a single text file with per-chapter headers
//! - Estimate word and printed-page counts from markdown content
//! - Render chapters to a book-paginated PDF via headless Chrome
//!
//! ## Usage
//!
//! ```bash
//! bookpress combine --dir ./chapters
//! bookpress count --dir ./chapters --words-per-page 250
//! bookpress render ./chapters my_book.pdf
//! ```

mod combiner;
mod estimator;
mod fmt;
mod natsort;
mod renderer;

pub use combiner::Combiner;
pub use estimator::Estimator;
pub use fmt::group_thousands;
pub use natsort::{natural_key, Segment};
pub use renderer::Renderer;
