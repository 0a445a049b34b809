//! File formats at the edge of the engines: compressed text, ASCII grids,
//! the grid-to-reference lookup, plot legend files and result writers.
pub mod ascii_grid;
pub mod compress;
pub mod lookup;
pub mod meta_file;
pub mod results;

pub use ascii_grid::{read_ascii_grid, write_ascii_grid};
pub use compress::{open_text, GzTextWriter};
pub use lookup::GridLookup;
