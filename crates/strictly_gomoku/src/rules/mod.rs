//! Line rules for five-in-a-row.
//!
//! Pure functions over a [`Board`](crate::Board). Rules are separated from
//! board storage so the variant strategies and contracts can compose them.

pub mod draw;
pub mod win;

pub use draw::is_full;
pub use win::{check_win, run_through, winning_line};
