//! Generated notes
//!
//! Header model, front-matter handling and rendering of highlight and
//! book-summary notes.

mod frontmatter;
mod header;
mod render;

pub use frontmatter::*;
pub use header::*;
pub use render::*;
