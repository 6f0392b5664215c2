pub mod writer_csv;
pub mod writer_json;
pub mod writer_text;

pub use writer_csv::write_csv;
pub use writer_json::write_json;
pub use writer_text::{render_fuzzy, render_likely, render_normal, write_normal};
