pub mod text;
pub mod textproto;

pub use text::{render_edit_summary, render_layer_report, render_model_summary, render_size_check};
