pub mod hit;
pub mod paint;
pub mod palette;

pub use hit::{Hit, hit_movable, hit_test};
pub use paint::{PaintCmd, paint_document};
pub use palette::{PaletteBox, PaletteLayout, TrayTab};
