pub mod config;
pub mod editor;
pub mod input;
pub mod props;
pub mod snap;
pub mod store;

pub use config::EditorConfig;
pub use editor::{DragSession, DropOutcome, Editor, Press};
pub use input::{InputEvent, PointerId};
pub use props::{Control, Field, Widget, controls};
pub use snap::{Snap, snap};
pub use store::{Canonicalizer, MemoryStore, MessageStore, StoreError};
