//! Input abstraction layer.
//!
//! Normalizes mouse, touch and pen events into a unified [`InputEvent`].
//! Every event carries the pointer it came from so several pointers can
//! drag at once.

use kurbo::Point;

/// Identifies one pointer (mouse, finger, pen) for the life of a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointerId(pub u32);

/// A normalized input event from any pointing device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Primary button pressed, touch start, pen contact.
    PointerDown { pointer: PointerId, x: f64, y: f64 },

    PointerMove { pointer: PointerId, x: f64, y: f64 },

    PointerUp { pointer: PointerId, x: f64, y: f64 },

    /// The platform took the pointer away mid-gesture.
    PointerCancel { pointer: PointerId },
}

impl InputEvent {
    pub fn pointer(&self) -> PointerId {
        match self {
            Self::PointerDown { pointer, .. }
            | Self::PointerMove { pointer, .. }
            | Self::PointerUp { pointer, .. }
            | Self::PointerCancel { pointer } => *pointer,
        }
    }

    /// Canvas position, if the event has one.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y, .. } | Self::PointerMove { x, y, .. } | Self::PointerUp { x, y, .. } => {
                Some(Point::new(*x, *y))
            }
            Self::PointerCancel { .. } => None,
        }
    }
}
