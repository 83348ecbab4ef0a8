//! Palette column layout.
//!
//! The right-hand side of the canvas holds, top to bottom: the favourites box,
//! the current tray box (with tabs for every tray along its right edge) and
//! the trash receptacle. Positions depend on the heights of the templates
//! shown, so the layout is recomputed whenever favourites or the selected
//! tray change.

use cmdtree_core::layout::{LayoutCache, NODE_WIDTH};
use cmdtree_core::{Color, Document, Template, TemplateRef};
use kurbo::{BezPath, Point, Rect};

pub const TAB_WIDTH: f64 = 15.0;
pub const TAB_HEIGHT: f64 = 80.0;
/// Distance from the tab column to the canvas edge.
const TAB_MARGIN: f64 = 5.0;
/// Width of the template column, templates plus padding.
pub const COLUMN_WIDTH: f64 = 210.0;
pub const TEMPLATE_Y: f64 = 10.0;
const BOX_PADDING: f64 = 10.0;
const BOX_HEADER: f64 = 30.0;
const ITEM_GAP: f64 = 10.0;
/// The trash sits this far below the tray box.
const TRASH_OFFSET: f64 = 25.0;
/// Drops with x beyond `template_x - DROP_BAND` land in the palette.
pub const DROP_BAND: f64 = 100.0;

pub const FAVORITES_COLOR: Color = Color::rgb(0xee, 0xff, 0xee);
pub const FAVORITES_CAPTION: &str = "> Drop here to save favourites <";

/// One boxed group of templates.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteBox {
    pub rect: Rect,
    pub color: Color,
    pub caption: String,
    /// Top-left corner of each template root.
    pub items: Vec<(TemplateRef, Point)>,
}

/// A clickable tab selecting one tray.
#[derive(Debug, Clone, PartialEq)]
pub struct TrayTab {
    pub tray: usize,
    pub origin: Point,
    pub color: Color,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteLayout {
    /// Left edge of the tab column.
    pub tray_x: f64,
    /// Left edge of every template root.
    pub template_x: f64,
    pub favorites: PaletteBox,
    /// Bottom of the favourites box; drops above it are favourited.
    pub tray_y: f64,
    pub tray: PaletteBox,
    pub tabs: Vec<TrayTab>,
    /// Where the trash receptacle is drawn.
    pub trash: Point,
}

impl PaletteLayout {
    pub fn compute(doc: &Document, cache: &mut LayoutCache, canvas_width: f64) -> Self {
        let tray_x = canvas_width - TAB_WIDTH - TAB_MARGIN;
        let template_x = tray_x - COLUMN_WIDTH;

        let (favorites, tray_y) = boxed_set(
            cache,
            template_x,
            TEMPLATE_Y,
            FAVORITES_COLOR,
            FAVORITES_CAPTION.to_string(),
            doc.favorites.iter().enumerate().map(|(i, t)| (TemplateRef::Favorite(i), t)),
        );

        let mut tab_y = tray_y + TAB_WIDTH;
        let mut tabs = Vec::with_capacity(doc.trays.len());
        for (i, tray) in doc.trays.iter().enumerate() {
            tabs.push(TrayTab {
                tray: i,
                origin: Point::new(tray_x, tab_y),
                color: tray.color,
                current: i == doc.current_tray,
            });
            tab_y += TAB_HEIGHT;
        }

        let current = doc.trays.get(doc.current_tray);
        let (tray, spec_y) = boxed_set(
            cache,
            template_x,
            tray_y,
            current.map_or(Color::rgb(0x00, 0xff, 0x00), |t| t.color),
            format!("Current tray: {}", current.map_or("", |t| t.name.as_str())),
            doc.current_tray_items()
                .iter()
                .enumerate()
                .map(|(item, t)| (TemplateRef::Tray { tray: doc.current_tray, item }, t)),
        );

        Self {
            tray_x,
            template_x,
            favorites,
            tray_y,
            tray,
            tabs,
            trash: Point::new(template_x, spec_y + TRASH_OFFSET),
        }
    }

    /// Whether a drop at `pos` lands on the palette rather than the canvas.
    pub fn in_band(&self, pos: Point) -> bool {
        pos.x > self.template_x - DROP_BAND
    }

    /// Whether a palette drop at `pos` is over the favourites box.
    pub fn over_favorites(&self, pos: Point) -> bool {
        pos.y < self.tray_y
    }

    /// Tray whose tab covers `pos`, if any.
    pub fn tab_at(&self, pos: Point) -> Option<usize> {
        if pos.x < self.tray_x {
            return None;
        }
        self.tabs
            .iter()
            .find(|t| pos.y >= t.origin.y && pos.y <= t.origin.y + TAB_HEIGHT)
            .map(|t| t.tray)
    }

    /// Every template root shown, favourites first.
    pub fn templates(&self) -> impl Iterator<Item = (TemplateRef, Point)> + '_ {
        self.favorites.items.iter().chain(&self.tray.items).copied()
    }

    pub fn position_of(&self, at: TemplateRef) -> Option<Point> {
        self.templates().find(|(r, _)| *r == at).map(|(_, p)| p)
    }
}

/// Outline of a tray tab, relative to its origin.
pub fn tab_outline() -> BezPath {
    let mut path = BezPath::new();
    path.move_to((0.0, 0.0));
    path.line_to((TAB_WIDTH, TAB_WIDTH));
    path.line_to((TAB_WIDTH, TAB_HEIGHT - TAB_WIDTH / 2.0));
    path.line_to((0.0, TAB_HEIGHT + TAB_WIDTH / 2.0));
    path
}

/// Lay out a box of templates starting at `y`; returns the box and the y
/// where the next box starts.
fn boxed_set<'a>(
    cache: &mut LayoutCache,
    template_x: f64,
    y: f64,
    color: Color,
    caption: String,
    set: impl Iterator<Item = (TemplateRef, &'a Template)>,
) -> (PaletteBox, f64) {
    let mut items = Vec::new();
    let mut item_y = y + BOX_HEADER;
    for (at, template) in set {
        items.push((at, Point::new(template_x, item_y)));
        item_y += cache.template(template).total_height + ITEM_GAP;
    }
    let height = item_y - y;
    let rect = Rect::new(
        template_x - BOX_PADDING,
        y,
        template_x - BOX_PADDING + NODE_WIDTH + 2.0 * BOX_PADDING,
        y + height,
    );
    (
        PaletteBox {
            rect,
            color,
            caption,
            items,
        },
        y + height + BOX_PADDING,
    )
}
