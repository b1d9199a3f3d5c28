use eframe::egui;
use flowsketch::interaction::{self, Zoom};
use flowsketch::model::{self, ConnectorPath, Point, Rgba, Shape, ShapeKind};
use flowsketch::session::DiagramSession;
use flowsketch::snap::GRID_SIZE;
use flowsketch::store::Selection;

const SELECTION_COLOR: egui::Color32 = egui::Color32::from_rgb(90, 160, 255);
const SOURCE_COLOR: egui::Color32 = egui::Color32::from_rgb(40, 170, 90);
const OUTLINE_COLOR: egui::Color32 = egui::Color32::from_rgb(0x33, 0x33, 0x33);

pub(super) fn color32(c: Rgba) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

pub(super) fn color_button(ui: &mut egui::Ui, rgba: &mut Rgba) -> bool {
    let mut arr = [rgba.r, rgba.g, rgba.b, rgba.a];
    if ui.color_edit_button_srgba_unmultiplied(&mut arr).changed() {
        *rgba = Rgba {
            r: arr[0],
            g: arr[1],
            b: arr[2],
            a: arr[3],
        };
        return true;
    }
    false
}

/// Maps diagram coordinates onto the canvas.
#[derive(Clone, Copy)]
pub(super) struct Projection {
    pub origin: egui::Pos2,
    pub zoom: Zoom,
}

impl Projection {
    fn pos(&self, p: Point) -> egui::Pos2 {
        let v = self.zoom.to_viewport(p);
        self.origin + egui::vec2(v.x, v.y)
    }

    fn rect(&self, r: model::Rect) -> egui::Rect {
        egui::Rect::from_min_max(self.pos(r.min), self.pos(r.max))
    }

    fn len(&self, l: f32) -> f32 {
        l * self.zoom.factor()
    }

    pub(super) fn to_viewport(&self, screen: egui::Pos2) -> Point {
        Point::new(screen.x - self.origin.x, screen.y - self.origin.y)
    }
}

pub(super) fn draw_background(
    painter: &egui::Painter,
    rect: egui::Rect,
    background: Rgba,
    zoom: Zoom,
    show_grid: bool,
) {
    painter.rect_filled(rect, 0.0, color32(background));
    if !show_grid {
        return;
    }
    let grid_color = egui::Color32::from_black_alpha(20);
    let spacing = GRID_SIZE * zoom.factor();
    let stroke = egui::Stroke::new(1.0, grid_color);
    let mut x = rect.min.x;
    while x < rect.max.x {
        painter.line_segment([egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)], stroke);
        x += spacing;
    }
    let mut y = rect.min.y;
    while y < rect.max.y {
        painter.line_segment([egui::pos2(rect.min.x, y), egui::pos2(rect.max.x, y)], stroke);
        y += spacing;
    }
}

pub(super) fn draw_diagram(painter: &egui::Painter, proj: Projection, session: &DiagramSession) {
    let store = session.store();
    let selection = store.selection();

    for connector in store.connectors() {
        let (Some(from), Some(to)) = (
            store.shape(&connector.from_shape_id),
            store.shape(&connector.to_shape_id),
        ) else {
            continue;
        };
        let path = ConnectorPath::between(from, to, connector.kind);
        let selected = selection.connector() == Some(&connector.id);
        let (width, color) = if selected {
            (3.0, SELECTION_COLOR)
        } else {
            (2.0, color32(connector.color))
        };
        let stroke = egui::Stroke::new(width, color);
        let a = proj.pos(path.start);
        let b = proj.pos(path.line_end);
        match connector.kind.dash_pattern() {
            Some((dash, gap)) => {
                draw_dashed_line(painter, a, b, stroke, proj.len(dash), proj.len(gap))
            }
            None => {
                painter.line_segment([a, b], stroke);
            }
        }
        if let Some(head) = path.head {
            painter.add(egui::Shape::convex_polygon(
                head.iter().map(|p| proj.pos(*p)).collect(),
                color,
                egui::Stroke::NONE,
            ));
        }
    }

    let pending = session.controller().pending_from();
    for shape in store.shapes() {
        draw_shape(painter, proj, shape);
        let highlight = if pending == Some(&shape.id) {
            Some(SOURCE_COLOR)
        } else if matches!(selection, Selection::Shape(id) if *id == shape.id) {
            Some(SELECTION_COLOR)
        } else {
            None
        };
        if let Some(color) = highlight {
            let r = proj.rect(shape.bounds()).expand(3.0);
            painter.rect_stroke(r, 4.0, egui::Stroke::new(2.0, color), egui::StrokeKind::Middle);
        }
    }

    if let Some(shape) = store.selected_shape() {
        let handle = proj.rect(interaction::resize_handle(shape));
        painter.rect_filled(handle, 2.0, SELECTION_COLOR);
        painter.rect_stroke(
            handle,
            2.0,
            egui::Stroke::new(1.0, egui::Color32::WHITE),
            egui::StrokeKind::Inside,
        );
    }
}

fn draw_shape(painter: &egui::Painter, proj: Projection, shape: &Shape) {
    let fill = color32(shape.color);
    let stroke = egui::Stroke::new(2.0, OUTLINE_COLOR);
    match shape.kind {
        ShapeKind::Rectangle => {
            let r = proj.rect(shape.bounds());
            painter.rect_filled(r, proj.len(4.0), fill);
            painter.rect_stroke(r, proj.len(4.0), stroke, egui::StrokeKind::Middle);
        }
        ShapeKind::Circle | ShapeKind::Triangle | ShapeKind::Diamond | ShapeKind::Hexagon => {
            let points = shape.outline(64).into_iter().map(|p| proj.pos(p)).collect();
            painter.add(egui::Shape::convex_polygon(points, fill, stroke));
        }
    }
    if !shape.text.is_empty() {
        draw_label(painter, proj, shape);
    }
}

fn font_id(style: &model::TextStyle, proj: Projection) -> egui::FontId {
    let size = proj.len(style.font_size).max(1.0);
    if style.font_family == "Courier New" {
        egui::FontId::monospace(size)
    } else {
        egui::FontId::proportional(size)
    }
}

fn draw_label(painter: &egui::Painter, proj: Projection, shape: &Shape) {
    let color = color32(shape.text_style.color);
    let wrap = proj.len(shape.width - 10.0).max(1.0);
    let galley = painter.layout(
        shape.text.clone(),
        font_id(&shape.text_style, proj),
        color,
        wrap,
    );
    let center = proj.pos(shape.text_anchor());
    let pos = center - galley.size() * 0.5;
    painter.galley(pos, galley, color);
}

fn draw_dashed_line(
    painter: &egui::Painter,
    a: egui::Pos2,
    b: egui::Pos2,
    stroke: egui::Stroke,
    dash_len: f32,
    gap_len: f32,
) {
    let v = b - a;
    let len = v.length();
    if len <= f32::EPSILON || dash_len <= 0.0 {
        return;
    }
    let dir = v / len;
    let mut pos = 0.0;
    let mut drawing = true;
    while pos < len {
        let seg_len = if drawing { dash_len } else { gap_len };
        let next_pos = (pos + seg_len).min(len);
        if drawing {
            painter.line_segment([a + dir * pos, a + dir * next_pos], stroke);
        }
        pos = next_pos;
        drawing = !drawing;
    }
}

pub(super) fn draw_hint(painter: &egui::Painter, rect: egui::Rect, hint: &str) {
    let galley = painter.layout_no_wrap(
        hint.to_string(),
        egui::FontId::proportional(14.0),
        egui::Color32::WHITE,
    );
    let pos = egui::pos2(rect.center().x - galley.size().x * 0.5, rect.min.y + 12.0);
    let bg = egui::Rect::from_min_size(pos, galley.size()).expand2(egui::vec2(10.0, 6.0));
    painter.rect_filled(bg, 6.0, egui::Color32::from_black_alpha(180));
    painter.galley(pos, galley, egui::Color32::WHITE);
}
