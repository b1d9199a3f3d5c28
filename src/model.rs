use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_SHAPE_SIZE: f32 = 50.0;
pub const MAX_SHAPE_SIZE: f32 = 10_000.0;
/// Largest x or y a shape origin may take.
pub const MAX_COORD: f32 = 10_000.0;
pub const MIN_FONT_SIZE: f32 = 8.0;
pub const MAX_FONT_SIZE: f32 = 72.0;

pub const DEFAULT_SHAPE_COLOR: Rgba = Rgba::rgb(0x4a, 0x90, 0xd9);
pub const DEFAULT_TEXT_COLOR: Rgba = Rgba::rgb(0xff, 0xff, 0xff);
pub const DEFAULT_CONNECTOR_COLOR: Rgba = Rgba::rgb(0x33, 0x33, 0x33);
pub const DEFAULT_FONT_FAMILY: &str = "Arial";
pub const DEFAULT_FONT_SIZE: f32 = 14.0;

pub const FONT_FAMILIES: [&str; 7] = [
    "Arial",
    "Helvetica",
    "Times New Roman",
    "Georgia",
    "Verdana",
    "Courier New",
    "Comic Sans MS",
];

/// Length of the arrow head drawn at the target end of an arrow connector.
pub const ARROW_HEAD_LENGTH: f32 = 15.0;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn sub(self, other: Point) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    pub fn from_min_size(min: Point, width: f32, height: f32) -> Self {
        Self {
            min,
            max: Point::new(min.x + width, min.y + height),
        }
    }

    pub fn from_center_size(center: Point, size: f32) -> Self {
        let half = size * 0.5;
        Self {
            min: Point::new(center.x - half, center.y - half),
            max: Point::new(center.x + half, center.y + half),
        }
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn union(self, other: Rect) -> Rect {
        Rect {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }
}

/// An sRGB color, persisted as a `#rrggbb` (or `#rrggbbaa`) string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn from_hex(text: &str) -> Option<Self> {
        let hex = text.trim().strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        let nibble = |i: usize| {
            let v = u8::from_str_radix(&hex[i..i + 1], 16).ok()?;
            Some((v << 4) | v)
        };
        match hex.len() {
            3 => Some(Self::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Rgba {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgba::from_hex(&value).ok_or_else(|| format!("invalid color `{value}`"))
    }
}

impl From<Rgba> for String {
    fn from(value: Rgba) -> Self {
        value.to_hex()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(String);

impl ShapeId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ShapeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorId(String);

impl ConnectorId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Triangle,
    Diamond,
    Hexagon,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 5] = [
        ShapeKind::Rectangle,
        ShapeKind::Circle,
        ShapeKind::Triangle,
        ShapeKind::Diamond,
        ShapeKind::Hexagon,
    ];

    /// Size given to freshly added shapes.
    pub fn default_size(self) -> (f32, f32) {
        match self {
            ShapeKind::Circle | ShapeKind::Hexagon => (120.0, 120.0),
            _ => (120.0, 80.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "Rectangle",
            ShapeKind::Circle => "Circle",
            ShapeKind::Triangle => "Triangle",
            ShapeKind::Diamond => "Diamond",
            ShapeKind::Hexagon => "Hexagon",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    #[default]
    Arrow,
    Line,
    Dashed,
    Dotted,
}

impl ConnectorKind {
    pub const ALL: [ConnectorKind; 4] = [
        ConnectorKind::Arrow,
        ConnectorKind::Line,
        ConnectorKind::Dashed,
        ConnectorKind::Dotted,
    ];

    /// Dash and gap lengths, or `None` for a solid stroke.
    pub fn dash_pattern(self) -> Option<(f32, f32)> {
        match self {
            ConnectorKind::Dashed => Some((10.0, 5.0)),
            ConnectorKind::Dotted => Some((3.0, 3.0)),
            ConnectorKind::Arrow | ConnectorKind::Line => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConnectorKind::Arrow => "Arrow →",
            ConnectorKind::Line => "Line —",
            ConnectorKind::Dashed => "Dashed - -",
            ConnectorKind::Dotted => "Dotted ···",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f32,
    pub color: Rgba,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            color: DEFAULT_TEXT_COLOR,
        }
    }
}

pub fn clamp_font_size(size: f32) -> f32 {
    if size.is_nan() {
        return DEFAULT_FONT_SIZE;
    }
    size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub id: ShapeId,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: Rgba,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub text_style: TextStyle,
}

impl Shape {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_min_size(self.position(), self.width, self.height)
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Outline in diagram space. Circles are approximated with `segments` points.
    pub fn outline(&self, segments: usize) -> Vec<Point> {
        let (x, y, w, h) = (self.x, self.y, self.width, self.height);
        match self.kind {
            ShapeKind::Rectangle => vec![
                Point::new(x, y),
                Point::new(x + w, y),
                Point::new(x + w, y + h),
                Point::new(x, y + h),
            ],
            ShapeKind::Circle => {
                let c = self.center();
                let (rx, ry) = (w * 0.5, h * 0.5);
                let steps = segments.max(8);
                (0..steps)
                    .map(|i| {
                        let t = (i as f32) / (steps as f32) * std::f32::consts::TAU;
                        Point::new(c.x + t.cos() * rx, c.y + t.sin() * ry)
                    })
                    .collect()
            }
            ShapeKind::Triangle => vec![
                Point::new(x + w / 2.0, y),
                Point::new(x + w, y + h),
                Point::new(x, y + h),
            ],
            ShapeKind::Diamond => vec![
                Point::new(x + w / 2.0, y),
                Point::new(x + w, y + h / 2.0),
                Point::new(x + w / 2.0, y + h),
                Point::new(x, y + h / 2.0),
            ],
            ShapeKind::Hexagon => {
                let hw = w / 4.0;
                vec![
                    Point::new(x + hw, y),
                    Point::new(x + w - hw, y),
                    Point::new(x + w, y + h / 2.0),
                    Point::new(x + w - hw, y + h),
                    Point::new(x + hw, y + h),
                    Point::new(x, y + h / 2.0),
                ]
            }
        }
    }

    /// Where the label is centred. Triangles sit their text low, inside the wide part.
    pub fn text_anchor(&self) -> Point {
        let y = match self.kind {
            ShapeKind::Triangle => self.y + self.height * 0.65,
            _ => self.y + self.height / 2.0,
        };
        Point::new(self.x + self.width / 2.0, y)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub id: ConnectorId,
    #[serde(rename = "type")]
    pub kind: ConnectorKind,
    pub from_shape_id: ShapeId,
    pub to_shape_id: ShapeId,
    pub color: Rgba,
}

impl Connector {
    pub fn references(&self, shape_id: &ShapeId) -> bool {
        &self.from_shape_id == shape_id || &self.to_shape_id == shape_id
    }
}

/// Resolved geometry of a connector between two shape centers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectorPath {
    pub start: Point,
    pub end: Point,
    /// End of the stroked segment; pulled back from `end` when an arrow head is drawn.
    pub line_end: Point,
    pub head: Option<[Point; 3]>,
}

impl ConnectorPath {
    pub fn between(from: &Shape, to: &Shape, kind: ConnectorKind) -> Self {
        let start = from.center();
        let end = to.center();
        if kind != ConnectorKind::Arrow {
            return Self {
                start,
                end,
                line_end: end,
                head: None,
            };
        }
        let angle = (end.y - start.y).atan2(end.x - start.x);
        let back = |a: f32| {
            Point::new(
                end.x - ARROW_HEAD_LENGTH * a.cos(),
                end.y - ARROW_HEAD_LENGTH * a.sin(),
            )
        };
        let spread = std::f32::consts::PI / 6.0;
        Self {
            start,
            end,
            line_end: back(angle),
            head: Some([end, back(angle - spread), back(angle + spread)]),
        }
    }
}

pub const DEFAULT_DIAGRAM_NAME: &str = "Untitled Diagram";
pub const DEFAULT_BACKGROUND: Rgba = Rgba::rgb(0xf5, 0xf5, 0xf5);

fn default_name() -> String {
    DEFAULT_DIAGRAM_NAME.to_string()
}

fn default_background() -> Rgba {
    DEFAULT_BACKGROUND
}

/// The persisted aggregate. Shape order is paint order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_background")]
    pub background_color: Rgba,
    #[serde(default)]
    pub shapes: Vec<Shape>,
    #[serde(default)]
    pub connectors: Vec<Connector>,
}

impl Default for Diagram {
    fn default() -> Self {
        Self {
            name: default_name(),
            background_color: default_background(),
            shapes: vec![],
            connectors: vec![],
        }
    }
}

pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let ab = b.sub(a);
    let ap = p.sub(a);
    let ab_len2 = ab.x * ab.x + ab.y * ab.y;
    if ab_len2 <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((ap.x * ab.x + ap.y * ab.y) / ab_len2).clamp(0.0, 1.0);
    let closest = Point::new(a.x + ab.x * t, a.y + ab.y * t);
    p.distance(closest)
}
