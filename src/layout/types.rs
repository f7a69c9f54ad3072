use std::collections::BTreeMap;

use serde::Serialize;

use crate::graph::EdgeKey;

pub type Point = (f32, f32);

/// Abstract grid position of one visible node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutSlot {
    pub node_id: String,
    pub row: usize,
    pub column: usize,
    /// Layer band; always 0 outside the all-layers view.
    pub band: usize,
}

pub type SlotMap = BTreeMap<String, LayoutSlot>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Bottom, Side::Left, Side::Right];

    /// Outward unit normal.
    pub fn normal(self) -> Point {
        match self {
            Side::Top => (0.0, -1.0),
            Side::Bottom => (0.0, 1.0),
            Side::Left => (-1.0, 0.0),
            Side::Right => (1.0, 0.0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn inset(&self, amount: f32) -> Rect {
        Rect {
            x: self.x + amount,
            y: self.y + amount,
            width: (self.width - amount * 2.0).max(0.0),
            height: (self.height - amount * 2.0).max(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anchor {
    pub node_id: String,
    pub x: f32,
    pub y: f32,
    pub side: Side,
}

impl Anchor {
    pub fn point(&self) -> Point {
        (self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeGeometry {
    pub rect: Rect,
    /// One anchor per side, in [`Side::ALL`] order.
    pub anchors: Vec<Anchor>,
}

impl NodeGeometry {
    pub fn anchor(&self, side: Side) -> Option<&Anchor> {
        self.anchors.iter().find(|anchor| anchor.side == side)
    }
}

pub type GeometryMap = BTreeMap<String, NodeGeometry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Straight,
    Orthogonal,
    Curved,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PathCommand {
    Move { to: Point },
    Line { to: Point },
    Quad { ctrl: Point, to: Point },
    Cubic { c1: Point, c2: Point, to: Point },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectorPath {
    pub key: EdgeKey,
    pub start: Anchor,
    pub end: Anchor,
    pub kind: RouteKind,
    /// Corner points of the routed polyline, endpoints included.
    pub points: Vec<Point>,
    pub commands: Vec<PathCommand>,
    pub highlighted: bool,
}

impl ConnectorPath {
    pub fn svg_path_data(&self) -> String {
        let mut d = String::new();
        for command in &self.commands {
            if !d.is_empty() {
                d.push(' ');
            }
            match command {
                PathCommand::Move { to } => d.push_str(&format!("M {:.2} {:.2}", to.0, to.1)),
                PathCommand::Line { to } => d.push_str(&format!("L {:.2} {:.2}", to.0, to.1)),
                PathCommand::Quad { ctrl, to } => d.push_str(&format!(
                    "Q {:.2} {:.2} {:.2} {:.2}",
                    ctrl.0, ctrl.1, to.0, to.1
                )),
                PathCommand::Cubic { c1, c2, to } => d.push_str(&format!(
                    "C {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
                    c1.0, c1.1, c2.0, c2.1, to.0, to.1
                )),
            }
        }
        d
    }
}
