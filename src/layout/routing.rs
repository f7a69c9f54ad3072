use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::config::{ConnectorStyle, LayoutConfig};
use crate::graph::EdgeKey;
use crate::state::SelectionState;

use super::{
    Anchor, ConnectorPath, GeometryMap, NodeGeometry, PathCommand, Point, Rect, RouteKind, Side,
};

// ── Tolerances ──────────────────────────────────────────────────────
/// Coordinates closer than this are treated as aligned.
const ALIGN_EPS: f32 = 0.5;
/// Node bodies are shrunk by this much before crossing tests so paths may
/// touch a card outline without counting as a crossing.
const BODY_INSET: f32 = 0.5;

// ── Curve sampling ──────────────────────────────────────────────────
/// Samples used to score a cubic connector against node bodies.
const CURVE_SAMPLES: usize = 16;

#[derive(Debug, Clone)]
struct Candidate {
    points: Vec<Point>,
    kind: RouteKind,
    hits: usize,
    bends: usize,
    length: f32,
}

impl Candidate {
    fn cmp_score(&self, other: &Candidate) -> Ordering {
        self.hits
            .cmp(&other.hits)
            .then(self.bends.cmp(&other.bends))
            .then(self.length.total_cmp(&other.length))
    }
}

struct RouteContext<'a> {
    geometry: &'a GeometryMap,
    config: &'a LayoutConfig,
}

/// Routes every edge whose endpoints both have geometry, in canonical
/// edge order. Edges with a missing endpoint are skipped for this pass.
pub fn route(
    edges: &BTreeSet<EdgeKey>,
    geometry: &GeometryMap,
    selection: &SelectionState,
    config: &LayoutConfig,
) -> Vec<ConnectorPath> {
    let ctx = RouteContext { geometry, config };
    let mut paths = Vec::with_capacity(edges.len());
    for key in edges {
        let (Some(from), Some(to)) = (geometry.get(&key.a), geometry.get(&key.b)) else {
            tracing::trace!(a = %key.a, b = %key.b, "edge skipped: endpoint has no geometry");
            continue;
        };
        if let Some(path) = route_edge(&ctx, key, from, to) {
            paths.push(path);
        }
    }
    apply_highlight(&mut paths, selection.selected());
    paths
}

/// Refreshes highlight flags without re-routing.
pub fn apply_highlight(paths: &mut [ConnectorPath], selected: Option<&str>) {
    for path in paths {
        path.highlighted = selected.is_some_and(|id| path.key.touches(id));
    }
}

fn route_edge(
    ctx: &RouteContext<'_>,
    key: &EdgeKey,
    from: &NodeGeometry,
    to: &NodeGeometry,
) -> Option<ConnectorPath> {
    let mut best: Option<(Candidate, &Anchor, &Anchor)> = None;
    for (start, end) in anchor_pairs_by_distance(from, to) {
        let Some(candidate) = best_candidate_for_pair(ctx, start, end, from, to) else {
            continue;
        };
        if candidate.hits == 0 {
            best = Some((candidate, start, end));
            break;
        }
        let better = match &best {
            Some((current, _, _)) => candidate.cmp_score(current) == Ordering::Less,
            None => true,
        };
        if better {
            best = Some((candidate, start, end));
        }
    }

    let (candidate, start, end) = best?;
    let commands = match candidate.kind {
        RouteKind::Curved => curve_commands(&candidate.points),
        RouteKind::Straight | RouteKind::Orthogonal => {
            rounded_commands(&candidate.points, ctx.config.bend_radius)
        }
    };
    let points = match candidate.kind {
        RouteKind::Curved => vec![start.point(), end.point()],
        _ => candidate.points,
    };
    Some(ConnectorPath {
        key: key.clone(),
        start: start.clone(),
        end: end.clone(),
        kind: candidate.kind,
        points,
        commands,
        highlighted: false,
    })
}

/// All 16 side pairings, nearest first; ties follow side order.
fn anchor_pairs_by_distance<'a>(
    from: &'a NodeGeometry,
    to: &'a NodeGeometry,
) -> Vec<(&'a Anchor, &'a Anchor)> {
    let mut pairs: Vec<(f32, &Anchor, &Anchor)> = Vec::with_capacity(16);
    for start in &from.anchors {
        for end in &to.anchors {
            let dx = end.x - start.x;
            let dy = end.y - start.y;
            pairs.push(((dx * dx + dy * dy).sqrt(), start, end));
        }
    }
    pairs.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then(a.1.side.cmp(&b.1.side))
            .then(a.2.side.cmp(&b.2.side))
    });
    pairs.into_iter().map(|(_, start, end)| (start, end)).collect()
}

fn best_candidate_for_pair(
    ctx: &RouteContext<'_>,
    start: &Anchor,
    end: &Anchor,
    from: &NodeGeometry,
    to: &NodeGeometry,
) -> Option<Candidate> {
    let sp = start.point();
    let ep = end.point();
    let aligned = (sp.0 - ep.0).abs() < ALIGN_EPS || (sp.1 - ep.1).abs() < ALIGN_EPS;

    let mut shapes: Vec<(Vec<Point>, RouteKind)> = Vec::new();
    if aligned {
        shapes.push((vec![sp, ep], RouteKind::Straight));
    }
    match ctx.config.connector_style {
        ConnectorStyle::Orthogonal => {
            for points in orthogonal_shapes(ctx.config, start, end, &from.rect, &to.rect) {
                shapes.push((points, RouteKind::Orthogonal));
            }
        }
        ConnectorStyle::Curved => {
            if !aligned {
                let offset = ctx.config.curve_offset;
                let (ns, ne) = (start.side.normal(), end.side.normal());
                let c1 = (sp.0 + ns.0 * offset, sp.1 + ns.1 * offset);
                let c2 = (ep.0 + ne.0 * offset, ep.1 + ne.1 * offset);
                shapes.push((vec![sp, c1, c2, ep], RouteKind::Curved));
            }
        }
    }

    let mut best: Option<Candidate> = None;
    for (raw, kind) in shapes {
        let candidate = score_shape(ctx, raw, kind, start, end);
        let better = match &best {
            Some(current) => candidate.cmp_score(current) == Ordering::Less,
            None => true,
        };
        if better {
            best = Some(candidate);
        }
    }
    best
}

fn score_shape(
    ctx: &RouteContext<'_>,
    raw: Vec<Point>,
    kind: RouteKind,
    start: &Anchor,
    end: &Anchor,
) -> Candidate {
    if kind == RouteKind::Curved {
        let samples = sample_cubic(&raw, CURVE_SAMPLES);
        return Candidate {
            hits: body_crossings(&samples, ctx.geometry),
            bends: 1,
            length: path_length(&samples),
            points: raw,
            kind,
        };
    }

    // After compression every interior point is a corner, U-turns included.
    let points = compress_path(&raw);
    let kind = if points.len() == 2 { RouteKind::Straight } else { kind };
    let hits = body_crossings(&points, ctx.geometry) + port_violations(&points, start.side, end.side);
    Candidate {
        bends: points.len().saturating_sub(2),
        length: path_length(&points),
        points,
        kind,
        hits,
    }
}

fn orthogonal_shapes(
    config: &LayoutConfig,
    start: &Anchor,
    end: &Anchor,
    from: &Rect,
    to: &Rect,
) -> Vec<Vec<Point>> {
    let sp = start.point();
    let ep = end.point();
    let stub = config.port_stub;
    let (ns, ne) = (start.side.normal(), end.side.normal());
    let s1 = (sp.0 + ns.0 * stub, sp.1 + ns.1 * stub);
    let e1 = (ep.0 + ne.0 * stub, ep.1 + ne.1 * stub);

    let below = from.bottom().max(to.bottom()) + config.gutter_y / 2.0;
    let above = from.y.min(to.y) - config.gutter_y / 2.0;
    let right = from.right().max(to.right()) + config.gutter_x / 2.0;
    let left = from.x.min(to.x) - config.gutter_x / 2.0;

    let mut shapes = Vec::new();
    match (start.side.is_horizontal(), end.side.is_horizontal()) {
        (true, true) => {
            for cx in [(sp.0 + ep.0) / 2.0, s1.0, e1.0] {
                shapes.push(vec![sp, (cx, sp.1), (cx, ep.1), ep]);
            }
            for gy in [below, above] {
                shapes.push(vec![sp, s1, (s1.0, gy), (e1.0, gy), e1, ep]);
            }
        }
        (false, false) => {
            for cy in [(sp.1 + ep.1) / 2.0, s1.1, e1.1] {
                shapes.push(vec![sp, (sp.0, cy), (ep.0, cy), ep]);
            }
            for gx in [right, left] {
                shapes.push(vec![sp, s1, (gx, s1.1), (gx, e1.1), e1, ep]);
            }
        }
        (true, false) => {
            shapes.push(vec![sp, (ep.0, sp.1), ep]);
            shapes.push(vec![sp, s1, (s1.0, e1.1), e1, ep]);
        }
        (false, true) => {
            shapes.push(vec![sp, (sp.0, ep.1), ep]);
            shapes.push(vec![sp, s1, (e1.0, s1.1), e1, ep]);
        }
    }
    shapes
}

/// Node bodies (endpoint cards included) a polyline passes through.
fn body_crossings(points: &[Point], geometry: &GeometryMap) -> usize {
    let mut count = 0usize;
    for node in geometry.values() {
        let body = node.rect.inset(BODY_INSET);
        if points
            .windows(2)
            .any(|segment| segment_intersects_rect(segment[0], segment[1], &body))
        {
            count += 1;
        }
    }
    count
}

/// A path must leave along the start side's normal and arrive against
/// the end side's normal.
fn port_violations(points: &[Point], start: Side, end: Side) -> usize {
    if points.len() < 2 {
        return 0;
    }
    let mut violations = 0;
    let first = (points[1].0 - points[0].0, points[1].1 - points[0].1);
    let ns = start.normal();
    if first.0 * ns.0 + first.1 * ns.1 <= 0.0 {
        violations += 1;
    }
    let n = points.len();
    let last = (points[n - 1].0 - points[n - 2].0, points[n - 1].1 - points[n - 2].1);
    let ne = end.normal();
    if last.0 * ne.0 + last.1 * ne.1 >= 0.0 {
        violations += 1;
    }
    violations
}

/// Polyline with every corner replaced by a quadratic of the same radius,
/// shortened only where a neighbouring segment is too short to hold it.
fn rounded_commands(points: &[Point], radius: f32) -> Vec<PathCommand> {
    let mut commands = Vec::with_capacity(points.len() * 2);
    let Some(&first) = points.first() else {
        return commands;
    };
    commands.push(PathCommand::Move { to: first });
    if points.len() == 1 {
        return commands;
    }
    for idx in 1..points.len() - 1 {
        let prev = points[idx - 1];
        let corner = points[idx];
        let next = points[idx + 1];
        let len_in = distance(prev, corner);
        let len_out = distance(corner, next);
        let r = radius.min(len_in / 2.0).min(len_out / 2.0);
        if r <= 1e-3 {
            commands.push(PathCommand::Line { to: corner });
            continue;
        }
        let entry = (
            corner.0 - (corner.0 - prev.0) / len_in * r,
            corner.1 - (corner.1 - prev.1) / len_in * r,
        );
        let exit = (
            corner.0 + (next.0 - corner.0) / len_out * r,
            corner.1 + (next.1 - corner.1) / len_out * r,
        );
        commands.push(PathCommand::Line { to: entry });
        commands.push(PathCommand::Quad {
            ctrl: corner,
            to: exit,
        });
    }
    commands.push(PathCommand::Line {
        to: points[points.len() - 1],
    });
    commands
}

fn curve_commands(control: &[Point]) -> Vec<PathCommand> {
    match control {
        [p0, c1, c2, p3] => vec![
            PathCommand::Move { to: *p0 },
            PathCommand::Cubic {
                c1: *c1,
                c2: *c2,
                to: *p3,
            },
        ],
        _ => rounded_commands(control, 0.0),
    }
}

fn sample_cubic(control: &[Point], samples: usize) -> Vec<Point> {
    let [p0, p1, p2, p3] = match control {
        [a, b, c, d] => [*a, *b, *c, *d],
        _ => return control.to_vec(),
    };
    (0..=samples)
        .map(|i| {
            let t = i as f32 / samples as f32;
            let u = 1.0 - t;
            let w0 = u * u * u;
            let w1 = 3.0 * u * u * t;
            let w2 = 3.0 * u * t * t;
            let w3 = t * t * t;
            (
                w0 * p0.0 + w1 * p1.0 + w2 * p2.0 + w3 * p3.0,
                w0 * p0.1 + w1 * p1.1 + w2 * p2.1 + w3 * p3.1,
            )
        })
        .collect()
}

fn distance(a: Point, b: Point) -> f32 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

pub(crate) fn compress_path(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &point in points {
        if let Some(&prev) = out.last()
            && (point.0 - prev.0).abs() <= 1e-4
            && (point.1 - prev.1).abs() <= 1e-4
        {
            continue;
        }
        while out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            let cross = (b.0 - a.0) * (point.1 - b.1) - (b.1 - a.1) * (point.0 - b.0);
            let forward = (b.0 - a.0) * (point.0 - b.0) + (b.1 - a.1) * (point.1 - b.1);
            if cross.abs() <= 1e-4 && forward >= 0.0 {
                out.pop();
            } else {
                break;
            }
        }
        out.push(point);
    }
    out
}

pub(crate) fn path_length(points: &[Point]) -> f32 {
    points.windows(2).map(|seg| distance(seg[0], seg[1])).sum()
}

pub(crate) fn segment_intersects_rect(a: Point, b: Point, rect: &Rect) -> bool {
    let (x1, y1) = a;
    let (x2, y2) = b;
    if x1.max(x2) < rect.x || x1.min(x2) > rect.right() || y1.max(y2) < rect.y || y1.min(y2) > rect.bottom() {
        return false;
    }
    let inside = |(x, y): Point| x >= rect.x && x <= rect.right() && y >= rect.y && y <= rect.bottom();
    if inside(a) || inside(b) {
        return true;
    }
    let corners = [
        (rect.x, rect.y),
        (rect.right(), rect.y),
        (rect.right(), rect.bottom()),
        (rect.x, rect.bottom()),
    ];
    (0..4).any(|i| segments_intersect(a, b, corners[i], corners[(i + 1) % 4]))
}

fn segments_intersect(a: Point, b: Point, c: Point, d: Point) -> bool {
    fn orient(a: Point, b: Point, c: Point) -> f32 {
        (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
    }
    fn on_segment(a: Point, b: Point, c: Point) -> bool {
        c.0 >= a.0.min(b.0) - 1e-6
            && c.0 <= a.0.max(b.0) + 1e-6
            && c.1 >= a.1.min(b.1) - 1e-6
            && c.1 <= a.1.max(b.1) + 1e-6
    }
    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);
    if (o1 > 0.0 && o2 < 0.0 || o1 < 0.0 && o2 > 0.0) && (o3 > 0.0 && o4 < 0.0 || o3 < 0.0 && o4 > 0.0) {
        return true;
    }
    (o1.abs() <= 1e-6 && on_segment(a, b, c))
        || (o2.abs() <= 1e-6 && on_segment(a, b, d))
        || (o3.abs() <= 1e-6 && on_segment(c, d, a))
        || (o4.abs() <= 1e-6 && on_segment(c, d, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::geometry::{ViewportMetrics, resolve_anchors};
    use crate::layout::{LayoutSlot, SlotMap};

    fn slots(entries: &[(&str, usize, usize)]) -> SlotMap {
        entries
            .iter()
            .map(|&(id, row, column)| {
                (
                    id.to_string(),
                    LayoutSlot {
                        node_id: id.to_string(),
                        row,
                        column,
                        band: 0,
                    },
                )
            })
            .collect()
    }

    fn edges(pairs: &[(&str, &str)]) -> BTreeSet<EdgeKey> {
        pairs.iter().map(|(a, b)| EdgeKey::new(a, b)).collect()
    }

    fn geometry(entries: &[(&str, usize, usize)], config: &LayoutConfig) -> GeometryMap {
        resolve_anchors(&slots(entries), &ViewportMetrics::unmeasured(0.0, 0.0), config)
    }

    fn assert_clear_of_bodies(path: &ConnectorPath, geometry: &GeometryMap) {
        assert_eq!(body_crossings(&path.points, geometry), 0, "{:?}", path.points);
    }

    #[test]
    fn same_row_neighbours_get_a_straight_segment() {
        let config = LayoutConfig::default();
        let geometry = geometry(&[("a", 0, 0), ("b", 0, 1)], &config);
        let paths = route(&edges(&[("b", "a")]), &geometry, &SelectionState::default(), &config);
        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        assert_eq!(path.kind, RouteKind::Straight);
        assert_eq!(path.start.side, Side::Right);
        assert_eq!(path.end.side, Side::Left);
        assert_eq!(path.start.node_id, "a");
        assert_eq!(path.points.len(), 2);
    }

    #[test]
    fn diagonal_neighbours_use_an_elbow_through_the_gutter() {
        let config = LayoutConfig::default();
        let geometry = geometry(&[("a", 0, 0), ("b", 1, 1)], &config);
        let paths = route(&edges(&[("a", "b")]), &geometry, &SelectionState::default(), &config);
        let path = &paths[0];
        assert_eq!(path.kind, RouteKind::Orthogonal);
        assert_eq!((path.start.side, path.end.side), (Side::Right, Side::Left));
        assert_eq!(path.points.len(), 4);
        let gutter_mid = (path.start.x + path.end.x) / 2.0;
        assert_eq!(path.points[1].0, gutter_mid);
        assert_clear_of_bodies(path, &geometry);
        let quads = path
            .commands
            .iter()
            .filter(|c| matches!(c, PathCommand::Quad { .. }))
            .count();
        assert_eq!(quads, 2);
    }

    #[test]
    fn blocked_straight_line_detours_around_the_middle_card() {
        let config = LayoutConfig::default();
        let geometry = geometry(&[("a", 0, 0), ("b", 0, 1), ("c", 0, 2)], &config);
        let paths = route(&edges(&[("a", "c")]), &geometry, &SelectionState::default(), &config);
        let path = &paths[0];
        assert_eq!(path.kind, RouteKind::Orthogonal);
        assert_clear_of_bodies(path, &geometry);
        let below = geometry["b"].rect.bottom();
        assert!(path.points.iter().any(|p| p.1 > below));
    }

    #[test]
    fn stacked_cards_detour_beside_the_column() {
        let config = LayoutConfig::default();
        let geometry = geometry(&[("a", 0, 0), ("b", 1, 0), ("c", 2, 0)], &config);
        let paths = route(&edges(&[("a", "c")]), &geometry, &SelectionState::default(), &config);
        assert_clear_of_bodies(&paths[0], &geometry);
    }

    #[test]
    fn missing_geometry_skips_the_edge() {
        let config = LayoutConfig::default();
        let geometry = geometry(&[("a", 0, 0)], &config);
        let paths = route(&edges(&[("a", "b")]), &geometry, &SelectionState::default(), &config);
        assert!(paths.is_empty());
    }

    #[test]
    fn output_follows_canonical_edge_order() {
        let config = LayoutConfig::default();
        let geometry = geometry(&[("a", 0, 0), ("b", 0, 1), ("c", 1, 0)], &config);
        let paths = route(
            &edges(&[("c", "b"), ("b", "a"), ("c", "a")]),
            &geometry,
            &SelectionState::default(),
            &config,
        );
        let keys: Vec<(&str, &str)> = paths.iter().map(|p| (p.key.a.as_str(), p.key.b.as_str())).collect();
        assert_eq!(keys, vec![("a", "b"), ("a", "c"), ("b", "c")]);
    }

    #[test]
    fn highlight_tracks_selection() {
        let config = LayoutConfig::default();
        let geometry = geometry(&[("a", 0, 0), ("b", 0, 1), ("c", 1, 0)], &config);
        let mut paths = route(
            &edges(&[("a", "b"), ("b", "c")]),
            &geometry,
            &SelectionState::default(),
            &config,
        );
        assert!(paths.iter().all(|p| !p.highlighted));
        apply_highlight(&mut paths, Some("a"));
        assert!(paths[0].highlighted);
        assert!(!paths[1].highlighted);
        apply_highlight(&mut paths, None);
        assert!(paths.iter().all(|p| !p.highlighted));
    }

    #[test]
    fn curved_style_emits_a_cubic_with_uniform_offset() {
        let config = LayoutConfig {
            connector_style: ConnectorStyle::Curved,
            ..LayoutConfig::default()
        };
        let geometry = geometry(&[("a", 0, 0), ("b", 1, 1)], &config);
        let paths = route(&edges(&[("a", "b")]), &geometry, &SelectionState::default(), &config);
        let path = &paths[0];
        assert_eq!(path.kind, RouteKind::Curved);
        let PathCommand::Cubic { c1, .. } = path.commands[1] else {
            panic!("expected cubic, got {:?}", path.commands);
        };
        let n = path.start.side.normal();
        assert_eq!(c1, (path.start.x + n.0 * config.curve_offset, path.start.y + n.1 * config.curve_offset));
        assert!(path.svg_path_data().starts_with("M "));
    }

    #[test]
    fn compress_path_drops_collinear_points() {
        let points = vec![(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (10.0, 0.0), (10.0, 10.0)];
        assert_eq!(compress_path(&points), vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
    }

    #[test]
    fn bends_count_corners_after_compression() {
        let config = LayoutConfig::default();
        let geometry = GeometryMap::new();
        let ctx = RouteContext {
            geometry: &geometry,
            config: &config,
        };
        let start = Anchor {
            node_id: "a".to_string(),
            x: 0.0,
            y: 0.0,
            side: Side::Right,
        };
        let end = Anchor {
            node_id: "b".to_string(),
            x: 20.0,
            y: 10.0,
            side: Side::Left,
        };
        let z = vec![(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (10.0, 10.0), (20.0, 10.0)];
        let elbow = score_shape(&ctx, z, RouteKind::Orthogonal, &start, &end);
        assert_eq!(elbow.points.len(), 4);
        assert_eq!(elbow.bends, 2);
        assert_eq!(elbow.hits, 0);

        let level = Anchor { y: 0.0, ..end.clone() };
        let line = vec![(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)];
        let straight = score_shape(&ctx, line, RouteKind::Orthogonal, &start, &level);
        assert_eq!(straight.bends, 0);
        assert_eq!(straight.kind, RouteKind::Straight);
    }

    #[test]
    fn rounded_corners_shrink_on_short_segments() {
        let commands = rounded_commands(&[(0.0, 0.0), (100.0, 0.0), (100.0, 8.0)], 10.0);
        assert_eq!(
            commands,
            vec![
                PathCommand::Move { to: (0.0, 0.0) },
                PathCommand::Line { to: (96.0, 0.0) },
                PathCommand::Quad {
                    ctrl: (100.0, 0.0),
                    to: (100.0, 4.0)
                },
                PathCommand::Line { to: (100.0, 8.0) },
            ]
        );
    }
}
