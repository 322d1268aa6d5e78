//! Ring assembly: stitching way polylines into polygon geometry.

use geo::{Coord, LineString, MultiPolygon, Polygon};

use crate::osm::types::WayGeometry;

/// Stitch the way members of a relation into closed rings and return them
/// as a multi-polygon.
///
/// Ways are consumed in ascending id order; a ring is grown by appending
/// any remaining way that touches its open end (reversed when needed)
/// until the ring closes. Rings are emitted ordered by the smallest way id
/// they contain, so assembly is deterministic for a given member set.
/// Leftover open chains are dropped; topology repair is out of scope here.
pub fn assemble(ways: &[WayGeometry]) -> MultiPolygon<f64> {
    let mut remaining: Vec<&WayGeometry> = ways.iter().filter(|w| w.line.len() >= 2).collect();
    remaining.sort_by_key(|w| w.id);

    let mut rings: Vec<(u64, LineString<f64>)> = Vec::new();

    while !remaining.is_empty() {
        let seed = remaining.remove(0);
        let mut coords = seed.line.clone();
        let mut min_way = seed.id;

        loop {
            if is_closed(&coords) {
                if coords.len() >= 4 {
                    rings.push((min_way, LineString::new(coords)));
                } else {
                    tracing::debug!(way = min_way, "degenerate ring dropped");
                }
                break;
            }

            let end = coords[coords.len() - 1];
            let next = remaining
                .iter()
                .position(|w| touches(&w.line, end));
            match next {
                Some(pos) => {
                    let way = remaining.remove(pos);
                    min_way = min_way.min(way.id);
                    append_way(&mut coords, &way.line, end);
                }
                None => {
                    tracing::debug!(way = min_way, "open ring could not be closed, dropped");
                    break;
                }
            }
        }
    }

    rings.sort_by_key(|(min_way, _)| *min_way);
    MultiPolygon(
        rings
            .into_iter()
            .map(|(_, exterior)| Polygon::new(exterior, vec![]))
            .collect(),
    )
}

fn is_closed(coords: &[Coord<f64>]) -> bool {
    coords.len() >= 3 && coords[0] == coords[coords.len() - 1]
}

fn touches(line: &[Coord<f64>], end: Coord<f64>) -> bool {
    line[0] == end || line[line.len() - 1] == end
}

/// Append `line` to `coords`, reversing it when its far end is the one
/// that matches, and skipping the shared joint coordinate.
fn append_way(coords: &mut Vec<Coord<f64>>, line: &[Coord<f64>], end: Coord<f64>) {
    if line[0] == end {
        coords.extend_from_slice(&line[1..]);
    } else {
        coords.extend(line.iter().rev().skip(1));
    }
}
