use super::*;

/// Greedy left-to-right reduction of overlapping hits.
///
/// Hits are taken in encounter order, assumed sorted by start. Each hit is
/// compared only with the surviving hit immediately before it: when they
/// overlap, the lower score is dropped and ties keep the earlier hit. A hit
/// that replaces its neighbour is not compared again with anything further
/// left, so chains of three or more overlapping hits resolve locally rather
/// than to an optimal selection. Surviving hits keep their relative order.
pub fn resolve_overlaps(hits: Vec<DomainHit>) -> Vec<DomainHit> {
    let mut kept = Vec::with_capacity(hits.len());
    let mut remaining = hits.into_iter();
    let Some(mut previous) = remaining.next() else {
        return kept;
    };

    for current in remaining {
        if current.start <= previous.end {
            if current.score > previous.score {
                previous = current;
            }
        } else {
            kept.push(previous);
            previous = current;
        }
    }
    kept.push(previous);
    kept
}
