//! Column inference over plain numeric extents.
//!
//! Two independent passes: [`cluster_edges`] + [`assign_to_edges`] find column
//! left edges from `x1` gaps, [`column_extents`] widens each cluster to its
//! rendered width, and [`assign_to_extents`] places blocks by horizontal center.

/// Closed horizontal interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

impl Span {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, value: f64, buffer: f64) -> bool {
        value >= self.start - buffer && value <= self.end + buffer
    }

    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// Sort the left edges and cut a new cluster wherever two consecutive values
/// are more than `gap` apart. Returns each cluster's `[min, max]` of `x1`.
pub fn cluster_edges(x1s: &[f64], gap: f64) -> Vec<Span> {
    let mut sorted = x1s.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut clusters: Vec<Span> = Vec::new();
    for x in sorted {
        match clusters.last_mut() {
            Some(current) if x - current.end <= gap => current.end = x,
            _ => clusters.push(Span::new(x, x)),
        }
    }
    clusters
}

/// First pass: index of the first cluster whose buffered `x1` range holds the
/// value. Values matching nothing fall back to cluster 0.
pub fn assign_to_edges(x1s: &[f64], clusters: &[Span], buffer: f64) -> Vec<usize> {
    x1s.iter()
        .map(|&x| {
            clusters
                .iter()
                .position(|c| c.contains(x, buffer))
                .unwrap_or(0)
        })
        .collect()
}

/// Widen every populated cluster to `[min(x1), max(x2)]` of its members and
/// return the extents ordered left to right.
pub fn column_extents(edges: &[(f64, f64)], assignment: &[usize], clusters: usize) -> Vec<Span> {
    let mut extents: Vec<Option<Span>> = vec![None; clusters];
    for (&(x1, x2), &idx) in edges.iter().zip(assignment) {
        let Some(slot) = extents.get_mut(idx) else {
            continue;
        };
        *slot = Some(match slot.take() {
            Some(s) => Span::new(s.start.min(x1), s.end.max(x2)),
            None => Span::new(x1, x2),
        });
    }

    let mut extents: Vec<Span> = extents.into_iter().flatten().collect();
    extents.sort_by(|a, b| a.start.total_cmp(&b.start));
    extents
}

/// Second pass: first extent whose buffered range holds the block center,
/// otherwise the extent with the nearest center.
pub fn assign_to_extents(centers: &[f64], extents: &[Span], buffer: f64) -> Vec<usize> {
    centers
        .iter()
        .map(|&cx| {
            extents
                .iter()
                .position(|e| e.contains(cx, buffer))
                .unwrap_or_else(|| nearest_extent(cx, extents))
        })
        .collect()
}

fn nearest_extent(cx: f64, extents: &[Span]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, e) in extents.iter().enumerate() {
        let distance = (cx - e.center()).abs();
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clusters_split_on_gap() {
        let clusters = cluster_edges(&[400.0, 62.0, 60.0, 410.0, 75.0], 50.0);
        assert_eq!(clusters, vec![Span::new(60.0, 75.0), Span::new(400.0, 410.0)]);
    }

    #[test]
    fn clusters_chain_small_steps() {
        // Each step is under the gap, so a ragged edge stays one cluster.
        let clusters = cluster_edges(&[0.0, 40.0, 80.0, 120.0], 50.0);
        assert_eq!(clusters, vec![Span::new(0.0, 120.0)]);
    }

    #[test]
    fn clusters_empty() {
        assert!(cluster_edges(&[], 50.0).is_empty());
    }

    #[test]
    fn edge_assignment_uses_buffer_and_fallback() {
        let clusters = vec![Span::new(60.0, 75.0), Span::new(400.0, 410.0)];
        let assigned = assign_to_edges(&[90.0, 385.0, 200.0], &clusters, 20.0);
        assert_eq!(assigned, vec![0, 1, 0]);
    }

    #[test]
    fn extents_cover_member_boxes() {
        let edges = [(60.0, 300.0), (70.0, 320.0), (400.0, 650.0)];
        let extents = column_extents(&edges, &[0, 0, 1], 2);
        assert_eq!(extents, vec![Span::new(60.0, 320.0), Span::new(400.0, 650.0)]);
    }

    #[test]
    fn extents_skip_unpopulated_clusters() {
        let extents = column_extents(&[(400.0, 650.0)], &[1], 2);
        assert_eq!(extents, vec![Span::new(400.0, 650.0)]);
    }

    #[test]
    fn center_assignment_falls_back_to_nearest() {
        let extents = vec![Span::new(60.0, 320.0), Span::new(400.0, 650.0)];
        let assigned = assign_to_extents(&[190.0, 525.0, 365.0, 1000.0], &extents, 10.0);
        // 365 sits in the gutter, closer to the right column's center (525) than the left (190)
        assert_eq!(assigned, vec![0, 1, 1, 1]);
    }
}
