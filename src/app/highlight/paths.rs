use std::collections::VecDeque;

/// Breadth-first shortest path over an undirected adjacency list, bounded by `max_hops`.
pub(super) fn shortest_path(
    adjacency: &[Vec<usize>],
    from: usize,
    to: usize,
    max_hops: usize,
) -> Option<Vec<usize>> {
    if from >= adjacency.len() || to >= adjacency.len() {
        return None;
    }
    if from == to {
        return Some(vec![from]);
    }

    let mut queue = VecDeque::from([(from, 0usize)]);
    let mut visited = vec![false; adjacency.len()];
    let mut parent = vec![usize::MAX; adjacency.len()];
    visited[from] = true;

    while let Some((node, depth)) = queue.pop_front() {
        if node == to {
            break;
        }
        if depth >= max_hops {
            continue;
        }

        for &next in &adjacency[node] {
            if !visited[next] {
                visited[next] = true;
                parent[next] = node;
                queue.push_back((next, depth + 1));
            }
        }
    }

    if !visited[to] {
        return None;
    }

    let mut path = vec![to];
    let mut cursor = to;
    while cursor != from {
        let prev = parent[cursor];
        if prev == usize::MAX {
            return None;
        }
        path.push(prev);
        cursor = prev;
    }

    path.reverse();
    Some(path)
}
