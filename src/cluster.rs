use geo::{Distance, Haversine, Point};

/// Brute-force DBSCAN over geographic points. `epsilon_km` is the
/// neighbourhood radius measured along the great circle; `min_points` is the
/// density threshold including the point itself.
///
/// Points are scanned in input order, so cluster membership and cluster
/// numbering are deterministic: the first member of each cluster is the
/// earliest unclaimed point in the input.
pub fn dbscan(points: &[Point<f64>], epsilon_km: f64, min_points: usize) -> Vec<Vec<usize>> {
    let epsilon_m = epsilon_km * 1000.0;
    let n = points.len();
    let mut assigned = vec![false; n];
    let mut clusters: Vec<Vec<usize>> = Vec::new();

    for i in 0..n {
        if assigned[i] {
            continue;
        }
        let neighbours = region_query(points, i, epsilon_m);
        if neighbours.len() < min_points {
            // Noise, unless a later cluster expansion claims it.
            continue;
        }

        let mut members = Vec::new();
        let mut queue = vec![i];
        assigned[i] = true;
        while let Some(j) = queue.pop() {
            members.push(j);
            let reachable = region_query(points, j, epsilon_m);
            if reachable.len() < min_points {
                continue;
            }
            for k in reachable {
                if !assigned[k] {
                    assigned[k] = true;
                    queue.push(k);
                }
            }
        }
        members.sort_unstable();
        clusters.push(members);
    }

    clusters
}

fn region_query(points: &[Point<f64>], centre: usize, epsilon_m: f64) -> Vec<usize> {
    let c = points[centre];
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| Haversine::distance(c, **p) <= epsilon_m)
        .map(|(i, _)| i)
        .collect()
}
