//! Example demonstrating exact, approximate and bounded nearest-neighbor queries.

use knn_index::kdtree::{KDTree, KDTreeIndex, QueryOptions, Workers};

fn main() {
    println!("=== k-Nearest-Neighbor Example ===\n");

    let coords: Vec<f64> = vec![
        0., 0., // A
        1., 0., // B
        0., 1., // C
        5., 5., // D
        2., 3., // E
    ];
    let names = ["A", "B", "C", "D", "E"];
    let tree = KDTree::try_new(coords, 2, 1).unwrap();
    println!(
        "Built a tree over {} points: {} nodes, depth {}",
        tree.num_items(),
        tree.num_nodes(),
        tree.depth()
    );

    println!("\n1. Exact search, three nearest to (0.2, 0.1):");
    let neighbors = tree.query(&[0.2, 0.1], &QueryOptions::new(3)).unwrap();
    for n in &neighbors {
        println!("  {} at distance {:.3}", names[n.index], n.distance.sqrt());
    }

    println!("\n2. Approximate search with eps = 1:");
    let options = QueryOptions::new(3).with_eps(1.);
    for n in tree.query(&[4., 4.], &options).unwrap() {
        println!("  {} at distance {:.3}", names[n.index], n.distance.sqrt());
    }

    println!("\n3. Bounded search, radius 1.5 around (4.5, 4.5):");
    let options = QueryOptions::new(3).with_distance_upper_bound(1.5);
    for n in tree.query(&[4.5, 4.5], &options).unwrap() {
        if n.is_found(tree.num_items()) {
            println!("  {} at distance {:.3}", names[n.index], n.distance.sqrt());
        } else {
            println!("  (no point)");
        }
    }

    println!("\n4. Batched queries on four threads:");
    let queries = [0., 0., 3., 3., 6., 6.];
    let results = tree
        .query_many(&queries, &QueryOptions::new(2), Workers::Threads(4))
        .unwrap();
    for i in 0..results.num_queries() {
        let row: Vec<&str> = results.row(i).iter().map(|n| names[n.index]).collect();
        println!("  query {i}: {row:?}");
    }
}
