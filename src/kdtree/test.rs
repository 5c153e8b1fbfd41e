use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::KnnIndexError;
use crate::kdtree::points::sq_dist;
use crate::kdtree::{
    KDTree, KDTreeBuilder, KDTreeIndex, MedianSplit, Neighbor, NodeRef, PointBuffer,
    QueryOptions, SlidingMidpoint, SplitRule, Workers,
};
use crate::r#type::IndexableFloat;

fn square_corners() -> KDTree<f64> {
    KDTree::try_new(vec![0., 0., 1., 0., 0., 1., 5., 5.], 2, 1).unwrap()
}

fn random_coords(rng: &mut StdRng, num_items: usize, dims: usize) -> Vec<f64> {
    (0..num_items * dims)
        .map(|_| rng.gen_range(-100.0..100.0))
        .collect()
}

fn grid_coords(rng: &mut StdRng, num_items: usize, dims: usize) -> Vec<f64> {
    (0..num_items * dims)
        .map(|_| rng.gen_range(0..4) as f64)
        .collect()
}

/// Linear scan ordered by `(distance, index)`, padded with missing slots.
fn brute_force<N: IndexableFloat>(
    coords: &[N],
    dims: usize,
    query: &[N],
    k: usize,
    bound_sq: N,
) -> Vec<Neighbor<N>> {
    let num_items = coords.len() / dims;
    let mut all: Vec<Neighbor<N>> = coords
        .chunks(dims)
        .enumerate()
        .map(|(index, point)| Neighbor {
            distance: sq_dist(point, query),
            index,
        })
        .filter(|n| n.distance <= bound_sq)
        .collect();
    all.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap()
            .then(a.index.cmp(&b.index))
    });
    all.truncate(k);
    while all.len() < k {
        all.push(Neighbor::missing(num_items));
    }
    all
}

fn brute_force_within(coords: &[f64], dims: usize, query: &[f64], r: f64) -> Vec<usize> {
    coords
        .chunks(dims)
        .enumerate()
        .filter(|(_, point)| sq_dist(point, query) <= r * r)
        .map(|(index, _)| index)
        .collect()
}

/// Walk every node and check the partitioning invariants, returning the number of nodes seen.
fn check_structure<N: IndexableFloat, T: KDTreeIndex<N>>(tree: &T) -> usize {
    assert!(tree.indices().is_permutation());
    assert_eq!(tree.indices().len(), tree.num_items());

    let root = tree.root();
    assert_eq!(root.start(), 0);
    assert_eq!(root.count(), tree.num_items());

    let mut seen = 0;
    let mut max_depth = 0;
    let mut stack: Vec<(NodeRef<'_, N, T>, usize)> = vec![(root, 0)];
    while let Some((node, depth)) = stack.pop() {
        seen += 1;
        max_depth = max_depth.max(depth);
        if node.is_leaf() {
            assert!(node.count() <= tree.leaf_size());
            assert!(node.cut_dim().is_none());
            continue;
        }

        let left = node.left_child().unwrap();
        let right = node.right_child().unwrap();
        assert!(left.count() >= 1 && right.count() >= 1);
        assert_eq!(left.start(), node.start());
        assert_eq!(right.start(), node.start() + left.count());
        assert_eq!(left.count() + right.count(), node.count());

        let cut_dim = node.cut_dim().unwrap();
        let cut_val = node.cut_val().unwrap();
        for index in left.point_indices() {
            assert!(tree.point(index)[cut_dim] <= cut_val);
        }
        for index in right.point_indices() {
            assert!(tree.point(index)[cut_dim] >= cut_val);
        }

        let (lo, hi) = node.cut_bounds().unwrap();
        let values: Vec<N> = node
            .point_indices()
            .map(|index| tree.point(index)[cut_dim])
            .collect();
        assert!(values.iter().all(|v| *v >= lo && *v <= hi));
        assert!(values.contains(&lo));
        assert!(values.contains(&hi));

        stack.push((left, depth + 1));
        stack.push((right, depth + 1));
    }
    assert_eq!(seen, tree.num_nodes());
    assert_eq!(max_depth, tree.depth());
    seen
}

fn check_exact<S: SplitRule<f64>>(coords: Vec<f64>, dims: usize, leaf_size: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let points = PointBuffer::try_new(coords.clone(), dims).unwrap();
    let tree = KDTreeBuilder::from_points(points, leaf_size)
        .finish::<S>()
        .unwrap();
    check_structure(&tree);

    for k in [1, 2, 5, 17] {
        for _ in 0..20 {
            let query: Vec<f64> = (0..dims).map(|_| rng.gen_range(-120.0..120.0)).collect();
            let expected = brute_force(&coords, dims, &query, k, f64::INFINITY);
            let actual = tree.query(&query, &QueryOptions::new(k)).unwrap();
            assert_eq!(actual, expected, "k={k} leaf_size={leaf_size} query={query:?}");
        }
    }
}

#[test]
fn closest_corners() {
    let tree = square_corners();
    let neighbors = tree.query(&[0., 0.], &QueryOptions::new(2)).unwrap();
    assert_eq!(
        neighbors,
        vec![
            Neighbor {
                distance: 0.,
                index: 0
            },
            Neighbor {
                distance: 1.,
                index: 1
            },
        ]
    );
}

#[test]
fn nothing_within_upper_bound() {
    let tree = square_corners();
    let options = QueryOptions::new(1).with_distance_upper_bound(1.);
    let neighbors = tree.query(&[10., 10.], &options).unwrap();
    assert_eq!(neighbors, vec![Neighbor::missing(4)]);
    assert_eq!(neighbors[0].distance, f64::INFINITY);
    assert_eq!(neighbors[0].index, 4);
    assert!(!neighbors[0].is_found(tree.num_items()));
}

#[test]
fn upper_bound_is_inclusive() {
    let tree = square_corners();
    let options = QueryOptions::new(4).with_distance_upper_bound(1.);
    let neighbors = tree.query(&[0., 0.], &options).unwrap();
    let indices: Vec<usize> = neighbors.iter().map(|n| n.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 4]);
    assert_eq!(neighbors[3].distance, f64::INFINITY);
}

#[test]
fn more_neighbors_than_points() {
    let tree = KDTree::try_new(vec![3., 1., 2.], 1, 2).unwrap();
    let neighbors = tree.query(&[0.], &QueryOptions::new(5)).unwrap();
    let indices: Vec<usize> = neighbors.iter().map(|n| n.index).collect();
    assert_eq!(indices, vec![1, 2, 0, 3, 3]);
    assert_eq!(neighbors[2].distance, 9.);
    assert_eq!(neighbors[4].distance, f64::INFINITY);
}

#[test]
fn exact_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(17);
    for dims in [2, 3, 5] {
        let coords = random_coords(&mut rng, 500, dims);
        for leaf_size in [1, 4, 16] {
            check_exact::<SlidingMidpoint>(coords.clone(), dims, leaf_size, dims as u64);
        }
    }
}

#[test]
fn median_split_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(29);
    let coords = random_coords(&mut rng, 300, 3);
    check_exact::<MedianSplit>(coords, 3, 3, 5);
}

#[test]
fn duplicate_heavy_data() {
    let mut rng = StdRng::seed_from_u64(3);
    let coords = grid_coords(&mut rng, 400, 2);
    for leaf_size in [1, 2, 8] {
        let tree = KDTree::try_new(coords.clone(), 2, leaf_size).unwrap();
        check_structure(&tree);
        for x in 0..4 {
            for y in 0..4 {
                let query = [x as f64, y as f64 + 0.5];
                for k in [1, 7, 40] {
                    let expected = brute_force(&coords, 2, &query, k, f64::INFINITY);
                    let actual = tree.query(&query, &QueryOptions::new(k)).unwrap();
                    assert_eq!(actual, expected);
                }
            }
        }
    }
}

#[test]
fn identical_points() {
    let coords = vec![2.5; 3 * 50];
    let tree = KDTree::try_new(coords.clone(), 3, 1).unwrap();
    assert_eq!(check_structure(&tree), 99);

    let neighbors = tree.query(&[2.5, 2.5, 3.5], &QueryOptions::new(3)).unwrap();
    assert_eq!(neighbors, brute_force(&coords, 3, &[2.5, 2.5, 3.5], 3, f64::INFINITY));
    let indices: Vec<usize> = neighbors.iter().map(|n| n.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn upper_bound_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(41);
    let coords = random_coords(&mut rng, 400, 2);
    let tree = KDTree::try_new(coords.clone(), 2, 5).unwrap();

    for r in [0.5, 5., 20.] {
        for _ in 0..20 {
            let query: [f64; 2] = [rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0)];
            let options = QueryOptions::new(8).with_distance_upper_bound(r);
            let actual = tree.query(&query, &options).unwrap();
            assert_eq!(actual, brute_force(&coords, 2, &query, 8, r * r));
            for neighbor in actual.iter().filter(|n| n.is_found(400)) {
                assert!(neighbor.distance <= r * r);
            }
        }
    }
}

#[test]
fn approximate_search_stays_within_slack() {
    let mut rng = StdRng::seed_from_u64(7);
    let coords = random_coords(&mut rng, 1000, 3);
    let tree = KDTree::try_new(coords.clone(), 3, 8).unwrap();

    for eps in [0.1, 0.5, 2.] {
        let slack = (1. + eps) * (1. + eps);
        let options = QueryOptions::new(6).with_eps(eps);
        for _ in 0..30 {
            let query: Vec<f64> = (0..3).map(|_| rng.gen_range(-100.0..100.0)).collect();
            let exact = brute_force(&coords, 3, &query, 6, f64::INFINITY);
            let approx = tree.query(&query, &options).unwrap();
            for (a, e) in approx.iter().zip(&exact) {
                assert!(a.is_found(1000));
                assert!(a.distance >= e.distance);
                assert!(a.distance <= e.distance * slack * (1. + 1e-12));
            }
            assert!(approx.windows(2).all(|w| w[0].distance <= w[1].distance));
        }
    }
}

#[test]
fn approximate_search_respects_upper_bound() {
    let mut rng = StdRng::seed_from_u64(13);
    let coords = random_coords(&mut rng, 800, 2);
    let tree = KDTree::try_new(coords.clone(), 2, 4).unwrap();

    let (eps, r) = (0.5, 15.);
    let slack = (1. + eps) * (1. + eps);
    let options = QueryOptions::new(6)
        .with_eps(eps)
        .with_distance_upper_bound(r);
    for _ in 0..40 {
        let query: [f64; 2] = [rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0)];
        let exact = brute_force(&coords, 2, &query, 6, r * r);
        let approx = tree.query(&query, &options).unwrap();

        let num_found = approx.iter().filter(|n| n.is_found(800)).count();
        assert_eq!(num_found, exact.iter().filter(|n| n.is_found(800)).count());
        for (a, e) in approx.iter().zip(&exact).take(num_found) {
            assert!(a.distance <= r * r);
            assert!(a.distance >= e.distance);
            assert!(a.distance <= e.distance * slack * (1. + 1e-12));
        }
        assert!(approx[num_found..].iter().all(|n| *n == Neighbor::missing(800)));
    }
}

#[test]
fn repeated_queries_are_identical() {
    let mut rng = StdRng::seed_from_u64(11);
    let coords = random_coords(&mut rng, 200, 2);
    let tree = KDTree::try_new(coords.clone(), 2, 4).unwrap();
    assert_eq!(tree, KDTree::try_new(coords, 2, 4).unwrap());

    let options = QueryOptions::new(10).with_eps(0.3);
    let first = tree.query(&[1., 2.], &options).unwrap();
    for _ in 0..5 {
        assert_eq!(tree.query(&[1., 2.], &options).unwrap(), first);
    }
}

#[test]
fn batch_matches_single_queries() {
    let mut rng = StdRng::seed_from_u64(23);
    let coords = random_coords(&mut rng, 600, 3);
    let tree = KDTree::try_new(coords, 3, 6).unwrap();
    let queries = random_coords(&mut rng, 150, 3);
    let options = QueryOptions::new(4).with_distance_upper_bound(30.);

    let expected: Vec<Vec<Neighbor<f64>>> = queries
        .chunks(3)
        .map(|query| tree.query(query, &options).unwrap())
        .collect();

    for workers in [Workers::Global, Workers::Threads(1), Workers::Threads(4)] {
        let results = tree.query_many(&queries, &options, workers).unwrap();
        assert_eq!(results.k(), 4);
        assert_eq!(results.num_queries(), 150);
        for (i, row) in expected.iter().enumerate() {
            assert_eq!(&results.row(i), row, "{workers:?} query {i}");
        }
    }
}

#[cfg(feature = "rayon")]
#[test]
fn batches_reuse_caller_pool() {
    let mut rng = StdRng::seed_from_u64(37);
    let coords = random_coords(&mut rng, 400, 2);
    let tree = KDTree::try_new(coords, 2, 8).unwrap();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(3)
        .build()
        .unwrap();
    let options = QueryOptions::new(5).with_eps(0.2);

    for _ in 0..3 {
        let queries = random_coords(&mut rng, 50, 2);
        assert_eq!(
            tree.query_many_in_pool(&queries, &options, &pool).unwrap(),
            tree.query_many(&queries, &options, Workers::Global).unwrap()
        );
    }
    assert!(matches!(
        tree.query_many_in_pool(&[1.], &options, &pool),
        Err(KnnIndexError::InvalidBufferLength { len: 1, dims: 2 })
    ));
}

#[test]
fn batch_of_nothing() {
    let tree = square_corners();
    let results = tree
        .query_many(&[], &QueryOptions::new(2), Workers::Global)
        .unwrap();
    assert_eq!(results.num_queries(), 0);
    let (distances, indices) = results.into_parts();
    assert!(distances.is_empty() && indices.is_empty());
}

#[test]
fn borrowed_view_answers_like_owner() {
    let mut rng = StdRng::seed_from_u64(31);
    let coords = random_coords(&mut rng, 100, 2);
    let tree = KDTree::try_new(coords, 2, 3).unwrap();
    let view = tree.as_kdtree_ref();
    check_structure(&view);

    let options = QueryOptions::new(3);
    assert_eq!(
        view.query(&[5., 5.], &options).unwrap(),
        tree.query(&[5., 5.], &options).unwrap()
    );
    assert_eq!(view.num_nodes(), tree.num_nodes());
    assert_eq!(view.bounding_box(), tree.bounding_box());
    let queries = [0., 0., 50., -50.];
    assert_eq!(
        view.query_many(&queries, &options, Workers::Threads(2))
            .unwrap(),
        tree.query_many(&queries, &options, Workers::Global).unwrap()
    );
}

#[test]
fn empty_tree() {
    let tree = KDTree::<f64>::try_new(vec![], 2, 4).unwrap();
    assert_eq!(tree.num_items(), 0);
    assert_eq!(tree.num_nodes(), 1);
    assert!(tree.root().is_leaf());
    assert!(tree.bounding_box().is_empty());

    let neighbors = tree.query(&[1., 1.], &QueryOptions::new(3)).unwrap();
    assert_eq!(neighbors, vec![Neighbor::missing(0); 3]);
    assert!(tree.range(&[-1., -1.], &[1., 1.]).unwrap().is_empty());
    assert!(tree.within(&[0., 0.], 10.).unwrap().is_empty());

    let results = tree
        .query_many(&[0., 0., 1., 1.], &QueryOptions::new(2), Workers::Global)
        .unwrap();
    assert_eq!(results.indices(), &[0, 0, 0, 0]);
    assert!(results.distances().iter().all(|d| d.is_infinite()));
}

#[test]
fn deep_tree_from_exponential_data() {
    let coords: Vec<f64> = (0..1000).map(|i| 2f64.powi(i)).collect();

    // sliding midpoints peel one or two points off the top of every range
    let tree = KDTree::try_new(coords.clone(), 1, 1).unwrap();
    assert!(tree.depth() > 500);
    assert_eq!(tree.num_nodes(), 1999);
    check_structure(&tree);

    let neighbors = tree.query(&[0.], &QueryOptions::new(3)).unwrap();
    let indices: Vec<usize> = neighbors.iter().map(|n| n.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    let neighbors = tree.query(&[2f64.powi(500)], &QueryOptions::new(1)).unwrap();
    assert_eq!(neighbors[0].index, 500);
    assert_eq!(neighbors[0].distance, 0.);
    drop(tree);

    let balanced = KDTreeBuilder::from_points(PointBuffer::try_new(coords, 1).unwrap(), 1)
        .finish::<MedianSplit>()
        .unwrap();
    assert_eq!(balanced.depth(), 10);
    check_structure(&balanced);
}

#[test]
fn range_and_within_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(53);
    let coords = random_coords(&mut rng, 500, 2);
    let tree = KDTree::try_new(coords.clone(), 2, 6).unwrap();

    for _ in 0..20 {
        let x: f64 = rng.gen_range(-100.0..80.0);
        let y: f64 = rng.gen_range(-100.0..80.0);
        let mins = [x, y];
        let maxes = [x + 20., y + 35.];
        let expected: Vec<usize> = coords
            .chunks(2)
            .enumerate()
            .filter(|(_, p)| {
                p[0] >= mins[0] && p[0] <= maxes[0] && p[1] >= mins[1] && p[1] <= maxes[1]
            })
            .map(|(i, _)| i)
            .collect();
        assert_eq!(tree.range(&mins, &maxes).unwrap(), expected);

        let r = rng.gen_range(0.0..30.0);
        assert_eq!(
            tree.within(&[x, y], r).unwrap(),
            brute_force_within(&coords, 2, &[x, y], r)
        );
    }
}

#[test]
fn single_precision_tree() {
    let mut rng = StdRng::seed_from_u64(61);
    let coords: Vec<f32> = (0..300 * 2).map(|_| rng.gen_range(-10.0..10.0)).collect();
    let tree = KDTree::try_new(coords.clone(), 2, 4).unwrap();
    check_structure(&tree);

    for _ in 0..20 {
        let query: [f32; 2] = [rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0)];
        let expected = brute_force(&coords, 2, &query, 4, f32::INFINITY);
        assert_eq!(tree.query(&query, &QueryOptions::new(4)).unwrap(), expected);
    }
}

#[test]
fn invalid_arguments() {
    let tree = square_corners();
    assert_eq!(
        tree.query(&[0., 0., 0.], &QueryOptions::new(1)),
        Err(KnnIndexError::DimensionMismatch {
            expected: 2,
            actual: 3
        })
    );
    assert_eq!(
        tree.query(&[0., 0.], &QueryOptions::new(0)),
        Err(KnnIndexError::InvalidK(0))
    );
    assert_eq!(
        tree.query_many(&[0., 0., 1.], &QueryOptions::new(1), Workers::Global),
        Err(KnnIndexError::InvalidBufferLength { len: 3, dims: 2 })
    );
    assert!(tree.within(&[0., 0.], -1.).is_err());
    assert!(tree.range(&[0.], &[1., 1.]).is_err());

    assert_eq!(
        KDTree::<f64>::try_new(vec![0., 0.], 2, 0),
        Err(KnnIndexError::InvalidLeafSize(0))
    );
    assert_eq!(
        KDTree::<f64>::try_new(vec![0., 0., 1.], 2, 4),
        Err(KnnIndexError::InvalidBufferLength { len: 3, dims: 2 })
    );
    assert_eq!(
        KDTree::<f64>::try_new(vec![], 0, 4),
        Err(KnnIndexError::InvalidDimensions)
    );
}

#[test]
fn unallocatable_k_is_an_error() {
    let tree = square_corners();
    assert!(matches!(
        tree.query(&[0., 0.], &QueryOptions::new(usize::MAX / 4)),
        Err(KnnIndexError::General(_))
    ));
    assert!(matches!(
        tree.query_many(&[0., 0.], &QueryOptions::new(usize::MAX / 4), Workers::Global),
        Err(KnnIndexError::General(_))
    ));
    // the slot count itself overflows
    assert!(matches!(
        tree.query_many(
            &[0., 0., 1., 1., 2., 2.],
            &QueryOptions::new(usize::MAX / 2),
            Workers::Global
        ),
        Err(KnnIndexError::General(_))
    ));
}

#[test]
fn introspection() {
    let tree = square_corners();
    assert_eq!(tree.dims(), 2);
    assert_eq!(tree.leaf_size(), 1);
    assert_eq!(tree.num_nodes(), 7);
    assert_eq!(tree.bounding_box().mins(), &[0., 0.]);
    assert_eq!(tree.bounding_box().maxes(), &[5., 5.]);
    assert_eq!(tree.point(3), &[5., 5.]);
    assert_eq!(tree.metadata().num_items(), 4);

    let root = tree.root();
    assert!(root.is_parent());
    let mut all: Vec<usize> = root.point_indices().collect();
    all.sort_unstable();
    assert_eq!(all, vec![0, 1, 2, 3]);

    let points = tree.into_points();
    assert_eq!(points.num_items(), 4);
}
