//! Property-based checks of the ball geometry.
//!
//! Points are sampled uniformly in direction, for curvatures between −3 and
//! −0.1. Most checks run twice: once up to 95 % of the ball limit and once in
//! the shell just under the clamp radius.

use lobachevsky_hyp_ops::vector::norm;
use lobachevsky_hyp_ops::{project_to_ball, validate_hyperbolic, PoincareBall};
use proptest::prelude::*;

const DIM: usize = 6;

fn ball_strategy() -> impl Strategy<Value = PoincareBall> {
    (-3.0f64..-0.1).prop_map(|k| PoincareBall::new(k).unwrap())
}

/// Direction in [-1, 1]^dim and a radius fraction of the ball limit.
fn raw_point_strategy() -> impl Strategy<Value = (Vec<f64>, f64)> {
    (prop::collection::vec(-1.0f64..1.0, DIM), 0.0f64..0.95)
}

/// Radius fractions in `[0.99, 0.99999)`, up to the clamp radius.
fn boundary_point_strategy() -> impl Strategy<Value = (Vec<f64>, f64)> {
    (prop::collection::vec(-1.0f64..1.0, DIM), 0.99f64..0.99999)
}

/// Shell used for exp∘log. Past `1 − 1e-4` the Möbius sum in the exponential
/// map cancels to about `1e-16 / (1 − ‖x‖)²`, which no longer fits a 1e-6 bound.
fn roundtrip_shell_strategy() -> impl Strategy<Value = (Vec<f64>, f64)> {
    (prop::collection::vec(-1.0f64..1.0, DIM), 0.99f64..0.9999)
}

fn place(ball: &PoincareBall, (dir, frac): (Vec<f64>, f64)) -> Vec<f64> {
    let n = norm(&dir);
    if n < 1e-12 {
        return vec![0.0; dir.len()];
    }
    let r = ball.limit() * frac;
    dir.iter().map(|x| x / n * r).collect()
}

proptest! {
    #[test]
    fn adding_origin_is_identity(ball in ball_strategy(), raw in raw_point_strategy()) {
        let v = place(&ball, raw);
        let r = ball.mobius_add(&v, &[0.0; DIM]).unwrap();
        for (a, b) in r.iter().zip(v.iter()) {
            prop_assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn distance_is_symmetric(
        ball in ball_strategy(),
        a in raw_point_strategy(),
        b in raw_point_strategy(),
    ) {
        let p = place(&ball, a);
        let q = place(&ball, b);
        let d_pq = ball.distance(&p, &q).unwrap();
        let d_qp = ball.distance(&q, &p).unwrap();
        prop_assert!(d_pq.is_finite());
        prop_assert!((d_pq - d_qp).abs() < 1e-8, "{} vs {}", d_pq, d_qp);
        prop_assert_eq!(ball.distance(&p, &p).unwrap(), 0.0);
    }

    #[test]
    fn triangle_inequality(
        ball in ball_strategy(),
        a in raw_point_strategy(),
        b in raw_point_strategy(),
        c in raw_point_strategy(),
    ) {
        let (a, b, c) = (place(&ball, a), place(&ball, b), place(&ball, c));
        let ac = ball.distance(&a, &c).unwrap();
        let ab = ball.distance(&a, &b).unwrap();
        let bc = ball.distance(&b, &c).unwrap();
        prop_assert!(ac <= ab + bc + 1e-8, "d(a,c)={} > {} + {}", ac, ab, bc);
    }

    #[test]
    fn exp_inverts_log(
        ball in ball_strategy(),
        a in raw_point_strategy(),
        b in raw_point_strategy(),
    ) {
        let p = place(&ball, a);
        let q = place(&ball, b);
        let t = ball.log_map(&p, &q).unwrap();
        let back = ball.exp_map(&p, &t).unwrap();
        for (x, y) in back.iter().zip(q.iter()) {
            prop_assert!((x - y).abs() < 1e-6, "{:?} vs {:?}", back, q);
        }
    }

    #[test]
    fn distance_is_symmetric_near_boundary(
        ball in ball_strategy(),
        a in boundary_point_strategy(),
        b in boundary_point_strategy(),
    ) {
        let p = place(&ball, a);
        let q = place(&ball, b);
        let d_pq = ball.distance(&p, &q).unwrap();
        let d_qp = ball.distance(&q, &p).unwrap();
        prop_assert!(d_pq.is_finite());
        prop_assert!((d_pq - d_qp).abs() < 1e-8, "{} vs {}", d_pq, d_qp);
    }

    #[test]
    fn triangle_inequality_near_boundary(
        ball in ball_strategy(),
        a in boundary_point_strategy(),
        b in boundary_point_strategy(),
        c in raw_point_strategy(),
    ) {
        let (a, b, c) = (place(&ball, a), place(&ball, b), place(&ball, c));
        for (x, y, z) in [(&a, &b, &c), (&a, &c, &b), (&b, &a, &c)] {
            let xz = ball.distance(x, z).unwrap();
            let xy = ball.distance(x, y).unwrap();
            let yz = ball.distance(y, z).unwrap();
            prop_assert!(xz <= xy + yz + 1e-8, "{} > {} + {}", xz, xy, yz);
        }
    }

    #[test]
    fn exp_inverts_log_near_boundary(
        ball in ball_strategy(),
        a in roundtrip_shell_strategy(),
        b in roundtrip_shell_strategy(),
    ) {
        let p = place(&ball, a);
        let q = place(&ball, b);
        let t = ball.log_map(&p, &q).unwrap();
        let back = ball.exp_map(&p, &t).unwrap();
        for (x, y) in back.iter().zip(q.iter()) {
            prop_assert!((x - y).abs() < 1e-6, "{:?} vs {:?}", back, q);
        }
    }

    #[test]
    fn exp_zero_inverts_log_zero_up_to_the_clamp(ball in ball_strategy(), a in boundary_point_strategy()) {
        let y = place(&ball, a);
        let back = ball.exp_map_zero(&ball.log_map_zero(&y).unwrap()).unwrap();
        for (x, z) in back.iter().zip(y.iter()) {
            prop_assert!((x - z).abs() < 1e-6, "{:?} vs {:?}", back, y);
        }
    }

    #[test]
    fn projection_idempotent_and_inside(v in prop::collection::vec(-50.0f64..50.0, 1..12)) {
        let once = project_to_ball(&v).unwrap();
        let twice = project_to_ball(&once).unwrap();
        prop_assert!(norm(&once) < 1.0);
        prop_assert!(validate_hyperbolic(&once));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn exp_map_output_stays_inside(
        ball in ball_strategy(),
        base in raw_point_strategy(),
        tangent in prop::collection::vec(-100.0f64..100.0, DIM),
    ) {
        let x = place(&ball, base);
        let y = ball.exp_map(&x, &tangent).unwrap();
        prop_assert!(ball.contains(&y));
        prop_assert!(validate_hyperbolic(&y));
    }

    #[test]
    fn transport_preserves_riemannian_length(
        ball in ball_strategy(),
        a in raw_point_strategy(),
        b in raw_point_strategy(),
        v in prop::collection::vec(-2.0f64..2.0, DIM),
    ) {
        let from = place(&ball, a);
        let to = place(&ball, b);
        let moved = ball.parallel_transport(&from, &to, &v).unwrap();
        let before = ball.conformal_factor(&from) * norm(&v);
        let after = ball.conformal_factor(&to) * norm(&moved);
        prop_assert!((before - after).abs() <= 1e-8 * before.max(1.0));
    }
}
