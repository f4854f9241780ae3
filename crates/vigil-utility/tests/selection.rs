use vigil_utility::{UtilityPolicy, UtilityPolicyConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opt {
    A,
    B,
    C,
}

struct Weights {
    a: f64,
    b: f64,
    c: f64,
}

fn score(key: Opt, w: &Weights) -> f64 {
    match key {
        Opt::A => w.a,
        Opt::B => w.b,
        Opt::C => w.c,
    }
}

#[test]
fn picks_highest_score_and_reports_all() {
    let mut policy = UtilityPolicy::new();
    let w = Weights { a: 0.1, b: 0.7, c: 0.3 };
    let sel = policy.select(&w, &[Opt::A, Opt::B, Opt::C], score).unwrap();
    assert_eq!(sel.key, Opt::B);
    assert_eq!(sel.scores.len(), 3);
    assert_eq!(sel.score_of(Opt::C), Some(0.3));
    assert_eq!(policy.last_choice(), Some(Opt::B));
}

#[test]
fn ties_resolve_to_first_candidate() {
    let mut policy = UtilityPolicy::new();
    let w = Weights { a: 0.5, b: 0.5, c: 0.5 };
    let sel = policy.select(&w, &[Opt::C, Opt::A, Opt::B], score).unwrap();
    assert_eq!(sel.key, Opt::C);
}

#[test]
fn nan_never_wins() {
    let mut policy = UtilityPolicy::new();
    let w = Weights { a: f64::NAN, b: -2.0, c: f64::NAN };
    let sel = policy.select(&w, &[Opt::A, Opt::B, Opt::C], score).unwrap();
    assert_eq!(sel.key, Opt::B);
}

#[test]
fn empty_candidates_select_nothing() {
    let mut policy: UtilityPolicy<Opt> = UtilityPolicy::new();
    let w = Weights { a: 1.0, b: 1.0, c: 1.0 };
    assert!(policy.select(&w, &[], score).is_none());
    assert_eq!(policy.last_choice(), None);
}

#[test]
fn min_score_rejects_weak_candidates() {
    let mut policy = UtilityPolicy::new().with_config(UtilityPolicyConfig { min_score: 1.0 });
    let w = Weights { a: 0.2, b: 0.4, c: 0.9 };
    assert!(policy.select(&w, &[Opt::A, Opt::B, Opt::C], score).is_none());
    assert_eq!(policy.last_best_score(), 0.9);
}
