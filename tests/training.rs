//! End-to-end behavior of the network: reproducibility, training progress,
//! persistence of a trained network and color conversion.

use cmyk_nn::{
    color::{patterns_from_pixels, Cmyk, Converter, Rgba, TargetLayout},
    neural::{FeedForward, Pattern, DEFAULT_INIT_RANGE},
    Error, NetworkConfig, Optimizer,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn seeded(hiddens: usize, seed: u64) -> FeedForward {
    FeedForward::with_rng(
        &mut StdRng::seed_from_u64(seed),
        4,
        hiddens,
        3,
        DEFAULT_INIT_RANGE,
    )
}

/// Textbook CMYK to RGB conversion used to synthesize paired samples.
fn naive_rgb(c: Cmyk) -> Rgba {
    let ch = |v: u8| ((255 - v as u32) * (255 - c.k as u32) / 255) as u8;
    Rgba::rgb(ch(c.c), ch(c.m), ch(c.y))
}

fn random_samples(n: usize, seed: u64) -> (Vec<Cmyk>, Vec<Rgba>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let cmyk: Vec<Cmyk> = (0..n)
        .map(|_| Cmyk::new(rng.gen(), rng.gen(), rng.gen(), rng.gen()))
        .collect();
    let rgb = cmyk.iter().map(|&c| naive_rgb(c)).collect();
    (cmyk, rgb)
}

#[test]
fn init_update_scenario_is_reproducible() {
    let mut a = seeded(12, 2024);
    let mut b = seeded(12, 2024);

    let out_a = a.update(&[0.1, 0.2, 0.3, 0.4]).unwrap().to_vec();
    let out_b = b.update(&[0.1, 0.2, 0.3, 0.4]).unwrap().to_vec();

    assert_eq!(out_a.len(), 3);
    assert!(out_a.iter().all(|&x| x > 0.0 && x < 1.0));
    let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&out_a), bits(&out_b));
}

#[test]
fn single_pattern_training_scenario() {
    let mut net = seeded(12, 7);
    let patterns = [Pattern::new(vec![0.5; 4], vec![0.5; 3])];

    let losses = net.train(&patterns, 1000, 0.6, 0.4).unwrap();

    assert_eq!(losses.len(), 1000);
    assert!(losses[999] < losses[0]);
}

#[test]
fn loss_mostly_decreases_with_small_rate() {
    let (cmyk, rgb) = random_samples(8, 1);
    let patterns = patterns_from_pixels(&cmyk, &rgb, TargetLayout::Rgb).unwrap();
    let mut net = seeded(12, 3);

    let losses = net.train(&patterns, 200, 0.05, 0.1).unwrap();

    let settled = &losses[10..];
    let non_increasing = settled.windows(2).filter(|w| w[1] <= w[0]).count();
    assert!(
        non_increasing * 2 > settled.len() - 1,
        "only {non_increasing} of {} steps decreased",
        settled.len() - 1
    );
    assert!(losses[199] < losses[0]);
}

#[test]
fn learns_naive_conversion() {
    let (cmyk, rgb) = random_samples(64, 11);
    let patterns = patterns_from_pixels(&cmyk, &rgb, TargetLayout::Rgb).unwrap();
    let mut net = NetworkConfig::default()
        .with_seed(Some(5))
        .build()
        .unwrap();

    let losses = Optimizer::new(300, 0.6, 0.4)
        .train(&mut net, &patterns)
        .unwrap();

    assert!(losses[299] < losses[0] * 0.5);
}

#[test]
fn context_window_after_n_plus_one_passes() {
    for n in 1..=4 {
        let mut net = seeded(6, n as u64);
        net.set_contexts(n, None).unwrap();

        let mut last_hidden = Vec::new();
        for step in 0..=n {
            let x = step as f64 / (n + 1) as f64;
            net.update(&[x, 1.0 - x, x * x, 0.5]).unwrap();
            last_hidden = net.hidden_activations().to_vec();
        }

        assert_eq!(net.contexts().len(), n);
        assert_eq!(net.contexts()[0], last_hidden);
        assert!(net.contexts().iter().all(|c| c.len() == net.n_hiddens()));
    }
}

#[test]
fn trained_network_survives_dump_and_load() {
    let path = std::env::temp_dir()
        .join("cmyk_nn_training")
        .join("network.json");
    let (cmyk, rgb) = random_samples(16, 4);
    let patterns = patterns_from_pixels(&cmyk, &rgb, TargetLayout::Rgb).unwrap();

    let mut net = NetworkConfig::default()
        .with_contexts(2)
        .with_seed(Some(9))
        .build()
        .unwrap();
    net.train(&patterns, 5, 0.6, 0.4).unwrap();
    net.dump(&path).unwrap();

    let mut restored = FeedForward::load(&path).unwrap();
    assert_eq!(restored, net);

    // Both copies keep training identically.
    let a = net.train(&patterns, 3, 0.6, 0.4).unwrap();
    let b = restored.train(&patterns, 3, 0.6, 0.4).unwrap();
    assert_eq!(a, b);

    let mut from_file = Converter::load(&path).unwrap();
    let mut in_memory = Converter::new(FeedForward::load(&path).unwrap());
    assert_eq!(
        from_file.convert_all(&cmyk).unwrap(),
        in_memory.convert_all(&cmyk).unwrap()
    );

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn shape_errors_are_reported() {
    let mut net = seeded(12, 0);

    assert!(matches!(
        net.update(&[0.1, 0.2, 0.3]),
        Err(Error::InvalidInputLength {
            expected: 4,
            got: 3
        })
    ));

    net.update(&[0.1, 0.2, 0.3, 0.4]).unwrap();
    assert!(matches!(
        net.back_propagate(&[0.1, 0.2, 0.3, 1.0], 0.6, 0.4),
        Err(Error::InvalidTargetLength {
            expected: 3,
            got: 4
        })
    ));
}

#[test]
fn rgba_layout_trains_four_outputs() {
    let (cmyk, rgb) = random_samples(4, 2);
    let patterns = patterns_from_pixels(&cmyk, &rgb, TargetLayout::Rgba).unwrap();
    let mut net = NetworkConfig::default()
        .with_outputs(TargetLayout::Rgba.outputs())
        .with_seed(Some(1))
        .build()
        .unwrap();

    assert!(patterns.iter().all(|p| p.target[3] == 1.0));
    assert_eq!(net.train(&patterns, 10, 0.6, 0.4).unwrap().len(), 10);
}
