//! Tier allocator: percentile mode conservation and monotonicity, threshold
//! mode overrides.

use grading_core::{
    allocator::{
        assign_by_percentiles, assign_by_thresholds, band_boundaries, band_tier_counts, AllocationShape,
        PercentileAllocator, ShiftSet, ThresholdMap,
    },
    config::GradingConfig,
    error::GradingError,
    optimizer::shift_grid,
    population::{LicenseRecord, ScoredPopulation, TieredPopulation},
    scoring::compute_scores,
    synthetic::synthetic_population,
    tier::BANDS,
    types::{TIER_MAX, TIER_MIN},
};

const NORMAL: AllocationShape = AllocationShape::Normal { mean: 15.0, std_dev: 7.0 };

fn scored(size: usize, seed: u64) -> ScoredPopulation {
    compute_scores(synthetic_population(size, seed)).unwrap()
}

fn assert_monotone(tiered: &TieredPopulation) {
    let ranked = tiered.ranked();
    for pair in ranked.windows(2) {
        let (better, better_tier) = pair[0];
        let (worse, worse_tier) = pair[1];
        if better.scores.total > worse.scores.total {
            assert!(
                better_tier >= worse_tier,
                "{} (total {}) got tier {} below {} (total {}) at tier {}",
                better.record.license_no,
                better.scores.total,
                better_tier,
                worse.record.license_no,
                worse.scores.total,
                worse_tier
            );
        }
    }
}

#[test]
fn every_entity_gets_exactly_one_tier() {
    let population = scored(1000, 11);
    for shape in [AllocationShape::Uniform, NORMAL] {
        for shifts in [ShiftSet::ZERO, ShiftSet::from_array([0.001, -0.001, 0.0005, -0.0009])] {
            let tiered = assign_by_percentiles(&population, &shifts, shape);
            assert_eq!(tiered.len(), 1000);
            assert!(
                tiered.tiers().iter().all(|t| (TIER_MIN..=TIER_MAX).contains(t)),
                "tier out of range for {shape:?} {shifts:?}"
            );
            let counts = PercentileAllocator::new(&population, shape).tier_counts(&shifts);
            assert_eq!(counts.iter().sum::<usize>(), 1000, "counts lost rows for {shape:?}");
        }
    }
}

#[test]
fn zero_shift_bands_hit_their_targets() {
    assert_eq!(band_boundaries(1000, &ShiftSet::ZERO), [90, 270, 500, 730]);

    let population = scored(1000, 3);
    let counts = PercentileAllocator::new(&population, NORMAL).tier_counts(&ShiftSet::ZERO);
    let expected = [90, 180, 230, 230, 270];
    for (band, want) in BANDS.iter().zip(expected) {
        let got: usize = band.tiers().map(|t| counts[t as usize]).sum();
        assert_eq!(got, want, "band {} holds {got}", band.label);
    }
    let standalone = band_tier_counts(&[90, 270, 500, 730], 1000, NORMAL);
    assert_eq!(standalone, counts, "free function and allocator must agree");
}

#[test]
fn boundaries_round_half_to_even_and_stay_ordered() {
    // 10 × 0.50 = 5 exactly; 10 × 0.09 = 0.9 → 1; 10 × 0.27 = 2.7 → 3; 10 × 0.73 = 7.3 → 7.
    assert_eq!(band_boundaries(10, &ShiftSet::ZERO), [1, 3, 5, 7]);
    // 50 × 0.09 = 4.5 → 4 under half-to-even.
    assert_eq!(band_boundaries(50, &ShiftSet::ZERO)[0], 4);

    let grid = shift_grid(&GradingConfig::default().shift_options);
    for n in [1usize, 2, 7, 100, 1234] {
        for shifts in &grid {
            let b = band_boundaries(n, shifts);
            assert!(b.windows(2).all(|w| w[0] <= w[1]), "unordered {b:?} for n={n}");
            assert!(b[3] <= n, "boundary past end {b:?} for n={n}");
        }
    }
}

#[test]
fn uniform_shape_splits_bands_evenly() {
    let population = scored(1000, 5);
    let counts = PercentileAllocator::new(&population, AllocationShape::Uniform).tier_counts(&ShiftSet::ZERO);
    for tier in 26..=30 {
        assert_eq!(counts[tier], 18, "band A has 90 rows over 5 tiers");
    }
    for tier in 1..=10 {
        assert_eq!(counts[tier], 27, "band E has 270 rows over 10 tiers");
    }
}

#[test]
fn normal_shape_peaks_nearest_the_mean() {
    let population = scored(2000, 9);
    let counts = PercentileAllocator::new(&population, NORMAL).tier_counts(&ShiftSet::ZERO);
    for band in BANDS {
        let peak = band
            .tiers()
            .min_by_key(|t| (*t as i32 - 15).abs())
            .unwrap();
        for tier in band.tiers() {
            assert!(
                counts[peak as usize] >= counts[tier as usize],
                "band {}: tier {tier} ({}) outnumbers peak tier {peak} ({})",
                band.label,
                counts[tier as usize],
                counts[peak as usize]
            );
        }
    }
}

#[test]
fn higher_scores_never_land_in_lower_tiers() {
    let population = scored(600, 21);
    let allocator = PercentileAllocator::new(&population, NORMAL);
    for shifts in shift_grid(&GradingConfig::default_test().shift_options) {
        let tiered = TieredPopulation::new(population.clone(), allocator.tiers(&shifts)).unwrap();
        assert_monotone(&tiered);
    }
}

#[test]
fn misaligned_tier_vector_is_rejected() {
    let population = scored(10, 8);
    let err = TieredPopulation::new(population, vec![TIER_MIN; 9]).unwrap_err();
    assert!(
        matches!(err, GradingError::TierMismatch { population: 10, tiers: 9 }),
        "expected TierMismatch, got {err}"
    );
}

#[test]
fn small_population_still_conserves_rows() {
    let population = scored(7, 2);
    let tiered = assign_by_percentiles(&population, &ShiftSet::ZERO, NORMAL);
    assert_eq!(tiered.len(), 7);
    assert_monotone(&tiered);
}

fn four_licenses() -> ScoredPopulation {
    // Purchase ranks 1..4 → totals 70, 60, 50, 40.
    let records = [400.0, 300.0, 200.0, 100.0]
        .iter()
        .enumerate()
        .map(|(i, p)| LicenseRecord {
            license_no: format!("L{}", i + 1),
            purchase_amount: Some(*p),
            ..LicenseRecord::default()
        })
        .collect();
    compute_scores(records).unwrap()
}

#[test]
fn thresholds_assign_highest_met_tier() {
    let population = four_licenses();
    let thresholds = ThresholdMap::from([(30, 65.0), (10, 45.0)]);
    let tiered = assign_by_thresholds(&population, &thresholds);
    assert_eq!(tiered.tiers(), &[30, 10, 10, 1]);
}

#[test]
fn later_tiers_override_earlier_thresholds() {
    let population = four_licenses();
    // Tier 25 asks for less than tier 20, so it wins wherever both apply.
    let thresholds = ThresholdMap::from([(20, 65.0), (25, 55.0)]);
    let tiered = assign_by_thresholds(&population, &thresholds);
    assert_eq!(tiered.tiers(), &[25, 25, 1, 1]);
}

#[test]
fn out_of_range_threshold_keys_are_ignored() {
    let population = four_licenses();
    let thresholds = ThresholdMap::from([(1, 0.0), (31, 0.0), (-4, 0.0), (0, 0.0)]);
    let tiered = assign_by_thresholds(&population, &thresholds);
    assert!(tiered.tiers().iter().all(|&t| t == 1), "got {:?}", tiered.tiers());
}
