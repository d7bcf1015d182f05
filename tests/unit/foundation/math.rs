use super::*;

#[test]
fn fnv_seeded_hash_is_stable() {
    let mut a = Fnv1a64::new_default();
    a.write_bytes(b"fightframe");
    let mut b = Fnv1a64::new_default();
    b.write_bytes(b"fight");
    b.write_bytes(b"frame");
    assert_eq!(a.finish(), b.finish());
}

#[test]
fn mul_div255_rounds_to_nearest() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(128, 255), 128);
    assert_eq!(mul_div255_u16(255, 0), 0);
    assert_eq!(mul_div255_u16(128, 128), 64);
}

#[test]
fn splitmix_is_deterministic_per_seed() {
    let mut a = SplitMix64::new(42);
    let mut b = SplitMix64::new(42);
    let mut c = SplitMix64::new(43);
    let xs: Vec<u64> = (0..8).map(|_| a.next_u64()).collect();
    let ys: Vec<u64> = (0..8).map(|_| b.next_u64()).collect();
    let zs: Vec<u64> = (0..8).map(|_| c.next_u64()).collect();
    assert_eq!(xs, ys);
    assert_ne!(xs, zs);
}

#[test]
fn splitmix_ranges_stay_in_bounds() {
    let mut rng = SplitMix64::new(7);
    for _ in 0..256 {
        let v = rng.range_u32(50, 200);
        assert!((50..=200).contains(&v));
        let f = rng.next_f64();
        assert!((0.0..1.0).contains(&f));
    }
    assert_eq!(rng.range_u32(5, 5), 5);
    assert!(rng.choose::<u8>(&[]).is_none());
}

#[test]
fn lerp_hits_endpoints() {
    assert_eq!(lerp(2.0, 6.0, 0.0), 2.0);
    assert_eq!(lerp(2.0, 6.0, 1.0), 6.0);
    assert_eq!(lerp(2.0, 6.0, 0.5), 4.0);
}
