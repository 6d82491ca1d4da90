use super::*;

#[test]
fn posix_high_res_is_monotonic() {
    let clock = Clock::init(ClockKind::PosixHighRes).unwrap();
    let a = clock.read();
    let b = clock.read();
    assert!(b >= a);
}

#[test]
fn placebo_always_reads_zero() {
    let clock = Clock::init(ClockKind::Placebo).unwrap();
    assert_eq!(clock.read(), 0.0);
    assert_eq!(clock.overhead(), 0.0);
}

#[test]
fn aix_high_res_is_unavailable_off_aix() {
    assert!(matches!(
        Clock::init(ClockKind::AixHighRes),
        Err(Error::ClockUnavailable { .. })
    ));
}

#[test]
fn overhead_is_small_and_nonnegative() {
    let clock = Clock::init(ClockKind::PosixHighRes).unwrap();
    assert!(clock.overhead() >= 0.0);
    assert!(clock.overhead() < 0.01, "overhead implausibly large");
}
