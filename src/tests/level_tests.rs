// src/tests/level_tests.rs

//! tests for `level.rs`

use ::test_case::test_case;

use crate::data::level::{FilterMask, Level, STRING2LEVEL};

#[test_case("0", Some(Level::Emergency))]
#[test_case("3", Some(Level::Error))]
#[test_case("7", Some(Level::Debug))]
#[test_case(" 5 ", Some(Level::Notice); "padded")]
#[test_case("Warning", Some(Level::Warning); "name")]
#[test_case("8", None)]
#[test_case("-1", None)]
#[test_case("warning", None; "lowercase name")]
#[test_case("", None; "empty")]
fn test_level_from_attribute(
    value: &str,
    expect: Option<Level>,
) {
    assert_eq!(Level::from_attribute(value), expect);
}

#[test]
fn test_level_try_from_all() {
    for (i, level) in Level::ALL.iter().enumerate() {
        assert_eq!(Level::try_from(i as i32).unwrap(), *level);
        assert_eq!(level.as_i32(), i as i32);
    }
    assert!(Level::try_from(8).is_err());
    assert!(Level::try_from(-1).is_err());
}

#[test]
fn test_level_names_roundtrip() {
    assert_eq!(STRING2LEVEL.len(), Level::ALL.len());
    for level in Level::ALL.iter() {
        assert_eq!(level.as_str().parse::<Level>().unwrap(), *level);
        assert_eq!(level.to_string(), level.as_str());
    }
    assert!("Verbose".parse::<Level>().is_err());
}

#[test]
fn test_level_ordering() {
    assert!(Level::Emergency < Level::Debug);
    assert!(Level::Error < Level::Warning);
}

#[test_case(Level::Emergency, 0x01)]
#[test_case(Level::Error, 0x08)]
#[test_case(Level::Debug, 0x80)]
fn test_filtermask_of(
    level: Level,
    bits: i32,
) {
    assert_eq!(FilterMask::of(level).bits(), bits);
}

#[test_case(Level::Emergency, 0x01)]
#[test_case(Level::Notice, 0x3f)]
#[test_case(Level::Debug, 0xff)]
fn test_filtermask_upto(
    level: Level,
    bits: i32,
) {
    assert_eq!(FilterMask::upto(level).bits(), bits);
}

#[test]
fn test_filtermask_contains() {
    let mask = FilterMask::upto(Level::Warning);
    assert!(mask.contains(Level::Emergency));
    assert!(mask.contains(Level::Warning));
    assert!(!mask.contains(Level::Notice));
    assert!(!mask.contains(Level::Debug));

    let mask = FilterMask::ERR | FilterMask::DEBUG;
    assert!(mask.contains(Level::Error));
    assert!(mask.contains(Level::Debug));
    assert!(!mask.contains(Level::Info));
    assert_eq!(FilterMask::from_bits(mask.bits()), mask);
}

#[test]
fn test_filtermask_display() {
    assert_eq!(FilterMask::upto(Level::Notice).to_string(), "0x3f");
}
