#![allow(missing_docs)]

use tagpack::track::{Compound, Track};
use tagpack::ErrorKind;

#[test]
fn test_counts_down_and_pops() -> tagpack::Result<()> {
    let mut track = Track::new(8);
    track.element()?;
    track.push(Compound::Array, 2)?;
    track.element()?;
    track.element()?;
    assert_eq!(track.element().unwrap_err().kind(), ErrorKind::Misuse);
    track.pop(Compound::Array)?;
    track.check_empty()
}

#[test]
fn test_map_counts_keys_and_values() -> tagpack::Result<()> {
    let mut track = Track::new(8);
    track.push(Compound::Map, 1)?;
    track.element()?;
    assert_eq!(track.pop(Compound::Map).unwrap_err().kind(), ErrorKind::Misuse);
    track.element()?;
    track.pop(Compound::Map)
}

#[test]
fn test_bytes_frames() -> tagpack::Result<()> {
    let mut track = Track::new(8);
    track.push(Compound::Str, 5)?;
    assert_eq!(track.element().unwrap_err().kind(), ErrorKind::Misuse);
    track.bytes(3)?;
    assert_eq!(track.bytes(3).unwrap_err().kind(), ErrorKind::Misuse);
    track.bytes(2)?;
    track.pop(Compound::Str)?;
    assert_eq!(track.bytes(1).unwrap_err().kind(), ErrorKind::Misuse);
    Ok(())
}

#[test]
fn test_kind_mismatch_and_empty_pop() -> tagpack::Result<()> {
    let mut track = Track::new(8);
    assert_eq!(track.pop(Compound::Array).unwrap_err().kind(), ErrorKind::Misuse);
    track.push(Compound::Array, 0)?;
    assert_eq!(track.pop(Compound::Map).unwrap_err().kind(), ErrorKind::Misuse);
    assert_eq!(track.check_empty().unwrap_err().kind(), ErrorKind::Misuse);
    track.pop(Compound::Array)
}

#[test]
fn test_depth_limit() -> tagpack::Result<()> {
    let mut track = Track::new(3);
    for _ in 0..3 {
        track.push(Compound::Array, 1)?;
    }
    assert_eq!(track.depth(), 3);
    let err = track.push(Compound::Array, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooDeep);
    Ok(())
}

#[test]
fn test_open_ended_entries_count_up() -> tagpack::Result<()> {
    let mut track = Track::new(8);
    track.push_open(Compound::Map)?;
    for _ in 0..6 {
        track.element()?;
    }
    assert_eq!(track.pop_open(Compound::Map)?, 3);

    track.push_open(Compound::Map)?;
    track.element()?;
    assert_eq!(track.pop_open(Compound::Map).unwrap_err().kind(), ErrorKind::Misuse);

    assert_eq!(track.push_open(Compound::Str).unwrap_err().kind(), ErrorKind::Misuse);
    Ok(())
}

#[test]
fn test_inspecting_the_stack() -> tagpack::Result<()> {
    let mut track = Track::new(4);
    assert!(track.is_empty());
    assert!(track.top().is_none());
    assert_eq!(track.max_depth(), 4);

    track.push(Compound::Bin, 3)?;
    let top = track.top().copied().unwrap();
    assert_eq!(top.kind, Compound::Bin);
    assert_eq!(top.count, 3);
    assert!(!top.open_ended);
    assert!(!track.is_empty());
    Ok(())
}
