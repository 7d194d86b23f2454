#![allow(missing_docs)]
#![cfg(feature = "extensions")]

use tagpack::{ErrorKind, Kind, Reader, Tag, Timestamp, Tree, Version, Writer};

#[test]
fn test_fixext_and_ext_forms() {
    assert_eq!(Tag::Ext(5, 1).to_vec(Version::Current), [0xd4, 0x05]);
    assert_eq!(Tag::Ext(5, 16).to_vec(Version::Current), [0xd8, 0x05]);
    assert_eq!(Tag::Ext(5, 3).to_vec(Version::Current), [0xc7, 0x03, 0x05]);
    assert_eq!(
        Tag::Ext(-2, 300).to_vec(Version::Current),
        [0xc8, 0x01, 0x2c, 0xfe]
    );
}

#[test]
fn test_ext_values() -> tagpack::Result<()> {
    let mut writer = Writer::new();
    writer.start_array(2)?;
    writer.write_ext(7, b"abc")?;
    writer.start_ext(8, 2)?;
    writer.write_bytes(b"xy")?;
    writer.finish_ext()?;
    writer.finish_array()?;
    let bytes = writer.finish()?;

    let mut reader = Reader::new(&bytes);
    reader.expect_array()?;
    assert_eq!(reader.read_ext()?, (7, b"abc".to_vec()));
    assert_eq!(reader.read_ext()?, (8, b"xy".to_vec()));
    reader.done_array()?;
    reader.finish()?;

    let tree = Tree::parse(&bytes)?;
    let first = tree.root().child(0)?;
    assert_eq!(first.kind(), Kind::Ext);
    assert_eq!(first.as_ext()?, (7, &b"abc"[..]));
    Ok(())
}

#[test]
fn test_timestamp_layouts() -> tagpack::Result<()> {
    let cases = [
        (Timestamp::from_seconds(1), 6),
        (Timestamp::new(1, 500)?, 10),
        (Timestamp::new(-1, 0)?, 15),
        (Timestamp::from_seconds(1 << 40), 15),
    ];
    for (timestamp, encoded) in cases {
        let mut writer = Writer::new();
        writer.write_timestamp(timestamp)?;
        let bytes = writer.finish()?;
        assert_eq!(bytes.len(), encoded, "{timestamp}");

        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.read_timestamp()?, timestamp);

        let tree = Tree::parse(&bytes)?;
        assert_eq!(tree.root().as_timestamp()?, timestamp);
    }
    Ok(())
}

#[test]
fn test_timestamp_nanoseconds_out_of_range() {
    assert_eq!(Timestamp::new(0, 1_000_000_000).unwrap_err().kind(), ErrorKind::Invalid);

    // timestamp64 with nanoseconds = 0x3fff_ffff.
    let data = [0xd7, 0xff, 0xff, 0xff, 0xff, 0xfc, 0x00, 0x00, 0x00, 0x00];
    let mut reader = Reader::new(&data);
    assert_eq!(reader.read_timestamp().unwrap_err().kind(), ErrorKind::Invalid);
}

#[test]
fn test_wrong_ext_type_is_not_a_timestamp() -> tagpack::Result<()> {
    let mut writer = Writer::new();
    writer.write_ext(3, &[0, 0, 0, 1])?;
    let bytes = writer.finish()?;
    let mut reader = Reader::new(&bytes);
    assert_eq!(reader.read_timestamp().unwrap_err().kind(), ErrorKind::Type);
    Ok(())
}
