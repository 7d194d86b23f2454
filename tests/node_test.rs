#![allow(missing_docs)]

use tagpack::{Config, ErrorKind, Kind, Tree, Writer};

// {"a": 1, "b": [2, 3]}
const SAMPLE: [u8; 9] = [0x82, 0xa1, 0x61, 0x01, 0xa1, 0x62, 0x92, 0x02, 0x03];

#[test]
fn test_parse_sample() -> tagpack::Result<()> {
    let tree = Tree::parse(&SAMPLE)?;
    let root = tree.root();
    assert_eq!(root.kind(), Kind::Map);
    assert_eq!(root.len()?, 2);
    assert!(root.parent().is_none());

    assert_eq!(root.key_at(0)?.as_str()?, "a");
    assert_eq!(root.value_at(0)?.as_u8()?, 1);

    let b = root.value_for_key("b")?;
    assert_eq!(b.kind(), Kind::Array);
    let values: Vec<i64> = b
        .children()?
        .map(|child| child.as_i64())
        .collect::<tagpack::Result<_>>()?;
    assert_eq!(values, [2, 3]);
    assert_eq!(b.child(0)?.parent().map(|p| p.id()), Some(b.id()));
    assert_eq!(b.parent().map(|p| p.id()), Some(root.id()));

    assert_eq!(tree.node_count(), 7);
    assert_eq!(tree.consumed(), 9);
    assert_eq!(tree.remaining(), 0);
    Ok(())
}

#[test]
fn test_lookup_errors() -> tagpack::Result<()> {
    let tree = Tree::parse(&SAMPLE)?;
    let root = tree.root();

    assert_eq!(root.value_for_key("c").unwrap_err().kind(), ErrorKind::Data);
    assert!(root.get("c")?.is_none());
    assert!(root.contains_key("a")?);
    assert_eq!(root.child(0).unwrap_err().kind(), ErrorKind::Type);

    let b = root.value_for_key("b")?;
    assert_eq!(b.child(2).unwrap_err().kind(), ErrorKind::Data);
    assert_eq!(b.value_for_key("x").unwrap_err().kind(), ErrorKind::Type);
    assert_eq!(b.child(0)?.as_str().unwrap_err().kind(), ErrorKind::Type);
    Ok(())
}

#[test]
fn test_duplicate_keys_are_invalid() -> tagpack::Result<()> {
    let data = [0x82, 0xa1, b'k', 0x01, 0xa1, b'k', 0x02];
    let tree = Tree::parse(&data)?;
    let err = tree.root().value_for_key("k").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
    Ok(())
}

#[test]
fn test_integer_keys() -> tagpack::Result<()> {
    let mut writer = Writer::new();
    writer.start_map(2)?;
    writer.write_u32(7)?;
    writer.write_str("seven")?;
    writer.write_i32(-7)?;
    writer.write_str("minus seven")?;
    writer.finish_map()?;
    let bytes = writer.finish()?;

    let tree = Tree::parse(&bytes)?;
    let root = tree.root();
    assert_eq!(root.value_for_uint_key(7)?.as_str()?, "seven");
    assert_eq!(root.value_for_int_key(7)?.as_str()?, "seven");
    assert_eq!(root.value_for_int_key(-7)?.as_str()?, "minus seven");
    assert_eq!(root.value_for_uint_key(8).unwrap_err().kind(), ErrorKind::Data);
    Ok(())
}

#[test]
fn test_numeric_conversions() -> tagpack::Result<()> {
    let mut writer = Writer::new();
    writer.start_array(4)?;
    writer.write_u64(300)?;
    writer.write_i64(-1)?;
    writer.write_f64(0.5)?;
    writer.write_f32(0.25)?;
    writer.finish_array()?;
    let bytes = writer.finish()?;

    let tree = Tree::parse(&bytes)?;
    let root = tree.root();
    assert_eq!(root.child(0)?.as_i16()?, 300);
    assert_eq!(root.child(0)?.as_u8().unwrap_err().kind(), ErrorKind::Type);
    assert_eq!(root.child(1)?.as_i8()?, -1);
    assert_eq!(root.child(1)?.as_u64().unwrap_err().kind(), ErrorKind::Type);
    assert_eq!(root.child(2)?.as_f32()?, 0.5);
    assert_eq!(root.child(3)?.as_f32()?, 0.25);
    assert_eq!(root.child(3)?.as_f64().unwrap_err().kind(), ErrorKind::Type);
    Ok(())
}

#[test]
fn test_payloads_borrow_the_buffer() -> tagpack::Result<()> {
    let mut writer = Writer::new();
    writer.start_array(2)?;
    writer.write_str("text")?;
    writer.write_bin(&[1, 2, 3])?;
    writer.finish_array()?;
    let bytes = writer.finish()?;

    let tree = Tree::parse(&bytes)?;
    let text = tree.root().child(0)?;
    assert_eq!(text.data_offset()?, 2);
    assert_eq!(text.as_str_bytes()?, b"text");
    let bin = tree.root().child(1)?;
    assert_eq!(bin.as_bin()?, [1, 2, 3]);
    assert_eq!(bin.len()?, 3);
    Ok(())
}

#[test]
fn test_trailing_bytes() -> tagpack::Result<()> {
    let data = [0x01, 0xc0, 0x92, 0x02, 0x03];
    let tree = Tree::parse(&data)?;
    assert_eq!(tree.consumed(), 1);
    assert_eq!(tree.remaining(), 4);

    let err = Tree::parse_exact(&data, &Config::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);

    let trees = Tree::parse_all(&data, &Config::default())?;
    assert_eq!(trees.len(), 3);
    assert!(trees[1].root().is_nil());
    assert_eq!(trees[2].root().child(1)?.as_u8()?, 3);
    Ok(())
}

#[test]
fn test_malformed_input() {
    let cases: [(&[u8], ErrorKind); 4] = [
        (&[0xc1], ErrorKind::Invalid),
        (&[0x93, 0x01], ErrorKind::Invalid),
        (&[0xdd, 0xff, 0xff, 0xff, 0xff, 0x00], ErrorKind::Invalid),
        (&[0xa5, b'a'], ErrorKind::Invalid),
    ];
    for (data, kind) in cases {
        let err = Tree::parse(data).unwrap_err();
        assert_eq!(err.kind(), kind, "{data:02x?}");
    }
}

#[test]
fn test_limits() {
    let config = Config::default().with_max_nodes(3);
    let err = Tree::parse_with(&[0x93, 0x01, 0x02, 0x03], &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooBig);

    let config = Config::default().with_max_size(2);
    let err = Tree::parse_with(&[0xa3, b'a', b'b', b'c'], &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooBig);

    let config = Config::default().with_max_depth(2);
    let err = Tree::parse_with(&[0x91, 0x91, 0x91, 0xc0], &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooDeep);
}

#[test]
fn test_runs_larger_than_a_page() -> tagpack::Result<()> {
    let mut writer = Writer::new();
    writer.start_array(1000)?;
    for i in 0..1000u32 {
        writer.write_u32(i)?;
    }
    writer.finish_array()?;
    let bytes = writer.finish()?;

    let config = Config::default().with_node_page_size(64);
    let tree = Tree::parse_with(&bytes, &config)?;
    let root = tree.root();
    assert_eq!(root.child(999)?.as_u32()?, 999);
    assert_eq!(root.children()?.len(), 1000);
    assert_eq!(tree.node_count(), 1001);
    Ok(())
}

#[test]
fn test_million_levels_deep() -> tagpack::Result<()> {
    const DEPTH: usize = 1_000_000;
    let mut data = vec![0x91; DEPTH];
    data.push(0x2a);

    let config = Config::default().with_max_depth(DEPTH);
    let tree = Tree::parse_with(&data, &config)?;
    assert_eq!(tree.node_count(), DEPTH + 1);

    let mut node = tree.root();
    while node.kind() == Kind::Array {
        node = node.child(0)?;
    }
    assert_eq!(node.as_u8()?, 42);
    Ok(())
}

#[test]
fn test_every_truncation_fails() {
    for cut in 0..SAMPLE.len() {
        let err = Tree::parse(&SAMPLE[..cut]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid, "cut at {cut}");
    }
}
