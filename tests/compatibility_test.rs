#![allow(missing_docs)]
#![cfg(feature = "compatibility")]

use tagpack::{Config, ErrorKind, Reader, Tree, Version, Writer};

fn legacy() -> Config {
    Config::default().with_version(Version::V4)
}

#[test]
fn test_v4_writer_avoids_new_forms() -> tagpack::Result<()> {
    let text = "x".repeat(40);
    let mut writer = Writer::with_config(legacy());
    writer.write_str(&text)?;
    writer.write_bin(&[1, 2])?;
    let bytes = writer.finish()?;

    assert_eq!(&bytes[..3], [0xda, 0x00, 40]);
    assert_eq!(&bytes[43..], [0xa2, 0x01, 0x02]);
    Ok(())
}

#[test]
fn test_v4_reader_rejects_new_forms() -> tagpack::Result<()> {
    for data in [&[0xd9, 0x01, b'a'][..], &[0xc4, 0x01, 0x00]] {
        let mut reader = Reader::with_config(data, legacy());
        assert_eq!(reader.read_tag().unwrap_err().kind(), ErrorKind::Invalid);
        assert_eq!(
            Tree::parse_with(data, &legacy()).unwrap_err().kind(),
            ErrorKind::Invalid
        );
    }

    let tree = Tree::parse_with(&[0xa1, b'a'], &legacy())?;
    assert_eq!(tree.root().as_str()?, "a");
    Ok(())
}
