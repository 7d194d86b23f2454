#![allow(missing_docs)]

use serde_json::json;
use tagpack::constants::MAX_SERIALIZE_DEPTH;
use tagpack::{Config, Tree, TreeInspector, Writer};

fn document() -> tagpack::Result<Vec<u8>> {
    let mut writer = Writer::new();
    writer.start_map(3)?;
    writer.write_str("name")?;
    writer.write_str("tagpack")?;
    writer.write_str("tags")?;
    writer.start_array(2)?;
    writer.write_i8(-1)?;
    writer.write_bool(true)?;
    writer.finish_array()?;
    writer.write_str("none")?;
    writer.write_nil()?;
    writer.finish_map()?;
    writer.finish()
}

#[test]
fn test_transcode_to_json() -> tagpack::Result<()> {
    let bytes = document()?;
    let tree = Tree::parse(&bytes)?;
    let value = serde_json::to_value(tree.root()).unwrap();
    assert_eq!(
        value,
        json!({ "name": "tagpack", "tags": [-1, true], "none": null })
    );
    Ok(())
}

#[test]
fn test_report_structure() -> tagpack::Result<()> {
    let bytes = document()?;
    let tree = Tree::parse(&bytes)?;
    let report = TreeInspector::inspect(&tree);

    assert_eq!(report.node_count, 9);
    assert_eq!(report.nodes.len(), 9);
    assert_eq!(report.max_depth, 2);
    assert_eq!(report.consumed, bytes.len());
    assert_eq!(report.nodes[0].kind, "map");
    assert_eq!(report.nodes[0].len, Some(3));
    assert_eq!(report.nodes[2].summary.as_deref(), Some("\"tagpack\""));
    assert!(report.nodes[8].last);

    let text = report.to_string();
    assert!(text.contains("TREE INSPECTOR REPORT"));
    assert!(text.contains("└── "));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["nodes"][4]["kind"], "array");
    Ok(())
}

/// `depth` nested single-element arrays around the integer 42.
fn nested_arrays(depth: usize) -> Vec<u8> {
    let mut data = vec![0x91; depth];
    data.push(0x2a);
    data
}

#[test]
fn test_transcode_at_the_depth_limit() -> tagpack::Result<()> {
    let data = nested_arrays(MAX_SERIALIZE_DEPTH);
    let tree = Tree::parse(&data)?;
    let json = serde_json::to_string(&tree.root()).unwrap();
    assert_eq!(json.len(), 2 * MAX_SERIALIZE_DEPTH + 2);
    assert!(json.contains("[42]"));

    let data = nested_arrays(MAX_SERIALIZE_DEPTH + 1);
    let tree = Tree::parse(&data)?;
    assert!(serde_json::to_string(&tree.root()).is_err());
    Ok(())
}

#[test]
fn test_transcoding_a_million_levels_fails_cleanly() -> tagpack::Result<()> {
    const DEPTH: usize = 1_000_000;
    let data = nested_arrays(DEPTH);
    let config = Config::default().with_max_depth(DEPTH);
    let tree = Tree::parse_with(&data, &config)?;

    let err = serde_json::to_vec(&tree.root()).unwrap_err();
    assert!(err.to_string().contains("Too Deep"), "{err}");
    Ok(())
}
