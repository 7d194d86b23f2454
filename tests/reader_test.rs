#![allow(missing_docs)]

use std::io::{self, Cursor, Read};

use tagpack::{Config, ErrorKind, Reader, Tag, Writer};

// {"a": 1, "b": [2, 3]}
const SAMPLE: [u8; 9] = [0x82, 0xa1, b'a', 0x01, 0xa1, b'b', 0x92, 0x02, 0x03];

/// Hands out at most `step` bytes per read call.
struct Trickle<'a> {
    data: &'a [u8],
    step: usize,
}

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

struct Broken;

impl Read for Broken {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "gone"))
    }
}

fn read_sample(reader: &mut Reader<'_>) -> tagpack::Result<(u32, Vec<i64>)> {
    assert_eq!(reader.expect_map()?, 2);
    reader.expect_str_match("a")?;
    let a = reader.expect_u32()?;
    reader.expect_str_match("b")?;
    let n = reader.expect_array()?;
    let mut b = Vec::new();
    for _ in 0..n {
        b.push(reader.expect_i64()?);
    }
    reader.done_array()?;
    reader.done_map()?;
    reader.finish()?;
    Ok((a, b))
}

#[test]
fn test_slice_reader_walks_sample() -> tagpack::Result<()> {
    let mut reader = Reader::new(&SAMPLE);
    assert_eq!(read_sample(&mut reader)?, (1, vec![2, 3]));
    assert_eq!(reader.position(), 9);
    assert_eq!(reader.remaining(), 0);
    Ok(())
}

#[test]
fn test_streaming_reader_with_tiny_reads() -> tagpack::Result<()> {
    let source = Trickle {
        data: &SAMPLE,
        step: 1,
    };
    let mut reader = Reader::from_source(source, Config::default().with_buffer_size(32));
    assert_eq!(read_sample(&mut reader)?, (1, vec![2, 3]));
    Ok(())
}

#[test]
fn test_streaming_payload_larger_than_buffer() -> tagpack::Result<()> {
    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    let mut writer = Writer::new();
    writer.start_array(2)?;
    writer.write_bin(&payload)?;
    writer.write_str("tail")?;
    writer.finish_array()?;
    let bytes = writer.finish()?;

    let source = Trickle {
        data: &bytes,
        step: 7,
    };
    let mut reader = Reader::from_source(source, Config::default().with_buffer_size(64));
    assert_eq!(reader.expect_array()?, 2);
    assert_eq!(reader.expect_bin()?, payload);
    assert_eq!(reader.expect_str()?, "tail");
    reader.done_array()?;
    reader.finish()
}

#[test]
fn test_truncated_slice_is_invalid() {
    let mut reader = Reader::new(&SAMPLE[..5]);
    let err = read_sample(&mut reader).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
}

#[test]
fn test_truncated_stream_is_eof() {
    let source = Cursor::new(SAMPLE[..5].to_vec());
    let mut reader = Reader::from_source(source, Config::default());
    let err = read_sample(&mut reader).unwrap_err();
    match err {
        tagpack::Error::Io(io) => assert_eq!(io.kind(), io::ErrorKind::UnexpectedEof),
        other => panic!("expected an I/O error, got {other:?}"),
    }
}

#[test]
fn test_source_failure_latches_io() {
    let mut reader = Reader::from_source(Broken, Config::default());
    assert_eq!(reader.read_tag().unwrap_err().kind(), ErrorKind::Io);
    assert_eq!(reader.read_tag().unwrap_err().kind(), ErrorKind::Io);
    assert!(reader.error().is_some());
}

#[test]
fn test_errors_latch() {
    let mut reader = Reader::new(&SAMPLE);
    let err = reader.expect_array().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);

    // Nothing is consumed once the reader has failed.
    let position = reader.position();
    assert_eq!(reader.expect_map().unwrap_err().kind(), ErrorKind::Type);
    assert_eq!(reader.position(), position);
    assert_eq!(reader.finish().unwrap_err().kind(), ErrorKind::Type);
}

#[test]
fn test_peek_does_not_consume() -> tagpack::Result<()> {
    let mut reader = Reader::new(&SAMPLE);
    assert_eq!(reader.peek_tag()?, Tag::Map(2));
    assert_eq!(reader.peek_tag()?, Tag::Map(2));
    assert_eq!(reader.position(), 0);
    assert_eq!(reader.read_tag()?, Tag::Map(2));
    assert_eq!(reader.depth(), 1);
    Ok(())
}

#[test]
fn test_done_with_elements_left_is_misuse() -> tagpack::Result<()> {
    let mut reader = Reader::new(&SAMPLE);
    reader.expect_map()?;
    reader.skip_value()?;
    let err = reader.done_map().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Misuse);
    Ok(())
}

#[test]
fn test_skip_value_and_value_size() -> tagpack::Result<()> {
    let mut data = SAMPLE.to_vec();
    data.push(0xc0);
    let mut reader = Reader::new(&data);
    reader.skip_value()?;
    assert_eq!(reader.position(), 9);
    reader.expect_nil()?;
    reader.finish()?;

    assert_eq!(tagpack::reader::value_size(&data)?, 9);
    Ok(())
}

#[test]
fn test_skip_value_depth_limit() {
    let mut data = vec![0x91; 40];
    data.push(0xc0);
    let mut reader = Reader::with_config(&data, Config::default().with_max_depth(16));
    assert_eq!(reader.skip_value().unwrap_err().kind(), ErrorKind::TooDeep);
}

#[test]
fn test_byte_reads() -> tagpack::Result<()> {
    let data = [0xa5, b'h', b'e', b'l', b'l', b'o'];
    let mut reader = Reader::new(&data);
    assert_eq!(reader.read_tag()?, Tag::Str(5));
    let mut head = [0u8; 2];
    reader.read_bytes(&mut head)?;
    assert_eq!(&head, b"he");
    assert_eq!(reader.read_bytes_inplace(2)?, b"ll");
    reader.skip_bytes(1)?;
    reader.done_str()?;
    reader.finish()
}

#[test]
fn test_byte_read_past_payload_is_misuse() -> tagpack::Result<()> {
    let data = [0xa2, b'h', b'i', 0xc0];
    let mut reader = Reader::new(&data);
    reader.read_tag()?;
    let err = reader.read_bytes_vec(3).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Misuse);
    Ok(())
}

#[test]
fn test_borrowed_reads_need_a_slice() -> tagpack::Result<()> {
    let data = [0xa2, b'h', b'i'];
    let mut reader = Reader::new(&data);
    assert_eq!(reader.expect_str_borrowed()?, "hi");

    let mut reader = Reader::from_source(Cursor::new(data.to_vec()), Config::default());
    let err = reader.expect_str_borrowed().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Misuse);
    Ok(())
}

#[test]
fn test_size_limit() {
    let data = [0xda, 0x01, 0x00];
    let mut reader = Reader::with_config(&data, Config::default().with_max_size(255));
    let err = reader.read_tag().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooBig);
}

#[test]
fn test_trailing_bytes_are_left_unread() -> tagpack::Result<()> {
    let data = [0x01, 0x02];
    let mut reader = Reader::new(&data);
    assert_eq!(reader.expect_u8()?, 1);
    reader.finish()?;
    assert_eq!(reader.remaining(), 1);
    Ok(())
}

#[test]
fn test_skip_value_million_levels_deep() -> tagpack::Result<()> {
    const DEPTH: usize = 1_000_000;
    let mut data = vec![0x91; DEPTH];
    data.push(0xc0);
    let mut reader = Reader::with_config(&data, Config::default().with_max_depth(DEPTH));
    reader.skip_value()?;
    assert_eq!(reader.position(), DEPTH as u64 + 1);
    reader.finish()
}

#[test]
fn test_every_truncation_fails() {
    for cut in 0..SAMPLE.len() {
        let mut reader = Reader::new(&SAMPLE[..cut]);
        let err = reader.skip_value().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid, "cut at {cut}");

        let source = Cursor::new(SAMPLE[..cut].to_vec());
        let mut reader = Reader::from_source(source, Config::default());
        let err = reader.skip_value().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io, "cut at {cut}");
    }
}

#[test]
fn test_claimed_length_beyond_the_input() {
    // str32 claiming 16 MiB, followed by three bytes.
    let data = [0xdb, 0x01, 0x00, 0x00, 0x00, b'a', b'b', b'c'];
    let mut reader = Reader::new(&data);
    assert_eq!(reader.expect_str().unwrap_err().kind(), ErrorKind::Invalid);

    let source = Cursor::new(data.to_vec());
    let mut reader = Reader::from_source(source, Config::default());
    assert_eq!(reader.expect_str().unwrap_err().kind(), ErrorKind::Io);
}

#[test]
fn test_streamed_payload_larger_than_buffer() -> tagpack::Result<()> {
    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    let mut writer = Writer::new();
    writer.write_bin(&payload)?;
    let bytes = writer.finish()?;

    let source = Trickle {
        data: &bytes,
        step: 7,
    };
    let mut reader = Reader::from_source(source, Config::default().with_buffer_size(32));
    assert_eq!(reader.expect_bin()?, payload);
    reader.finish()
}
