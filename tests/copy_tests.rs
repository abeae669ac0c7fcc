//! Copy engine behaviour without a retry policy

mod common;

use std::io::{Cursor, SeekFrom};

use common::{PullSink, PushSource, ScriptSink, ScriptSource, Signal};
use iox::{
    copy, copy_buffer, copy_n, copy_n_buffer, copy_policy, Error, ErrorKind, PullAdapter,
    ReturnPolicy, Seek, Source,
};
use rstest::rstest;

/// Readable source whose seek capability always fails
struct BrokenSeek<'a> {
    data: &'a [u8],
    seeks: usize,
}

impl Source for BrokenSeek<'_> {
    fn read(&mut self, buf: &mut [u8]) -> (usize, iox::Result<()>) {
        self.data.read(buf)
    }

    fn as_seek(&mut self) -> Option<&mut dyn Seek> {
        Some(self)
    }
}

impl Seek for BrokenSeek<'_> {
    fn seek(&mut self, _pos: SeekFrom) -> iox::Result<u64> {
        self.seeks += 1;
        Err(std::io::Error::other("seek refused").into())
    }
}

#[test]
fn test_count_is_bytes_accepted() {
    let mut src = Cursor::new(vec![7u8; 100_000]);
    let mut dst = Vec::new();
    let (n, res) = copy(&mut dst, &mut src);
    assert!(res.is_ok());
    assert_eq!(n, 100_000);
    assert_eq!(dst.len(), 100_000);
}

#[test]
fn test_partial_write_rolls_back_to_prior_total_plus_accepted() {
    let mut src = Cursor::new(b"abcdefgh".to_vec());
    let mut dst = ScriptSink::new(vec![(None, None), (Some(1), Some(Signal::WouldBlock))]);
    let mut buf = [0u8; 4];

    let (n, res) = copy_buffer(&mut dst, &mut src, &mut buf);
    assert_eq!(n, 5);
    assert!(res.unwrap_err().is_would_block());
    // 4 bytes from the first round plus 1 accepted from the second.
    assert_eq!(src.position(), 5);
    assert_eq!(dst.out, b"abcde");

    // The rolled-back bytes are delivered on the next call.
    let (n, res) = copy_buffer(&mut dst, &mut src, &mut buf);
    assert!(res.is_ok());
    assert_eq!(n, 3);
    assert_eq!(dst.out, b"abcdefgh");
}

#[test]
fn test_partial_write_with_more_rolls_back() {
    let mut src = Cursor::new(b"abcdef".to_vec());
    let mut dst = ScriptSink::new(vec![(Some(2), Some(Signal::More))]);
    let (n, res) = copy(&mut dst, &mut src);
    assert_eq!(n, 2);
    assert!(res.unwrap_err().is_more());
    assert_eq!(src.position(), 2);
}

#[test]
fn test_partial_write_on_unseekable_source_is_no_seeker() {
    let mut src = ScriptSource::new(vec![(b"abcdef", None)]);
    let mut dst = ScriptSink::new(vec![(Some(2), Some(Signal::WouldBlock))]);
    let (n, res) = copy(&mut dst, &mut src);
    assert_eq!(n, 2);
    assert_eq!(res.unwrap_err().kind(), ErrorKind::NoSeeker);
}

#[test]
fn test_partial_write_failure_is_not_rolled_back() {
    let mut src = Cursor::new(b"abcdef".to_vec());
    let mut dst = ScriptSink::new(vec![(Some(2), Some(Signal::Fail))]);
    let (n, res) = copy(&mut dst, &mut src);
    assert_eq!(n, 2);
    assert_eq!(res.unwrap_err().kind(), ErrorKind::Other);
    assert_eq!(src.position(), 6);
}

#[test]
fn test_short_write_without_error() {
    let mut src: &[u8] = b"abcdef";
    let mut dst = ScriptSink::new(vec![(Some(3), None)]);
    let (n, res) = copy(&mut dst, &mut src);
    assert_eq!(n, 3);
    assert!(matches!(res, Err(Error::ShortWrite)));
}

#[rstest]
#[case(Signal::WouldBlock)]
#[case(Signal::More)]
fn test_read_signal_delivers_bytes_first(#[case] signal: Signal) {
    let mut src = ScriptSource::new(vec![(b"abc", Some(signal)), (b"def", None)]);
    let mut dst = Vec::new();
    let (n, res) = copy(&mut dst, &mut src);
    assert_eq!(n, 3);
    assert_eq!(dst, b"abc");
    let err = res.unwrap_err();
    assert_eq!(err.is_would_block(), signal == Signal::WouldBlock);
    assert_eq!(err.is_more(), signal == Signal::More);
}

#[test]
fn test_zero_read_without_error_stops() {
    let mut src = ScriptSource::new(vec![(b"", None), (b"never", None)]);
    let mut dst = ScriptSink::new(vec![]);
    let (n, res) = copy(&mut dst, &mut src);
    assert_eq!(n, 0);
    assert!(res.is_ok());
    assert_eq!(src.reads, 1);
    assert_eq!(dst.writes, 0);
}

#[test]
fn test_read_failure_after_data() {
    let mut src = ScriptSource::new(vec![(b"ab", None), (b"c", Some(Signal::Fail))]);
    let mut dst = Vec::new();
    let (n, res) = copy(&mut dst, &mut src);
    assert_eq!(n, 3);
    assert_eq!(dst, b"abc");
    assert_eq!(res.unwrap_err().kind(), ErrorKind::Other);
}

#[test]
fn test_push_capability_takes_priority() {
    let mut src = PushSource::new(b"pushed", vec![]);
    let mut dst = PullSink::new(vec![]);
    let (n, res) = copy(&mut dst, &mut src);
    assert!(res.is_ok());
    assert_eq!(n, 6);
    assert_eq!(src.pushes, 1);
    assert_eq!(src.reads, 0);
    assert_eq!(dst.pulls, 0);
    assert_eq!(dst.out, b"pushed");
}

#[test]
fn test_pull_capability_used_without_push() {
    let mut src: &[u8] = b"pulled";
    let mut dst = PullSink::new(vec![]);
    let (n, res) = copy(&mut dst, &mut src);
    assert!(res.is_ok());
    assert_eq!(n, 6);
    assert_eq!(dst.pulls, 1);
    assert_eq!(dst.writes, 0);
}

#[test]
fn test_fast_path_signal_is_returned_with_count() {
    let mut src = PushSource::new(b"abcdef", vec![(2, Some(Signal::WouldBlock))]);
    let mut dst = Vec::new();
    let (n, res) = copy(&mut dst, &mut src);
    assert_eq!(n, 2);
    assert!(res.unwrap_err().is_would_block());
    assert_eq!(src.pushes, 1);
}

#[test]
fn test_pull_adapter_copies_everything() {
    let mut src = ScriptSource::new(vec![(b"one ", None), (b"two", None)]);
    let mut dst = PullAdapter(Vec::new());
    let (n, res) = copy(&mut dst, &mut src);
    assert!(res.is_ok());
    assert_eq!(n, 7);
    assert_eq!(dst.0, b"one two");
}

#[test]
fn test_copy_n_exact() {
    let mut src = Cursor::new(b"0123456789".to_vec());
    let mut dst = Vec::new();
    let (n, res) = copy_n(&mut dst, &mut src, 4);
    assert!(res.is_ok());
    assert_eq!(n, 4);
    assert_eq!(dst, b"0123");
    assert_eq!(src.position(), 4);
}

#[test]
fn test_copy_n_short_source_is_unexpected_eof() {
    let mut src = ScriptSource::new(vec![(b"abc", None)]);
    let mut dst = Vec::new();
    let (n, res) = copy_n(&mut dst, &mut src, 10);
    assert_eq!(n, 3);
    assert_eq!(res.unwrap_err().kind(), ErrorKind::UnexpectedEof);
}

#[test]
fn test_copy_n_zero_touches_nothing() {
    let mut src = ScriptSource::new(vec![(b"abc", None)]);
    let mut dst = ScriptSink::new(vec![]);
    let (n, res) = copy_n(&mut dst, &mut src, 0);
    assert_eq!(n, 0);
    assert!(res.is_ok());
    assert_eq!(src.reads, 0);
    assert_eq!(dst.writes, 0);
}

#[test]
fn test_copy_n_passes_signal_through() {
    let mut src = ScriptSource::new(vec![(b"ab", Some(Signal::WouldBlock)), (b"cd", None)]);
    let mut dst = Vec::new();
    let (n, res) = copy_n(&mut dst, &mut src, 4);
    assert_eq!(n, 2);
    assert!(res.unwrap_err().is_would_block());

    let (n, res) = copy_n(&mut dst, &mut src, 2);
    assert_eq!(n, 2);
    assert!(res.is_ok());
    assert_eq!(dst, b"abcd");
}

#[test]
fn test_copy_n_rolls_back_through_limit() {
    let mut src = Cursor::new(b"abcdefgh".to_vec());
    let mut dst = ScriptSink::new(vec![(Some(3), Some(Signal::WouldBlock))]);
    let mut buf = [0u8; 8];
    let (n, res) = copy_n_buffer(&mut dst, &mut src, 6, &mut buf);
    assert_eq!(n, 3);
    assert!(res.unwrap_err().is_would_block());
    assert_eq!(src.position(), 3);

    let (n, res) = copy_n_buffer(&mut dst, &mut src, 3, &mut buf);
    assert_eq!(n, 3);
    assert!(res.is_ok());
    assert_eq!(dst.out, b"abcdef");
    assert_eq!(src.position(), 6);
}

#[rstest]
#[case(Signal::WouldBlock)]
#[case(Signal::More)]
fn test_failed_rollback_seek_replaces_signal(#[case] signal: Signal) {
    let mut src = BrokenSeek {
        data: b"abcdef",
        seeks: 0,
    };
    let mut dst = ScriptSink::new(vec![(Some(2), Some(signal))]);
    let (n, res) = copy(&mut dst, &mut src);
    assert_eq!(n, 2);
    let err = res.unwrap_err();
    assert!(!err.is_semantic(), "{err}");
    assert_eq!(err.kind(), ErrorKind::Other);
    assert!(err.to_string().contains("seek refused"));
    assert_eq!(src.seeks, 1);
}

#[test]
fn test_failed_rollback_seek_under_return_policy() {
    let mut src = BrokenSeek {
        data: b"abcdef",
        seeks: 0,
    };
    let mut dst = ScriptSink::new(vec![(Some(2), Some(Signal::WouldBlock))]);
    let mut policy = ReturnPolicy;
    let (n, res) = copy_policy(&mut dst, &mut src, Some(&mut policy));
    assert_eq!(n, 2);
    let err = res.unwrap_err();
    assert!(!err.is_would_block());
    assert!(err.to_string().contains("seek refused"));
    assert_eq!(dst.out, b"ab");
}

#[test]
fn test_copy_n_prefers_destination_pull() {
    let mut src = ScriptSource::new(vec![(b"abcdefgh", None)]);
    let mut dst = PullSink::new(vec![]);
    let (n, res) = copy_n(&mut dst, &mut src, 5);
    assert!(res.is_ok());
    assert_eq!(n, 5);
    assert_eq!(dst.pulls, 1);
    assert_eq!(dst.writes, 0);
    assert_eq!(dst.out, b"abcde");
}

#[test]
fn test_full_write_skips_rollback_seek() {
    let mut src = BrokenSeek {
        data: b"abc",
        seeks: 0,
    };
    let mut dst = ScriptSink::new(vec![(None, Some(Signal::WouldBlock))]);
    let (n, res) = copy(&mut dst, &mut src);
    assert_eq!(n, 3);
    assert!(res.unwrap_err().is_would_block());
    assert_eq!(src.seeks, 0);
    assert_eq!(dst.out, b"abc");
}
