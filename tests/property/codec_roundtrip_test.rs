// tests/property/codec_roundtrip_test.rs

//! Requests survive encode/decode unchanged, however the bytes are split on the wire.

use bytes::{Bytes, BytesMut};
use proptest::prelude::*;
use spinelproxy::core::protocol::{Incoming, Request, RequestCodec};
use tokio_util::codec::Decoder;

fn parts_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    // Arguments include CR, LF and NUL bytes on purpose.
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..12)
}

fn decode_all(codec: &mut RequestCodec, buf: &mut BytesMut) -> Vec<Incoming> {
    let mut out = Vec::new();
    while let Some(item) = codec.decode(buf).expect("decoder never fails hard") {
        out.push(item);
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_request_roundtrip(parts in parts_strategy()) {
        let request = Request::from_parts(parts.iter().map(|p| Bytes::from(p.clone())));
        let mut buf = BytesMut::from(&request.encode_to_vec()[..]);

        let decoded = decode_all(&mut RequestCodec, &mut buf);
        prop_assert_eq!(decoded, vec![Incoming::Request(request)]);
        prop_assert!(buf.is_empty());
    }

    #[test]
    fn test_pipelined_requests_split_at_any_point(
        first in parts_strategy(),
        second in parts_strategy(),
        split in any::<prop::sample::Index>(),
    ) {
        let a = Request::from_parts(first.iter().map(|p| Bytes::from(p.clone())));
        let b = Request::from_parts(second.iter().map(|p| Bytes::from(p.clone())));
        let mut wire = a.encode_to_vec();
        wire.extend_from_slice(&b.encode_to_vec());
        let at = split.index(wire.len() + 1);

        let mut codec = RequestCodec;
        let mut buf = BytesMut::from(&wire[..at]);
        let mut decoded = decode_all(&mut codec, &mut buf);
        buf.extend_from_slice(&wire[at..]);
        decoded.extend(decode_all(&mut codec, &mut buf));

        prop_assert_eq!(decoded, vec![Incoming::Request(a), Incoming::Request(b)]);
        prop_assert!(buf.is_empty());
    }

    #[test]
    fn test_garbage_never_panics_and_always_makes_progress(
        garbage in prop::collection::vec(any::<u8>(), 1..256)
    ) {
        let mut buf = BytesMut::from(&garbage[..]);
        let mut codec = RequestCodec;
        loop {
            let before = buf.len();
            match codec.decode(&mut buf).expect("decoder never fails hard") {
                // Waiting for more bytes consumes nothing.
                None => {
                    prop_assert_eq!(buf.len(), before);
                    break;
                }
                Some(_) => prop_assert!(buf.len() < before),
            }
        }
    }
}
