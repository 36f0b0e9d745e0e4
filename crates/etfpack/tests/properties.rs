use std::io::Write;

use bytes::Bytes;
use etfpack::{pack, pack_with, unpack, DecodeError, EncodeError, Map, PackConfig, Value};
use flate2::write::ZlibEncoder;
use flate2::Compression;

fn sample() -> Value {
    let mut inner = Map::new();
    inner.insert("id", 4_000_000_000u32);
    inner.insert("ratio", 0.25);
    inner.insert(7, Value::Binary(Bytes::from_static(&[0, 0xFF, 0x80])));

    let mut map = Map::new();
    map.insert("op", 0);
    map.insert("t", "MESSAGE_CREATE");
    map.insert("s", -42);
    map.insert("d", inner);
    map.insert("flags", vec![Value::Bool(true), Value::Bool(false), Value::Nil]);
    map.insert(vec![1, 2], "list key");
    map.insert("empty", Vec::<Value>::new());
    map.insert("big_negative", -2_147_483_647i64);
    Value::Map(map)
}

fn nested(levels: usize) -> Value {
    let mut value = Value::Int(1);
    for _ in 0..levels {
        value = Value::List(vec![value]);
    }
    value
}

#[test]
fn round_trip() {
    let values = [
        sample(),
        Value::Nil,
        Value::Float(-0.0),
        Value::Float(1e300),
        Value::from(""),
        Value::from("snowman \u{2603}"),
        Value::Int(i64::from(u32::MAX)),
        Value::Int(i64::from(i32::MIN) + 1),
        nested(100),
    ];
    for value in values {
        let bytes = pack(&value).unwrap();
        assert_eq!(unpack(&bytes).unwrap(), value);
    }
}

#[test]
fn version_gate() {
    let bytes = pack(&sample()).unwrap().to_vec();
    for version in (0..=255u8).filter(|&v| v != 131) {
        let mut data = bytes.clone();
        data[0] = version;
        assert_eq!(
            unpack(&data).unwrap_err(),
            DecodeError::VersionMismatch { found: version }
        );
    }
}

#[test]
fn every_truncated_prefix_fails_cleanly() {
    let bytes = pack(&sample()).unwrap();
    for cut in 0..bytes.len() {
        let err = unpack(&bytes[..cut]).unwrap_err();
        assert!(
            matches!(
                err,
                DecodeError::BufferUnderrun { .. } | DecodeError::MalformedContainer { .. }
            ),
            "cut at {cut}: {err:?}"
        );
    }
    assert_eq!(unpack(&bytes).unwrap(), sample());
}

#[test]
fn list_terminator_must_be_nil() {
    let bytes = pack(&Value::from(vec![1, 2, 3])).unwrap().to_vec();
    let tail = bytes.len() - 1;
    assert_eq!(bytes[tail], 106);

    for marker in (0..=255u8).filter(|&b| b != 106) {
        let mut data = bytes.clone();
        data[tail] = marker;
        assert_eq!(
            unpack(&data).unwrap_err(),
            DecodeError::MalformedContainer {
                offset: tail,
                found: marker
            }
        );
    }
}

#[test]
fn big_integer_boundaries() {
    for n in [
        i64::from(i32::MAX),
        i64::from(i32::MIN),
        i64::from(u32::MAX),
        -i64::from(i32::MAX),
    ] {
        assert_eq!(unpack(&pack(&Value::Int(n)).unwrap()).unwrap(), Value::Int(n));
    }

    // Past 32 bits the decoder hands back decimal text.
    let bytes = pack(&Value::Int(i64::MAX)).unwrap();
    assert_eq!(
        bytes.as_ref(),
        b"\x83n\x08\x00\xff\xff\xff\xff\xff\xff\xff\x7f"
    );
    assert_eq!(unpack(&bytes).unwrap(), Value::from("9223372036854775807"));
    assert_eq!(
        unpack(&pack(&Value::Int(i64::MIN)).unwrap()).unwrap(),
        Value::from("-9223372036854775808")
    );
    assert_eq!(
        unpack(&pack(&Value::Int(-2_147_483_649)).unwrap()).unwrap(),
        Value::from("-2147483649")
    );

    let nine_bytes = b"\x83n\x09\x00\x00\x00\x00\x00\x00\x00\x00\x00\x01";
    let err = unpack(nine_bytes).unwrap_err();
    assert!(matches!(err, DecodeError::UnsupportedBigInt { digits: 9, .. }));
    assert!(err.is_unsupported());
}

#[test]
fn atom_coercion() {
    let cases: [(&[u8], Value); 5] = [
        (b"\x83s\x03nil", Value::Nil),
        (b"\x83s\x04null", Value::Nil),
        (b"\x83s\x04true", Value::Bool(true)),
        (b"\x83s\x05false", Value::Bool(false)),
        (b"\x83s\x02ok", Value::from("ok")),
    ];
    for (data, expected) in cases {
        assert_eq!(unpack(data).unwrap(), expected);
    }
}

#[test]
fn depth_limit() {
    assert_eq!(
        pack(&nested(300)).unwrap_err(),
        EncodeError::RecursionLimitExceeded { limit: 256 }
    );

    let deep = nested(255);
    let bytes = pack(&deep).unwrap();
    assert_eq!(unpack(&bytes).unwrap(), deep);

    let config = PackConfig {
        depth_limit: 512,
        ..PackConfig::default()
    };
    let bytes = pack_with(&nested(300), &config).unwrap();
    assert_eq!(
        unpack(&bytes).unwrap_err(),
        DecodeError::RecursionLimitExceeded { limit: 256 }
    );
}

fn compressed(value: &Value) -> Vec<u8> {
    let body = pack(value).unwrap();
    let inner = &body[1..];

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(inner).unwrap();
    let deflated = encoder.finish().unwrap();

    let mut data = vec![131, 80];
    data.extend_from_slice(&(inner.len() as u32).to_be_bytes());
    data.extend_from_slice(&deflated);
    data
}

#[test]
fn compressed_round_trip() {
    let value = sample();
    assert_eq!(unpack(&compressed(&value)).unwrap(), value);

    let long_text = Value::from("all work and no play ".repeat(200));
    assert_eq!(unpack(&compressed(&long_text)).unwrap(), long_text);
}

#[test]
fn corrupt_compressed_payload_fails() {
    let data = compressed(&sample());
    // Zlib header byte, then the first deflate block header.
    for index in [6, 8] {
        let mut corrupt = data.clone();
        corrupt[index] = 0xFF;
        assert!(
            matches!(
                unpack(&corrupt),
                Err(DecodeError::DecompressionFailure { offset: 1, .. })
            ),
            "corrupt byte {index}"
        );
    }
}

#[test]
fn map_order_survives_the_wire() {
    let map: Map = [("b", 1), ("a", 2), ("c", 3)].into_iter().collect();
    let decoded = unpack(&pack(&Value::Map(map)).unwrap()).unwrap();
    let keys: Vec<_> = decoded
        .as_map()
        .unwrap()
        .keys()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(keys, ["b", "a", "c"]);
}

#[test]
fn non_finite_floats_are_rejected() {
    for f in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        assert!(matches!(
            pack(&Value::Float(f)),
            Err(EncodeError::UnsupportedValue { .. })
        ));
    }
}
