use msgpack_lens::constants::*;
use msgpack_lens::node::{ArrayNode, IntNode, MapNode, UintNode};
use msgpack_lens::repr_json::{from_repr, from_repr_str, from_repr_str_with, to_repr, to_repr_string};
use msgpack_lens::{decode, decode_with, LensError, Node, WalkOptions, WireType, DEFAULT_MAX_DEPTH};
use serde_json::json;

fn round_trip(bytes: &[u8]) -> Node {
    let node = decode(bytes).unwrap_or_else(|e| panic!("{bytes:02x?}: {e}"));
    assert_eq!(node.to_bytes().unwrap(), bytes, "binary round trip");
    assert_eq!(node.total_size(), bytes.len());

    let text = to_repr_string(&node, false).unwrap();
    let back = from_repr_str(&text, false).unwrap();
    assert_eq!(back, node, "typed json round trip: {text}");
    assert_eq!(back.to_bytes().unwrap(), bytes);
    node
}

#[test]
fn scenario_positive_fixint() {
    let node = round_trip(&[0x01]);
    assert_eq!(node, Node::int(1));
    assert_eq!(node.wire_type(), WireType::Int);
}

#[test]
fn scenario_fixmap_with_string_key() {
    let node = round_trip(&[0x81, 0xa3, b'k', b'e', b'y', 0x01]);
    let entries = node.as_map().unwrap();
    assert_eq!(entries[0].0.as_str(), Some("key"));
    assert_eq!(entries[0].1, Node::int(1));
}

#[test]
fn scenario_truncated_float64() {
    let err = decode(&[0xcb, 0x00, 0x00]).unwrap_err();
    assert!(matches!(err.root_cause(), LensError::ShortRead { .. }));
}

#[test]
fn scenario_concatenated_values() {
    let err = decode(&[0xa1, b'a', 0xa1, b'b']).unwrap_err();
    assert!(matches!(err, LensError::TrailingData { offset: 2, remaining: 2 }));
    let node = decode_with(
        &[0xa1, b'a', 0xa1, b'b'],
        &WalkOptions::default().with_allow_trailing_data(true),
    )
    .unwrap();
    assert_eq!(node.as_str(), Some("a"));
}

#[test]
fn fixstr_boundary_31_32() {
    let s31 = "x".repeat(31);
    let node = Node::str(s31.as_str()).unwrap();
    let bytes = node.to_bytes().unwrap();
    assert_eq!(bytes[0], 0xbf);
    assert_eq!(bytes.len(), 32);
    round_trip(&bytes);

    let s32 = "x".repeat(32);
    let bytes = Node::str(s32.as_str()).unwrap().to_bytes().unwrap();
    assert_eq!(&bytes[..2], &[STR8, 32]);
    round_trip(&bytes);
}

#[test]
fn container_width_boundaries() {
    let arr15 = Node::array((0..15).map(Node::int).collect()).unwrap();
    assert_eq!(arr15.prefix(), 0x9f);
    let arr16 = Node::array((0..16).map(Node::int).collect()).unwrap();
    assert_eq!(&arr16.to_bytes().unwrap()[..3], &[ARRAY16, 0x00, 0x10]);
    round_trip(&arr16.to_bytes().unwrap());

    let map16 = Node::map((0..16).map(|i| (Node::int(i), Node::nil())).collect()).unwrap();
    assert_eq!(&map16.to_bytes().unwrap()[..3], &[MAP16, 0x00, 0x10]);
    round_trip(&map16.to_bytes().unwrap());

    let long = Node::str("y".repeat(300)).unwrap();
    assert_eq!(&long.to_bytes().unwrap()[..3], &[STR16, 0x01, 0x2c]);
    let blob = Node::bin(vec![7u8; 70_000]).unwrap();
    assert_eq!(&blob.to_bytes().unwrap()[..5], &[BIN32, 0x00, 0x01, 0x11, 0x70]);
}

#[test]
fn numeric_width_matrix() {
    let cases: &[&[u8]] = &[
        &[UINT8, 0x01],
        &[UINT16, 0x00, 0x01],
        &[UINT32, 0x00, 0x00, 0x00, 0x01],
        &[UINT64, 0, 0, 0, 0, 0, 0, 0, 0x01],
        &[INT8, 0x01],
        &[INT16, 0x00, 0x01],
        &[INT32, 0x00, 0x00, 0x00, 0x01],
        &[INT64, 0, 0, 0, 0, 0, 0, 0, 0x01],
        &[INT64, 0x80, 0, 0, 0, 0, 0, 0, 0],
        &[UINT64, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
        &[FLOAT32, 0x00, 0x00, 0x00, 0x00],
        &[FLOAT32, 0xff, 0x80, 0x00, 0x00],
        &[FLOAT64, 0x80, 0, 0, 0, 0, 0, 0, 0],
        &[FLOAT64, 0x7f, 0xf8, 0, 0, 0, 0, 0, 0x01],
    ];
    for bytes in cases {
        round_trip(bytes);
    }
}

#[test]
fn typed_json_document_shape() {
    let node = decode(&[0x92, UINT8, 0xc8, 0x91, 0xa1, b'x']).unwrap();
    assert_eq!(
        to_repr(&node),
        json!({
            "Prefix": 0x92,
            "Size": 1,
            "Children": [
                {"Prefix": 0xcc, "Size": 2, "Bits": "AAAAAAAAAMg=", "Approx": 200},
                {"Prefix": 0x91, "Size": 1, "Children": [
                    {"Prefix": 0xa1, "Size": 1, "Value": "x"}
                ]}
            ]
        })
    );

    let node = decode(&[0x81, 0xc0, 0xc3]).unwrap();
    assert_eq!(
        to_repr(&node),
        json!({
            "Prefix": 0x81,
            "Size": 1,
            "Values": [
                {"Key": {"Prefix": 0xc0, "Size": 1}, "Value": {"Prefix": 0xc3, "Size": 1, "Value": true}}
            ]
        })
    );
}

#[test]
fn hand_written_typed_json() {
    let doc = json!({
        "Prefix": 0xde,
        "Values": [
            {"Key": {"Prefix": 0xd9, "Value": "a"}, "Value": {"Prefix": 0xd3, "Approx": -1}},
            {"Key": {"Prefix": 0xa1, "Value": "b"}, "Value": {"Prefix": 0xcb, "Approx": 0.5}}
        ]
    });
    let node = from_repr(&doc).unwrap();
    let mut expected = vec![MAP16, 0x00, 0x02, STR8, 0x01, b'a', INT64];
    expected.extend_from_slice(&[0xff; 8]);
    expected.extend_from_slice(&[0xa1, b'b', FLOAT64, 0x3f, 0xe0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(node.to_bytes().unwrap(), expected);
}

#[test]
fn typed_json_prefix_must_match_length() {
    for doc in [
        json!({"Prefix": 0xa1, "Value": "abc"}),
        json!({"Prefix": 0x92, "Children": [{"Prefix": 1}]}),
        json!({"Prefix": 0x80, "Values": [{"Key": {"Prefix": 1}, "Value": {"Prefix": 2}}]}),
    ] {
        let err = from_repr(&doc).unwrap_err();
        assert!(matches!(err, LensError::Malformed(_)), "{doc}: {err}");
    }
    // the canonical constructors still pick the fixed prefix
    let node = Node::str("abc").unwrap();
    assert_eq!(node.to_bytes().unwrap(), [0xa3, b'a', b'b', b'c']);
}

fn nested_arrays(depth: usize) -> Vec<u8> {
    let mut bytes = vec![0x91; depth - 1];
    bytes.push(0x90);
    bytes
}

#[test]
fn deep_typed_json_round_trips() {
    for depth in [64, 200, 1000, DEFAULT_MAX_DEPTH] {
        let bytes = nested_arrays(depth);
        let node = decode(&bytes).unwrap();
        for pretty in [false, depth <= 200] {
            let text = to_repr_string(&node, pretty).unwrap();
            let back = from_repr_str(&text, false).unwrap_or_else(|e| panic!("{depth}: {e}"));
            assert_eq!(back.to_bytes().unwrap(), bytes, "depth {depth}");
        }
    }
}

#[test]
fn deep_typed_json_maps_round_trip() {
    // {nil: {nil: ... {}}}
    let mut bytes = Vec::new();
    for _ in 0..500 {
        bytes.extend_from_slice(&[0x81, NIL]);
    }
    bytes.push(0x80);
    let node = decode(&bytes).unwrap();
    let text = to_repr_string(&node, false).unwrap();
    assert_eq!(from_repr_str(&text, false).unwrap().to_bytes().unwrap(), bytes);
}

#[test]
fn typed_json_depth_matches_walker() {
    let text = to_repr_string(&decode(&nested_arrays(DEFAULT_MAX_DEPTH)).unwrap(), false).unwrap();
    // one more level, wrapped by hand
    let deeper = format!("{{\"Prefix\": 145, \"Children\": [{text}]}}");
    assert!(matches!(
        from_repr_str(&deeper, false),
        Err(LensError::DepthLimit { limit: DEFAULT_MAX_DEPTH, .. })
    ));
    let err = decode(&nested_arrays(DEFAULT_MAX_DEPTH + 1)).unwrap_err();
    assert!(matches!(err.root_cause(), LensError::DepthLimit { .. }), "{err}");

    let options = WalkOptions::default().with_max_depth(2);
    let two = r#"{"Prefix": 145, "Children": [{"Prefix": 144}]}"#;
    assert!(from_repr_str_with(two, &options).is_ok());
    let three = r#"{"Prefix": 145, "Children": [{"Prefix": 145, "Children": [{"Prefix": 128}]}]}"#;
    assert!(matches!(
        from_repr_str_with(three, &options),
        Err(LensError::DepthLimit { offset: 0, limit: 2 })
    ));
}

#[test]
fn explicit_constructors_keep_width() {
    let node = Node::Array(
        ArrayNode::new(
            ARRAY32,
            vec![
                Node::Int(IntNode::new(INT32, 5).unwrap()),
                Node::Uint(UintNode::new(UINT16, 5).unwrap()),
                Node::Map(MapNode::new(MAP16, vec![]).unwrap()),
            ],
        )
        .unwrap(),
    );
    let bytes = node.to_bytes().unwrap();
    assert_eq!(
        bytes,
        [ARRAY32, 0, 0, 0, 3, INT32, 0, 0, 0, 5, UINT16, 0, 5, MAP16, 0, 0]
    );
    assert_eq!(decode(&bytes).unwrap(), node);
}
