use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use msgpack_lens::LensError;
use msgpack_lens_cli::{
    convert, decode_input, CliError, InputEncoding, InputFormat, Options, OutputEncoding,
    OutputFormat,
};
use serde_json::{json, Value};

const FIXMAP: &[u8] = &[0x81, 0xa3, b'k', b'e', b'y', 0xcd, 0x00, 0x01];

fn run(input: &[u8], from: InputFormat, to: OutputFormat) -> Result<Vec<u8>, CliError> {
    let options = Options {
        input: from,
        output: to,
        ..Options::default()
    };
    let mut out = Vec::new();
    convert(input, &options, &mut out)?;
    Ok(out)
}

fn text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap()
}

#[test]
fn msgpack_to_every_output() {
    let printed = text(run(FIXMAP, InputFormat::Msgp, OutputFormat::Print).unwrap());
    assert!(printed.starts_with("at:   0 sz:   1 0x81 (129)   fixmap len:1 {\n"));
    assert!(printed.contains("uint16 1"));

    let repr = text(run(FIXMAP, InputFormat::Msgp, OutputFormat::Repr).unwrap());
    let repr: Value = serde_json::from_str(&repr).unwrap();
    assert_eq!(repr["Values"][0]["Key"], json!({"Prefix": 0xa3, "Size": 1, "Value": "key"}));
    assert_eq!(repr["Values"][0]["Value"]["Prefix"], json!(0xcd));

    let lossy = text(run(FIXMAP, InputFormat::Msgp, OutputFormat::Json).unwrap());
    assert_eq!(lossy, "{\"key\":1}\n");

    assert_eq!(run(FIXMAP, InputFormat::Msgp, OutputFormat::Msgp).unwrap(), FIXMAP);
}

#[test]
fn repr_keeps_widths_that_json_loses() {
    let repr = run(FIXMAP, InputFormat::Msgp, OutputFormat::Repr).unwrap();
    assert_eq!(run(&repr, InputFormat::Repr, OutputFormat::Msgp).unwrap(), FIXMAP);

    let lossy = run(FIXMAP, InputFormat::Msgp, OutputFormat::Json).unwrap();
    assert_eq!(
        run(&lossy, InputFormat::Json, OutputFormat::Msgp).unwrap(),
        [0x81, 0xa3, b'k', b'e', b'y', 0x01]
    );
}

#[test]
fn compact_repr_is_one_line() {
    let options = Options {
        output: OutputFormat::Repr,
        pretty: false,
        ..Options::default()
    };
    let mut out = Vec::new();
    convert(&[0x92, 0x01, 0xc0], &options, &mut out).unwrap();
    let out = text(out);
    assert_eq!(out.lines().count(), 1);
    assert!(out.ends_with("}\n"));
}

#[test]
fn same_format_copies_input() {
    let odd = b"{ \"a\" : 1 }";
    assert_eq!(run(odd, InputFormat::Json, OutputFormat::Json).unwrap(), odd);
    let garbage = b"not even parsed";
    assert_eq!(run(garbage, InputFormat::Repr, OutputFormat::Repr).unwrap(), garbage);
}

#[test]
fn trailing_bytes_need_allow_extra() {
    let input = [0x01, 0x02];
    let err = run(&input, InputFormat::Msgp, OutputFormat::Repr).unwrap_err();
    assert!(
        matches!(err, CliError::Lens(LensError::TrailingData { remaining: 1, .. })),
        "{err}"
    );

    let options = Options {
        output: OutputFormat::Msgp,
        allow_extra: true,
        ..Options::default()
    };
    let mut out = Vec::new();
    convert(&input, &options, &mut out).unwrap();
    assert_eq!(out, [0x01]);

    let options = Options {
        allow_extra: true,
        ..Options::default()
    };
    let mut out = Vec::new();
    convert(&input, &options, &mut out).unwrap();
    assert!(text(out).contains("1 bytes remaining:"));
}

#[test]
fn base64_output_encoding() {
    let options = Options {
        output: OutputFormat::Msgp,
        output_encoding: Some(OutputEncoding::B64),
        ..Options::default()
    };
    let mut out = Vec::new();
    convert(FIXMAP, &options, &mut out).unwrap();
    assert_eq!(BASE64_STANDARD.decode(&out).unwrap(), FIXMAP);
}

#[test]
fn input_encodings_agree() {
    let encoded: &[(Option<InputEncoding>, Vec<u8>)] = &[
        (None, FIXMAP.to_vec()),
        (Some(InputEncoding::Hex), b"81 a3 6b 65 79 cd 00 01\n".to_vec()),
        (Some(InputEncoding::Hex), b"0x81,0xa3,0x6b,0x65,0x79,0xcd,0x0,0x1".to_vec()),
        (Some(InputEncoding::Hex), b"81a36b6579cd0001".to_vec()),
        (
            Some(InputEncoding::Nums),
            b"[129, 163, 107, 101, 121, 205, 0, 1]".to_vec(),
        ),
        (Some(InputEncoding::Py3b), b"b'\\x81\\xa3key\\xcd\\x00\\x01'\n".to_vec()),
        (
            Some(InputEncoding::B64),
            BASE64_STANDARD.encode(FIXMAP).into_bytes(),
        ),
    ];
    for (encoding, raw) in encoded {
        let decoded = decode_input(raw, *encoding).unwrap();
        assert_eq!(decoded, FIXMAP, "{encoding:?}");
    }
}

#[test]
fn bad_input_is_reported() {
    assert!(matches!(
        run(&[0xc1], InputFormat::Msgp, OutputFormat::Json),
        Err(CliError::Lens(_))
    ));
    assert!(matches!(
        run(&[0xff, 0xfe], InputFormat::Json, OutputFormat::Msgp),
        Err(CliError::Utf8(_))
    ));
    assert!(matches!(
        decode_input(b"!!", Some(InputEncoding::B64)),
        Err(CliError::Base64(_))
    ));
    assert!(matches!(
        run(b"{\"Prefix\": 193}", InputFormat::Repr, OutputFormat::Msgp),
        Err(CliError::Lens(_))
    ));
}

#[test]
fn deep_documents_convert_through_every_text_format() {
    let mut nested = vec![0x91; 199];
    nested.push(0x90);
    for via in [InputFormat::Repr, InputFormat::Json] {
        let to = match via {
            InputFormat::Repr => OutputFormat::Repr,
            _ => OutputFormat::Json,
        };
        let options = Options {
            output: to,
            pretty: false,
            ..Options::default()
        };
        let mut text = Vec::new();
        convert(&nested, &options, &mut text).unwrap();
        assert_eq!(run(&text, via, OutputFormat::Msgp).unwrap(), nested, "{via:?}");

        let shallow = Options {
            input: via,
            output: OutputFormat::Msgp,
            max_depth: 100,
            ..Options::default()
        };
        let err = convert(&text, &shallow, &mut Vec::new()).unwrap_err();
        assert!(
            matches!(err, CliError::Lens(LensError::DepthLimit { limit: 100, .. })),
            "{via:?}: {err}"
        );
    }
}
