use msgpack_lens::constants::*;
use msgpack_lens::{
    measure, walk, walk_with, LensError, Result, Visitor, WalkContext, WalkOptions,
};

/// Every encoding family at least once, nested a few levels.
fn corpus() -> Vec<Vec<u8>> {
    vec![
        vec![0x00],
        vec![0x7f],
        vec![0xe0],
        vec![NIL],
        vec![TRUE],
        vec![UINT8, 0xff],
        vec![UINT16, 0x12, 0x34],
        vec![UINT32, 0, 0, 0, 1],
        vec![UINT64, 0, 0, 0, 0, 0, 0, 0, 1],
        vec![INT8, 0x80],
        vec![INT16, 0x80, 0x00],
        vec![INT32, 0xff, 0xff, 0xff, 0xfe],
        vec![INT64, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
        vec![FLOAT32, 0x3f, 0x80, 0x00, 0x00],
        vec![FLOAT64, 0x40, 0x09, 0x21, 0xfb, 0x54, 0x44, 0x2d, 0x18],
        vec![0xa0],
        vec![STR8, 0x03, b'a', b'b', b'c'],
        vec![STR16, 0x00, 0x01, b'z'],
        vec![STR32, 0x00, 0x00, 0x00, 0x00],
        vec![BIN8, 0x01, 0x00],
        vec![BIN16, 0x00, 0x02, 0x01, 0x02],
        vec![BIN32, 0x00, 0x00, 0x00, 0x01, 0xff],
        vec![FIXEXT1, 0x01, 0xaa],
        vec![FIXEXT2, 0x01, 0xaa, 0xbb],
        vec![FIXEXT4, 0x01, 1, 2, 3, 4],
        vec![FIXEXT8, 0x01, 1, 2, 3, 4, 5, 6, 7, 8],
        {
            let mut v = vec![FIXEXT16, 0x01];
            v.extend_from_slice(&[0x55; 16]);
            v
        },
        vec![EXT8, 0x02, 0xfe, 0x01, 0x02],
        vec![EXT16, 0x00, 0x01, 0x03, 0x09],
        vec![EXT32, 0x00, 0x00, 0x00, 0x00, 0x04],
        vec![0x90],
        vec![0x80],
        vec![0x93, 0x01, 0xa1, b'x', 0x92, NIL, 0x80],
        vec![ARRAY16, 0x00, 0x02, 0x01, 0x02],
        vec![ARRAY32, 0x00, 0x00, 0x00, 0x01, 0x91, 0x91, 0x90],
        vec![0x82, 0xa1, b'a', 0x81, 0x01, 0x02, 0x90, 0xc2],
        vec![MAP16, 0x00, 0x01, 0xa1, b'k', 0x92, 0x01, 0x81, 0x02, 0x03],
        vec![MAP32, 0x00, 0x00, 0x00, 0x01, NIL, NIL],
    ]
}

#[derive(Default)]
struct Events(Vec<String>);

impl Visitor for Events {
    fn int(&mut self, _ctx: &WalkContext<'_>, _bts: &[u8], value: i64) -> Result<()> {
        self.0.push(format!("Int({value})"));
        Ok(())
    }
    fn enter_array(&mut self, _ctx: &WalkContext<'_>, prefix: u8, count: usize) -> Result<()> {
        self.0.push(format!("EnterArray(0x{prefix:02x},{count})"));
        Ok(())
    }
    fn enter_array_elem(&mut self, _ctx: &WalkContext<'_>, n: usize, count: usize) -> Result<()> {
        self.0.push(format!("EnterArrayElem({n},{count})"));
        Ok(())
    }
    fn leave_array_elem(&mut self, _ctx: &WalkContext<'_>, n: usize, count: usize) -> Result<()> {
        self.0.push(format!("LeaveArrayElem({n},{count})"));
        Ok(())
    }
    fn leave_array(
        &mut self,
        _ctx: &WalkContext<'_>,
        prefix: u8,
        count: usize,
        bts: &[u8],
    ) -> Result<()> {
        self.0.push(format!("LeaveArray(0x{prefix:02x},{count},{bts:02x?})"));
        Ok(())
    }
}

#[test]
fn fixarray_of_two_ints_event_sequence() {
    let mut events = Events::default();
    assert_eq!(walk(&[0x92, 0x01, 0x02], &mut events).unwrap(), 3);
    assert_eq!(
        events.0,
        [
            "EnterArray(0x92,2)",
            "EnterArrayElem(0,2)",
            "Int(1)",
            "LeaveArrayElem(0,2)",
            "EnterArrayElem(1,2)",
            "Int(2)",
            "LeaveArrayElem(1,2)",
            "LeaveArray(0x92,2,[92, 01, 02])",
        ]
    );
}

/// Checks every closing span against an independent measurement.
#[derive(Default)]
struct Spans {
    checked: usize,
}

impl Spans {
    fn check(&mut self, ctx: &WalkContext<'_>, bts: &[u8]) -> Result<()> {
        let start = ctx.cursor() - bts.len();
        assert_eq!(&ctx.bytes()[start..ctx.cursor()], bts);
        let measured = measure(bts)?;
        assert!(measured.total <= bts.len());
        self.checked += 1;
        Ok(())
    }
}

impl Visitor for Spans {
    fn leave_array(
        &mut self,
        ctx: &WalkContext<'_>,
        _prefix: u8,
        _count: usize,
        bts: &[u8],
    ) -> Result<()> {
        self.check(ctx, bts)
    }
    fn leave_map(
        &mut self,
        ctx: &WalkContext<'_>,
        _prefix: u8,
        _count: usize,
        bts: &[u8],
    ) -> Result<()> {
        self.check(ctx, bts)
    }
}

#[test]
fn walk_consumes_every_corpus_value_exactly() {
    for bytes in corpus() {
        let mut spans = Spans::default();
        let consumed = walk(&bytes, &mut spans).unwrap_or_else(|e| panic!("{bytes:02x?}: {e}"));
        assert_eq!(consumed, bytes.len(), "{bytes:02x?}");
        if wire_type_of(&bytes).is_container() {
            assert!(spans.checked >= 1, "{bytes:02x?}");
        } else {
            assert_eq!(spans.checked, 0, "{bytes:02x?}");
        }
    }
}

fn wire_type_of(bytes: &[u8]) -> WireType {
    msgpack_lens::classify(bytes[0]).wire_type
}

/// The top-level container span equals the whole encoded value.
#[test]
fn outermost_span_covers_the_value() {
    struct Outer(Option<usize>);
    impl Visitor for Outer {
        fn leave_array(
            &mut self,
            ctx: &WalkContext<'_>,
            _prefix: u8,
            _count: usize,
            bts: &[u8],
        ) -> Result<()> {
            if ctx.depth() == 0 {
                self.0 = Some(bts.len());
            }
            Ok(())
        }
        fn leave_map(
            &mut self,
            ctx: &WalkContext<'_>,
            _prefix: u8,
            _count: usize,
            bts: &[u8],
        ) -> Result<()> {
            if ctx.depth() == 0 {
                self.0 = Some(bts.len());
            }
            Ok(())
        }
    }

    for bytes in corpus() {
        if !wire_type_of(&bytes).is_container() {
            continue;
        }
        let mut outer = Outer(None);
        walk(&bytes, &mut outer).unwrap();
        assert_eq!(outer.0, Some(bytes.len()), "{bytes:02x?}");
    }
}

#[derive(Default)]
struct MapSlots(Vec<&'static str>);

impl Visitor for MapSlots {
    fn enter_map_key(&mut self, _ctx: &WalkContext<'_>, _n: usize, _count: usize) -> Result<()> {
        self.0.push("ek");
        Ok(())
    }
    fn leave_map_key(&mut self, _ctx: &WalkContext<'_>, _n: usize, _count: usize) -> Result<()> {
        self.0.push("lk");
        Ok(())
    }
    fn enter_map_elem(&mut self, _ctx: &WalkContext<'_>, _n: usize, _count: usize) -> Result<()> {
        self.0.push("ev");
        Ok(())
    }
    fn leave_map_elem(&mut self, _ctx: &WalkContext<'_>, _n: usize, _count: usize) -> Result<()> {
        self.0.push("lv");
        Ok(())
    }
}

#[test]
fn map_key_value_parity() {
    for pairs in [0usize, 1, 3, 15, 16, 300] {
        let mut bytes = if pairs <= 15 {
            vec![FIXMAP | pairs as u8]
        } else {
            let mut b = vec![MAP16];
            b.extend_from_slice(&(pairs as u16).to_be_bytes());
            b
        };
        for i in 0..pairs {
            bytes.push((i % 100) as u8);
            bytes.push(NIL);
        }

        let mut slots = MapSlots::default();
        walk(&bytes, &mut slots).unwrap();
        assert_eq!(slots.0.len(), pairs * 4);
        for chunk in slots.0.chunks(4) {
            assert_eq!(chunk, ["ek", "lk", "ev", "lv"]);
        }
    }
}

fn assert_walk_error(bytes: &[u8], expected: fn(&LensError) -> bool) {
    let err = walk(bytes, &mut Events::default()).unwrap_err();
    assert!(matches!(err, LensError::Walk { .. }), "{bytes:02x?}: {err}");
    assert!(expected(err.root_cause()), "{bytes:02x?}: {err}");
    assert!(err.to_string().starts_with("walk failed at position"));
}

#[test]
fn error_matrix() {
    assert_walk_error(&[], |e| matches!(e, LensError::ShortRead { .. }));
    assert_walk_error(&[FLOAT64, 0x00, 0x00], |e| {
        matches!(e, LensError::ShortRead { needed: 9, .. })
    });
    assert_walk_error(&[NEVER_USED], |e| {
        matches!(e, LensError::InvalidPrefix { prefix: 0xc1, .. })
    });
    assert_walk_error(&[0x92, 0x01], |e| {
        matches!(e, LensError::ShortRead { offset: 2, .. })
    });
    assert_walk_error(&[STR8], |e| matches!(e, LensError::ShortRead { needed: 2, .. }));
    assert_walk_error(&[BIN8, 0x05, 0x00], |e| {
        matches!(e, LensError::ShortRead { needed: 7, .. })
    });
    assert_walk_error(&[0x81, 0xa1, b'k'], |e| {
        matches!(e, LensError::ShortRead { offset: 3, .. })
    });
    assert_walk_error(&[0xa1, 0xff], |e| matches!(e, LensError::InvalidUtf8 { .. }));
}

#[test]
fn concatenated_values() {
    let bytes = [0x01, 0x92, 0x01, 0x02];
    let err = walk(&bytes, &mut Events::default()).unwrap_err();
    assert!(matches!(err, LensError::TrailingData { offset: 1, remaining: 3 }));

    let options = WalkOptions::default().with_allow_trailing_data(true);
    let mut events = Events::default();
    assert_eq!(walk_with(&bytes, &mut events, &options).unwrap(), 1);
    assert_eq!(events.0, ["Int(1)"]);
}

#[test]
fn deep_nesting_is_bounded_not_overflowing() {
    let mut bytes = vec![0x91; 100_000];
    bytes.push(NIL);
    let err = walk(&bytes, &mut Events::default()).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        LensError::DepthLimit { limit: msgpack_lens::DEFAULT_MAX_DEPTH, .. }
    ));

    let options = WalkOptions::default().with_max_depth(usize::MAX);
    assert_eq!(walk_with(&bytes, &mut MapSlots::default(), &options).unwrap(), bytes.len());
}
