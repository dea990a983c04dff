//! Stack growth for the JSON paths, which recurse once per nesting level.

/// Grow when less than this much stack is left.
const RED_ZONE: usize = 64 * 1024;
/// Size of each freshly allocated stack segment.
const STACK_CHUNK: usize = 1024 * 1024;
/// Generous per-level allowance for serde_json's recursive (de)serializers
/// and the recursive drop of a `serde_json::Value`.
const FRAME_BUDGET: usize = 8 * 1024;

/// Runs one level of a recursive conversion, moving to a new stack segment
/// when the current one runs low.
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_CHUNK, f)
}

/// Runs `f` with enough stack for `levels` of JSON nesting.
pub(crate) fn with_stack_for<R>(levels: usize, f: impl FnOnce() -> R) -> R {
    let size = levels.saturating_mul(FRAME_BUDGET).saturating_add(STACK_CHUNK);
    stacker::maybe_grow(size, size, f)
}

/// Deepest bracket nesting of JSON `text`, ignoring brackets inside strings.
///
/// Only arrays count towards `bound` unless `count_objects` is set. Returns
/// `Err(offset)` at the first bracket that exceeds it.
pub(crate) fn json_nesting(
    text: &str,
    count_objects: bool,
    bound: usize,
) -> std::result::Result<usize, usize> {
    let mut deepest = 0;
    let mut open = 0usize;
    let mut counted = 0usize;
    let mut kinds = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (i, b) in text.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => {
                let counts = b == b'[' || count_objects;
                if counts {
                    counted += 1;
                    if counted > bound {
                        return Err(i);
                    }
                }
                kinds.push(counts);
                open += 1;
                deepest = deepest.max(open);
            }
            b']' | b'}' => {
                if kinds.pop() == Some(true) {
                    counted -= 1;
                }
                open = open.saturating_sub(1);
            }
            _ => {}
        }
    }
    Ok(deepest)
}
