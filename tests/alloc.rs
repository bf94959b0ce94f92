use std::{
    alloc::{GlobalAlloc, Layout as AllocLayout, System},
    cell::Cell,
};

use weave::{
    ConversionResult, ErrorKind, Layout,
    convert::{convert_to_channel_first, convert_to_channel_last},
    message::MESSAGE_CAPACITY,
    num::DataType,
};

/// Tracks live heap bytes per thread, so tests running in parallel do not disturb each other.
struct Counting;

thread_local! {
    static LIVE: Cell<isize> = const { Cell::new(0) };
}

fn track(delta: isize) {
    _ = LIVE.try_with(|live| live.set(live.get() + delta));
}

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: AllocLayout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            track(layout.size() as isize);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: AllocLayout) {
        unsafe { System.dealloc(ptr, layout) };
        track(-(layout.size() as isize));
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: AllocLayout, new_size: usize) -> *mut u8 {
        let new = unsafe { System.realloc(ptr, layout, new_size) };
        if !new.is_null() {
            track(new_size as isize - layout.size() as isize);
        }
        new
    }
}

#[global_allocator]
static GLOBAL: Counting = Counting;

fn live() -> isize {
    LIVE.with(Cell::get)
}

/// Runs `f`, returning its output and the heap bytes it left allocated.
fn measure<T>(f: impl FnOnce() -> T) -> (T, isize) {
    let before = live();
    let output = f();
    (output, live() - before)
}

fn kind(result: &ConversionResult) -> Option<ErrorKind> {
    result.error().map(|err| err.kind())
}

#[test]
fn test_unsupported_layout_leaks_nothing() {
    let src = vec![0u8; 2 * 3 * 4 * 5 * 4];
    let dims = [2, 3, 4, 5];

    let (result, held) = measure(|| {
        convert_to_channel_first(
            &src,
            &dims,
            DataType::F32.code(),
            Layout::Generic,
            Layout::ChannelFirst,
        )
    });
    assert_eq!(kind(&result), Some(ErrorKind::LayoutConversionFailed));
    assert!(result.data().is_empty());
    // only the diagnostic is still on the heap
    assert!(held <= MESSAGE_CAPACITY as isize, "{held} bytes held");

    let ((), freed) = measure(|| drop(result));
    assert_eq!(held + freed, 0);
}

#[test]
fn test_failures_leak_nothing() {
    let src = vec![0u8; 31];
    let f32 = DataType::F32.code();
    let to = Layout::ChannelLast;
    let cases = [
        // short source on the transpose path, then on the copy path
        (vec![1, 2, 2, 2], f32, Layout::ChannelFirst),
        (vec![1, 2, 2, 2], f32, Layout::Unknown),
        (vec![1, 0, 2, 2], f32, Layout::Unknown),
        (vec![1, 2, 2, 2], 5, Layout::Unknown),
    ];
    for (dims, r#type, from) in cases {
        let (result, held) = measure(|| convert_to_channel_last(&src, &dims, r#type, from, to));
        assert!(!result.is_success());
        assert!(held <= MESSAGE_CAPACITY as isize, "{held} bytes held");

        let ((), freed) = measure(|| drop(result));
        assert_eq!(held + freed, 0);
    }
}

#[test]
fn test_release_frees_everything() {
    let src = vec![7u8; 2 * 3 * 4 * 5 * 8];
    let dims = [2, 3, 4, 5];

    let (mut result, held) = measure(|| {
        convert_to_channel_last(
            &src,
            &dims,
            DataType::I64.code(),
            Layout::ChannelFirst,
            Layout::ChannelLast,
        )
    });
    assert!(result.is_success());
    assert!(held >= src.len() as isize);

    // the buffer and the dimensions go, the diagnostic keeps its storage
    let ((), freed) = measure(|| result.release());
    assert_eq!(freed, -((src.len() + size_of_val(&dims)) as isize));

    // a second release has nothing left to free
    let ((), freed) = measure(|| result.release());
    assert_eq!(freed, 0);
    assert!(result.data().is_empty());
    assert!(result.shape().dims.is_empty());
}
