use std::fmt::{self, Write};

use derive_more::{AsRef, Deref, Display};

/// Capacity of a [`Message`] in bytes, counting one slot reserved for a terminator.
pub const MESSAGE_CAPACITY: usize = 256;

/// A diagnostic string that never grows beyond [`MESSAGE_CAPACITY`]` - 1` bytes.
///
/// Text past the capacity is dropped, cutting at a character boundary.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Deref, AsRef, Display)]
#[deref(forward)]
#[as_ref(forward)]
pub struct Message(String);

impl Message {
    pub const MAX_LEN: usize = MESSAGE_CAPACITY - 1;

    pub fn new(args: fmt::Arguments<'_>) -> Self {
        let mut message = Self::default();
        // `write_str` never fails, it truncates instead
        _ = message.write_fmt(args);
        message
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl Write for Message {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = Self::MAX_LEN - self.0.len();
        if s.len() <= room {
            self.0.push_str(s);
            return Ok(());
        }
        let end = (0..=room)
            .rev()
            .find(|&i| s.is_char_boundary(i))
            .unwrap_or(0);
        self.0.push_str(&s[..end]);
        Ok(())
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Self::new(format_args!("{value}"))
    }
}
