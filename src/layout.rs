use derive_more::Display;

/// Axis order of a tensor buffer, declared by the caller alongside its shape.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum Layout {
    #[default]
    Unknown = 0,
    /// `[N, C, H, W]`, the ONNX convention.
    #[display("NCHW")]
    ChannelFirst = 1,
    /// `[N, H, W, C]`, the TFLite convention.
    #[display("NHWC")]
    ChannelLast = 2,
    /// Any other axis order. Buffers are copied, never transposed.
    Generic = 3,
}

impl Layout {
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Layout::Unknown),
            1 => Some(Layout::ChannelFirst),
            2 => Some(Layout::ChannelLast),
            3 => Some(Layout::Generic),
            _ => None,
        }
    }

    #[inline]
    pub const fn code(self) -> i32 {
        self as i32
    }

    #[inline]
    pub const fn is_known(self) -> bool {
        !matches!(self, Layout::Unknown)
    }

    /// Guesses the layout of a shape from its dimension magnitudes.
    ///
    /// This is advisory only: a channel-first guess needs a small second axis and two large
    /// spatial axes, a channel-last guess a small last axis. Anything ambiguous yields
    /// [`Layout::Unknown`]; shapes that are not 4-D yield [`Layout::Generic`].
    pub fn detect(dims: &[i32]) -> Self {
        const SMALL: i32 = 128;
        const LARGE: i32 = 32;

        let large = |x: i32| x >= LARGE && (x % 8 == 0 || x % 16 == 0 || x % 32 == 0);

        match *dims {
            [] => Layout::Unknown,
            [_, c, h, w] if c <= SMALL && large(h) && large(w) => Layout::ChannelFirst,
            [_, h, w, c] if c <= SMALL && h >= LARGE && w >= LARGE => Layout::ChannelLast,
            [_, _, _, _] => Layout::Unknown,
            _ => Layout::Generic,
        }
    }
}

#[inline]
pub fn detect_layout(dims: &[i32]) -> Layout {
    Layout::detect(dims)
}
