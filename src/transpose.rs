//! Byte-level permutation between the channel-first and channel-last 4-D layouts.
//!
//! Buffers are untyped byte slices paired with an explicit element size, so the same routines
//! move any element type. Every operation validates its dimensions and buffer sizes before
//! writing anything, and checks each computed offset again right before it is used.

use thiserror::Error;

use crate::shape::byte_size;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransposeError {
    #[error("transpose error: dimensions {0:?} must all be positive")]
    Dims([i32; 4]),
    #[error("transpose error: element size must be positive")]
    ElementSize,
    #[error("transpose error: element count of {0:?} overflows")]
    Overflow([i32; 4]),
    #[error("transpose error: {0} buffer holds {1} bytes, expected at least {2}")]
    Buffer(&'static str, usize, usize),
    #[error("transpose error: offset {0} out of bounds for {1} elements")]
    Offset(usize, usize),
}

/// Checks `dims` (given in the source's own order) and the buffers against each other. Returns
/// the dimensions as `usize` along with the element count.
fn preflight(
    dims: [i32; 4],
    element_size: usize,
    src: &[u8],
    dst: &[u8],
) -> Result<([usize; 4], usize), TransposeError> {
    let [a, b, c, d] = dims.map(|x| usize::try_from(x).unwrap_or(0));
    if [a, b, c, d].contains(&0) {
        return Err(TransposeError::Dims(dims));
    }
    if element_size == 0 {
        return Err(TransposeError::ElementSize);
    }

    // each stage is checked before it is multiplied in
    let total = c
        .checked_mul(d)
        .and_then(|cd| b.checked_mul(cd))
        .and_then(|bcd| a.checked_mul(bcd))
        .filter(|&total| total > 0)
        .ok_or(TransposeError::Overflow(dims))?;
    let bytes = byte_size(total, element_size).ok_or(TransposeError::Overflow(dims))?;

    if src.len() < bytes {
        return Err(TransposeError::Buffer("source", src.len(), bytes));
    }
    if dst.len() < bytes {
        return Err(TransposeError::Buffer("destination", dst.len(), bytes));
    }
    Ok(([a, b, c, d], total))
}

/// Validated dimensions of one transposition, in destination order.
#[derive(Debug, Clone, Copy)]
struct Plan {
    shape: [usize; 4],
    total: usize,
    element_size: usize,
}

impl Plan {
    /// Elements per destination row, a row spanning the two innermost destination axes.
    #[inline]
    fn row_len(&self) -> usize {
        self.shape[2] * self.shape[3]
    }

    /// Fills `dst` one row at a time, so a single batch still splits across its outer axis
    /// (`H` toward channel-last, `C` toward channel-first). `offsets` maps a destination
    /// multi-index to the flat element offsets `(src, dst)`.
    fn run<F>(&self, src: &[u8], dst: &mut [u8], offsets: F) -> Result<(), TransposeError>
    where
        F: Fn([usize; 4]) -> (usize, usize) + Sync,
    {
        let bytes = self.total * self.element_size;
        let chunk = self.row_len() * self.element_size;
        let dst = &mut dst[..bytes];

        #[cfg(not(feature = "rayon"))]
        let output = dst
            .chunks_exact_mut(chunk)
            .enumerate()
            .try_for_each(|(row, dst)| self.row(src, dst, row, &offsets));
        #[cfg(feature = "rayon")]
        let output = {
            use rayon::prelude::*;

            dst.par_chunks_exact_mut(chunk)
                .enumerate()
                .try_for_each(|(row, dst)| self.row(src, dst, row, &offsets))
        };
        output
    }

    fn row<F>(
        &self,
        src: &[u8],
        dst: &mut [u8],
        row: usize,
        offsets: &F,
    ) -> Result<(), TransposeError>
    where
        F: Fn([usize; 4]) -> (usize, usize),
    {
        let [_, x, y, z] = self.shape;
        let (n, i) = (row / x, row % x);
        let total = self.total;
        let size = self.element_size;
        let len = self.row_len();
        let base = row * len;

        for (j, k) in itertools::iproduct!(0..y, 0..z) {
            let (s, d) = offsets([n, i, j, k]);
            if s >= total {
                return Err(TransposeError::Offset(s, total));
            }
            if d >= total {
                return Err(TransposeError::Offset(d, total));
            }
            let d = d
                .checked_sub(base)
                .filter(|&d| d < len)
                .ok_or(TransposeError::Offset(d, total))?;
            dst[d * size..(d + 1) * size].copy_from_slice(&src[s * size..(s + 1) * size]);
        }
        Ok(())
    }
}

/// Transposes a `[N, C, H, W]` buffer into `[N, H, W, C]` order.
///
/// `src` and `dst` must each hold at least `N * C * H * W * element_size` bytes. On error the
/// contents of `dst` are unspecified.
#[cfg_attr(feature = "trace", tracing::instrument(skip(src, dst)))]
pub fn to_channel_last(
    src: &[u8],
    dst: &mut [u8],
    dims: [i32; 4],
    element_size: usize,
) -> Result<(), TransposeError> {
    let ([n, c, h, w], total) = preflight(dims, element_size, src, dst)?;
    let plan = Plan {
        shape: [n, h, w, c],
        total,
        element_size,
    };
    plan.run(src, dst, |[n_, h_, w_, c_]| {
        let src = ((n_ * c + c_) * h + h_) * w + w_;
        let dst = ((n_ * h + h_) * w + w_) * c + c_;
        (src, dst)
    })
}

/// Transposes a `[N, H, W, C]` buffer into `[N, C, H, W]` order.
///
/// `src` and `dst` must each hold at least `N * H * W * C * element_size` bytes. On error the
/// contents of `dst` are unspecified.
#[cfg_attr(feature = "trace", tracing::instrument(skip(src, dst)))]
pub fn to_channel_first(
    src: &[u8],
    dst: &mut [u8],
    dims: [i32; 4],
    element_size: usize,
) -> Result<(), TransposeError> {
    let ([n, h, w, c], total) = preflight(dims, element_size, src, dst)?;
    let plan = Plan {
        shape: [n, c, h, w],
        total,
        element_size,
    };
    plan.run(src, dst, |[n_, c_, h_, w_]| {
        let src = ((n_ * h + h_) * w + w_) * c + c_;
        let dst = ((n_ * c + c_) * h + h_) * w + w_;
        (src, dst)
    })
}

/// Copies `total_elements` elements of `element_size` bytes from `src` to `dst` verbatim.
///
/// Returns `false` without copying if either count is zero, the byte count overflows, or a
/// buffer is too short.
pub fn copy_tensor_data(
    src: &[u8],
    dst: &mut [u8],
    element_size: usize,
    total_elements: usize,
) -> bool {
    if element_size == 0 || total_elements == 0 {
        return false;
    }
    let Some(bytes) = byte_size(total_elements, element_size) else {
        return false;
    };
    if src.len() < bytes || dst.len() < bytes {
        return false;
    }
    dst[..bytes].copy_from_slice(&src[..bytes]);
    true
}
