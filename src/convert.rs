//! Conversion of whole tensors between the channel-first and channel-last conventions.
//!
//! Each call validates the shape and element type, allocates a fresh destination buffer, then
//! either transposes or copies the source into it. Failures never leave a partially filled
//! buffer behind: everything allocated during the call is dropped before the result returns.

use std::collections::TryReserveError;

use derive_more::Display;
use thiserror::Error;

use crate::{
    layout::Layout,
    message::Message,
    num::{DataType, Scalar},
    shape::{TensorShape, byte_size, total_elements, validate_shape},
    transpose::{self, TransposeError, copy_tensor_data},
};

/// The interchange format a conversion is heading to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Direction {
    /// Toward the channel-last (TFLite) side.
    #[display("channel-last")]
    ChannelLast,
    /// Toward the channel-first (ONNX) side.
    #[display("channel-first")]
    ChannelFirst,
}

/// Failure classes, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum ErrorKind {
    NullPointer,
    InvalidDimensions,
    UnsupportedType,
    MemoryAllocationFailed,
    LayoutConversionFailed,
    DataCopyFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("Input pointer is null")]
    NullPointer,
    #[error("Invalid dimension parameters")]
    InvalidDimensions,
    #[error("Invalid dimension parameters: size too large")]
    SizeTooLarge,
    #[error("Unsupported data type: {0}")]
    UnsupportedType(i32),
    #[error("Memory allocation failed: {0} bytes")]
    MemoryAllocationFailed(usize),
    #[error("Layout conversion failed: from {} to {}", .0.code(), .1.code())]
    UnsupportedLayout(Layout, Layout),
    #[error("Layout conversion failed")]
    Transpose(#[source] TransposeError),
    #[error("Data copy failed")]
    DataCopyFailed,
}

impl ConversionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::NullPointer => ErrorKind::NullPointer,
            ConversionError::InvalidDimensions | ConversionError::SizeTooLarge => {
                ErrorKind::InvalidDimensions
            }
            ConversionError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            ConversionError::MemoryAllocationFailed(_) => ErrorKind::MemoryAllocationFailed,
            ConversionError::UnsupportedLayout(_, _) | ConversionError::Transpose(_) => {
                ErrorKind::LayoutConversionFailed
            }
            ConversionError::DataCopyFailed => ErrorKind::DataCopyFailed,
        }
    }
}

/// Outcome of a conversion call. Owns the converted buffer and its shape.
///
/// A failed result holds an empty buffer and an empty shape. [`ConversionResult::release`] frees
/// both early; calling it again does nothing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    data: Vec<u8>,
    shape: TensorShape,
    success: bool,
    error: Option<ConversionError>,
    message: Message,
}

impl ConversionResult {
    pub const SUCCESS: &'static str = "Conversion successful";

    fn success(data: Vec<u8>, shape: TensorShape) -> Self {
        Self {
            data,
            shape,
            success: true,
            error: None,
            message: Self::SUCCESS.into(),
        }
    }

    fn failure(error: ConversionError) -> Self {
        let message = Message::new(format_args!("{error}"));
        Self {
            error: Some(error),
            message,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The converted bytes. Empty unless the conversion succeeded and has not been released.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn shape(&self) -> &TensorShape {
        &self.shape
    }

    #[inline]
    pub fn error(&self) -> Option<&ConversionError> {
        self.error.as_ref()
    }

    /// Diagnostic text, at most [`Message::MAX_LEN`] bytes.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Borrows the converted buffer as elements of `T`. Returns `None` if there is no data, `T`
    /// does not match the element type, or the buffer is not aligned for `T`.
    pub fn read_slice<T: Scalar>(&self) -> Option<&[T]> {
        if !self.success || self.shape.data_type != T::DATA_TYPE {
            return None;
        }
        bytemuck::try_cast_slice(&self.data).ok()
    }

    /// Copies the converted buffer out as elements of `T`. Returns `None` if there is no data or
    /// `T` does not match the element type.
    pub fn to_vec<T: Scalar>(&self) -> Option<Vec<T>> {
        if !self.success || self.shape.data_type != T::DATA_TYPE {
            return None;
        }
        Some(bytemuck::pod_collect_to_vec(&self.data))
    }

    /// Frees the buffer and shape and resets the result to the empty state.
    pub fn release(&mut self) {
        self.data = Vec::new();
        self.shape = TensorShape::default();
        self.success = false;
        self.error = None;
        self.message.clear();
    }

    /// Splits the result into its buffer and shape. A released result reports
    /// [`ConversionError::NullPointer`].
    pub fn into_result(self) -> Result<(Vec<u8>, TensorShape), ConversionError> {
        match (self.success, self.error) {
            (true, _) => Ok((self.data, self.shape)),
            (false, Some(error)) => Err(error),
            (false, None) => Err(ConversionError::NullPointer),
        }
    }
}

/// How the source buffer reaches the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transform {
    Copy,
    ToChannelLast([i32; 4]),
    ToChannelFirst([i32; 4]),
}

impl Transform {
    /// Decides whether the declared layouts call for a transpose. Only 4-D shapes moving between
    /// channel-first and channel-last are transposed; other known pairs are rejected, and pairs
    /// involving an unknown layout fall back to a copy.
    fn new(dims: &[i32], from: Layout, to: Layout) -> Result<Self, ConversionError> {
        let Ok(dims) = <[i32; 4]>::try_from(dims) else {
            return Ok(Transform::Copy);
        };
        match (from, to) {
            (from, to) if from == to => Ok(Transform::Copy),
            (Layout::ChannelFirst, Layout::ChannelLast) => Ok(Transform::ToChannelLast(dims)),
            (Layout::ChannelLast, Layout::ChannelFirst) => Ok(Transform::ToChannelFirst(dims)),
            (from, to) if from.is_known() && to.is_known() => {
                Err(ConversionError::UnsupportedLayout(from, to))
            }
            _ => Ok(Transform::Copy),
        }
    }
}

fn try_alloc<T: Clone>(len: usize, value: T) -> Result<Vec<T>, TryReserveError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)?;
    data.resize(len, value);
    Ok(data)
}

fn convert(
    src: &[u8],
    dims: &[i32],
    data_type: i32,
    src_layout: Layout,
    dst_layout: Layout,
) -> Result<(Vec<u8>, TensorShape), ConversionError> {
    if src.is_empty() || dims.is_empty() {
        return Err(ConversionError::NullPointer);
    }
    if !validate_shape(dims) {
        return Err(ConversionError::InvalidDimensions);
    }
    let Some(r#type) = DataType::from_code(data_type) else {
        return Err(ConversionError::UnsupportedType(data_type));
    };
    let element_size = r#type.size();

    let total = total_elements(dims);
    if total == 0 {
        return Err(ConversionError::InvalidDimensions);
    }
    let bytes = byte_size(total, element_size).ok_or(ConversionError::SizeTooLarge)?;

    let Ok(mut data) = try_alloc(bytes, 0u8) else {
        return Err(ConversionError::MemoryAllocationFailed(bytes));
    };
    let Ok(mut shape) = try_alloc(dims.len(), 0i32) else {
        return Err(ConversionError::MemoryAllocationFailed(size_of_val(dims)));
    };
    shape.copy_from_slice(dims);

    match Transform::new(dims, src_layout, dst_layout)? {
        Transform::ToChannelLast(nchw @ [n, c, h, w]) => {
            log::debug!("transposing {nchw:?} from {src_layout} to {dst_layout}");
            shape.copy_from_slice(&[n, h, w, c]);
            transpose::to_channel_last(src, &mut data, nchw, element_size)
                .map_err(ConversionError::Transpose)?;
        }
        Transform::ToChannelFirst(nhwc @ [n, h, w, c]) => {
            log::debug!("transposing {nhwc:?} from {src_layout} to {dst_layout}");
            shape.copy_from_slice(&[n, c, h, w]);
            transpose::to_channel_first(src, &mut data, nhwc, element_size)
                .map_err(ConversionError::Transpose)?;
        }
        Transform::Copy => {
            log::debug!("copying {dims:?} as {src_layout} to {dst_layout}");
            if !copy_tensor_data(src, &mut data, element_size, total) {
                return Err(ConversionError::DataCopyFailed);
            }
        }
    }

    let shape = TensorShape {
        dims: shape,
        data_type: r#type,
        total_elements: total,
        layout: dst_layout,
    };
    Ok((data, shape))
}

/// Converts a tensor buffer, transposing it if `src_layout` and `dst_layout` are the two 4-D
/// conventions, and copying it otherwise.
///
/// `data_type` is a raw type code (see [`DataType`]). The source buffer must hold the whole
/// tensor; it is only read for the duration of the call.
///
/// `direction` only labels log output and trace spans. Whether the buffer is transposed or
/// copied depends on the declared layouts alone.
#[cfg_attr(feature = "trace", tracing::instrument(skip(src)))]
pub fn convert_with_layout(
    direction: Direction,
    src: &[u8],
    dims: &[i32],
    data_type: i32,
    src_layout: Layout,
    dst_layout: Layout,
) -> ConversionResult {
    match convert(src, dims, data_type, src_layout, dst_layout) {
        Ok((data, shape)) => ConversionResult::success(data, shape),
        Err(err) => {
            log::warn!("{direction} conversion of {dims:?} failed: {err}");
            ConversionResult::failure(err)
        }
    }
}

/// Converts a tensor toward the channel-last (TFLite) side.
#[inline]
pub fn convert_to_channel_last(
    src: &[u8],
    dims: &[i32],
    data_type: i32,
    src_layout: Layout,
    dst_layout: Layout,
) -> ConversionResult {
    convert_with_layout(
        Direction::ChannelLast,
        src,
        dims,
        data_type,
        src_layout,
        dst_layout,
    )
}

/// Converts a tensor toward the channel-first (ONNX) side.
#[inline]
pub fn convert_to_channel_first(
    src: &[u8],
    dims: &[i32],
    data_type: i32,
    src_layout: Layout,
    dst_layout: Layout,
) -> ConversionResult {
    convert_with_layout(
        Direction::ChannelFirst,
        src,
        dims,
        data_type,
        src_layout,
        dst_layout,
    )
}
