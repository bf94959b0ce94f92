//! `weave` moves tensor buffers between the two 4-D conventions used by model interchange
//! formats: channel-first (`[N, C, H, W]`, as in ONNX) and channel-last (`[N, H, W, C]`, as in
//! TFLite).
//!
//! ## Key Components
//! 1. **Primitives** ([`num`], [`shape`]):
//!    - Element types and their byte widths (`DataType`).
//!    - Overflow-checked element counts and shape validation.
//!
//! 2. **Layouts** ([`layout`]):
//!    - Layout tags (`Layout`) declared by the caller.
//!    - An advisory detector that guesses a layout from dimension magnitudes.
//!
//! 3. **Transpose Engine** ([`transpose`]):
//!    - Byte-level permutation with an explicit element size, so any element type is moved
//!      without being interpreted.
//!    - Parallel over the batch axis with the `rayon` feature.
//!
//! 4. **Orchestrator** ([`convert`]):
//!    - Validates, allocates, then transposes or copies.
//!    - Reports a self-contained `ConversionResult`; nothing panics across the call.
//!
//! ```
//! use weave::{Layout, convert::convert_to_channel_last, num::DataType};
//!
//! let data: Vec<f32> = (0..8).map(|x| x as f32).collect();
//! let result = convert_to_channel_last(
//!     bytemuck::cast_slice(&data),
//!     &[1, 2, 2, 2],
//!     DataType::F32.code(),
//!     Layout::ChannelFirst,
//!     Layout::ChannelLast,
//! );
//! assert!(result.is_success());
//! assert_eq!(result.to_vec::<f32>(), Some(vec![0.0, 4.0, 1.0, 5.0, 2.0, 6.0, 3.0, 7.0]));
//! ```

pub mod convert;
pub mod layout;
pub mod message;
pub mod num;
pub mod shape;
pub mod transpose;

pub use convert::{ConversionError, ConversionResult, Direction, ErrorKind, convert_with_layout};
pub use layout::{Layout, detect_layout};
pub use num::{DataType, element_size};
pub use shape::{MAX_DIMS, TensorShape, total_elements, validate_shape};
