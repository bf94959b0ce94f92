use std::fmt;

use itertools::Itertools;

use crate::{layout::Layout, num::DataType};

/// Maximum number of dimensions a shape may have.
pub const MAX_DIMS: usize = 8;

/// Returns the product of `dims`, or `0` if `dims` is empty, contains a non-positive entry, or
/// the product does not fit in a `usize`.
pub fn total_elements(dims: &[i32]) -> usize {
    if dims.is_empty() {
        return 0;
    }
    dims.iter()
        .try_fold(1usize, |total, &dim| match usize::try_from(dim) {
            Ok(dim) if dim > 0 => total.checked_mul(dim),
            _ => None,
        })
        .unwrap_or(0)
}

/// Checks that the shape has `1..=MAX_DIMS` dimensions, all of them positive.
#[inline]
pub fn validate_shape(dims: &[i32]) -> bool {
    (1..=MAX_DIMS).contains(&dims.len()) && dims.iter().all(|&dim| dim > 0)
}

/// Number of bytes taken by `total_elements` elements of `element_size` bytes each.
#[inline]
pub fn byte_size(total_elements: usize, element_size: usize) -> Option<usize> {
    total_elements.checked_mul(element_size)
}

/// Shape metadata of a tensor buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TensorShape {
    pub dims: Vec<i32>,
    pub data_type: DataType,
    /// Product of `dims`, or `0` if unset or invalid.
    pub total_elements: usize,
    pub layout: Layout,
}

impl Default for TensorShape {
    fn default() -> Self {
        Self {
            dims: vec![],
            data_type: DataType::F32,
            total_elements: 0,
            layout: Layout::Unknown,
        }
    }
}

impl TensorShape {
    /// Creates a shape, deriving the element count from `dims`.
    pub fn new(dims: impl Into<Vec<i32>>, data_type: DataType, layout: Layout) -> Self {
        let dims = dims.into();
        let total_elements = total_elements(&dims);
        Self {
            dims,
            data_type,
            total_elements,
            layout,
        }
    }

    #[inline]
    pub fn num_dims(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        validate_shape(&self.dims) && self.total_elements == total_elements(&self.dims)
    }

    /// Size of the described buffer in bytes, or `None` on overflow.
    #[inline]
    pub fn data_size(&self) -> Option<usize> {
        byte_size(self.total_elements, self.data_type.size())
    }

    /// Returns a printable summary of the shape.
    #[inline]
    pub fn info(&self) -> TensorInfo<'_> {
        TensorInfo(self)
    }

    /// Prints the summary returned by [`TensorShape::info`] to stdout.
    pub fn print_info(&self) {
        println!("{}", self.info());
    }
}

/// Human-readable summary of a [`TensorShape`].
#[derive(Debug, Clone, Copy)]
pub struct TensorInfo<'a>(&'a TensorShape);

impl fmt::Display for TensorInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = self.0;
        if shape.dims.is_empty() {
            return write!(f, "Invalid tensor shape: null dimensions array");
        }
        let element_size = shape.data_type.size();
        writeln!(f, "Tensor Info:")?;
        writeln!(f, "  Data Type: {}", shape.data_type.code())?;
        writeln!(f, "  Layout: {}", shape.layout.code())?;
        writeln!(
            f,
            "  Dimensions: {} [{}]",
            shape.num_dims(),
            shape.dims.iter().format(", ")
        )?;
        writeln!(f, "  Total Elements: {}", shape.total_elements)?;
        writeln!(f, "  Element Size: {element_size} bytes")?;
        match shape.data_size() {
            Some(size) => write!(f, "  Total Size: {size} bytes"),
            None => write!(f, "  Total Size: overflow or invalid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::{MAX_DIMS, TensorShape, byte_size, total_elements, validate_shape};
    use crate::{layout::Layout, num::DataType};

    #[test]
    fn test_total_elements() {
        fastrand::seed(42);

        for len in 1..=MAX_DIMS {
            let dims = (0..len).map(|_| fastrand::i32(1..=16)).collect_vec();
            let product: usize = dims.iter().map(|&x| x as usize).product();
            assert_eq!(total_elements(&dims), product, "dims {dims:?}");
        }

        assert_eq!(total_elements(&[]), 0);
        assert_eq!(total_elements(&[2, 0, 3]), 0);
        assert_eq!(total_elements(&[2, -1, 3]), 0);
        assert_eq!(total_elements(&[i32::MIN]), 0);
        assert_eq!(total_elements(&[1, 1, 1, 1]), 1);
        assert_eq!(total_elements(&[2, 3, 4, 5]), 120);
    }

    #[test]
    fn test_total_elements_overflow() {
        // (2^31 - 1)^3 exceeds 64 bits, and (2^31 - 1)^2 already exceeds 32 bits
        let dims = [i32::MAX; 3];
        assert_eq!(total_elements(&dims), 0);

        let dims = [i32::MAX; MAX_DIMS];
        assert_eq!(total_elements(&dims), 0);
    }

    #[test]
    fn test_validate_shape() {
        assert!(validate_shape(&[1]));
        assert!(validate_shape(&[1, 3, 224, 224]));
        assert!(validate_shape(&[1; MAX_DIMS]));

        assert!(!validate_shape(&[]));
        assert!(!validate_shape(&[1; MAX_DIMS + 1]));
        assert!(!validate_shape(&[1, 0, 2, 2]));
        assert!(!validate_shape(&[1, -3, 2, 2]));
    }

    #[test]
    fn test_byte_size() {
        assert_eq!(byte_size(120, 4), Some(480));
        assert_eq!(byte_size(usize::MAX, 1), Some(usize::MAX));
        assert_eq!(byte_size(usize::MAX / 2 + 1, 2), None);
    }

    #[test]
    fn test_shape_new() {
        let shape = TensorShape::new([2, 3, 4, 5], DataType::I16, Layout::ChannelFirst);
        assert_eq!(shape.num_dims(), 4);
        assert_eq!(shape.total_elements, 120);
        assert_eq!(shape.data_size(), Some(240));
        assert!(shape.is_valid());

        let shape = TensorShape::new([2, 0, 4, 5], DataType::I16, Layout::ChannelFirst);
        assert_eq!(shape.total_elements, 0);
        assert!(!shape.is_valid());

        assert!(!TensorShape::default().is_valid());
    }

    #[test]
    fn test_info() {
        let shape = TensorShape::new([1, 2, 3, 4], DataType::F16, Layout::ChannelLast);
        let info = shape.info().to_string();
        assert_eq!(
            info,
            "Tensor Info:\n\
             \x20 Data Type: 9\n\
             \x20 Layout: 2\n\
             \x20 Dimensions: 4 [1, 2, 3, 4]\n\
             \x20 Total Elements: 24\n\
             \x20 Element Size: 2 bytes\n\
             \x20 Total Size: 48 bytes"
        );

        let shape = TensorShape {
            total_elements: usize::MAX,
            ..TensorShape::new([1], DataType::I64, Layout::Generic)
        };
        let info = shape.info().to_string();
        assert!(info.ends_with("Total Size: overflow or invalid"));

        let info = TensorShape::default().info().to_string();
        assert_eq!(info, "Invalid tensor shape: null dimensions array");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde() -> Result<(), Box<dyn std::error::Error>> {
        let shape = TensorShape::new([1, 3, 224, 224], DataType::U8, Layout::ChannelFirst);
        let json = serde_json::to_string(&shape)?;
        let output: TensorShape = serde_json::from_str(&json)?;
        assert_eq!(output, shape);
        Ok(())
    }
}
