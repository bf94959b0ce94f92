use bytemuck::Pod;
use derive_more::Display;
use half::f16;

/// Element types a tensor buffer may carry. Discriminants are the raw codes shared by the
/// channel-first and channel-last interchange formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum DataType {
    F32 = 0,
    I32 = 1,
    U8 = 2,
    I64 = 3,
    I16 = 6,
    I8 = 8,
    /// Opaque 2-byte payload. Never computed on.
    F16 = 9,
}

impl DataType {
    pub const ALL: [DataType; 7] = [
        DataType::F32,
        DataType::I32,
        DataType::U8,
        DataType::I64,
        DataType::I16,
        DataType::I8,
        DataType::F16,
    ];

    /// Parses a raw type code. Returns `None` for codes this crate does not know.
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(DataType::F32),
            1 => Some(DataType::I32),
            2 => Some(DataType::U8),
            3 => Some(DataType::I64),
            6 => Some(DataType::I16),
            8 => Some(DataType::I8),
            9 => Some(DataType::F16),
            _ => None,
        }
    }

    #[inline]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Returns the byte width of one element.
    pub const fn size(self) -> usize {
        match self {
            DataType::F32 => size_of::<f32>(),
            DataType::I32 => size_of::<i32>(),
            DataType::U8 => size_of::<u8>(),
            DataType::I64 => size_of::<i64>(),
            DataType::I16 => size_of::<i16>(),
            DataType::I8 => size_of::<i8>(),
            DataType::F16 => size_of::<f16>(),
        }
    }
}

impl TryFrom<i32> for DataType {
    type Error = i32;

    #[inline]
    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(code)
    }
}

/// Byte width of the element type behind a raw code, or `0` if the code is unsupported.
#[inline]
pub const fn element_size(code: i32) -> usize {
    match DataType::from_code(code) {
        Some(r#type) => r#type.size(),
        None => 0,
    }
}

pub trait Scalar: Sized + Pod + Send + Sync + sealed::Sealed {
    const DATA_TYPE: DataType;
}

impl Scalar for f32 {
    const DATA_TYPE: DataType = DataType::F32;
}

impl Scalar for i32 {
    const DATA_TYPE: DataType = DataType::I32;
}

impl Scalar for u8 {
    const DATA_TYPE: DataType = DataType::U8;
}

impl Scalar for i64 {
    const DATA_TYPE: DataType = DataType::I64;
}

impl Scalar for i16 {
    const DATA_TYPE: DataType = DataType::I16;
}

impl Scalar for i8 {
    const DATA_TYPE: DataType = DataType::I8;
}

impl Scalar for f16 {
    const DATA_TYPE: DataType = DataType::F16;
}

mod sealed {
    use half::f16;

    pub trait Sealed {}

    impl Sealed for f32 {}
    impl Sealed for i32 {}
    impl Sealed for u8 {}
    impl Sealed for i64 {}
    impl Sealed for i16 {}
    impl Sealed for i8 {}
    impl Sealed for f16 {}
}
