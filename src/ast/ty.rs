use std::fmt;

/// Number of bits of the platform index type. Signed integers up to this
/// width participate in the full index rule set.
pub const INDEX_BITS: u8 = 64;

/// The element kind of a [`DataType`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ScalarKind {
    Bool,
    /// A signed integer with the given width in bits.
    Int(u8),
    /// An unsigned integer with the given width in bits.
    UInt(u8),
    /// A floating point number with the given width in bits.
    Float(u8),
}

/// The vector shape of a [`DataType`].
///
/// Scalable lanes represent `vscale * factor` elements, where `vscale` is
/// only known at runtime. Rewrites that would enumerate lanes must refuse to
/// fire on scalable vectors.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Lanes {
    One,
    Fixed(u32),
    Scalable(u32),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    pub scalar: ScalarKind,
    pub lanes: Lanes,
}

impl DataType {
    pub fn new(scalar: ScalarKind, lanes: Lanes) -> Self {
        DataType { scalar, lanes }
    }

    pub fn bool_() -> Self {
        DataType::new(ScalarKind::Bool, Lanes::One)
    }

    pub fn int(bits: u8) -> Self {
        DataType::new(ScalarKind::Int(bits), Lanes::One)
    }

    pub fn uint(bits: u8) -> Self {
        DataType::new(ScalarKind::UInt(bits), Lanes::One)
    }

    pub fn float(bits: u8) -> Self {
        DataType::new(ScalarKind::Float(bits), Lanes::One)
    }

    /// The scalar type of this type's elements.
    pub fn element(&self) -> DataType {
        DataType::new(self.scalar, Lanes::One)
    }

    pub fn with_lanes(&self, lanes: Lanes) -> DataType {
        DataType::new(self.scalar, lanes)
    }

    pub fn is_bool(&self) -> bool {
        self.scalar == ScalarKind::Bool
    }

    pub fn is_int(&self) -> bool {
        matches!(self.scalar, ScalarKind::Int(_) | ScalarKind::UInt(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self.scalar, ScalarKind::Float(_))
    }

    pub fn bits(&self) -> u8 {
        match self.scalar {
            ScalarKind::Bool => 1,
            ScalarKind::Int(b) | ScalarKind::UInt(b) | ScalarKind::Float(b) => b,
        }
    }

    /// A scalar signed integer narrow enough to be used for addressing and
    /// loop bounds. Index types enable the full algebraic rule set.
    pub fn is_index_type(&self) -> bool {
        matches!(self.scalar, ScalarKind::Int(b) if b <= INDEX_BITS) && self.lanes == Lanes::One
    }

    /// Whether this is a vector type, of fixed or scalable length.
    pub fn is_vector(&self) -> bool {
        self.lanes != Lanes::One
    }

    pub fn is_scalable_vector(&self) -> bool {
        matches!(self.lanes, Lanes::Scalable(_))
    }

    /// The inclusive value range of an integer type, if it is one.
    pub fn int_range(&self) -> Option<(i64, i64)> {
        match self.scalar {
            ScalarKind::Bool => Some((0, 1)),
            ScalarKind::Int(64) => Some((i64::MIN, i64::MAX)),
            ScalarKind::Int(b) if b < 64 => Some((-(1i64 << (b - 1)), (1i64 << (b - 1)) - 1)),
            ScalarKind::UInt(b) if b < 64 => Some((0, (1i64 << b) - 1)),
            ScalarKind::UInt(_) => Some((0, i64::MAX)),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scalar {
            ScalarKind::Bool => write!(f, "bool")?,
            ScalarKind::Int(b) => write!(f, "i{}", b)?,
            ScalarKind::UInt(b) => write!(f, "u{}", b)?,
            ScalarKind::Float(b) => write!(f, "f{}", b)?,
        }
        match self.lanes {
            Lanes::One => Ok(()),
            Lanes::Fixed(n) => write!(f, "x{}", n),
            Lanes::Scalable(n) => write!(f, "xvscalex{}", n),
        }
    }
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
