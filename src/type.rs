use std::fmt::Debug;

use num_traits::{Float, FromPrimitive, ToPrimitive};

/// A trait for floating point types that can be used as indexed coordinates.
///
/// This trait is sealed and cannot be implemented for external types. All search arithmetic
/// happens on squared distances in this type, so only IEEE floats with a representable infinity
/// are supported.
pub trait IndexableFloat:
    private::Sealed + Float + FromPrimitive + ToPrimitive + Debug + Default + Send + Sync + 'static
{
}

impl IndexableFloat for f32 {}

impl IndexableFloat for f64 {}

// https://rust-lang.github.io/api-guidelines/future-proofing.html#sealed-traits-protect-against-downstream-implementations-c-sealed
mod private {
    pub trait Sealed {}

    impl Sealed for f32 {}
    impl Sealed for f64 {}
}
