use core::fmt;

use crate::space::Offset;

/// Read handler: `(offset, mem_mask) -> data`.
///
/// `offset` is the byte offset of the access from the start of the installed range.
pub type ReadHandler<T> = Box<dyn FnMut(Offset, T) -> T>;

/// Write handler: `(offset, data, mem_mask)`.
pub type WriteHandler<T> = Box<dyn FnMut(Offset, T, T)>;

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
}

/// A handler data type: `u8` (D8), `u16` (D16) or `u32` (D32).
pub trait BusData:
    sealed::Sealed
    + Copy
    + Eq
    + fmt::Debug
    + fmt::LowerHex
    + core::ops::BitAnd<Output = Self>
    + core::ops::Not<Output = Self>
    + core::ops::BitOr<Output = Self>
    + 'static
{
    /// Number of data lines the type spans.
    const BITS: u8;
    /// Number of bytes the type spans.
    const BYTES: usize;
    const ZERO: Self;
    const ALL: Self;

    /// Truncates a 32-bit value to this width.
    fn from_u32(value: u32) -> Self;
    fn to_u32(self) -> u32;

    #[doc(hidden)]
    fn into_handlers(read: ReadHandler<Self>, write: WriteHandler<Self>) -> HandlerPair;
    #[doc(hidden)]
    fn handlers(pair: &mut HandlerPair) -> Option<(&mut ReadHandler<Self>, &mut WriteHandler<Self>)>;
}

#[doc(hidden)]
pub enum HandlerPair {
    D8(ReadHandler<u8>, WriteHandler<u8>),
    D16(ReadHandler<u16>, WriteHandler<u16>),
    D32(ReadHandler<u32>, WriteHandler<u32>),
}

macro_rules! impl_bus_data {
    ($ty:ty, $variant:ident) => {
        impl BusData for $ty {
            const BITS: u8 = <$ty>::BITS as u8;
            const BYTES: usize = core::mem::size_of::<$ty>();
            const ZERO: Self = 0;
            const ALL: Self = <$ty>::MAX;

            #[inline]
            fn from_u32(value: u32) -> Self {
                value as $ty
            }

            #[inline]
            fn to_u32(self) -> u32 {
                u32::from(self)
            }

            fn into_handlers(read: ReadHandler<Self>, write: WriteHandler<Self>) -> HandlerPair {
                HandlerPair::$variant(read, write)
            }

            fn handlers(
                pair: &mut HandlerPair,
            ) -> Option<(&mut ReadHandler<Self>, &mut WriteHandler<Self>)> {
                match pair {
                    HandlerPair::$variant(read, write) => Some((read, write)),
                    _ => None,
                }
            }
        }
    };
}

impl_bus_data!(u8, D8);
impl_bus_data!(u16, D16);
impl_bus_data!(u32, D32);
