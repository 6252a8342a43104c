//! Host view of the guest's linear memory.
//!
//! The guest owns a flat, byte-addressable region. The host never does
//! pointer arithmetic on it: every access goes through a typed view that is
//! checked against the region's length and the element alignment before any
//! byte is touched. Elements are copied in the host's native byte order,
//! which matches the little-endian layout of wasm32 linear memory on the
//! hosts we run on.

use std::marker::PhantomData;
use std::mem;

use bytemuck::Pod;
use thiserror::Error;

/// Size of one linear memory page.
pub const PAGE_SIZE: usize = 64 * 1024;

// ── Errors ────────────────────────────────────────────────────────────

/// A host/guest contract break: an offset or length that does not describe a
/// valid region of guest memory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("extent of {count} elements at offset {offset} overflows the address space")]
    Overflow { offset: u32, count: u32 },

    #[error("bytes {start}..{end} lie outside linear memory of {memory_len} bytes")]
    OutOfBounds {
        start: usize,
        end: usize,
        memory_len: usize,
    },

    #[error("offset {offset} is not aligned to {align} bytes")]
    Misaligned { offset: u32, align: usize },

    #[error("view holds {expected} elements but {actual} were supplied")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("allocations at offsets {first} and {second} overlap")]
    Overlap { first: u32, second: u32 },
}

// ── Linear memory ─────────────────────────────────────────────────────

/// An owned, growable byte region standing in for guest linear memory.
#[derive(Debug, Clone)]
pub struct LinearMemory {
    bytes: Vec<u8>,
}

impl LinearMemory {
    pub fn with_pages(pages: u32) -> Self {
        Self {
            bytes: vec![0u8; pages as usize * PAGE_SIZE],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn pages(&self) -> u32 {
        (self.bytes.len() / PAGE_SIZE) as u32
    }

    /// Grow by `pages` zeroed pages and return the previous page count.
    pub fn grow(&mut self, pages: u32) -> u32 {
        let previous = self.pages();
        self.bytes
            .resize(self.bytes.len() + pages as usize * PAGE_SIZE, 0);
        previous
    }

    /// Byte range of `count` elements of `T` at `offset`, checked against
    /// alignment and the current memory length.
    fn extent<T: Pod>(&self, offset: u32, count: u32) -> Result<(usize, usize), ProtocolViolation> {
        let align = mem::align_of::<T>();
        if offset as usize % align != 0 {
            return Err(ProtocolViolation::Misaligned { offset, align });
        }

        let start = offset as usize;
        let end = (count as usize)
            .checked_mul(mem::size_of::<T>())
            .and_then(|len| start.checked_add(len))
            .ok_or(ProtocolViolation::Overflow { offset, count })?;

        if end > self.bytes.len() {
            return Err(ProtocolViolation::OutOfBounds {
                start,
                end,
                memory_len: self.bytes.len(),
            });
        }

        Ok((start, end))
    }

    /// Mutable typed view over `[offset, offset + count * size_of::<T>())`.
    pub fn view_mut<T: Pod>(&mut self, offset: u32, count: u32) -> Result<ViewMut<'_, T>, ProtocolViolation> {
        let (start, end) = self.extent::<T>(offset, count)?;
        Ok(ViewMut {
            bytes: &mut self.bytes[start..end],
            _element: PhantomData,
        })
    }

    /// Read-only typed view over the same extent rules as [`view_mut`](Self::view_mut).
    pub fn view<T: Pod>(&self, offset: u32, count: u32) -> Result<View<'_, T>, ProtocolViolation> {
        let (start, end) = self.extent::<T>(offset, count)?;
        Ok(View {
            bytes: &self.bytes[start..end],
            _element: PhantomData,
        })
    }

    /// Write `values` starting at `offset`.
    pub fn write<T: Pod>(&mut self, offset: u32, values: &[T]) -> Result<(), ProtocolViolation> {
        let count = u32::try_from(values.len()).map_err(|_| ProtocolViolation::Overflow {
            offset,
            count: u32::MAX,
        })?;
        self.view_mut::<T>(offset, count)?.copy_from_slice(values)
    }

    /// Copy `count` elements starting at `offset` out of memory.
    pub fn read<T: Pod>(&self, offset: u32, count: u32) -> Result<Vec<T>, ProtocolViolation> {
        Ok(self.view::<T>(offset, count)?.to_vec())
    }
}

// ── Typed views ───────────────────────────────────────────────────────

/// A bounds-checked, writable window of `T` elements.
#[derive(Debug)]
pub struct ViewMut<'a, T> {
    bytes: &'a mut [u8],
    _element: PhantomData<T>,
}

impl<T: Pod> ViewMut<'_, T> {
    pub fn len(&self) -> usize {
        self.bytes.len() / mem::size_of::<T>()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Fill the whole view. `values` must match the view length exactly.
    pub fn copy_from_slice(&mut self, values: &[T]) -> Result<(), ProtocolViolation> {
        if values.len() != self.len() {
            return Err(ProtocolViolation::LengthMismatch {
                expected: self.len(),
                actual: values.len(),
            });
        }
        self.bytes.copy_from_slice(bytemuck::cast_slice(values));
        Ok(())
    }
}

/// A bounds-checked, read-only window of `T` elements.
#[derive(Debug)]
pub struct View<'a, T> {
    bytes: &'a [u8],
    _element: PhantomData<T>,
}

impl<T: Pod> View<'_, T> {
    pub fn len(&self) -> usize {
        self.bytes.len() / mem::size_of::<T>()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        let size = mem::size_of::<T>();
        let start = index.checked_mul(size)?;
        let chunk = self.bytes.get(start..start.checked_add(size)?)?;
        Some(bytemuck::pod_read_unaligned(chunk))
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.bytes
            .chunks_exact(mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_and_grow() {
        let mut memory = LinearMemory::with_pages(2);
        assert_eq!(memory.len(), 2 * PAGE_SIZE);
        assert_eq!(memory.grow(3), 2);
        assert_eq!(memory.pages(), 5);
    }

    #[test]
    fn test_write_read_f32() {
        let mut memory = LinearMemory::with_pages(1);
        memory.write::<f32>(16, &[1.5, -2.0, 3.25]).unwrap();
        assert_eq!(memory.read::<f32>(16, 3).unwrap(), vec![1.5, -2.0, 3.25]);
        // Neighbouring bytes untouched.
        assert_eq!(memory.read::<u32>(12, 1).unwrap(), vec![0]);
        assert_eq!(memory.read::<u32>(28, 1).unwrap(), vec![0]);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut memory = LinearMemory::with_pages(1);
        memory.write::<u32>(0, &[0x0403_0201]).unwrap();
        assert_eq!(memory.read::<u8>(0, 4).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_write_exactly_to_end() {
        let mut memory = LinearMemory::with_pages(1);
        let offset = (PAGE_SIZE - 8) as u32;
        memory.write::<u32>(offset, &[7, 9]).unwrap();
        assert_eq!(memory.read::<u32>(offset, 2).unwrap(), vec![7, 9]);
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut memory = LinearMemory::with_pages(1);
        let offset = (PAGE_SIZE - 4) as u32;
        let err = memory.write::<f32>(offset, &[1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            ProtocolViolation::OutOfBounds {
                start: PAGE_SIZE - 4,
                end: PAGE_SIZE + 4,
                memory_len: PAGE_SIZE,
            }
        );
        // Nothing was written.
        assert_eq!(memory.read::<f32>(offset, 1).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_misaligned_rejected() {
        let mut memory = LinearMemory::with_pages(1);
        assert_eq!(
            memory.write::<u32>(6, &[1]),
            Err(ProtocolViolation::Misaligned { offset: 6, align: 4 })
        );
    }

    #[test]
    fn test_overflow_rejected() {
        let memory = LinearMemory::with_pages(1);
        assert!(matches!(
            memory.view::<f64>(8, u32::MAX),
            Err(ProtocolViolation::Overflow { .. }) | Err(ProtocolViolation::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_view_length_mismatch() {
        let mut memory = LinearMemory::with_pages(1);
        let mut view = memory.view_mut::<f32>(0, 4).unwrap();
        assert_eq!(view.len(), 4);
        assert_eq!(
            view.copy_from_slice(&[1.0, 2.0]),
            Err(ProtocolViolation::LengthMismatch {
                expected: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn test_view_get() {
        let mut memory = LinearMemory::with_pages(1);
        memory.write::<u32>(8, &[0, 4, 10]).unwrap();
        let view = memory.view::<u32>(8, 3).unwrap();
        assert_eq!(view.get(2), Some(10));
        assert_eq!(view.get(3), None);
    }
}
