//! Byte-level codec runtime.
//!
//! Primitive operations shared by every generated codec: fixed-width
//! little-endian integer transcoding, bounds-checked slicing, buffer
//! concatenation and the padding arithmetic that governs aligned array
//! elements. All operations are pure functions over in-memory buffers and
//! never truncate or zero-fill silently.

use thiserror::Error;

pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Buffer was shorter than a decode step required.
    #[error("buffer requires {required} bytes but only {available} available")]
    BufferTooSmall { required: usize, available: usize },

    /// Value cannot be represented in the requested width.
    #[error("value {value} does not fit in {width} byte(s)")]
    ValueOutOfRange { value: u64, width: usize },

    /// Unsupported fixed integer width.
    #[error("unsupported integer width {width}")]
    UnsupportedWidth { width: usize },

    /// A runtime length/count does not fit in the address space.
    #[error("{context} of {value} exceeds addressable range")]
    LengthOverflow { context: &'static str, value: u64 },
}

/// Split `len` bytes off the front of `input`, bounds-checked.
pub fn take(input: &[u8], len: usize) -> CodecResult<(&[u8], &[u8])> {
    if input.len() < len {
        return Err(CodecError::BufferTooSmall {
            required: len,
            available: input.len(),
        });
    }
    Ok(input.split_at(len))
}

/// Decode a little-endian unsigned integer of 1, 2, 4 or 8 bytes.
pub fn read_uint(input: &[u8], width: usize) -> CodecResult<u64> {
    if !matches!(width, 1 | 2 | 4 | 8) {
        return Err(CodecError::UnsupportedWidth { width });
    }
    let (bytes, _) = take(input, width)?;
    let mut value = 0u64;
    for (i, byte) in bytes.iter().enumerate() {
        value |= (*byte as u64) << (8 * i);
    }
    Ok(value)
}

/// Encode a little-endian unsigned integer of 1, 2, 4 or 8 bytes.
pub fn write_uint(out: &mut Vec<u8>, value: u64, width: usize) -> CodecResult<()> {
    if !matches!(width, 1 | 2 | 4 | 8) {
        return Err(CodecError::UnsupportedWidth { width });
    }
    if width < 8 && value >= 1u64 << (8 * width) {
        return Err(CodecError::ValueOutOfRange { value, width });
    }
    out.extend_from_slice(&value.to_le_bytes()[..width]);
    Ok(())
}

/// Concatenate byte buffers in order.
pub fn concat<I>(parts: I) -> Vec<u8>
where
    I: IntoIterator<Item = Vec<u8>>,
{
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(&part);
    }
    out
}

/// Number of zero bytes needed to round `size` up to the next multiple of
/// `alignment`. Alignment 0 means no padding.
pub fn padding_size(size: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return 0;
    }
    match size % alignment {
        0 => 0,
        rem => alignment - rem,
    }
}

/// `size` rounded up to the next multiple of `alignment`.
pub fn size_with_padding(size: u64, alignment: u64) -> u64 {
    size + padding_size(size, alignment)
}

/// Total encoded size of a list of element sizes, each padded to `alignment`.
pub fn list_size<I>(element_sizes: I, alignment: u64) -> u64
where
    I: IntoIterator<Item = u64>,
{
    element_sizes
        .into_iter()
        .map(|size| size_with_padding(size, alignment))
        .sum()
}

/// Append `count` zero bytes of inter-element padding.
pub fn write_padding(out: &mut Vec<u8>, count: u64) -> CodecResult<()> {
    let count = usize::try_from(count).map_err(|_| CodecError::LengthOverflow {
        context: "padding size",
        value: count,
    })?;
    out.resize(out.len() + count, 0);
    Ok(())
}
