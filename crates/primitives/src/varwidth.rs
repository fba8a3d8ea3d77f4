//! Big-endian fixed-width integer codec.
//!
//! The sequencer batch wire format uses 3- and 5-byte integers that do not map to
//! native widths. These helpers write the low `n` bytes of a `u64` and read them back
//! zero-extended.

use std::io::{self, ErrorKind, Read, Write};

/// The largest width, in bytes, supported by the codec.
pub const MAX_WIDTH: usize = 8;

/// Returns the largest value representable with `n` bytes.
pub const fn max_value(n: usize) -> u64 {
    if n >= MAX_WIDTH { u64::MAX } else { (1u64 << (8 * n)) - 1 }
}

/// Writes the low `n` bytes of `value` in big-endian order to `w`.
///
/// # Panics
///
/// Panics if `n` is not in `1..=8` or if `value` does not fit in `n` bytes.
pub fn write_uint<W: Write + ?Sized>(w: &mut W, value: u64, n: usize) -> io::Result<()> {
    assert!((1..=MAX_WIDTH).contains(&n), "invalid varwidth size {n}");
    assert!(value <= max_value(n), "value {value} overflows {n} bytes");

    w.write_all(&value.to_be_bytes()[MAX_WIDTH - n..])
}

/// Reads `n` big-endian bytes from `r` and returns them zero-extended.
///
/// Any end of stream before `n` bytes are read is an [`ErrorKind::UnexpectedEof`] error.
///
/// # Panics
///
/// Panics if `n` is not in `1..=8`.
pub fn read_uint<R: Read + ?Sized>(r: &mut R, n: usize) -> io::Result<u64> {
    read_uint_or_eof(r, n)?.ok_or_else(|| io::Error::from(ErrorKind::UnexpectedEof))
}

/// Reads `n` big-endian bytes from `r`, distinguishing a clean end of stream from a
/// truncated field.
///
/// Returns `Ok(None)` if the stream ended before the first byte of the field, and an
/// [`ErrorKind::UnexpectedEof`] error if it ended part way through it. Short reads from
/// the underlying reader are accumulated until the field is complete.
///
/// # Panics
///
/// Panics if `n` is not in `1..=8`.
pub fn read_uint_or_eof<R: Read + ?Sized>(r: &mut R, n: usize) -> io::Result<Option<u64>> {
    assert!((1..=MAX_WIDTH).contains(&n), "invalid varwidth size {n}");

    let mut buf = [0u8; MAX_WIDTH];
    let field = &mut buf[MAX_WIDTH - n..];

    let mut filled = 0;
    while filled < n {
        match r.read(&mut field[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("short read: got {filled} of {n} bytes"),
                ));
            }
            Ok(read) => filled += read,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    Ok(Some(u64::from_be_bytes(buf)))
}
