//! Byte-order adaptation between the little-endian file format and the host.
//!
//! Payloads are decoded into host order before conversion and re-encoded to
//! little-endian before they are staged. On little-endian hosts every function
//! here except [`swap_elements`] is a no-op.

/// `true` when the host is big-endian and payloads need swapping.
pub const HOST_NEEDS_SWAP: bool = cfg!(target_endian = "big");

/// Reverse the bytes of every `width`-byte element in `buf`.
///
/// Widths of 0 or 1 leave the buffer untouched. A trailing partial element
/// (when `buf.len()` is not a multiple of `width`) is left as is.
pub fn swap_elements(buf: &mut [u8], width: usize) {
    if width <= 1 {
        return;
    }
    for chunk in buf.chunks_exact_mut(width) {
        chunk.reverse();
    }
}

/// Convert a little-endian payload to host order in place.
pub fn le_to_host(buf: &mut [u8], width: usize) {
    if HOST_NEEDS_SWAP {
        swap_elements(buf, width);
    }
}

/// Convert a host-order payload to little-endian in place.
pub fn host_to_le(buf: &mut [u8], width: usize) {
    if HOST_NEEDS_SWAP {
        swap_elements(buf, width);
    }
}
