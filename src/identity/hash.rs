use std::fmt;

/// Width of the identifier space in bits (M = 160, derived from a
/// cryptographic digest).
pub const BITS: u32 = 160;
const BYTES: usize = (BITS / 8) as usize;

/// A point on the circular identifier space.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId([u8; BYTES]);

impl NodeId {
    pub const ZERO: NodeId = NodeId([0u8; BYTES]);

    /// `id(b) = H(b) mod 2^M` with `H` = BLAKE3, truncated to `BYTES` bytes.
    pub fn of(data: &[u8]) -> NodeId {
        let digest = blake3::hash(data);
        let mut out = [0u8; BYTES];
        out.copy_from_slice(&digest.as_bytes()[..BYTES]);
        NodeId(out)
    }

    pub fn from_be_bytes(bytes: [u8; BYTES]) -> NodeId {
        NodeId(bytes)
    }

    pub fn to_be_bytes(&self) -> [u8; BYTES] {
        self.0
    }

    /// `self + 2^i (mod 2^M)`, used to compute finger table targets.
    pub fn add_pow2(&self, i: u32) -> NodeId {
        debug_assert!(i < BITS);
        NodeId(add_mod(&self.0, &pow2(i)))
    }

    pub fn add_one(&self) -> NodeId {
        self.add_pow2(0)
    }

    /// `self - other (mod 2^M)`.
    pub fn wrapping_sub(&self, other: &NodeId) -> NodeId {
        NodeId(sub_mod(&self.0, &other.0))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl std::str::FromStr for NodeId {
    type Err = std::num::ParseIntError;

    /// Parses the lowercase hex form produced by `Display` (used by
    /// `validate_ring` to recover ids from `GetNodeSummary` output).
    fn from_str(s: &str) -> Result<NodeId, Self::Err> {
        let mut out = [0u8; BYTES];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)?;
        }
        Ok(NodeId(out))
    }
}

fn pow2(i: u32) -> [u8; BYTES] {
    let mut bytes = [0u8; BYTES];
    let byte_from_end = (i / 8) as usize;
    bytes[BYTES - 1 - byte_from_end] = 1u8 << (i % 8);
    bytes
}

fn add_mod(a: &[u8; BYTES], b: &[u8; BYTES]) -> [u8; BYTES] {
    let mut out = [0u8; BYTES];
    let mut carry: u16 = 0;
    for idx in (0..BYTES).rev() {
        let sum = a[idx] as u16 + b[idx] as u16 + carry;
        out[idx] = (sum & 0xFF) as u8;
        carry = sum >> 8;
    }
    // a dropped final carry is exactly reduction mod 2^BITS
    out
}

fn sub_mod(a: &[u8; BYTES], b: &[u8; BYTES]) -> [u8; BYTES] {
    // a - b (mod 2^BITS) = a + two's complement of b
    let mut complement = [0u8; BYTES];
    let mut carry: u16 = 1;
    for idx in (0..BYTES).rev() {
        let inverted = (!b[idx]) as u16;
        let sum = inverted + carry;
        complement[idx] = (sum & 0xFF) as u8;
        carry = sum >> 8;
    }
    add_mod(a, &complement)
}

/// `d(a, b) = (b - a) mod 2^M`.
pub fn distance(a: &NodeId, b: &NodeId) -> NodeId {
    b.wrapping_sub(a)
}

/// Ring interval containment test used for every ownership decision in the
/// crate: is `point` inside the interval bounded by `start` and `end`,
/// wrapping correctly around the ring, with each endpoint's inclusion
/// controlled independently.
///
/// `start == end` denotes the whole ring (the singleton-node case, or a
/// node that is its own successor and predecessor).
pub fn is_between(
    point: &NodeId,
    start: &NodeId,
    end: &NodeId,
    start_inclusive: bool,
    end_inclusive: bool,
) -> bool {
    if start == end {
        return true;
    }
    if point == start {
        return start_inclusive;
    }
    if point == end {
        return end_inclusive;
    }
    distance(start, point) < distance(start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_deterministic() {
        assert_eq!(NodeId::of(b"hello"), NodeId::of(b"hello"));
        assert_ne!(NodeId::of(b"hello"), NodeId::of(b"world"));
    }

    #[test]
    fn add_pow2_wraps_around_the_ring() {
        let max = NodeId([0xff; BYTES]);
        let wrapped = max.add_pow2(0);
        assert_eq!(wrapped, NodeId::ZERO);
    }

    #[test]
    fn distance_is_zero_for_equal_points() {
        let a = NodeId::of(b"a");
        assert_eq!(distance(&a, &a), NodeId::ZERO);
    }

    #[test]
    fn interval_wraps_past_the_origin() {
        // start near the top of the ring, end near the bottom: the interval
        // (start, end] wraps through 0 and must still contain 0.
        let start = NodeId([0xff; BYTES]).wrapping_sub(&NodeId::ZERO.add_pow2(1)); // max - 2
        let end = NodeId::ZERO.add_pow2(2); // 4
        assert!(is_between(&NodeId::ZERO, &start, &end, false, false));
        assert!(is_between(&end, &start, &end, false, true));
        assert!(!is_between(&end, &start, &end, false, false));
    }

    #[test]
    fn singleton_interval_contains_everything() {
        let a = NodeId::of(b"solo");
        let other = NodeId::of(b"anything");
        assert!(is_between(&other, &a, &a, false, false));
    }

    #[test]
    fn endpoint_inclusivity_is_respected() {
        let a = NodeId::of(b"a");
        let b = NodeId::of(b"b");
        if a == b {
            return;
        }
        assert_eq!(is_between(&a, &a, &b, true, false), true);
        assert_eq!(is_between(&a, &a, &b, false, false), false);
        assert_eq!(is_between(&b, &a, &b, false, true), true);
        assert_eq!(is_between(&b, &a, &b, false, false), false);
    }
}
