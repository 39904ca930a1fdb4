//! Frame ordering for the animation descriptor

/// Ordered list of packed frame indices.
///
/// Indices are handed out by [`FrameSequence::next_index`] so they are always
/// contiguous from zero in packing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSequence {
    indices: Vec<u32>,
    /// Append a trailing `0` so playback loops back to the first frame
    wraparound: bool,
}

impl FrameSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sequence whose rendered order ends with a trailing `0`
    pub fn with_wraparound() -> Self {
        Self {
            indices: Vec::new(),
            wraparound: true,
        }
    }

    /// Creates a sequence `0..count`
    pub fn contiguous(count: u32) -> Self {
        Self {
            indices: (0..count).collect(),
            wraparound: false,
        }
    }

    /// Reserves and returns the next frame index
    pub fn next_index(&mut self) -> u32 {
        let index = self.indices.len() as u32;
        self.indices.push(index);
        index
    }

    /// Number of frames in the sequence, wraparound excluded
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn has_wraparound(&self) -> bool {
        self.wraparound
    }

    /// Playback order as written to the descriptor
    pub fn order(&self) -> Vec<u32> {
        let mut order = self.indices.clone();
        if self.wraparound && !order.is_empty() {
            order.push(0);
        }
        order
    }

    /// Space-delimited playback order, e.g. `"0 1 2"`
    pub fn to_order_string(&self) -> String {
        self.order()
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_string() {
        let mut sequence = FrameSequence::new();
        for expected in 0..5 {
            assert_eq!(sequence.next_index(), expected);
        }
        assert_eq!(sequence.to_order_string(), "0 1 2 3 4");
        assert_eq!(sequence, FrameSequence::contiguous(5));
    }

    #[test]
    fn test_wraparound() {
        let mut sequence = FrameSequence::with_wraparound();
        assert_eq!(sequence.to_order_string(), "");
        sequence.next_index();
        sequence.next_index();
        sequence.next_index();
        assert_eq!(sequence.len(), 3);
        assert_eq!(sequence.order().len(), 4);
        assert_eq!(sequence.to_order_string(), "0 1 2 0");
    }
}
