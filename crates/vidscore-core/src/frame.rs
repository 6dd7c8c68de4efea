use std::fmt;

/// Stable identifier of a sampled frame. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out frame ids in increasing order, starting at 0.
#[derive(Debug, Default)]
pub struct FrameIdCounter {
    next: u64,
}

impl FrameIdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> FrameId {
        let id = FrameId(self.next);
        self.next += 1;
        id
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// A cropped still sampled from the media.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: FrameId,
    /// PNG-encoded crop.
    pub image_data: Vec<u8>,
    pub timestamp_ms: u64,
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id)
            .field("timestamp_ms", &self.timestamp_ms)
            .field("image_bytes", &self.image_data.len())
            .finish()
    }
}

/// Frames in capture order, which is also ascending timestamp order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameCollection {
    frames: Vec<Frame>,
}

impl FrameCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    /// Remove the frame with `id`, keeping the others in order. Returns
    /// `None` when no such frame exists.
    pub fn remove(&mut self, id: FrameId) -> Option<Frame> {
        let index = self.frames.iter().position(|f| f.id == id)?;
        Some(self.frames.remove(index))
    }

    /// Encoded images in collection order.
    pub fn images(&self) -> Vec<Vec<u8>> {
        self.frames.iter().map(|f| f.image_data.clone()).collect()
    }
}

impl From<Vec<Frame>> for FrameCollection {
    fn from(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}
