//! Common types shared by descriptors and commands.

/// 3D extent for textures and buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Depth in pixels (1 for 2D textures).
    pub depth: u32,
}

impl Extent3d {
    /// Create a new 2D extent.
    pub fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
        }
    }

    /// Half of this extent, rounded down and clamped to at least one texel.
    pub fn half(self) -> Self {
        Self {
            width: (self.width / 2).max(1),
            height: (self.height / 2).max(1),
            depth: self.depth,
        }
    }

    /// Largest of width and height.
    pub fn max_dimension(self) -> u32 {
        self.width.max(self.height)
    }

    /// Number of texels in one layer.
    pub fn texel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if any dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }
}

/// Clear value for render targets.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClearValue {
    /// No clear operation.
    #[default]
    None,
    /// Clear color attachment with RGBA values.
    Color { r: f32, g: f32, b: f32, a: f32 },
    /// Clear depth attachment.
    Depth(f32),
}

impl ClearValue {
    /// Create a color clear value.
    pub fn color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Color { r, g, b, a }
    }

    /// Create a depth clear value.
    pub fn depth(value: f32) -> Self {
        Self::Depth(value)
    }

    /// The value as an RGBA texel, if this clears anything.
    ///
    /// Depth clears fill the first channel.
    pub fn as_texel(self) -> Option<[f32; 4]> {
        match self {
            Self::None => None,
            Self::Color { r, g, b, a } => Some([r, g, b, a]),
            Self::Depth(depth) => Some([depth, 0.0, 0.0, 0.0]),
        }
    }
}
