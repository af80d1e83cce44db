//! Post-processing chain: the scene render pass followed by bloom.
//!
//! These are the parameters the driver owns. The passes themselves run in the backend, see
//! [`crate::gpu::bloom`].

/// Number of blur levels in the bloom pyramid.
pub const BLOOM_LEVELS: usize = 5;

const BLOOM_FACTORS: [f32; BLOOM_LEVELS] = [1.0, 0.8, 0.6, 0.4, 0.2];

/// Composite weight of every pyramid level. `radius` moves weight from the sharp levels
/// towards the wide ones.
pub fn bloom_weights(radius: f32) -> [f32; BLOOM_LEVELS] {
    BLOOM_FACTORS.map(|f| f + (1.2 - f - f) * radius)
}

/// What the backend needs to run bloom for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloomSettings {
    pub threshold: f32,
    pub strength: f32,
    pub radius: f32,
    pub resolution: [u32; 2],
}

#[derive(Clone, Debug, PartialEq)]
pub struct BloomPass {
    pub threshold: f32,
    pub strength: f32,
    pub radius: f32,
    resolution: [u32; 2],
}

impl BloomPass {
    pub fn new(resolution: [u32; 2], strength: f32, radius: f32, threshold: f32) -> Self {
        Self {
            threshold,
            strength,
            radius,
            resolution,
        }
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.resolution = [width, height];
    }

    pub fn resolution(&self) -> [u32; 2] {
        self.resolution
    }

    pub fn settings(&self) -> BloomSettings {
        BloomSettings {
            threshold: self.threshold,
            strength: self.strength,
            radius: self.radius,
            resolution: self.resolution,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassKind {
    Render,
    Bloom,
}

/// Ordered pass list plus the drawing-buffer geometry shared by all passes.
#[derive(Clone, Debug, PartialEq)]
pub struct Composer {
    passes: Vec<PassKind>,
    pub bloom: BloomPass,
    pixel_ratio: f32,
    width: u32,
    height: u32,
    disposed: bool,
}

impl Composer {
    pub fn new(bloom: BloomPass, width: u32, height: u32) -> Self {
        Self {
            passes: vec![PassKind::Render, PassKind::Bloom],
            bloom,
            pixel_ratio: 1.0,
            width,
            height,
            disposed: false,
        }
    }

    pub fn passes(&self) -> &[PassKind] {
        &self.passes
    }

    pub fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = ratio;
    }

    /// Logical size; the drawing buffer is this times the pixel ratio.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.pixel_ratio).floor() as u32).max(1);
        (scale(self.width), scale(self.height))
    }

    pub fn dispose(&mut self) {
        self.passes.clear();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
