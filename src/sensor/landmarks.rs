use crate::Error;

/// Points per hand in the 21-landmark hand model.
pub const LANDMARK_COUNT: usize = 21;
pub const THUMB_TIP: usize = 4;
pub const INDEX_FINGER_TIP: usize = 8;

/// Normalized image coordinates, 0.0..=1.0 with the origin top left.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Landmark { x, y, z: 0.0 }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        HandLandmarks { points }
    }

    /// Hand with only the thumb and index tips placed; the rest sit at the origin.
    pub fn from_tips(thumb: Landmark, index: Landmark) -> Self {
        let mut points = [Landmark::default(); LANDMARK_COUNT];
        points[THUMB_TIP] = thumb;
        points[INDEX_FINGER_TIP] = index;
        HandLandmarks { points }
    }

    pub fn point(&self, index: usize) -> Option<Landmark> {
        self.points.get(index).copied()
    }

    pub fn thumb_tip(&self) -> Landmark {
        self.points[THUMB_TIP]
    }

    pub fn index_tip(&self) -> Landmark {
        self.points[INDEX_FINGER_TIP]
    }
}

/// A hand tracker. `Ok(None)` means no hand in the current frame.
pub trait LandmarkSource: Send {
    fn next_frame(&mut self) -> Result<Option<HandLandmarks>, Error>;
}

/// Deterministic source for demos: the index tip circles the frame and the
/// thumb pinches it briefly every `pinch_every` frames.
#[derive(Debug, Clone)]
pub struct SyntheticHand {
    frame: u64,
    pub pinch_every: u64,
    pub pinch_frames: u64,
}

impl Default for SyntheticHand {
    fn default() -> Self {
        SyntheticHand {
            frame: 0,
            pinch_every: 40,
            pinch_frames: 4,
        }
    }
}

impl SyntheticHand {
    pub fn new() -> Self {
        SyntheticHand::default()
    }

    fn pinching(&self) -> bool {
        self.pinch_every > 0 && self.frame % self.pinch_every < self.pinch_frames
    }
}

impl LandmarkSource for SyntheticHand {
    fn next_frame(&mut self) -> Result<Option<HandLandmarks>, Error> {
        let t = self.frame as f32 * 0.05;
        let index = Landmark::new(0.5 + 0.3 * t.cos(), 0.5 + 0.3 * t.sin());
        let gap = if self.pinching() { 0.0 } else { 0.2 };
        let thumb = Landmark::new(index.x - 0.05, index.y + gap);
        self.frame += 1;
        Ok(Some(HandLandmarks::from_tips(thumb, index)))
    }
}
