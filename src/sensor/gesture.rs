//! Maps hand landmarks to pointer samples and detects pinch clicks.
//!
//! A frame counts as pinched when the thumb tip is less than
//! `pinch_threshold` below the index tip. Once `history_len` pinch states
//! are collected, a press followed by a release within `click_window` frames
//! is a click; the history is cleared after a click and whenever the hand
//! leaves the frame.

use std::collections::VecDeque;

use crate::config::GestureConfig;
use crate::hid::PointerReport;

use super::landmarks::HandLandmarks;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GestureSample {
    /// 0..=127, mirrored so moving the hand right moves the pointer right.
    pub x: u8,
    /// 0..=127, top to bottom.
    pub y: u8,
    pub click: bool,
}

impl GestureSample {
    pub fn press(&self) -> PointerReport {
        PointerReport::from_gesture(self.x, self.y, self.click)
    }

    pub fn release(&self) -> PointerReport {
        self.press().released()
    }

    /// Newer position with any click the unread sample carried.
    pub fn merge(self, unread: GestureSample) -> GestureSample {
        GestureSample {
            click: self.click || unread.click,
            ..self
        }
    }
}

#[derive(Debug, Clone)]
pub struct GestureTracker {
    history: VecDeque<bool>,
    history_len: usize,
    click_window: usize,
    pinch_threshold: f32,
}

impl GestureTracker {
    pub fn new(config: &GestureConfig) -> Self {
        GestureTracker::with_params(config.history_len, config.click_window, config.pinch_threshold)
    }

    pub fn with_params(history_len: usize, click_window: usize, pinch_threshold: f32) -> Self {
        GestureTracker {
            history: VecDeque::with_capacity(history_len),
            history_len: history_len.max(2),
            click_window,
            pinch_threshold,
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Consumes one frame. No hand resets the click history and yields nothing.
    pub fn update(&mut self, hand: Option<&HandLandmarks>) -> Option<GestureSample> {
        let Some(hand) = hand else {
            self.history.clear();
            return None;
        };
        let index = hand.index_tip();
        let thumb = hand.thumb_tip();

        let x = scale(1.0 - index.x);
        let y = scale(index.y);

        let pinched = thumb.y - index.y < self.pinch_threshold;
        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(pinched);

        let click = self.history.len() == self.history_len && self.detect_click();
        if click {
            self.history.clear();
        }
        Some(GestureSample { x, y, click })
    }

    fn detect_click(&self) -> bool {
        let mut pressed_at = None;
        let states: Vec<bool> = self.history.iter().copied().collect();
        for (i, pair) in states.windows(2).enumerate() {
            match (pair[0], pair[1]) {
                (false, true) => pressed_at = Some(i),
                (true, false) => {
                    if let Some(start) = pressed_at {
                        if i - start < self.click_window {
                            return true;
                        }
                        pressed_at = None;
                    }
                }
                _ => {}
            }
        }
        false
    }
}

fn scale(value: f32) -> u8 {
    (127.0 * value).clamp(0.0, 127.0) as u8
}
