use glam::Vec3;
use instant::now;

#[derive(Copy, Clone, Debug)]
#[readonly::make]
pub struct Frame {
    pub number: u32,
}

impl Frame {
    pub fn new(number: u32) -> Self {
        Self { number }
    }
}

#[derive(Copy, Clone, Debug)]
#[readonly::make]
pub struct Time {
    pub now: f32,
    pub delta: f32,
}

impl Time {
    pub fn new(now: f32, last: f32) -> Self {
        Self {
            now,
            delta: (now - last).abs(),
        }
    }
}

/// The per-frame input to block streaming.
#[derive(Clone, Debug)]
pub struct Input {
    pub frame: Frame,
    pub time: Time,

    /// The current point of interest in world space.
    pub focus: Vec3,
}

impl Input {
    pub fn new(focus: Vec3) -> Self {
        let now = now() as f32;
        Self {
            frame: Frame::new(0),
            time: Time::new(now, now),
            focus,
        }
    }

    pub fn from_last(last: &Input) -> Self {
        Self::from_last_with_focus(last, last.focus)
    }

    pub fn from_last_with_focus(last: &Input, focus: Vec3) -> Self {
        let now = now() as f32;
        Self {
            frame: Frame::new(last.frame.number + 1),
            time: Time::new(now, last.time.now),
            focus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_delta_is_elapsed_time_since_last_frame() {
        let time = Time::new(12.5, 10.0);
        assert_eq!(time.now, 12.5);
        assert_eq!(time.delta, 2.5);
    }

    #[test]
    fn from_last_advances_frame() {
        let first = Input::new(Vec3::ONE);
        let second = Input::from_last(&first);
        assert_eq!(second.frame.number, 1);
        assert_eq!(second.focus, Vec3::ONE);
        assert!(second.time.delta >= 0.0);

        let third = Input::from_last_with_focus(&second, Vec3::ZERO);
        assert_eq!(third.frame.number, 2);
        assert_eq!(third.focus, Vec3::ZERO);
    }
}
