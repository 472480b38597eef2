#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationClip {
    pub first_frame: u32,
    pub frame_count: u32,
    pub ticks_per_frame: u32,
    pub looping: bool,
}

impl AnimationClip {
    pub const fn looping(first_frame: u32, frame_count: u32, ticks_per_frame: u32) -> Self {
        Self {
            first_frame,
            frame_count,
            ticks_per_frame,
            looping: true,
        }
    }

    pub const fn once(first_frame: u32, frame_count: u32, ticks_per_frame: u32) -> Self {
        Self {
            first_frame,
            frame_count,
            ticks_per_frame,
            looping: false,
        }
    }

    pub fn duration_ticks(&self) -> u32 {
        self.frame_count
            .max(1)
            .saturating_mul(self.ticks_per_frame.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animator {
    clip: AnimationClip,
    elapsed_ticks: u32,
}

impl Animator {
    pub fn new(clip: AnimationClip) -> Self {
        Self {
            clip,
            elapsed_ticks: 0,
        }
    }

    pub fn frame(&self) -> u32 {
        let frame_count = self.clip.frame_count.max(1);
        let step = self.elapsed_ticks / self.clip.ticks_per_frame.max(1);
        let offset = if self.clip.looping {
            step % frame_count
        } else {
            step.min(frame_count - 1)
        };
        self.clip.first_frame + offset
    }

    pub fn tick(&mut self) -> u32 {
        let frame = self.frame();
        if self.clip.looping {
            // Wrap at the loop period so long sessions never saturate.
            self.elapsed_ticks = (self.elapsed_ticks + 1) % self.clip.duration_ticks();
        } else {
            self.elapsed_ticks = self.elapsed_ticks.saturating_add(1);
        }
        frame
    }

    pub fn is_finished(&self) -> bool {
        !self.clip.looping && self.elapsed_ticks >= self.clip.duration_ticks()
    }

}
