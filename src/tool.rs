//! Pointer intents, the active sculpt tool and the edit rate limiter.

use crate::config::unpack_rgb;

/// Smallest brush radius accepted, in normalized grid units.
pub const MIN_BRUSH_RADIUS: f32 = 1.0e-3;

/// Frame deltas above this many seconds are treated as a stall.
const MAX_FRAME_DELTA: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Removes voxels under the brush.
    Sculpt,
    /// Recolors solid voxels under the brush.
    Paint,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::Sculpt, ToolKind::Paint];

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(self) -> u32 {
        match self {
            ToolKind::Sculpt => 0,
            ToolKind::Paint => 1,
        }
    }

    /// Name of the data-pass program implementing this tool.
    pub fn program(self) -> &'static str {
        match self {
            ToolKind::Sculpt => "sculpt",
            ToolKind::Paint => "paint",
        }
    }

    /// Brush centre offset into the surface along the view ray, in radii.
    pub fn push(self) -> f32 {
        match self {
            ToolKind::Sculpt => 0.5,
            ToolKind::Paint => 0.0,
        }
    }
}

/// Pointer state sampled by the host once per event.
///
/// `x` and `y` are window pixels with the origin at the top left. The three
/// flags are the intents the host mapped from its buttons and modifiers.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerInput {
    pub x: f32,
    pub y: f32,
    pub sculpt: bool,
    pub rotate: bool,
    pub zoom: bool,
    /// Wheel or drag zoom amount, in notches.
    pub zoom_delta: f32,
}

impl PointerInput {
    /// Pointer position in `[-1, 1]`, y up.
    pub fn normalized(&self, width: u32, height: u32) -> (f32, f32) {
        normalize_pointer(self.x, self.y, width, height)
    }
}

pub fn normalize_pointer(x: f32, y: f32, width: u32, height: u32) -> (f32, f32) {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    let nx = (x / w) * 2.0 - 1.0;
    let ny = 1.0 - (y / h) * 2.0;
    (nx.clamp(-1.0, 1.0), ny.clamp(-1.0, 1.0))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ToolPhase {
    Idle,
    Active { start: [f32; 2], current: [f32; 2] },
}

/// Caps grid edits to `brush_speed` per second.
///
/// The first edit after a reset fires at once. Later edits follow a fixed
/// schedule so frame jitter does not erode the rate; the schedule never lags
/// the clock by more than one interval.
#[derive(Clone, Debug)]
pub struct EditRateLimiter {
    interval: f64,
    last: Option<f64>,
}

impl EditRateLimiter {
    pub fn new(brush_speed: f32) -> Self {
        Self {
            interval: 1.0 / f64::from(brush_speed.max(f32::EPSILON)),
            last: None,
        }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Returns true and stamps the schedule when an edit may run at `now`.
    pub fn try_fire(&mut self, now: f64) -> bool {
        match self.last {
            None => {
                self.last = Some(now);
                true
            }
            // A frame landing exactly on the schedule fires.
            Some(last) if now - last >= self.interval => {
                self.last = Some((last + self.interval).max(now - self.interval));
                true
            }
            Some(_) => false,
        }
    }
}

/// Session clock fed by host frame deltas.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameClock {
    elapsed: f64,
}

impl FrameClock {
    /// Advance by `dt` seconds and return the delta actually applied.
    /// Stalls longer than a second and bogus negative deltas count as zero.
    pub fn advance(&mut self, dt: f64) -> f64 {
        let dt = if dt.is_finite() && (0.0..=MAX_FRAME_DELTA).contains(&dt) {
            dt
        } else {
            0.0
        };
        self.elapsed += dt;
        dt
    }

    pub fn now(&self) -> f64 {
        self.elapsed
    }
}

/// Brush settings plus the pointer-down/up state machine.
#[derive(Clone, Debug)]
pub struct ToolState {
    kind: ToolKind,
    phase: ToolPhase,
    limiter: EditRateLimiter,
    brush_radius: f32,
    paint_color: [f32; 3],
    hover: Option<[f32; 2]>,
}

impl ToolState {
    pub fn new(brush_speed: f32, brush_radius: f32, paint_color: u32) -> Self {
        Self {
            kind: ToolKind::Sculpt,
            phase: ToolPhase::Idle,
            limiter: EditRateLimiter::new(brush_speed),
            brush_radius: brush_radius.max(MIN_BRUSH_RADIUS),
            paint_color: unpack_rgb(paint_color),
            hover: None,
        }
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: ToolKind) {
        self.kind = kind;
    }

    pub fn phase(&self) -> ToolPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, ToolPhase::Active { .. })
    }

    pub fn brush_radius(&self) -> f32 {
        self.brush_radius
    }

    pub fn set_brush_radius(&mut self, radius: f32) {
        self.brush_radius = if radius.is_finite() {
            radius.max(MIN_BRUSH_RADIUS)
        } else {
            MIN_BRUSH_RADIUS
        };
    }

    pub fn paint_color(&self) -> [f32; 3] {
        self.paint_color
    }

    pub fn set_paint_color(&mut self, packed: u32) {
        self.paint_color = unpack_rgb(packed);
    }

    /// Last hovered position, in normalized pointer coordinates.
    pub fn hover(&self) -> Option<[f32; 2]> {
        self.hover
    }

    pub fn set_hover(&mut self, nx: f32, ny: f32) {
        self.hover = Some([nx, ny]);
    }

    pub fn clear_hover(&mut self) {
        self.hover = None;
    }

    pub fn pointer_down(&mut self, nx: f32, ny: f32) {
        log::debug!("tool {:?} down at ({nx:.3}, {ny:.3})", self.kind);
        self.phase = ToolPhase::Active {
            start: [nx, ny],
            current: [nx, ny],
        };
        self.limiter.reset();
    }

    pub fn pointer_move(&mut self, nx: f32, ny: f32) {
        if let ToolPhase::Active { current, .. } = &mut self.phase {
            *current = [nx, ny];
        }
    }

    pub fn pointer_up(&mut self) {
        if self.is_active() {
            log::debug!("tool {:?} up", self.kind);
        }
        self.phase = ToolPhase::Idle;
    }

    /// Pointer position of the edit due at `now`, if the tool is held and the
    /// rate limiter allows one.
    pub fn poll_edit(&mut self, now: f64) -> Option<[f32; 2]> {
        match self.phase {
            ToolPhase::Active { current, .. } if self.limiter.try_fire(now) => Some(current),
            _ => None,
        }
    }
}
