//! Pointer-drag gesture tracking and drop resolution for drag-word questions.

use crate::error::InputError;
use crate::question::DragWordQuestion;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x < self.left + self.width && y >= self.top && y < self.top + self.height
    }
}

/// Maps a point to the drop zone rendered under it.
pub trait ZoneHitTest {
    fn zone_at(&self, x: f64, y: f64) -> Option<usize>;
}

/// Zone rectangles in page coordinates. Later zones win on overlap,
/// matching paint order.
#[derive(Debug, Clone, Default)]
pub struct ZoneLayout {
    zones: Vec<(usize, Rect)>,
}

impl ZoneLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, zone: usize, rect: Rect) {
        self.zones.push((zone, rect));
    }
}

impl FromIterator<(usize, Rect)> for ZoneLayout {
    fn from_iter<I: IntoIterator<Item = (usize, Rect)>>(iter: I) -> Self {
        Self { zones: iter.into_iter().collect() }
    }
}

impl ZoneHitTest for ZoneLayout {
    fn zone_at(&self, x: f64, y: f64) -> Option<usize> {
        self.zones.iter().rev().find(|(_, r)| r.contains(x, y)).map(|(id, _)| *id)
    }
}

/// The single in-flight drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragGesture {
    pub pointer_id: i32,
    /// Index of the dragged tile in the question's answer list.
    pub tile: usize,
    pub kanji: char,
    pub hovered_zone: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// No zone under the proxy; the tile goes home.
    Outside,
    AlreadyFilled,
    Placed { zone: usize, complete: bool },
    Wrong { zone: usize },
}

#[derive(Debug, Default)]
pub struct DragLayer {
    active: Option<DragGesture>,
}

impl DragLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&DragGesture> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn begin(&mut self, pointer_id: i32, tile: usize, kanji: char) -> Result<(), InputError> {
        if self.active.is_some() {
            return Err(InputError::DragInProgress);
        }
        self.active = Some(DragGesture { pointer_id, tile, kanji, hovered_zone: None });
        Ok(())
    }

    /// Hit-test at the proxy's center. Returns the zone to highlight, which
    /// is only ever an unfilled one.
    pub fn hover(
        &mut self,
        pointer_id: i32,
        proxy: Rect,
        hit: &impl ZoneHitTest,
        question: &DragWordQuestion,
    ) -> Result<Option<usize>, InputError> {
        let gesture = self.owned_mut(pointer_id)?;
        let (x, y) = proxy.center();
        let zone = hit
            .zone_at(x, y)
            .filter(|id| question.zone(*id).is_some_and(|z| !z.filled));
        gesture.hovered_zone = zone;
        Ok(zone)
    }

    /// End the gesture and report the zone under the proxy's center.
    pub fn release(
        &mut self,
        pointer_id: i32,
        proxy: Rect,
        hit: &impl ZoneHitTest,
    ) -> Result<(DragGesture, Option<usize>), InputError> {
        self.owned_mut(pointer_id)?;
        let gesture = self.active.take().ok_or(InputError::NoActiveDrag)?;
        let (x, y) = proxy.center();
        Ok((gesture, hit.zone_at(x, y)))
    }

    pub fn cancel(&mut self) -> Option<DragGesture> {
        self.active.take()
    }

    fn owned_mut(&mut self, pointer_id: i32) -> Result<&mut DragGesture, InputError> {
        match self.active.as_mut() {
            None => Err(InputError::NoActiveDrag),
            Some(g) if g.pointer_id != pointer_id => {
                Err(InputError::PointerMismatch { owner: g.pointer_id, got: pointer_id })
            }
            Some(g) => Ok(g),
        }
    }
}

/// Apply a drop of `kanji` onto `zone`. Only a correct placement mutates
/// the question.
pub fn resolve_drop(question: &mut DragWordQuestion, zone: Option<usize>, kanji: char) -> DropOutcome {
    let Some(target) = zone.and_then(|id| question.zone(id)) else {
        return DropOutcome::Outside;
    };
    let (id, expected) = (target.id, target.expected);
    if target.filled {
        return DropOutcome::AlreadyFilled;
    }
    match expected {
        Some(expected) if expected == kanji => DropOutcome::Placed { zone: id, complete: question.fill(id) },
        _ => DropOutcome::Wrong { zone: id },
    }
}
