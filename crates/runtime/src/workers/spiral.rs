//! Square spiral over relative grid offsets.

/// Walks `(dx, dy)` offsets in expanding square rings around `(0, 0)`.
///
/// The walk takes exactly `steps` steps; positions outside `±bound` on
/// either axis are stepped over but not yielded.
#[derive(Debug, Clone)]
pub struct SpiralOffsets {
    remaining: u64,
    bound: i64,
    x: i64,
    y: i64,
    dx: i64,
    dy: i64,
}

impl SpiralOffsets {
    pub fn new(steps: u64, bound: i64) -> Self {
        Self {
            remaining: steps,
            bound,
            x: 0,
            y: 0,
            dx: 0,
            dy: -1,
        }
    }

    fn advance(&mut self) -> (i64, i64) {
        let current = (self.x, self.y);
        let (x, y) = current;
        if x == y || (x < 0 && x == -y) || (x > 0 && x == 1 - y) {
            (self.dx, self.dy) = (-self.dy, self.dx);
        }
        self.x += self.dx;
        self.y += self.dy;
        current
    }
}

impl Iterator for SpiralOffsets {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            self.remaining -= 1;
            let (x, y) = self.advance();
            if x.abs() <= self.bound && y.abs() <= self.bound {
                return Some((x, y));
            }
        }
        None
    }
}
