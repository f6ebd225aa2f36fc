use crate::network::AirportId;

/// A half-open span `[start, end)` of minutes (relative to T0) during
/// which a package sits in the warehouse at `airport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupancyWindow {
    pub airport: AirportId,
    pub start: i64,
    pub end: i64,
}

/// Per-minute occupancy for every airport that has a warehouse.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct TemporalGrid {
    horizon: usize,
    capacity: Vec<u32>,
    slots: Vec<Option<Vec<u32>>>,
}

impl TemporalGrid {
    pub(super) fn new(capacities: impl Iterator<Item = Option<u32>>, horizon: usize) -> Self {
        let mut capacity = Vec::new();
        let mut slots = Vec::new();
        for cap in capacities {
            capacity.push(cap.unwrap_or(0));
            slots.push(cap.map(|_| vec![0u32; horizon]));
        }
        Self {
            horizon,
            capacity,
            slots,
        }
    }

    fn span(&self, window: &OccupancyWindow) -> std::ops::Range<usize> {
        let h = self.horizon as i64;
        let start = window.start.clamp(0, h) as usize;
        let end = window.end.clamp(0, h) as usize;
        start..end.max(start)
    }

    pub(super) fn can_reserve(&self, windows: &[OccupancyWindow], units: u32) -> bool {
        let cap_for = |w: &OccupancyWindow| self.capacity[w.airport.index()] as u64;
        windows.iter().all(|w| match &self.slots[w.airport.index()] {
            None => false,
            Some(row) => row[self.span(w)]
                .iter()
                .all(|&occ| occ as u64 + units as u64 <= cap_for(w)),
        })
    }

    /// Books every window or none of them.
    pub(super) fn reserve_all(&mut self, windows: &[OccupancyWindow], units: u32) -> bool {
        if !self.can_reserve(windows, units) {
            return false;
        }
        for w in windows {
            let span = self.span(w);
            if let Some(row) = self.slots[w.airport.index()].as_mut() {
                row[span].iter_mut().for_each(|occ| *occ += units);
            }
        }
        true
    }

    pub(super) fn release_all(&mut self, windows: &[OccupancyWindow], units: u32) {
        for w in windows {
            let span = self.span(w);
            if let Some(row) = self.slots[w.airport.index()].as_mut() {
                row[span]
                    .iter_mut()
                    .for_each(|occ| *occ = occ.saturating_sub(units));
            }
        }
    }

    pub(super) fn at(&self, airport: AirportId, minute: usize) -> u32 {
        self.slots[airport.index()]
            .as_ref()
            .and_then(|row| row.get(minute).copied())
            .unwrap_or(0)
    }

    pub(super) fn peak(&self, airport: AirportId) -> Option<(usize, u32)> {
        let row = self.slots[airport.index()].as_ref()?;
        // first minute reaching the maximum
        let mut best = (0, 0);
        for (minute, &occ) in row.iter().enumerate() {
            if occ > best.1 {
                best = (minute, occ);
            }
        }
        Some(best)
    }

    pub(super) fn clear(&mut self) {
        for row in self.slots.iter_mut().flatten() {
            row.iter_mut().for_each(|occ| *occ = 0);
        }
    }

    pub(super) fn within_bounds(&self) -> bool {
        self.slots.iter().zip(&self.capacity).all(|(row, &cap)| {
            row.as_ref()
                .is_none_or(|row| row.iter().all(|&occ| occ <= cap))
        })
    }
}
