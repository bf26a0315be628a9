//! Output edge trace
//!
//! Every pin transition the simulator sees, in order, with the cycle count
//! it happened at. Intervals use wrapping arithmetic so traces spanning a
//! counter wrap measure correctly.

/// One output transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// Pin number
    pub pin: u8,
    /// Level after the transition
    pub high: bool,
    /// Cycle count of the transition
    pub at: u32,
}

/// Recorded transitions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeTrace {
    edges: Vec<Edge>,
}

impl EdgeTrace {
    /// Wrap a list of edges
    pub fn new(edges: Vec<Edge>) -> Self {
        Self { edges }
    }

    /// All edges in order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges of one pin
    pub fn for_pin(&self, pin: u8) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |e| e.pin == pin)
    }

    /// Cycle counts of the pin's low-to-high transitions
    pub fn rises(&self, pin: u8) -> Vec<u32> {
        self.for_pin(pin).filter(|e| e.high).map(|e| e.at).collect()
    }

    /// Cycle counts of the pin's high-to-low transitions
    pub fn falls(&self, pin: u8) -> Vec<u32> {
        self.for_pin(pin).filter(|e| !e.high).map(|e| e.at).collect()
    }

    /// Length of every completed high interval of the pin
    pub fn high_intervals(&self, pin: u8) -> Vec<u32> {
        let mut intervals = Vec::new();
        let mut rose_at = None;
        for edge in self.for_pin(pin) {
            match (edge.high, rose_at) {
                (true, _) => rose_at = Some(edge.at),
                (false, Some(start)) => {
                    intervals.push(edge.at.wrapping_sub(start));
                    rose_at = None;
                }
                (false, None) => {}
            }
        }
        intervals
    }

    /// Length of every completed period (rise to next rise) of the pin
    pub fn periods(&self, pin: u8) -> Vec<u32> {
        self.rises(pin)
            .windows(2)
            .map(|w| w[1].wrapping_sub(w[0]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(pin: u8, high: bool, at: u32) -> Edge {
        Edge { pin, high, at }
    }

    #[test]
    fn test_intervals_per_pin() {
        let trace = EdgeTrace::new(vec![
            edge(1, true, 100),
            edge(2, true, 150),
            edge(1, false, 300),
            edge(1, true, 1100),
            edge(2, false, 1200),
            edge(1, false, 1300),
        ]);

        assert_eq!(trace.rises(1), vec![100, 1100]);
        assert_eq!(trace.falls(1), vec![300, 1300]);
        assert_eq!(trace.high_intervals(1), vec![200, 200]);
        assert_eq!(trace.high_intervals(2), vec![1050]);
        assert_eq!(trace.periods(1), vec![1000]);
    }

    #[test]
    fn test_intervals_across_wrap() {
        let trace = EdgeTrace::new(vec![edge(4, true, u32::MAX - 99), edge(4, false, 900)]);
        assert_eq!(trace.high_intervals(4), vec![1000]);
    }

    #[test]
    fn test_leading_fall_ignored() {
        let trace = EdgeTrace::new(vec![edge(3, false, 10), edge(3, true, 20), edge(3, false, 70)]);
        assert_eq!(trace.high_intervals(3), vec![50]);
    }
}
