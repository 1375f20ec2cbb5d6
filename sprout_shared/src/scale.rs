use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleType {
    Major,
    Minor,
    MinorPentatonic,
}

impl Default for ScaleType {
    fn default() -> Self {
        Self::Major
    }
}

impl ScaleType {
    pub const ALL: [ScaleType; 3] = [
        ScaleType::Major,
        ScaleType::Minor,
        ScaleType::MinorPentatonic,
    ];

    /// Scale degrees as semitone offsets from the root, 0-11.
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            ScaleType::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleType::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleType::MinorPentatonic => &[0, 3, 5, 7, 10],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScaleType::Major => "Major",
            ScaleType::Minor => "Minor",
            ScaleType::MinorPentatonic => "Min Pentatonic",
        }
    }

    /// True when `note`'s pitch class, taken relative to `root`, is a degree
    /// of this scale.
    pub fn contains(&self, note: u8, root: u8) -> bool {
        let rel = (note % 12 + 12 - root % 12) % 12;
        self.intervals().contains(&rel)
    }

    /// Snaps `note` to the nearest scale member relative to `root`.
    ///
    /// Candidates are generated for the octave around `note`; the winner is
    /// the one with the smallest absolute semitone distance. Ties resolve to
    /// the first candidate found in ascending degree order.
    pub fn snap(&self, note: u8, root: u8) -> u8 {
        if self.contains(note, root) {
            return note;
        }

        let root_class = (root % 12) as i32;
        let note_val = note as i32;
        let octave = note_val / 12;

        let mut best = note;
        let mut best_dist = i32::MAX;
        for oct in (octave - 1)..=(octave + 1) {
            if oct < 0 {
                continue;
            }
            for &iv in self.intervals() {
                let candidate = oct * 12 + (root_class + iv as i32) % 12;
                if !(0..=127).contains(&candidate) {
                    continue;
                }
                let dist = (note_val - candidate).abs();
                if dist < best_dist {
                    best_dist = dist;
                    best = candidate as u8;
                }
            }
        }
        best
    }
}
