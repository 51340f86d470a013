use parse_display::Display;

/// Contiguous range of LED indices, bounds included
///
/// `start` never exceeds `end`. Constructors and edits collapse an inverted pair onto the bound
/// that was given last instead of swapping it.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("{start}..={end}")]
pub struct SelectionRange {
    start: usize,
    end: usize,
}

impl SelectionRange {
    /// Range from `start` to `end`, collapsed onto `start` if `end` comes before it
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn single(index: usize) -> Self {
        Self {
            start: index,
            end: index,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of LEDs in the range, never zero
    pub fn led_count(&self) -> usize {
        self.end - self.start + 1
    }

    /// Clamp both bounds into `0..num_leds`
    ///
    /// A strip without LEDs has no valid index, the range then degenerates to index 0.
    pub fn clamped(self, num_leds: usize) -> Self {
        let last = num_leds.saturating_sub(1);
        Self::new(self.start.min(last), self.end.min(last))
    }

    fn clamped_to(self, num_leds: Option<usize>) -> Self {
        match num_leds {
            Some(num_leds) => self.clamped(num_leds),
            None => self,
        }
    }

    /// Edit the first bound, dragging `end` along if it would be passed
    pub fn with_start(self, start: usize, num_leds: Option<usize>) -> Self {
        Self {
            start,
            end: self.end.max(start),
        }
        .clamped_to(num_leds)
    }

    /// Edit the last bound, dragging `start` along if it would be passed
    pub fn with_end(self, end: usize, num_leds: Option<usize>) -> Self {
        Self {
            start: self.start.min(end),
            end,
        }
        .clamped_to(num_leds)
    }
}

impl Default for SelectionRange {
    fn default() -> Self {
        Self::single(0)
    }
}

/// What the client believes about the range claimed on the device
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display(style = "lowercase")]
pub enum SelectionStatus {
    /// No range claimed
    None,
    /// Range claimed, nothing previewed since the last select or save
    Active,
    /// A preview color or local brightness was sent and not saved yet
    Dirty,
}

impl Default for SelectionStatus {
    fn default() -> Self {
        Self::None
    }
}

/// Selection state machine
///
/// Transitions are only applied once the device acknowledged the corresponding command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Selection {
    status: SelectionStatus,
    range: Option<SelectionRange>,
}

impl Selection {
    pub fn status(&self) -> SelectionStatus {
        self.status
    }

    pub fn range(&self) -> Option<SelectionRange> {
        self.range
    }

    pub fn is_claimed(&self) -> bool {
        self.status != SelectionStatus::None
    }

    /// A select redefines the working range, any preview state is forgotten
    pub fn claimed(&mut self, range: SelectionRange) {
        self.status = SelectionStatus::Active;
        self.range = Some(range);
    }

    pub fn previewed(&mut self) {
        if self.status == SelectionStatus::Active {
            self.status = SelectionStatus::Dirty;
        }
    }

    pub fn saved(&mut self) {
        if self.status == SelectionStatus::Dirty {
            self.status = SelectionStatus::Active;
        }
    }

    pub fn released(&mut self) {
        self.status = SelectionStatus::None;
        self.range = None;
    }

    pub fn clamp(&mut self, num_leds: usize) {
        self.range = self.range.map(|range| range.clamped(num_leds));
    }
}
