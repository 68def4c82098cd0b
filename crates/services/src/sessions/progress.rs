/// Position and tally of a running session, pushed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    /// 1-based position of the current item.
    pub position: usize,
    pub total: usize,
    pub presented: usize,
    pub stars: u32,
}

impl SessionProgress {
    /// Share of the deck reached so far, 0–100.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (self.position.min(self.total) * 100) / self.total;
        u8::try_from(pct).unwrap_or(100)
    }

    /// `"2 / 5"` counter text.
    #[must_use]
    pub fn counter(&self) -> String {
        format!("{} / {}", self.position, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_and_counter() {
        let progress = SessionProgress {
            position: 1,
            total: 3,
            presented: 1,
            stars: 0,
        };
        assert_eq!(progress.percent(), 33);
        assert_eq!(progress.counter(), "1 / 3");
    }
}
