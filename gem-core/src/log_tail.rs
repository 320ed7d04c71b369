/// Tracks the last observed log content and yields only what was appended.
///
/// The delta is `current[last_seen.len()..]`. When the file was rewritten
/// rather than appended to, that suffix is not a real diff; callers accept
/// this and can [`LogTail::clear`] to resynchronise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogTail {
    last_seen: String,
}

impl LogTail {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen(&self) -> &str {
        &self.last_seen
    }

    /// Returns `None` when nothing changed, otherwise the appended suffix.
    pub fn observe(&mut self, current: &str) -> Option<String> {
        if current == self.last_seen {
            return None;
        }

        let mut start = self.last_seen.len().min(current.len());
        while !current.is_char_boundary(start) {
            start += 1;
        }
        let delta = current[start..].to_owned();
        self.last_seen.clear();
        self.last_seen.push_str(current);
        Some(delta)
    }

    pub fn clear(&mut self) {
        self.last_seen.clear();
    }
}
