//! Identifier generation
//!
//! Project ids come from a counter rather than the clock, so two registrations
//! in the same millisecond still get distinct ids.

use uuid::Uuid;

/// Monotonic `<prefix><n>` id source
#[derive(Debug, Clone)]
pub struct IdSequence {
    prefix: String,
    next: u64,
}

impl IdSequence {
    /// Start past the largest numeric suffix among `existing` ids.
    ///
    /// When that suffix is already `u64::MAX` the counter restarts at 1 and
    /// `next_unused` scans for a free id.
    pub fn seeded_from<'a, I>(prefix: &str, existing: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let max = existing
            .into_iter()
            .filter_map(|id| id.strip_prefix(prefix))
            .filter_map(|suffix| suffix.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        Self {
            prefix: prefix.to_string(),
            next: max.checked_add(1).unwrap_or(1),
        }
    }

    /// Next id for which `taken` is false
    pub fn next_unused(&mut self, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let id = format!("{}{}", self.prefix, self.next);
            self.next = self.next.checked_add(1).unwrap_or(1);
            if !taken(&id) {
                return id;
            }
        }
    }
}

/// Hash-like transaction identifier
pub fn transaction_hash() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("0x{}", &hex[..16])
}
