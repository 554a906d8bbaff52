use crate::triple::Triple;

/// What a [`FilteredTriples`] does with its target triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    /// Yield the target once, appending it if the source lacked it.
    Add,
    /// Drop every occurrence of the target.
    Purge,
}

/// Iterator adapter that rewrites a triple stream around one target triple
/// and records whether the output differs from the input.
///
/// [`was_change_made`](Self::was_change_made) is only final once the
/// adapter has been drained.
#[derive(Debug)]
pub struct FilteredTriples<I> {
    inner: I,
    target: Triple,
    mode: FilterMode,
    seen_target: bool,
    changed: bool,
    finished: bool,
}

impl<I> FilteredTriples<I>
where
    I: Iterator<Item = Triple>,
{
    pub fn new(inner: I, target: Triple, mode: FilterMode) -> Self {
        Self {
            inner,
            target,
            mode,
            seen_target: false,
            changed: false,
            finished: false,
        }
    }

    pub fn was_change_made(&self) -> bool {
        self.changed
    }
}

impl<I> Iterator for FilteredTriples<I>
where
    I: Iterator<Item = Triple>,
{
    type Item = Triple;

    fn next(&mut self) -> Option<Triple> {
        if self.finished {
            return None;
        }
        loop {
            match self.inner.next() {
                Some(t) if t == self.target => match self.mode {
                    FilterMode::Purge => {
                        self.changed = true;
                    }
                    FilterMode::Add if self.seen_target => {}
                    FilterMode::Add => {
                        self.seen_target = true;
                        return Some(t);
                    }
                },
                Some(t) => return Some(t),
                None => {
                    self.finished = true;
                    if self.mode == FilterMode::Add && !self.seen_target {
                        self.changed = true;
                        return Some(self.target.clone());
                    }
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triple::RdfObject;

    fn t(obj: &str) -> Triple {
        Triple::new("urn:s", "urn:p", RdfObject::Resource(obj.into()))
    }

    fn run(input: Vec<Triple>, target: Triple, mode: FilterMode) -> (Vec<Triple>, bool) {
        let mut filter = FilteredTriples::new(input.into_iter(), target, mode);
        let out: Vec<_> = filter.by_ref().collect();
        (out, filter.was_change_made())
    }

    #[test]
    fn add_appends_missing_target() {
        let (out, changed) = run(vec![t("urn:a")], t("urn:b"), FilterMode::Add);
        assert_eq!(out, vec![t("urn:a"), t("urn:b")]);
        assert!(changed);
    }

    #[test]
    fn add_of_present_target_is_unchanged() {
        let (out, changed) = run(vec![t("urn:a"), t("urn:b")], t("urn:a"), FilterMode::Add);
        assert_eq!(out, vec![t("urn:a"), t("urn:b")]);
        assert!(!changed);
    }

    #[test]
    fn purge_drops_target() {
        let (out, changed) = run(vec![t("urn:a"), t("urn:b")], t("urn:a"), FilterMode::Purge);
        assert_eq!(out, vec![t("urn:b")]);
        assert!(changed);
    }

    #[test]
    fn purge_of_absent_target_is_unchanged() {
        let (out, changed) = run(vec![t("urn:a")], t("urn:z"), FilterMode::Purge);
        assert_eq!(out, vec![t("urn:a")]);
        assert!(!changed);
    }

    #[test]
    fn exhausted_filter_stays_exhausted() {
        let mut filter = FilteredTriples::new(Vec::new().into_iter(), t("urn:a"), FilterMode::Add);
        assert_eq!(filter.next(), Some(t("urn:a")));
        assert_eq!(filter.next(), None);
        assert_eq!(filter.next(), None);
    }
}
