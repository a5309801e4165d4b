use std::collections::BTreeSet;

/// Filenames marked as inputs for the transcoding command.
///
/// Membership is session-scoped and independent of whether a file is cached.
/// A selected name is not guaranteed to resolve to content. Removal outside
/// of [`toggle`](Self::toggle) is reserved for the registry, which evicts
/// names when it deletes the files behind them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    names: BTreeSet<String>,
}
impl Selection {
    pub fn is_selected(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Flips membership of `name` and returns the new state.
    pub fn toggle(&mut self, name: &str) -> bool {
        if self.names.remove(name) {
            false
        } else {
            self.names.insert(name.to_string());
            true
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub(crate) fn remove(&mut self, name: &str) {
        self.names.remove(name);
    }

    pub(crate) fn clear(&mut self) {
        self.names.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flips() {
        let mut selection = Selection::default();
        assert!(!selection.is_selected("clip.mp4"));
        assert!(selection.toggle("clip.mp4"));
        assert!(selection.is_selected("clip.mp4"));
        assert!(!selection.toggle("clip.mp4"));
        assert!(!selection.is_selected("clip.mp4"));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_toggle_is_per_name() {
        let mut selection = Selection::default();
        selection.toggle("b.mp4");
        selection.toggle("a.mp4");
        selection.toggle("c.mp4");
        selection.toggle("b.mp4");
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.iter().collect::<Vec<_>>(), vec!["a.mp4", "c.mp4"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut selection = Selection::default();
        selection.toggle("a.mp4");
        selection.toggle("b.mp4");
        selection.remove("a.mp4");
        // Removing an unselected name is a no-op.
        selection.remove("missing.mp4");
        assert!(!selection.is_selected("a.mp4"));
        assert!(selection.is_selected("b.mp4"));
        selection.clear();
        assert!(selection.is_empty());
    }
}
