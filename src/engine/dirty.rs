/// Tracks whether a cached derivation has to be recomputed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dirty(bool);

impl Dirty {
    pub fn smudged() -> Self {
        Self(true)
    }

    pub fn clean() -> Self {
        Self(false)
    }

    /// Mark the flag as dirty.
    #[inline]
    pub fn smudge(&mut self) {
        self.0 = true;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.0
    }

    /// Runs `f` if the flag is dirty and marks it clean afterwards. Returns true if `f` ran.
    pub fn if_dirty(&mut self, f: impl FnOnce()) -> bool {
        let changed = self.0;
        if changed {
            f();
            self.0 = false;
        }
        changed
    }
}

impl Default for Dirty {
    fn default() -> Self {
        Self::clean()
    }
}
