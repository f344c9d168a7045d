use std::fmt;
use std::ops::{Deref, DerefMut};

use tracing::warn;

use crate::error::Result;

/// A reader or writer that can be entered with `enter` and has an action
/// to run when its scope ends.
pub trait Scoped {
    /// Run the exit action. Called exactly once per scope.
    fn exit(&mut self) -> Result<()>;
}

/// A guard returned by `Reader::enter` and `Writer::enter`.
///
/// The guard dereferences to the reader or writer. When it is dropped, the
/// exit action runs: a reader closes its source, and a writer flushes its
/// buffer and then closes its sink. Errors from an exit action run by
/// `Drop` can't be returned, so they are logged and discarded. Use
/// `Scope::close` to observe them.
pub struct Scope<'a, T: Scoped> {
    inner: &'a mut T,
    done: bool,
}

impl<'a, T: Scoped> Scope<'a, T> {
    pub(crate) fn new(inner: &'a mut T) -> Scope<'a, T> {
        Scope { inner, done: false }
    }

    /// End the scope, returning any error from the exit action.
    pub fn close(mut self) -> Result<()> {
        self.done = true;
        self.inner.exit()
    }
}

impl<'a, T: Scoped> Drop for Scope<'a, T> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        if let Err(err) = self.inner.exit() {
            warn!(error = %err, "error while leaving CSV scope");
        }
    }
}

impl<'a, T: Scoped> Deref for Scope<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &*self.inner
    }
}

impl<'a, T: Scoped> DerefMut for Scope<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut *self.inner
    }
}

impl<'a, T: Scoped + fmt::Debug> fmt::Debug for Scope<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Scope")
            .field("inner", &self.inner)
            .field("done", &self.done)
            .finish()
    }
}
