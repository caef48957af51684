//! Extension trait to Result.

pub trait DoIfErr<E>: Sized {
    /// Run `f` on a reference to the error, if there is one, and pass the
    /// result through unchanged.
    fn do_if_err<F: FnOnce(&E)>(self, f: F) -> Self;
}

impl<I, E> DoIfErr<E> for Result<I, E> {
    fn do_if_err<F: FnOnce(&E)>(self, f: F) -> Self {
        if let Err(ref e) = self {
            f(e);
        }
        self
    }
}
