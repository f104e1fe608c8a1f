//! Release hooks handed out by registries and owned by cache entries.

/// Something that must be released when its owner goes away.
///
/// Implementations must tolerate being disposed more than once; owners still
/// guarantee a single call per value.
pub trait Disposable: Send {
    fn dispose(&mut self);
}

impl<F> Disposable for Option<F>
where
    F: FnOnce() + Send,
{
    fn dispose(&mut self) {
        if let Some(f) = self.take() {
            f();
        }
    }
}

/// Wrap a closure so it runs at most once.
pub fn dispose_fn<F>(f: F) -> Box<dyn Disposable>
where
    F: FnOnce() + Send + 'static,
{
    Box::new(Some(f))
}
