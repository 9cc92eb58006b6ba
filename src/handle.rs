//! Owned external resources with exactly-once release.
//!
//! A [`ResourceHandle`] owns one closeable resource (file reader, child
//! process, native cursor). Ownership moves into the [`Sequence`] that wraps
//! it; the resource is released exactly once, whichever comes first of
//! end-of-data, an explicit `close()`, or `Drop` of the handle.
//!
//! [`Sequence`]: crate::sequence::Sequence

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::process::ChildStdout;

/// A resource that needs explicit teardown.
pub trait Release {
    /// Tear down the resource. Called at most once per handle.
    fn release(self) -> io::Result<()>;
}

impl Release for File {
    fn release(self) -> io::Result<()> {
        drop(self);
        Ok(())
    }
}

impl Release for ChildStdout {
    fn release(self) -> io::Result<()> {
        drop(self);
        Ok(())
    }
}

impl<R: Read + Release> Release for BufReader<R> {
    fn release(self) -> io::Result<()> {
        self.into_inner().release()
    }
}

/// Adapts a resource plus a custom teardown closure, for cursor-style
/// producers that need more than `drop`.
pub struct ReleaseWith<R, F>
where
    F: FnOnce(R) -> io::Result<()>,
{
    resource: R,
    teardown: F,
}

impl<R, F> ReleaseWith<R, F>
where
    F: FnOnce(R) -> io::Result<()>,
{
    pub fn new(resource: R, teardown: F) -> Self {
        Self { resource, teardown }
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.resource
    }
}

impl<R, F> Release for ReleaseWith<R, F>
where
    F: FnOnce(R) -> io::Result<()>,
{
    fn release(self) -> io::Result<()> {
        (self.teardown)(self.resource)
    }
}

/// Exclusive owner of one external resource.
///
/// `close()` is idempotent: the first call releases the resource, later calls
/// are no-ops. Dropping an unreleased handle releases it as a backstop and
/// logs at debug level, since relying on it means the owner was abandoned
/// before end-of-data.
pub struct ResourceHandle<R: Release> {
    resource: Option<R>,
    label: String,
}

impl<R: Release> ResourceHandle<R> {
    /// Take ownership of `resource`. The label identifies it in log records.
    pub fn new(resource: R, label: impl Into<String>) -> Self {
        Self {
            resource: Some(resource),
            label: label.into(),
        }
    }

    /// Borrow the resource, or `None` once released.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut R> {
        self.resource.as_mut()
    }

    #[inline]
    pub fn get(&self) -> Option<&R> {
        self.resource.as_ref()
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.resource.is_none()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Release the resource if still held.
    pub fn close(&mut self) -> io::Result<()> {
        match self.resource.take() {
            Some(resource) => resource.release(),
            None => Ok(()),
        }
    }

    /// Release the resource, logging instead of returning a failure.
    pub fn close_logged(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(resource = %self.label, error = %e, "failed to release resource");
        }
    }
}

impl<R: Release> Drop for ResourceHandle<R> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            tracing::debug!(resource = %self.label, "releasing resource on drop");
            if let Err(e) = resource.release() {
                tracing::warn!(resource = %self.label, error = %e, "failed to release resource");
            }
        }
    }
}

impl<R: Release> std::fmt::Debug for ResourceHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("label", &self.label)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(counter: &Arc<AtomicUsize>) -> ReleaseWith<(), impl FnOnce(()) -> io::Result<()>> {
        let counter = Arc::clone(counter);
        ReleaseWith::new((), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_close_is_idempotent() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut handle = ResourceHandle::new(counting(&releases), "test");

        handle.close().unwrap();
        handle.close().unwrap();
        drop(handle);

        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases() {
        let releases = Arc::new(AtomicUsize::new(0));
        {
            let handle = ResourceHandle::new(counting(&releases), "test");
            assert!(!handle.is_released());
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_reports_failure_once() {
        let mut handle = ResourceHandle::new(
            ReleaseWith::new((), |_| Err(io::Error::other("cursor already gone"))),
            "cursor",
        );
        assert!(handle.close().is_err());
        assert!(handle.close().is_ok());
        assert!(handle.is_released());
    }
}
