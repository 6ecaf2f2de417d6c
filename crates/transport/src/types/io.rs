use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Byte stream tied to a close signal.
///
/// Once the signal fires, pending and future reads return end-of-stream and
/// writes fail with `BrokenPipe`, even when the inner stream cannot be shut
/// down through a shared reference. A read error fires the signal. End of
/// stream does not, so half-closed peers can still be written to.
pub struct GuardedIo<T> {
    inner: T,
    closed: CancellationToken,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl<T> GuardedIo<T> {
    /// Wraps `inner`, guarding it with `closed`.
    pub fn new(inner: T, closed: CancellationToken) -> Self {
        let cancelled = Box::pin(closed.clone().cancelled_owned());
        Self {
            inner,
            closed,
            cancelled,
        }
    }

    /// The guarding close signal.
    pub fn close_signal(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Fires the close signal.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// The wrapped stream.
    pub const fn get_ref(&self) -> &T {
        &self.inner
    }

    /// The wrapped stream, mutably.
    pub const fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    fn poll_closed(&mut self, cx: &mut Context<'_>) -> bool {
        self.closed.is_cancelled() || self.cancelled.as_mut().poll(cx).is_ready()
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for GuardedIo<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.poll_closed(cx) {
            return Poll::Ready(Ok(()));
        }
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(Err(e)) => {
                this.closed.cancel();
                Poll::Ready(Err(e))
            }
            other => other,
        }
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for GuardedIo<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.poll_closed(cx) {
            return Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()));
        }
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(Err(e)) => {
                this.closed.cancel();
                Poll::Ready(Err(e))
            }
            other => other,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.closed.is_cancelled() {
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.closed.is_cancelled() {
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}
