#[derive(Debug, thiserror::Error)]
pub enum NetworkTransportError<E> {
    #[error("transport shutdown")]
    Shutdown,
    #[error("dial failed: {0}")]
    Dial(#[source] E),
    #[error("closing stream layer failed: {0}")]
    Close(#[source] E),
}
