//! Log lines printed while the timeline bar is on screen would leave fragments of the
//! bar behind them. This encoder clears the line first.
use log::Record;
use log4rs::encode::{Encode, Write};

#[derive(Debug)]
pub(in crate::log) struct LineClearingEncoder {
    inner: Box<dyn Encode>,
}

impl LineClearingEncoder {
    pub(in crate::log) fn new(inner: Box<dyn Encode>) -> Self {
        Self { inner }
    }
}

impl Encode for LineClearingEncoder {
    fn encode(&self, w: &mut dyn Write, record: &Record) -> anyhow::Result<()> {
        // Erase the whole line, then carriage return.
        w.write_all(b"\x1B[2K\r")?;
        self.inner.encode(w, record)
    }
}
