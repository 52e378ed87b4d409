/// Download progress events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Starting { total: u64 },
    Chunk { current: u64, total: u64 },
    Complete { total: u64 },
}

/// How a response body is handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Body is left on the wire and read incrementally.
    Stream,
    /// Body is read into memory before returning.
    Buffer,
}

pub type ProgressCallback = Box<dyn Fn(Progress) + Send + Sync>;
