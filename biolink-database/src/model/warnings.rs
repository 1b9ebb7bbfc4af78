/// Live warning state for one member of one group.
///
/// A stored record always has `count >= 1`; zero warnings is represented by
/// the absence of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WarningRecord {
    pub count: u32,
    pub last_warning_at: u64,
}
