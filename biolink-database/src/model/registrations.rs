/// A group the bot has seen, kept for broadcast fan-out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupRegistration {
    pub group_id: i64,
}

/// A user who opened a private chat with the bot, kept for broadcast fan-out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserRegistration {
    pub user_id: i64,
}

/// What was dropped when the bot left a group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GroupRemoval {
    pub warnings_removed: u64,
    pub policy_removed: bool,
    pub was_registered: bool,
}
