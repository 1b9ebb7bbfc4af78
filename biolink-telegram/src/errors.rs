use biolink_core::GatewayError;

/// Descriptions that mean the bot can no longer act in the chat.
const CHAT_GONE: &[&str] = &[
    "chat not found",
    "bot was kicked",
    "bot is not a member",
    "group chat was deactivated",
    "group chat was upgraded",
];

/// Descriptions that mean the bot is present but lacks rights for the call.
const NO_RIGHTS: &[&str] = &[
    "not enough rights",
    "have no rights",
    "chat_admin_required",
    "need administrator rights",
    "can't remove chat owner",
    "user is an administrator",
    "can't restrict self",
    "message can't be deleted",
    "chat_write_forbidden",
    "method is available only for supergroups",
];

/// Map a failed Bot API response onto the gateway error taxonomy.
///
/// 403 always means the bot was removed or blocked. A 400 is split by its
/// description into chat-gone, missing-rights and target-vanished cases.
pub(crate) fn classify_api_error(
    method: &'static str,
    error_code: u16,
    description: &str,
) -> GatewayError {
    let message = description.to_owned();
    let lowered = description.to_ascii_lowercase();
    let mentions = |needles: &[&str]| needles.iter().any(|needle| lowered.contains(needle));

    match error_code {
        403 => GatewayError::ChatUnavailable { method, message },
        400 if mentions(CHAT_GONE) => GatewayError::ChatUnavailable { method, message },
        400 if mentions(NO_RIGHTS) => GatewayError::Permission { method, message },
        400 => GatewayError::TargetNotFound { method, message },
        401 | 404 => GatewayError::Permission { method, message },
        _ => GatewayError::Transient { method, message },
    }
}

pub(crate) fn transport_error(method: &'static str, source: &reqwest::Error) -> GatewayError {
    let message = if source.is_timeout() {
        format!("request timed out: {source}")
    } else {
        source.to_string()
    };
    GatewayError::Transient { method, message }
}
