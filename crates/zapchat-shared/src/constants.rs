/// Application name
pub const APP_NAME: &str = "ZapChat";

/// How long a story stays visible after posting, in hours
pub const STORY_TTL_HOURS: i64 = 24;

/// Base URL used for generated placeholder avatars
pub const AVATAR_BASE_URL: &str = "https://picsum.photos";
