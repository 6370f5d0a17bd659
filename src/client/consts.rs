pub const API_KEY_ENV: &str = "CARTESIA_API_KEY";

pub const DEFAULT_BASE_URL: &str = "wss://agents.cartesia.ai";
pub const DEFAULT_VERSION: &str = "2025-04-16";

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const VERSION_HEADER: &str = "Cartesia-Version";
